use crate::core::Block;
use crate::error::{BlockchainError, Result};
use crate::utils::sha256_digest;
use data_encoding::HEXLOWER;
use log::{debug, info};
use num_bigint::BigUint;

/// Fixed difficulty: a block hash must be below 2^(256 - TARGET_BITS). There is no retargeting.
pub const TARGET_BITS: u32 = 16;

const MAX_NONCE: i64 = i64::MAX;

// How often the nonce search reports progress at debug level
const PROGRESS_INTERVAL: i64 = 1 << 20;

pub struct ProofOfWork<'a> {
    block: &'a Block,
    target: BigUint,
    target_bits: u32,
}

impl<'a> ProofOfWork<'a> {
    pub fn new_proof_of_work(block: &'a Block) -> ProofOfWork<'a> {
        Self::with_target_bits(block, TARGET_BITS)
    }

    fn with_target_bits(block: &'a Block, target_bits: u32) -> ProofOfWork<'a> {
        let target = BigUint::from(1u8) << (256 - target_bits);
        ProofOfWork {
            block,
            target,
            target_bits,
        }
    }

    pub fn target(&self) -> &BigUint {
        &self.target
    }

    /// Recompute the hash from the block's stored nonce and check it against the target.
    pub fn validate(block: &Block) -> bool {
        let pow = ProofOfWork::new_proof_of_work(block);
        let hash = sha256_digest(pow.prepare_data(block.get_nonce()).as_slice());
        pow.meets_target(&hash) && hash == block.get_hash()
    }

    /// Header bytes hashed for a candidate nonce: previous hash, transactions digest,
    /// then timestamp, difficulty and nonce as big-endian 64-bit integers.
    pub fn prepare_data(&self, nonce: i64) -> Vec<u8> {
        let pre_block_hash = self.block.get_pre_block_hash();
        let tx_digest = self.block.hash_transactions();
        let mut data_bytes = Vec::with_capacity(pre_block_hash.len() + tx_digest.len() + 24);
        data_bytes.extend_from_slice(pre_block_hash);
        data_bytes.extend(tx_digest);
        data_bytes.extend(self.block.get_timestamp().to_be_bytes());
        data_bytes.extend(i64::from(self.target_bits).to_be_bytes());
        data_bytes.extend(nonce.to_be_bytes());
        data_bytes
    }

    /// Scan nonces upward from zero and return the first one whose hash is below the target.
    pub fn run(&self) -> Result<(i64, Vec<u8>)> {
        self.search(MAX_NONCE)
    }

    fn search(&self, max_nonce: i64) -> Result<(i64, Vec<u8>)> {
        // The header is fixed apart from the trailing nonce, so build it once
        let mut data = self.prepare_data(0);
        let nonce_offset = data.len() - 8;

        for nonce in 0..max_nonce {
            data[nonce_offset..].copy_from_slice(&nonce.to_be_bytes());
            let hash = sha256_digest(data.as_slice());
            if self.meets_target(&hash) {
                info!(
                    "Found nonce {nonce} for hash {}",
                    HEXLOWER.encode(hash.as_slice())
                );
                return Ok((nonce, hash));
            }
            if nonce > 0 && nonce % PROGRESS_INTERVAL == 0 {
                debug!("Still mining, {nonce} nonces tried");
            }
        }

        Err(BlockchainError::Mining(format!(
            "Nonce space exhausted after {max_nonce} candidates"
        )))
    }

    fn meets_target(&self, hash: &[u8]) -> bool {
        BigUint::from_bytes_be(hash) < self.target
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Transaction;

    fn create_test_block() -> Block {
        let coinbase_tx = Transaction::new_coinbase_tx("Alice").unwrap();
        Block::new_block(&[coinbase_tx], &[]).unwrap()
    }

    #[test]
    fn test_target_is_power_of_two() {
        let block = create_test_block();
        let pow = ProofOfWork::new_proof_of_work(&block);
        assert_eq!(pow.target().bits(), u64::from(256 - TARGET_BITS + 1));
    }

    #[test]
    fn test_mined_block_validates() {
        let block = create_test_block();
        assert!(ProofOfWork::validate(&block));

        let hash_int = BigUint::from_bytes_be(block.get_hash());
        assert!(&hash_int < ProofOfWork::new_proof_of_work(&block).target());
    }

    #[test]
    fn test_wrong_nonce_fails_validation() {
        let mut block = create_test_block();
        block.set_nonce_for_test(block.get_nonce() + 1);
        assert!(!ProofOfWork::validate(&block));
    }

    #[test]
    fn test_run_is_deterministic() {
        let block = create_test_block();
        let pow = ProofOfWork::new_proof_of_work(&block);
        let (nonce, hash) = pow.run().unwrap();
        assert_eq!(nonce, block.get_nonce());
        assert_eq!(hash, block.get_hash());
    }

    #[test]
    fn test_prepare_data_layout() {
        let block = create_test_block();
        let pow = ProofOfWork::new_proof_of_work(&block);

        let data = pow.prepare_data(12345);
        assert_eq!(data, pow.prepare_data(12345));
        assert_ne!(data, pow.prepare_data(54321));

        // genesis has no previous hash: digest (32) + timestamp + bits + nonce
        assert_eq!(data.len(), 32 + 8 + 8 + 8);
        assert_eq!(&data[..32], block.hash_transactions().as_slice());
        assert_eq!(&data[data.len() - 8..], &12345i64.to_be_bytes());
    }

    #[test]
    fn test_exhausted_nonce_space_is_an_error() {
        let block = create_test_block();
        // target of 1 means only an all-zero hash would do
        let pow = ProofOfWork::with_target_bits(&block, 256);
        let result = pow.search(64);
        assert!(matches!(result, Err(BlockchainError::Mining(_))));
    }
}
