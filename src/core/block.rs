use crate::core::{ProofOfWork, Transaction};
use crate::error::{BlockchainError, Result};
use crate::utils::{current_timestamp, deserialize, serialize, sha256_digest};
use data_encoding::HEXLOWER;
use log::info;
use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct Block {
    timestamp: i64,
    transactions: Vec<Transaction>,
    pre_block_hash: Vec<u8>, // empty for genesis
    hash: Vec<u8>,
    nonce: i64,
}

impl Block {
    /// Assemble a block on top of `pre_block_hash` and mine it.
    pub fn new_block(transactions: &[Transaction], pre_block_hash: &[u8]) -> Result<Block> {
        if transactions.is_empty() {
            return Err(BlockchainError::Transaction(
                "Block must contain at least one transaction".to_string(),
            ));
        }

        let mut block = Block {
            timestamp: current_timestamp()?,
            transactions: transactions.to_vec(),
            pre_block_hash: pre_block_hash.to_vec(),
            hash: vec![],
            nonce: 0,
        };

        info!(
            "Starting proof-of-work for block with {} transactions",
            block.transactions.len()
        );
        let (nonce, hash) = ProofOfWork::new_proof_of_work(&block).run()?;
        block.nonce = nonce;
        block.hash = hash;
        info!("Proof-of-work completed for block: {}", block.get_hash_hex());

        Ok(block)
    }

    pub fn generate_genesis_block(coinbase: &Transaction) -> Result<Block> {
        Block::new_block(std::slice::from_ref(coinbase), &[])
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Block> {
        deserialize::<Block>(bytes)
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        serialize(self)
    }

    /// SHA-256 over the concatenated transaction IDs, in block order.
    ///
    /// This is a flat digest rather than a Merkle root; reordering the transactions changes it,
    /// and with it the block hash.
    pub fn hash_transactions(&self) -> Vec<u8> {
        let mut tx_ids = vec![];
        for transaction in &self.transactions {
            tx_ids.extend_from_slice(transaction.get_id());
        }

        sha256_digest(tx_ids.as_slice())
    }

    pub fn get_transactions(&self) -> &[Transaction] {
        self.transactions.as_slice()
    }

    pub fn get_pre_block_hash(&self) -> &[u8] {
        self.pre_block_hash.as_slice()
    }

    pub fn get_hash(&self) -> &[u8] {
        self.hash.as_slice()
    }

    pub fn get_hash_hex(&self) -> String {
        HEXLOWER.encode(self.hash.as_slice())
    }

    pub fn get_timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn get_nonce(&self) -> i64 {
        self.nonce
    }

    pub fn is_genesis(&self) -> bool {
        self.pre_block_hash.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn set_nonce_for_test(&mut self, nonce: i64) {
        self.nonce = nonce;
    }
}
