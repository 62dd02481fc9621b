// The ledger: a sled store holding every block under its content hash, plus one reserved key
// pointing at the tip. Blocks are never rewritten; the tip is the only value that changes.

use crate::config::GLOBAL_CONFIG;
use crate::core::{Block, CredentialVerifier, OpaqueCredentials, Transaction};
use crate::error::{BlockchainError, Result};
use data_encoding::HEXLOWER;
use log::info;
use sled::transaction::TransactionError;
use sled::{Db, Tree};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

const TIP_BLOCK_HASH_KEY: &str = "tip_block_hash"; // Key to store the hash of the latest block
const BLOCKS_TREE: &str = "blocks"; // Tree name for storing all blocks

const HASH_LEN: usize = 32;

/// Handle on an opened ledger. The store is released when the handle is dropped.
pub struct Blockchain {
    tip_hash: Vec<u8>,
    blocks: Tree,
    db: Db,
    db_path: PathBuf,
    verifier: Box<dyn CredentialVerifier>,
}

impl Blockchain {
    /// Create a ledger in the configured data directory with a genesis block paying `address`.
    pub fn create(address: &str) -> Result<Blockchain> {
        Self::create_with_path(address, GLOBAL_CONFIG.data_dir()?)
    }

    /// Open the ledger in the configured data directory.
    pub fn open() -> Result<Blockchain> {
        Self::open_with_path(GLOBAL_CONFIG.data_dir()?)
    }

    pub fn create_with_path(address: &str, db_path: impl AsRef<Path>) -> Result<Blockchain> {
        let path = db_path.as_ref().to_path_buf();
        let (db, blocks) = Self::open_store(&path)?;

        if blocks.contains_key(TIP_BLOCK_HASH_KEY)? {
            return Err(BlockchainError::AlreadyExists(format!(
                "A ledger already exists at {}",
                path.display()
            )));
        }

        info!("Creating genesis block for address: {address}");
        let coinbase_tx = Transaction::new_coinbase_tx(address)?;
        let genesis = Block::generate_genesis_block(&coinbase_tx)?;
        Self::update_blocks_tree(&blocks, &genesis)?;
        db.flush()?;
        info!("Ledger created at {} with tip {}", path.display(), genesis.get_hash_hex());

        Ok(Blockchain {
            tip_hash: genesis.get_hash().to_vec(),
            blocks,
            db,
            db_path: path,
            verifier: Box::new(OpaqueCredentials),
        })
    }

    pub fn open_with_path(db_path: impl AsRef<Path>) -> Result<Blockchain> {
        let path = db_path.as_ref().to_path_buf();
        // Checked first so a missing ledger does not leave an empty store behind
        if !path.exists() {
            return Err(BlockchainError::NotFound(format!(
                "No ledger at {}. Create one first.",
                path.display()
            )));
        }

        let (db, blocks) = Self::open_store(&path)?;
        let tip_bytes = blocks.get(TIP_BLOCK_HASH_KEY)?.ok_or_else(|| {
            BlockchainError::NotFound(format!("No ledger at {}. Create one first.", path.display()))
        })?;
        if tip_bytes.len() != HASH_LEN {
            return Err(BlockchainError::Database(format!(
                "Tip hash has {} bytes, expected {HASH_LEN}",
                tip_bytes.len()
            )));
        }

        Ok(Blockchain {
            tip_hash: tip_bytes.to_vec(),
            blocks,
            db,
            db_path: path,
            verifier: Box::new(OpaqueCredentials),
        })
    }

    /// Install the capability that authorizes spends during [`Blockchain::mine_block`].
    pub fn with_verifier(mut self, verifier: impl CredentialVerifier + 'static) -> Blockchain {
        self.verifier = Box::new(verifier);
        self
    }

    fn open_store(path: &Path) -> Result<(Db, Tree)> {
        let db = sled::open(path)
            .map_err(|e| BlockchainError::Database(format!("Failed to open database: {e}")))?;
        let blocks = db
            .open_tree(BLOCKS_TREE)
            .map_err(|e| BlockchainError::Database(format!("Failed to open blocks tree: {e}")))?;
        Ok((db, blocks))
    }

    // The block goes in before the tip moves, both inside one sled transaction. A block that
    // never got a tip pointing at it is simply unreachable.
    fn update_blocks_tree(blocks: &Tree, block: &Block) -> Result<()> {
        let block_hash = block.get_hash();
        let block_data = block.serialize()?;

        blocks
            .transaction(|tx_db| {
                tx_db.insert(block_hash, block_data.as_slice())?;
                tx_db.insert(TIP_BLOCK_HASH_KEY, block_hash)?;
                Ok(())
            })
            .map_err(|e: TransactionError| {
                BlockchainError::Database(format!("Failed to update blocks tree: {e}"))
            })?;

        Ok(())
    }

    pub fn get_db_path(&self) -> &Path {
        self.db_path.as_path()
    }

    pub fn get_tip_hash(&self) -> &[u8] {
        self.tip_hash.as_slice()
    }

    /// Mine a block holding `transactions` on top of the current tip and make it the new tip.
    ///
    /// Every transaction is checked first; a rejected set leaves the store untouched.
    pub fn mine_block(&mut self, transactions: &[Transaction]) -> Result<Block> {
        for transaction in transactions {
            // Only the genesis block mints value
            if transaction.is_coinbase() {
                return Err(BlockchainError::Transaction(format!(
                    "Coinbase transaction {} cannot be mined after genesis",
                    HEXLOWER.encode(transaction.get_id())
                )));
            }
            transaction.verify(self, self.verifier.as_ref())?;
            if self.find_transaction(transaction.get_id())?.is_some() {
                return Err(BlockchainError::Transaction(format!(
                    "Transaction {} is already on the chain",
                    HEXLOWER.encode(transaction.get_id())
                )));
            }
        }
        Self::check_for_double_spending(transactions)?;

        info!(
            "Mining block on {} with {} transactions",
            HEXLOWER.encode(&self.tip_hash),
            transactions.len()
        );
        let block = Block::new_block(transactions, &self.tip_hash)?;

        Self::update_blocks_tree(&self.blocks, &block)?;
        self.db.flush()?;
        self.tip_hash = block.get_hash().to_vec();

        info!("Successfully mined block: {}", block.get_hash_hex());
        Ok(block)
    }

    /// Walk the chain from the current tip back to genesis.
    pub fn iterator(&self) -> BlockchainIterator {
        BlockchainIterator::new(self.tip_hash.clone(), self.blocks.clone())
    }

    pub fn get_block(&self, block_hash: &[u8]) -> Result<Option<Block>> {
        match self.blocks.get(block_hash)? {
            Some(bytes) => Ok(Some(Block::deserialize(bytes.as_ref())?)),
            None => Ok(None),
        }
    }

    pub fn block_count(&self) -> Result<usize> {
        let mut count = 0;
        for block in self.iterator() {
            block?;
            count += 1;
        }
        Ok(count)
    }

    pub fn find_transaction(&self, txid: &[u8]) -> Result<Option<Transaction>> {
        for block in self.iterator() {
            let block = block?;
            if let Some(tx) = block
                .get_transactions()
                .iter()
                .find(|tx| tx.get_id() == txid)
            {
                return Ok(Some(tx.clone()));
            }
        }
        Ok(None)
    }

    /// Whether any input anywhere on the chain already consumes `txid:vout`.
    pub fn is_output_spent(&self, txid: &[u8], vout: usize) -> Result<bool> {
        for block in self.iterator() {
            let block = block?;
            for transaction in block.get_transactions() {
                if transaction.is_coinbase() {
                    continue;
                }
                if transaction
                    .get_vin()
                    .iter()
                    .any(|input| input.get_txid() == txid && input.get_vout() == vout)
                {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    // Two transactions in the same block must not share an ID or consume the same output
    fn check_for_double_spending(transactions: &[Transaction]) -> Result<()> {
        let mut spent_outputs: HashSet<(&[u8], usize)> = HashSet::new();
        let mut tx_ids: HashSet<&[u8]> = HashSet::new();

        for (tx_index, transaction) in transactions.iter().enumerate() {
            if !tx_ids.insert(transaction.get_id()) {
                return Err(BlockchainError::Transaction(format!(
                    "Transaction {} appears twice in this block",
                    HEXLOWER.encode(transaction.get_id())
                )));
            }
            for input in transaction.get_vin() {
                if !spent_outputs.insert((input.get_txid(), input.get_vout())) {
                    return Err(BlockchainError::Transaction(format!(
                        "Double-spending detected in transaction {}: output {}:{} already spent in this block",
                        tx_index,
                        HEXLOWER.encode(input.get_txid()),
                        input.get_vout()
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Newest-to-oldest cursor over the blocks reachable from a tip.
///
/// Yields each block once and stops after genesis. A read or decode failure is yielded as an
/// error and ends the walk.
pub struct BlockchainIterator {
    blocks: Tree,
    current_hash: Vec<u8>,
}

impl BlockchainIterator {
    fn new(tip_hash: Vec<u8>, blocks: Tree) -> BlockchainIterator {
        BlockchainIterator {
            current_hash: tip_hash,
            blocks,
        }
    }

    fn load_current(&self) -> Result<Block> {
        let data = self.blocks.get(&self.current_hash)?.ok_or_else(|| {
            BlockchainError::Database(format!(
                "Block {} is referenced but missing from the store",
                HEXLOWER.encode(&self.current_hash)
            ))
        })?;
        Block::deserialize(data.as_ref())
    }
}

impl Iterator for BlockchainIterator {
    type Item = Result<Block>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_hash.is_empty() {
            return None;
        }

        let result = self.load_current();
        match &result {
            Ok(block) => self.current_hash = block.get_pre_block_hash().to_vec(),
            Err(_) => self.current_hash.clear(),
        }
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ProofOfWork, UTXOSet};
    use tempfile::tempdir;

    #[test]
    fn test_create_writes_genesis_and_tip() {
        let temp_dir = tempdir().unwrap();
        let chain = Blockchain::create_with_path("Alice", temp_dir.path().join("db")).unwrap();

        let genesis = chain.get_block(chain.get_tip_hash()).unwrap().unwrap();
        assert!(genesis.is_genesis());
        assert_eq!(genesis.get_transactions().len(), 1);
        assert!(genesis.get_transactions()[0].is_coinbase());

        let stored_tip = chain.blocks.get(TIP_BLOCK_HASH_KEY).unwrap().unwrap();
        assert_eq!(stored_tip.as_ref(), genesis.get_hash());
        assert_eq!(stored_tip.len(), HASH_LEN);
    }

    #[test]
    fn test_open_missing_ledger_is_not_found_and_creates_nothing() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("missing");

        let result = Blockchain::open_with_path(&path);
        assert!(matches!(result, Err(BlockchainError::NotFound(_))));
        assert!(!path.exists());
    }

    #[test]
    fn test_open_store_without_tip_is_not_found() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("empty");
        drop(Blockchain::open_store(&path).unwrap());

        let result = Blockchain::open_with_path(&path);
        assert!(matches!(result, Err(BlockchainError::NotFound(_))));
    }

    #[test]
    fn test_iterator_stops_after_genesis() {
        let temp_dir = tempdir().unwrap();
        let chain = Blockchain::create_with_path("Alice", temp_dir.path().join("db")).unwrap();

        let mut iter = chain.iterator();
        let genesis = iter.next().unwrap().unwrap();
        assert!(genesis.is_genesis());
        assert!(iter.next().is_none());
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_corrupt_block_surfaces_serialization_error() {
        let temp_dir = tempdir().unwrap();
        let chain = Blockchain::create_with_path("Alice", temp_dir.path().join("db")).unwrap();
        chain
            .blocks
            .insert(chain.get_tip_hash(), vec![0xFF, 0xFF, 0xFF])
            .unwrap();

        let mut iter = chain.iterator();
        assert!(matches!(
            iter.next(),
            Some(Err(BlockchainError::Serialization(_)))
        ));
        assert!(iter.next().is_none());
        assert!(chain.block_count().is_err());
    }

    #[test]
    fn test_mined_block_extends_tip() {
        let temp_dir = tempdir().unwrap();
        let mut chain = Blockchain::create_with_path("Alice", temp_dir.path().join("db")).unwrap();
        let genesis_hash = chain.get_tip_hash().to_vec();

        let tx = {
            let utxo_set = UTXOSet::new(&chain);
            Transaction::new_utxo_transaction("Alice", "Bob", 4, &utxo_set).unwrap()
        };
        let block = chain.mine_block(&[tx]).unwrap();

        assert_eq!(block.get_pre_block_hash(), genesis_hash.as_slice());
        assert_eq!(chain.get_tip_hash(), block.get_hash());
        assert!(ProofOfWork::validate(&block));
        assert_eq!(chain.block_count().unwrap(), 2);
    }

    #[test]
    fn test_double_spend_within_block_is_rejected() {
        let temp_dir = tempdir().unwrap();
        let mut chain = Blockchain::create_with_path("Alice", temp_dir.path().join("db")).unwrap();

        let (first, second) = {
            let utxo_set = UTXOSet::new(&chain);
            (
                Transaction::new_utxo_transaction("Alice", "Bob", 4, &utxo_set).unwrap(),
                Transaction::new_utxo_transaction("Alice", "Carol", 5, &utxo_set).unwrap(),
            )
        };
        let result = chain.mine_block(&[first, second]);

        assert!(matches!(result, Err(BlockchainError::Transaction(_))));
        assert_eq!(chain.block_count().unwrap(), 1);
    }

    #[test]
    fn test_duplicate_transaction_id_is_rejected() {
        let temp_dir = tempdir().unwrap();
        let mut chain = Blockchain::create_with_path("Alice", temp_dir.path().join("db")).unwrap();

        // a zero-value transfer has no inputs, so identical builds share an ID
        let empty_transfer = {
            let utxo_set = UTXOSet::new(&chain);
            Transaction::new_utxo_transaction("Alice", "Bob", 0, &utxo_set).unwrap()
        };
        assert!(empty_transfer.get_vin().is_empty());

        let twice_in_block = chain.mine_block(&[empty_transfer.clone(), empty_transfer.clone()]);
        assert!(matches!(
            twice_in_block,
            Err(BlockchainError::Transaction(_))
        ));
        assert_eq!(chain.block_count().unwrap(), 1);

        chain.mine_block(&[empty_transfer.clone()]).unwrap();
        let already_on_chain = chain.mine_block(&[empty_transfer]);
        assert!(matches!(
            already_on_chain,
            Err(BlockchainError::Transaction(_))
        ));
        assert_eq!(chain.block_count().unwrap(), 2);
    }

    #[test]
    fn test_verifier_rejection_leaves_chain_untouched() {
        let temp_dir = tempdir().unwrap();
        let mut chain = Blockchain::create_with_path("Alice", temp_dir.path().join("db"))
            .unwrap()
            .with_verifier(|credential: &str, _message: &[u8]| credential != "Alice");
        let tip_before = chain.get_tip_hash().to_vec();

        let tx = {
            let utxo_set = UTXOSet::new(&chain);
            Transaction::new_utxo_transaction("Alice", "Bob", 4, &utxo_set).unwrap()
        };
        let result = chain.mine_block(&[tx]);

        assert!(matches!(result, Err(BlockchainError::Transaction(_))));
        assert_eq!(chain.get_tip_hash(), tip_before.as_slice());
    }
}
