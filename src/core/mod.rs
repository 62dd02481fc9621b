//! Core ledger functionality
//!
//! Blocks, transactions, the persistent chain and its proof-of-work gate, plus the unspent-output
//! scanner that balances and new transfers are computed from.

pub mod block;
pub mod blockchain;
pub mod credential;
pub mod proof_of_work;
pub mod transaction;
pub mod utxo_set;

pub use block::Block;
pub use blockchain::{Blockchain, BlockchainIterator};
pub use credential::{CredentialVerifier, OpaqueCredentials};
pub use proof_of_work::{ProofOfWork, TARGET_BITS};
pub use transaction::{TXInput, TXOutput, Transaction, SUBSIDY};
pub use utxo_set::{UTXOSet, UnspentTransaction};
