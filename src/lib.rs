//! # powledger
//!
//! A single-node ledger that chains blocks of value transfers together by content hash, admits
//! each block only once it carries a proof-of-work, and tracks spendable value as unspent outputs.
//!
//! ## Layout
//! - `core/`: blocks, transactions, the proof-of-work engine, the sled-backed chain and its
//!   iterator, the unspent-output scanner and the credential verifier seam
//! - `config/`: where the store lives
//! - `utils/`: hashing, timestamps and the bincode codec
//! - `cli/`: command-line definitions used by the `powledger` binary
//!
//! ## Flow
//! A transfer is built from the sender's unspent outputs (`Transaction::new_utxo_transaction`),
//! handed to `Blockchain::mine_block`, which checks it, mines a block on the current tip, stores
//! the block under its hash and advances the tip. Later balance queries scan the whole chain again.

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod utils;

pub use cli::{Command, Opt};
pub use config::{Config, GLOBAL_CONFIG};
pub use core::{
    Block, Blockchain, BlockchainIterator, CredentialVerifier, OpaqueCredentials, ProofOfWork,
    TXInput, TXOutput, Transaction, UTXOSet, UnspentTransaction, SUBSIDY, TARGET_BITS,
};
pub use error::{BlockchainError, Result};
pub use utils::{current_timestamp, sha256_digest};
