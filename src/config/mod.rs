//! Configuration management
//!
//! The only setting the ledger needs is where its store lives on disk.

pub mod settings;

pub use settings::{Config, DATA_DIR_KEY, GLOBAL_CONFIG};
