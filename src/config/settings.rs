use crate::error::{BlockchainError, Result};
use once_cell::sync::Lazy;
use std::env;
use std::path::PathBuf;

pub static GLOBAL_CONFIG: Lazy<Config> = Lazy::new(Config::from_env);

static DEFAULT_DATA_DIR: &str = "data";

pub const DATA_DIR_KEY: &str = "LEDGER_DATA_DIR";

#[derive(Debug, Clone, Default)]
pub struct Config {
    data_dir: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Config {
        Config {
            data_dir: env::var_os(DATA_DIR_KEY)
                .filter(|dir| !dir.is_empty())
                .map(PathBuf::from),
        }
    }

    /// Directory of the sled store: `LEDGER_DATA_DIR` when set, otherwise `./data`.
    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => env::current_dir()
                .map(|cwd| cwd.join(DEFAULT_DATA_DIR))
                .map_err(|e| BlockchainError::Config(format!("Cannot resolve working dir: {e}"))),
        }
    }
}
