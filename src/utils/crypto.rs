use ring::digest::{Context, SHA256};

use crate::error::{BlockchainError, Result};
use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds since the Unix epoch
pub fn current_timestamp() -> Result<i64> {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| BlockchainError::Config(format!("System time error: {e}")))?
        .as_secs();

    i64::try_from(secs).map_err(|_| BlockchainError::Config("Timestamp overflow".to_string()))
}

pub fn sha256_digest(data: &[u8]) -> Vec<u8> {
    let mut context = Context::new(&SHA256);
    context.update(data);
    let digest = context.finish();
    digest.as_ref().to_vec()
}
