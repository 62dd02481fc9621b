// Block and transaction codec. Everything persisted goes through bincode's standard config,
// so a value decoded from the store is field-for-field the value that was written.
use crate::error::{BlockchainError, Result};

pub fn serialize<T: bincode::Encode>(data: &T) -> Result<Vec<u8>> {
    bincode::encode_to_vec(data, bincode::config::standard())
        .map_err(|e| BlockchainError::Serialization(format!("Failed to encode value: {e}")))
}

/// Decode a value, rejecting trailing bytes so a truncated or padded record is never accepted.
pub fn deserialize<T: bincode::Decode<()>>(bytes: &[u8]) -> Result<T> {
    let (data, read) = bincode::decode_from_slice(bytes, bincode::config::standard())
        .map_err(|e| BlockchainError::Serialization(format!("Failed to decode value: {e}")))?;
    if read != bytes.len() {
        return Err(BlockchainError::Serialization(format!(
            "Trailing data after decoded value: {} of {} bytes consumed",
            read,
            bytes.len()
        )));
    }
    Ok(data)
}
