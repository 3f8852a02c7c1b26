//! Row conversion helpers shared by the PostgreSQL repositories.

use custodia_core::error::{StorageError, StorageResult};
use custodia_core::models::{Address, U256};

/// Convert a BYTEA column to a 20-byte address with a descriptive error.
pub(crate) fn bytes_to_address(bytes: Vec<u8>, field: &str) -> StorageResult<Address> {
    let arr: [u8; 20] = bytes.try_into().map_err(|v: Vec<u8>| {
        StorageError::SerializationError(format!(
            "{} has invalid length: expected 20, got {}",
            field,
            v.len()
        ))
    })?;
    Ok(Address(arr))
}

/// Parse a NUMERIC column (fetched as text) into a U256.
pub(crate) fn parse_u256(s: &str, field: &str) -> StorageResult<U256> {
    U256::from_dec_str(s).map_err(|e| {
        StorageError::SerializationError(format!("{} parse error: {} (value: {})", field, e, s))
    })
}
