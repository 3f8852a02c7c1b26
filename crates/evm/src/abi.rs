//! Minimal ABI encoding/decoding for the handful of calls and events the
//! reconciler consumes.
//!
//! Only what the five read functions and five event shapes need: 32-byte
//! word layout, static address/uint arguments, dynamic strings and
//! uint256 arrays. Decoders are tolerant - malformed return data yields
//! `None`, which callers surface as a reverted read or a skipped log.

use custodia_core::models::{Address, U256};

/// ABI word size in bytes.
pub const WORD: usize = 32;

// 4-byte function selectors (keccak-256 of the canonical signature).
/// `name()`
pub const SEL_NAME: [u8; 4] = [0x06, 0xfd, 0xde, 0x03];
/// `symbol()`
pub const SEL_SYMBOL: [u8; 4] = [0x95, 0xd8, 0x9b, 0x41];
/// `decimals()`
pub const SEL_DECIMALS: [u8; 4] = [0x31, 0x3c, 0xe5, 0x67];
/// `baseURI()`
pub const SEL_BASE_URI: [u8; 4] = [0x6c, 0x03, 0x60, 0xeb];
/// `computeAddress(address,uint256)`
pub const SEL_COMPUTE_ADDRESS: [u8; 4] = [0x36, 0xb5, 0xaa, 0x2d];

// =============================================================================
// Encoding
// =============================================================================

/// Encode a call with no arguments.
pub fn encode_call0(selector: [u8; 4]) -> Vec<u8> {
    selector.to_vec()
}

/// Encode `computeAddress(address,uint256)` calldata.
pub fn encode_compute_address(collection: &Address, token_id: &U256) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + 2 * WORD);
    data.extend_from_slice(&SEL_COMPUTE_ADDRESS);
    data.extend_from_slice(&address_word(collection));
    data.extend_from_slice(&u256_word(token_id));
    data
}

/// Left-pad an address into a 32-byte word.
fn address_word(address: &Address) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[WORD - 20..].copy_from_slice(&address.0);
    word
}

/// Big-endian 32-byte word for a U256.
fn u256_word(value: &U256) -> [u8; WORD] {
    value.to_big_endian()
}

// =============================================================================
// Decoding
// =============================================================================

/// Read the `index`-th 32-byte word.
fn word_at(data: &[u8], index: usize) -> Option<&[u8]> {
    let start = index.checked_mul(WORD)?;
    data.get(start..start + WORD)
}

/// Decode a single uint256 return value.
pub fn decode_u256(data: &[u8]) -> Option<U256> {
    word_at(data, 0).map(U256::from_big_endian)
}

/// Narrow a U256 to usize, rejecting oversized values.
fn to_usize(value: U256) -> Option<usize> {
    if value > U256::from(usize::MAX as u64) {
        return None;
    }
    Some(value.low_u64() as usize)
}

/// Decode a single uint return value that must fit in u32 (decimals).
pub fn decode_u32(data: &[u8]) -> Option<u32> {
    let value = decode_u256(data)?;
    if value > U256::from(u32::MAX) {
        return None;
    }
    Some(value.low_u32())
}

/// Decode a single address return value (right-aligned in its word).
pub fn decode_address(data: &[u8]) -> Option<Address> {
    let word = word_at(data, 0)?;
    // The 12 leading bytes must be zero padding.
    if word[..WORD - 20].iter().any(|b| *b != 0) {
        return None;
    }
    let mut address = [0u8; 20];
    address.copy_from_slice(&word[WORD - 20..]);
    Some(Address(address))
}

/// Decode a single dynamic string return value.
pub fn decode_string(data: &[u8]) -> Option<String> {
    let offset = to_usize(decode_u256(data)?)?;
    if offset % WORD != 0 {
        return None;
    }
    let len = to_usize(U256::from_big_endian(data.get(offset..offset + WORD)?))?;
    let bytes = data.get(offset + WORD..(offset + WORD).checked_add(len)?)?;
    String::from_utf8(bytes.to_vec()).ok()
}

/// Decode a dynamic uint256[] located at `head_index` of the data words.
pub fn decode_u256_array(data: &[u8], head_index: usize) -> Option<Vec<U256>> {
    let offset = to_usize(U256::from_big_endian(word_at(data, head_index)?))?;
    if offset % WORD != 0 {
        return None;
    }
    let len = to_usize(U256::from_big_endian(data.get(offset..offset + WORD)?))?;
    let mut values = Vec::with_capacity(len);
    for i in 0..len {
        let start = offset + WORD + i * WORD;
        values.push(U256::from_big_endian(data.get(start..start + WORD)?));
    }
    Some(values)
}

/// Extract the address packed into an indexed event topic.
pub fn topic_to_address(topic: &[u8; 32]) -> Address {
    let mut address = [0u8; 20];
    address.copy_from_slice(&topic[WORD - 20..]);
    Address(address)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address([byte; 20])
    }

    #[test]
    fn compute_address_calldata_layout() {
        let data = encode_compute_address(&addr(0xaa), &U256::from(7u64));
        assert_eq!(data.len(), 4 + 64);
        assert_eq!(&data[..4], &SEL_COMPUTE_ADDRESS);
        // L'adresse est alignée à droite dans son mot
        assert_eq!(&data[4..16], &[0u8; 12]);
        assert_eq!(&data[16..36], &[0xaa; 20]);
        // uint256 big-endian
        assert_eq!(data[4 + 63], 7);
    }

    #[test]
    fn decode_string_standard_layout() {
        // offset=32, len=3, "DAI" padded to a word
        let mut data = Vec::new();
        data.extend_from_slice(&u256_word(&U256::from(32u64)));
        data.extend_from_slice(&u256_word(&U256::from(3u64)));
        let mut tail = [0u8; 32];
        tail[..3].copy_from_slice(b"DAI");
        data.extend_from_slice(&tail);

        assert_eq!(decode_string(&data).as_deref(), Some("DAI"));
    }

    #[test]
    fn decode_string_rejects_truncated_payload() {
        let mut data = Vec::new();
        data.extend_from_slice(&u256_word(&U256::from(32u64)));
        data.extend_from_slice(&u256_word(&U256::from(100u64))); // len beyond payload
        assert_eq!(decode_string(&data), None);
        assert_eq!(decode_string(&[]), None);
    }

    #[test]
    fn decode_address_requires_clean_padding() {
        let mut word = [0u8; 32];
        word[12..].copy_from_slice(&[0xbb; 20]);
        assert_eq!(decode_address(&word), Some(addr(0xbb)));

        // Padding non nul = donnée invalide
        word[0] = 1;
        assert_eq!(decode_address(&word), None);
    }

    #[test]
    fn decode_u32_rejects_oversized_values() {
        assert_eq!(decode_u32(&u256_word(&U256::from(18u64))), Some(18));
        assert_eq!(decode_u32(&u256_word(&U256::from(u64::MAX))), None);
    }

    #[test]
    fn decode_u256_array_roundtrip() {
        // Head: one offset word pointing at the tail
        let mut data = Vec::new();
        data.extend_from_slice(&u256_word(&U256::from(32u64)));
        data.extend_from_slice(&u256_word(&U256::from(2u64)));
        data.extend_from_slice(&u256_word(&U256::from(5u64)));
        data.extend_from_slice(&u256_word(&U256::from(9u64)));

        let values = decode_u256_array(&data, 0).unwrap();
        assert_eq!(values, vec![U256::from(5u64), U256::from(9u64)]);
    }

    #[test]
    fn topic_address_extraction() {
        let mut topic = [0u8; 32];
        topic[12..].copy_from_slice(&[0xcc; 20]);
        assert_eq!(topic_to_address(&topic), addr(0xcc));
    }
}
