//! Row key layout of the in-memory engine.
//!
//! ```text
//! 't' | table_id (u64, BE) | '_' 'r' | handle (i64, sign-flipped BE)
//! ```
//!
//! Flipping the sign bit makes the byte order of handles match their
//! numeric order, so key ranges are handle ranges.

use bytes::{BufMut, Bytes, BytesMut};

const TABLE_PREFIX: u8 = b't';
const RECORD_SEP: &[u8; 2] = b"_r";
const SIGN_MASK: u64 = 1 << 63;

/// Length of an encoded row key.
pub const ROW_KEY_LEN: usize = 1 + 8 + 2 + 8;

/// Encodes the key of row `handle` in table `table_id`.
pub fn encode_row_key(table_id: u64, handle: i64) -> Bytes {
    let mut buf = BytesMut::with_capacity(ROW_KEY_LEN);
    buf.put_slice(&record_prefix(table_id));
    buf.put_u64((handle as u64) ^ SIGN_MASK);
    buf.freeze()
}

/// Decodes the handle of a row key, if it is one.
pub fn decode_handle(key: &[u8]) -> Option<i64> {
    if key.len() != ROW_KEY_LEN || key[0] != TABLE_PREFIX || &key[9..11] != RECORD_SEP {
        return None;
    }
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&key[11..]);
    Some((u64::from_be_bytes(raw) ^ SIGN_MASK) as i64)
}

/// Smallest key of any row in `table_id`.
pub fn table_start(table_id: u64) -> Bytes {
    Bytes::copy_from_slice(&record_prefix(table_id))
}

/// Smallest key strictly above every row in `table_id`.
pub fn table_end(table_id: u64) -> Bytes {
    let mut buf = BytesMut::with_capacity(11);
    buf.put_u8(TABLE_PREFIX);
    buf.put_u64(table_id);
    buf.put_slice(b"_s");
    buf.freeze()
}

fn record_prefix(table_id: u64) -> [u8; 11] {
    let mut prefix = [0u8; 11];
    prefix[0] = TABLE_PREFIX;
    prefix[1..9].copy_from_slice(&table_id.to_be_bytes());
    prefix[9..11].copy_from_slice(RECORD_SEP);
    prefix
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_order_matches_key_order() {
        let handles = [i64::MIN, -5, -1, 0, 1, 42, i64::MAX];
        let keys: Vec<Bytes> = handles.iter().map(|&h| encode_row_key(7, h)).collect();
        for pair in keys.windows(2) {
            assert!(pair[0] < pair[1]);
        }
        for (key, handle) in keys.iter().zip(handles) {
            assert_eq!(decode_handle(key), Some(handle));
        }
    }

    #[test]
    fn test_table_bounds() {
        let key = encode_row_key(3, 99);
        assert!(key >= table_start(3));
        assert!(key < table_end(3));
        assert!(table_end(3) <= table_start(4));
        assert!(decode_handle(&table_start(3)).is_none());
    }
}
