//! Binary key layouts for the index databases.

use std::borrow::Cow;

use txindex_types::TxHash;

use crate::LmdbError;

/// Escape byte. Inside a tag or value `0x00` is written as `0x00 0xFF`;
/// `0x00 0x01` ends the component.
const ESC: u8 = 0x00;
const ESC_LITERAL: u8 = 0xFF;
const ESC_END: u8 = 0x01;

/// Length of the `height_be(8) ++ index_be(4)` position suffix.
pub const POSITION_LEN: usize = 12;

/// Increment a byte prefix to get the exclusive upper bound of its range.
///
/// An all-`0xFF` prefix has no upper bound; it is left as an empty vector,
/// which callers treat as unbounded.
pub fn increment_prefix(prefix: &mut Vec<u8>) {
    while let Some(last) = prefix.last_mut() {
        if *last < 0xFF {
            *last += 1;
            return;
        }
        prefix.pop();
    }
}

/// `height_be(8) ++ index_be(4)`, the key of `height_index`.
pub fn position_key(height: u64, index: u32) -> [u8; POSITION_LEN] {
    let mut key = [0u8; POSITION_LEN];
    key[..8].copy_from_slice(&height.to_be_bytes());
    key[8..].copy_from_slice(&index.to_be_bytes());
    key
}

pub fn decode_position(bytes: &[u8]) -> Result<(u64, u32), LmdbError> {
    if bytes.len() != POSITION_LEN {
        return Err(LmdbError::Corruption(format!(
            "position key has {} bytes",
            bytes.len()
        )));
    }
    let mut h = [0u8; 8];
    h.copy_from_slice(&bytes[..8]);
    let mut i = [0u8; 4];
    i.copy_from_slice(&bytes[8..]);
    Ok((u64::from_be_bytes(h), u32::from_be_bytes(i)))
}

/// Append `component` escaped, followed by the end marker.
fn push_component(key: &mut Vec<u8>, component: &str) {
    for &b in component.as_bytes() {
        key.push(b);
        if b == ESC {
            key.push(ESC_LITERAL);
        }
    }
    key.extend_from_slice(&[ESC, ESC_END]);
}

/// Reverse of [`push_component`] for a body without its end marker.
fn unescape(body: &[u8]) -> Result<Cow<'_, [u8]>, LmdbError> {
    if !body.contains(&ESC) {
        return Ok(Cow::Borrowed(body));
    }
    let mut out = Vec::with_capacity(body.len());
    let mut bytes = body.iter();
    while let Some(&b) = bytes.next() {
        out.push(b);
        if b == ESC && bytes.next() != Some(&ESC_LITERAL) {
            return Err(LmdbError::Corruption("bad escape in event key".into()));
        }
    }
    Ok(Cow::Owned(out))
}

/// Escaped `tag` plus end marker: every event-index key for `tag` starts with this.
pub fn event_tag_prefix(tag: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(tag.len() + 2);
    push_component(&mut key, tag);
    key
}

/// Escaped tag and value, each with an end marker: every key for this exact value.
pub fn event_value_prefix(tag: &str, value: &str) -> Vec<u8> {
    let mut key = event_tag_prefix(tag);
    push_component(&mut key, value);
    key
}

pub fn event_key(tag: &str, value: &str, height: u64, index: u32) -> Vec<u8> {
    let mut key = event_value_prefix(tag, value);
    key.extend_from_slice(&position_key(height, index));
    key
}

/// Split an event key found under `tag_prefix` into `(value, height, index)`.
pub fn decode_event_key<'k>(
    tag_prefix: &[u8],
    key: &'k [u8],
) -> Result<(Cow<'k, str>, u64, u32), LmdbError> {
    let min_len = tag_prefix.len() + 2 + POSITION_LEN;
    if key.len() < min_len || !key.starts_with(tag_prefix) {
        return Err(LmdbError::Corruption("malformed event key".into()));
    }
    let pos_start = key.len() - POSITION_LEN;
    let body_end = pos_start - 2;
    if key[body_end..pos_start] != [ESC, ESC_END] {
        return Err(LmdbError::Corruption("event key missing separator".into()));
    }
    let value = match unescape(&key[tag_prefix.len()..body_end])? {
        Cow::Borrowed(raw) => Cow::Borrowed(
            std::str::from_utf8(raw).map_err(|e| LmdbError::Corruption(e.to_string()))?,
        ),
        Cow::Owned(raw) => Cow::Owned(
            String::from_utf8(raw).map_err(|e| LmdbError::Corruption(e.to_string()))?,
        ),
    };
    let (height, index) = decode_position(&key[pos_start..])?;
    Ok((value, height, index))
}

pub fn decode_hash(bytes: &[u8]) -> Result<TxHash, LmdbError> {
    TxHash::from_slice(bytes).map_err(|e| LmdbError::Corruption(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increment_simple() {
        let mut p = vec![0x01, 0x02];
        increment_prefix(&mut p);
        assert_eq!(p, vec![0x01, 0x03]);
    }

    #[test]
    fn increment_carries_over_ff() {
        let mut p = vec![0x01, 0xFF];
        increment_prefix(&mut p);
        assert_eq!(p, vec![0x02]);
        let mut p = vec![0xFF, 0xFF];
        increment_prefix(&mut p);
        assert!(p.is_empty());
    }

    #[test]
    fn position_keys_sort_numerically() {
        assert!(position_key(2, 0) > position_key(1, u32::MAX));
        assert!(position_key(1, 2) > position_key(1, 1));
        assert_eq!(decode_position(&position_key(77, 3)).unwrap(), (77, 3));
    }

    #[test]
    fn event_key_roundtrip() {
        let key = event_key("transfer.amount", "100", 9, 2);
        let prefix = event_tag_prefix("transfer.amount");
        let (value, height, index) = decode_event_key(&prefix, &key).unwrap();
        assert_eq!((value.as_ref(), height, index), ("100", 9, 2));
    }

    #[test]
    fn empty_value_is_representable() {
        let key = event_key("a.b", "", 1, 0);
        let (value, height, index) = decode_event_key(&event_tag_prefix("a.b"), &key).unwrap();
        assert_eq!((value.as_ref(), height, index), ("", 1, 0));
    }

    #[test]
    fn value_prefix_does_not_match_longer_value() {
        let key = event_key("a.b", "100", 1, 0);
        assert!(!key.starts_with(&event_value_prefix("a.b", "10")));
        assert!(key.starts_with(&event_value_prefix("a.b", "100")));
    }

    #[test]
    fn nul_bytes_survive_escaping() {
        let prefix = event_tag_prefix("memo.text");
        let key = event_key("memo.text", "a\0b", 3, 1);
        let (value, height, index) = decode_event_key(&prefix, &key).unwrap();
        assert_eq!((value.as_ref(), height, index), ("a\0b", 3, 1));
        assert!(key.starts_with(&event_value_prefix("memo.text", "a\0b")));
        // "a" must not select the keys of "a\0b" and vice versa.
        assert!(!key.starts_with(&event_value_prefix("memo.text", "a")));
        assert!(!event_key("memo.text", "a", 3, 1)
            .starts_with(&event_value_prefix("memo.text", "a\0b")));
    }

    #[test]
    fn nul_in_tag_keeps_tags_apart() {
        let key = event_key("a\0b.c", "v", 1, 0);
        assert!(!key.starts_with(&event_tag_prefix("a")));
        let prefix = event_tag_prefix("a\0b.c");
        let (value, _, _) = decode_event_key(&prefix, &key).unwrap();
        assert_eq!(value, "v");
    }

    #[test]
    fn dangling_escape_is_corruption() {
        let prefix = event_tag_prefix("a.b");
        let mut key = prefix.clone();
        key.extend_from_slice(&[b'x', 0x00, 0x07, 0x00, 0x01]);
        key.extend_from_slice(&position_key(1, 0));
        assert!(matches!(
            decode_event_key(&prefix, &key),
            Err(LmdbError::Corruption(_))
        ));
    }

    #[test]
    fn truncated_event_key_is_corruption() {
        let prefix = event_tag_prefix("a.b");
        assert!(matches!(
            decode_event_key(&prefix, b"a.b\0\x01x"),
            Err(LmdbError::Corruption(_))
        ));
    }
}
