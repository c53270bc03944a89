//! Field values and types.
//!
//! Closed set of field types (spec: `INT` and fixed-length `STRING`),
//! collapsed into a plain value enum rather than the `Box<dyn Cell>`
//! trait-object hierarchy older revisions of this codebase used — a closed
//! enum expresses a closed set directly and gives equality/hashing for
//! free.

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::{DbError, DbResult};

/// Width, in bytes, of a fixed-length `STRING` field's on-disk
/// representation.
pub const STRING_FIELD_LEN: usize = 128;

#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum FieldType {
    Int,
    /// Fixed-length byte string of `STRING_FIELD_LEN` bytes on disk.
    String,
}

impl FieldType {
    /// On-disk width in bytes of a field of this type.
    pub fn byte_len(self) -> usize {
        match self {
            FieldType::Int => 4,
            FieldType::String => STRING_FIELD_LEN,
        }
    }
}

#[derive(Clone, Debug)]
pub enum Field {
    Int(i32),
    String(String),
}

impl Field {
    pub fn field_type(&self) -> FieldType {
        match self {
            Field::Int(_) => FieldType::Int,
            Field::String(_) => FieldType::String,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Field::Int(v) => Some(*v),
            Field::String(_) => None,
        }
    }

    /// Rejects a `String` field whose UTF-8 byte length exceeds the
    /// fixed-width `STRING_FIELD_LEN` representation it serializes to.
    /// `STRING` is "fixed-length, comparable by content" — a value that
    /// doesn't fit must be rejected up front rather than silently
    /// truncated on its first write to disk.
    pub fn validate(&self) -> DbResult<()> {
        if let Field::String(s) = self {
            let len = s.as_bytes().len();
            if len > STRING_FIELD_LEN {
                return Err(DbError::illegal_argument(format!(
                    "string field is {} bytes, exceeds the {}-byte fixed width",
                    len, STRING_FIELD_LEN
                )));
            }
        }
        Ok(())
    }

    /// Serializes this field into exactly `field_type().byte_len()` bytes.
    /// Callers that accept untrusted field values must call `validate()`
    /// first (`HeapPage::insert_tuple` does this for every tuple it
    /// stores); in debug builds an oversized `String` trips the assert
    /// below instead of silently losing bytes.
    pub fn serialize(&self) -> Vec<u8> {
        match self {
            Field::Int(v) => v.to_be_bytes().to_vec(),
            Field::String(s) => {
                let bytes = s.as_bytes();
                debug_assert!(
                    bytes.len() <= STRING_FIELD_LEN,
                    "string field is {} bytes, exceeds the {}-byte fixed width",
                    bytes.len(),
                    STRING_FIELD_LEN
                );
                let mut buf = vec![0u8; STRING_FIELD_LEN];
                let n = bytes.len().min(STRING_FIELD_LEN);
                buf[..n].copy_from_slice(&bytes[..n]);
                buf
            }
        }
    }

    /// Reads a field of `field_type` from the front of `bytes`.
    pub fn deserialize(field_type: FieldType, bytes: &[u8]) -> Field {
        match field_type {
            FieldType::Int => {
                let mut arr = [0u8; 4];
                arr.copy_from_slice(&bytes[..4]);
                Field::Int(i32::from_be_bytes(arr))
            }
            FieldType::String => {
                let end = bytes
                    .iter()
                    .position(|&b| b == 0)
                    .unwrap_or(STRING_FIELD_LEN);
                let s = String::from_utf8_lossy(&bytes[..end]).into_owned();
                Field::String(s)
            }
        }
    }
}

impl PartialEq for Field {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Field::Int(a), Field::Int(b)) => a == b,
            (Field::String(a), Field::String(b)) => a == b,
            _ => false,
        }
    }
}
impl Eq for Field {}

impl Hash for Field {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Field::Int(v) => {
                0u8.hash(state);
                v.hash(state);
            }
            Field::String(s) => {
                1u8.hash(state);
                s.hash(state);
            }
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Field::Int(v) => write!(f, "{}", v),
            Field::String(s) => write!(f, "{}", s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_within_width_validates_and_round_trips() {
        let f = Field::String("hello".to_string());
        assert!(f.validate().is_ok());
        let bytes = f.serialize();
        assert_eq!(bytes.len(), STRING_FIELD_LEN);
        assert_eq!(Field::deserialize(FieldType::String, &bytes), f);
    }

    #[test]
    fn string_over_width_fails_validation() {
        let f = Field::String("x".repeat(STRING_FIELD_LEN + 1));
        assert!(f.validate().is_err());
    }

    #[test]
    fn string_exactly_at_width_validates() {
        let f = Field::String("x".repeat(STRING_FIELD_LEN));
        assert!(f.validate().is_ok());
    }

    #[test]
    fn int_always_validates() {
        assert!(Field::Int(i32::MAX).validate().is_ok());
    }
}
