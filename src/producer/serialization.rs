//! Pluggable key/value serializers, so callers can hand the producer typed values instead of
//! pre-encoded bytes.

use bytes::Bytes;

use crate::errors::Result;

pub trait Serializer<T>: Send + Sync {
    fn serialize(&self, topic: &str, value: &T) -> Result<Bytes>;
}

/// Passes `Bytes` straight through.
#[derive(Default, Clone, Copy)]
pub struct BytesSerializer;

impl Serializer<Bytes> for BytesSerializer {
    fn serialize(&self, _topic: &str, value: &Bytes) -> Result<Bytes> {
        Ok(value.clone())
    }
}

/// Passes `Vec<u8>` straight through.
#[derive(Default, Clone, Copy)]
pub struct RawSerializer;

impl Serializer<Vec<u8>> for RawSerializer {
    fn serialize(&self, _topic: &str, value: &Vec<u8>) -> Result<Bytes> {
        Ok(Bytes::copy_from_slice(value))
    }
}

/// Encodes `String`/`&str` values as UTF-8.
#[derive(Default, Clone, Copy)]
pub struct StrEncodingSerializer;

impl Serializer<String> for StrEncodingSerializer {
    fn serialize(&self, _topic: &str, value: &String) -> Result<Bytes> {
        Ok(Bytes::copy_from_slice(value.as_bytes()))
    }
}

/// Always produces an empty payload; useful for tombstones or key-only records.
#[derive(Default, Clone, Copy)]
pub struct NoopSerializer;

impl Serializer<()> for NoopSerializer {
    fn serialize(&self, _topic: &str, _value: &()) -> Result<Bytes> {
        Ok(Bytes::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn str_serializer_encodes_utf8() {
        let s = StrEncodingSerializer;
        let encoded = s.serialize("topic", &"hello".to_owned()).unwrap();
        assert_eq!(&encoded[..], b"hello");
    }

    #[test]
    fn noop_serializer_is_always_empty() {
        let s = NoopSerializer;
        assert!(s.serialize("topic", &()).unwrap().is_empty());
    }
}
