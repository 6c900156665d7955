//! Pluggable record-batch compression codecs (§4.2).
//!
//! The codec in use is carried in the low 3 bits of a record batch's `attributes` field. Each
//! variant below is feature-gated so a build can drop codecs it has no broker configured for;
//! attempting to decode a batch compressed with a codec this build lacks surfaces as
//! `ErrorKind::UnsupportedCompression` rather than a silent corruption.

use bytes::Bytes;

use crate::errors::{Error, ErrorKind, Result};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Snappy,
    Lz4,
    Zstd,
}

impl Compression {
    pub fn from_attributes(attributes: i16) -> Result<Self> {
        match attributes & 0x07 {
            0 => Ok(Compression::None),
            1 => Ok(Compression::Gzip),
            2 => Ok(Compression::Snappy),
            3 => Ok(Compression::Lz4),
            4 => Ok(Compression::Zstd),
            other => Err(ErrorKind::UnsupportedCompression(other as u8).into()),
        }
    }

    pub fn attributes_bits(self) -> i16 {
        match self {
            Compression::None => 0,
            Compression::Gzip => 1,
            Compression::Snappy => 2,
            Compression::Lz4 => 3,
            Compression::Zstd => 4,
        }
    }

    pub fn compress(self, data: &[u8]) -> Result<Vec<u8>> {
        match self {
            Compression::None => Ok(data.to_vec()),
            Compression::Gzip => gzip::compress(data),
            Compression::Snappy => snappy::compress(data),
            Compression::Lz4 => lz4::compress(data),
            Compression::Zstd => zstd_codec::compress(data),
        }
    }

    pub fn decompress(self, data: &[u8]) -> Result<Bytes> {
        match self {
            Compression::None => Ok(Bytes::copy_from_slice(data)),
            Compression::Gzip => gzip::decompress(data),
            Compression::Snappy => snappy::decompress(data),
            Compression::Lz4 => lz4::decompress(data),
            Compression::Zstd => zstd_codec::decompress(data),
        }
    }
}

fn unsupported(codec: Compression) -> Error {
    ErrorKind::UnsupportedCompression(codec.attributes_bits() as u8).into()
}

#[cfg(feature = "gzip")]
mod gzip {
    use super::*;
    use std::io::{Read, Write};

    use flate2::read::GzDecoder;
    use flate2::write::GzEncoder;
    use flate2::Compression as GzLevel;

    pub fn compress(data: &[u8]) -> Result<Vec<u8>> {
        let mut enc = GzEncoder::new(Vec::new(), GzLevel::default());
        enc.write_all(data)?;
        Ok(enc.finish()?)
    }

    pub fn decompress(data: &[u8]) -> Result<Bytes> {
        let mut dec = GzDecoder::new(data);
        let mut out = Vec::new();
        dec.read_to_end(&mut out)?;
        Ok(Bytes::from(out))
    }
}

#[cfg(not(feature = "gzip"))]
mod gzip {
    use super::*;
    pub fn compress(_data: &[u8]) -> Result<Vec<u8>> {
        Err(unsupported(Compression::Gzip))
    }
    pub fn decompress(_data: &[u8]) -> Result<Bytes> {
        Err(unsupported(Compression::Gzip))
    }
}

#[cfg(feature = "snappy")]
mod snappy {
    use super::*;

    pub fn compress(data: &[u8]) -> Result<Vec<u8>> {
        let mut enc = snap::raw::Encoder::new();
        enc.compress_vec(data)
            .map_err(|e| ErrorKind::CodecError(format!("snappy: {}", e)).into())
    }

    pub fn decompress(data: &[u8]) -> Result<Bytes> {
        let mut dec = snap::raw::Decoder::new();
        let out = dec
            .decompress_vec(data)
            .map_err(|e| ErrorKind::CodecError(format!("snappy: {}", e)))?;
        Ok(Bytes::from(out))
    }
}

#[cfg(not(feature = "snappy"))]
mod snappy {
    use super::*;
    pub fn compress(_data: &[u8]) -> Result<Vec<u8>> {
        Err(unsupported(Compression::Snappy))
    }
    pub fn decompress(_data: &[u8]) -> Result<Bytes> {
        Err(unsupported(Compression::Snappy))
    }
}

#[cfg(feature = "lz4")]
mod lz4 {
    use super::*;

    pub fn compress(data: &[u8]) -> Result<Vec<u8>> {
        Ok(lz4_flex::block::compress_prepend_size(data))
    }

    pub fn decompress(data: &[u8]) -> Result<Bytes> {
        let out = lz4_flex::block::decompress_size_prepended(data)
            .map_err(|e| ErrorKind::CodecError(format!("lz4: {}", e)))?;
        Ok(Bytes::from(out))
    }
}

#[cfg(not(feature = "lz4"))]
mod lz4 {
    use super::*;
    pub fn compress(_data: &[u8]) -> Result<Vec<u8>> {
        Err(unsupported(Compression::Lz4))
    }
    pub fn decompress(_data: &[u8]) -> Result<Bytes> {
        Err(unsupported(Compression::Lz4))
    }
}

#[cfg(feature = "zstd")]
mod zstd_codec {
    use super::*;

    pub fn compress(data: &[u8]) -> Result<Vec<u8>> {
        zstd::stream::encode_all(data, 0).map_err(|e| ErrorKind::Io(e).into())
    }

    pub fn decompress(data: &[u8]) -> Result<Bytes> {
        let out = zstd::stream::decode_all(data).map_err(ErrorKind::Io)?;
        Ok(Bytes::from(out))
    }
}

#[cfg(not(feature = "zstd"))]
mod zstd_codec {
    use super::*;
    pub fn compress(_data: &[u8]) -> Result<Vec<u8>> {
        Err(unsupported(Compression::Zstd))
    }
    pub fn decompress(_data: &[u8]) -> Result<Bytes> {
        Err(unsupported(Compression::Zstd))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_round_trips_identity() {
        let data = b"hello kafka";
        let compressed = Compression::None.compress(data).unwrap();
        let decompressed = Compression::None.decompress(&compressed).unwrap();
        assert_eq!(&decompressed[..], data);
    }

    #[cfg(feature = "gzip")]
    #[test]
    fn gzip_round_trips() {
        let data = b"the quick brown fox jumps over the lazy dog".repeat(10);
        let compressed = Compression::Gzip.compress(&data).unwrap();
        let decompressed = Compression::Gzip.decompress(&compressed).unwrap();
        assert_eq!(&decompressed[..], &data[..]);
    }

    #[cfg(feature = "lz4")]
    #[test]
    fn lz4_round_trips() {
        let data = b"the quick brown fox jumps over the lazy dog".repeat(10);
        let compressed = Compression::Lz4.compress(&data).unwrap();
        let decompressed = Compression::Lz4.decompress(&compressed).unwrap();
        assert_eq!(&decompressed[..], &data[..]);
    }

    #[test]
    fn unknown_codec_bits_are_rejected() {
        assert!(Compression::from_attributes(0x05).is_err());
    }

    #[cfg(not(feature = "snappy"))]
    #[test]
    fn a_codec_missing_from_the_build_reports_unsupported_compression() {
        let err = Compression::Snappy.decompress(b"data").unwrap_err();
        match err.kind() {
            ErrorKind::UnsupportedCompression(codec) => {
                assert_eq!(*codec, Compression::Snappy.attributes_bits() as u8)
            }
            other => panic!("expected UnsupportedCompression, got {:?}", other),
        }
    }

    #[test]
    fn attributes_round_trip_through_bits() {
        for c in [
            Compression::None,
            Compression::Gzip,
            Compression::Snappy,
            Compression::Lz4,
            Compression::Zstd,
        ] {
            assert_eq!(Compression::from_attributes(c.attributes_bits()).unwrap(), c);
        }
    }
}
