//! Unsigned LEB128-style varints and zigzag-encoded signed varints (§4.1).
//!
//! These are the building blocks for compact-encoding lengths (strings, bytes, arrays) and for
//! the record-batch's delta-encoded offsets and timestamps.

use bytes::{Buf, BufMut};

use crate::errors::{ErrorKind, Result};

/// Longest byte sequence a 32-bit unsigned varint can take.
const MAX_VARINT32_BYTES: usize = 5;
/// Longest byte sequence a 64-bit unsigned varint can take.
const MAX_VARINT64_BYTES: usize = 10;

pub fn zigzag_encode32(n: i32) -> u32 {
    ((n << 1) ^ (n >> 31)) as u32
}

pub fn zigzag_decode32(n: u32) -> i32 {
    ((n >> 1) as i32) ^ -((n & 1) as i32)
}

pub fn zigzag_encode64(n: i64) -> u64 {
    ((n << 1) ^ (n >> 63)) as u64
}

pub fn zigzag_decode64(n: u64) -> i64 {
    ((n >> 1) as i64) ^ -((n & 1) as i64)
}

pub fn write_unsigned_varint32<B: BufMut>(mut value: u32, buf: &mut B) {
    loop {
        if value & !0x7f == 0 {
            buf.put_u8(value as u8);
            return;
        }
        buf.put_u8((value as u8 & 0x7f) | 0x80);
        value >>= 7;
    }
}

pub fn write_unsigned_varint64<B: BufMut>(mut value: u64, buf: &mut B) {
    loop {
        if value & !0x7f == 0 {
            buf.put_u8(value as u8);
            return;
        }
        buf.put_u8((value as u8 & 0x7f) | 0x80);
        value >>= 7;
    }
}

pub fn write_varint32<B: BufMut>(value: i32, buf: &mut B) {
    write_unsigned_varint32(zigzag_encode32(value), buf)
}

pub fn write_varint64<B: BufMut>(value: i64, buf: &mut B) {
    write_unsigned_varint64(zigzag_encode64(value), buf)
}

pub fn sizeof_unsigned_varint32(value: u32) -> usize {
    let mut value = value;
    let mut n = 1;
    while value & !0x7f != 0 {
        value >>= 7;
        n += 1;
    }
    n
}

pub fn sizeof_varint32(value: i32) -> usize {
    sizeof_unsigned_varint32(zigzag_encode32(value))
}

pub fn sizeof_varint64(value: i64) -> usize {
    let mut value = zigzag_encode64(value);
    let mut n = 1;
    while value & !0x7f != 0 {
        value >>= 7;
        n += 1;
    }
    n
}

/// Reads an unsigned varint, returning `(value, bytes_consumed)`. Fails as `protocol` if the
/// continuation bit is still set past the maximum encodable width.
pub fn read_unsigned_varint32(buf: &[u8]) -> Result<(u32, usize)> {
    let mut value: u32 = 0;
    for i in 0..MAX_VARINT32_BYTES {
        let byte = *buf
            .get(i)
            .ok_or_else(|| ErrorKind::OutOfBounds(i, 1, buf.len()))?;
        value |= ((byte & 0x7f) as u32) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }
    Err(ErrorKind::CodecError("varint32 longer than 5 bytes".into()).into())
}

pub fn read_unsigned_varint64(buf: &[u8]) -> Result<(u64, usize)> {
    let mut value: u64 = 0;
    for i in 0..MAX_VARINT64_BYTES {
        let byte = *buf
            .get(i)
            .ok_or_else(|| ErrorKind::OutOfBounds(i, 1, buf.len()))?;
        value |= ((byte & 0x7f) as u64) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }
    Err(ErrorKind::CodecError("varint64 longer than 10 bytes".into()).into())
}

pub fn read_varint32(buf: &[u8]) -> Result<(i32, usize)> {
    let (v, n) = read_unsigned_varint32(buf)?;
    Ok((zigzag_decode32(v), n))
}

pub fn read_varint64(buf: &[u8]) -> Result<(i64, usize)> {
    let (v, n) = read_unsigned_varint64(buf)?;
    Ok((zigzag_decode64(v), n))
}

/// Reads an unsigned varint off the front of a `bytes::Buf`, advancing it.
pub fn get_unsigned_varint32<B: Buf>(buf: &mut B) -> Result<u32> {
    let mut value: u32 = 0;
    for i in 0..MAX_VARINT32_BYTES {
        if !buf.has_remaining() {
            return Err(ErrorKind::OutOfBounds(i, 1, 0).into());
        }
        let byte = buf.get_u8();
        value |= ((byte & 0x7f) as u32) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }
    Err(ErrorKind::CodecError("varint32 longer than 5 bytes".into()).into())
}

pub fn get_unsigned_varint64<B: Buf>(buf: &mut B) -> Result<u64> {
    let mut value: u64 = 0;
    for i in 0..MAX_VARINT64_BYTES {
        if !buf.has_remaining() {
            return Err(ErrorKind::OutOfBounds(i, 1, 0).into());
        }
        let byte = buf.get_u8();
        value |= ((byte & 0x7f) as u64) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }
    Err(ErrorKind::CodecError("varint64 longer than 10 bytes".into()).into())
}

pub fn get_varint32<B: Buf>(buf: &mut B) -> Result<i32> {
    Ok(zigzag_decode32(get_unsigned_varint32(buf)?))
}

pub fn get_varint64<B: Buf>(buf: &mut B) -> Result<i64> {
    Ok(zigzag_decode64(get_unsigned_varint64(buf)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn unsigned_varint_300() {
        let mut buf = BytesMut::new();
        write_unsigned_varint32(300, &mut buf);
        assert_eq!(&buf[..], &[0xAC, 0x02]);

        let (value, n) = read_unsigned_varint32(&buf).unwrap();
        assert_eq!(value, 300);
        assert_eq!(n, 2);
    }

    #[test]
    fn zigzag_round_trip_32() {
        for n in [0, 1, -1, 2, -2, i32::MAX, i32::MIN, 12345, -54321] {
            let mut buf = BytesMut::new();
            write_varint32(n, &mut buf);
            let (decoded, consumed) = read_varint32(&buf).unwrap();
            assert_eq!(decoded, n);
            assert_eq!(consumed, buf.len());
        }
    }

    #[test]
    fn zigzag_round_trip_64() {
        for n in [0i64, 1, -1, i64::MAX, i64::MIN, 123456789012, -987654321098] {
            let mut buf = BytesMut::new();
            write_varint64(n, &mut buf);
            let (decoded, consumed) = read_varint64(&buf).unwrap();
            assert_eq!(decoded, n);
            assert_eq!(consumed, buf.len());
        }
    }

    #[test]
    fn truncated_varint_fails() {
        let buf = [0x80u8, 0x80, 0x80, 0x80, 0x80];
        assert!(read_unsigned_varint32(&buf).is_err());
    }
}
