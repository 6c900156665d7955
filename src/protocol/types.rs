//! Readers and writers for every Kafka primitive wire type (§3, §4.1).
//!
//! `Writer` wraps a `BytesMut` and exposes fluent `put_*` methods; `Reader` wraps a byte slice
//! with an explicit cursor and exposes `read_*` methods. Every primitive has both a "legacy"
//! (int16/int32 length-prefixed) and a "compact" (unsigned-varint length+1) wire form; call sites
//! pick one explicitly, matching the flexible/non-flexible split in the real protocol.

use bytes::{BufMut, Bytes, BytesMut};
use uuid::Uuid;

use crate::errors::{ErrorKind, Result};
use crate::protocol::varint::{write_unsigned_varint32, write_varint32, write_varint64};

/// A nil UUID (16 zero bytes) represents `null` on the wire, e.g. an unset topic id.
pub const NIL_UUID: Uuid = Uuid::nil();

/// An append-only cursor over a `BytesMut`, with the `prependLength` helpers the framing layer
/// needs to back-patch a request's total size after its body has been assembled.
pub struct Writer {
    buf: BytesMut,
}

impl Writer {
    pub fn with_capacity(cap: usize) -> Self {
        Writer {
            buf: BytesMut::with_capacity(cap),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn put_i8(&mut self, v: i8) -> &mut Self {
        self.buf.put_i8(v);
        self
    }

    pub fn put_i16(&mut self, v: i16) -> &mut Self {
        self.buf.put_i16(v);
        self
    }

    pub fn put_i32(&mut self, v: i32) -> &mut Self {
        self.buf.put_i32(v);
        self
    }

    pub fn put_i64(&mut self, v: i64) -> &mut Self {
        self.buf.put_i64(v);
        self
    }

    pub fn put_u8(&mut self, v: u8) -> &mut Self {
        self.buf.put_u8(v);
        self
    }

    pub fn put_u32(&mut self, v: u32) -> &mut Self {
        self.buf.put_u32(v);
        self
    }

    pub fn put_bool(&mut self, v: bool) -> &mut Self {
        self.buf.put_u8(v as u8);
        self
    }

    pub fn put_f64(&mut self, v: f64) -> &mut Self {
        self.buf.put_f64(v);
        self
    }

    pub fn put_varint(&mut self, v: i32) -> &mut Self {
        write_varint32(v, &mut self.buf);
        self
    }

    pub fn put_varlong(&mut self, v: i64) -> &mut Self {
        write_varint64(v, &mut self.buf);
        self
    }

    pub fn put_unsigned_varint(&mut self, v: u32) -> &mut Self {
        write_unsigned_varint32(v, &mut self.buf);
        self
    }

    pub fn put_uuid(&mut self, v: Uuid) -> &mut Self {
        self.buf.put_slice(v.as_bytes());
        self
    }

    pub fn put_raw_bytes(&mut self, v: &[u8]) -> &mut Self {
        self.buf.put_slice(v);
        self
    }

    /// Legacy (int16 length, -1 = null) string.
    pub fn put_legacy_string(&mut self, v: Option<&str>) -> &mut Self {
        match v {
            Some(s) => {
                self.buf.put_i16(s.len() as i16);
                self.buf.put_slice(s.as_bytes());
            }
            None => {
                self.buf.put_i16(-1);
            }
        }
        self
    }

    /// Compact (unsigned-varint of length+1, 0 = null) string.
    pub fn put_compact_string(&mut self, v: Option<&str>) -> &mut Self {
        match v {
            Some(s) => {
                write_unsigned_varint32(s.len() as u32 + 1, &mut self.buf);
                self.buf.put_slice(s.as_bytes());
            }
            None => write_unsigned_varint32(0, &mut self.buf),
        }
        self
    }

    /// Legacy (int32 length, -1 = null) bytes.
    pub fn put_legacy_bytes(&mut self, v: Option<&[u8]>) -> &mut Self {
        match v {
            Some(b) => {
                self.buf.put_i32(b.len() as i32);
                self.buf.put_slice(b);
            }
            None => {
                self.buf.put_i32(-1);
            }
        }
        self
    }

    /// Compact (unsigned-varint of length+1, 0 = null) bytes.
    pub fn put_compact_bytes(&mut self, v: Option<&[u8]>) -> &mut Self {
        match v {
            Some(b) => {
                write_unsigned_varint32(b.len() as u32 + 1, &mut self.buf);
                self.buf.put_slice(b);
            }
            None => write_unsigned_varint32(0, &mut self.buf),
        }
        self
    }

    /// Emits the current empty tagged-field terminator. Every flexible-version request/response
    /// ends each struct with this; §9's Open Question records that only the empty form is ever
    /// written today.
    pub fn put_tagged_fields(&mut self) -> &mut Self {
        write_unsigned_varint32(0, &mut self.buf);
        self
    }

    /// Writes `f`'s output length as an int32 in front of it; used to frame a whole RPC payload.
    pub fn prepend_length(self) -> Bytes {
        let body = self.buf.freeze();
        let mut framed = BytesMut::with_capacity(body.len() + 4);
        framed.put_i32(body.len() as i32);
        framed.extend_from_slice(&body);
        framed.freeze()
    }

    /// Same as `prepend_length` but with a compact (varint) length prefix, used by some embedded
    /// sub-structures (e.g. a serialized consumer-group assignment).
    pub fn prepend_varint_length(self) -> Bytes {
        let body = self.buf.freeze();
        let mut framed = BytesMut::with_capacity(body.len() + 5);
        write_unsigned_varint32(body.len() as u32, &mut framed);
        framed.extend_from_slice(&body);
        framed.freeze()
    }

    /// Writes an array with the legacy int32-length-prefixed form, applying `f` to each element.
    pub fn put_legacy_array<T, F>(&mut self, items: &[T], mut f: F) -> Result<()>
    where
        F: FnMut(&mut Self, &T) -> Result<()>,
    {
        self.buf.put_i32(items.len() as i32);
        for item in items {
            f(self, item)?;
        }
        Ok(())
    }

    /// Writes an array with the compact unsigned-varint-length(+1)-prefixed form.
    pub fn put_compact_array<T, F>(&mut self, items: &[T], mut f: F) -> Result<()>
    where
        F: FnMut(&mut Self, &T) -> Result<()>,
    {
        write_unsigned_varint32(items.len() as u32 + 1, &mut self.buf);
        for item in items {
            f(self, item)?;
        }
        Ok(())
    }
}

/// A cursor over a byte slice. Every `read_*` method returns the decoded value and advances the
/// cursor; `consumed()` reports how far the cursor has moved since construction, satisfying the
/// `(value, bytes-consumed)` contract from §4.1.
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Reader { buf, pos: 0 }
    }

    pub fn consumed(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn need(&self, n: usize) -> Result<()> {
        if self.remaining() < n {
            Err(ErrorKind::OutOfBounds(self.pos, n, self.buf.len()).into())
        } else {
            Ok(())
        }
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        self.need(1)?;
        let v = self.buf[self.pos] as i8;
        self.pos += 1;
        Ok(v)
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        self.need(2)?;
        let v = i16::from_be_bytes([self.buf[self.pos], self.buf[self.pos + 1]]);
        self.pos += 2;
        Ok(v)
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        self.need(4)?;
        let mut b = [0u8; 4];
        b.copy_from_slice(&self.buf[self.pos..self.pos + 4]);
        self.pos += 4;
        Ok(i32::from_be_bytes(b))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.need(4)?;
        let mut b = [0u8; 4];
        b.copy_from_slice(&self.buf[self.pos..self.pos + 4]);
        self.pos += 4;
        Ok(u32::from_be_bytes(b))
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        self.need(8)?;
        let mut b = [0u8; 8];
        b.copy_from_slice(&self.buf[self.pos..self.pos + 8]);
        self.pos += 8;
        Ok(i64::from_be_bytes(b))
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        self.need(8)?;
        let mut b = [0u8; 8];
        b.copy_from_slice(&self.buf[self.pos..self.pos + 8]);
        self.pos += 8;
        Ok(f64::from_be_bytes(b))
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_i8()? != 0)
    }

    pub fn read_uuid(&mut self) -> Result<Uuid> {
        self.need(16)?;
        let mut b = [0u8; 16];
        b.copy_from_slice(&self.buf[self.pos..self.pos + 16]);
        self.pos += 16;
        Ok(Uuid::from_bytes(b))
    }

    pub fn read_varint(&mut self) -> Result<i32> {
        let (v, n) = crate::protocol::varint::read_varint32(&self.buf[self.pos..])?;
        self.pos += n;
        Ok(v)
    }

    pub fn read_varlong(&mut self) -> Result<i64> {
        let (v, n) = crate::protocol::varint::read_varint64(&self.buf[self.pos..])?;
        self.pos += n;
        Ok(v)
    }

    pub fn read_unsigned_varint(&mut self) -> Result<u32> {
        let (v, n) = crate::protocol::varint::read_unsigned_varint32(&self.buf[self.pos..])?;
        self.pos += n;
        Ok(v)
    }

    pub fn read_raw_bytes(&mut self, len: usize) -> Result<Bytes> {
        self.need(len)?;
        let out = Bytes::copy_from_slice(&self.buf[self.pos..self.pos + len]);
        self.pos += len;
        Ok(out)
    }

    /// Legacy (int16 length, -1 = null) string.
    pub fn read_legacy_string(&mut self) -> Result<Option<String>> {
        let len = self.read_i16()?;
        if len < 0 {
            return Ok(None);
        }
        let bytes = self.read_raw_bytes(len as usize)?;
        Ok(Some(String::from_utf8(bytes.to_vec())?))
    }

    /// Compact (unsigned-varint length+1, 0 = null) string.
    pub fn read_compact_string(&mut self) -> Result<Option<String>> {
        let len = self.read_unsigned_varint()?;
        if len == 0 {
            return Ok(None);
        }
        let bytes = self.read_raw_bytes(len as usize - 1)?;
        Ok(Some(String::from_utf8(bytes.to_vec())?))
    }

    /// Legacy (int32 length, -1 = null) bytes.
    pub fn read_legacy_bytes(&mut self) -> Result<Option<Bytes>> {
        let len = self.read_i32()?;
        if len < 0 {
            return Ok(None);
        }
        Ok(Some(self.read_raw_bytes(len as usize)?))
    }

    /// Compact (unsigned-varint length+1, 0 = null) bytes.
    pub fn read_compact_bytes(&mut self) -> Result<Option<Bytes>> {
        let len = self.read_unsigned_varint()?;
        if len == 0 {
            return Ok(None);
        }
        Ok(Some(self.read_raw_bytes(len as usize - 1)?))
    }

    pub fn read_legacy_array<T, F>(&mut self, mut f: F) -> Result<Vec<T>>
    where
        F: FnMut(&mut Self) -> Result<T>,
    {
        let len = self.read_i32()?;
        if len < 0 {
            return Ok(Vec::new());
        }
        let mut out = Vec::with_capacity(len as usize);
        for _ in 0..len {
            out.push(f(self)?);
        }
        Ok(out)
    }

    pub fn read_compact_array<T, F>(&mut self, mut f: F) -> Result<Vec<T>>
    where
        F: FnMut(&mut Self) -> Result<T>,
    {
        let len = self.read_unsigned_varint()?;
        if len == 0 {
            return Ok(Vec::new());
        }
        let mut out = Vec::with_capacity(len as usize - 1);
        for _ in 0..len - 1 {
            out.push(f(self)?);
        }
        Ok(out)
    }

    /// Skips any number of (tag, length, bytes) tuples. Today the writer only ever emits the
    /// empty terminator, but a broker from the future may send real tagged fields; we must not
    /// choke on them (§9's Open Question).
    pub fn skip_tagged_fields(&mut self) -> Result<()> {
        let count = self.read_unsigned_varint()?;
        for _ in 0..count {
            let _tag = self.read_unsigned_varint()?;
            let len = self.read_unsigned_varint()?;
            self.read_raw_bytes(len as usize)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_string_round_trip() {
        let mut w = Writer::with_capacity(16);
        w.put_legacy_string(Some("test"));
        let bytes = w.into_bytes();
        assert_eq!(&bytes[..], b"\0\x04test");

        let mut r = Reader::new(&bytes);
        assert_eq!(r.read_legacy_string().unwrap(), Some("test".to_owned()));
    }

    #[test]
    fn legacy_string_null() {
        let mut r = Reader::new(&[0xff, 0xff]);
        assert_eq!(r.read_legacy_string().unwrap(), None);
    }

    #[test]
    fn compact_string_round_trip() {
        let mut w = Writer::with_capacity(16);
        w.put_compact_string(Some("test"));
        let bytes = w.into_bytes();

        let mut r = Reader::new(&bytes);
        assert_eq!(r.read_compact_string().unwrap(), Some("test".to_owned()));
        assert_eq!(r.consumed(), bytes.len());
    }

    #[test]
    fn compact_string_null_is_zero_byte() {
        let mut w = Writer::with_capacity(4);
        w.put_compact_string(None);
        assert_eq!(&w.into_bytes()[..], &[0u8]);
    }

    #[test]
    fn compact_bytes_round_trip() {
        let mut w = Writer::with_capacity(16);
        w.put_compact_bytes(Some(b"abc"));
        let bytes = w.into_bytes();
        let mut r = Reader::new(&bytes);
        assert_eq!(r.read_compact_bytes().unwrap().unwrap().as_ref(), b"abc");
    }

    #[test]
    fn uuid_round_trip() {
        let id = Uuid::new_v4();
        let mut w = Writer::with_capacity(16);
        w.put_uuid(id);
        let bytes = w.into_bytes();
        let mut r = Reader::new(&bytes);
        assert_eq!(r.read_uuid().unwrap(), id);
    }

    #[test]
    fn tagged_fields_terminator_is_single_zero_byte() {
        let mut w = Writer::with_capacity(1);
        w.put_tagged_fields();
        assert_eq!(&w.into_bytes()[..], &[0u8]);
    }

    #[test]
    fn skip_tagged_fields_with_real_content() {
        let mut buf = BytesMut::new();
        write_unsigned_varint32(1, &mut buf); // one tag
        write_unsigned_varint32(7, &mut buf); // tag id
        write_unsigned_varint32(2, &mut buf); // length
        buf.put_slice(b"hi");

        let mut r = Reader::new(&buf);
        r.skip_tagged_fields().unwrap();
        assert_eq!(r.consumed(), buf.len());
    }

    #[test]
    fn negative_length_legacy_bytes_is_null_not_error() {
        let mut w = Writer::with_capacity(4);
        w.put_legacy_bytes(None);
        let mut r = Reader::new(&w.into_bytes());
        assert_eq!(r.read_legacy_bytes().unwrap(), None);
    }
}
