//! Record batch v2 encode/decode (§3, §4.2).
//!
//! Layout (all integer fields big-endian):
//!
//! ```text
//! baseOffset          int64
//! batchLength         int32   (bytes following this field)
//! partitionLeaderEpoch int32
//! magic               int8    (= 2)
//! crc                 uint32  (CRC-32C over everything from attributes onward)
//! attributes          int16   (bits 0-2 compression, bit 3 timestamp type,
//!                               bit 4 isTransactional, bit 5 isControlBatch)
//! lastOffsetDelta     int32
//! firstTimestamp      int64
//! maxTimestamp        int64
//! producerId          int64
//! producerEpoch       int16
//! baseSequence        int32
//! records             [Record]  (possibly compressed as a whole)
//! ```
//!
//! Each `Record` is itself length-prefixed with a signed varint and carries delta-encoded offset
//! and timestamp relative to the batch's base values (§4.1's zigzag varint primitives).

use bytes::{Bytes, BytesMut};
use crc::{Crc, CRC_32_ISCSI};

use crate::compression::Compression;
use crate::errors::{ErrorKind, Result};
use crate::protocol::types::{Reader, Writer};

const MAGIC: i8 = 2;
const ATTR_TIMESTAMP_TYPE: i16 = 1 << 3;
const ATTR_IS_TRANSACTIONAL: i16 = 1 << 4;
const ATTR_IS_CONTROL: i16 = 1 << 5;

static CRC32C: Crc<u32> = Crc::<u32>::new(&CRC_32_ISCSI);

#[derive(Debug, Clone)]
pub struct Header {
    pub key: String,
    pub value: Option<Bytes>,
}

#[derive(Debug, Clone)]
pub struct Record {
    pub offset_delta: i32,
    pub timestamp_delta: i64,
    pub key: Option<Bytes>,
    pub value: Option<Bytes>,
    pub headers: Vec<Header>,
}

#[derive(Debug, Clone)]
pub struct RecordBatch {
    pub base_offset: i64,
    pub partition_leader_epoch: i32,
    /// Wall-clock timestamp of the first record in the batch; every record's absolute timestamp
    /// is `first_timestamp + record.timestamp_delta`.
    pub first_timestamp: i64,
    pub producer_id: i64,
    pub producer_epoch: i16,
    pub base_sequence: i32,
    pub is_transactional: bool,
    pub is_control: bool,
    pub log_append_time: bool,
    pub compression: Compression,
    pub records: Vec<Record>,
}

impl Default for RecordBatch {
    fn default() -> Self {
        RecordBatch {
            base_offset: 0,
            partition_leader_epoch: -1,
            first_timestamp: 0,
            producer_id: -1,
            producer_epoch: -1,
            base_sequence: -1,
            is_transactional: false,
            is_control: false,
            log_append_time: false,
            compression: Compression::None,
            records: Vec::new(),
        }
    }
}

fn write_record(rec: &Record, w: &mut Writer) {
    let mut body = Writer::with_capacity(64);
    body.put_i8(0); // record attributes, always 0 today
    body.put_varlong(rec.timestamp_delta);
    body.put_varint(rec.offset_delta);
    match &rec.key {
        Some(k) => {
            body.put_varint(k.len() as i32);
            body.put_raw_bytes(k);
        }
        None => {
            body.put_varint(-1);
        }
    }
    match &rec.value {
        Some(v) => {
            body.put_varint(v.len() as i32);
            body.put_raw_bytes(v);
        }
        None => {
            body.put_varint(-1);
        }
    }
    body.put_varint(rec.headers.len() as i32);
    for h in &rec.headers {
        let key_bytes = h.key.as_bytes();
        body.put_varint(key_bytes.len() as i32);
        body.put_raw_bytes(key_bytes);
        match &h.value {
            Some(v) => {
                body.put_varint(v.len() as i32);
                body.put_raw_bytes(v);
            }
            None => {
                body.put_varint(-1);
            }
        }
    }

    let body_bytes = body.into_bytes();
    w.put_varint(body_bytes.len() as i32);
    w.put_raw_bytes(&body_bytes);
}

fn read_record(r: &mut Reader<'_>) -> Result<Record> {
    let len = r.read_varint()?;
    if len < 0 {
        return Err(ErrorKind::CodecError("negative record length".into()).into());
    }
    let body = r.read_raw_bytes(len as usize)?;
    let mut br = Reader::new(&body);

    let _attrs = br.read_i8()?;
    let timestamp_delta = br.read_varlong()?;
    let offset_delta = br.read_varint()?;

    let key_len = br.read_varint()?;
    let key = if key_len < 0 {
        None
    } else {
        Some(br.read_raw_bytes(key_len as usize)?)
    };

    let value_len = br.read_varint()?;
    let value = if value_len < 0 {
        None
    } else {
        Some(br.read_raw_bytes(value_len as usize)?)
    };

    let header_count = br.read_varint()?;
    let mut headers = Vec::with_capacity(header_count.max(0) as usize);
    for _ in 0..header_count.max(0) {
        let key_len = br.read_varint()?;
        let key_bytes = br.read_raw_bytes(key_len.max(0) as usize)?;
        let key = String::from_utf8(key_bytes.to_vec())?;
        let val_len = br.read_varint()?;
        let value = if val_len < 0 {
            None
        } else {
            Some(br.read_raw_bytes(val_len as usize)?)
        };
        headers.push(Header { key, value });
    }

    Ok(Record {
        offset_delta,
        timestamp_delta,
        key,
        value,
        headers,
    })
}

impl RecordBatch {
    /// Encodes this batch, compressing the record payload and back-patching the length and CRC.
    pub fn write(&self, w: &mut Writer) -> Result<()> {
        let first_timestamp = self.first_timestamp;
        let max_timestamp = self
            .records
            .iter()
            .map(|r| first_timestamp + r.timestamp_delta)
            .max()
            .unwrap_or(first_timestamp);
        let last_offset_delta = self.records.iter().map(|r| r.offset_delta).max().unwrap_or(0);

        let mut raw_records = BytesMut::new();
        for rec in &self.records {
            let mut rw = Writer::with_capacity(64);
            write_record(rec, &mut rw);
            raw_records.extend_from_slice(&rw.into_bytes());
        }
        let payload = self.compression.compress(&raw_records)?;

        let mut attrs = self.compression.attributes_bits();
        if self.log_append_time {
            attrs |= ATTR_TIMESTAMP_TYPE;
        }
        if self.is_transactional {
            attrs |= ATTR_IS_TRANSACTIONAL;
        }
        if self.is_control {
            attrs |= ATTR_IS_CONTROL;
        }

        // Everything from `attributes` onward is CRC'd and length-counted.
        let mut tail = Writer::with_capacity(64 + payload.len());
        tail.put_i16(attrs);
        tail.put_i32(last_offset_delta);
        tail.put_i64(first_timestamp);
        tail.put_i64(max_timestamp);
        tail.put_i64(self.producer_id);
        tail.put_i16(self.producer_epoch);
        tail.put_i32(self.base_sequence);
        tail.put_i32(self.records.len() as i32);
        tail.put_raw_bytes(&payload);
        let tail_bytes = tail.into_bytes();

        let crc = CRC32C.checksum(&tail_bytes);

        // batchLength counts everything after the batchLength field itself: leaderEpoch(4) +
        // magic(1) + crc(4) + tail.
        let batch_length = 4 + 1 + 4 + tail_bytes.len() as i32;

        w.put_i64(self.base_offset);
        w.put_i32(batch_length);
        w.put_i32(self.partition_leader_epoch);
        w.put_i8(MAGIC);
        w.put_u32(crc);
        w.put_raw_bytes(&tail_bytes);

        Ok(())
    }

    /// Decodes one record batch starting at the current position of `r`.
    pub fn read(r: &mut Reader<'_>) -> Result<Self> {
        let base_offset = r.read_i64()?;
        let batch_length = r.read_i32()?;
        let batch_end = r.consumed() + batch_length as usize;

        let partition_leader_epoch = r.read_i32()?;
        let magic = r.read_i8()?;
        if magic != MAGIC {
            return Err(ErrorKind::CodecError(format!(
                "unsupported record batch magic byte {}",
                magic
            ))
            .into());
        }
        let expected_crc = r.read_u32()?;

        let attributes = r.read_i16()?;
        let _last_offset_delta = r.read_i32()?;
        let first_timestamp = r.read_i64()?;
        let max_timestamp = r.read_i64()?;
        let producer_id = r.read_i64()?;
        let producer_epoch = r.read_i16()?;
        let base_sequence = r.read_i32()?;
        let record_count = r.read_i32()?;

        let payload_len = batch_end - r.consumed();
        let payload = r.read_raw_bytes(payload_len)?;

        let actual_crc = verify_crc(
            attributes,
            _last_offset_delta,
            first_timestamp,
            max_timestamp,
            producer_id,
            producer_epoch,
            base_sequence,
            record_count,
            &payload,
        );
        if actual_crc != expected_crc {
            return Err(ErrorKind::CodecError(format!(
                "record batch crc mismatch: expected {:08x}, computed {:08x}",
                expected_crc, actual_crc
            ))
            .into());
        }

        let compression = Compression::from_attributes(attributes)?;
        let decompressed = compression.decompress(&payload)?;

        let mut rr = Reader::new(&decompressed);
        let mut records = Vec::with_capacity(record_count.max(0) as usize);
        for _ in 0..record_count.max(0) {
            records.push(read_record(&mut rr)?);
        }

        Ok(RecordBatch {
            base_offset,
            partition_leader_epoch,
            first_timestamp,
            producer_id,
            producer_epoch,
            base_sequence,
            is_transactional: attributes & ATTR_IS_TRANSACTIONAL != 0,
            is_control: attributes & ATTR_IS_CONTROL != 0,
            log_append_time: attributes & ATTR_TIMESTAMP_TYPE != 0,
            compression,
            records,
        })
    }
}

#[allow(clippy::too_many_arguments)]
fn verify_crc(
    attributes: i16,
    last_offset_delta: i32,
    first_timestamp: i64,
    max_timestamp: i64,
    producer_id: i64,
    producer_epoch: i16,
    base_sequence: i32,
    record_count: i32,
    payload: &[u8],
) -> u32 {
    let mut tail = Writer::with_capacity(64 + payload.len());
    tail.put_i16(attributes);
    tail.put_i32(last_offset_delta);
    tail.put_i64(first_timestamp);
    tail.put_i64(max_timestamp);
    tail.put_i64(producer_id);
    tail.put_i16(producer_epoch);
    tail.put_i32(base_sequence);
    tail.put_i32(record_count);
    tail.put_raw_bytes(payload);
    CRC32C.checksum(&tail.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_batch(compression: Compression) -> RecordBatch {
        RecordBatch {
            compression,
            records: vec![
                Record {
                    offset_delta: 0,
                    timestamp_delta: 0,
                    key: Some(Bytes::from_static(b"k1")),
                    value: Some(Bytes::from_static(b"v1")),
                    headers: vec![],
                },
                Record {
                    offset_delta: 1,
                    timestamp_delta: 5,
                    key: None,
                    value: Some(Bytes::from_static(b"v2")),
                    headers: vec![Header {
                        key: "trace".to_owned(),
                        value: Some(Bytes::from_static(b"abc")),
                    }],
                },
            ],
            ..Default::default()
        }
    }

    #[test]
    fn uncompressed_round_trip() {
        let batch = sample_batch(Compression::None);
        let mut w = Writer::with_capacity(256);
        batch.write(&mut w).unwrap();
        let bytes = w.into_bytes();

        let mut r = Reader::new(&bytes);
        let decoded = RecordBatch::read(&mut r).unwrap();
        assert_eq!(decoded.records.len(), 2);
        assert_eq!(decoded.records[0].key.as_deref(), Some(&b"k1"[..]));
        assert_eq!(decoded.records[1].headers[0].key, "trace");
        assert_eq!(r.consumed(), bytes.len());
    }

    #[cfg(feature = "gzip")]
    #[test]
    fn gzip_compressed_round_trip() {
        let batch = sample_batch(Compression::Gzip);
        let mut w = Writer::with_capacity(256);
        batch.write(&mut w).unwrap();
        let bytes = w.into_bytes();

        let mut r = Reader::new(&bytes);
        let decoded = RecordBatch::read(&mut r).unwrap();
        assert_eq!(decoded.compression, Compression::Gzip);
        assert_eq!(decoded.records.len(), 2);
    }

    #[test]
    fn corrupted_crc_is_rejected() {
        let batch = sample_batch(Compression::None);
        let mut w = Writer::with_capacity(256);
        batch.write(&mut w).unwrap();
        let mut bytes = w.into_bytes().to_vec();
        // Flip a byte inside the tail, after the CRC field (offset 17 is inside `attributes`).
        bytes[17] ^= 0xff;

        let mut r = Reader::new(&bytes);
        assert!(RecordBatch::read(&mut r).is_err());
    }
}
