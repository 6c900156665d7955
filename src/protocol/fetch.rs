//! `Fetch` (api key 1): pull record batches from partitions (§4.3, §4.7).

use crate::errors::{ErrorKind, Result};
use crate::protocol::header::{RequestHeader, ResponseHeader};
use crate::protocol::record::{Record, RecordBatch};
use crate::protocol::types::{Reader, Writer};

#[derive(Debug, Clone)]
pub struct FetchPartition {
    pub partition: i32,
    pub current_leader_epoch: i32,
    pub fetch_offset: i64,
    pub partition_max_bytes: i32,
}

#[derive(Debug, Clone)]
pub struct FetchTopic {
    pub topic: String,
    pub partitions: Vec<FetchPartition>,
}

#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub replica_id: i32,
    pub max_wait_ms: i32,
    pub min_bytes: i32,
    pub max_bytes: i32,
    pub isolation_level: i8,
    pub topics: Vec<FetchTopic>,
}

#[derive(Debug, Clone)]
pub struct FetchedPartition {
    pub partition: i32,
    pub error_code: i16,
    pub high_watermark: i64,
    pub last_stable_offset: i64,
    pub log_start_offset: i64,
    pub batches: Vec<RecordBatch>,
}

#[derive(Debug, Clone)]
pub struct FetchedTopic {
    pub topic: String,
    pub partitions: Vec<FetchedPartition>,
}

#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub throttle_time_ms: i32,
    pub topics: Vec<FetchedTopic>,
}

pub fn create_request(header: &RequestHeader, req: &FetchRequest) -> Result<Vec<u8>> {
    let flexible = header.api_version >= 12;
    let mut w = Writer::with_capacity(256);
    header.write(&mut w);

    w.put_i32(req.replica_id);
    w.put_i32(req.max_wait_ms);
    w.put_i32(req.min_bytes);
    if header.api_version >= 3 {
        w.put_i32(req.max_bytes);
    }
    if header.api_version >= 4 {
        w.put_i8(req.isolation_level);
    }
    if header.api_version >= 7 {
        w.put_i32(0); // session id: not yet participating in incremental fetch sessions
        w.put_i32(-1); // session epoch
    }

    let write_partition = |w: &mut Writer, p: &FetchPartition| -> Result<()> {
        w.put_i32(p.partition);
        if header.api_version >= 9 {
            w.put_i32(p.current_leader_epoch);
        }
        w.put_i64(p.fetch_offset);
        if header.api_version >= 12 {
            w.put_i64(-1); // last fetched epoch
        }
        if header.api_version >= 5 {
            w.put_i64(0); // log start offset
        }
        w.put_i32(p.partition_max_bytes);
        if flexible {
            w.put_tagged_fields();
        }
        Ok(())
    };

    let write_topic = |w: &mut Writer, t: &FetchTopic| -> Result<()> {
        if flexible {
            w.put_compact_string(Some(&t.topic));
            w.put_compact_array(&t.partitions, write_partition)?;
            w.put_tagged_fields();
        } else {
            w.put_legacy_string(Some(&t.topic));
            w.put_legacy_array(&t.partitions, write_partition)?;
        }
        Ok(())
    };

    if flexible {
        w.put_compact_array(&req.topics, write_topic)?;
        w.put_compact_array(&Vec::<i32>::new(), |_, _: &i32| Ok(()))?; // forgotten topics
        w.put_compact_string(None); // rack id
        w.put_tagged_fields();
    } else {
        w.put_legacy_array(&req.topics, write_topic)?;
    }

    Ok(w.prepend_length().to_vec())
}

pub fn parse_response(body: &[u8], api_version: i16) -> Result<FetchResponse> {
    let flexible = api_version >= 12;
    let mut r = Reader::new(body);
    ResponseHeader::read(&mut r, flexible)?;

    let throttle_time_ms = if api_version >= 1 { r.read_i32()? } else { 0 };
    if api_version >= 7 {
        let _error_code = r.read_i16()?;
        let _session_id = r.read_i32()?;
    }

    let read_partition = |r: &mut Reader<'_>| -> Result<FetchedPartition> {
        let partition = r.read_i32()?;
        let error_code = r.read_i16()?;
        let high_watermark = r.read_i64()?;
        let last_stable_offset = if api_version >= 4 { r.read_i64()? } else { -1 };
        let log_start_offset = if api_version >= 5 { r.read_i64()? } else { -1 };
        if api_version >= 4 {
            let _aborted = if flexible {
                r.read_compact_array(|r| {
                    let producer_id = r.read_i64()?;
                    let first_offset = r.read_i64()?;
                    if flexible {
                        r.skip_tagged_fields()?;
                    }
                    Ok((producer_id, first_offset))
                })?
            } else {
                r.read_legacy_array(|r| {
                    let producer_id = r.read_i64()?;
                    let first_offset = r.read_i64()?;
                    Ok((producer_id, first_offset))
                })?
            };
        }
        if api_version >= 11 {
            let _preferred_read_replica = r.read_i32()?;
        }

        let records = if flexible {
            r.read_compact_bytes()?
        } else {
            r.read_legacy_bytes()?
        };
        // A broker cutting the last batch off at `max_bytes` is routine, not exceptional: the
        // partial tail batch is dropped silently rather than failing the whole response, matching
        // documented Kafka fetch behavior. Any other read failure (bad CRC, garbage length) still
        // propagates, since that's genuine corruption rather than an expected truncation.
        let mut batches = Vec::new();
        if let Some(records) = records {
            let mut rr = Reader::new(&records);
            while rr.remaining() > 0 {
                match RecordBatch::read(&mut rr) {
                    Ok(batch) => batches.push(batch),
                    Err(e) => match e.kind() {
                        ErrorKind::OutOfBounds(..) => break,
                        _ => return Err(e),
                    },
                }
            }
        }
        if flexible {
            r.skip_tagged_fields()?;
        }

        Ok(FetchedPartition {
            partition,
            error_code,
            high_watermark,
            last_stable_offset,
            log_start_offset,
            batches,
        })
    };

    let read_topic = |r: &mut Reader<'_>| -> Result<FetchedTopic> {
        let topic = if flexible {
            r.read_compact_string()?
        } else {
            r.read_legacy_string()?
        }
        .unwrap_or_default();
        let partitions = if flexible {
            r.read_compact_array(read_partition)?
        } else {
            r.read_legacy_array(read_partition)?
        };
        if flexible {
            r.skip_tagged_fields()?;
        }
        Ok(FetchedTopic { topic, partitions })
    };

    let topics = if flexible {
        r.read_compact_array(read_topic)?
    } else {
        r.read_legacy_array(read_topic)?
    };

    if flexible {
        r.skip_tagged_fields()?;
    }

    Ok(FetchResponse {
        throttle_time_ms,
        topics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ApiKey;

    #[test]
    fn request_round_trip_shape() {
        let header = RequestHeader::new(ApiKey::Fetch, 4, 1, Some("c"), false);
        let req = FetchRequest {
            replica_id: -1,
            max_wait_ms: 500,
            min_bytes: 1,
            max_bytes: 1_048_576,
            isolation_level: 0,
            topics: vec![FetchTopic {
                topic: "orders".into(),
                partitions: vec![FetchPartition {
                    partition: 0,
                    current_leader_epoch: -1,
                    fetch_offset: 0,
                    partition_max_bytes: 1_048_576,
                }],
            }],
        };
        let bytes = create_request(&header, &req).unwrap();
        assert!(bytes.len() > 20);
    }

    #[test]
    fn response_with_empty_records_parses() {
        let mut body = Writer::with_capacity(64);
        body.put_i32(3);
        body.put_legacy_array(&["orders".to_owned()], |w, t| {
            w.put_legacy_string(Some(t));
            w.put_legacy_array(&[0i32], |w, _| {
                w.put_i32(0);
                w.put_i16(0);
                w.put_i64(10); // high watermark
                w.put_legacy_bytes(None);
                Ok(())
            })
            .unwrap();
            Ok(())
        })
        .unwrap();

        let parsed = parse_response(&body.into_bytes(), 0).unwrap();
        assert_eq!(parsed.topics[0].partitions[0].high_watermark, 10);
        assert!(parsed.topics[0].partitions[0].batches.is_empty());
    }

    fn one_record_batch() -> RecordBatch {
        RecordBatch {
            records: vec![Record {
                offset_delta: 0,
                timestamp_delta: 0,
                key: None,
                value: Some(bytes::Bytes::from_static(b"v")),
                headers: Vec::new(),
            }],
            ..RecordBatch::default()
        }
    }

    #[test]
    fn a_batch_truncated_at_max_bytes_is_skipped_not_an_error() {
        let mut complete = Writer::with_capacity(128);
        one_record_batch().write(&mut complete).unwrap();
        one_record_batch().write(&mut complete).unwrap();
        let complete = complete.into_bytes();

        // A broker cutting the response off mid-way through the second batch, as it would when
        // `max_bytes` lands inside a batch rather than on a boundary.
        let truncated = complete.slice(0..complete.len() - 4);

        let mut body = Writer::with_capacity(64);
        body.put_i32(3);
        body.put_legacy_array(&["orders".to_owned()], |w, t| {
            w.put_legacy_string(Some(t));
            w.put_legacy_array(&[0i32], |w, _| {
                w.put_i32(0);
                w.put_i16(0);
                w.put_i64(10);
                w.put_legacy_bytes(Some(&truncated[..]));
                Ok(())
            })
            .unwrap();
            Ok(())
        })
        .unwrap();

        let parsed = parse_response(&body.into_bytes(), 0).unwrap();
        assert_eq!(
            parsed.topics[0].partitions[0].batches.len(),
            1,
            "the complete first batch should survive; the truncated second batch is dropped silently"
        );
    }
}
