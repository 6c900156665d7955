//! `Produce` (api key 0): append record batches to partitions (§4.3, §4.8).

use crate::errors::Result;
use crate::protocol::header::{RequestHeader, ResponseHeader};
use crate::protocol::record::RecordBatch;
use crate::protocol::types::{Reader, Writer};
use crate::protocol::RequiredAcks;

#[derive(Debug, Clone)]
pub struct PartitionProduceData {
    pub partition_index: i32,
    pub batch: RecordBatch,
}

#[derive(Debug, Clone)]
pub struct TopicProduceData {
    pub name: String,
    pub partitions: Vec<PartitionProduceData>,
}

#[derive(Debug, Clone)]
pub struct ProduceRequest {
    pub transactional_id: Option<String>,
    pub acks: RequiredAcks,
    pub timeout_ms: i32,
    pub topics: Vec<TopicProduceData>,
}

#[derive(Debug, Clone)]
pub struct PartitionProduceResponse {
    pub partition_index: i32,
    pub error_code: i16,
    pub base_offset: i64,
    pub log_append_time_ms: i64,
    pub log_start_offset: i64,
}

#[derive(Debug, Clone)]
pub struct TopicProduceResponse {
    pub name: String,
    pub partitions: Vec<PartitionProduceResponse>,
}

#[derive(Debug, Clone)]
pub struct ProduceResponse {
    pub topics: Vec<TopicProduceResponse>,
    pub throttle_time_ms: i32,
}

pub fn create_request(header: &RequestHeader, req: &ProduceRequest) -> Result<Vec<u8>> {
    let flexible = header.api_version >= 9;
    let mut w = Writer::with_capacity(256);
    header.write(&mut w);

    if header.api_version >= 3 {
        if flexible {
            w.put_compact_string(req.transactional_id.as_deref());
        } else {
            w.put_legacy_string(req.transactional_id.as_deref());
        }
    }
    w.put_i16(req.acks.code());
    w.put_i32(req.timeout_ms);

    let write_topic = |w: &mut Writer, t: &TopicProduceData| -> Result<()> {
        if flexible {
            w.put_compact_string(Some(&t.name));
        } else {
            w.put_legacy_string(Some(&t.name));
        }
        let write_partition = |w: &mut Writer, p: &PartitionProduceData| -> Result<()> {
            w.put_i32(p.partition_index);
            let mut batch_bytes = Writer::with_capacity(128);
            p.batch.write(&mut batch_bytes)?;
            let batch_bytes = batch_bytes.into_bytes();
            if flexible {
                w.put_compact_bytes(Some(&batch_bytes));
                w.put_tagged_fields();
            } else {
                w.put_legacy_bytes(Some(&batch_bytes));
            }
            Ok(())
        };
        if flexible {
            w.put_compact_array(&t.partitions, write_partition)?;
            w.put_tagged_fields();
        } else {
            w.put_legacy_array(&t.partitions, write_partition)?;
        }
        Ok(())
    };

    if flexible {
        w.put_compact_array(&req.topics, write_topic)?;
        w.put_tagged_fields();
    } else {
        w.put_legacy_array(&req.topics, write_topic)?;
    }

    Ok(w.prepend_length().to_vec())
}

pub fn parse_response(body: &[u8], api_version: i16) -> Result<ProduceResponse> {
    let flexible = api_version >= 9;
    let mut r = Reader::new(body);
    ResponseHeader::read(&mut r, flexible)?;

    let read_partition = |r: &mut Reader<'_>| -> Result<PartitionProduceResponse> {
        let partition_index = r.read_i32()?;
        let error_code = r.read_i16()?;
        let base_offset = r.read_i64()?;
        let log_append_time_ms = if api_version >= 2 { r.read_i64()? } else { -1 };
        let log_start_offset = if api_version >= 5 { r.read_i64()? } else { -1 };
        if api_version >= 8 {
            let _record_errors = if flexible {
                r.read_compact_array(|r| {
                    let idx = r.read_i32()?;
                    let msg = if flexible {
                        r.read_compact_string()?
                    } else {
                        r.read_legacy_string()?
                    };
                    if flexible {
                        r.skip_tagged_fields()?;
                    }
                    Ok((idx, msg))
                })?
            } else {
                r.read_legacy_array(|r| {
                    let idx = r.read_i32()?;
                    let msg = r.read_legacy_string()?;
                    Ok((idx, msg))
                })?
            };
            let _error_message = if flexible {
                r.read_compact_string()?
            } else {
                r.read_legacy_string()?
            };
        }
        if flexible {
            r.skip_tagged_fields()?;
        }
        Ok(PartitionProduceResponse {
            partition_index,
            error_code,
            base_offset,
            log_append_time_ms,
            log_start_offset,
        })
    };

    let read_topic = |r: &mut Reader<'_>| -> Result<TopicProduceResponse> {
        let name = if flexible {
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
        Ok(TopicProduceResponse { name, partitions })
    };

    let topics = if flexible {
        r.read_compact_array(read_topic)?
    } else {
        r.read_legacy_array(read_topic)?
    };

    let throttle_time_ms = if api_version >= 1 { r.read_i32()? } else { 0 };
    if flexible {
        r.skip_tagged_fields()?;
    }

    Ok(ProduceResponse {
        topics,
        throttle_time_ms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ApiKey;

    #[test]
    fn round_trip_request_legacy() {
        let header = RequestHeader::new(ApiKey::Produce, 2, 1, Some("c"), false);
        let req = ProduceRequest {
            transactional_id: None,
            acks: RequiredAcks::All,
            timeout_ms: 1000,
            topics: vec![TopicProduceData {
                name: "orders".into(),
                partitions: vec![PartitionProduceData {
                    partition_index: 0,
                    batch: RecordBatch::default(),
                }],
            }],
        };
        let bytes = create_request(&header, &req).unwrap();
        assert!(bytes.len() > 20);
    }

    #[test]
    fn response_round_trip() {
        let mut body = Writer::with_capacity(64);
        body.put_i32(5);
        body.put_legacy_array(&["orders".to_owned()], |w, t| {
            w.put_legacy_string(Some(t));
            w.put_legacy_array(&[0i32], |w, _| {
                w.put_i32(0);
                w.put_i16(0);
                w.put_i64(100);
                Ok(())
            })
            .unwrap();
            Ok(())
        })
        .unwrap();

        let parsed = parse_response(&body.into_bytes(), 0).unwrap();
        assert_eq!(parsed.topics[0].partitions[0].base_offset, 100);
    }
}
