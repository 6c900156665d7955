//! `OffsetCommit` (api key 8): persist consumed offsets against a group (§4.7).
//!
//! Per convention, the offset committed is always the offset of the *next* record to read
//! (`last_consumed_offset + 1`), not the offset of the last record actually processed.

use crate::errors::Result;
use crate::protocol::header::{RequestHeader, ResponseHeader};
use crate::protocol::types::{Reader, Writer};

#[derive(Debug, Clone)]
pub struct OffsetCommitPartition {
    pub partition: i32,
    pub committed_offset: i64,
    pub committed_leader_epoch: i32,
    pub metadata: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OffsetCommitTopic {
    pub topic: String,
    pub partitions: Vec<OffsetCommitPartition>,
}

#[derive(Debug, Clone)]
pub struct OffsetCommitRequest {
    pub group_id: String,
    pub generation_id: i32,
    pub member_id: String,
    pub group_instance_id: Option<String>,
    pub topics: Vec<OffsetCommitTopic>,
}

#[derive(Debug, Clone)]
pub struct OffsetCommitPartitionResponse {
    pub partition: i32,
    pub error_code: i16,
}

#[derive(Debug, Clone)]
pub struct OffsetCommitTopicResponse {
    pub topic: String,
    pub partitions: Vec<OffsetCommitPartitionResponse>,
}

#[derive(Debug, Clone)]
pub struct OffsetCommitResponse {
    pub throttle_time_ms: i32,
    pub topics: Vec<OffsetCommitTopicResponse>,
}

pub fn create_request(header: &RequestHeader, req: &OffsetCommitRequest) -> Result<Vec<u8>> {
    let flexible = header.api_version >= 8;
    let mut w = Writer::with_capacity(256);
    header.write(&mut w);

    if flexible {
        w.put_compact_string(Some(&req.group_id));
    } else {
        w.put_legacy_string(Some(&req.group_id));
    }
    if header.api_version >= 1 {
        w.put_i32(req.generation_id);
        if flexible {
            w.put_compact_string(Some(&req.member_id));
        } else {
            w.put_legacy_string(Some(&req.member_id));
        }
    }
    if header.api_version >= 7 {
        if flexible {
            w.put_compact_string(req.group_instance_id.as_deref());
        } else {
            w.put_legacy_string(req.group_instance_id.as_deref());
        }
    }

    let write_partition = |w: &mut Writer, p: &OffsetCommitPartition| -> Result<()> {
        w.put_i32(p.partition);
        w.put_i64(p.committed_offset);
        if header.api_version >= 6 {
            w.put_i32(p.committed_leader_epoch);
        }
        if flexible {
            w.put_compact_string(p.metadata.as_deref());
            w.put_tagged_fields();
        } else {
            w.put_legacy_string(p.metadata.as_deref());
        }
        Ok(())
    };

    let write_topic = |w: &mut Writer, t: &OffsetCommitTopic| -> Result<()> {
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
        w.put_tagged_fields();
    } else {
        w.put_legacy_array(&req.topics, write_topic)?;
    }

    Ok(w.prepend_length().to_vec())
}

pub fn parse_response(body: &[u8], api_version: i16) -> Result<OffsetCommitResponse> {
    let flexible = api_version >= 8;
    let mut r = Reader::new(body);
    ResponseHeader::read(&mut r, flexible)?;

    let throttle_time_ms = if api_version >= 3 { r.read_i32()? } else { 0 };

    let read_partition = |r: &mut Reader<'_>| -> Result<OffsetCommitPartitionResponse> {
        let partition = r.read_i32()?;
        let error_code = r.read_i16()?;
        if flexible {
            r.skip_tagged_fields()?;
        }
        Ok(OffsetCommitPartitionResponse {
            partition,
            error_code,
        })
    };

    let read_topic = |r: &mut Reader<'_>| -> Result<OffsetCommitTopicResponse> {
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
        Ok(OffsetCommitTopicResponse { topic, partitions })
    };

    let topics = if flexible {
        r.read_compact_array(read_topic)?
    } else {
        r.read_legacy_array(read_topic)?
    };
    if flexible {
        r.skip_tagged_fields()?;
    }

    Ok(OffsetCommitResponse {
        throttle_time_ms,
        topics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ApiKey;

    #[test]
    fn round_trip_offset_plus_one_semantics() {
        let header = RequestHeader::new(ApiKey::OffsetCommit, 2, 1, Some("c"), false);
        let last_consumed = 41i64;
        let req = OffsetCommitRequest {
            group_id: "g".into(),
            generation_id: 1,
            member_id: "m1".into(),
            group_instance_id: None,
            topics: vec![OffsetCommitTopic {
                topic: "orders".into(),
                partitions: vec![OffsetCommitPartition {
                    partition: 0,
                    committed_offset: last_consumed + 1,
                    committed_leader_epoch: -1,
                    metadata: None,
                }],
            }],
        };
        let bytes = create_request(&header, &req).unwrap();
        assert!(bytes.len() > 20);
        assert_eq!(req.topics[0].partitions[0].committed_offset, 42);
    }
}
