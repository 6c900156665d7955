//! `TxnOffsetCommit` (api key 28): commits consumer offsets as part of an in-flight transaction
//! (§4.8). Same `offset+1` convention as the non-transactional `OffsetCommit`.

use crate::errors::Result;
use crate::protocol::header::{RequestHeader, ResponseHeader};
use crate::protocol::types::{Reader, Writer};

#[derive(Debug, Clone)]
pub struct TxnOffsetCommitPartition {
    pub partition: i32,
    pub committed_offset: i64,
    pub committed_leader_epoch: i32,
    pub metadata: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TxnOffsetCommitTopic {
    pub topic: String,
    pub partitions: Vec<TxnOffsetCommitPartition>,
}

#[derive(Debug, Clone)]
pub struct TxnOffsetCommitRequest {
    pub transactional_id: String,
    pub group_id: String,
    pub producer_id: i64,
    pub producer_epoch: i16,
    pub generation_id: i32,
    pub member_id: String,
    pub group_instance_id: Option<String>,
    pub topics: Vec<TxnOffsetCommitTopic>,
}

#[derive(Debug, Clone)]
pub struct TxnOffsetCommitPartitionResponse {
    pub partition: i32,
    pub error_code: i16,
}

#[derive(Debug, Clone)]
pub struct TxnOffsetCommitTopicResponse {
    pub topic: String,
    pub partitions: Vec<TxnOffsetCommitPartitionResponse>,
}

#[derive(Debug, Clone)]
pub struct TxnOffsetCommitResponse {
    pub throttle_time_ms: i32,
    pub topics: Vec<TxnOffsetCommitTopicResponse>,
}

pub fn create_request(header: &RequestHeader, req: &TxnOffsetCommitRequest) -> Result<Vec<u8>> {
    let flexible = header.api_version >= 3;
    let mut w = Writer::with_capacity(256);
    header.write(&mut w);

    if flexible {
        w.put_compact_string(Some(&req.transactional_id));
        w.put_compact_string(Some(&req.group_id));
    } else {
        w.put_legacy_string(Some(&req.transactional_id));
        w.put_legacy_string(Some(&req.group_id));
    }
    w.put_i64(req.producer_id);
    w.put_i16(req.producer_epoch);
    if header.api_version >= 3 {
        w.put_i32(req.generation_id);
        if flexible {
            w.put_compact_string(Some(&req.member_id));
            w.put_compact_string(req.group_instance_id.as_deref());
        } else {
            w.put_legacy_string(Some(&req.member_id));
            w.put_legacy_string(req.group_instance_id.as_deref());
        }
    }

    let write_partition = |w: &mut Writer, p: &TxnOffsetCommitPartition| -> Result<()> {
        w.put_i32(p.partition);
        w.put_i64(p.committed_offset);
        if header.api_version >= 2 {
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

    let write_topic = |w: &mut Writer, t: &TxnOffsetCommitTopic| -> Result<()> {
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

pub fn parse_response(body: &[u8], api_version: i16) -> Result<TxnOffsetCommitResponse> {
    let flexible = api_version >= 3;
    let mut r = Reader::new(body);
    ResponseHeader::read(&mut r, flexible)?;

    let throttle_time_ms = r.read_i32()?;

    let read_partition = |r: &mut Reader<'_>| -> Result<TxnOffsetCommitPartitionResponse> {
        let partition = r.read_i32()?;
        let error_code = r.read_i16()?;
        if flexible {
            r.skip_tagged_fields()?;
        }
        Ok(TxnOffsetCommitPartitionResponse {
            partition,
            error_code,
        })
    };

    let read_topic = |r: &mut Reader<'_>| -> Result<TxnOffsetCommitTopicResponse> {
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
        Ok(TxnOffsetCommitTopicResponse { topic, partitions })
    };

    let topics = if flexible {
        r.read_compact_array(read_topic)?
    } else {
        r.read_legacy_array(read_topic)?
    };
    if flexible {
        r.skip_tagged_fields()?;
    }

    Ok(TxnOffsetCommitResponse {
        throttle_time_ms,
        topics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ApiKey;

    #[test]
    fn round_trip() {
        let header = RequestHeader::new(ApiKey::TxnOffsetCommit, 0, 1, Some("c"), false);
        let req = TxnOffsetCommitRequest {
            transactional_id: "txn-1".into(),
            group_id: "g".into(),
            producer_id: 42,
            producer_epoch: 0,
            generation_id: -1,
            member_id: "".into(),
            group_instance_id: None,
            topics: vec![TxnOffsetCommitTopic {
                topic: "orders".into(),
                partitions: vec![TxnOffsetCommitPartition {
                    partition: 0,
                    committed_offset: 10,
                    committed_leader_epoch: -1,
                    metadata: None,
                }],
            }],
        };
        let bytes = create_request(&header, &req).unwrap();
        assert!(bytes.len() > 10);
    }
}
