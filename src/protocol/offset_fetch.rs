//! `OffsetFetch` (api key 9): read back previously committed offsets (§4.7).

use crate::errors::Result;
use crate::protocol::header::{RequestHeader, ResponseHeader};
use crate::protocol::types::{Reader, Writer};

#[derive(Debug, Clone)]
pub struct OffsetFetchTopic {
    pub topic: String,
    pub partitions: Vec<i32>,
}

#[derive(Debug, Clone)]
pub struct OffsetFetchRequest {
    pub group_id: String,
    /// `None` requests offsets for every topic the group has committed.
    pub topics: Option<Vec<OffsetFetchTopic>>,
}

#[derive(Debug, Clone)]
pub struct OffsetFetchPartitionResponse {
    pub partition: i32,
    pub committed_offset: i64,
    pub committed_leader_epoch: i32,
    pub metadata: Option<String>,
    pub error_code: i16,
}

#[derive(Debug, Clone)]
pub struct OffsetFetchTopicResponse {
    pub topic: String,
    pub partitions: Vec<OffsetFetchPartitionResponse>,
}

#[derive(Debug, Clone)]
pub struct OffsetFetchResponse {
    pub throttle_time_ms: i32,
    pub topics: Vec<OffsetFetchTopicResponse>,
    pub error_code: i16,
}

pub fn create_request(header: &RequestHeader, req: &OffsetFetchRequest) -> Result<Vec<u8>> {
    let flexible = header.api_version >= 6;
    let mut w = Writer::with_capacity(128);
    header.write(&mut w);

    if flexible {
        w.put_compact_string(Some(&req.group_id));
    } else {
        w.put_legacy_string(Some(&req.group_id));
    }

    let write_topic = |w: &mut Writer, t: &OffsetFetchTopic| -> Result<()> {
        if flexible {
            w.put_compact_string(Some(&t.topic));
            w.put_compact_array(&t.partitions, |w, p| {
                w.put_i32(*p);
                Ok(())
            })?;
            w.put_tagged_fields();
        } else {
            w.put_legacy_string(Some(&t.topic));
            w.put_legacy_array(&t.partitions, |w, p| {
                w.put_i32(*p);
                Ok(())
            })?;
        }
        Ok(())
    };

    match &req.topics {
        Some(topics) => {
            if flexible {
                w.put_compact_array(topics, write_topic)?;
            } else {
                w.put_legacy_array(topics, write_topic)?;
            }
        }
        None => {
            if flexible {
                w.put_unsigned_varint(0); // null compact array: all topics
            } else {
                w.put_i32(-1);
            }
        }
    }

    if flexible {
        w.put_tagged_fields();
    }

    Ok(w.prepend_length().to_vec())
}

pub fn parse_response(body: &[u8], api_version: i16) -> Result<OffsetFetchResponse> {
    let flexible = api_version >= 6;
    let mut r = Reader::new(body);
    ResponseHeader::read(&mut r, flexible)?;

    let throttle_time_ms = if api_version >= 3 { r.read_i32()? } else { 0 };

    let read_partition = |r: &mut Reader<'_>| -> Result<OffsetFetchPartitionResponse> {
        let partition = r.read_i32()?;
        let committed_offset = r.read_i64()?;
        let committed_leader_epoch = if api_version >= 5 { r.read_i32()? } else { -1 };
        let metadata = if flexible {
            r.read_compact_string()?
        } else {
            r.read_legacy_string()?
        };
        let error_code = r.read_i16()?;
        if flexible {
            r.skip_tagged_fields()?;
        }
        Ok(OffsetFetchPartitionResponse {
            partition,
            committed_offset,
            committed_leader_epoch,
            metadata,
            error_code,
        })
    };

    let read_topic = |r: &mut Reader<'_>| -> Result<OffsetFetchTopicResponse> {
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
        Ok(OffsetFetchTopicResponse { topic, partitions })
    };

    let topics = if flexible {
        r.read_compact_array(read_topic)?
    } else {
        r.read_legacy_array(read_topic)?
    };

    let error_code = if api_version >= 2 { r.read_i16()? } else { 0 };
    if flexible {
        r.skip_tagged_fields()?;
    }

    Ok(OffsetFetchResponse {
        throttle_time_ms,
        topics,
        error_code,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ApiKey;

    #[test]
    fn round_trip() {
        let header = RequestHeader::new(ApiKey::OffsetFetch, 1, 1, Some("c"), false);
        let req = OffsetFetchRequest {
            group_id: "g".into(),
            topics: Some(vec![OffsetFetchTopic {
                topic: "orders".into(),
                partitions: vec![0, 1],
            }]),
        };
        let bytes = create_request(&header, &req).unwrap();
        assert!(bytes.len() > 10);
    }
}
