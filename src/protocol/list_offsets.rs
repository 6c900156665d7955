//! `ListOffsets` (api key 2): resolve a timestamp or `earliest`/`latest` marker to an offset.

use crate::errors::Result;
use crate::protocol::header::{RequestHeader, ResponseHeader};
use crate::protocol::types::{Reader, Writer};

pub const EARLIEST_TIMESTAMP: i64 = -2;
pub const LATEST_TIMESTAMP: i64 = -1;

#[derive(Debug, Clone)]
pub struct ListOffsetsPartition {
    pub partition: i32,
    pub current_leader_epoch: i32,
    pub timestamp: i64,
}

#[derive(Debug, Clone)]
pub struct ListOffsetsTopic {
    pub topic: String,
    pub partitions: Vec<ListOffsetsPartition>,
}

#[derive(Debug, Clone)]
pub struct ListOffsetsRequest {
    pub replica_id: i32,
    pub isolation_level: i8,
    pub topics: Vec<ListOffsetsTopic>,
}

#[derive(Debug, Clone)]
pub struct ListOffsetsPartitionResponse {
    pub partition: i32,
    pub error_code: i16,
    pub timestamp: i64,
    pub offset: i64,
    pub leader_epoch: i32,
}

#[derive(Debug, Clone)]
pub struct ListOffsetsTopicResponse {
    pub topic: String,
    pub partitions: Vec<ListOffsetsPartitionResponse>,
}

#[derive(Debug, Clone)]
pub struct ListOffsetsResponse {
    pub throttle_time_ms: i32,
    pub topics: Vec<ListOffsetsTopicResponse>,
}

pub fn create_request(header: &RequestHeader, req: &ListOffsetsRequest) -> Result<Vec<u8>> {
    let flexible = header.api_version >= 6;
    let mut w = Writer::with_capacity(128);
    header.write(&mut w);

    w.put_i32(req.replica_id);
    if header.api_version >= 2 {
        w.put_i8(req.isolation_level);
    }

    let write_partition = |w: &mut Writer, p: &ListOffsetsPartition| -> Result<()> {
        w.put_i32(p.partition);
        if header.api_version >= 4 {
            w.put_i32(p.current_leader_epoch);
        }
        w.put_i64(p.timestamp);
        if flexible {
            w.put_tagged_fields();
        }
        Ok(())
    };

    let write_topic = |w: &mut Writer, t: &ListOffsetsTopic| -> Result<()> {
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

pub fn parse_response(body: &[u8], api_version: i16) -> Result<ListOffsetsResponse> {
    let flexible = api_version >= 6;
    let mut r = Reader::new(body);
    ResponseHeader::read(&mut r, flexible)?;

    let throttle_time_ms = if api_version >= 2 { r.read_i32()? } else { 0 };

    let read_partition = |r: &mut Reader<'_>| -> Result<ListOffsetsPartitionResponse> {
        let partition = r.read_i32()?;
        let error_code = r.read_i16()?;
        let (timestamp, offset) = if api_version >= 1 {
            (r.read_i64()?, r.read_i64()?)
        } else {
            let offsets = if flexible {
                r.read_compact_array(|r| r.read_i64())?
            } else {
                r.read_legacy_array(|r| r.read_i64())?
            };
            (-1, offsets.first().copied().unwrap_or(-1))
        };
        let leader_epoch = if api_version >= 4 { r.read_i32()? } else { -1 };
        if flexible {
            r.skip_tagged_fields()?;
        }
        Ok(ListOffsetsPartitionResponse {
            partition,
            error_code,
            timestamp,
            offset,
            leader_epoch,
        })
    };

    let read_topic = |r: &mut Reader<'_>| -> Result<ListOffsetsTopicResponse> {
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
        Ok(ListOffsetsTopicResponse { topic, partitions })
    };

    let topics = if flexible {
        r.read_compact_array(read_topic)?
    } else {
        r.read_legacy_array(read_topic)?
    };
    if flexible {
        r.skip_tagged_fields()?;
    }

    Ok(ListOffsetsResponse {
        throttle_time_ms,
        topics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ApiKey;

    #[test]
    fn request_encodes_latest_marker() {
        let header = RequestHeader::new(ApiKey::ListOffsets, 1, 1, Some("c"), false);
        let req = ListOffsetsRequest {
            replica_id: -1,
            isolation_level: 0,
            topics: vec![ListOffsetsTopic {
                topic: "orders".into(),
                partitions: vec![ListOffsetsPartition {
                    partition: 0,
                    current_leader_epoch: -1,
                    timestamp: LATEST_TIMESTAMP,
                }],
            }],
        };
        let bytes = create_request(&header, &req).unwrap();
        assert!(bytes.len() > 10);
    }
}
