//! `AddPartitionsToTxn` (api key 24): registers partitions a transaction will write to (§4.8).

use crate::errors::Result;
use crate::protocol::header::{RequestHeader, ResponseHeader};
use crate::protocol::types::{Reader, Writer};

#[derive(Debug, Clone)]
pub struct TxnTopicPartitions {
    pub topic: String,
    pub partitions: Vec<i32>,
}

#[derive(Debug, Clone)]
pub struct AddPartitionsToTxnRequest {
    pub transactional_id: String,
    pub producer_id: i64,
    pub producer_epoch: i16,
    pub topics: Vec<TxnTopicPartitions>,
}

#[derive(Debug, Clone)]
pub struct PartitionTxnError {
    pub partition: i32,
    pub error_code: i16,
}

#[derive(Debug, Clone)]
pub struct TopicTxnErrors {
    pub topic: String,
    pub partitions: Vec<PartitionTxnError>,
}

#[derive(Debug, Clone)]
pub struct AddPartitionsToTxnResponse {
    pub throttle_time_ms: i32,
    pub topics: Vec<TopicTxnErrors>,
}

pub fn create_request(header: &RequestHeader, req: &AddPartitionsToTxnRequest) -> Result<Vec<u8>> {
    let flexible = header.api_version >= 3;
    let mut w = Writer::with_capacity(128);
    header.write(&mut w);

    if flexible {
        w.put_compact_string(Some(&req.transactional_id));
    } else {
        w.put_legacy_string(Some(&req.transactional_id));
    }
    w.put_i64(req.producer_id);
    w.put_i16(req.producer_epoch);

    let write_topic = |w: &mut Writer, t: &TxnTopicPartitions| -> Result<()> {
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

    if flexible {
        w.put_compact_array(&req.topics, write_topic)?;
        w.put_tagged_fields();
    } else {
        w.put_legacy_array(&req.topics, write_topic)?;
    }

    Ok(w.prepend_length().to_vec())
}

pub fn parse_response(body: &[u8], api_version: i16) -> Result<AddPartitionsToTxnResponse> {
    let flexible = api_version >= 3;
    let mut r = Reader::new(body);
    ResponseHeader::read(&mut r, flexible)?;

    let throttle_time_ms = r.read_i32()?;

    let read_partition = |r: &mut Reader<'_>| -> Result<PartitionTxnError> {
        let partition = r.read_i32()?;
        let error_code = r.read_i16()?;
        if flexible {
            r.skip_tagged_fields()?;
        }
        Ok(PartitionTxnError {
            partition,
            error_code,
        })
    };

    let read_topic = |r: &mut Reader<'_>| -> Result<TopicTxnErrors> {
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
        Ok(TopicTxnErrors { topic, partitions })
    };

    let topics = if flexible {
        r.read_compact_array(read_topic)?
    } else {
        r.read_legacy_array(read_topic)?
    };
    if flexible {
        r.skip_tagged_fields()?;
    }

    Ok(AddPartitionsToTxnResponse {
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
        let header = RequestHeader::new(ApiKey::AddPartitionsToTxn, 0, 1, Some("c"), false);
        let req = AddPartitionsToTxnRequest {
            transactional_id: "txn-1".into(),
            producer_id: 42,
            producer_epoch: 0,
            topics: vec![TxnTopicPartitions {
                topic: "orders".into(),
                partitions: vec![0],
            }],
        };
        let bytes = create_request(&header, &req).unwrap();
        assert!(bytes.len() > 10);
    }
}
