//! `Metadata` (api key 3): cluster topology discovery (§4.3, §4.6).

use uuid::Uuid;

use crate::errors::Result;
use crate::protocol::header::{RequestHeader, ResponseHeader};
use crate::protocol::types::{Reader, Writer};

#[derive(Debug, Clone)]
pub struct MetadataRequest {
    /// `None` requests metadata for every topic in the cluster.
    pub topics: Option<Vec<String>>,
    pub allow_auto_topic_creation: bool,
}

#[derive(Debug, Clone)]
pub struct BrokerMetadata {
    pub node_id: i32,
    pub host: String,
    pub port: i32,
    pub rack: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PartitionMetadata {
    pub error_code: i16,
    pub partition_index: i32,
    pub leader_id: i32,
    pub leader_epoch: i32,
    pub replica_nodes: Vec<i32>,
    pub isr_nodes: Vec<i32>,
}

#[derive(Debug, Clone)]
pub struct TopicMetadata {
    pub error_code: i16,
    pub name: Option<String>,
    pub topic_id: Uuid,
    pub is_internal: bool,
    pub partitions: Vec<PartitionMetadata>,
}

#[derive(Debug, Clone)]
pub struct MetadataResponse {
    pub throttle_time_ms: i32,
    pub brokers: Vec<BrokerMetadata>,
    pub cluster_id: Option<String>,
    pub controller_id: i32,
    pub topics: Vec<TopicMetadata>,
}

pub fn create_request(header: &RequestHeader, req: &MetadataRequest) -> Result<Vec<u8>> {
    let flexible = header.api_version >= 9;
    let mut w = Writer::with_capacity(128);
    header.write(&mut w);

    match &req.topics {
        None => {
            if flexible {
                // null compact array requests "all topics"
                w.put_unsigned_varint(0);
            } else {
                w.put_i32(-1);
            }
        }
        Some(topics) => {
            if flexible {
                w.put_compact_array(topics, |w, t| {
                    w.put_compact_string(Some(t));
                    w.put_tagged_fields();
                    Ok(())
                })?;
            } else {
                w.put_legacy_array(topics, |w, t| {
                    w.put_legacy_string(Some(t));
                    Ok(())
                })?;
            }
        }
    }

    if header.api_version >= 4 {
        w.put_bool(req.allow_auto_topic_creation);
    }
    if flexible {
        w.put_tagged_fields();
    }

    Ok(w.prepend_length().to_vec())
}

pub fn parse_response(body: &[u8], api_version: i16) -> Result<MetadataResponse> {
    let flexible = api_version >= 9;
    let mut r = Reader::new(body);
    ResponseHeader::read(&mut r, flexible)?;

    let throttle_time_ms = if api_version >= 3 { r.read_i32()? } else { 0 };

    let read_broker = |r: &mut Reader<'_>| -> Result<BrokerMetadata> {
        let node_id = r.read_i32()?;
        let host = if flexible {
            r.read_compact_string()?
        } else {
            r.read_legacy_string()?
        }
        .unwrap_or_default();
        let port = r.read_i32()?;
        let rack = if api_version >= 1 {
            if flexible {
                r.read_compact_string()?
            } else {
                r.read_legacy_string()?
            }
        } else {
            None
        };
        if flexible {
            r.skip_tagged_fields()?;
        }
        Ok(BrokerMetadata {
            node_id,
            host,
            port,
            rack,
        })
    };

    let brokers = if flexible {
        r.read_compact_array(read_broker)?
    } else {
        r.read_legacy_array(read_broker)?
    };

    let cluster_id = if api_version >= 2 {
        if flexible {
            r.read_compact_string()?
        } else {
            r.read_legacy_string()?
        }
    } else {
        None
    };

    let controller_id = if api_version >= 1 { r.read_i32()? } else { -1 };

    let read_partition = |r: &mut Reader<'_>| -> Result<PartitionMetadata> {
        let error_code = r.read_i16()?;
        let partition_index = r.read_i32()?;
        let leader_id = r.read_i32()?;
        let leader_epoch = if api_version >= 7 { r.read_i32()? } else { -1 };
        let replica_nodes = if flexible {
            r.read_compact_array(|r| r.read_i32())?
        } else {
            r.read_legacy_array(|r| r.read_i32())?
        };
        let isr_nodes = if flexible {
            r.read_compact_array(|r| r.read_i32())?
        } else {
            r.read_legacy_array(|r| r.read_i32())?
        };
        if api_version >= 5 {
            let _offline_replicas = if flexible {
                r.read_compact_array(|r| r.read_i32())?
            } else {
                r.read_legacy_array(|r| r.read_i32())?
            };
        }
        if flexible {
            r.skip_tagged_fields()?;
        }
        Ok(PartitionMetadata {
            error_code,
            partition_index,
            leader_id,
            leader_epoch,
            replica_nodes,
            isr_nodes,
        })
    };

    let read_topic = |r: &mut Reader<'_>| -> Result<TopicMetadata> {
        let error_code = r.read_i16()?;
        let name = if flexible {
            r.read_compact_string()?
        } else {
            r.read_legacy_string()?
        };
        let topic_id = if api_version >= 10 {
            r.read_uuid()?
        } else {
            Uuid::nil()
        };
        let is_internal = if api_version >= 1 { r.read_bool()? } else { false };
        let partitions = if flexible {
            r.read_compact_array(read_partition)?
        } else {
            r.read_legacy_array(read_partition)?
        };
        if api_version >= 8 {
            let _authorized_operations = r.read_i32()?;
        }
        if flexible {
            r.skip_tagged_fields()?;
        }
        Ok(TopicMetadata {
            error_code,
            name,
            topic_id,
            is_internal,
            partitions,
        })
    };

    let topics = if flexible {
        r.read_compact_array(read_topic)?
    } else {
        r.read_legacy_array(read_topic)?
    };

    if flexible {
        r.skip_tagged_fields()?;
    }

    Ok(MetadataResponse {
        throttle_time_ms,
        brokers,
        cluster_id,
        controller_id,
        topics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ApiKey;

    #[test]
    fn legacy_request_all_topics_is_negative_one() {
        let header = RequestHeader::new(ApiKey::Metadata, 1, 1, Some("c"), false);
        let req = MetadataRequest {
            topics: None,
            allow_auto_topic_creation: false,
        };
        let bytes = create_request(&header, &req).unwrap();
        assert_eq!(&bytes[bytes.len() - 4..], &(-1i32).to_be_bytes());
    }

    #[test]
    fn response_round_trip_one_topic_one_partition() {
        let mut body = Writer::with_capacity(128);
        body.put_i32(9); // correlation id
        body.put_legacy_array(&[(1i32, "host".to_owned(), 9092i32)], |w, (id, host, port)| {
            w.put_i32(*id);
            w.put_legacy_string(Some(host));
            w.put_i32(*port);
            Ok(())
        })
        .unwrap();
        body.put_i32(1); // controller id
        body.put_legacy_array(&[0], |w, _| {
            w.put_i16(0); // topic error
            w.put_legacy_string(Some("orders"));
            w.put_bool(false);
            w.put_legacy_array(&[0], |w, _| {
                w.put_i16(0); // partition error
                w.put_i32(0); // partition index
                w.put_i32(1); // leader id
                w.put_legacy_array(&[1], |w, r| {
                    w.put_i32(*r);
                    Ok(())
                })
                .unwrap();
                w.put_legacy_array(&[1], |w, r| {
                    w.put_i32(*r);
                    Ok(())
                })
                .unwrap();
                Ok(())
            })
            .unwrap();
            Ok(())
        })
        .unwrap();

        let parsed = parse_response(&body.into_bytes(), 1).unwrap();
        assert_eq!(parsed.brokers.len(), 1);
        assert_eq!(parsed.topics[0].name.as_deref(), Some("orders"));
        assert_eq!(parsed.topics[0].partitions[0].leader_id, 1);
    }
}
