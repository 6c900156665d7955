//! `CreateTopics` (api key 19): the admin-façade's topic provisioning call (§4.9).

use crate::errors::Result;
use crate::protocol::header::{RequestHeader, ResponseHeader};
use crate::protocol::types::{Reader, Writer};

#[derive(Debug, Clone)]
pub struct ReplicaAssignment {
    pub partition_index: i32,
    pub broker_ids: Vec<i32>,
}

#[derive(Debug, Clone)]
pub struct ConfigEntry {
    pub name: String,
    pub value: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewTopic {
    pub name: String,
    pub num_partitions: i32,
    pub replication_factor: i16,
    pub assignments: Vec<ReplicaAssignment>,
    pub configs: Vec<ConfigEntry>,
}

#[derive(Debug, Clone)]
pub struct CreateTopicsRequest {
    pub topics: Vec<NewTopic>,
    pub timeout_ms: i32,
    pub validate_only: bool,
}

#[derive(Debug, Clone)]
pub struct CreatableTopicResult {
    pub name: String,
    pub error_code: i16,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateTopicsResponse {
    pub throttle_time_ms: i32,
    pub topics: Vec<CreatableTopicResult>,
}

pub fn create_request(header: &RequestHeader, req: &CreateTopicsRequest) -> Result<Vec<u8>> {
    let flexible = header.api_version >= 5;
    let mut w = Writer::with_capacity(256);
    header.write(&mut w);

    let write_assignment = |w: &mut Writer, a: &ReplicaAssignment| -> Result<()> {
        w.put_i32(a.partition_index);
        if flexible {
            w.put_compact_array(&a.broker_ids, |w, b| {
                w.put_i32(*b);
                Ok(())
            })?;
            w.put_tagged_fields();
        } else {
            w.put_legacy_array(&a.broker_ids, |w, b| {
                w.put_i32(*b);
                Ok(())
            })?;
        }
        Ok(())
    };

    let write_config = |w: &mut Writer, c: &ConfigEntry| -> Result<()> {
        if flexible {
            w.put_compact_string(Some(&c.name));
            w.put_compact_string(c.value.as_deref());
            w.put_tagged_fields();
        } else {
            w.put_legacy_string(Some(&c.name));
            w.put_legacy_string(c.value.as_deref());
        }
        Ok(())
    };

    let write_topic = |w: &mut Writer, t: &NewTopic| -> Result<()> {
        if flexible {
            w.put_compact_string(Some(&t.name));
        } else {
            w.put_legacy_string(Some(&t.name));
        }
        w.put_i32(t.num_partitions);
        w.put_i16(t.replication_factor);
        if flexible {
            w.put_compact_array(&t.assignments, write_assignment)?;
            w.put_compact_array(&t.configs, write_config)?;
            w.put_tagged_fields();
        } else {
            w.put_legacy_array(&t.assignments, write_assignment)?;
            w.put_legacy_array(&t.configs, write_config)?;
        }
        Ok(())
    };

    if flexible {
        w.put_compact_array(&req.topics, write_topic)?;
    } else {
        w.put_legacy_array(&req.topics, write_topic)?;
    }
    w.put_i32(req.timeout_ms);
    if header.api_version >= 1 {
        w.put_bool(req.validate_only);
    }
    if flexible {
        w.put_tagged_fields();
    }

    Ok(w.prepend_length().to_vec())
}

pub fn parse_response(body: &[u8], api_version: i16) -> Result<CreateTopicsResponse> {
    let flexible = api_version >= 5;
    let mut r = Reader::new(body);
    ResponseHeader::read(&mut r, flexible)?;

    let throttle_time_ms = if api_version >= 2 { r.read_i32()? } else { 0 };

    let read_topic = |r: &mut Reader<'_>| -> Result<CreatableTopicResult> {
        let name = if flexible {
            r.read_compact_string()?
        } else {
            r.read_legacy_string()?
        }
        .unwrap_or_default();
        let error_code = r.read_i16()?;
        let error_message = if api_version >= 1 {
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
        Ok(CreatableTopicResult {
            name,
            error_code,
            error_message,
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

    Ok(CreateTopicsResponse {
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
        let header = RequestHeader::new(ApiKey::CreateTopics, 2, 1, Some("c"), false);
        let req = CreateTopicsRequest {
            topics: vec![NewTopic {
                name: "orders".into(),
                num_partitions: 6,
                replication_factor: 3,
                assignments: vec![],
                configs: vec![],
            }],
            timeout_ms: 5000,
            validate_only: false,
        };
        let bytes = create_request(&header, &req).unwrap();
        assert!(bytes.len() > 20);
    }
}
