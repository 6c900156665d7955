//! `JoinGroup` (api key 11): the first phase of the consumer group protocol (§4.7).

use crate::errors::Result;
use crate::protocol::header::{RequestHeader, ResponseHeader};
use crate::protocol::types::{Reader, Writer};

#[derive(Debug, Clone)]
pub struct GroupProtocol {
    pub name: String,
    pub metadata: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct JoinGroupRequest {
    pub group_id: String,
    pub session_timeout_ms: i32,
    pub rebalance_timeout_ms: i32,
    pub member_id: String,
    pub group_instance_id: Option<String>,
    pub protocol_type: String,
    pub protocols: Vec<GroupProtocol>,
}

#[derive(Debug, Clone)]
pub struct JoinGroupMember {
    pub member_id: String,
    pub group_instance_id: Option<String>,
    pub metadata: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct JoinGroupResponse {
    pub error_code: i16,
    pub generation_id: i32,
    pub protocol_name: Option<String>,
    pub leader: String,
    pub member_id: String,
    pub members: Vec<JoinGroupMember>,
}

pub fn create_request(header: &RequestHeader, req: &JoinGroupRequest) -> Result<Vec<u8>> {
    let flexible = header.api_version >= 6;
    let mut w = Writer::with_capacity(256);
    header.write(&mut w);

    if flexible {
        w.put_compact_string(Some(&req.group_id));
    } else {
        w.put_legacy_string(Some(&req.group_id));
    }
    w.put_i32(req.session_timeout_ms);
    if header.api_version >= 1 {
        w.put_i32(req.rebalance_timeout_ms);
    }
    if flexible {
        w.put_compact_string(Some(&req.member_id));
    } else {
        w.put_legacy_string(Some(&req.member_id));
    }
    if header.api_version >= 5 {
        if flexible {
            w.put_compact_string(req.group_instance_id.as_deref());
        } else {
            w.put_legacy_string(req.group_instance_id.as_deref());
        }
    }
    if flexible {
        w.put_compact_string(Some(&req.protocol_type));
    } else {
        w.put_legacy_string(Some(&req.protocol_type));
    }

    let write_protocol = |w: &mut Writer, p: &GroupProtocol| -> Result<()> {
        if flexible {
            w.put_compact_string(Some(&p.name));
            w.put_compact_bytes(Some(&p.metadata));
            w.put_tagged_fields();
        } else {
            w.put_legacy_string(Some(&p.name));
            w.put_legacy_bytes(Some(&p.metadata));
        }
        Ok(())
    };

    if flexible {
        w.put_compact_array(&req.protocols, write_protocol)?;
        w.put_tagged_fields();
    } else {
        w.put_legacy_array(&req.protocols, write_protocol)?;
    }

    Ok(w.prepend_length().to_vec())
}

pub fn parse_response(body: &[u8], api_version: i16) -> Result<JoinGroupResponse> {
    let flexible = api_version >= 6;
    let mut r = Reader::new(body);
    ResponseHeader::read(&mut r, flexible)?;

    if api_version >= 2 {
        let _throttle_time_ms = r.read_i32()?;
    }
    let error_code = r.read_i16()?;
    let generation_id = r.read_i32()?;
    let protocol_name = if flexible {
        r.read_compact_string()?
    } else {
        r.read_legacy_string()?
    };
    if api_version >= 7 {
        // protocol_type appears here on the wire in recent versions; unused by this client.
        let _protocol_type = if flexible {
            r.read_compact_string()?
        } else {
            r.read_legacy_string()?
        };
    }
    let leader = if flexible {
        r.read_compact_string()?
    } else {
        r.read_legacy_string()?
    }
    .unwrap_or_default();
    let member_id = if flexible {
        r.read_compact_string()?
    } else {
        r.read_legacy_string()?
    }
    .unwrap_or_default();

    let read_member = |r: &mut Reader<'_>| -> Result<JoinGroupMember> {
        let member_id = if flexible {
            r.read_compact_string()?
        } else {
            r.read_legacy_string()?
        }
        .unwrap_or_default();
        let group_instance_id = if api_version >= 5 {
            if flexible {
                r.read_compact_string()?
            } else {
                r.read_legacy_string()?
            }
        } else {
            None
        };
        let metadata = if flexible {
            r.read_compact_bytes()?
        } else {
            r.read_legacy_bytes()?
        }
        .map(|b| b.to_vec())
        .unwrap_or_default();
        if flexible {
            r.skip_tagged_fields()?;
        }
        Ok(JoinGroupMember {
            member_id,
            group_instance_id,
            metadata,
        })
    };

    let members = if flexible {
        r.read_compact_array(read_member)?
    } else {
        r.read_legacy_array(read_member)?
    };
    if flexible {
        r.skip_tagged_fields()?;
    }

    Ok(JoinGroupResponse {
        error_code,
        generation_id,
        protocol_name,
        leader,
        member_id,
        members,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ApiKey;

    #[test]
    fn request_round_trip_shape() {
        let header = RequestHeader::new(ApiKey::JoinGroup, 1, 1, Some("c"), false);
        let req = JoinGroupRequest {
            group_id: "my-group".into(),
            session_timeout_ms: 10_000,
            rebalance_timeout_ms: 30_000,
            member_id: "".into(),
            group_instance_id: None,
            protocol_type: "consumer".into(),
            protocols: vec![GroupProtocol {
                name: "range".into(),
                metadata: vec![0, 1, 2],
            }],
        };
        let bytes = create_request(&header, &req).unwrap();
        assert!(bytes.len() > 20);
    }
}
