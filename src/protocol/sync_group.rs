//! `SyncGroup` (api key 14): distribute the leader's assignment to every group member (§4.7).

use crate::errors::Result;
use crate::protocol::header::{RequestHeader, ResponseHeader};
use crate::protocol::types::{Reader, Writer};

#[derive(Debug, Clone)]
pub struct GroupAssignment {
    pub member_id: String,
    pub assignment: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct SyncGroupRequest {
    pub group_id: String,
    pub generation_id: i32,
    pub member_id: String,
    pub group_instance_id: Option<String>,
    pub protocol_type: Option<String>,
    pub protocol_name: Option<String>,
    /// Non-empty only for the group leader; every other member sends an empty list.
    pub assignments: Vec<GroupAssignment>,
}

#[derive(Debug, Clone)]
pub struct SyncGroupResponse {
    pub error_code: i16,
    pub protocol_type: Option<String>,
    pub protocol_name: Option<String>,
    pub assignment: Vec<u8>,
}

pub fn create_request(header: &RequestHeader, req: &SyncGroupRequest) -> Result<Vec<u8>> {
    let flexible = header.api_version >= 4;
    let mut w = Writer::with_capacity(256);
    header.write(&mut w);

    if flexible {
        w.put_compact_string(Some(&req.group_id));
    } else {
        w.put_legacy_string(Some(&req.group_id));
    }
    w.put_i32(req.generation_id);
    if flexible {
        w.put_compact_string(Some(&req.member_id));
    } else {
        w.put_legacy_string(Some(&req.member_id));
    }
    if header.api_version >= 3 {
        if flexible {
            w.put_compact_string(req.group_instance_id.as_deref());
        } else {
            w.put_legacy_string(req.group_instance_id.as_deref());
        }
    }
    if header.api_version >= 5 {
        if flexible {
            w.put_compact_string(req.protocol_type.as_deref());
            w.put_compact_string(req.protocol_name.as_deref());
        } else {
            w.put_legacy_string(req.protocol_type.as_deref());
            w.put_legacy_string(req.protocol_name.as_deref());
        }
    }

    let write_assignment = |w: &mut Writer, a: &GroupAssignment| -> Result<()> {
        if flexible {
            w.put_compact_string(Some(&a.member_id));
            w.put_compact_bytes(Some(&a.assignment));
            w.put_tagged_fields();
        } else {
            w.put_legacy_string(Some(&a.member_id));
            w.put_legacy_bytes(Some(&a.assignment));
        }
        Ok(())
    };

    if flexible {
        w.put_compact_array(&req.assignments, write_assignment)?;
        w.put_tagged_fields();
    } else {
        w.put_legacy_array(&req.assignments, write_assignment)?;
    }

    Ok(w.prepend_length().to_vec())
}

pub fn parse_response(body: &[u8], api_version: i16) -> Result<SyncGroupResponse> {
    let flexible = api_version >= 4;
    let mut r = Reader::new(body);
    ResponseHeader::read(&mut r, flexible)?;

    if api_version >= 1 {
        let _throttle_time_ms = r.read_i32()?;
    }
    let error_code = r.read_i16()?;
    let (protocol_type, protocol_name) = if api_version >= 5 {
        if flexible {
            (r.read_compact_string()?, r.read_compact_string()?)
        } else {
            (r.read_legacy_string()?, r.read_legacy_string()?)
        }
    } else {
        (None, None)
    };
    let assignment = if flexible {
        r.read_compact_bytes()?
    } else {
        r.read_legacy_bytes()?
    }
    .map(|b| b.to_vec())
    .unwrap_or_default();
    if flexible {
        r.skip_tagged_fields()?;
    }

    Ok(SyncGroupResponse {
        error_code,
        protocol_type,
        protocol_name,
        assignment,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ApiKey;

    #[test]
    fn leader_request_carries_assignments() {
        let header = RequestHeader::new(ApiKey::SyncGroup, 1, 1, Some("c"), false);
        let req = SyncGroupRequest {
            group_id: "my-group".into(),
            generation_id: 3,
            member_id: "m1".into(),
            group_instance_id: None,
            protocol_type: None,
            protocol_name: None,
            assignments: vec![GroupAssignment {
                member_id: "m1".into(),
                assignment: vec![9, 9],
            }],
        };
        let bytes = create_request(&header, &req).unwrap();
        assert!(bytes.len() > 20);
    }

    #[test]
    fn response_round_trip() {
        let mut body = Writer::with_capacity(32);
        body.put_i32(1);
        body.put_i16(0);
        body.put_legacy_bytes(Some(&[1, 2, 3]));
        let parsed = parse_response(&body.into_bytes(), 0).unwrap();
        assert_eq!(parsed.assignment, vec![1, 2, 3]);
    }
}
