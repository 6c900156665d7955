//! `LeaveGroup` (api key 13): voluntary membership departure (§4.7).

use crate::errors::Result;
use crate::protocol::header::{RequestHeader, ResponseHeader};
use crate::protocol::types::{Reader, Writer};

#[derive(Debug, Clone)]
pub struct LeavingMember {
    pub member_id: String,
    pub group_instance_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LeaveGroupRequest {
    pub group_id: String,
    pub member_id: String,
    pub members: Vec<LeavingMember>,
}

#[derive(Debug, Clone)]
pub struct LeaveGroupResponse {
    pub error_code: i16,
}

pub fn create_request(header: &RequestHeader, req: &LeaveGroupRequest) -> Result<Vec<u8>> {
    let flexible = header.api_version >= 4;
    let mut w = Writer::with_capacity(128);
    header.write(&mut w);

    if flexible {
        w.put_compact_string(Some(&req.group_id));
    } else {
        w.put_legacy_string(Some(&req.group_id));
    }

    if header.api_version >= 3 {
        let write_member = |w: &mut Writer, m: &LeavingMember| -> Result<()> {
            if flexible {
                w.put_compact_string(Some(&m.member_id));
                w.put_compact_string(m.group_instance_id.as_deref());
                w.put_tagged_fields();
            } else {
                w.put_legacy_string(Some(&m.member_id));
                w.put_legacy_string(m.group_instance_id.as_deref());
            }
            Ok(())
        };
        if flexible {
            w.put_compact_array(&req.members, write_member)?;
        } else {
            w.put_legacy_array(&req.members, write_member)?;
        }
    } else if flexible {
        w.put_compact_string(Some(&req.member_id));
    } else {
        w.put_legacy_string(Some(&req.member_id));
    }

    if flexible {
        w.put_tagged_fields();
    }

    Ok(w.prepend_length().to_vec())
}

pub fn parse_response(body: &[u8], api_version: i16) -> Result<LeaveGroupResponse> {
    let flexible = api_version >= 4;
    let mut r = Reader::new(body);
    ResponseHeader::read(&mut r, flexible)?;

    if api_version >= 1 {
        let _throttle_time_ms = r.read_i32()?;
    }
    let error_code = r.read_i16()?;
    if api_version >= 3 {
        let read_member = |r: &mut Reader<'_>| -> Result<()> {
            if flexible {
                r.read_compact_string()?;
                r.read_compact_string()?;
                r.skip_tagged_fields()?;
            } else {
                r.read_legacy_string()?;
                r.read_legacy_string()?;
            }
            Ok(())
        };
        if flexible {
            r.read_compact_array(read_member)?;
        } else {
            r.read_legacy_array(read_member)?;
        };
    }
    if flexible {
        r.skip_tagged_fields()?;
    }

    Ok(LeaveGroupResponse { error_code })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ApiKey;

    #[test]
    fn round_trip() {
        let header = RequestHeader::new(ApiKey::LeaveGroup, 0, 1, Some("c"), false);
        let req = LeaveGroupRequest {
            group_id: "g".into(),
            member_id: "m1".into(),
            members: vec![],
        };
        let bytes = create_request(&header, &req).unwrap();
        assert!(bytes.len() > 10);
    }
}
