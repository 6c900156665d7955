//! `Heartbeat` (api key 12): keeps group membership alive between rebalances (§4.7).

use crate::errors::Result;
use crate::protocol::header::{RequestHeader, ResponseHeader};
use crate::protocol::types::{Reader, Writer};

#[derive(Debug, Clone)]
pub struct HeartbeatRequest {
    pub group_id: String,
    pub generation_id: i32,
    pub member_id: String,
    pub group_instance_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct HeartbeatResponse {
    pub error_code: i16,
}

pub fn create_request(header: &RequestHeader, req: &HeartbeatRequest) -> Result<Vec<u8>> {
    let flexible = header.api_version >= 4;
    let mut w = Writer::with_capacity(128);
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
    if flexible {
        w.put_tagged_fields();
    }

    Ok(w.prepend_length().to_vec())
}

pub fn parse_response(body: &[u8], api_version: i16) -> Result<HeartbeatResponse> {
    let flexible = api_version >= 4;
    let mut r = Reader::new(body);
    ResponseHeader::read(&mut r, flexible)?;

    if api_version >= 1 {
        let _throttle_time_ms = r.read_i32()?;
    }
    let error_code = r.read_i16()?;
    if flexible {
        r.skip_tagged_fields()?;
    }

    Ok(HeartbeatResponse { error_code })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ApiKey;

    #[test]
    fn round_trip() {
        let header = RequestHeader::new(ApiKey::Heartbeat, 1, 1, Some("c"), false);
        let req = HeartbeatRequest {
            group_id: "g".into(),
            generation_id: 4,
            member_id: "m1".into(),
            group_instance_id: None,
        };
        let bytes = create_request(&header, &req).unwrap();
        assert!(bytes.len() > 10);

        let mut body = Writer::with_capacity(8);
        body.put_i32(1);
        body.put_i16(27); // RebalanceInProgress
        let parsed = parse_response(&body.into_bytes(), 0).unwrap();
        assert_eq!(parsed.error_code, 27);
    }
}
