//! `FindCoordinator` (api key 10): locate the group or transaction coordinator broker.

use crate::errors::Result;
use crate::protocol::header::{RequestHeader, ResponseHeader};
use crate::protocol::types::{Reader, Writer};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CoordinatorType {
    Group,
    Transaction,
}

impl CoordinatorType {
    fn code(self) -> i8 {
        match self {
            CoordinatorType::Group => 0,
            CoordinatorType::Transaction => 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FindCoordinatorRequest {
    pub key: String,
    pub key_type: CoordinatorType,
}

#[derive(Debug, Clone)]
pub struct FindCoordinatorResponse {
    pub error_code: i16,
    pub node_id: i32,
    pub host: String,
    pub port: i32,
}

pub fn create_request(header: &RequestHeader, req: &FindCoordinatorRequest) -> Result<Vec<u8>> {
    let flexible = header.api_version >= 3;
    let mut w = Writer::with_capacity(64);
    header.write(&mut w);

    if flexible {
        w.put_compact_string(Some(&req.key));
    } else {
        w.put_legacy_string(Some(&req.key));
    }
    if header.api_version >= 1 {
        w.put_i8(req.key_type.code());
    }
    if flexible {
        w.put_tagged_fields();
    }

    Ok(w.prepend_length().to_vec())
}

pub fn parse_response(body: &[u8], api_version: i16) -> Result<FindCoordinatorResponse> {
    let flexible = api_version >= 3;
    let mut r = Reader::new(body);
    ResponseHeader::read(&mut r, flexible)?;

    if api_version >= 1 {
        let _throttle_time_ms = r.read_i32()?;
    }
    let error_code = r.read_i16()?;
    if flexible && api_version >= 1 {
        let _error_message = r.read_compact_string()?;
    } else if api_version >= 1 {
        let _error_message = r.read_legacy_string()?;
    }
    let node_id = r.read_i32()?;
    let host = if flexible {
        r.read_compact_string()?
    } else {
        r.read_legacy_string()?
    }
    .unwrap_or_default();
    let port = r.read_i32()?;
    if flexible {
        r.skip_tagged_fields()?;
    }

    Ok(FindCoordinatorResponse {
        error_code,
        node_id,
        host,
        port,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ApiKey;

    #[test]
    fn legacy_round_trip() {
        let header = RequestHeader::new(ApiKey::FindCoordinator, 0, 1, Some("c"), false);
        let req = FindCoordinatorRequest {
            key: "my-group".into(),
            key_type: CoordinatorType::Group,
        };
        let bytes = create_request(&header, &req).unwrap();
        assert!(bytes.len() > 10);

        let mut body = Writer::with_capacity(32);
        body.put_i32(1);
        body.put_i16(0);
        body.put_i32(7);
        body.put_legacy_string(Some("broker-host"));
        body.put_i32(9092);
        let parsed = parse_response(&body.into_bytes(), 0).unwrap();
        assert_eq!(parsed.node_id, 7);
        assert_eq!(parsed.host, "broker-host");
    }
}
