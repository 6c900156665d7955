//! `SaslAuthenticate` (api key 36): carries one SASL exchange round-trip over the Kafka protocol
//! itself rather than raw SASL framing (§4.4).

use crate::errors::Result;
use crate::protocol::header::{RequestHeader, ResponseHeader};
use crate::protocol::types::{Reader, Writer};

#[derive(Debug, Clone)]
pub struct SaslAuthenticateRequest {
    pub auth_bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct SaslAuthenticateResponse {
    pub error_code: i16,
    pub error_message: Option<String>,
    pub auth_bytes: Vec<u8>,
    pub session_lifetime_ms: i64,
}

pub fn create_request(header: &RequestHeader, req: &SaslAuthenticateRequest) -> Result<Vec<u8>> {
    let flexible = header.api_version >= 2;
    let mut w = Writer::with_capacity(128);
    header.write(&mut w);
    if flexible {
        w.put_compact_bytes(Some(&req.auth_bytes));
        w.put_tagged_fields();
    } else {
        w.put_legacy_bytes(Some(&req.auth_bytes));
    }
    Ok(w.prepend_length().to_vec())
}

pub fn parse_response(body: &[u8], api_version: i16) -> Result<SaslAuthenticateResponse> {
    let flexible = api_version >= 2;
    let mut r = Reader::new(body);
    ResponseHeader::read(&mut r, flexible)?;

    let error_code = r.read_i16()?;
    let error_message = if flexible {
        r.read_compact_string()?
    } else {
        r.read_legacy_string()?
    };
    let auth_bytes = if flexible {
        r.read_compact_bytes()?
    } else {
        r.read_legacy_bytes()?
    }
    .map(|b| b.to_vec())
    .unwrap_or_default();
    let session_lifetime_ms = if api_version >= 1 { r.read_i64()? } else { 0 };
    if flexible {
        r.skip_tagged_fields()?;
    }

    Ok(SaslAuthenticateResponse {
        error_code,
        error_message,
        auth_bytes,
        session_lifetime_ms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ApiKey;

    #[test]
    fn round_trip() {
        let header = RequestHeader::new(ApiKey::SaslAuthenticate, 0, 1, Some("c"), false);
        let req = SaslAuthenticateRequest {
            auth_bytes: b"\0user\0pass".to_vec(),
        };
        let bytes = create_request(&header, &req).unwrap();
        assert!(bytes.len() > 10);
    }
}
