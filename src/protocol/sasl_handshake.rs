//! `SaslHandshake` (api key 17): negotiate a SASL mechanism before `SaslAuthenticate` (§4.4).

use crate::errors::Result;
use crate::protocol::header::{RequestHeader, ResponseHeader};
use crate::protocol::types::{Reader, Writer};

#[derive(Debug, Clone)]
pub struct SaslHandshakeRequest {
    pub mechanism: String,
}

#[derive(Debug, Clone)]
pub struct SaslHandshakeResponse {
    pub error_code: i16,
    pub mechanisms: Vec<String>,
}

pub fn create_request(header: &RequestHeader, req: &SaslHandshakeRequest) -> Result<Vec<u8>> {
    let mut w = Writer::with_capacity(64);
    header.write(&mut w);
    w.put_legacy_string(Some(&req.mechanism));
    Ok(w.prepend_length().to_vec())
}

pub fn parse_response(body: &[u8], _api_version: i16) -> Result<SaslHandshakeResponse> {
    let mut r = Reader::new(body);
    ResponseHeader::read(&mut r, false)?;

    let error_code = r.read_i16()?;
    let mechanisms = r.read_legacy_array(|r| Ok(r.read_legacy_string()?.unwrap_or_default()))?;

    Ok(SaslHandshakeResponse {
        error_code,
        mechanisms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ApiKey;

    #[test]
    fn round_trip() {
        let header = RequestHeader::new(ApiKey::SaslHandshake, 1, 1, Some("c"), false);
        let req = SaslHandshakeRequest {
            mechanism: "SCRAM-SHA-256".into(),
        };
        let bytes = create_request(&header, &req).unwrap();
        assert!(bytes.len() > 10);

        let mut body = Writer::with_capacity(32);
        body.put_i32(1);
        body.put_i16(0);
        body.put_legacy_array(&["PLAIN".to_owned(), "SCRAM-SHA-256".to_owned()], |w, m| {
            w.put_legacy_string(Some(m));
            Ok(())
        })
        .unwrap();
        let parsed = parse_response(&body.into_bytes(), 1).unwrap();
        assert_eq!(parsed.mechanisms.len(), 2);
    }
}
