//! `InitProducerId` (api key 22): allocate a producer id/epoch pair for idempotent or
//! transactional producing (§4.8).

use crate::errors::Result;
use crate::protocol::header::{RequestHeader, ResponseHeader};
use crate::protocol::types::{Reader, Writer};

#[derive(Debug, Clone)]
pub struct InitProducerIdRequest {
    pub transactional_id: Option<String>,
    pub transaction_timeout_ms: i32,
    pub producer_id: i64,
    pub producer_epoch: i16,
}

impl Default for InitProducerIdRequest {
    fn default() -> Self {
        InitProducerIdRequest {
            transactional_id: None,
            transaction_timeout_ms: 60_000,
            producer_id: -1,
            producer_epoch: -1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct InitProducerIdResponse {
    pub error_code: i16,
    pub producer_id: i64,
    pub producer_epoch: i16,
}

pub fn create_request(header: &RequestHeader, req: &InitProducerIdRequest) -> Result<Vec<u8>> {
    let flexible = header.api_version >= 2;
    let mut w = Writer::with_capacity(64);
    header.write(&mut w);

    if flexible {
        w.put_compact_string(req.transactional_id.as_deref());
    } else {
        w.put_legacy_string(req.transactional_id.as_deref());
    }
    w.put_i32(req.transaction_timeout_ms);
    if header.api_version >= 3 {
        w.put_i64(req.producer_id);
        w.put_i16(req.producer_epoch);
    }
    if flexible {
        w.put_tagged_fields();
    }

    Ok(w.prepend_length().to_vec())
}

pub fn parse_response(body: &[u8], api_version: i16) -> Result<InitProducerIdResponse> {
    let flexible = api_version >= 2;
    let mut r = Reader::new(body);
    ResponseHeader::read(&mut r, flexible)?;

    let _throttle_time_ms = r.read_i32()?;
    let error_code = r.read_i16()?;
    let producer_id = r.read_i64()?;
    let producer_epoch = r.read_i16()?;
    if flexible {
        r.skip_tagged_fields()?;
    }

    Ok(InitProducerIdResponse {
        error_code,
        producer_id,
        producer_epoch,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ApiKey;

    #[test]
    fn round_trip() {
        let header = RequestHeader::new(ApiKey::InitProducerId, 0, 1, Some("c"), false);
        let req = InitProducerIdRequest::default();
        let bytes = create_request(&header, &req).unwrap();
        assert!(bytes.len() > 10);

        let mut body = Writer::with_capacity(32);
        body.put_i32(1);
        body.put_i32(0);
        body.put_i16(0);
        body.put_i64(1000);
        body.put_i16(0);
        let parsed = parse_response(&body.into_bytes(), 0).unwrap();
        assert_eq!(parsed.producer_id, 1000);
    }
}
