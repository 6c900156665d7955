//! `EndTxn` (api key 26): commits or aborts a transaction (§4.8).

use crate::errors::Result;
use crate::protocol::header::{RequestHeader, ResponseHeader};
use crate::protocol::types::{Reader, Writer};

#[derive(Debug, Clone)]
pub struct EndTxnRequest {
    pub transactional_id: String,
    pub producer_id: i64,
    pub producer_epoch: i16,
    pub committed: bool,
}

#[derive(Debug, Clone)]
pub struct EndTxnResponse {
    pub throttle_time_ms: i32,
    pub error_code: i16,
}

pub fn create_request(header: &RequestHeader, req: &EndTxnRequest) -> Result<Vec<u8>> {
    let flexible = header.api_version >= 3;
    let mut w = Writer::with_capacity(64);
    header.write(&mut w);

    if flexible {
        w.put_compact_string(Some(&req.transactional_id));
    } else {
        w.put_legacy_string(Some(&req.transactional_id));
    }
    w.put_i64(req.producer_id);
    w.put_i16(req.producer_epoch);
    w.put_bool(req.committed);
    if flexible {
        w.put_tagged_fields();
    }

    Ok(w.prepend_length().to_vec())
}

pub fn parse_response(body: &[u8], api_version: i16) -> Result<EndTxnResponse> {
    let flexible = api_version >= 3;
    let mut r = Reader::new(body);
    ResponseHeader::read(&mut r, flexible)?;

    let throttle_time_ms = r.read_i32()?;
    let error_code = r.read_i16()?;
    if flexible {
        r.skip_tagged_fields()?;
    }

    Ok(EndTxnResponse {
        throttle_time_ms,
        error_code,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ApiKey;

    #[test]
    fn commit_and_abort_round_trip() {
        let header = RequestHeader::new(ApiKey::EndTxn, 0, 1, Some("c"), false);
        for committed in [true, false] {
            let req = EndTxnRequest {
                transactional_id: "txn-1".into(),
                producer_id: 42,
                producer_epoch: 0,
                committed,
            };
            let bytes = create_request(&header, &req).unwrap();
            assert!(bytes.len() > 10);
        }
    }
}
