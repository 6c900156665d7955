//! `AddOffsetsToTxn` (api key 25): ties a consumer group's offset commits into a transaction
//! (§4.8). The broker maps `group_id` to its `__consumer_offsets` partition and treats it as
//! another partition in the transaction.

use crate::errors::Result;
use crate::protocol::header::{RequestHeader, ResponseHeader};
use crate::protocol::types::{Reader, Writer};

#[derive(Debug, Clone)]
pub struct AddOffsetsToTxnRequest {
    pub transactional_id: String,
    pub producer_id: i64,
    pub producer_epoch: i16,
    pub group_id: String,
}

#[derive(Debug, Clone)]
pub struct AddOffsetsToTxnResponse {
    pub throttle_time_ms: i32,
    pub error_code: i16,
}

pub fn create_request(header: &RequestHeader, req: &AddOffsetsToTxnRequest) -> Result<Vec<u8>> {
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
    if flexible {
        w.put_compact_string(Some(&req.group_id));
        w.put_tagged_fields();
    } else {
        w.put_legacy_string(Some(&req.group_id));
    }

    Ok(w.prepend_length().to_vec())
}

pub fn parse_response(body: &[u8], api_version: i16) -> Result<AddOffsetsToTxnResponse> {
    let flexible = api_version >= 3;
    let mut r = Reader::new(body);
    ResponseHeader::read(&mut r, flexible)?;

    let throttle_time_ms = r.read_i32()?;
    let error_code = r.read_i16()?;
    if flexible {
        r.skip_tagged_fields()?;
    }

    Ok(AddOffsetsToTxnResponse {
        throttle_time_ms,
        error_code,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ApiKey;

    #[test]
    fn round_trip() {
        let header = RequestHeader::new(ApiKey::AddOffsetsToTxn, 0, 1, Some("c"), false);
        let req = AddOffsetsToTxnRequest {
            transactional_id: "txn-1".into(),
            producer_id: 42,
            producer_epoch: 0,
            group_id: "g".into(),
        };
        let bytes = create_request(&header, &req).unwrap();
        assert!(bytes.len() > 10);
    }
}
