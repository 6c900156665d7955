//! `ApiVersions` (api key 18): version negotiation (§4.3, §4.6).

use crate::errors::Result;
use crate::protocol::header::{RequestHeader, ResponseHeader};
use crate::protocol::types::{Reader, Writer};
use crate::protocol::ApiKey;

#[derive(Debug, Clone)]
pub struct ApiVersionsRequest {
    pub client_software_name: String,
    pub client_software_version: String,
}

#[derive(Debug, Clone)]
pub struct ApiVersionRange {
    pub api_key: i16,
    pub min_version: i16,
    pub max_version: i16,
}

#[derive(Debug, Clone)]
pub struct ApiVersionsResponse {
    pub error_code: i16,
    pub api_versions: Vec<ApiVersionRange>,
    pub throttle_time_ms: i32,
}

/// Encodes an `ApiVersions` request. Flexible from v3 onward; version 0 is always safe to send
/// first since every broker since 0.10 understands it.
pub fn create_request(header: &RequestHeader, req: &ApiVersionsRequest) -> Result<Vec<u8>> {
    let flexible = header.api_version >= 3;
    let mut w = Writer::with_capacity(64);
    header.write(&mut w);
    if header.api_version >= 3 {
        w.put_compact_string(Some(&req.client_software_name));
        w.put_compact_string(Some(&req.client_software_version));
        w.put_tagged_fields();
    }
    let _ = flexible;
    Ok(w.prepend_length().to_vec())
}

pub fn parse_response(body: &[u8], api_version: i16) -> Result<ApiVersionsResponse> {
    let flexible = api_version >= 3;
    let mut r = Reader::new(body);
    ResponseHeader::read(&mut r, flexible)?;

    let error_code = r.read_i16()?;
    let api_versions = if flexible {
        r.read_compact_array(|r| {
            let api_key = r.read_i16()?;
            let min_version = r.read_i16()?;
            let max_version = r.read_i16()?;
            r.skip_tagged_fields()?;
            Ok(ApiVersionRange {
                api_key,
                min_version,
                max_version,
            })
        })?
    } else {
        r.read_legacy_array(|r| {
            let api_key = r.read_i16()?;
            let min_version = r.read_i16()?;
            let max_version = r.read_i16()?;
            Ok(ApiVersionRange {
                api_key,
                min_version,
                max_version,
            })
        })?
    };
    let throttle_time_ms = if api_version >= 1 { r.read_i32()? } else { 0 };
    if flexible {
        r.skip_tagged_fields()?;
    }

    Ok(ApiVersionsResponse {
        error_code,
        api_versions,
        throttle_time_ms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn v0_request_has_no_body() {
        let header = RequestHeader::new(ApiKey::ApiVersions, 0, 1, Some("kafka-native"), false);
        let req = ApiVersionsRequest {
            client_software_name: "kafka-native".into(),
            client_software_version: "0.1.0".into(),
        };
        let bytes = create_request(&header, &req).unwrap();
        // size(4) + api_key(2) + api_version(2) + correlation(4) + client_id header
        assert_eq!(bytes.len(), 4 + 2 + 2 + 4 + 2 + "kafka-native".len());
    }

    #[test]
    fn v3_response_round_trips_through_compact_array() {
        let mut body = Writer::with_capacity(64);
        body.put_i32(7); // correlation id
        body.put_tagged_fields(); // response header tagged fields (flexible)
        body.put_i16(0); // error code
        body.put_compact_array(&[(18i16, 0i16, 3i16)], |w, (k, min, max)| {
            w.put_i16(*k);
            w.put_i16(*min);
            w.put_i16(*max);
            w.put_tagged_fields();
            Ok(())
        })
        .unwrap();
        body.put_i32(0); // throttle_time_ms
        body.put_tagged_fields();

        let parsed = parse_response(&body.into_bytes(), 3).unwrap();
        assert_eq!(parsed.error_code, 0);
        assert_eq!(parsed.api_versions.len(), 1);
        assert_eq!(parsed.api_versions[0].api_key, 18);
    }
}
