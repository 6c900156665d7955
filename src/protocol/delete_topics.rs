//! `DeleteTopics` (api key 20): the admin-façade's topic teardown call (§4.9).

use crate::errors::Result;
use crate::protocol::header::{RequestHeader, ResponseHeader};
use crate::protocol::types::{Reader, Writer};

#[derive(Debug, Clone)]
pub struct DeleteTopicsRequest {
    pub topic_names: Vec<String>,
    pub timeout_ms: i32,
}

#[derive(Debug, Clone)]
pub struct DeletableTopicResult {
    pub name: Option<String>,
    pub error_code: i16,
}

#[derive(Debug, Clone)]
pub struct DeleteTopicsResponse {
    pub throttle_time_ms: i32,
    pub responses: Vec<DeletableTopicResult>,
}

pub fn create_request(header: &RequestHeader, req: &DeleteTopicsRequest) -> Result<Vec<u8>> {
    let flexible = header.api_version >= 4;
    let mut w = Writer::with_capacity(128);
    header.write(&mut w);

    if flexible {
        w.put_compact_array(&req.topic_names, |w, t| {
            w.put_compact_string(Some(t));
            Ok(())
        })?;
    } else {
        w.put_legacy_array(&req.topic_names, |w, t| {
            w.put_legacy_string(Some(t));
            Ok(())
        })?;
    }
    w.put_i32(req.timeout_ms);
    if flexible {
        w.put_tagged_fields();
    }

    Ok(w.prepend_length().to_vec())
}

pub fn parse_response(body: &[u8], api_version: i16) -> Result<DeleteTopicsResponse> {
    let flexible = api_version >= 4;
    let mut r = Reader::new(body);
    ResponseHeader::read(&mut r, flexible)?;

    let throttle_time_ms = r.read_i32()?;

    let read_topic = |r: &mut Reader<'_>| -> Result<DeletableTopicResult> {
        let name = if flexible {
            r.read_compact_string()?
        } else {
            r.read_legacy_string()?
        };
        let error_code = r.read_i16()?;
        if flexible {
            r.skip_tagged_fields()?;
        }
        Ok(DeletableTopicResult { name, error_code })
    };

    let responses = if flexible {
        r.read_compact_array(read_topic)?
    } else {
        r.read_legacy_array(read_topic)?
    };
    if flexible {
        r.skip_tagged_fields()?;
    }

    Ok(DeleteTopicsResponse {
        throttle_time_ms,
        responses,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ApiKey;

    #[test]
    fn round_trip() {
        let header = RequestHeader::new(ApiKey::DeleteTopics, 1, 1, Some("c"), false);
        let req = DeleteTopicsRequest {
            topic_names: vec!["orders".into()],
            timeout_ms: 5000,
        };
        let bytes = create_request(&header, &req).unwrap();
        assert!(bytes.len() > 10);
    }
}
