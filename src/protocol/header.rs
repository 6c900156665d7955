//! Request and response headers (§4.3).
//!
//! Every request is preceded by `RequestHeader { api_key, api_version, correlation_id, client_id }`.
//! From the version each API stub declares "flexible" onward, both the request and response
//! headers grow a trailing tagged-fields terminator.

use crate::protocol::types::{Reader, Writer};
use crate::protocol::ApiKey;
use crate::errors::Result;

#[derive(Debug, Clone)]
pub struct RequestHeader {
    pub api_key: ApiKey,
    pub api_version: i16,
    pub correlation_id: i32,
    pub client_id: Option<String>,
    /// Flexible versions append an (empty, today) tagged-fields terminator.
    pub flexible: bool,
}

impl RequestHeader {
    pub fn new(
        api_key: ApiKey,
        api_version: i16,
        correlation_id: i32,
        client_id: Option<&str>,
        flexible: bool,
    ) -> Self {
        RequestHeader {
            api_key,
            api_version,
            correlation_id,
            client_id: client_id.map(str::to_owned),
            flexible,
        }
    }

    pub fn write(&self, w: &mut Writer) {
        w.put_i16(self.api_key.code());
        w.put_i16(self.api_version);
        w.put_i32(self.correlation_id);
        if self.flexible {
            w.put_compact_string(self.client_id.as_deref());
            w.put_tagged_fields();
        } else {
            w.put_legacy_string(self.client_id.as_deref());
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResponseHeader {
    pub correlation_id: i32,
}

impl ResponseHeader {
    pub fn read(r: &mut Reader<'_>, flexible: bool) -> Result<Self> {
        let correlation_id = r.read_i32()?;
        if flexible {
            r.skip_tagged_fields()?;
        }
        Ok(ResponseHeader { correlation_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flexible_header_round_trip() {
        let header = RequestHeader::new(ApiKey::ApiVersions, 3, 42, Some("kafka-native"), true);
        let mut w = Writer::with_capacity(32);
        header.write(&mut w);
        let bytes = w.into_bytes();

        let mut r = Reader::new(&bytes);
        assert_eq!(r.read_i16().unwrap(), ApiKey::ApiVersions.code());
        assert_eq!(r.read_i16().unwrap(), 3);
        assert_eq!(r.read_i32().unwrap(), 42);
        assert_eq!(
            r.read_compact_string().unwrap(),
            Some("kafka-native".to_owned())
        );
        r.skip_tagged_fields().unwrap();
        assert_eq!(r.consumed(), bytes.len());
    }

    #[test]
    fn legacy_header_uses_legacy_string() {
        let header = RequestHeader::new(ApiKey::Metadata, 1, 7, Some("id"), false);
        let mut w = Writer::with_capacity(32);
        header.write(&mut w);
        let bytes = w.into_bytes();
        let mut r = Reader::new(&bytes);
        r.read_i16().unwrap();
        r.read_i16().unwrap();
        r.read_i32().unwrap();
        assert_eq!(r.read_legacy_string().unwrap(), Some("id".to_owned()));
    }
}
