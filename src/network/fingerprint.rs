//! Request fingerprinting (§9: "formalize the request fingerprint as a stable hash over
//! (api-key, api-version, canonical-argument-bytes)").
//!
//! Used by the connection layer to recognize that two in-flight requests are byte-identical and
//! collapse them into a single broker round trip (§4.4's request deduplication).

use std::hash::Hasher;

use twox_hash::XxHash64;

use crate::protocol::ApiKey;

const SEED: u64 = 0x9E37_79B9_7F4A_7C15;

/// A stable hash over `(api_key, api_version, request_body)`. Two calls with identical arguments
/// always produce the same fingerprint, regardless of process or platform.
pub fn fingerprint(api_key: ApiKey, api_version: i16, body: &[u8]) -> u64 {
    let mut hasher = XxHash64::with_seed(SEED);
    hasher.write_i16(api_key.code());
    hasher.write_i16(api_version);
    hasher.write(body);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_inputs_hash_identically() {
        let a = fingerprint(ApiKey::Metadata, 1, b"orders");
        let b = fingerprint(ApiKey::Metadata, 1, b"orders");
        assert_eq!(a, b);
    }

    #[test]
    fn different_bodies_hash_differently() {
        let a = fingerprint(ApiKey::Metadata, 1, b"orders");
        let b = fingerprint(ApiKey::Metadata, 1, b"payments");
        assert_ne!(a, b);
    }

    #[test]
    fn different_api_versions_hash_differently() {
        let a = fingerprint(ApiKey::Metadata, 1, b"orders");
        let b = fingerprint(ApiKey::Metadata, 2, b"orders");
        assert_ne!(a, b);
    }
}
