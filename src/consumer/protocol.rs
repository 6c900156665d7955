//! The `"consumer"` embedded protocol (§4.7): the byte format carried inside `JoinGroup`'s
//! per-member metadata and `SyncGroup`'s per-member assignment. Independent of the flexible/legacy
//! split that governs the surrounding RPC — this payload has its own small version header.

use std::collections::HashMap;

use crate::errors::{ErrorKind, Result};
use crate::protocol::types::{Reader, Writer};

/// Name every member advertises in `JoinGroup`'s `protocol_type`.
pub const CONSUMER_PROTOCOL: &str = "consumer";

const METADATA_VERSION: i16 = 1;
const ASSIGNMENT_VERSION: i16 = 1;

pub fn encode_subscription(topics: &[String]) -> Vec<u8> {
    let mut w = Writer::with_capacity(64);
    w.put_i16(METADATA_VERSION);
    w.put_legacy_array(topics, |w, t| {
        w.put_legacy_string(Some(t));
        Ok(())
    })
    .expect("legacy string encoding never fails");
    w.put_legacy_bytes(None); // user data
    w.into_bytes().to_vec()
}

pub fn decode_subscription(bytes: &[u8]) -> Result<Vec<String>> {
    let mut r = Reader::new(bytes);
    let _version = r.read_i16()?;
    let topics = r.read_legacy_array(|r| Ok(r.read_legacy_string()?.unwrap_or_default()))?;
    Ok(topics)
}

pub fn encode_assignment(assignment: &HashMap<String, Vec<i32>>) -> Vec<u8> {
    let mut entries: Vec<(String, Vec<i32>)> =
        assignment.iter().map(|(t, p)| (t.clone(), p.clone())).collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    let mut w = Writer::with_capacity(64);
    w.put_i16(ASSIGNMENT_VERSION);
    w.put_legacy_array(&entries, |w, (topic, partitions): &(String, Vec<i32>)| {
        w.put_legacy_string(Some(topic));
        w.put_legacy_array(partitions, |w, p| {
            w.put_i32(*p);
            Ok(())
        })
    })
    .expect("legacy encoding never fails");
    w.put_legacy_bytes(None); // user data
    w.into_bytes().to_vec()
}

pub fn decode_assignment(bytes: &[u8]) -> Result<HashMap<String, Vec<i32>>> {
    let mut r = Reader::new(bytes);
    let _version = r.read_i16()?;
    let entries = r.read_legacy_array(|r| {
        let topic = r.read_legacy_string()?.ok_or_else(|| {
            crate::errors::Error::from(ErrorKind::CodecError("assignment entry missing topic".into()))
        })?;
        let partitions = r.read_legacy_array(|r| r.read_i32())?;
        Ok((topic, partitions))
    })?;
    Ok(entries.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscription_round_trips() {
        let topics = vec!["orders".to_owned(), "payments".to_owned()];
        let encoded = encode_subscription(&topics);
        assert_eq!(decode_subscription(&encoded).unwrap(), topics);
    }

    #[test]
    fn assignment_round_trips() {
        let mut assignment = HashMap::new();
        assignment.insert("orders".to_owned(), vec![0, 1, 2]);
        assignment.insert("payments".to_owned(), vec![0]);
        let encoded = encode_assignment(&assignment);
        assert_eq!(decode_assignment(&encoded).unwrap(), assignment);
    }
}
