//! Drives `BaseClient` against a `ScriptedBroker` instead of a live cluster, exercising the
//! connection-layer transport abstraction end to end.

use kafka_native::client::ClientBuilder;
use kafka_native::protocol::{ApiKey, Writer};
use kafka_native::ScriptedBroker;

const BROKER: &str = "broker-1:9092";

fn api_versions_response(correlation_id: i32) -> Vec<u8> {
    let mut w = Writer::with_capacity(64);
    w.put_i32(correlation_id);
    w.put_i16(0); // error_code
    w.put_legacy_array(&[(ApiKey::Metadata as i16, 0i16, 9i16), (ApiKey::CreateTopics as i16, 0i16, 5i16)], |w, (k, min, max)| {
        w.put_i16(*k);
        w.put_i16(*min);
        w.put_i16(*max);
        Ok(())
    })
    .unwrap();
    w.into_bytes().to_vec()
}

#[tokio::test]
async fn get_api_negotiates_against_a_scripted_broker() {
    let client = ClientBuilder::new(vec![BROKER.to_owned()]).build();

    let broker = ScriptedBroker::new(vec![api_versions_response(1)]);
    let conn = broker.connect(BROKER).await.unwrap();
    client.inject_connection_for_test(BROKER, conn).await;

    let version = client.get_api(BROKER, ApiKey::CreateTopics).await.unwrap();
    assert_eq!(version, 5, "negotiated version should be the broker's advertised max");
}

#[tokio::test]
async fn get_api_is_cached_after_the_first_scripted_exchange() {
    let client = ClientBuilder::new(vec![BROKER.to_owned()]).build();

    // Only one ApiVersions response is scripted; a second get_api call must hit the cache
    // rather than send a request the broker double cannot answer.
    let broker = ScriptedBroker::new(vec![api_versions_response(1)]);
    let conn = broker.connect(BROKER).await.unwrap();
    client.inject_connection_for_test(BROKER, conn).await;

    let first = client.get_api(BROKER, ApiKey::Metadata).await.unwrap();
    let second = client.get_api(BROKER, ApiKey::Metadata).await.unwrap();
    assert_eq!(first, second);
}
