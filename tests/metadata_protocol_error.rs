//! Drives a `Metadata` exchange where the broker reports a per-topic protocol error, checking
//! that the client surfaces it as a lookup failure rather than a bogus leader address.

use kafka_native::client::ClientBuilder;
use kafka_native::protocol::{TopicPartition, Writer};
use kafka_native::ScriptedBroker;

const BROKER: &str = "broker-1:9092";
const UNKNOWN_TOPIC_OR_PARTITION: i16 = 3;

fn metadata_v0_response_with_topic_error(correlation_id: i32, topic: &str, error_code: i16) -> Vec<u8> {
    let mut w = Writer::with_capacity(128);
    w.put_i32(correlation_id);
    w.put_legacy_array(&[] as &[()], |_, _: &()| Ok(())).unwrap(); // brokers: none
    w.put_legacy_array(&[(topic.to_owned(), error_code)], |w, (name, code)| {
        w.put_i16(*code);
        w.put_legacy_string(Some(name));
        w.put_legacy_array(&[] as &[()], |_, _: &()| Ok(())) // partitions: none
    })
    .unwrap();
    w.into_bytes().to_vec()
}

#[tokio::test]
async fn leader_for_surfaces_unknown_topic_as_broker_not_found() {
    let client = ClientBuilder::new(vec![BROKER.to_owned()]).build();

    let broker = ScriptedBroker::new(vec![
        // api_versions negotiation, then the actual Metadata exchange.
        api_versions_response(1),
        metadata_v0_response_with_topic_error(2, "missing-topic", UNKNOWN_TOPIC_OR_PARTITION),
    ]);
    let conn = broker.connect(BROKER).await.unwrap();
    client.inject_connection_for_test(BROKER, conn).await;

    let tp = TopicPartition::new("missing-topic", 0);
    let err = client.leader_for(&tp).await.unwrap_err();
    assert!(
        err.to_string().contains("missing-topic"),
        "expected a lookup failure naming the unknown topic, got {}",
        err
    );
}

fn api_versions_response(correlation_id: i32) -> Vec<u8> {
    use kafka_native::protocol::ApiKey;
    let mut w = Writer::with_capacity(64);
    w.put_i32(correlation_id);
    w.put_i16(0); // error_code
    w.put_legacy_array(&[(ApiKey::Metadata as i16, 0i16, 0i16)], |w, (k, min, max)| {
        w.put_i16(*k);
        w.put_i16(*min);
        w.put_i16(*max);
        Ok(())
    })
    .unwrap();
    w.into_bytes().to_vec()
}
