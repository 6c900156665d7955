//! An in-memory broker double used by tests (§9's transport-abstraction note). Wraps one half of
//! a `tokio::io::duplex` pair in the same length-delimited framing `Connection` uses on a live
//! socket, so connection-layer and protocol-layer tests can run against a scripted response queue
//! instead of a real `TcpStream`.

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::io::DuplexStream;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use super::connection::Connection;
use crate::errors::Result;
use crate::sasl::Credentials;

/// Size of the in-memory pipe buffer between the fake broker and `Connection`'s dispatcher.
const DUPLEX_BUF: usize = 64 * 1024;

/// A canned broker: each entry is played back, in order, as the response to the next request the
/// dispatcher sends. A request arriving after the script runs dry gets no response, mirroring an
/// unresponsive broker (the caller's `send` future simply never resolves).
///
/// Entries must already look like wire responses — a big-endian `i32` correlation id followed by
/// whatever bytes the caller's `parse_response` expects — since `Connection`'s dispatcher reads
/// the correlation id straight off the front of the frame.
pub struct ScriptedBroker {
    responses: Vec<Bytes>,
}

impl ScriptedBroker {
    pub fn new(responses: Vec<Vec<u8>>) -> Self {
        ScriptedBroker {
            responses: responses.into_iter().map(Bytes::from).collect(),
        }
    }

    /// Spawns the fake broker's side of the pipe and returns a `Connection` wired to the other
    /// side, exactly as `Connection::connect` would return one wired to a live socket.
    pub async fn connect(self, addr: &str) -> Result<Connection> {
        self.connect_with_credentials(addr, None).await
    }

    pub async fn connect_with_credentials(self, addr: &str, credentials: Option<Credentials>) -> Result<Connection> {
        let (client_side, broker_side) = tokio::io::duplex(DUPLEX_BUF);
        tokio::spawn(serve(broker_side, self.responses));
        Connection::from_transport(addr, client_side, credentials).await
    }
}

async fn serve(transport: DuplexStream, responses: Vec<Bytes>) {
    let mut framed = Framed::new(transport, codec());
    let mut responses = responses.into_iter();
    while let Some(Ok(_request)) = framed.next().await {
        match responses.next() {
            Some(response) => {
                if framed.send(response).await.is_err() {
                    break;
                }
            }
            None => break,
        }
    }
}

fn codec() -> LengthDelimitedCodec {
    LengthDelimitedCodec::builder()
        .length_field_length(4)
        .big_endian()
        .new_codec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::{BufMut, BytesMut};

    fn canned_response(correlation_id: i32, payload: &[u8]) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(4 + payload.len());
        buf.put_i32(correlation_id);
        buf.put_slice(payload);
        buf.to_vec()
    }

    #[tokio::test]
    async fn scripted_broker_answers_requests_in_order() {
        let broker = ScriptedBroker::new(vec![
            canned_response(7, b"first"),
            canned_response(8, b"second"),
        ]);
        let conn = broker.connect("mock-broker:0").await.unwrap();

        let first = conn
            .send(crate::protocol::ApiKey::ApiVersions, 0, 7, Bytes::from_static(b"req-a"))
            .await
            .unwrap();
        assert_eq!(&first[..], b"first");

        let second = conn
            .send(crate::protocol::ApiKey::ApiVersions, 0, 8, Bytes::from_static(b"req-b"))
            .await
            .unwrap();
        assert_eq!(&second[..], b"second");
    }

    #[tokio::test]
    async fn scripted_broker_exhausted_script_leaves_request_pending() {
        let broker = ScriptedBroker::new(Vec::new());
        let conn = broker.connect("mock-broker:0").await.unwrap();

        let outcome = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            conn.send(crate::protocol::ApiKey::ApiVersions, 0, 1, Bytes::from_static(b"req")),
        )
        .await;
        assert!(outcome.is_err(), "request should still be pending once the script runs dry");
    }
}
