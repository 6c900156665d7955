//! A single multiplexed TCP connection to one broker (§4.4).
//!
//! Every request is tagged with a correlation id; a background task owns the socket, writes
//! outgoing frames as they arrive on an internal channel, and dispatches incoming frames back to
//! the caller that is waiting on that correlation id. Identically-fingerprinted concurrent
//! requests share one broker round trip (§9's request-fingerprint design note).

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio_util::codec::{Framed, LengthDelimitedCodec};
use tracing::{debug, instrument, warn};

use crate::errors::{ErrorKind, Result};
use crate::network::fingerprint::fingerprint;
use crate::protocol::ApiKey;
use crate::sasl::Credentials;

/// How long a connection may sit with no in-flight requests before `Connection` considers it
/// eligible for pool eviction. Purely advisory; the pool decides whether to actually close it.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(540);

type Waiter = oneshot::Sender<Result<Bytes>>;

struct Outbound {
    correlation_id: i32,
    frame: Bytes,
}

/// One broker connection. Cheap to clone — every clone shares the same background dispatcher and
/// socket.
#[derive(Clone)]
pub struct Connection {
    addr: String,
    outbound: mpsc::Sender<Outbound>,
    next_correlation_id: Arc<AtomicI32>,
    waiters: Arc<Mutex<HashMap<i32, Waiter>>>,
    inflight_by_fingerprint: Arc<Mutex<HashMap<u64, Vec<Waiter>>>>,
    closed: Arc<AtomicBool>,
}

impl Connection {
    /// Opens a TCP connection to `addr`, performs the SASL handshake when `credentials` is
    /// supplied, then spawns the background read/write dispatcher.
    #[instrument(skip(credentials))]
    pub async fn connect(addr: &str, credentials: Option<Credentials>) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        Self::from_transport(addr, stream, credentials).await
    }

    /// Builds a connection over an arbitrary transport rather than a live `TcpStream` — the seam
    /// tests use to script canned broker responses over an in-memory duplex instead of a socket.
    pub async fn from_transport<T>(addr: &str, transport: T, credentials: Option<Credentials>) -> Result<Self>
    where
        T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let mut framed = Framed::new(transport, make_codec());

        if let Some(credentials) = credentials {
            sasl_handshake(&mut framed, &credentials).await?;
        }

        let (outbound_tx, outbound_rx) = mpsc::channel::<Outbound>(1024);
        let waiters: Arc<Mutex<HashMap<i32, Waiter>>> = Arc::new(Mutex::new(HashMap::new()));
        let inflight_by_fingerprint = Arc::new(Mutex::new(HashMap::new()));
        let closed = Arc::new(AtomicBool::new(false));

        spawn_dispatcher(framed, outbound_rx, waiters.clone(), closed.clone());

        Ok(Connection {
            addr: addr.to_owned(),
            outbound: outbound_tx,
            next_correlation_id: Arc::new(AtomicI32::new(1)),
            waiters,
            inflight_by_fingerprint,
            closed,
        })
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Mints the next correlation id for a request on this connection. Monotonically increasing
    /// and never reused while the connection is open; wraps on overflow like any `i32` counter.
    pub fn next_correlation_id(&self) -> i32 {
        self.next_correlation_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Sends a request — `request_body` is the header-plus-body produced by a stub's
    /// `create_request`, with the 4-byte length prefix already stripped off — and waits for the
    /// matching response. `correlation_id` must be the same id the caller wrote into the header.
    /// Requests whose `(api_key, api_version, body)` fingerprint already has an in-flight twin
    /// share that twin's response rather than making a second broker round trip (§4.4 dedup, §9
    /// fingerprint design note).
    #[instrument(skip(self, request_body), fields(addr = %self.addr))]
    pub async fn send(
        &self,
        api_key: ApiKey,
        api_version: i16,
        correlation_id: i32,
        request_body: Bytes,
    ) -> Result<Bytes> {
        if self.is_closed() {
            return Err(ErrorKind::Io(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "connection closed",
            ))
            .into());
        }

        let fp = fingerprint(api_key, api_version, &request_body);
        let (tx, rx) = oneshot::channel();

        let is_leader = {
            let mut inflight = self.inflight_by_fingerprint.lock().await;
            match inflight.get_mut(&fp) {
                Some(waiters) => {
                    waiters.push(tx);
                    false
                }
                None => {
                    inflight.insert(fp, Vec::new());
                    true
                }
            }
        };

        if is_leader {
            self.waiters.lock().await.insert(correlation_id, tx);
            self.outbound
                .send(Outbound {
                    correlation_id,
                    frame: request_body,
                })
                .await
                .map_err(|_| {
                    ErrorKind::Io(std::io::Error::new(
                        std::io::ErrorKind::BrokenPipe,
                        "dispatcher task is gone",
                    ))
                })?;

            let result = rx.await.map_err(|_| -> crate::errors::Error {
                ErrorKind::Cancelled("request dropped before a response arrived".into()).into()
            })?;

            let followers = self
                .inflight_by_fingerprint
                .lock()
                .await
                .remove(&fp)
                .unwrap_or_default();
            for follower in followers {
                let cloned = clone_result(&result);
                let _ = follower.send(cloned);
            }

            result
        } else {
            rx.await.map_err(|_| -> crate::errors::Error {
                ErrorKind::Cancelled("request dropped before a shared response arrived".into()).into()
            })?
        }
    }

    pub async fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

fn clone_result(result: &Result<Bytes>) -> Result<Bytes> {
    match result {
        Ok(b) => Ok(b.clone()),
        Err(e) => Err(ErrorKind::Cancelled(format!("shared request failed: {}", e)).into()),
    }
}

fn make_codec() -> LengthDelimitedCodec {
    LengthDelimitedCodec::builder()
        .length_field_length(4)
        .big_endian()
        .new_codec()
}

fn spawn_dispatcher<T>(
    mut framed: Framed<T, LengthDelimitedCodec>,
    mut outbound_rx: mpsc::Receiver<Outbound>,
    waiters: Arc<Mutex<HashMap<i32, Waiter>>>,
    closed: Arc<AtomicBool>,
) where
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            tokio::select! {
                outgoing = outbound_rx.recv() => {
                    match outgoing {
                        Some(out) => {
                            if let Err(e) = framed.send(out.frame).await {
                                warn!(error = %e, "failed writing request, closing connection");
                                break;
                            }
                        }
                        None => break, // every Connection clone was dropped
                    }
                }
                incoming = framed.next() => {
                    match incoming {
                        Some(Ok(bytes)) => {
                            if bytes.len() < 4 {
                                warn!("short response frame, dropping");
                                continue;
                            }
                            let correlation_id = i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
                            let mut guard = waiters.lock().await;
                            if let Some(waiter) = guard.remove(&correlation_id) {
                                let _ = waiter.send(Ok(bytes.freeze()));
                            } else {
                                debug!(correlation_id, "no waiter for correlation id");
                            }
                        }
                        Some(Err(e)) => {
                            warn!(error = %e, "connection read error, closing");
                            break;
                        }
                        None => break, // peer closed
                    }
                }
            }
        }
        closed.store(true, Ordering::Release);
        let mut guard = waiters.lock().await;
        for (_, waiter) in guard.drain() {
            let _ = waiter.send(Err(ErrorKind::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionAborted,
                "connection closed",
            ))
            .into()));
        }
    });
}

/// Runs the `SaslHandshake` + (possibly multi-round) `SaslAuthenticate` exchange directly over the
/// not-yet-dispatcher-owned stream, before any application request is allowed through.
async fn sasl_handshake<T>(framed: &mut Framed<T, LengthDelimitedCodec>, credentials: &Credentials) -> Result<()>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    use crate::protocol::header::RequestHeader;
    use crate::protocol::{sasl_authenticate, sasl_handshake};

    let handshake_header = RequestHeader::new(ApiKey::SaslHandshake, 1, 0, None, false);
    let handshake_req = sasl_handshake::SaslHandshakeRequest {
        mechanism: credentials.mechanism_name().to_owned(),
    };
    let body = sasl_handshake::create_request(&handshake_header, &handshake_req)?;
    framed.send(Bytes::from(body[4..].to_vec())).await?;
    let resp = framed
        .next()
        .await
        .ok_or_else(|| ErrorKind::Authentication("connection closed during handshake".into()))??;
    let parsed = sasl_handshake::parse_response(&resp, 1)?;
    if parsed.error_code != 0 {
        return Err(ErrorKind::Authentication(format!(
            "broker rejected mechanism {}; supported: {:?}",
            credentials.mechanism_name(),
            parsed.mechanisms
        ))
        .into());
    }

    let mut mechanism = credentials.build();
    let mut server_response: Vec<u8> = Vec::new();
    let mut correlation_id = 1;
    loop {
        let client_message = mechanism.step(&server_response)?;
        let auth_header = RequestHeader::new(ApiKey::SaslAuthenticate, 1, correlation_id, None, false);
        let auth_req = sasl_authenticate::SaslAuthenticateRequest {
            auth_bytes: client_message,
        };
        let body = sasl_authenticate::create_request(&auth_header, &auth_req)?;
        framed.send(Bytes::from(body[4..].to_vec())).await?;
        let resp = framed.next().await.ok_or_else(|| {
            ErrorKind::Authentication("connection closed during authentication".into())
        })??;
        let parsed = sasl_authenticate::parse_response(&resp, 1)?;
        if parsed.error_code != 0 {
            return Err(ErrorKind::Authentication(
                parsed
                    .error_message
                    .unwrap_or_else(|| "authentication failed".into()),
            )
            .into());
        }
        server_response = parsed.auth_bytes;
        correlation_id += 1;
        if mechanism.is_complete() {
            break;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_collapses_identical_requests() {
        let a = fingerprint(ApiKey::Metadata, 1, b"orders");
        let b = fingerprint(ApiKey::Metadata, 1, b"orders");
        assert_eq!(a, b);
    }
}
