//! Connection pool keyed by broker address (§4.5).
//!
//! One `Connection` per `(host, port)`; `get_or_connect` races nothing — it takes a per-key lock
//! so two callers asking for the same broker at once share a single dial, which is the
//! `getFirstAvailable` behaviour described in §4.5.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, instrument};

use crate::errors::Result;
use crate::network::connection::Connection;
use crate::sasl::Credentials;

#[derive(Clone, Default)]
pub struct ConnectionPool {
    inner: Arc<Mutex<HashMap<String, Connection>>>,
    credentials: Option<Credentials>,
}

impl ConnectionPool {
    pub fn new(credentials: Option<Credentials>) -> Self {
        ConnectionPool {
            inner: Arc::new(Mutex::new(HashMap::new())),
            credentials,
        }
    }

    /// Returns the pooled connection for `addr`, dialing a new one if none exists yet or the
    /// existing one has been closed. Holds the pool lock for the duration of a fresh dial, so
    /// concurrent callers for the same address share one TCP handshake rather than racing.
    #[instrument(skip(self))]
    pub async fn get_or_connect(&self, addr: &str) -> Result<Connection> {
        let mut guard = self.inner.lock().await;
        if let Some(conn) = guard.get(addr) {
            if !conn.is_closed() {
                return Ok(conn.clone());
            }
            debug!(addr, "evicting closed connection from pool");
        }
        let conn = Connection::connect(addr, self.credentials.clone()).await?;
        guard.insert(addr.to_owned(), conn.clone());
        Ok(conn)
    }

    /// Seeds the pool with an already-established connection, so a test can hand it a
    /// `ScriptedBroker`-backed `Connection` instead of letting `get_or_connect` dial a socket.
    pub async fn insert(&self, addr: &str, conn: Connection) {
        self.inner.lock().await.insert(addr.to_owned(), conn);
    }

    /// Closes and drops every pooled connection whose `addr` matches `predicate`.
    pub async fn evict_if(&self, predicate: impl Fn(&str) -> bool) {
        let mut guard = self.inner.lock().await;
        let to_remove: Vec<String> = guard
            .keys()
            .filter(|addr| predicate(addr))
            .cloned()
            .collect();
        for addr in to_remove {
            if let Some(conn) = guard.remove(&addr) {
                conn.close().await;
            }
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_starts_empty() {
        let pool = ConnectionPool::new(None);
        assert_eq!(
            tokio_test::block_on(pool.len()),
            0,
            "a fresh pool holds no connections until get_or_connect is called"
        );
    }
}
