//! Diagnostics (§4.6): every high-level operation emits `start`/`end`/`error` events — and, for
//! operations that suspend, `async-start`/`async-end` — each carrying `{ client, operation,
//! operation_id }`. These are observable via `tracing` subscribers but otherwise semantically
//! transparent: nothing in the client behaves differently depending on whether anyone is
//! listening.

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, error, trace};

static NEXT_OPERATION_ID: AtomicU64 = AtomicU64::new(1);

/// One high-level operation's diagnostic handle. Dropping it without calling `end`/`fail` simply
/// stops emitting events for it — callers are expected to always reach one of those two.
pub struct Operation<'a> {
    client: &'a str,
    name: &'static str,
    id: u64,
}

/// Begins tracking a new operation and emits its `start` event.
pub fn begin<'a>(client: &'a str, name: &'static str) -> Operation<'a> {
    let id = NEXT_OPERATION_ID.fetch_add(1, Ordering::Relaxed);
    trace!(client, operation = name, operation_id = id, event = "start");
    Operation { client, name, id }
}

impl<'a> Operation<'a> {
    /// Marks the point where the operation suspended waiting on I/O.
    pub fn async_start(&self) {
        trace!(
            client = self.client,
            operation = self.name,
            operation_id = self.id,
            event = "async-start"
        );
    }

    /// Marks the point where a suspended operation resumed.
    pub fn async_end(&self) {
        trace!(
            client = self.client,
            operation = self.name,
            operation_id = self.id,
            event = "async-end"
        );
    }

    /// Emits the `end` event for a successfully completed operation.
    pub fn end(self) {
        debug!(
            client = self.client,
            operation = self.name,
            operation_id = self.id,
            event = "end"
        );
    }

    /// Emits the `error` event for a failed operation.
    pub fn fail(self, err: &crate::errors::Error) {
        error!(
            client = self.client,
            operation = self.name,
            operation_id = self.id,
            event = "error",
            error = %err
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_ids_are_unique_and_increasing() {
        let a = begin("test-client", "metadata");
        let b = begin("test-client", "metadata");
        assert!(b.id > a.id);
        a.end();
        b.end();
    }
}
