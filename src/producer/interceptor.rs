//! Producer interceptors: hooks that see every record before it's sent and every acknowledgement
//! once the broker responds, for cross-cutting concerns (metrics, auditing) without touching
//! application send sites.

use crate::errors::Error;
use crate::producer::record::{ProducerRecord, RecordMetadata};

pub trait ProducerInterceptor: Send + Sync {
    /// Called just before a record is handed to the accumulator. May return a modified record;
    /// the default passes it through unchanged.
    fn on_send(&self, record: ProducerRecord) -> ProducerRecord {
        record
    }

    /// Called once a record's batch has been acknowledged or has permanently failed.
    fn on_acknowledgement(&self, _metadata: Option<&RecordMetadata>, _error: Option<&Error>) {}
}

#[derive(Default)]
pub struct ProducerInterceptors {
    interceptors: Vec<Box<dyn ProducerInterceptor>>,
}

impl ProducerInterceptors {
    pub fn new() -> Self {
        ProducerInterceptors {
            interceptors: Vec::new(),
        }
    }

    pub fn push(&mut self, interceptor: Box<dyn ProducerInterceptor>) {
        self.interceptors.push(interceptor);
    }

    pub fn on_send(&self, mut record: ProducerRecord) -> ProducerRecord {
        for interceptor in &self.interceptors {
            record = interceptor.on_send(record);
        }
        record
    }

    pub fn on_acknowledgement(&self, metadata: Option<&RecordMetadata>, error: Option<&Error>) {
        for interceptor in &self.interceptors {
            interceptor.on_acknowledgement(metadata, error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingInterceptor(Arc<AtomicUsize>);

    impl ProducerInterceptor for CountingInterceptor {
        fn on_send(&self, record: ProducerRecord) -> ProducerRecord {
            self.0.fetch_add(1, Ordering::SeqCst);
            record
        }
    }

    #[test]
    fn on_send_runs_every_registered_interceptor() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut interceptors = ProducerInterceptors::new();
        interceptors.push(Box::new(CountingInterceptor(counter.clone())));
        interceptors.push(Box::new(CountingInterceptor(counter.clone())));

        let record = ProducerRecord::new("orders", Bytes::from_static(b"v"));
        interceptors.on_send(record);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }
}
