//! Shared helpers for wiretap integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use serde_json::Value;
use wiretap::middleware::{Audit, LogRecord, sink_fn};
use wiretap::{Exchange, Request, Response, Sink};

/// Collects every record an [`Audit`] emits.
#[derive(Clone, Default)]
pub struct Records(Arc<Mutex<Vec<LogRecord>>>);

impl Records {
    pub fn audit(&self) -> Audit {
        let inner = Arc::clone(&self.0);
        Audit::new(sink_fn(move |record| {
            inner.lock().unwrap().push(record.clone());
            Ok(())
        }))
    }

    pub fn take(&self) -> Vec<LogRecord> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }

    /// Records as serialized JSON values, in emission order.
    pub fn json(&self) -> Vec<Value> {
        self.take()
            .iter()
            .map(|r| serde_json::from_str(&r.to_json().unwrap()).unwrap())
            .collect()
    }
}

/// An exchange whose real sink is an in-memory `Vec<u8>`, like the server's.
pub fn exchange(request: Request) -> Exchange {
    Exchange::new(request, Response::new(Vec::<u8>::new()))
}

/// The bytes that reached the real sink.
pub fn sent_bytes(exchange: Exchange) -> Vec<u8> {
    let (_, response) = exchange.into_parts();
    let (_, _, sink) = response.into_parts();
    *Sink::into_any(sink).downcast::<Vec<u8>>().unwrap()
}
