//! Middleware layer.
//!
//! Middleware wraps a [`Handler`] and sees every exchange before and after
//! it. It is the right place for cross-cutting concerns such as auditing,
//! request-id injection and authentication.
//!
//! Built-in middleware:
//! - [`Audit`] captures the full text of each request and response and
//!   emits one [`LogRecord`] per side, without changing what the client
//!   receives.

mod audit;
mod record;
mod sink;

pub use audit::Audit;
pub use record::LogRecord;
pub use sink::{AUDIT_TARGET, AuditSink, FnSink, TracingSink, sink_fn};

use crate::error::Error;
use crate::exchange::Exchange;
use crate::handler::{BoxFuture, Handler};

/// A pipeline stage that runs around the next [`Handler`].
///
/// `next` is the rest of the pipeline. A middleware decides whether, when
/// and how often to call it.
pub trait Middleware: Send + Sync + 'static {
    fn handle<'a>(
        &'a self,
        exchange: &'a mut Exchange,
        next: &'a dyn Handler,
    ) -> BoxFuture<'a, Result<(), Error>>;
}

/// A handler wrapped in one middleware. Built by [`Handler::with`].
pub struct Layered<M, H> {
    middleware: M,
    inner: H,
}

impl<M, H> Layered<M, H> {
    pub fn new(middleware: M, inner: H) -> Self {
        Self { middleware, inner }
    }
}

impl<M: Middleware, H: Handler> Handler for Layered<M, H> {
    fn call<'a>(&'a self, exchange: &'a mut Exchange) -> BoxFuture<'a, Result<(), Error>> {
        self.middleware.handle(exchange, &self.inner)
    }
}
