//! Where audit records go.

use tracing::info;

use super::record::LogRecord;
use crate::error::BoxError;

/// `tracing` target used by [`TracingSink`]. Filter on it to route audit
/// records separately, e.g. `RUST_LOG=wiretap::audit=info`.
pub const AUDIT_TARGET: &str = "wiretap::audit";

/// Receives one [`LogRecord`] per call.
///
/// Storage, transport and rotation are the implementor's business. An
/// error is reported back to the transport once the exchange has finished.
/// It never stops the response from being relayed.
///
/// Closures become sinks through [`sink_fn`].
pub trait AuditSink: Send + Sync + 'static {
    fn emit(&self, record: &LogRecord) -> Result<(), BoxError>;
}

/// Adapts a closure into an [`AuditSink`].
///
/// ```rust
/// use std::sync::{Arc, Mutex};
/// use wiretap::middleware::{Audit, LogRecord, sink_fn};
///
/// let records = Arc::new(Mutex::new(Vec::<LogRecord>::new()));
/// let seen = Arc::clone(&records);
/// let audit = Audit::new(sink_fn(move |r| {
///     seen.lock().unwrap().push(r.clone());
///     Ok(())
/// }));
/// ```
pub fn sink_fn<F>(f: F) -> FnSink<F>
where
    F: Fn(&LogRecord) -> Result<(), BoxError> + Send + Sync + 'static,
{
    FnSink(f)
}

/// Newtype produced by [`sink_fn`].
pub struct FnSink<F>(F);

impl<F> AuditSink for FnSink<F>
where
    F: Fn(&LogRecord) -> Result<(), BoxError> + Send + Sync + 'static,
{
    fn emit(&self, record: &LogRecord) -> Result<(), BoxError> {
        (self.0)(record)
    }
}

/// Default sink: one `info` event per record on [`AUDIT_TARGET`], with the
/// record's JSON as the message.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl AuditSink for TracingSink {
    fn emit(&self, record: &LogRecord) -> Result<(), BoxError> {
        let json = record.to_json()?;
        info!(
            target: AUDIT_TARGET,
            url = %record.url,
            user_id = ?record.user_id,
            status = ?record.status_code,
            "{json}"
        );
        Ok(())
    }
}
