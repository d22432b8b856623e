//! Request/response audit middleware.
//!
//! # How the response is captured
//!
//! The response body is a write-once [`Sink`]. Once bytes are written to the
//! server's sink they belong to the client and cannot be read back. So for
//! the duration of the downstream call the interceptor swaps in its own
//! in-memory buffer:
//!
//! ```text
//! capture request body, rewind it          → emit request record
//! real sink ⇄ Cursor<Vec<u8>>              ← downstream writes here
//! downstream returns (or fails, or panics)
//! Cursor<Vec<u8>> ⇄ real sink              ← original restored
//! read buffer as text, rewind it           → emit response record
//! copy buffer into real sink, flush        ← client sees identical bytes
//! ```
//!
//! If the exchange is cancelled while downstream runs, dropping the audit
//! future restores the real sink and drops the buffer.
//!
//! Every value involved lives in one `intercept` call. `Audit` itself holds
//! only the sink, so one instance serves any number of concurrent exchanges.

use std::io::{self, Cursor};
use std::ops::{Deref, DerefMut};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use tokio::io::AsyncReadExt;
use tracing::{Instrument, debug, debug_span, error, warn};

use super::record::LogRecord;
use super::sink::{AuditSink, TracingSink};
use super::Middleware;
use crate::error::Error;
use crate::exchange::Exchange;
use crate::handler::{BoxFuture, Handler};
use crate::request::RequestBody;
use crate::response::{Response, Sink};

/// Captures every request and response in full and hands one [`LogRecord`]
/// per side to an [`AuditSink`].
///
/// The exchange is otherwise untouched. Downstream reads the same request
/// body. The client receives the same status, headers and body bytes.
/// Downstream errors and panics pass through unchanged.
///
/// ```rust,no_run
/// use wiretap::{handler_fn, Handler, Server};
/// use wiretap::middleware::Audit;
///
/// # async fn run() -> Result<(), wiretap::Error> {
/// let app = handler_fn(|ex| Box::pin(async move {
///     ex.response_mut().write_text("ok").await?;
///     Ok(())
/// }));
///
/// Server::bind("0.0.0.0:3000")?
///     .serve(app.with(Audit::tracing()))
///     .await
/// # }
/// ```
pub struct Audit {
    sink: Arc<dyn AuditSink>,
}

impl Audit {
    pub fn new(sink: impl AuditSink) -> Self {
        Self { sink: Arc::new(sink) }
    }

    /// Audit into `tracing` via [`TracingSink`].
    pub fn tracing() -> Self {
        Self::new(TracingSink)
    }

    fn emit(&self, record: &LogRecord) -> Result<(), Error> {
        self.sink.emit(record).map_err(Error::Sink)
    }

    async fn intercept(
        &self,
        exchange: &mut Exchange,
        next: &dyn Handler,
        url: String,
    ) -> Result<(), Error> {
        let user_id = exchange.request().context().user_id();

        let declared = exchange.request().content_length();
        let body = capture_request(exchange.request_mut().body_mut(), declared).await;
        let mut sink_error = self.emit(&LogRecord::request(url.as_str(), user_id, body)).err();

        let mut substituted = Substituted::install(exchange);
        let outcome = AssertUnwindSafe(next.call(&mut substituted)).catch_unwind().await;
        let mut buffer = substituted.restore();
        drop(substituted);

        let completed = matches!(outcome, Ok(Ok(())));
        if completed || !buffer.get_ref().is_empty() {
            let text = capture_response(&mut buffer);
            let status = exchange.response().status().as_u16();
            if let Err(e) = self.emit(&LogRecord::response(url, user_id, status, text)) {
                sink_error.get_or_insert(e);
            }
        }

        let relayed = relay(&mut buffer, exchange.response_mut()).await;
        drop(buffer);

        match outcome {
            Ok(Ok(())) => {
                relayed?;
                sink_error.map_or(Ok(()), Err)
            }
            Ok(Err(err)) => {
                discard(relayed, sink_error);
                Err(err)
            }
            Err(panic) => {
                discard(relayed, sink_error);
                std::panic::resume_unwind(panic)
            }
        }
    }
}

impl Middleware for Audit {
    fn handle<'a>(
        &'a self,
        exchange: &'a mut Exchange,
        next: &'a dyn Handler,
    ) -> BoxFuture<'a, Result<(), Error>> {
        let url = exchange.request().url();
        let span = debug_span!("audit", url = %url);
        Box::pin(self.intercept(exchange, next, url).instrument(span))
    }
}

/// Reads at most `declared` bytes of the request body as text, leaving the
/// read position at the start.
///
/// A missing or zero `content-length` captures nothing. A body shorter than
/// declared is captured as far as it goes.
async fn capture_request(body: &mut RequestBody, declared: Option<u64>) -> String {
    let declared = declared.unwrap_or(0);
    let mut bytes = Vec::new();

    body.rewind();
    if declared > 0 {
        if let Err(e) = (&mut *body).take(declared).read_to_end(&mut bytes).await {
            warn!(error = %e, "request body capture failed");
        }
        if (bytes.len() as u64) < declared {
            warn!(declared, captured = bytes.len(), "request body shorter than content-length");
        }
    }
    body.rewind();

    String::from_utf8_lossy(&bytes).into_owned()
}

/// Reads the whole buffer as text. Leaves the position at the start, so
/// calling it again returns the same text and the relay sees every byte.
fn capture_response(buffer: &mut Cursor<Vec<u8>>) -> String {
    buffer.set_position(0);
    let text = String::from_utf8_lossy(buffer.get_ref()).into_owned();
    buffer.set_position(0);
    text
}

/// The exchange with the capture buffer installed as its sink.
///
/// Owns the real sink until [`restore`](Substituted::restore) hands it back.
/// If the audit future is dropped first, `Drop` puts it back, so a cancelled
/// exchange never keeps the buffer.
struct Substituted<'a> {
    exchange: &'a mut Exchange,
    original: Option<Box<dyn Sink>>,
}

impl<'a> Substituted<'a> {
    fn install(exchange: &'a mut Exchange) -> Self {
        let original = exchange.response_mut().replace_sink(Box::new(Cursor::new(Vec::new())));
        Self { exchange, original: Some(original) }
    }

    /// Puts the real sink back and recovers the buffer that replaced it.
    fn restore(&mut self) -> Cursor<Vec<u8>> {
        let Some(original) = self.original.take() else {
            return Cursor::new(Vec::new());
        };
        let substituted = self.exchange.response_mut().replace_sink(original);
        match Sink::into_any(substituted).downcast::<Cursor<Vec<u8>>>() {
            Ok(buffer) => *buffer,
            Err(_) => {
                error!("response sink replaced downstream and never restored, output dropped");
                Cursor::new(Vec::new())
            }
        }
    }
}

impl Deref for Substituted<'_> {
    type Target = Exchange;

    fn deref(&self) -> &Exchange {
        &*self.exchange
    }
}

impl DerefMut for Substituted<'_> {
    fn deref_mut(&mut self) -> &mut Exchange {
        &mut *self.exchange
    }
}

impl Drop for Substituted<'_> {
    fn drop(&mut self) {
        if let Some(original) = self.original.take() {
            drop(self.exchange.response_mut().replace_sink(original));
            debug!("audit cancelled before downstream finished, real sink restored");
        }
    }
}

async fn relay(buffer: &mut Cursor<Vec<u8>>, response: &mut Response) -> io::Result<()> {
    buffer.set_position(0);
    let copied = tokio::io::copy(buffer, response.sink_mut()).await?;
    response.flush().await?;
    debug!(bytes = copied, "response relayed");
    Ok(())
}

/// Logs what is lost when a downstream failure takes precedence.
fn discard(relayed: io::Result<()>, sink_error: Option<Error>) {
    if let Err(e) = relayed {
        warn!(error = %e, "relay of partial response failed");
    }
    if let Some(e) = sink_error {
        warn!(error = %e, "audit sink error superseded by handler failure");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;
    use http::header::CONTENT_LENGTH;
    use tokio::io::AsyncReadExt;

    use crate::Request;

    #[tokio::test]
    async fn capture_request_without_content_length_is_empty() {
        let mut req = Request::builder().build();
        let declared = req.content_length();
        assert_eq!(capture_request(req.body_mut(), declared).await, "");
    }

    #[tokio::test]
    async fn capture_request_never_reads_past_declared_length() {
        let mut req = Request::builder()
            .header(CONTENT_LENGTH, HeaderValue::from_static("3"))
            .body("abcdef")
            .build();
        let declared = req.content_length();
        assert_eq!(capture_request(req.body_mut(), declared).await, "abc");

        let mut rest = String::new();
        req.body_mut().read_to_string(&mut rest).await.unwrap();
        assert_eq!(rest, "abcdef");
    }

    /// Formatted log output, shared with the subscriber under test.
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<std::sync::Mutex<Vec<u8>>>);

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl LogBuffer {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    #[tokio::test]
    async fn capture_request_tolerates_short_body() {
        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let mut req = Request::builder()
            .header(CONTENT_LENGTH, HeaderValue::from_static("100"))
            .body("short")
            .build();
        let declared = req.content_length();
        assert_eq!(capture_request(req.body_mut(), declared).await, "short");
        assert_eq!(req.body().position(), 0);

        let text = logs.text();
        assert!(text.contains("WARN"), "{text}");
        assert!(text.contains("request body shorter than content-length"), "{text}");
        assert!(text.contains("declared=100"), "{text}");
        assert!(text.contains("captured=5"), "{text}");
    }

    #[tokio::test]
    async fn capture_request_of_full_body_logs_no_warning() {
        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let mut req = Request::builder().body("exact").build();
        let declared = req.content_length();
        assert_eq!(capture_request(req.body_mut(), declared).await, "exact");
        assert!(!logs.text().contains("WARN"), "{}", logs.text());
    }

    #[test]
    fn dropped_substitution_puts_real_sink_back() {
        let mut exchange = Exchange::new(Request::builder().build(), Response::new(Vec::<u8>::new()));
        {
            let substituted = Substituted::install(&mut exchange);
            assert!(substituted.original.is_some());
        }

        let (_, response) = exchange.into_parts();
        let (_, _, sink) = response.into_parts();
        assert!(Sink::into_any(sink).downcast::<Vec<u8>>().is_ok());
    }

    #[tokio::test]
    async fn restore_returns_what_downstream_wrote() {
        let mut exchange = Exchange::new(Request::builder().build(), Response::new(Vec::<u8>::new()));
        let mut substituted = Substituted::install(&mut exchange);
        substituted.response_mut().write(b"seen").await.unwrap();
        let buffer = substituted.restore();
        drop(substituted);

        assert_eq!(buffer.get_ref(), b"seen");
        let (_, response) = exchange.into_parts();
        let (_, _, sink) = response.into_parts();
        assert!(Sink::into_any(sink).downcast::<Vec<u8>>().is_ok());
    }

    #[tokio::test]
    async fn capture_request_rewinds_a_consumed_body() {
        let mut req = Request::builder().body("xyz").build();
        let mut sink = Vec::new();
        req.body_mut().read_to_end(&mut sink).await.unwrap();

        let declared = req.content_length();
        assert_eq!(capture_request(req.body_mut(), declared).await, "xyz");
        assert_eq!(req.body().position(), 0);
    }

    #[test]
    fn capture_response_is_idempotent() {
        let mut buffer = Cursor::new(b"hello".to_vec());
        buffer.set_position(5);
        assert_eq!(capture_response(&mut buffer), "hello");
        assert_eq!(capture_response(&mut buffer), "hello");
        assert_eq!(buffer.position(), 0);
        assert_eq!(buffer.get_ref().len(), 5);
    }

    #[test]
    fn capture_response_is_lossy_for_invalid_utf8() {
        let mut buffer = Cursor::new(vec![b'o', b'k', 0xff]);
        assert_eq!(capture_response(&mut buffer), "ok\u{fffd}");
    }

    #[tokio::test]
    async fn relay_copies_every_byte_after_capture() {
        let payload: Vec<u8> = (0..=255).collect();
        let mut buffer = Cursor::new(payload.clone());
        capture_response(&mut buffer);

        let mut response = Response::new(Vec::new());
        relay(&mut buffer, &mut response).await.unwrap();

        let (_, _, sink) = response.into_parts();
        let written = Sink::into_any(sink).downcast::<Vec<u8>>().unwrap();
        assert_eq!(*written, payload);
    }
}
