//! Outgoing HTTP response type and the [`Sink`] it writes its body into.
//!
//! A handler never builds a response value and returns it. It writes into
//! the [`Response`] that belongs to the exchange: set a status, add headers,
//! write body bytes. Where those bytes go is decided by whoever installed
//! the sink. The server installs an in-memory buffer that becomes the hyper
//! body; the audit middleware temporarily swaps in its own.

use std::any::Any;
use std::io;

use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::Error;

// ── Sink ──────────────────────────────────────────────────────────────────────

/// A write-once destination for response body bytes.
///
/// Implemented for every `AsyncWrite + Send + Unpin + 'static` type, which
/// covers `Vec<u8>`, `Cursor<Vec<u8>>`, TCP streams and `tokio::io::duplex`
/// halves. You never implement this yourself.
pub trait Sink: AsyncWrite + Send + Unpin + 'static {
    /// Converts the boxed sink back into `Any` so the code that installed
    /// it can recover the concrete type with `downcast`.
    fn into_any(self: Box<Self>) -> Box<dyn Any + Send>;
}

impl<T> Sink for T
where
    T: AsyncWrite + Send + Unpin + 'static,
{
    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }
}

// ── ContentType ───────────────────────────────────────────────────────────────

/// Content-type values for use with [`Response::set_content_type`].
///
/// `write_text` and `write_json` default to `Text` and `Json`.
pub enum ContentType {
    Html, // text/html; charset=utf-8
    Json, // application/json
    Text, // text/plain; charset=utf-8
}

impl ContentType {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Html => "text/html; charset=utf-8",
            Self::Json => "application/json",
            Self::Text => "text/plain; charset=utf-8",
        }
    }
}

// ── Response ─────────────────────────────────────────────────────────────────

/// An outgoing HTTP response: status, headers and a body [`Sink`].
///
/// Defaults to `200 OK` with no headers.
///
/// ```rust
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), wiretap::Error> {
/// use http::StatusCode;
/// use wiretap::Response;
///
/// let mut res = Response::new(Vec::new());
/// res.set_status(StatusCode::CREATED);
/// res.write_json(&serde_json::json!({ "id": 42 })).await?;
///
/// let (status, headers, _sink) = res.into_parts();
/// assert_eq!(status, StatusCode::CREATED);
/// assert_eq!(headers["content-type"], "application/json");
/// # Ok(())
/// # }
/// ```
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    sink: Box<dyn Sink>,
}

impl Response {
    pub fn new<S: Sink>(sink: S) -> Self {
        Self::from_boxed(Box::new(sink))
    }

    /// Like [`new`](Response::new) for a sink that is already boxed.
    pub fn from_boxed(sink: Box<dyn Sink>) -> Self {
        Self { status: StatusCode::OK, headers: HeaderMap::new(), sink }
    }

    pub fn status(&self) -> StatusCode { self.status }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn headers_mut(&mut self) -> &mut HeaderMap { &mut self.headers }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    pub fn insert_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    pub fn set_content_type(&mut self, content_type: ContentType) {
        self.headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type.as_str()));
    }

    /// Writes raw body bytes to the current sink.
    pub async fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.sink.write_all(bytes).await
    }

    /// Writes UTF-8 text. Sets `text/plain` unless a content type is set.
    pub async fn write_text(&mut self, text: &str) -> io::Result<()> {
        self.default_content_type(ContentType::Text);
        self.write(text.as_bytes()).await
    }

    /// Serializes `value` as JSON. Sets `application/json` unless a content
    /// type is set.
    pub async fn write_json<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Error> {
        let bytes = serde_json::to_vec(value)?;
        self.default_content_type(ContentType::Json);
        self.write(&bytes).await?;
        Ok(())
    }

    pub async fn flush(&mut self) -> io::Result<()> {
        self.sink.flush().await
    }

    /// The sink body bytes currently go to.
    pub fn sink_mut(&mut self) -> &mut dyn Sink {
        &mut *self.sink
    }

    /// Installs `sink` and returns the one it replaces. Status and headers
    /// are untouched.
    pub fn replace_sink(&mut self, sink: Box<dyn Sink>) -> Box<dyn Sink> {
        std::mem::replace(&mut self.sink, sink)
    }

    pub fn into_parts(self) -> (StatusCode, HeaderMap, Box<dyn Sink>) {
        (self.status, self.headers, self.sink)
    }

    fn default_content_type(&mut self, content_type: ContentType) {
        if !self.headers.contains_key(CONTENT_TYPE) {
            self.set_content_type(content_type);
        }
    }
}
