//! Incoming HTTP request type.

use std::io::{self, Cursor, SeekFrom};
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{self, Poll};

use bytes::Bytes;
use http::header::{CONTENT_LENGTH, HOST};
use http::{HeaderMap, HeaderName, HeaderValue, Method, Uri};
use tokio::io::{AsyncRead, AsyncSeek, ReadBuf};

use crate::context::Context;

/// An incoming HTTP request.
///
/// The body is fully buffered by the transport before the pipeline runs,
/// so it can be read, rewound and read again by every stage.
pub struct Request {
    method: Method,
    scheme: String,
    host: String,
    uri: Uri,
    headers: HeaderMap,
    body: RequestBody,
    context: Context,
    remote_addr: Option<SocketAddr>,
}

impl Request {
    pub fn builder() -> RequestBuilder {
        RequestBuilder::default()
    }

    /// Builds a request from hyper's head and an already-collected body.
    ///
    /// Scheme comes from `x-forwarded-proto` when a proxy set it, then from
    /// the URI, then defaults to `http`. Host comes from the `host` header,
    /// then the URI authority.
    pub(crate) fn from_parts(
        parts: http::request::Parts,
        body: Bytes,
        remote_addr: SocketAddr,
    ) -> Self {
        let header = |name: &str| {
            parts.headers.get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned)
        };

        let scheme = header("x-forwarded-proto")
            .or_else(|| parts.uri.scheme_str().map(str::to_owned))
            .unwrap_or_else(|| "http".to_owned());
        let host = header(HOST.as_str())
            .or_else(|| parts.uri.authority().map(|a| a.to_string()))
            .unwrap_or_default();

        Self {
            method: parts.method,
            scheme,
            host,
            uri: parts.uri,
            headers: parts.headers,
            body: RequestBody::new(body),
            context: Context::default(),
            remote_addr: Some(remote_addr),
        }
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn scheme(&self) -> &str { &self.scheme }
    pub fn host(&self) -> &str { &self.host }
    pub fn path(&self) -> &str { self.uri.path() }
    pub fn query(&self) -> Option<&str> { self.uri.query() }
    pub fn uri(&self) -> &Uri { &self.uri }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn remote_addr(&self) -> Option<SocketAddr> { self.remote_addr }

    pub fn body(&self) -> &RequestBody { &self.body }
    pub fn body_mut(&mut self) -> &mut RequestBody { &mut self.body }

    pub fn context(&self) -> &Context { &self.context }
    pub fn context_mut(&mut self) -> &mut Context { &mut self.context }

    /// Header lookup. Returns `None` for absent or non-ASCII values.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The declared `content-length`, if present and well-formed.
    pub fn content_length(&self) -> Option<u64> {
        self.headers.get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
    }

    /// Canonical request URL: `"{scheme} {host}{path} {query}"`.
    ///
    /// The query keeps its leading `?` and is empty when absent, so a
    /// request without one ends in a single trailing space.
    ///
    /// ```rust
    /// use wiretap::Request;
    /// use http::Uri;
    ///
    /// let req = Request::builder()
    ///     .host("example.com")
    ///     .uri(Uri::from_static("/api/test?page=2"))
    ///     .build();
    /// assert_eq!(req.url(), "http example.com/api/test ?page=2");
    /// ```
    pub fn url(&self) -> String {
        let query = self.uri.query()
            .map(|q| format!("?{q}"))
            .unwrap_or_default();
        format!("{} {}{} {}", self.scheme, self.host, self.uri.path(), query)
    }
}

// ── RequestBody ───────────────────────────────────────────────────────────────

/// A buffered, re-readable request body.
///
/// Implements tokio's [`AsyncRead`] and [`AsyncSeek`]. Reading advances a
/// position; [`rewind`](RequestBody::rewind) moves it back to the start.
///
/// ```rust
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> std::io::Result<()> {
/// use tokio::io::AsyncReadExt;
/// use wiretap::RequestBody;
///
/// let mut body = RequestBody::new("hello".into());
/// let mut first = String::new();
/// body.read_to_string(&mut first).await?;
///
/// body.rewind();
/// let mut second = String::new();
/// body.read_to_string(&mut second).await?;
/// assert_eq!(first, second);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct RequestBody {
    inner: Cursor<Bytes>,
}

impl RequestBody {
    pub fn new(bytes: Bytes) -> Self {
        Self { inner: Cursor::new(bytes) }
    }

    /// All bytes of the body, independent of the read position.
    pub fn bytes(&self) -> &Bytes { self.inner.get_ref() }
    pub fn len(&self) -> usize { self.inner.get_ref().len() }
    pub fn is_empty(&self) -> bool { self.inner.get_ref().is_empty() }
    pub fn position(&self) -> u64 { self.inner.position() }

    /// Moves the read position back to the start.
    pub fn rewind(&mut self) {
        self.inner.set_position(0);
    }
}

impl AsyncRead for RequestBody {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl AsyncSeek for RequestBody {
    fn start_seek(mut self: Pin<&mut Self>, position: SeekFrom) -> io::Result<()> {
        Pin::new(&mut self.inner).start_seek(position)
    }

    fn poll_complete(
        mut self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
    ) -> Poll<io::Result<u64>> {
        Pin::new(&mut self.inner).poll_complete(cx)
    }
}

// ── RequestBuilder ────────────────────────────────────────────────────────────

/// Builder for [`Request`], for tests and for transports other than the
/// built-in server.
///
/// Defaults: `GET http localhost/`, no headers, empty body.
pub struct RequestBuilder {
    method: Method,
    scheme: String,
    host: String,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    context: Context,
    remote_addr: Option<SocketAddr>,
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self {
            method: Method::GET,
            scheme: "http".to_owned(),
            host: "localhost".to_owned(),
            uri: Uri::from_static("/"),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            context: Context::default(),
            remote_addr: None,
        }
    }
}

impl RequestBuilder {
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Path and query, e.g. `Uri::from_static("/users?page=2")`.
    pub fn uri(mut self, uri: Uri) -> Self {
        self.uri = uri;
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Sets the body. A matching `content-length` is added on
    /// [`build`](RequestBuilder::build) unless one was set explicitly.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets the authenticated user attribute, as an auth stage would.
    pub fn user(mut self, raw: impl Into<String>) -> Self {
        self.context.set_user(raw);
        self
    }

    pub fn remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    pub fn build(mut self) -> Request {
        if !self.body.is_empty() && !self.headers.contains_key(CONTENT_LENGTH) {
            self.headers.insert(CONTENT_LENGTH, HeaderValue::from(self.body.len()));
        }
        Request {
            method: self.method,
            scheme: self.scheme,
            host: self.host,
            uri: self.uri,
            headers: self.headers,
            body: RequestBody::new(self.body),
            context: self.context,
            remote_addr: self.remote_addr,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    fn parts(uri: &str, headers: &[(&'static str, &'static str)]) -> http::request::Parts {
        let mut builder = http::Request::builder().uri(uri);
        for (k, v) in headers {
            builder = builder.header(*k, *v);
        }
        builder.body(()).unwrap().into_parts().0
    }

    fn remote() -> SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    #[test]
    fn url_without_query_ends_with_space() {
        let req = Request::builder()
            .host("example.com")
            .uri(Uri::from_static("/api/test"))
            .build();
        assert_eq!(req.url(), "http example.com/api/test ");
    }

    #[test]
    fn from_parts_prefers_forwarded_proto() {
        let p = parts("/a?b=1", &[("host", "api.local:8080"), ("x-forwarded-proto", "https")]);
        let req = Request::from_parts(p, Bytes::new(), remote());
        assert_eq!(req.url(), "https api.local:8080/a ?b=1");
        assert_eq!(req.remote_addr(), Some(remote()));
    }

    #[test]
    fn from_parts_falls_back_to_uri_authority() {
        let p = parts("http://proxy.example/x", &[]);
        let req = Request::from_parts(p, Bytes::new(), remote());
        assert_eq!(req.scheme(), "http");
        assert_eq!(req.host(), "proxy.example");
    }

    #[test]
    fn builder_derives_content_length_from_body() {
        let req = Request::builder().body("abc").build();
        assert_eq!(req.content_length(), Some(3));

        let req = Request::builder().build();
        assert_eq!(req.content_length(), None);
    }

    #[test]
    fn explicit_content_length_wins() {
        let req = Request::builder()
            .header(CONTENT_LENGTH, HeaderValue::from_static("10"))
            .body("abc")
            .build();
        assert_eq!(req.content_length(), Some(10));
        assert_eq!(req.body().len(), 3);
    }

    #[tokio::test]
    async fn body_can_be_read_twice_after_rewind() {
        let mut req = Request::builder().body("payload").build();

        let mut first = Vec::new();
        req.body_mut().read_to_end(&mut first).await.unwrap();
        assert_eq!(req.body().position(), 7);

        req.body_mut().rewind();
        let mut second = Vec::new();
        req.body_mut().read_to_end(&mut second).await.unwrap();
        assert_eq!(first, b"payload");
        assert_eq!(first, second);
    }
}
