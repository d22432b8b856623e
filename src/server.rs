//! HTTP server and graceful shutdown.
//!
//! # Graceful shutdown and Kubernetes
//!
//! When Kubernetes terminates a pod it sends **SIGTERM** and waits
//! `terminationGracePeriodSeconds` (default 30 s) before sending SIGKILL.
//!
//! The server reacts by:
//! 1. Immediately stopping `listener.accept()`, so no new connections are made.
//! 2. Letting every in-flight connection task run to completion.
//! 3. Returning from [`Server::serve`], which lets `main` exit cleanly.
//!
//! # What the server does per request
//!
//! The hyper body is collected into memory, the request is wrapped in an
//! [`Exchange`] whose response sink is a `Vec<u8>`, and the handler runs
//! against it. Whatever the handler left in the exchange (status, headers,
//! bytes in the sink) becomes the hyper response. A handler error or panic
//! becomes an empty `500`. A request that outlives the configured timeout is
//! dropped mid-flight and answered with `503`.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_util::FutureExt;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::error::Error;
use crate::exchange::Exchange;
use crate::handler::Handler;
use crate::request::Request;
use crate::response::{Response, Sink};

enum Bind {
    Addr(SocketAddr),
    Listener(TcpListener),
}

/// The HTTP server.
pub struct Server {
    bind: Bind,
    request_timeout: Option<Duration>,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    ///
    /// ```rust
    /// use wiretap::Server;
    ///
    /// assert!(Server::bind("0.0.0.0:3000").is_ok());
    /// assert!(Server::bind("not an address").is_err());
    /// ```
    pub fn bind(addr: &str) -> Result<Self, Error> {
        let addr: SocketAddr = addr.parse().map_err(|_| Error::Addr(addr.to_owned()))?;
        Ok(Self { bind: Bind::Addr(addr), request_timeout: None })
    }

    /// Serves connections from an already-bound listener.
    pub fn from_listener(listener: TcpListener) -> Self {
        Self { bind: Bind::Listener(listener), request_timeout: None }
    }

    /// Upper bound on the time one request may spend in the pipeline.
    /// Unset by default.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Starts accepting connections and dispatching them to `handler`.
    ///
    /// Returns only after a full graceful shutdown (SIGTERM or Ctrl-C,
    /// followed by all in-flight requests completing).
    pub async fn serve(self, handler: impl Handler) -> Result<(), Error> {
        self.serve_with_shutdown(handler, shutdown_signal()).await
    }

    /// Like [`serve`](Server::serve), but stops accepting when `signal`
    /// resolves instead of waiting for SIGTERM/Ctrl-C.
    pub async fn serve_with_shutdown<H, F>(self, handler: H, signal: F) -> Result<(), Error>
    where
        H: Handler,
        F: Future<Output = ()> + Send,
    {
        let listener = match self.bind {
            Bind::Addr(addr) => TcpListener::bind(addr).await?,
            Bind::Listener(listener) => listener,
        };
        let addr = listener.local_addr()?;
        let timeout = self.request_timeout;

        let handler: Arc<dyn Handler> = Arc::new(handler);

        info!(%addr, "wiretap listening");

        // JoinSet tracks every spawned connection task so we can wait for
        // them all to finish during graceful shutdown.
        let mut tasks = tokio::task::JoinSet::new();

        tokio::pin!(signal);

        loop {
            tokio::select! {
                // Check shutdown first so a signal immediately stops
                // accepting new connections, even if more are queued.
                biased;

                () = &mut signal => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let handler = Arc::clone(&handler);
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        // Called once per request on the connection, not
                        // once per connection.
                        let svc = service_fn(move |req| {
                            let handler = Arc::clone(&handler);
                            async move { dispatch(handler, timeout, req, remote_addr).await }
                        });

                        // `auto::Builder` handles both HTTP/1.1 and HTTP/2,
                        // whatever the client negotiates.
                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            error!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                // Reap finished connection tasks so the JoinSet does not grow
                // without bound on long-running servers.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}

        info!("wiretap stopped");
        Ok(())
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Runs one request through the pipeline and produces one response.
///
/// The error type is [`Infallible`]: every failure is turned into a status
/// code here, so hyper never sees an error.
async fn dispatch(
    handler: Arc<dyn Handler>,
    timeout: Option<Duration>,
    req: hyper::Request<Incoming>,
    remote_addr: SocketAddr,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(peer = %remote_addr, "request body read failed: {e}");
            return Ok(status_only(StatusCode::BAD_REQUEST));
        }
    };

    let request = Request::from_parts(parts, body, remote_addr);
    let mut exchange = Exchange::new(request, Response::new(Vec::<u8>::new()));

    let run = AssertUnwindSafe(handler.call(&mut exchange)).catch_unwind();
    let outcome = match timeout {
        Some(limit) => match tokio::time::timeout(limit, run).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(peer = %remote_addr, timeout_ms = limit.as_millis() as u64, "request timed out");
                return Ok(status_only(StatusCode::SERVICE_UNAVAILABLE));
            }
        },
        None => run.await,
    };

    match outcome {
        Ok(Ok(())) => Ok(into_http(exchange)),
        Ok(Err(e)) => {
            error!(peer = %remote_addr, "handler error: {e}");
            Ok(status_only(StatusCode::INTERNAL_SERVER_ERROR))
        }
        Err(_) => {
            error!(peer = %remote_addr, "handler panicked");
            Ok(status_only(StatusCode::INTERNAL_SERVER_ERROR))
        }
    }
}

fn into_http(exchange: Exchange) -> http::Response<Full<Bytes>> {
    let (_, response) = exchange.into_parts();
    let (status, headers, sink) = response.into_parts();

    let body = match Sink::into_any(sink).downcast::<Vec<u8>>() {
        Ok(bytes) => Bytes::from(*bytes),
        Err(_) => {
            error!("response sink replaced by the pipeline and never restored");
            return status_only(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    let mut res = http::Response::new(Full::new(body));
    *res.status_mut() = status;
    *res.headers_mut() = headers;
    res
}

fn status_only(status: StatusCode) -> http::Response<Full<Bytes>> {
    let mut res = http::Response::new(Full::new(Bytes::new()));
    *res.status_mut() = status;
    res
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first shutdown signal the process receives.
///
/// On Unix this listens for both **SIGTERM** (sent by the Kubernetes control
/// plane) and **SIGINT** (Ctrl-C, for local dev). On Windows only Ctrl-C is
/// available. A handler that cannot be installed never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    // `pending()` never resolves: on non-Unix platforms the SIGTERM arm is
    // effectively disabled.
    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}
