//! # wiretap
//!
//! A minimal HTTP framework whose one real feature is a transparent audit
//! middleware: every request and response is captured in full, bodies
//! included, and emitted as a structured record, while the client receives
//! exactly what the application wrote.
//!
//! ## The contract
//!
//! wiretap sits behind a reverse proxy. TLS, rate limiting, slow clients
//! and body-size limits are the proxy's job. Routing is the application's
//! job: the server serves a single [`Handler`], and how that handler picks
//! what to do is up to you.
//!
//! What's left for wiretap:
//!
//! - The exchange model: a re-readable [`Request`] and a [`Response`] that
//!   writes into a swappable [`Sink`]
//! - [`middleware::Audit`], which buffers the response, logs both sides and
//!   relays the bytes unchanged
//! - Async I/O on hyper, HTTP/1.1 and HTTP/2, graceful shutdown
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use http::StatusCode;
//! use wiretap::middleware::Audit;
//! use wiretap::{handler_fn, BoxFuture, Error, Exchange, Handler, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Error> {
//!     let app = handler_fn(create_user).with(Audit::tracing());
//!     Server::bind("0.0.0.0:3000")?.serve(app).await
//! }
//!
//! fn create_user(ex: &mut Exchange) -> BoxFuture<'_, Result<(), Error>> {
//!     Box::pin(async move {
//!         if ex.request().body().is_empty() {
//!             ex.response_mut().set_status(StatusCode::BAD_REQUEST);
//!             return Ok(());
//!         }
//!         ex.response_mut().set_status(StatusCode::CREATED);
//!         ex.response_mut().write_json(&serde_json::json!({ "id": 99 })).await
//!     })
//! }
//! ```
//!
//! ## Who is the user?
//!
//! Authentication is not wiretap's business. A middleware that runs before
//! [`Audit`](middleware::Audit) records the user on the request
//! [`Context`], and both audit records carry it as `userId`.

mod context;
mod error;
mod exchange;
mod handler;
mod request;
mod response;
mod server;

pub mod middleware;

pub use context::{Context, USER_ID_ATTRIBUTE};
pub use error::{BoxError, Error};
pub use exchange::Exchange;
pub use handler::{BoxFuture, FnHandler, Handler, handler_fn};
pub use request::{Request, RequestBody, RequestBuilder};
pub use response::{ContentType, Response, Sink};
pub use server::Server;
