//! Handler trait and type erasure.
//!
//! # Why handlers borrow the exchange
//!
//! A handler receives `&mut Exchange` instead of owning a request and
//! returning a response. Middleware keeps ownership of the exchange for the
//! whole call, so it can still inspect and repair it after the handler
//! returned an error or panicked. The audit middleware depends on this to
//! relay partial output.
//!
//! The borrow shows up in the signature as a lifetime on the boxed future:
//!
//! ```text
//! fn hello(ex: &mut Exchange) -> BoxFuture<'_, Result<(), Error>>  ← user writes this
//!        ↓ handler_fn(hello)
//! FnHandler(hello)                                                ← implements Handler
//!        ↓ stored as Arc<dyn Handler> by the server
//! handler.call(&mut exchange)   at request time                   ← one vtable dispatch
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::Error;
use crate::exchange::Exchange;
use crate::middleware::{Layered, Middleware};

/// A heap-allocated, type-erased future borrowing for `'a`.
///
/// `Pin<Box<…>>` is required because the async runtime must be able to poll
/// the future in-place. `Send` lets tokio move it across threads.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One stage of the request pipeline.
///
/// An application is a `Handler`; a handler wrapped in middleware is also a
/// `Handler`. The server serves exactly one.
pub trait Handler: Send + Sync + 'static {
    fn call<'a>(&'a self, exchange: &'a mut Exchange) -> BoxFuture<'a, Result<(), Error>>;

    /// Wraps `self` in `middleware`. The last middleware added runs first.
    ///
    /// ```rust
    /// use wiretap::{handler_fn, BoxFuture, Error, Exchange, Handler};
    /// use wiretap::middleware::Audit;
    ///
    /// fn app(ex: &mut Exchange) -> BoxFuture<'_, Result<(), Error>> {
    ///     Box::pin(async move {
    ///         ex.response_mut().write_text("ok").await?;
    ///         Ok(())
    ///     })
    /// }
    ///
    /// let pipeline = handler_fn(app).with(Audit::tracing());
    /// ```
    fn with<M: Middleware>(self, middleware: M) -> Layered<M, Self>
    where
        Self: Sized,
    {
        Layered::new(middleware, self)
    }
}

impl<H: Handler + ?Sized> Handler for Arc<H> {
    fn call<'a>(&'a self, exchange: &'a mut Exchange) -> BoxFuture<'a, Result<(), Error>> {
        (**self).call(exchange)
    }
}

/// Adapts a plain function or closure into a [`Handler`].
///
/// Closures passed here get their signature inferred from the bound, so
/// `handler_fn(|ex| Box::pin(async move { … }))` works without annotations.
pub fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: for<'a> Fn(&'a mut Exchange) -> BoxFuture<'a, Result<(), Error>> + Send + Sync + 'static,
{
    FnHandler(f)
}

/// Newtype produced by [`handler_fn`], bridging a function to [`Handler`].
pub struct FnHandler<F>(F);

impl<F> Handler for FnHandler<F>
where
    F: for<'a> Fn(&'a mut Exchange) -> BoxFuture<'a, Result<(), Error>> + Send + Sync + 'static,
{
    fn call<'a>(&'a self, exchange: &'a mut Exchange) -> BoxFuture<'a, Result<(), Error>> {
        (self.0)(exchange)
    }
}
