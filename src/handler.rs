//! Terminal handler trait and type erasure.
//!
//! The terminal handler is the innermost step of a chain, typically the
//! call that forwards the request downstream. Any function or closure
//!
//! ```text
//! Fn(&mut Exchange) -> impl Future<Output = Result<T, E>> + Send + 'static
//! ```
//!
//! qualifies, as long as `E` converts into [`BoxError`]. The handler gets the
//! exchange synchronously, copies out what it needs, and returns a future
//! that owns its data. That future is the chain's one suspension point; post
//! actions only run after it settles.
//!
//! ```rust
//! use std::convert::Infallible;
//! use tollgate::{Exchange, Response};
//!
//! fn forward(ex: &mut Exchange) -> impl Future<Output = Result<Response, Infallible>> + use<> {
//!     let path = ex.path().to_owned();
//!     async move { Ok(Response::text(format!("forwarded {path}"))) }
//! }
//! ```

use std::future::Future;
use std::pin::Pin;

use crate::error::BoxError;
use crate::exchange::Exchange;

/// A heap-allocated, type-erased handler future.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// Implemented for every valid terminal handler.
///
/// There is normally no reason to implement this by hand; the blanket impl
/// covers functions and closures. It is object safe, so a host can hold an
/// `Arc<dyn Handler<T>>`.
pub trait Handler<T>: Send + Sync {
    fn call(&self, exchange: &mut Exchange) -> BoxFuture<Result<T, BoxError>>;
}

impl<F, Fut, T, E> Handler<T> for F
where
    F: Fn(&mut Exchange) -> Fut + Send + Sync,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Into<BoxError> + 'static,
{
    fn call(&self, exchange: &mut Exchange) -> BoxFuture<Result<T, BoxError>> {
        let fut = self(exchange);
        Box::pin(async move { fut.await.map_err(Into::into) })
    }
}
