//! # tollgate
//!
//! Ordered pre/post filter chains for HTTP gateways.
//!
//! ## The contract
//!
//! A gateway's cross-cutting work (logging, tracing, header checks) goes
//! into filter stages. Each stage runs a pre-action on the way in and a
//! post-action on the way out, wrapped around one terminal handler:
//!
//! ```text
//! pre(1) → pre(2) → pre(3) → handler → post(3) → post(2) → post(1)
//! ```
//!
//! - Lower priority runs first on the way in and last on the way out; equal
//!   priorities keep registration order.
//! - Every stage whose pre-action succeeded gets its post-action, exactly
//!   once, whether the inside succeeded, failed, or was cancelled.
//! - The first error wins. Later failures during the unwind are attached as
//!   suppressed errors and never replace it.
//! - No retries, no routing, no global state.
//!
//! ## Quick start
//!
//! ```rust
//! use std::convert::Infallible;
//! use http::Method;
//! use tollgate::{Exchange, Executor, FilterRegistry, middleware::log::LogFilter};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let filters = FilterRegistry::new()
//!     .with(LogFilter::new("outer"), 1)
//!     .with(LogFilter::new("inner"), 2);
//! let executor = Executor::new(filters);
//!
//! let forward = |ex: &mut Exchange| {
//!     let path = ex.path().to_owned();
//!     async move { Ok::<_, Infallible>(format!("forwarded {path}")) }
//! };
//!
//! let mut exchange = Exchange::new(Method::GET, "/orders/7");
//! let body = executor.execute(&mut exchange, &forward).await.unwrap();
//! assert_eq!(body, "forwarded /orders/7");
//! # }
//! ```
//!
//! To serve HTTP directly, hand the same registry and handler to [`Server`].

mod chain;
mod error;
mod exchange;
mod handler;
mod registry;
mod response;
mod server;

pub mod filter;
pub mod middleware;

pub use chain::Executor;
pub use error::{BoxError, Error, ErrorKind, Phase};
pub use exchange::Exchange;
pub use filter::{Filter, Outcome};
pub use handler::{BoxFuture, Handler};
pub use registry::FilterRegistry;
pub use response::{IntoResponse, Response, ResponseBuilder};
pub use server::{RemoteAddr, Server};
