//! Filter stages.
//!
//! A filter is a pre/post hook pair. The executor calls [`Filter::pre`] on
//! the way in and, once everything inside it has settled, [`Filter::post`]
//! on the way out. Returning an error from either hook fails the request;
//! see [`Executor`](crate::Executor) for how that error travels.
//!
//! Implement the trait for stages with their own state, or build one from
//! closures with [`stage`]:
//!
//! ```rust
//! use tollgate::{FilterRegistry, filter};
//!
//! let mut filters = FilterRegistry::new();
//! filters.register(
//!     filter::stage("request-id")
//!         .pre(|ex| {
//!             if ex.header("x-request-id").is_none() {
//!                 return Err("missing x-request-id".into());
//!             }
//!             Ok(())
//!         }),
//!     10,
//! );
//! ```

use crate::error::BoxError;
use crate::exchange::Exchange;

/// How the inner part of the chain settled, as seen by a post-action.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Outcome {
    Success,
    Failure,
    Cancelled,
}

impl Outcome {
    pub fn is_success(self) -> bool { self == Self::Success }
}

/// One stage of the chain.
///
/// Filters are shared by every in-flight request, so they take `&self`.
/// Per-request state belongs in the exchange's attributes.
pub trait Filter: Send + Sync + 'static {
    /// Stage name used in logs and errors.
    fn name(&self) -> &str;

    fn pre(&self, _exchange: &mut Exchange) -> Result<(), BoxError> {
        Ok(())
    }

    /// Runs once for every successful [`pre`](Filter::pre), whatever
    /// happened further in.
    fn post(&self, _exchange: &mut Exchange, _outcome: Outcome) -> Result<(), BoxError> {
        Ok(())
    }
}

type PreFn = Box<dyn Fn(&mut Exchange) -> Result<(), BoxError> + Send + Sync>;
type PostFn = Box<dyn Fn(&mut Exchange, Outcome) -> Result<(), BoxError> + Send + Sync>;

/// Starts a closure-built filter named `name`. Both hooks default to no-ops.
pub fn stage(name: impl Into<String>) -> Stage {
    Stage { name: name.into(), pre: None, post: None }
}

/// A filter assembled from closures. Obtain via [`stage`].
pub struct Stage {
    name: String,
    pre: Option<PreFn>,
    post: Option<PostFn>,
}

impl Stage {
    pub fn pre<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut Exchange) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.pre = Some(Box::new(f));
        self
    }

    pub fn post<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut Exchange, Outcome) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.post = Some(Box::new(f));
        self
    }
}

impl Filter for Stage {
    fn name(&self) -> &str { &self.name }

    fn pre(&self, exchange: &mut Exchange) -> Result<(), BoxError> {
        match &self.pre {
            Some(f) => f(exchange),
            None => Ok(()),
        }
    }

    fn post(&self, exchange: &mut Exchange, outcome: Outcome) -> Result<(), BoxError> {
        match &self.post {
            Some(f) => f(exchange, outcome),
            None => Ok(()),
        }
    }
}
