//! Filter chain execution.
//!
//! # Onion order
//!
//! ```text
//! pre(1) → pre(2) → pre(3) → handler → post(3) → post(2) → post(1)
//! ```
//!
//! Pre-actions are plain synchronous calls. The terminal handler's future is
//! the only `.await`, and post-actions run after it settles, in reverse.
//!
//! # Failures
//!
//! The first error stops forward progress. Every stage already entered
//! (its `pre` returned `Ok`) still gets its `post`, exactly once. The first
//! error is what the caller sees; anything a post-action raises afterwards
//! is logged and attached as [`Error::suppressed`].
//!
//! # Cancellation
//!
//! The per-request cursor owns a drop guard. If the `execute` future is
//! dropped mid-flight (client went away, timeout, `select!` lost), the
//! entered stages are unwound from `Drop` with [`Outcome::Cancelled`].

use std::future::Future;
use std::sync::Arc;

use tracing::{Instrument, debug, info_span, trace, warn};

use crate::error::{Error, Phase};
use crate::exchange::Exchange;
use crate::filter::Outcome;
use crate::handler::Handler;
use crate::registry::{Entry, FilterRegistry};

/// Runs exchanges through a frozen set of filter stages.
///
/// Cloning is one `Arc` clone; every clone shares the same stages. The
/// executor keeps no per-request state, so any number of chains may run
/// concurrently.
#[derive(Clone)]
pub struct Executor {
    stages: Arc<[Entry]>,
}

impl Executor {
    pub fn new(registry: FilterRegistry) -> Self {
        Self { stages: registry.into_entries().into() }
    }

    pub fn len(&self) -> usize { self.stages.len() }
    pub fn is_empty(&self) -> bool { self.stages.is_empty() }

    /// Runs `exchange` through every stage and then `handler`.
    ///
    /// Resolves to the handler's value, or to the first error, once every
    /// entered stage has run its post-action.
    pub async fn execute<T, H>(&self, exchange: &mut Exchange, handler: &H) -> Result<T, Error>
    where
        H: Handler<T> + ?Sized,
    {
        self.execute_until(exchange, handler, std::future::pending()).await
    }

    /// Like [`execute`](Executor::execute), but gives up on the handler as
    /// soon as `cancel` resolves. The entered stages unwind with
    /// [`Outcome::Cancelled`] and the result is an
    /// [`Aborted`](crate::ErrorKind::Aborted) error.
    pub async fn execute_until<T, H, C>(
        &self,
        exchange: &mut Exchange,
        handler: &H,
        cancel: C,
    ) -> Result<T, Error>
    where
        H: Handler<T> + ?Sized,
        C: Future<Output = ()>,
    {
        let span = info_span!(
            "chain",
            exchange = exchange.id(),
            method = %exchange.method(),
            path = %exchange.path(),
        );

        async move {
            let mut chain = Chain::new(&self.stages, exchange);

            if let Err(e) = chain.forward() {
                return chain.unwind(Err(e));
            }

            let fut = handler.call(&mut *chain.exchange);
            tokio::pin!(cancel);

            let result = tokio::select! {
                // Checked first so an already-fired signal wins over a ready
                // handler.
                biased;

                () = &mut cancel => {
                    debug!("cancelled while waiting on handler");
                    Err(Error::aborted())
                }
                res = fut => res.map_err(Error::handler),
            };

            chain.unwind(result)
        }
        .instrument(span)
        .await
    }
}

impl Default for Executor {
    /// An executor with no stages: every exchange goes straight to the handler.
    fn default() -> Self {
        Self::new(FilterRegistry::new())
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum ChainState {
    Entered,
    Unwinding,
    Complete,
    Failed,
}

/// Cursor over one request's pass through the stages.
struct Chain<'a> {
    stages: &'a [Entry],
    exchange: &'a mut Exchange,
    /// Stages whose pre-action succeeded and whose post-action is still owed.
    entered: usize,
    state: ChainState,
}

impl<'a> Chain<'a> {
    fn new(stages: &'a [Entry], exchange: &'a mut Exchange) -> Self {
        Self { stages, exchange, entered: 0, state: ChainState::Entered }
    }

    fn forward(&mut self) -> Result<(), Error> {
        for entry in self.stages {
            let stage = entry.filter.name();
            trace!(stage, priority = entry.priority, depth = self.entered, "pre");
            entry.filter.pre(self.exchange)
                .map_err(|e| Error::stage(stage, Phase::Pre, e))?;
            self.entered += 1;
        }
        Ok(())
    }

    fn unwind<T>(mut self, result: Result<T, Error>) -> Result<T, Error> {
        let outcome = match &result {
            Ok(_) => Outcome::Success,
            Err(e) if e.is_aborted() => Outcome::Cancelled,
            Err(_) => Outcome::Failure,
        };

        let mut secondary = self.run_posts(outcome).into_iter();

        let result = match result {
            Ok(value) => match secondary.next() {
                None => Ok(value),
                Some(mut first) => {
                    first.suppress_all(secondary);
                    Err(first)
                }
            },
            Err(mut primary) => {
                primary.suppress_all(secondary);
                Err(primary)
            }
        };

        self.state = if result.is_ok() { ChainState::Complete } else { ChainState::Failed };
        match &result {
            Ok(_) => debug!(state = ?self.state, "chain settled"),
            Err(e) => debug!(state = ?self.state, error = %e, "chain settled"),
        }
        result
    }

    /// Runs every owed post-action, innermost first, and returns the ones
    /// that failed. Once a post-action fails, the stages outside it see
    /// [`Outcome::Failure`] instead of a success.
    fn run_posts(&mut self, mut outcome: Outcome) -> Vec<Error> {
        self.state = ChainState::Unwinding;
        let mut failed = Vec::new();

        while self.entered > 0 {
            self.entered -= 1;
            let entry = &self.stages[self.entered];
            let stage = entry.filter.name();
            trace!(stage, priority = entry.priority, ?outcome, "post");

            if let Err(e) = entry.filter.post(self.exchange, outcome) {
                let err = Error::stage(stage, Phase::Post, e);
                warn!(stage, error = %err, "post-action failed during unwind");
                failed.push(err);
                if outcome.is_success() {
                    outcome = Outcome::Failure;
                }
            }
        }
        failed
    }
}

impl Drop for Chain<'_> {
    fn drop(&mut self) {
        if self.state == ChainState::Entered && self.entered > 0 {
            debug!(entered = self.entered, "chain dropped mid-flight, unwinding");
            // Nobody is left to receive these; run_posts already logged them.
            let _ = self.run_posts(Outcome::Cancelled);
            self.state = ChainState::Failed;
        }
    }
}
