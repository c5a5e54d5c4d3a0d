//! Request trace notification.
//!
//! [`TraceFilter`] times each exchange and, on the way out, passes an
//! [`HttpTrace`] to a [`TraceSink`]. Storing, exposing or expiring those
//! records is the sink's business.
//!
//! ```rust
//! use std::sync::{Arc, Mutex};
//! use tollgate::{FilterRegistry, middleware::trace::{HttpTrace, TraceFilter}};
//!
//! let seen: Arc<Mutex<Vec<HttpTrace>>> = Arc::default();
//! let sink = Arc::clone(&seen);
//!
//! // Priority 0 keeps it outermost, so the elapsed time covers every other stage.
//! let filters = FilterRegistry::new()
//!     .with(TraceFilter::new(move |t: HttpTrace| sink.lock().unwrap().push(t)), 0);
//! ```

use std::time::{Duration, Instant, SystemTime};

use http::Method;
use tracing::debug;

use crate::error::BoxError;
use crate::exchange::Exchange;
use crate::filter::{Filter, Outcome};

/// One finished exchange.
#[derive(Clone, Debug)]
pub struct HttpTrace {
    pub exchange: u64,
    pub method: Method,
    pub path: String,
    pub outcome: Outcome,
    /// Wall-clock time the exchange entered this stage.
    pub timestamp: SystemTime,
    pub elapsed: Duration,
}

/// Receives finished traces. Called from the post-action, on the request's
/// own task, so implementations should not block.
pub trait TraceSink: Send + Sync + 'static {
    fn record(&self, trace: HttpTrace);
}

impl<F> TraceSink for F
where
    F: Fn(HttpTrace) + Send + Sync + 'static,
{
    fn record(&self, trace: HttpTrace) {
        self(trace)
    }
}

#[derive(Clone)]
struct Started {
    at: Instant,
    wall: SystemTime,
}

/// Times exchanges and reports them to a [`TraceSink`].
pub struct TraceFilter<S> {
    sink: S,
}

impl<S: TraceSink> TraceFilter<S> {
    pub fn new(sink: S) -> Self {
        Self { sink }
    }
}

impl<S: TraceSink> Filter for TraceFilter<S> {
    fn name(&self) -> &str { "http-trace" }

    fn pre(&self, exchange: &mut Exchange) -> Result<(), BoxError> {
        exchange.attributes_mut().insert(Started { at: Instant::now(), wall: SystemTime::now() });
        Ok(())
    }

    fn post(&self, exchange: &mut Exchange, outcome: Outcome) -> Result<(), BoxError> {
        let Some(started) = exchange.attributes_mut().remove::<Started>() else {
            // Another stage took the marker; nothing to measure against.
            debug!(exchange = exchange.id(), "trace start marker missing");
            return Ok(());
        };

        self.sink.record(HttpTrace {
            exchange: exchange.id(),
            method: exchange.method().clone(),
            path: exchange.path().to_owned(),
            outcome,
            timestamp: started.wall,
            elapsed: started.at.elapsed(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[test]
    fn records_one_trace_per_exchange() {
        let seen: Arc<Mutex<Vec<HttpTrace>>> = Arc::default();
        let sink = Arc::clone(&seen);
        let filter = TraceFilter::new(move |t: HttpTrace| sink.lock().unwrap().push(t));

        let mut ex = Exchange::new(Method::GET, "/orders");
        filter.pre(&mut ex).unwrap();
        filter.post(&mut ex, Outcome::Failure).unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].exchange, ex.id());
        assert_eq!(seen[0].path, "/orders");
        assert_eq!(seen[0].outcome, Outcome::Failure);
        assert!(ex.attributes().get::<Started>().is_none());
    }

    #[test]
    fn missing_start_marker_is_not_an_error() {
        let seen: Arc<Mutex<Vec<HttpTrace>>> = Arc::default();
        let sink = Arc::clone(&seen);
        let filter = TraceFilter::new(move |t: HttpTrace| sink.lock().unwrap().push(t));

        let mut ex = Exchange::new(Method::GET, "/");
        assert!(filter.post(&mut ex, Outcome::Success).is_ok());
        assert!(seen.lock().unwrap().is_empty());
    }
}
