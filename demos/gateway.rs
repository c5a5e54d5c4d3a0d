//! Gateway with three global logging filters and a trace sink.
//!
//! Run with:
//!   cargo run --example gateway
//!
//! Try:
//!   curl http://localhost:8082/orders/42
//!   curl http://localhost:8082/fail
//!
//! Each request logs three pre-filter lines in priority order, then three
//! post-filter lines in reverse, then the trace record.

use std::convert::Infallible;

use http::StatusCode;
use tollgate::middleware::{log::LogFilter, trace::{HttpTrace, TraceFilter}};
use tollgate::{Exchange, FilterRegistry, Response, Server};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let filters = FilterRegistry::new()
        .with(TraceFilter::new(|t: HttpTrace| {
            tracing::info!(
                exchange = t.exchange,
                method = %t.method,
                path = %t.path,
                outcome = ?t.outcome,
                elapsed_us = t.elapsed.as_micros() as u64,
                "http trace"
            );
        }), 0)
        .with(LogFilter::new("second-global"), 1)
        .with(LogFilter::new("third-global"), 2)
        .with(LogFilter::new("fourth-global"), 3);

    Server::bind("0.0.0.0:8082")
        .filters(filters)
        .serve(forward)
        .await
        .expect("server error");
}

// Stands in for the downstream call. `/fail` answers 503 to show that the
// post-filters still run on non-2xx responses.
fn forward(ex: &mut Exchange) -> impl Future<Output = Result<Response, Infallible>> + use<> {
    let path = ex.path().to_owned();
    async move {
        if path == "/fail" {
            return Ok(Response::status(StatusCode::SERVICE_UNAVAILABLE));
        }
        Ok(Response::text(format!("forwarded {path}")))
    }
}
