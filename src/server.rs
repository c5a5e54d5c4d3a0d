//! HTTP host and graceful shutdown.
//!
//! The server is the thinnest possible gateway around an [`Executor`]: every
//! request becomes an [`Exchange`], runs through the filter chain, and ends
//! at the one terminal handler. There is no router.
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
//! A client that hangs up mid-request drops its chain; the entered stages
//! still run their post-actions (see [`Executor`]).

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::chain::Executor;
use crate::error::Error;
use crate::exchange::Exchange;
use crate::handler::Handler;
use crate::registry::FilterRegistry;
use crate::response::{IntoResponse, Response};

/// The HTTP host.
pub struct Server {
    addr: SocketAddr,
    executor: Executor,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called. Starts with an empty filter chain.
    ///
    /// # Panics
    ///
    /// Panics if `addr` is not a valid `host:port` string.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use tollgate::Server;
    /// let server = Server::bind("0.0.0.0:8082");
    /// ```
    pub fn bind(addr: &str) -> Self {
        let addr: SocketAddr = addr.parse().expect("invalid socket address");
        Self { addr, executor: Executor::default() }
    }

    /// Runs every request through `filters` before the terminal handler.
    pub fn filters(mut self, filters: FilterRegistry) -> Self {
        self.executor = Executor::new(filters);
        self
    }

    /// Serves until SIGTERM or Ctrl-C, then drains in-flight connections.
    pub async fn serve<H, R>(self, handler: H) -> Result<(), Error>
    where
        H: Handler<R> + 'static,
        R: IntoResponse + Send + 'static,
    {
        self.serve_with_shutdown(handler, shutdown_signal()).await
    }

    /// Like [`serve`](Server::serve), but stops accepting once `signal`
    /// resolves.
    pub async fn serve_with_shutdown<H, R, S>(self, handler: H, signal: S) -> Result<(), Error>
    where
        H: Handler<R> + 'static,
        R: IntoResponse + Send + 'static,
        S: Future<Output = ()>,
    {
        let listener = TcpListener::bind(self.addr).await?;

        let handler = Arc::new(handler);
        let executor = self.executor;

        info!(addr = %self.addr, stages = executor.len(), "tollgate listening");

        // Every spawned connection task, so shutdown can wait on them.
        let mut tasks = tokio::task::JoinSet::new();

        tokio::pin!(signal);

        loop {
            tokio::select! {
                // Shutdown first: once signalled, queued connections are not
                // accepted.
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

                    let executor = executor.clone();
                    let handler = Arc::clone(&handler);
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        // Called once per request on the connection.
                        let svc = service_fn(move |req| {
                            let executor = executor.clone();
                            let handler = Arc::clone(&handler);
                            async move { dispatch::<H, R>(executor, handler, req, remote_addr).await }
                        });

                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            error!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                // Reap finished connection tasks so the JoinSet does not grow
                // without bound.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}

        info!("tollgate stopped");
        Ok(())
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Peer address of the connection an exchange arrived on, stored in the
/// exchange's attributes.
#[derive(Clone, Copy, Debug)]
pub struct RemoteAddr(pub SocketAddr);

/// One request through the chain. Every failure becomes a response, so
/// hyper never sees an error.
async fn dispatch<H, R>(
    executor: Executor,
    handler: Arc<H>,
    req: hyper::Request<hyper::body::Incoming>,
    remote_addr: SocketAddr,
) -> Result<http::Response<Full<Bytes>>, Infallible>
where
    H: Handler<R>,
    R: IntoResponse,
{
    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(peer = %remote_addr, "failed to read request body: {e}");
            return Ok(Response::status(http::StatusCode::BAD_REQUEST).into_inner());
        }
    };

    let mut exchange = Exchange::from_parts(parts, body);
    exchange.attributes_mut().insert(RemoteAddr(remote_addr));

    let response = match executor.execute::<R, H>(&mut exchange, handler.as_ref()).await {
        Ok(value) => value.into_response(),
        Err(e) => {
            error!(exchange = exchange.id(), error = %e, "chain failed");
            e.into_response()
        }
    };

    Ok(response.into_inner())
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first SIGTERM or Ctrl-C. On Windows only Ctrl-C exists.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut s) => { s.recv().await; }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c  => {}
        () = sigterm => {}
    }
}
