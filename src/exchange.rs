//! Per-request context threaded through the filter chain.

use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use http::{Extensions, Method};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// One request's worth of mutable state.
///
/// The executor borrows the exchange exclusively for the whole run, so
/// filters see it one at a time and none of them can keep hold of it.
/// Request data is read-only; per-request values that stages want to hand
/// to each other go into [`attributes`](Exchange::attributes_mut), a typed
/// map keyed by the value's type.
pub struct Exchange {
    id: u64,
    method: Method,
    path: String,
    query: Option<String>,
    headers: Vec<(String, String)>,
    body: Bytes,
    attributes: Extensions,
}

impl Exchange {
    /// A bodiless exchange for `method` + `path`.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            method,
            path: path.into(),
            query: None,
            headers: Vec::new(),
            body: Bytes::new(),
            attributes: Extensions::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Builds an exchange from a decoded hyper request. Header values that
    /// are not visible ASCII are skipped.
    pub(crate) fn from_parts(parts: http::request::Parts, body: Bytes) -> Self {
        let headers = parts.headers.iter()
            .filter_map(|(k, v)| Some((k.as_str().to_owned(), v.to_str().ok()?.to_owned())))
            .collect();

        let mut exchange = Self::new(parts.method, parts.uri.path());
        exchange.query = parts.uri.query().map(str::to_owned);
        exchange.headers = headers;
        exchange.body = body;
        exchange
    }

    /// Process-unique id, used to correlate log lines of one request.
    pub fn id(&self) -> u64 { self.id }
    pub fn method(&self) -> &Method { &self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn query(&self) -> Option<&str> { self.query.as_deref() }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }
    pub fn body(&self) -> &Bytes { &self.body }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn attributes(&self) -> &Extensions { &self.attributes }
    pub fn attributes_mut(&mut self) -> &mut Extensions { &mut self.attributes }
}
