//! Filter registration.
//!
//! Build the registry once at startup, then hand it to
//! [`Executor::new`](crate::Executor::new) or
//! [`Server::filters`](crate::Server::filters). Nothing is global: two
//! registries are two independent chains.

use std::sync::Arc;

use tracing::debug;

use crate::filter::Filter;

pub(crate) struct Entry {
    pub(crate) priority: i32,
    pub(crate) filter: Arc<dyn Filter>,
}

/// Ordered set of filter stages.
///
/// Lower priorities run first on the way in and last on the way out. Equal
/// priorities keep registration order.
#[derive(Default)]
pub struct FilterRegistry {
    entries: Vec<Entry>,
}

impl FilterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `filter` at `priority`. Always succeeds.
    pub fn register(&mut self, filter: impl Filter, priority: i32) -> &mut Self {
        // After every entry with priority <= ours, so ties stay in
        // registration order.
        let at = self.entries.partition_point(|e| e.priority <= priority);
        debug!(stage = filter.name(), priority, position = at, "filter registered");
        self.entries.insert(at, Entry { priority, filter: Arc::new(filter) });
        self
    }

    /// Chaining form of [`register`](FilterRegistry::register).
    ///
    /// ```rust
    /// use tollgate::{FilterRegistry, middleware::log::LogFilter};
    ///
    /// let filters = FilterRegistry::new()
    ///     .with(LogFilter::new("outer"), 1)
    ///     .with(LogFilter::new("inner"), 2);
    /// assert_eq!(filters.names(), ["outer", "inner"]);
    /// ```
    pub fn with(mut self, filter: impl Filter, priority: i32) -> Self {
        self.register(filter, priority);
        self
    }

    pub fn len(&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    /// Stage names in execution order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.filter.name()).collect()
    }

    pub(crate) fn into_entries(self) -> Vec<Entry> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::stage;

    #[test]
    fn orders_by_priority() {
        let filters = FilterRegistry::new()
            .with(stage("c"), 30)
            .with(stage("a"), -5)
            .with(stage("b"), 7);
        assert_eq!(filters.names(), ["a", "b", "c"]);
    }

    #[test]
    fn ties_keep_registration_order() {
        let mut filters = FilterRegistry::new();
        filters
            .register(stage("first"), 5)
            .register(stage("low"), 1)
            .register(stage("second"), 5)
            .register(stage("third"), 5);
        assert_eq!(filters.names(), ["low", "first", "second", "third"]);
    }

    #[test]
    fn empty_registry() {
        let filters = FilterRegistry::new();
        assert!(filters.is_empty());
        assert_eq!(filters.len(), 0);
    }
}
