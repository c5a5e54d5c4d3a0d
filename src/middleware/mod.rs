//! Built-in filter stages.
//!
//! Register these like any other [`Filter`](crate::Filter):
//!
//! - [`log::LogFilter`] logs one line on the way in and one on the way out
//! - [`trace::TraceFilter`] hands a finished [`trace::HttpTrace`] record to a
//!   [`trace::TraceSink`] of your choosing

pub mod log;
pub mod trace;
