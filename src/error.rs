//! Unified error type.
//!
//! A chain run reports exactly one primary error: the first failure seen on
//! the way in, or the first post-action failure when everything before it
//! succeeded. Failures that happen later, while the chain unwinds, are kept
//! on the primary as [`Error::suppressed`] entries.

use std::fmt;

/// Boxed error returned by filter actions and terminal handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Which half of a filter stage failed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Phase {
    Pre,
    Post,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pre  => "pre",
            Self::Post => "post",
        })
    }
}

/// What went wrong.
#[derive(Debug)]
pub enum ErrorKind {
    /// A filter's pre- or post-action failed.
    Stage { stage: String, phase: Phase, source: BoxError },
    /// The terminal handler failed.
    Handler(BoxError),
    /// The request was cancelled before the terminal handler settled.
    Aborted,
    /// Binding the listener failed.
    Io(std::io::Error),
}

/// The error type returned by tollgate's fallible operations.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    suppressed: Vec<Error>,
}

impl Error {
    pub(crate) fn stage(stage: &str, phase: Phase, source: BoxError) -> Self {
        Self::from_kind(ErrorKind::Stage { stage: stage.to_owned(), phase, source })
    }

    pub(crate) fn handler(source: BoxError) -> Self {
        Self::from_kind(ErrorKind::Handler(source))
    }

    pub(crate) fn aborted() -> Self {
        Self::from_kind(ErrorKind::Aborted)
    }

    fn from_kind(kind: ErrorKind) -> Self {
        Self { kind, suppressed: Vec::new() }
    }

    pub fn kind(&self) -> &ErrorKind { &self.kind }

    /// Errors raised while unwinding, after this one was already recorded.
    pub fn suppressed(&self) -> &[Error] { &self.suppressed }

    pub fn is_stage(&self) -> bool { matches!(self.kind, ErrorKind::Stage { .. }) }
    pub fn is_handler(&self) -> bool { matches!(self.kind, ErrorKind::Handler(_)) }
    pub fn is_aborted(&self) -> bool { matches!(self.kind, ErrorKind::Aborted) }

    pub(crate) fn suppress_all(&mut self, others: impl IntoIterator<Item = Error>) {
        self.suppressed.extend(others);
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ErrorKind::Stage { stage, phase, source } => {
                write!(f, "stage `{stage}` failed in {phase}: {source}")?;
            }
            ErrorKind::Handler(source) => write!(f, "handler: {source}")?,
            ErrorKind::Aborted => f.write_str("chain aborted")?,
            ErrorKind::Io(e) => write!(f, "io: {e}")?,
        }
        if !self.suppressed.is_empty() {
            write!(f, " ({} suppressed)", self.suppressed.len())?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            ErrorKind::Stage { source, .. } | ErrorKind::Handler(source) => Some(source.as_ref()),
            ErrorKind::Io(e) => Some(e),
            ErrorKind::Aborted => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::from_kind(ErrorKind::Io(e))
    }
}
