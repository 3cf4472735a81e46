//! Error carrier for the clustering engine.
//!
//! Every fallible operation in this crate returns [`Result`]. An [`Error`]
//! carries a machine-readable [`ErrorKind`], an optional free-form message,
//! and the source location where it was raised. The first failure propagates
//! unchanged through `?`; no operation retries internally except the
//! arc-storage shrink protocol in the digraph algebra, which is transparent
//! to callers.

use std::collections::TryReserveError;
use std::fmt;
use std::panic::Location;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Machine-readable failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ErrorKind {
    /// A caller-supplied argument violated a documented precondition.
    #[error("invalid input")]
    InvalidInput,

    /// An allocation request could not be satisfied.
    #[error("out of memory")]
    NoMemory,

    /// The problem is infeasible under the given constraints.
    #[error("no solution")]
    NoSolution,

    /// The problem exceeds the capacity of the cluster-label type.
    #[error("problem too large")]
    TooLargeProblem,

    /// The digraph exceeds the capacity of the arc-index type.
    #[error("digraph too large")]
    TooLargeDigraph,

    /// The nearest-neighbor search oracle reported a failure.
    #[error("distance search failed")]
    DistSearch,

    /// The requested code path is not implemented.
    #[error("not implemented")]
    NotImplemented,

    /// Safety net for failures with no better classification.
    #[error("unknown error")]
    Unknown,
}

/// An error raised by the clustering engine.
///
/// Formats as `kind (file:line)` or `kind (file:line): message`.
#[derive(Debug, Clone)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    location: &'static Location<'static>,
}

impl Error {
    /// Create an error of the given kind, capturing the caller's location.
    #[track_caller]
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind, message: None, location: Location::caller() }
    }

    /// Create an error of the given kind with a diagnostic message.
    #[track_caller]
    #[must_use]
    pub fn with_message(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: Some(message.into()), location: Location::caller() }
    }

    #[track_caller]
    pub(crate) fn invalid_input(message: impl Into<String>) -> Self {
        Self::with_message(ErrorKind::InvalidInput, message)
    }

    #[track_caller]
    pub(crate) fn no_solution(message: impl Into<String>) -> Self {
        Self::with_message(ErrorKind::NoSolution, message)
    }

    #[track_caller]
    pub(crate) fn too_large_problem() -> Self {
        Self::new(ErrorKind::TooLargeProblem)
    }

    #[track_caller]
    pub(crate) fn too_large_digraph() -> Self {
        Self::new(ErrorKind::TooLargeDigraph)
    }

    #[track_caller]
    pub(crate) fn dist_search(message: impl Into<String>) -> Self {
        Self::with_message(ErrorKind::DistSearch, message)
    }

    /// The failure category.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The diagnostic message, if one was attached.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// The source location where the error was raised.
    #[must_use]
    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }
}

/// A failed reservation is the engine's out-of-memory signal; the two-pass
/// shrink protocol in the digraph algebra leans on this being recoverable.
impl From<TryReserveError> for Error {
    fn from(_: TryReserveError) -> Self {
        Self::new(ErrorKind::NoMemory)
    }
}

/// Allocate a `len`-element vector filled with `value`, reporting failure
/// as [`ErrorKind::NoMemory`].
pub(crate) fn try_filled<T: Clone>(len: usize, value: T) -> Result<Vec<T>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)?;
    buf.resize(len, value);
    Ok(buf)
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}:{})", self.kind, self.location.file(), self.location.line())?;
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {}
