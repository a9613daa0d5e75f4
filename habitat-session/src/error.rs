//! Error types for the session layer.

use thiserror::Error;

/// Result type for session handle calls.
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors returned by [`crate::SessionHandle`].
///
/// Store and validation failures are not here: they are data, reported in
/// [`crate::HierarchySnapshot::last_error`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The session task has stopped.
    #[error("session closed")]
    Closed,
}
