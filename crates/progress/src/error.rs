//! Errors surfaced by the progress store.

use coursemark_storage::BackendError;

/// Result type for store actions.
pub type Result<T> = std::result::Result<T, ProgressError>;

/// Errors that escape store actions.
///
/// Connect failures, malformed stored payloads and reads while disconnected
/// are recovered inside the store and only logged.
#[derive(Debug, thiserror::Error)]
pub enum ProgressError {
    /// Suspend data would exceed the host's field limit.
    #[error("suspend data is {len} characters, the legacy protocol allows {limit}")]
    PayloadTooLarge {
        /// Encoded length
        len: usize,
        /// Allowed length
        limit: usize,
    },

    /// A backend write failed.
    #[error(transparent)]
    Backend(#[from] BackendError),
}
