//! Backend trait abstraction.

use async_trait::async_trait;
use coursemark_core::{ConfigureOptions, InitResult};

/// Error type for backend operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Errors that can occur during backend operations.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP transport error
    #[cfg(feature = "http")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The host answered with an error status
    #[error("host rejected request ({status}): {message}")]
    Host {
        /// HTTP status code
        status: u16,
        /// Body returned by the host
        message: String,
    },

    /// Data access before a successful initialize
    #[error("backend not initialized")]
    NotInitialized,

    /// The host session has ended
    #[error("backend session terminated")]
    Terminated,
}

/// Which side of the persistence split a backend lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// The learning-management system's runtime
    Host,
    /// Process-local durable fallback
    Local,
}

/// Key/value capability shared by the host runtime and the local store.
///
/// The progress store talks to both variants through this trait and never
/// inspects which one it holds beyond [`Backend::kind`].
#[async_trait]
pub trait Backend: Send + Sync {
    /// Which variant this is.
    fn kind(&self) -> BackendKind;

    /// Apply options before [`Backend::initialize`].
    async fn configure(&mut self, options: &ConfigureOptions) -> Result<()>;

    /// Open the session.
    async fn initialize(&mut self) -> Result<InitResult>;

    /// Close the session.
    async fn terminate(&mut self) -> Result<()>;

    /// Read a value. `None` when the key has never been written.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value.
    async fn set(&mut self, key: &str, value: &str) -> Result<()>;

    /// Remove a value. Backends without deletion store an empty value.
    async fn remove(&mut self, key: &str) -> Result<()> {
        self.set(key, "").await
    }

    /// Make pending writes durable on the backend side.
    async fn commit(&mut self) -> Result<()>;
}
