//! Persistence backends for coursemark.
//!
//! This crate provides the key/value capability trait the progress store
//! talks to, a durable local implementation and host runtime adapters.

#![warn(missing_docs)]

pub mod trait_;
pub mod local_store;
pub mod memory_host;
#[cfg(feature = "http")]
pub mod http_host;

pub use trait_::{Backend, BackendError, BackendKind, Result};
pub use local_store::LocalStore;
pub use memory_host::MemoryHost;
#[cfg(feature = "http")]
pub use http_host::HttpHost;
