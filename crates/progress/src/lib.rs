//! Progress persistence.
//!
//! The session progress store, its route adapter and the language hook.

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod language;
pub mod store;
pub mod tracker;

pub use config::{StoreConfig, LEGACY_SUSPEND_LIMIT};
pub use error::{ProgressError, Result};
pub use language::{LanguagePreference, LanguageRequest, LoadOptions};
pub use store::{Active, ConnectOutcome, ProgressStore, SharedProgressStore};
pub use tracker::{NavigateOutcome, RouteTracker};
