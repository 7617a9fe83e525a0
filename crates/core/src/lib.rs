//! coursemark core data models.
//!
//! This crate defines the data structures shared by the storage backends and
//! the progress store: connection state, host field namespaces, the suspend
//! payload codec and the course route map.

#![warn(missing_docs)]

// Identities
mod id;

// Host connection
mod connection;
mod cmi;

// Course progress
mod course;
mod snapshot;
pub mod suspend;

// Re-exports
pub use id::SessionId;

pub use connection::{
    ConfigureOptions, ConnectionPhase, ConnectionState, InitResult, ProtocolVersion,
    LEGACY_VERSION,
};
pub use cmi::{CmiFields, BOOKMARK_KEY, STATUS_COMPLETED, STATUS_INCOMPLETE, SUSPEND_DATA_KEY};

pub use course::{normalize_route, CourseMap, CourseMapError};
pub use snapshot::ProgressSnapshot;
pub use suspend::{CodecError, SuspendPatch, SuspendPayload, SCHEMA_VERSION};

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;
