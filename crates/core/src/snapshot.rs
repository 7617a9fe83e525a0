//! Read-only progress view for UI collaborators.

use serde::{Deserialize, Serialize};

use crate::id::SessionId;
use crate::Time;

/// A snapshot of a session's progress at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    /// Session the snapshot belongs to
    pub session: SessionId,

    /// When snapshot was taken
    pub timestamp: Time,

    /// Furthest location reached, if known
    pub location: Option<u32>,

    /// Hydration found prior progress
    pub resume_available: bool,

    /// The learner chose resume or restart
    pub resume_decision_made: bool,

    /// Host runtime is the active backend
    pub connected: bool,

    /// Version reported by the host (empty when standalone)
    pub protocol_version: String,
}

impl ProgressSnapshot {
    /// Whether the resume prompt should be shown.
    pub fn should_prompt(&self) -> bool {
        self.resume_available && !self.resume_decision_made
    }
}
