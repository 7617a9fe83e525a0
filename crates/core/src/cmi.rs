//! Data-model keys used by the host runtime and the local store.

use crate::connection::ProtocolVersion;

/// Local store key holding the stringified location.
pub const BOOKMARK_KEY: &str = "bookmark";

/// Local store key holding the encoded suspend payload.
pub const SUSPEND_DATA_KEY: &str = "suspend_data";

/// Completion status written on restart.
pub const STATUS_INCOMPLETE: &str = "incomplete";

/// Completion status written when the course is finished.
pub const STATUS_COMPLETED: &str = "completed";

/// Host field names for one protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CmiFields {
    /// Bookmark location
    pub location: &'static str,
    /// Suspend payload
    pub suspend_data: &'static str,
    /// Completion status
    pub status: &'static str,
    /// Raw score
    pub score_raw: &'static str,
    /// Score lower bound
    pub score_min: &'static str,
    /// Score upper bound
    pub score_max: &'static str,
    /// Learner display name
    pub learner_name: &'static str,
    /// Learner identifier
    pub learner_id: &'static str,
}

const LEGACY_FIELDS: CmiFields = CmiFields {
    location: "cmi.core.lesson_location",
    suspend_data: "cmi.suspend_data",
    status: "cmi.core.lesson_status",
    score_raw: "cmi.core.score.raw",
    score_min: "cmi.core.score.min",
    score_max: "cmi.core.score.max",
    learner_name: "cmi.core.student_name",
    learner_id: "cmi.core.student_id",
};

const CURRENT_FIELDS: CmiFields = CmiFields {
    location: "cmi.location",
    suspend_data: "cmi.suspend_data",
    status: "cmi.completion_status",
    score_raw: "cmi.score.raw",
    score_min: "cmi.score.min",
    score_max: "cmi.score.max",
    learner_name: "cmi.learner_name",
    learner_id: "cmi.learner_id",
};

impl ProtocolVersion {
    /// Field names for this protocol version.
    pub fn fields(self) -> &'static CmiFields {
        match self {
            ProtocolVersion::Legacy => &LEGACY_FIELDS,
            ProtocolVersion::Current => &CURRENT_FIELDS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespaces_differ_except_suspend_data() {
        let legacy = ProtocolVersion::Legacy.fields();
        let current = ProtocolVersion::Current.fields();

        assert_eq!(legacy.location, "cmi.core.lesson_location");
        assert_eq!(current.location, "cmi.location");
        assert_eq!(legacy.suspend_data, current.suspend_data);
        assert_ne!(legacy.learner_id, current.learner_id);
    }
}
