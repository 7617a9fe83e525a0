//! Connection model - how a session is attached to its host runtime.

use serde::{Deserialize, Serialize};

/// The legacy protocol version string reported by hosts.
pub const LEGACY_VERSION: &str = "1.2";

/// Protocol family spoken by the host runtime.
///
/// Hosts report a free-form version string; only `"1.2"` selects the legacy
/// field namespace, everything else is treated as the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProtocolVersion {
    /// SCORM 1.2 (`cmi.core.*`)
    Legacy,
    /// SCORM 2004 (`cmi.*`)
    Current,
}

impl ProtocolVersion {
    /// Classify a version string reported by a host.
    pub fn from_reported(version: &str) -> Self {
        if version.trim() == LEGACY_VERSION {
            Self::Legacy
        } else {
            Self::Current
        }
    }

    /// Whether the legacy size ceiling on suspend data applies.
    pub fn is_legacy(self) -> bool {
        matches!(self, Self::Legacy)
    }
}

/// Options passed to a backend before it is initialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigureOptions {
    /// Requested protocol version
    pub version: String,

    /// Verbose host-side logging
    pub debug: bool,
}

impl Default for ConfigureOptions {
    fn default() -> Self {
        Self {
            version: LEGACY_VERSION.to_string(),
            debug: false,
        }
    }
}

/// Result of initializing a backend.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InitResult {
    /// Whether the session was established
    pub success: bool,

    /// Version string reported by the backend (may be empty)
    #[serde(default)]
    pub version: String,
}

impl InitResult {
    /// A successful initialization reporting `version`.
    pub fn connected(version: impl Into<String>) -> Self {
        Self {
            success: true,
            version: version.into(),
        }
    }

    /// A failed initialization.
    pub fn failed() -> Self {
        Self::default()
    }
}

/// Lifecycle phase of the host connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionPhase {
    /// No connect attempted yet
    Disconnected,
    /// Initialize in flight
    Connecting,
    /// Host session open
    Connected,
    /// Host unavailable; local store for the rest of the session
    ConnectFailed,
    /// Host session ended
    Terminated,
}

/// Connection state of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionState {
    /// Current phase
    pub phase: ConnectionPhase,

    /// What the host reported on initialize
    pub init: InitResult,
}

impl ConnectionState {
    /// Whether the host runtime is the active backend.
    pub fn connected(&self) -> bool {
        self.phase == ConnectionPhase::Connected
    }

    /// Whether a connect attempt has already been made this session.
    pub fn attempted(&self) -> bool {
        self.phase != ConnectionPhase::Disconnected
    }

    /// Whether the host reported a successful initialize.
    pub fn initialized(&self) -> bool {
        self.init.success
    }

    /// Version string the host reported.
    pub fn protocol_version(&self) -> &str {
        &self.init.version
    }

    /// Parsed protocol family.
    pub fn protocol(&self) -> ProtocolVersion {
        ProtocolVersion::from_reported(&self.init.version)
    }
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self {
            phase: ConnectionPhase::Disconnected,
            init: InitResult::default(),
        }
    }
}
