//! Store configuration.

use coursemark_core::{ConfigureOptions, LEGACY_VERSION};
use serde::{Deserialize, Serialize};

/// Maximum suspend data length the legacy protocol accepts.
pub const LEGACY_SUSPEND_LIMIT: usize = 4096;

/// Configuration for the progress store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Protocol version requested from the host
    pub protocol_version: String,
    /// Ask the host for verbose logging
    pub debug: bool,
    /// Suspend data ceiling under the legacy protocol, in characters
    pub legacy_suspend_limit: usize,
}

impl StoreConfig {
    /// Options handed to the host before initialize.
    pub fn configure_options(&self) -> ConfigureOptions {
        ConfigureOptions {
            version: self.protocol_version.clone(),
            debug: self.debug,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            protocol_version: LEGACY_VERSION.to_string(),
            debug: false,
            legacy_suspend_limit: LEGACY_SUSPEND_LIMIT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: StoreConfig = serde_json::from_str(r#"{"debug":true}"#).unwrap();
        assert!(config.debug);
        assert_eq!(config.protocol_version, "1.2");
        assert_eq!(config.legacy_suspend_limit, LEGACY_SUSPEND_LIMIT);
    }

    #[test]
    fn test_configure_options_mirror_config() {
        let config = StoreConfig {
            protocol_version: "2004".to_string(),
            debug: true,
            ..StoreConfig::default()
        };
        let options = config.configure_options();
        assert_eq!(options.version, "2004");
        assert!(options.debug);
    }
}
