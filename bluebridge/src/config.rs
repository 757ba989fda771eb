//! Configuration types for the bluebridge crate
//!
//! Controls registry capacity and the command concurrency policy of a
//! [`Bridge`](crate::Bridge).

use crate::error::{BridgeError, Result};

/// Configuration for the Bridge
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Name of the host channel the bridge is wired to; informational,
    /// surfaced in logs
    /// Default: "bluebreeze"
    pub channel_name: String,

    /// Maximum number of live observations (manager, devices, services and
    /// characteristics together)
    /// Default: 4096
    pub max_observations: usize,

    /// Refuse a mutating command while an identical one is still outstanding
    /// for the same entity. Disable only for drivers that tolerate
    /// concurrent calls.
    /// Default: true
    pub serialize_mutations: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            channel_name: "bluebreeze".to_string(),
            max_observations: 4096,
            serialize_mutations: true,
        }
    }
}

impl BridgeConfig {
    /// Create a new BridgeConfig with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a BridgeConfig for drivers that accept concurrent identical calls
    pub fn concurrent_driver() -> Self {
        Self {
            serialize_mutations: false,
            ..Default::default()
        }
    }

    /// Validate the configuration and return any issues
    pub fn validate(&self) -> Result<()> {
        if self.channel_name.trim().is_empty() {
            return Err(BridgeError::Configuration(
                "Channel name must not be empty".to_string(),
            ));
        }

        if self.max_observations == 0 {
            return Err(BridgeError::Configuration(
                "Max observations must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn with_channel_name(mut self, name: impl Into<String>) -> Self {
        self.channel_name = name.into();
        self
    }

    pub fn with_max_observations(mut self, max: usize) -> Self {
        self.max_observations = max;
        self
    }

    pub fn with_serialize_mutations(mut self, enabled: bool) -> Self {
        self.serialize_mutations = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BridgeConfig::default();
        assert_eq!(config.channel_name, "bluebreeze");
        assert_eq!(config.max_observations, 4096);
        assert!(config.serialize_mutations);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let invalid = BridgeConfig::new().with_max_observations(0);
        assert!(matches!(invalid.validate(), Err(BridgeError::Configuration(_))));

        let invalid = BridgeConfig::new().with_channel_name("  ");
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn test_presets_and_builder() {
        let concurrent = BridgeConfig::concurrent_driver();
        assert!(!concurrent.serialize_mutations);
        assert!(concurrent.validate().is_ok());

        let config = BridgeConfig::new()
            .with_channel_name("ble")
            .with_max_observations(16)
            .with_serialize_mutations(false);
        assert_eq!(config.channel_name, "ble");
        assert_eq!(config.max_observations, 16);
        assert!(!config.serialize_mutations);
    }
}
