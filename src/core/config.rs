//! Top-level world configuration, loadable from JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::Result;
use crate::streaming::StreamingConfig;
use crate::terrain::GeneratorConfig;

/// Everything needed to create a world.
///
/// `generator: None` creates a pure sandbox: requested sectors are registered
/// empty and the player is held up by a virtual floor.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub generator: Option<GeneratorConfig>,
    pub streaming: StreamingConfig,
}

impl WorldConfig {
    /// Config for a generated world with default streaming.
    pub fn generated(generator: GeneratorConfig) -> Self {
        Self {
            generator: Some(generator),
            streaming: StreamingConfig::default(),
        }
    }

    /// Config for a world without terrain generation.
    pub fn sandbox() -> Self {
        Self::default()
    }

    /// Parse and validate a JSON config.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(generator) = &self.generator {
            generator.validate()?;
        }
        self.streaming.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Error;
    use crate::streaming::DistanceMetric;

    #[test]
    fn test_default_is_sandbox() {
        let config = WorldConfig::default();
        assert!(config.generator.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{
            "generator": { "seed": 42, "hills_enabled": false },
            "streaming": { "metric": "spherical" }
        }"#;
        let config = WorldConfig::from_json_str(json).unwrap();
        let generator = config.generator.unwrap();
        assert_eq!(generator.seed, 42);
        assert!(!generator.hills_enabled);
        assert_eq!(generator.ground_level, GeneratorConfig::default().ground_level);
        assert_eq!(config.streaming.metric, DistanceMetric::Spherical);
        assert_eq!(config.streaming.queue_budget, StreamingConfig::default().queue_budget);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let json = r#"{ "generator": { "cloudiness": 3.0 } }"#;
        let err = WorldConfig::from_json_str(json).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_malformed_json_rejected() {
        let err = WorldConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_json_roundtrip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("world.json");
        let config = WorldConfig::generated(GeneratorConfig {
            seed: 7,
            ..Default::default()
        });
        std::fs::write(&path, config.to_json_pretty().unwrap()).unwrap();

        let loaded = WorldConfig::from_json_file(&path).unwrap();
        assert_eq!(loaded.generator, config.generator);
    }
}
