//! Configuration loading and typed config structures for the BioSim engine.
//!
//! The host binary reads `biosim-config.yaml` (or the path in
//! `BIOSIM_CONFIG`). This module defines strongly-typed structs that mirror
//! the YAML structure and provides loaders for files and strings. Every field
//! has a default, so an empty document is a valid configuration.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::playback::PlaybackSettings;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// An environment override could not be parsed.
    #[error("invalid value {value:?} for {variable}")]
    InvalidOverride {
        /// The environment variable name.
        variable: &'static str,
        /// The rejected value.
        value: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level engine configuration.
///
/// Mirrors the structure of `biosim-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BiosimConfig {
    /// Driver tuning (time scale, dwell floor, seed).
    #[serde(default)]
    pub playback: PlaybackSettings,

    /// Which topic to play and for how long.
    #[serde(default)]
    pub session: SessionConfig,

    /// Log level and output format.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl BiosimConfig {
    /// Load configuration from a YAML file, then apply environment
    /// overrides from the process environment.
    ///
    /// - `BIOSIM_TOPIC` overrides `session.topic`
    /// - `BIOSIM_SEED` overrides `playback.seed`
    /// - `BIOSIM_TIME_SCALE` overrides `playback.time_scale`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::InvalidOverride`] for an unparsable override.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string. No overrides are applied.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes to unit, not to a mapping.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Apply overrides from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOverride`] for an unparsable value.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_env_overrides_with(|key| std::env::var(key).ok())
    }

    /// Apply overrides read through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOverride`] for an unparsable value.
    pub fn apply_env_overrides_with<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("BIOSIM_TOPIC") {
            self.session.topic = val;
        }
        if let Some(val) = lookup("BIOSIM_SEED") {
            let seed = val.trim().parse().map_err(|_err| ConfigError::InvalidOverride {
                variable: "BIOSIM_SEED",
                value: val.clone(),
            })?;
            self.playback.seed = Some(seed);
        }
        if let Some(val) = lookup("BIOSIM_TIME_SCALE") {
            let scale = val.trim().parse().map_err(|_err| ConfigError::InvalidOverride {
                variable: "BIOSIM_TIME_SCALE",
                value: val.clone(),
            })?;
            self.playback.time_scale = scale;
        }
        Ok(())
    }
}

/// Session configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionConfig {
    /// Identifier of the built-in topic to play.
    #[serde(default = "default_topic")]
    pub topic: String,

    /// Seconds to run before stopping (0 = until interrupted).
    #[serde(default = "default_run_seconds")]
    pub run_seconds: u64,

    /// Optional catalog YAML describing chapters and simulations.
    #[serde(default)]
    pub catalog: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            topic: default_topic(),
            run_seconds: default_run_seconds(),
            catalog: None,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level used when `RUST_LOG` is unset (trace, debug, info, warn,
    /// error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions for serde
// ---------------------------------------------------------------------------

fn default_topic() -> String {
    "cell-division".to_owned()
}

const fn default_run_seconds() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = BiosimConfig::default();
        assert_eq!(config.session.topic, "cell-division");
        assert_eq!(config.session.run_seconds, 30);
        assert_eq!(config.playback.time_scale, 1.0);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert!(config.playback.validate().is_ok());
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r#"
playback:
  time_scale: 0.25
  min_dwell_ms: 5
  seed: 42

session:
  topic: "asexual-reproduction"
  run_seconds: 0
  catalog: "catalog.yaml"

logging:
  level: "debug"
  format: json
"#;
        let config = BiosimConfig::parse(yaml).unwrap();
        assert_eq!(config.playback.time_scale, 0.25);
        assert_eq!(config.playback.min_dwell_ms, 5);
        assert_eq!(config.playback.seed, Some(42));
        assert_eq!(config.session.topic, "asexual-reproduction");
        assert_eq!(config.session.run_seconds, 0);
        assert_eq!(config.session.catalog, Some(PathBuf::from("catalog.yaml")));
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn parse_partial_yaml_uses_defaults() {
        let config = BiosimConfig::parse("session:\n  topic: heart-circulation\n").unwrap();
        assert_eq!(config.session.topic, "heart-circulation");
        assert_eq!(config.session.run_seconds, 30);
        assert_eq!(config.playback, PlaybackSettings::default());
    }

    #[test]
    fn empty_document_is_default() {
        assert_eq!(BiosimConfig::parse("").unwrap(), BiosimConfig::default());
    }

    #[test]
    fn invalid_yaml_is_rejected() {
        assert!(matches!(
            BiosimConfig::parse("playback: [unclosed"),
            Err(ConfigError::Yaml { .. })
        ));
    }

    #[test]
    fn env_overrides_apply() {
        let env: BTreeMap<&str, &str> = [
            ("BIOSIM_TOPIC", "food-chains"),
            ("BIOSIM_SEED", "7"),
            ("BIOSIM_TIME_SCALE", "0.5"),
        ]
        .into_iter()
        .collect();
        let mut config = BiosimConfig::default();
        config
            .apply_env_overrides_with(|key| env.get(key).map(|v| (*v).to_owned()))
            .unwrap();
        assert_eq!(config.session.topic, "food-chains");
        assert_eq!(config.playback.seed, Some(7));
        assert_eq!(config.playback.time_scale, 0.5);
    }

    #[test]
    fn bad_override_is_reported() {
        let mut config = BiosimConfig::default();
        let err = config
            .apply_env_overrides_with(|key| (key == "BIOSIM_SEED").then(|| "abc".to_owned()))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidOverride {
                variable: "BIOSIM_SEED",
                ..
            }
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = BiosimConfig::from_file(Path::new("/nonexistent/biosim-config.yaml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
