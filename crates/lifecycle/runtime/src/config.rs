//! Runtime configuration
//!
//! Layered like any other service config: built-in defaults, then an
//! optional file, then `LIFECYCLE_*` environment variables
//! (`LIFECYCLE_DISPATCH__MAX_ATTEMPTS=5`).

use crate::error::RuntimeResult;
use lifecycle_workflows::{DeliverableContext, DEFAULT_MAX_REVISIONS};
use serde::{Deserialize, Serialize};

/// Top-level runtime configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Dispatch loop settings
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Defaults for new deliverables
    #[serde(default)]
    pub deliverable: DeliverableDefaults,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Dispatch loop settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Load-compute-commit attempts before giving up on a contended instance
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
        }
    }
}

/// Defaults applied when a deliverable is created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliverableDefaults {
    /// Revision rounds included before scope must be renegotiated
    #[serde(default = "default_max_revisions")]
    pub default_max_revisions: u32,
}

impl Default for DeliverableDefaults {
    fn default() -> Self {
        Self {
            default_max_revisions: default_max_revisions(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Default value helpers
fn default_max_attempts() -> u32 {
    3
}

fn default_max_revisions() -> u32 {
    DEFAULT_MAX_REVISIONS
}

fn default_log_level() -> String {
    "info".to_string()
}

impl RuntimeConfig {
    /// Load configuration from defaults, an optional file and the environment
    pub fn load(path: Option<&str>) -> RuntimeResult<Self> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&RuntimeConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("LIFECYCLE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        Ok(builder.build()?.try_deserialize()?)
    }

    /// A fresh deliverable context with the configured revision allowance
    pub fn new_deliverable_context(&self) -> DeliverableContext {
        DeliverableContext::new().with_max_revisions(self.deliverable.default_max_revisions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = RuntimeConfig::default();
        assert_eq!(config.dispatch.max_attempts, 3);
        assert_eq!(config.deliverable.default_max_revisions, 2);
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[dispatch]\nmax_attempts = 7\n\n[deliverable]\ndefault_max_revisions = 4\n"
        )
        .unwrap();

        let config = RuntimeConfig::load(file.path().to_str()).unwrap();
        assert_eq!(config.dispatch.max_attempts, 7);
        assert_eq!(config.deliverable.default_max_revisions, 4);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.new_deliverable_context().max_revisions, 4);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = RuntimeConfig::load(Some("/nonexistent/lifecycle")).unwrap();
        assert_eq!(config.dispatch.max_attempts, 3);
    }
}
