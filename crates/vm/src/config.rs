//! Runner configuration, loadable from TOML.

use std::{fs, io, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse runner config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Maximum instructions a machine may execute in one turn before it is
    /// faulted. `None` means unbounded: a machine runs until it yields.
    pub instruction_budget: Option<u64>,
    /// Stop the whole mission on the first configuration fault. When false,
    /// only the faulting machine halts.
    pub halt_on_fault: bool,
    /// Log each unbound action name once instead of on every call.
    pub warn_unbound_once: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            instruction_budget: None,
            halt_on_fault: true,
            warn_unbound_once: true,
        }
    }
}

impl RunnerConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Load configuration, falling back to defaults on errors.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(err) => {
                warn!("{err}. Using default runner config");
                Self::default()
            }
        }
    }

    pub fn with_instruction_budget(mut self, budget: u64) -> Self {
        self.instruction_budget = Some(budget);
        self
    }

    pub fn with_halt_on_fault(mut self, halt: bool) -> Self {
        self.halt_on_fault = halt;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_unbounded_and_strict() {
        let cfg = RunnerConfig::default();
        assert_eq!(cfg.instruction_budget, None);
        assert!(cfg.halt_on_fault);
        assert!(cfg.warn_unbound_once);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg = RunnerConfig::from_toml_str("instruction_budget = 5000\n").unwrap();
        assert_eq!(cfg.instruction_budget, Some(5000));
        assert!(cfg.halt_on_fault);
    }

    #[test]
    fn parse_error_is_reported() {
        let err = RunnerConfig::from_toml_str("halt_on_fault = \"yes\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runner.toml");
        fs::write(&path, "halt_on_fault = false\nwarn_unbound_once = false\n").unwrap();
        let cfg = RunnerConfig::load(&path).unwrap();
        assert!(!cfg.halt_on_fault);
        assert!(!cfg.warn_unbound_once);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = RunnerConfig::load_or_default(&dir.path().join("absent.toml"));
        assert_eq!(cfg, RunnerConfig::default());
        assert!(matches!(
            RunnerConfig::load(&dir.path().join("absent.toml")),
            Err(ConfigError::Read { .. })
        ));
    }
}
