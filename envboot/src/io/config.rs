//! Bootstrap configuration, optionally overridden by `envboot.toml`.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::version::Version;

/// Config file looked up in the invocation directory.
pub const CONFIG_FILE: &str = "envboot.toml";

/// Bootstrap configuration (TOML).
///
/// Every field has a default, so a missing file or a partial file is fine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Interpreter executable resolved on `PATH`.
    pub interpreter: String,

    /// Minimum accepted interpreter version, dotted (e.g. `3.9`).
    pub min_version: String,

    /// Environment directory, relative to the invocation directory.
    pub env_dir: String,

    /// Dependency manifest, relative to the invocation directory.
    pub manifest: String,

    /// Echo child tool output to stderr while it runs.
    pub echo_tool_output: bool,

    /// Keep at most this many bytes of each child stream in memory.
    pub output_limit_bytes: usize,

    pub timeouts: TimeoutConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TimeoutConfig {
    pub version_query_secs: u64,
    pub create_env_secs: u64,
    /// Applies to each pip invocation separately.
    pub install_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            version_query_secs: 30,
            create_env_secs: 10 * 60,
            install_secs: 30 * 60,
        }
    }
}

impl TimeoutConfig {
    pub fn version_query(&self) -> Duration {
        Duration::from_secs(self.version_query_secs)
    }

    pub fn create_env(&self) -> Duration {
        Duration::from_secs(self.create_env_secs)
    }

    pub fn install(&self) -> Duration {
        Duration::from_secs(self.install_secs)
    }
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            interpreter: "python3".to_string(),
            min_version: "3.9".to_string(),
            env_dir: "venv".to_string(),
            manifest: "requirements.txt".to_string(),
            echo_tool_output: true,
            output_limit_bytes: 1_000_000,
            timeouts: TimeoutConfig::default(),
        }
    }
}

impl BootstrapConfig {
    pub fn validate(&self) -> Result<()> {
        if self.interpreter.trim().is_empty() {
            return Err(anyhow!("interpreter must be non-empty"));
        }
        Version::parse(&self.min_version)
            .with_context(|| format!("min_version {:?} is not a dotted version", self.min_version))?;
        if self.env_dir.trim().is_empty() {
            return Err(anyhow!("env_dir must be non-empty"));
        }
        if self.manifest.trim().is_empty() {
            return Err(anyhow!("manifest must be non-empty"));
        }
        if self.output_limit_bytes == 0 {
            return Err(anyhow!("output_limit_bytes must be > 0"));
        }
        if self.timeouts.version_query_secs == 0
            || self.timeouts.create_env_secs == 0
            || self.timeouts.install_secs == 0
        {
            return Err(anyhow!("timeouts must be > 0"));
        }
        Ok(())
    }

    /// Parsed `min_version`. Call after `validate`.
    pub fn min_version(&self) -> Result<Version> {
        Version::parse(&self.min_version)
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `BootstrapConfig::default()`.
pub fn load_config(path: &Path) -> Result<BootstrapConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "no config file, using defaults");
        let cfg = BootstrapConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: BootstrapConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid {}", path.display()))?;
    Ok(cfg)
}
