//! Failure kinds of the bootstrap gate chain.
//!
//! Every variant is fatal. The message is a single line naming the gate that
//! failed; captured tool output travels separately in `diagnostics`.

use std::path::PathBuf;

use thiserror::Error;

use crate::core::gate::Gate;

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("{interpreter} not found on PATH: {reason}")]
    InterpreterNotFound { interpreter: String, reason: String },

    #[error("Python {required} or newer is required, but found Python {found}")]
    VersionTooLow { required: String, found: String },

    #[error("failed to create virtual environment at {}: {reason}", .env_dir.display())]
    EnvironmentCreationFailed {
        env_dir: PathBuf,
        reason: String,
        diagnostics: String,
    },

    #[error("failed to upgrade pip in the virtual environment: {reason}")]
    InstallerUpgradeFailed { reason: String, diagnostics: String },

    #[error("{} not found; cannot install dependencies", .manifest.display())]
    ManifestNotFound { manifest: PathBuf },

    #[error("failed to install dependencies from {}: {reason}", .manifest.display())]
    DependencyInstallFailed {
        manifest: PathBuf,
        reason: String,
        diagnostics: String,
    },
}

impl BootstrapError {
    /// The gate that produced this failure.
    pub fn gate(&self) -> Gate {
        match self {
            BootstrapError::InterpreterNotFound { .. } => Gate::InterpreterPresence,
            BootstrapError::VersionTooLow { .. } => Gate::VersionCheck,
            BootstrapError::EnvironmentCreationFailed { .. } => Gate::CreateEnvironment,
            BootstrapError::InstallerUpgradeFailed { .. } => Gate::UpgradeInstaller,
            BootstrapError::ManifestNotFound { .. } => Gate::ManifestPresence,
            BootstrapError::DependencyInstallFailed { .. } => Gate::InstallDependencies,
        }
    }

    /// Output captured from the failing tool, verbatim. Empty for checks that
    /// do not run a tool.
    pub fn diagnostics(&self) -> &str {
        match self {
            BootstrapError::EnvironmentCreationFailed { diagnostics, .. }
            | BootstrapError::InstallerUpgradeFailed { diagnostics, .. }
            | BootstrapError::DependencyInstallFailed { diagnostics, .. } => diagnostics,
            _ => "",
        }
    }
}
