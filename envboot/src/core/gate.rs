//! The ordered bootstrap gates.

use std::fmt;

/// One step of the bootstrap sequence. Gates run in declaration order and
/// any failure stops the sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Gate {
    InterpreterPresence,
    VersionCheck,
    CreateEnvironment,
    ActivateEnvironment,
    UpgradeInstaller,
    ManifestPresence,
    InstallDependencies,
    CompletionReport,
}

impl Gate {
    pub const ALL: [Gate; 8] = [
        Gate::InterpreterPresence,
        Gate::VersionCheck,
        Gate::CreateEnvironment,
        Gate::ActivateEnvironment,
        Gate::UpgradeInstaller,
        Gate::ManifestPresence,
        Gate::InstallDependencies,
        Gate::CompletionReport,
    ];

    /// Status line printed before the gate runs.
    pub fn status_line(self) -> &'static str {
        match self {
            Gate::InterpreterPresence => "Checking for a Python interpreter...",
            Gate::VersionCheck => "Checking Python version...",
            Gate::CreateEnvironment => "Creating virtual environment...",
            Gate::ActivateEnvironment => "Activating virtual environment...",
            Gate::UpgradeInstaller => "Upgrading pip...",
            Gate::ManifestPresence => "Checking for requirements file...",
            Gate::InstallDependencies => "Installing dependencies...",
            Gate::CompletionReport => "Finishing up...",
        }
    }

    /// Stable snake_case name used in tracing fields.
    pub fn name(self) -> &'static str {
        match self {
            Gate::InterpreterPresence => "interpreter_presence",
            Gate::VersionCheck => "version_check",
            Gate::CreateEnvironment => "create_environment",
            Gate::ActivateEnvironment => "activate_environment",
            Gate::UpgradeInstaller => "upgrade_installer",
            Gate::ManifestPresence => "manifest_presence",
            Gate::InstallDependencies => "install_dependencies",
            Gate::CompletionReport => "completion_report",
        }
    }
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
