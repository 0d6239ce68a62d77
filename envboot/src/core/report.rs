//! Completion report shown after a successful bootstrap.

/// Shell flavour used to phrase the activate command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Unix,
    Windows,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Unix
        }
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapReport {
    /// Environment directory as configured (relative to the invocation dir).
    pub env_dir: String,
    /// Manifest the dependencies were installed from.
    pub manifest: String,
    /// Interpreter version that built the environment.
    pub interpreter_version: String,
    pub platform: Platform,
}

impl BootstrapReport {
    /// Command that enters the environment from an interactive shell.
    pub fn activate_command(&self) -> String {
        match self.platform {
            Platform::Unix => format!("source {}/bin/activate", self.env_dir),
            Platform::Windows => format!("{}\\Scripts\\activate", self.env_dir),
        }
    }

    pub fn deactivate_command(&self) -> &'static str {
        "deactivate"
    }

    pub fn render(&self) -> String {
        format!(
            "Setup complete: {env} is ready (Python {version}, dependencies from {manifest}).\n\
             To activate the virtual environment, run:\n    {activate}\n\
             To deactivate it when you are done, run:\n    {deactivate}\n",
            env = self.env_dir,
            version = self.interpreter_version,
            manifest = self.manifest,
            activate = self.activate_command(),
            deactivate = self.deactivate_command(),
        )
    }
}
