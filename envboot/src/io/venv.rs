//! Virtual environment layout and process-local activation.
//!
//! Activation never touches our own process environment. It produces the
//! variables a child needs to behave as if `activate` had been sourced, and
//! callers apply them per command.

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};

/// Paths inside a venv for the current platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VenvLayout {
    pub root: PathBuf,
    /// `bin/` on Unix, `Scripts\` on Windows.
    pub scripts_dir: PathBuf,
    pub python: PathBuf,
}

impl VenvLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let (scripts_dir, python) = if cfg!(windows) {
            let scripts = root.join("Scripts");
            let python = scripts.join("python.exe");
            (scripts, python)
        } else {
            let bin = root.join("bin");
            let python = bin.join("python");
            (bin, python)
        };
        Self {
            root,
            scripts_dir,
            python,
        }
    }
}

/// An environment whose interpreter is known to exist, plus the child
/// environment variables that bind tool lookup to it.
#[derive(Debug, Clone)]
pub struct ActivatedEnv {
    layout: VenvLayout,
    path: OsString,
}

impl ActivatedEnv {
    /// Bind to `layout`, prepending its scripts dir to the current `PATH`.
    pub fn activate(layout: VenvLayout) -> Result<Self> {
        let inherited = env::var_os("PATH").unwrap_or_default();
        Self::activate_with_path(layout, &inherited)
    }

    pub fn activate_with_path(layout: VenvLayout, inherited_path: &OsString) -> Result<Self> {
        if !layout.python.is_file() {
            return Err(anyhow!(
                "environment interpreter {} is missing",
                layout.python.display()
            ));
        }
        let mut entries = vec![layout.scripts_dir.clone()];
        entries.extend(env::split_paths(inherited_path));
        let path = env::join_paths(entries).context("build PATH for virtual environment")?;
        Ok(Self { layout, path })
    }

    pub fn python(&self) -> &Path {
        &self.layout.python
    }

    pub fn layout(&self) -> &VenvLayout {
        &self.layout
    }

    /// Variables to set on every child that should run inside the environment.
    pub fn env_vars(&self) -> Vec<(OsString, OsString)> {
        vec![
            (OsString::from("PATH"), self.path.clone()),
            (
                OsString::from("VIRTUAL_ENV"),
                self.layout.root.clone().into_os_string(),
            ),
        ]
    }

    /// Variables to strip, matching what `activate` unsets.
    pub fn env_removals(&self) -> Vec<OsString> {
        vec![OsString::from("PYTHONHOME")]
    }
}
