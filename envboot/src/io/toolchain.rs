//! Toolchain abstraction for interpreter lookup and tool invocation.
//!
//! The [`Toolchain`] trait decouples the gate chain from the host system.
//! Tests use a scripted toolchain that returns predetermined outputs without
//! spawning processes.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, instrument};

use crate::core::gate::Gate;
use crate::io::process::run_command;

/// One external tool invocation.
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Gate issuing the call.
    pub gate: Gate,
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub workdir: PathBuf,
    pub env: Vec<(OsString, OsString)>,
    pub env_remove: Vec<OsString>,
    pub timeout: Duration,
    pub output_limit_bytes: usize,
    /// Copy the tool's output to our stderr while it runs.
    pub echo: bool,
}

impl Invocation {
    pub fn new(gate: Gate, program: impl Into<PathBuf>, workdir: impl Into<PathBuf>) -> Self {
        Self {
            gate,
            program: program.into(),
            args: Vec::new(),
            workdir: workdir.into(),
            env: Vec::new(),
            env_remove: Vec::new(),
            timeout: Duration::from_secs(60),
            output_limit_bytes: 1_000_000,
            echo: false,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Human-readable command line for messages and logs.
    pub fn display(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().map(|a| a.to_string_lossy().into_owned()));
        parts.join(" ")
    }
}

/// What a finished tool reported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code, `None` when killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        !self.timed_out && self.code == Some(0)
    }

    /// Short single-line reason for a failed run.
    pub fn failure_reason(&self, timeout: Duration) -> String {
        if self.timed_out {
            return format!("timed out after {}s", timeout.as_secs());
        }
        match self.code {
            Some(code) => format!("exited with status {code}"),
            None => "terminated by signal".to_string(),
        }
    }

    /// Everything the tool printed, stdout first, verbatim.
    pub fn combined(&self) -> String {
        let mut out = self.stdout.clone();
        out.push_str(&self.stderr);
        out
    }
}

/// Abstraction over the host interpreter/installer toolchain.
pub trait Toolchain {
    /// Resolve an executable name on the search path.
    fn locate(&self, program: &str) -> Result<PathBuf>;

    /// Run a tool to completion. `Err` only when it could not be started or
    /// waited on; a non-zero exit is reported through `ToolOutput`.
    fn run(&self, invocation: &Invocation) -> Result<ToolOutput>;
}

/// Toolchain backed by the real `PATH` and child processes.
pub struct SystemToolchain;

impl Toolchain for SystemToolchain {
    fn locate(&self, program: &str) -> Result<PathBuf> {
        which::which(program).with_context(|| format!("locate {program}"))
    }

    #[instrument(skip_all, fields(gate = %invocation.gate))]
    fn run(&self, invocation: &Invocation) -> Result<ToolOutput> {
        debug!(command = %invocation.display(), "running tool");
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args).current_dir(&invocation.workdir);
        for key in &invocation.env_remove {
            cmd.env_remove(key);
        }
        cmd.envs(invocation.env.iter().cloned());

        let output = run_command(
            cmd,
            invocation.timeout,
            invocation.output_limit_bytes,
            invocation.echo,
        )
        .with_context(|| format!("run {}", invocation.display()))?;

        Ok(ToolOutput {
            code: output.status.code(),
            stdout: output.stdout_lossy(),
            stderr: output.stderr_lossy(),
            timed_out: output.timed_out,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_reason_prefers_timeout() {
        let output = ToolOutput {
            code: Some(1),
            timed_out: true,
            ..ToolOutput::default()
        };
        assert!(!output.success());
        assert_eq!(
            output.failure_reason(Duration::from_secs(30)),
            "timed out after 30s"
        );
    }

    #[test]
    fn failure_reason_reports_exit_code() {
        let output = ToolOutput {
            code: Some(2),
            ..ToolOutput::default()
        };
        assert_eq!(
            output.failure_reason(Duration::from_secs(1)),
            "exited with status 2"
        );
    }

    #[test]
    fn invocation_display_joins_args() {
        let inv = Invocation::new(Gate::CreateEnvironment, "python3", ".")
            .arg("-m")
            .arg("venv")
            .arg("venv");
        assert_eq!(inv.display(), "python3 -m venv venv");
    }

    #[test]
    fn system_toolchain_reports_missing_program() {
        let err = SystemToolchain
            .locate("envboot-definitely-not-a-real-program")
            .unwrap_err();
        assert!(err.to_string().contains("envboot-definitely-not-a-real-program"));
    }

    #[cfg(unix)]
    #[test]
    fn system_toolchain_runs_with_env_overrides() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut inv = Invocation::new(Gate::UpgradeInstaller, "sh", temp.path())
            .arg("-c")
            .arg("printf '%s' \"$VIRTUAL_ENV\"");
        inv.env.push((OsString::from("VIRTUAL_ENV"), OsString::from("/tmp/venv")));

        let output = SystemToolchain.run(&inv).expect("run");
        assert!(output.success());
        assert_eq!(output.stdout, "/tmp/venv");
    }
}
