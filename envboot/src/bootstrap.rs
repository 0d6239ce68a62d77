//! The bootstrap gate chain.
//!
//! Gates run strictly in order and the first failure ends the run. Nothing is
//! retried and nothing is rolled back: an environment created before a later
//! gate fails stays on disk.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info, instrument, warn};

use crate::core::gate::Gate;
use crate::core::report::{BootstrapReport, Platform};
use crate::core::version::{Version, meets_minimum};
use crate::error::BootstrapError;
use crate::io::config::BootstrapConfig;
use crate::io::toolchain::{Invocation, ToolOutput, Toolchain};
use crate::io::venv::{ActivatedEnv, VenvLayout};

/// Validated inputs for one run, resolved against the invocation directory.
#[derive(Debug, Clone)]
pub struct BootstrapPlan {
    pub root: PathBuf,
    pub config: BootstrapConfig,
    pub min_version: Version,
}

impl BootstrapPlan {
    pub fn new(root: impl Into<PathBuf>, config: BootstrapConfig) -> Result<Self> {
        config.validate()?;
        let min_version = config.min_version().context("parse min_version")?;
        Ok(Self {
            root: root.into(),
            config,
            min_version,
        })
    }

    pub fn env_layout(&self) -> VenvLayout {
        VenvLayout::new(self.root.join(&self.config.env_dir))
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(&self.config.manifest)
    }
}

/// Run every gate in order, writing status lines to `out`.
///
/// Returns the completion report on success. The report is also written to
/// `out` as the final gate.
#[instrument(skip_all, fields(root = %plan.root.display()))]
pub fn run_bootstrap<T: Toolchain, W: Write>(
    plan: &BootstrapPlan,
    toolchain: &T,
    out: &mut W,
) -> Result<BootstrapReport, BootstrapError> {
    let config = &plan.config;

    announce(out, Gate::InterpreterPresence);
    let interpreter = toolchain.locate(&config.interpreter).map_err(|err| {
        BootstrapError::InterpreterNotFound {
            interpreter: config.interpreter.clone(),
            reason: err.root_cause().to_string(),
        }
    })?;
    info!(interpreter = %interpreter.display(), "interpreter found");

    announce(out, Gate::VersionCheck);
    let found = query_version(plan, toolchain, &interpreter)?;
    if !meets_minimum(&found, &plan.min_version) {
        return Err(BootstrapError::VersionTooLow {
            required: plan.min_version.to_string(),
            found: found.to_string(),
        });
    }
    info!(version = %found, required = %plan.min_version, "interpreter version accepted");

    announce(out, Gate::CreateEnvironment);
    create_environment(plan, toolchain, &interpreter)?;

    announce(out, Gate::ActivateEnvironment);
    let activated = ActivatedEnv::activate(plan.env_layout()).map_err(|err| {
        BootstrapError::EnvironmentCreationFailed {
            env_dir: PathBuf::from(&config.env_dir),
            reason: format!("{err:#}"),
            diagnostics: String::new(),
        }
    })?;
    info!(python = %activated.python().display(), "environment activated");

    announce(out, Gate::UpgradeInstaller);
    let upgrade = pip_invocation(plan, &activated, Gate::UpgradeInstaller)
        .arg("install")
        .arg("--upgrade")
        .arg("pip");
    run_tool(toolchain, &upgrade).map_err(|(reason, diagnostics)| {
        BootstrapError::InstallerUpgradeFailed {
            reason,
            diagnostics,
        }
    })?;

    announce(out, Gate::ManifestPresence);
    if !plan.manifest_path().is_file() {
        return Err(BootstrapError::ManifestNotFound {
            manifest: PathBuf::from(&config.manifest),
        });
    }

    announce(out, Gate::InstallDependencies);
    let install = pip_invocation(plan, &activated, Gate::InstallDependencies)
        .arg("install")
        .arg("-r")
        .arg(&config.manifest);
    run_tool(toolchain, &install).map_err(|(reason, diagnostics)| {
        BootstrapError::DependencyInstallFailed {
            manifest: PathBuf::from(&config.manifest),
            reason,
            diagnostics,
        }
    })?;

    announce(out, Gate::CompletionReport);
    let report = BootstrapReport {
        env_dir: config.env_dir.clone(),
        manifest: config.manifest.clone(),
        interpreter_version: found.to_string(),
        platform: Platform::current(),
    };
    if let Err(err) = out.write_all(report.render().as_bytes()) {
        warn!(err = %err, "failed to write completion report");
    }
    info!("bootstrap complete");
    Ok(report)
}

fn announce<W: Write>(out: &mut W, gate: Gate) {
    info!(gate = %gate, "gate start");
    if let Err(err) = writeln!(out, "{}", gate.status_line()) {
        warn!(err = %err, "failed to write status line");
    }
}

/// Ask the interpreter for its version. An interpreter that cannot answer is
/// treated as absent.
fn query_version<T: Toolchain>(
    plan: &BootstrapPlan,
    toolchain: &T,
    interpreter: &Path,
) -> Result<Version, BootstrapError> {
    let mut query = Invocation::new(Gate::VersionCheck, interpreter, &plan.root).arg("--version");
    query.timeout = plan.config.timeouts.version_query();
    query.output_limit_bytes = plan.config.output_limit_bytes;

    let not_usable = |reason: String| BootstrapError::InterpreterNotFound {
        interpreter: plan.config.interpreter.clone(),
        reason,
    };

    let output = toolchain
        .run(&query)
        .map_err(|err| not_usable(format!("{err:#}")))?;
    if !output.success() {
        return Err(not_usable(format!(
            "`{}` {}",
            query.display(),
            output.failure_reason(query.timeout)
        )));
    }
    // Python 2 prints its banner on stderr.
    Version::from_interpreter_output(&output.stdout)
        .or_else(|| Version::from_interpreter_output(&output.stderr))
        .ok_or_else(|| not_usable(format!("`{}` did not report a version", query.display())))
}

fn create_environment<T: Toolchain>(
    plan: &BootstrapPlan,
    toolchain: &T,
    interpreter: &Path,
) -> Result<(), BootstrapError> {
    let layout = plan.env_layout();
    if layout.root.exists() {
        info!(env_dir = %layout.root.display(), "reusing existing environment directory");
    }
    let mut create = Invocation::new(Gate::CreateEnvironment, interpreter, &plan.root)
        .arg("-m")
        .arg("venv")
        .arg(&plan.config.env_dir);
    create.timeout = plan.config.timeouts.create_env();
    create.output_limit_bytes = plan.config.output_limit_bytes;
    create.echo = plan.config.echo_tool_output;

    run_tool(toolchain, &create).map_err(|(reason, diagnostics)| {
        BootstrapError::EnvironmentCreationFailed {
            env_dir: PathBuf::from(&plan.config.env_dir),
            reason,
            diagnostics,
        }
    })?;
    Ok(())
}

/// `<env python> -m pip ...`, bound to the activated environment.
fn pip_invocation(plan: &BootstrapPlan, activated: &ActivatedEnv, gate: Gate) -> Invocation {
    let mut inv = Invocation::new(gate, activated.python(), &plan.root)
        .arg("-m")
        .arg("pip");
    inv.env = activated.env_vars();
    inv.env_remove = activated.env_removals();
    inv.timeout = plan.config.timeouts.install();
    inv.output_limit_bytes = plan.config.output_limit_bytes;
    inv.echo = plan.config.echo_tool_output;
    inv
}

/// Run a tool and require success. On failure returns a one-line reason and
/// the tool's captured output.
fn run_tool<T: Toolchain>(
    toolchain: &T,
    invocation: &Invocation,
) -> Result<ToolOutput, (String, String)> {
    let output = toolchain
        .run(invocation)
        .map_err(|err| (format!("{err:#}"), String::new()))?;
    if !output.success() {
        debug!(
            gate = %invocation.gate,
            exit_code = ?output.code,
            timed_out = output.timed_out,
            "tool failed"
        );
        let reason = format!(
            "`{}` {}",
            invocation.display(),
            output.failure_reason(invocation.timeout)
        );
        return Err((reason, output.combined()));
    }
    Ok(output)
}
