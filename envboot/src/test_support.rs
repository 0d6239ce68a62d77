//! Test-only helpers: a scripted toolchain and throwaway project directories.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use tempfile::TempDir;

use crate::bootstrap::BootstrapPlan;
use crate::core::gate::Gate;
use crate::io::config::BootstrapConfig;
use crate::io::toolchain::{Invocation, ToolOutput, Toolchain};
use crate::io::venv::VenvLayout;

/// Directory under the env root where the scripted installer records packages.
const SITE_PACKAGES: &str = "site-packages";

/// Toolchain that answers from a script instead of spawning processes.
///
/// Successful `-m venv` calls create the env layout on disk and successful
/// `pip install -r` calls record one directory per manifest entry, so tests
/// can assert on filesystem effects.
pub struct ScriptedToolchain {
    interpreter: Option<PathBuf>,
    version_output: ToolOutput,
    overrides: HashMap<Gate, ToolOutput>,
    calls: RefCell<Vec<Invocation>>,
}

impl ScriptedToolchain {
    /// A `python3` on `PATH` that reports `Python {version}`.
    pub fn with_python(version: &str) -> Self {
        Self::with_version_output(&format!("Python {version}\n"), "")
    }

    /// A `python3` on `PATH` whose `--version` prints the given streams.
    pub fn with_version_output(stdout: &str, stderr: &str) -> Self {
        Self {
            interpreter: Some(PathBuf::from("/usr/bin/python3")),
            version_output: ToolOutput {
                code: Some(0),
                stdout: stdout.to_string(),
                stderr: stderr.to_string(),
                timed_out: false,
            },
            overrides: HashMap::new(),
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Nothing resolvable on `PATH`.
    pub fn without_interpreter() -> Self {
        Self {
            interpreter: None,
            ..Self::with_python("3.12.0")
        }
    }

    /// Make the tool run by `gate` return `output` instead of succeeding.
    pub fn failing(mut self, gate: Gate, output: ToolOutput) -> Self {
        self.overrides.insert(gate, output);
        self
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.borrow().clone()
    }

    pub fn calls_for(&self, gate: Gate) -> Vec<Invocation> {
        self.calls
            .borrow()
            .iter()
            .filter(|call| call.gate == gate)
            .cloned()
            .collect()
    }

    fn simulate(&self, invocation: &Invocation) -> Result<ToolOutput> {
        match invocation.gate {
            Gate::VersionCheck => Ok(self.version_output.clone()),
            Gate::CreateEnvironment => {
                let env_dir = invocation
                    .args
                    .last()
                    .ok_or_else(|| anyhow!("venv call without target"))?;
                let layout = VenvLayout::new(invocation.workdir.join(env_dir));
                fs::create_dir_all(&layout.scripts_dir)
                    .with_context(|| format!("create {}", layout.scripts_dir.display()))?;
                fs::write(&layout.python, "")
                    .with_context(|| format!("write {}", layout.python.display()))?;
                Ok(ok_output(""))
            }
            Gate::UpgradeInstaller => Ok(ok_output("Successfully installed pip\n")),
            Gate::InstallDependencies => {
                let manifest = invocation
                    .args
                    .last()
                    .ok_or_else(|| anyhow!("pip install without manifest"))?;
                let env_root = invocation
                    .env
                    .iter()
                    .find(|(key, _)| key == "VIRTUAL_ENV")
                    .map(|(_, value)| PathBuf::from(value))
                    .ok_or_else(|| anyhow!("pip install outside an environment"))?;
                let contents = fs::read_to_string(invocation.workdir.join(manifest))
                    .context("read manifest")?;
                for name in requirement_names(&contents) {
                    fs::create_dir_all(env_root.join(SITE_PACKAGES).join(name))
                        .context("record installed package")?;
                }
                Ok(ok_output("Successfully installed\n"))
            }
            other => Err(anyhow!("no tool expected for gate {other}")),
        }
    }
}

impl Toolchain for ScriptedToolchain {
    fn locate(&self, program: &str) -> Result<PathBuf> {
        self.interpreter
            .clone()
            .ok_or_else(|| anyhow!("cannot find binary path"))
            .with_context(|| format!("locate {program}"))
    }

    fn run(&self, invocation: &Invocation) -> Result<ToolOutput> {
        self.calls.borrow_mut().push(invocation.clone());
        if let Some(output) = self.overrides.get(&invocation.gate) {
            return Ok(output.clone());
        }
        self.simulate(invocation)
    }
}

fn ok_output(stdout: &str) -> ToolOutput {
    ToolOutput {
        code: Some(0),
        stdout: stdout.to_string(),
        ..ToolOutput::default()
    }
}

/// Output of a tool that exited with `code` after printing `stderr`.
pub fn failed_output(code: i32, stderr: &str) -> ToolOutput {
    ToolOutput {
        code: Some(code),
        stderr: stderr.to_string(),
        ..ToolOutput::default()
    }
}

/// Package names from a requirements file, ignoring comments and specifiers.
fn requirement_names(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let end = line
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.'))
                .unwrap_or(line.len());
            let name = &line[..end];
            (!name.is_empty()).then(|| name.to_string())
        })
        .collect()
}

/// A temporary invocation directory.
pub struct TestProject {
    dir: TempDir,
}

impl TestProject {
    pub fn new() -> Result<Self> {
        Ok(Self {
            dir: tempfile::tempdir().context("create tempdir")?,
        })
    }

    /// Project with `requirements.txt` holding `contents`.
    pub fn with_manifest(contents: &str) -> Result<Self> {
        let project = Self::new()?;
        project.write_manifest("requirements.txt", contents)?;
        Ok(project)
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write_manifest(&self, name: &str, contents: &str) -> Result<()> {
        let path = self.path().join(name);
        fs::write(&path, contents).with_context(|| format!("write {}", path.display()))
    }

    pub fn plan(&self, config: BootstrapConfig) -> Result<BootstrapPlan> {
        BootstrapPlan::new(self.path(), config)
    }

    /// Sorted names of the top-level entries in the project directory.
    pub fn entries(&self) -> Result<Vec<String>> {
        let mut names = fs::read_dir(self.path())
            .context("read project dir")?
            .map(|entry| Ok(entry?.file_name().to_string_lossy().into_owned()))
            .collect::<Result<Vec<String>>>()?;
        names.sort();
        Ok(names)
    }

    /// Packages the scripted installer recorded in `env_dir`, sorted.
    pub fn installed_packages(&self, env_dir: &str) -> Result<Vec<String>> {
        let site = self.path().join(env_dir).join(SITE_PACKAGES);
        if !site.exists() {
            return Ok(Vec::new());
        }
        let mut names = fs::read_dir(&site)
            .with_context(|| format!("read {}", site.display()))?
            .map(|entry| Ok(entry?.file_name().to_string_lossy().into_owned()))
            .collect::<Result<Vec<String>>>()?;
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requirement_names_strip_specifiers_and_comments() {
        let names = requirement_names(
            "# agent deps\npydantic-ai==0.0.22\n\ncrawl4ai>=0.4\nsupabase ; python_version >= '3.9'\nlogfire[fastapi]\n",
        );
        assert_eq!(names, vec!["pydantic-ai", "crawl4ai", "supabase", "logfire"]);
    }
}
