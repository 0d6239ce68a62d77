//! Provision the agent project's Python virtual environment.
//!
//! Run from the project directory. Creates `venv/`, upgrades pip inside it and
//! installs `requirements.txt`, then prints how to activate the environment.
//! Defaults can be overridden with an `envboot.toml` next to the manifest.

use std::io;

use anyhow::{Context, Result};
use clap::Parser;
use clap::error::ErrorKind;
use tracing::debug;

use envboot::bootstrap::{BootstrapPlan, run_bootstrap};
use envboot::exit_codes;
use envboot::io::config::{CONFIG_FILE, load_config};
use envboot::io::toolchain::SystemToolchain;

#[derive(Parser)]
#[command(
    name = "envboot",
    version,
    about = "Create the project's Python virtual environment and install its requirements"
)]
struct Cli {}

fn main() {
    if let Err(err) = Cli::try_parse() {
        // Help and version go to stdout and exit 0; usage errors share the
        // single failure code.
        if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) {
            err.exit();
        }
        let _ = err.print();
        std::process::exit(exit_codes::FAILED);
    }
    envboot::logging::init();
    match run() {
        Ok(()) => std::process::exit(exit_codes::OK),
        Err(err) => {
            eprintln!("error: {:#}", err);
            std::process::exit(exit_codes::FAILED);
        }
    }
}

fn run() -> Result<()> {
    let root = std::env::current_dir().context("resolve invocation directory")?;
    let config = load_config(&root.join(CONFIG_FILE))?;
    let echo = config.echo_tool_output;
    let plan = BootstrapPlan::new(&root, config)?;
    debug!(root = %plan.root.display(), "starting bootstrap");

    let mut stdout = io::stdout().lock();
    match run_bootstrap(&plan, &SystemToolchain, &mut stdout) {
        Ok(_) => Ok(()),
        Err(err) => {
            // Echoed tool output already reached the terminal.
            if !echo && !err.diagnostics().is_empty() {
                eprint!("{}", err.diagnostics());
            }
            Err(err.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_without_arguments() {
        assert!(Cli::try_parse_from(["envboot"]).is_ok());
    }

    #[test]
    fn rejects_unexpected_arguments() {
        assert!(Cli::try_parse_from(["envboot", "--force"]).is_err());
        assert!(Cli::try_parse_from(["envboot", "extra"]).is_err());
    }
}
