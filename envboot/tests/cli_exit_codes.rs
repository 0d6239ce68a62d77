//! CLI tests for the `envboot` binary.
//!
//! Spawns the binary in a temp project with a controlled `PATH` and checks
//! exit codes, messages, and that nothing was written on early failures. The
//! full-run tests put a shell-script `python3` on `PATH` that answers
//! `--version`, `-m venv` and `-m pip` the way CPython would.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use envboot::exit_codes;
use envboot::test_support::TestProject;

fn envboot(project: &TestProject, path_dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_envboot"));
    cmd.current_dir(project.path())
        .env("PATH", path_dir)
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn missing_interpreter_exits_with_failure_and_writes_nothing() {
    let project = TestProject::with_manifest("httpx\n").expect("project");
    let empty_path = tempfile::tempdir().expect("tempdir");

    let output = envboot(&project, empty_path.path())
        .output()
        .expect("run envboot");

    assert_eq!(output.status.code(), Some(exit_codes::FAILED));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("python3 not found on PATH"), "stderr: {stderr}");
    assert_eq!(project.entries().expect("entries"), vec!["requirements.txt"]);
}

#[test]
fn invalid_config_fails_before_any_gate() {
    let project = TestProject::with_manifest("httpx\n").expect("project");
    fs::write(project.path().join("envboot.toml"), "min_version = \"latest\"\n")
        .expect("write config");
    let empty_path = tempfile::tempdir().expect("tempdir");

    let output = envboot(&project, empty_path.path())
        .output()
        .expect("run envboot");

    assert_eq!(output.status.code(), Some(exit_codes::FAILED));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("min_version"), "stderr: {stderr}");
}

#[test]
fn configured_interpreter_name_is_reported() {
    let project = TestProject::with_manifest("httpx\n").expect("project");
    fs::write(
        project.path().join("envboot.toml"),
        "interpreter = \"python3.12\"\n",
    )
    .expect("write config");
    let empty_path = tempfile::tempdir().expect("tempdir");

    let output = envboot(&project, empty_path.path())
        .output()
        .expect("run envboot");

    assert_eq!(output.status.code(), Some(exit_codes::FAILED));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("python3.12 not found"), "stderr: {stderr}");
}

#[test]
fn unexpected_argument_exits_with_failure() {
    let project = TestProject::new().expect("project");
    let empty_path = tempfile::tempdir().expect("tempdir");

    let output = envboot(&project, empty_path.path())
        .arg("extra")
        .output()
        .expect("run envboot");

    assert_eq!(output.status.code(), Some(exit_codes::FAILED));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("extra"), "stderr: {stderr}");
    assert!(project.entries().expect("entries").is_empty());
}

#[test]
fn version_flag_exits_cleanly() {
    let project = TestProject::new().expect("project");
    let empty_path = tempfile::tempdir().expect("tempdir");

    let output = envboot(&project, empty_path.path())
        .arg("--version")
        .output()
        .expect("run envboot");

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert!(String::from_utf8_lossy(&output.stdout).starts_with("envboot "));
}

/// Stand-in for CPython. `-m venv` copies itself into the env, `-m pip install
/// -r` records each requirement under `$VIRTUAL_ENV/site-packages` and fails
/// on a requirement named `nope`.
#[cfg(unix)]
const FAKE_PYTHON: &str = r#"#!/bin/sh
if [ "$1" = "--version" ]; then
    echo "Python 3.11.4"
    exit 0
fi
if [ "$1 $2" = "-m venv" ]; then
    mkdir -p "$3/bin" && cp "$0" "$3/bin/python"
    exit $?
fi
if [ "$1 $2 $3" = "-m pip install" ]; then
    if [ "$4" = "--upgrade" ]; then
        exit 0
    fi
    while read -r pkg; do
        [ -z "$pkg" ] && continue
        if [ "$pkg" = "nope" ]; then
            echo "ERROR: No matching distribution found for nope" >&2
            exit 1
        fi
        mkdir -p "$VIRTUAL_ENV/site-packages/$pkg" || exit 1
    done < "$5"
    exit 0
fi
echo "unexpected arguments: $*" >&2
exit 2
"#;

/// Write the fake `python3` into `bin_dir` and return a `PATH` that finds it
/// first and still has the shell utilities it calls.
#[cfg(unix)]
fn install_fake_python(bin_dir: &Path) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let python = bin_dir.join("python3");
    fs::write(&python, FAKE_PYTHON).expect("write fake python");
    fs::set_permissions(&python, fs::Permissions::from_mode(0o755)).expect("chmod fake python");

    let mut entries = vec![bin_dir.to_path_buf()];
    entries.extend(std::env::split_paths("/usr/bin:/bin"));
    PathBuf::from(std::env::join_paths(entries).expect("join PATH"))
}

#[cfg(unix)]
#[test]
fn full_run_succeeds_twice_with_fake_python() {
    let project = TestProject::with_manifest("httpx\nsupabase\n").expect("project");
    let bin_dir = tempfile::tempdir().expect("tempdir");
    let path = install_fake_python(bin_dir.path());

    for attempt in 1..=2 {
        let output = envboot(&project, &path).output().expect("run envboot");
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        assert_eq!(
            output.status.code(),
            Some(exit_codes::OK),
            "run {attempt}\nstdout: {stdout}\nstderr: {stderr}"
        );
        assert!(stdout.contains("source venv/bin/activate"), "stdout: {stdout}");
        assert!(!stderr.contains("WARN"), "stderr: {stderr}");
    }

    assert!(project.path().join("venv/bin/python").is_file());
    assert_eq!(
        project.installed_packages("venv").expect("installed"),
        vec!["httpx", "supabase"]
    );
}

#[cfg(unix)]
#[test]
fn quiet_install_failure_prints_pip_output_before_error_line() {
    let project = TestProject::with_manifest("httpx\nnope\n").expect("project");
    fs::write(
        project.path().join("envboot.toml"),
        "echo_tool_output = false\n",
    )
    .expect("write config");
    let bin_dir = tempfile::tempdir().expect("tempdir");
    let path = install_fake_python(bin_dir.path());

    let output = envboot(&project, &path).output().expect("run envboot");

    assert_eq!(output.status.code(), Some(exit_codes::FAILED));
    let stderr = String::from_utf8_lossy(&output.stderr);
    let lines: Vec<&str> = stderr.lines().collect();
    assert_eq!(lines.len(), 2, "stderr: {stderr}");
    assert_eq!(lines[0], "ERROR: No matching distribution found for nope");
    assert!(
        lines[1].starts_with("error: failed to install dependencies from requirements.txt"),
        "stderr: {stderr}"
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains("Setup complete"), "stdout: {stdout}");
}
