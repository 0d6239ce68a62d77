//! Bootstrap a Python virtual environment for the agent project.
//!
//! The bootstrapper is a strict chain of gates: find the interpreter, check
//! its version, create and activate a venv, upgrade pip, then install the
//! requirements file. The first failing gate ends the run.
//!
//! - **[`core`]**: Pure logic (version ordering, gate order, the completion
//!   report). No I/O.
//! - **[`io`]**: Configuration, child processes, the toolchain seam and venv
//!   activation.
//!
//! [`bootstrap`] ties the two together and [`error`] names the ways it fails.

pub mod bootstrap;
pub mod core;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
