//! I/O helpers for the bootstrapper.

pub mod config;
pub mod process;
pub mod toolchain;
pub mod venv;
