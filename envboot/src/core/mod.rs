//! Deterministic, pure logic shared by the bootstrapper.
//!
//! Core modules must be free of I/O side effects.

pub mod gate;
pub mod report;
pub mod version;
