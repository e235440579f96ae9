//! Support library for the `grove` binary.
//!
//! Exposes the command pipeline and the logging installer so tests can drive
//! commands without spawning a subprocess.

pub mod cli;
pub mod logging;
