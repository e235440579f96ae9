//! Shared test utilities used across grove crates.

pub mod ci;
pub mod datasets;
pub mod oracle;
pub mod tracing;
