//! Benchmark setup error type.

use grove_core::IndexError;

/// Errors that may occur during benchmark setup.
#[derive(Debug, thiserror::Error)]
pub enum BenchSetupError {
    /// An index operation failed.
    #[error("index operation failed: {0}")]
    Index(#[from] IndexError),
    /// The scratch directory for an index could not be created.
    #[error("failed to create a scratch directory: {0}")]
    Io(#[from] std::io::Error),
    /// A zero value was passed where a non-zero integer was required.
    #[error("expected a non-zero value for {context}")]
    ZeroValue {
        /// The parameter that was unexpectedly zero.
        context: &'static str,
    },
}
