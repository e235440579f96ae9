//! Error types for the grove core library.
//!
//! Defines the error enums exposed by the public API, their stable codes, and
//! a convenient result alias.

use std::{fmt, io, path::PathBuf, sync::Arc};

use thiserror::Error;

use crate::property::ObjectType;

macro_rules! define_error_codes {
    (
        $(#[$enum_meta:meta])*
        enum $CodeTy:ident for $ErrTy:ident {
            $(
                $(#[$variant_meta:meta])*
                $CodeVariant:ident => $ErrVariant:ident $( { $($pattern:tt)* } )? => $code:expr
            ),+ $(,)?
        }
    ) => {
        $(#[$enum_meta])*
        #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
        #[non_exhaustive]
        pub enum $CodeTy {
            $(
                $(#[$variant_meta])*
                $CodeVariant,
            )+
        }

        impl $CodeTy {
            /// Return the stable machine-readable representation of this error code.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$CodeVariant => $code,)+
                }
            }
        }

        impl fmt::Display for $CodeTy {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl $ErrTy {
            #[doc = concat!(
                "Retrieve the stable [`",
                stringify!($CodeTy),
                "`] for this error."
            )]
            #[must_use]
            pub const fn code(&self) -> $CodeTy {
                match self {
                    $(Self::$ErrVariant $( { $($pattern)* } )? => $CodeTy::$CodeVariant,)+
                }
            }
        }
    };
}

/// Reasons a vector was rejected before it reached the object repository.
#[non_exhaustive]
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ObjectError {
    /// The vector length differs from the index dimension.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension declared by the index property.
        expected: usize,
        /// Length of the rejected vector.
        actual: usize,
    },
    /// An element was NaN or infinite.
    #[error("element {index} is not finite ({value})")]
    NonFinite {
        /// Position of the offending element.
        index: usize,
        /// The offending value.
        value: f64,
    },
    /// An element cannot be represented by the index object type.
    #[error("element {index} ({value}) does not fit object type {object_type}")]
    OutOfRange {
        /// Position of the offending element.
        index: usize,
        /// The offending value.
        value: f64,
        /// Storage representation that rejected it.
        object_type: ObjectType,
    },
}

define_error_codes! {
    /// Stable codes describing [`ObjectError`] variants.
    enum ObjectErrorCode for ObjectError {
        /// The vector length differs from the index dimension.
        DimensionMismatch => DimensionMismatch { .. } => "OBJECT_DIMENSION_MISMATCH",
        /// An element was NaN or infinite.
        NonFinite => NonFinite { .. } => "OBJECT_NON_FINITE",
        /// An element cannot be represented by the object type.
        OutOfRange => OutOfRange { .. } => "OBJECT_OUT_OF_RANGE",
    }
}

/// Error type produced by [`crate::Index`] operations.
#[non_exhaustive]
#[derive(Clone, Debug, Error)]
pub enum IndexError {
    /// A property, parameter, or metric/representation combination was rejected.
    #[error("invalid configuration: {reason}")]
    InvalidConfiguration {
        /// Human-readable description of the rejected value.
        reason: String,
    },
    /// A vector failed validation.
    #[error("invalid object: {source}")]
    InvalidObject {
        /// Validation detail.
        #[from]
        source: ObjectError,
    },
    /// The id was never assigned.
    #[error("object {id} does not exist")]
    NotFound {
        /// Requested id.
        id: usize,
    },
    /// The id refers to a removed object.
    #[error("object {id} has been removed")]
    Removed {
        /// Requested id.
        id: usize,
    },
    /// The handle was closed.
    #[error("index handle is closed")]
    ClosedIndex,
    /// A mutation was attempted through a read-only handle.
    #[error("index was opened read-only; `{operation}` is not permitted")]
    ReadOnly {
        /// Name of the rejected operation.
        operation: &'static str,
    },
    /// The filesystem rejected a read or write.
    #[error("i/o failure at {}: {source}", .path.display())]
    Io {
        /// Path being read or written.
        path: PathBuf,
        /// Underlying operating-system error.
        #[source]
        source: Arc<io::Error>,
    },
    /// Persisted data could not be decoded.
    #[error("corrupt index data at {}: {reason}", .path.display())]
    Corrupt {
        /// File that failed to decode.
        path: PathBuf,
        /// Decoder diagnostic.
        reason: String,
    },
    /// A lock guarding shared state was poisoned by a panicking thread.
    #[error("{resource} lock was poisoned")]
    LockPoisoned {
        /// Name of the poisoned resource.
        resource: &'static str,
    },
    /// Internal bookkeeping disagreed with itself.
    #[error("graph invariant violated: {message}")]
    GraphInvariant {
        /// Description of the inconsistency.
        message: String,
    },
}

define_error_codes! {
    /// Stable codes describing [`IndexError`] variants.
    enum IndexErrorCode for IndexError {
        /// A property or parameter was rejected.
        InvalidConfiguration => InvalidConfiguration { .. } => "INDEX_INVALID_CONFIGURATION",
        /// A vector failed validation.
        InvalidObject => InvalidObject { .. } => "INDEX_INVALID_OBJECT",
        /// The id was never assigned.
        NotFound => NotFound { .. } => "INDEX_NOT_FOUND",
        /// The id refers to a removed object.
        Removed => Removed { .. } => "INDEX_REMOVED",
        /// The handle was closed.
        ClosedIndex => ClosedIndex => "INDEX_CLOSED",
        /// A mutation was attempted through a read-only handle.
        ReadOnly => ReadOnly { .. } => "INDEX_READ_ONLY",
        /// The filesystem rejected a read or write.
        Io => Io { .. } => "INDEX_IO",
        /// Persisted data could not be decoded.
        Corrupt => Corrupt { .. } => "INDEX_CORRUPT",
        /// A lock was poisoned.
        LockPoisoned => LockPoisoned { .. } => "INDEX_LOCK_POISONED",
        /// Internal bookkeeping disagreed with itself.
        GraphInvariant => GraphInvariant { .. } => "INDEX_GRAPH_INVARIANT",
    }
}

impl IndexError {
    /// Returns the underlying [`ObjectErrorCode`] when the error wraps an
    /// [`ObjectError`].
    #[must_use]
    pub const fn object_code(&self) -> Option<ObjectErrorCode> {
        match self {
            Self::InvalidObject { source } => Some(source.code()),
            _ => None,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source: Arc::new(source),
        }
    }

    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl fmt::Display) -> Self {
        Self::Corrupt {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            reason: reason.into(),
        }
    }
}

/// Convenient result alias for index operations.
pub type Result<T, E = IndexError> = core::result::Result<T, E>;
