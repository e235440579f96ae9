//! Domain primitives shared by the checked distance entry point.

use core::{fmt, ops::Deref};

use thiserror::Error;

/// Identifies whether an error was produced while inspecting the left or right
/// vector argument.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum VectorKind {
    /// Value originating from the first argument.
    Left,
    /// Value originating from the second argument.
    Right,
}

impl fmt::Display for VectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Left => f.write_str("left"),
            Self::Right => f.write_str("right"),
        }
    }
}

/// Errors emitted by [`crate::distance::compute`].
#[derive(Clone, Debug, Error, PartialEq)]
pub enum DistanceError {
    /// Either input vector had zero length.
    #[error("vectors must have positive dimension")]
    ZeroLength,
    /// Input vectors had different lengths.
    #[error("dimension mismatch: left={left}, right={right}")]
    DimensionMismatch {
        /// Length of the left vector.
        left: usize,
        /// Length of the right vector.
        right: usize,
    },
    /// Encountered a non-finite value in one of the vectors.
    #[error("{which} vector contains a non-finite value at index {index}: {value}")]
    NonFinite {
        /// Argument holding the value.
        which: VectorKind,
        /// Position of the value.
        index: usize,
        /// The offending value.
        value: f32,
    },
}

/// Convenient alias for distance computations.
pub type Result<T> = core::result::Result<T, DistanceError>;

/// Vector newtype that validates dimensionality and finiteness on construction.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Vector<'a>(&'a [f32]);

impl<'a> Vector<'a> {
    pub(crate) fn new(values: &'a [f32], which: VectorKind) -> Result<Self> {
        if values.is_empty() {
            return Err(DistanceError::ZeroLength);
        }

        for (index, value) in values.iter().enumerate() {
            if !value.is_finite() {
                return Err(DistanceError::NonFinite {
                    which,
                    index,
                    value: *value,
                });
            }
        }

        Ok(Self(values))
    }
}

impl Deref for Vector<'_> {
    type Target = [f32];

    fn deref(&self) -> &Self::Target {
        self.0
    }
}

/// Distance result newtype.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Distance(f32);

impl Distance {
    pub(crate) const fn from_raw(value: f32) -> Self {
        Self(value)
    }

    /// Returns the raw distance value.
    #[must_use]
    pub const fn value(&self) -> f32 {
        self.0
    }
}

impl Deref for Distance {
    type Target = f32;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
