//! Distance metrics.
//!
//! The engine evaluates distances through unchecked kernels resolved once per
//! index. [`compute`] is the validated entry point for callers that want to
//! evaluate a metric directly on `f32` vectors.

mod kernels;
mod types;

pub(crate) use self::kernels::{Kernel, kernel_for};
pub use self::types::{Distance, DistanceError, Result, VectorKind};

use self::types::Vector;
use crate::object::prepare;
use crate::property::DistanceType;

/// Evaluates `distance_type` between two vectors.
///
/// Normalising metrics normalise both inputs first and `Sparse Jaccard`
/// treats each vector as a set of nonzero ids, matching how the index stores
/// objects.
///
/// # Examples
///
/// ```
/// use grove_core::{DistanceError, DistanceType, distance};
///
/// fn main() -> Result<(), DistanceError> {
///     let d = distance::compute(DistanceType::L2, &[1.0, 2.0, 3.0], &[4.0, 6.0, 8.0])?;
///     assert!((d.value() - 7.071_068).abs() < 1e-6);
///     Ok(())
/// }
/// ```
///
/// # Errors
///
/// - [`DistanceError::ZeroLength`] when any input is empty.
/// - [`DistanceError::DimensionMismatch`] when input lengths differ.
/// - [`DistanceError::NonFinite`] when a value is NaN or infinite.
pub fn compute(distance_type: DistanceType, left: &[f32], right: &[f32]) -> Result<Distance> {
    let left = Vector::new(left, VectorKind::Left)?;
    let right = Vector::new(right, VectorKind::Right)?;
    if left.len() != right.len() {
        return Err(DistanceError::DimensionMismatch {
            left: left.len(),
            right: right.len(),
        });
    }

    let left = stage(&left, distance_type);
    let right = stage(&right, distance_type);
    Ok(Distance::from_raw(kernel_for::<f32>(distance_type)(
        &left, &right,
    )))
}

fn stage(values: &[f32], distance_type: DistanceType) -> Vec<f32> {
    let mut staged: Vec<f64> = values.iter().map(|&value| f64::from(value)).collect();
    prepare(&mut staged, distance_type);
    staged.into_iter().map(|value| value as f32).collect()
}
