//! Element representations an object repository can hold.

use std::fmt;

use half::f16;

use crate::property::{DistanceType, ObjectType};
use crate::error::ObjectError;

/// Scalar stored inside an object.
pub(crate) trait Element: Copy + Send + Sync + fmt::Debug + 'static {
    const OBJECT_TYPE: ObjectType;

    /// Converts a finite value, or `None` when it does not fit.
    fn from_f64(value: f64) -> Option<Self>;

    fn to_f32(self) -> f32;

    /// Number of differing bits between the two stored representations.
    fn differing_bits(self, other: Self) -> u32;

    fn is_zero(self) -> bool {
        self.to_f32() == 0.0
    }
}

impl Element for f32 {
    const OBJECT_TYPE: ObjectType = ObjectType::Float;

    fn from_f64(value: f64) -> Option<Self> {
        let narrowed = value as f32;
        narrowed.is_finite().then_some(narrowed)
    }

    #[rustfmt::skip]
    fn to_f32(self) -> f32 { self }

    fn differing_bits(self, other: Self) -> u32 {
        (self.to_bits() ^ other.to_bits()).count_ones()
    }
}

impl Element for u8 {
    const OBJECT_TYPE: ObjectType = ObjectType::Uint8;

    fn from_f64(value: f64) -> Option<Self> {
        let rounded = value.round();
        (0.0..=255.0)
            .contains(&rounded)
            .then(|| rounded as u8)
    }

    #[rustfmt::skip]
    fn to_f32(self) -> f32 { f32::from(self) }

    fn differing_bits(self, other: Self) -> u32 {
        (self ^ other).count_ones()
    }

    fn is_zero(self) -> bool {
        self == 0
    }
}

impl Element for f16 {
    const OBJECT_TYPE: ObjectType = ObjectType::Float16;

    fn from_f64(value: f64) -> Option<Self> {
        (value.abs() <= f64::from(f16::MAX)).then(|| f16::from_f64(value))
    }

    #[rustfmt::skip]
    fn to_f32(self) -> f32 { f16::to_f32(self) }

    fn differing_bits(self, other: Self) -> u32 {
        (self.to_bits() ^ other.to_bits()).count_ones()
    }
}

/// Validates `values` and converts them into the stored representation.
///
/// Normalising metrics scale the vector to unit length; `Sparse Jaccard`
/// vectors are rewritten as ascending, de-duplicated ids followed by zero
/// padding so the kernel can merge them without allocating.
pub(crate) fn encode<T, V>(
    values: &[V],
    dimension: usize,
    distance_type: DistanceType,
) -> Result<Vec<T>, ObjectError>
where
    T: Element,
    V: Copy + Into<f64>,
{
    if values.len() != dimension {
        return Err(ObjectError::DimensionMismatch {
            expected: dimension,
            actual: values.len(),
        });
    }

    let mut staged = Vec::with_capacity(dimension);
    for (index, value) in values.iter().enumerate() {
        let value: f64 = (*value).into();
        if !value.is_finite() {
            return Err(ObjectError::NonFinite { index, value });
        }
        staged.push(value);
    }

    prepare(&mut staged, distance_type);

    staged
        .iter()
        .enumerate()
        .map(|(index, &value)| {
            T::from_f64(value).ok_or(ObjectError::OutOfRange {
                index,
                value,
                object_type: T::OBJECT_TYPE,
            })
        })
        .collect()
}

/// Applies the metric's storage transform to validated values.
pub(crate) fn prepare(values: &mut Vec<f64>, distance_type: DistanceType) {
    if distance_type.normalizes() {
        normalize(values);
    }
    if distance_type == DistanceType::SparseJaccard {
        canonicalize_set(values);
    }
}

fn normalize(values: &mut [f64]) {
    let norm = values.iter().map(|value| value * value).sum::<f64>().sqrt();
    if norm > 0.0 {
        for value in values.iter_mut() {
            *value /= norm;
        }
    }
}

fn canonicalize_set(values: &mut Vec<f64>) {
    let width = values.len();
    values.retain(|value| *value != 0.0);
    values.sort_by(f64::total_cmp);
    values.dedup();
    values.resize(width, 0.0);
}
