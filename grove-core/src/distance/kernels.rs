//! Unchecked metric kernels used on the search and build hot paths.
//!
//! Inputs are assumed to be validated, equal-length, and already normalised
//! where the metric requires it.

use std::cmp::Ordering;

use crate::object::Element;
use crate::property::DistanceType;

/// Distance kernel resolved once per index.
pub(crate) type Kernel<T> = fn(&[T], &[T]) -> f32;

pub(crate) fn kernel_for<T: Element>(distance_type: DistanceType) -> Kernel<T> {
    match distance_type {
        DistanceType::L1 => l1::<T>,
        DistanceType::L2 | DistanceType::NormalizedL2 => l2::<T>,
        DistanceType::Hamming => hamming::<T>,
        DistanceType::Jaccard => jaccard::<T>,
        DistanceType::SparseJaccard => sparse_jaccard::<T>,
        DistanceType::Angle => angle::<T>,
        DistanceType::NormalizedAngle => normalized_angle::<T>,
        DistanceType::Cosine => cosine::<T>,
        DistanceType::NormalizedCosine => normalized_cosine::<T>,
    }
}

fn l1<T: Element>(left: &[T], right: &[T]) -> f32 {
    let sum: f64 = left
        .iter()
        .zip(right)
        .map(|(&l, &r)| (f64::from(l.to_f32()) - f64::from(r.to_f32())).abs())
        .sum();
    sum as f32
}

fn l2<T: Element>(left: &[T], right: &[T]) -> f32 {
    let sum: f64 = left
        .iter()
        .zip(right)
        .map(|(&l, &r)| {
            let diff = f64::from(l.to_f32()) - f64::from(r.to_f32());
            diff * diff
        })
        .sum();
    sum.sqrt() as f32
}

fn hamming<T: Element>(left: &[T], right: &[T]) -> f32 {
    let bits: u64 = left
        .iter()
        .zip(right)
        .map(|(&l, &r)| u64::from(l.differing_bits(r)))
        .sum();
    bits as f32
}

fn jaccard<T: Element>(left: &[T], right: &[T]) -> f32 {
    let mut shared = 0_u32;
    let mut union = 0_u32;
    for (&l, &r) in left.iter().zip(right) {
        let (in_left, in_right) = (!l.is_zero(), !r.is_zero());
        shared += u32::from(in_left && in_right);
        union += u32::from(in_left || in_right);
    }
    set_distance(shared, union)
}

fn sparse_jaccard<T: Element>(left: &[T], right: &[T]) -> f32 {
    let left_len = left.iter().take_while(|value| !value.is_zero()).count();
    let right_len = right.iter().take_while(|value| !value.is_zero()).count();
    let mut l_iter = left.iter().take(left_len).map(|value| value.to_f32()).peekable();
    let mut r_iter = right.iter().take(right_len).map(|value| value.to_f32()).peekable();

    let mut shared = 0_u32;
    while let (Some(&l), Some(&r)) = (l_iter.peek(), r_iter.peek()) {
        match l.total_cmp(&r) {
            Ordering::Less => {
                l_iter.next();
            }
            Ordering::Greater => {
                r_iter.next();
            }
            Ordering::Equal => {
                shared += 1;
                l_iter.next();
                r_iter.next();
            }
        }
    }

    let total = u32::try_from(left_len + right_len).unwrap_or(u32::MAX);
    set_distance(shared, total.saturating_sub(shared))
}

fn set_distance(shared: u32, union: u32) -> f32 {
    if union == 0 {
        return 0.0;
    }
    (1.0 - f64::from(shared) / f64::from(union)) as f32
}

fn cosine_similarity<T: Element>(left: &[T], right: &[T]) -> f64 {
    let mut dot = 0.0_f64;
    let mut left_squares = 0.0_f64;
    let mut right_squares = 0.0_f64;
    for (&l, &r) in left.iter().zip(right) {
        let (l, r) = (f64::from(l.to_f32()), f64::from(r.to_f32()));
        dot += l * r;
        left_squares += l * l;
        right_squares += r * r;
    }
    if left_squares == 0.0 || right_squares == 0.0 {
        return 0.0;
    }
    (dot / (left_squares.sqrt() * right_squares.sqrt())).clamp(-1.0, 1.0)
}

fn dot<T: Element>(left: &[T], right: &[T]) -> f64 {
    let sum: f64 = left
        .iter()
        .zip(right)
        .map(|(&l, &r)| f64::from(l.to_f32()) * f64::from(r.to_f32()))
        .sum();
    sum.clamp(-1.0, 1.0)
}

fn angle<T: Element>(left: &[T], right: &[T]) -> f32 {
    cosine_similarity(left, right).acos() as f32
}

fn normalized_angle<T: Element>(left: &[T], right: &[T]) -> f32 {
    dot(left, right).acos() as f32
}

fn cosine<T: Element>(left: &[T], right: &[T]) -> f32 {
    (1.0 - cosine_similarity(left, right)) as f32
}

fn normalized_cosine<T: Element>(left: &[T], right: &[T]) -> f32 {
    (1.0 - dot(left, right)) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use half::f16;
    use rstest::rstest;

    fn eval(distance_type: DistanceType, left: &[f32], right: &[f32]) -> f32 {
        kernel_for::<f32>(distance_type)(left, right)
    }

    #[rstest]
    #[case(DistanceType::L1, &[1.0, 2.0], &[4.0, 6.0], 7.0)]
    #[case(DistanceType::L2, &[1.0, 2.0], &[4.0, 6.0], 5.0)]
    #[case(DistanceType::Cosine, &[1.0, 0.0], &[0.0, 3.0], 1.0)]
    #[case(DistanceType::Cosine, &[1.0, 1.0], &[2.0, 2.0], 0.0)]
    #[case(DistanceType::Angle, &[1.0, 0.0], &[-1.0, 0.0], std::f32::consts::PI)]
    #[case(DistanceType::Jaccard, &[1.0, 0.0, 2.0], &[3.0, 4.0, 0.0], 1.0 - 1.0 / 3.0)]
    #[case(DistanceType::SparseJaccard, &[1.0, 3.0, 0.0], &[3.0, 4.0, 0.0], 1.0 - 1.0 / 3.0)]
    fn float_kernels_match_definitions(
        #[case] distance_type: DistanceType,
        #[case] left: &[f32],
        #[case] right: &[f32],
        #[case] expected: f32,
    ) {
        let value = eval(distance_type, left, right);
        assert!((value - expected).abs() < 1e-5, "{distance_type}: {value} vs {expected}");
    }

    #[test]
    fn zero_vectors_have_zero_similarity() {
        assert!((eval(DistanceType::Cosine, &[0.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!((eval(DistanceType::Angle, &[0.0, 0.0], &[1.0, 0.0]) - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
    }

    #[test]
    fn empty_supports_have_zero_jaccard_distance() {
        assert_eq!(eval(DistanceType::Jaccard, &[0.0, 0.0], &[0.0, 0.0]), 0.0);
        assert_eq!(eval(DistanceType::SparseJaccard, &[0.0, 0.0], &[0.0, 0.0]), 0.0);
    }

    #[test]
    fn hamming_counts_differing_bits() {
        let kernel = kernel_for::<u8>(DistanceType::Hamming);
        assert_eq!(kernel(&[0b1010, 0xFF], &[0b0110, 0x0F]), 6.0);
    }

    #[test]
    fn half_kernels_agree_with_float_kernels() {
        let left = [f16::from_f32(1.5), f16::from_f32(-2.0)];
        let right = [f16::from_f32(0.5), f16::from_f32(2.0)];
        let half = kernel_for::<f16>(DistanceType::L2)(&left, &right);
        let float = eval(DistanceType::L2, &[1.5, -2.0], &[0.5, 2.0]);
        assert!((half - float).abs() < 1e-3);
    }
}
