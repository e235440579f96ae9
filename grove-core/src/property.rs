//! Index properties: dimension, storage representation, metric, and edge
//! bounds.
//!
//! A [`Property`] is fixed when an index is created and travels with every
//! snapshot and export so an index directory is self-describing.

use std::{fmt, num::NonZeroUsize, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::{IndexError, Result};

/// Default number of edges kept per node during construction.
pub const DEFAULT_EDGE_SIZE_FOR_CREATION: usize = 10;
/// Default number of edges traversed per node during search.
pub const DEFAULT_EDGE_SIZE_FOR_SEARCH: usize = 40;

/// Element representation used to store objects.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum ObjectType {
    /// 32-bit IEEE floats.
    Float,
    /// Unsigned bytes.
    Uint8,
    /// 16-bit IEEE half floats.
    Float16,
}

impl ObjectType {
    /// Canonical name accepted by [`ObjectType::from_str`].
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Float => "Float",
            Self::Uint8 => "Byte",
            Self::Float16 => "Float16",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectType {
    type Err = IndexError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "Float" | "float" => Ok(Self::Float),
            "Byte" | "byte" => Ok(Self::Uint8),
            "Float16" | "float16" => Ok(Self::Float16),
            other => Err(IndexError::invalid(format!("unknown object type `{other}`"))),
        }
    }
}

/// Metric used to compare objects.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum DistanceType {
    /// Sum of absolute coordinate differences.
    L1,
    /// Euclidean distance.
    L2,
    /// Euclidean distance over unit-normalised vectors.
    NormalizedL2,
    /// Number of differing bits.
    Hamming,
    /// Jaccard distance over the supports (nonzero coordinates).
    Jaccard,
    /// Jaccard distance over sets of element ids; zero is padding.
    SparseJaccard,
    /// Angle between vectors in radians.
    Angle,
    /// Angle between unit-normalised vectors.
    NormalizedAngle,
    /// One minus cosine similarity.
    Cosine,
    /// One minus the dot product of unit-normalised vectors.
    NormalizedCosine,
}

impl DistanceType {
    /// Every supported metric, in declaration order.
    pub const ALL: [Self; 10] = [
        Self::L1,
        Self::L2,
        Self::NormalizedL2,
        Self::Hamming,
        Self::Jaccard,
        Self::SparseJaccard,
        Self::Angle,
        Self::NormalizedAngle,
        Self::Cosine,
        Self::NormalizedCosine,
    ];

    /// Canonical name accepted by [`DistanceType::from_str`].
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::L1 => "L1",
            Self::L2 => "L2",
            Self::NormalizedL2 => "Normalized L2",
            Self::Hamming => "Hamming",
            Self::Jaccard => "Jaccard",
            Self::SparseJaccard => "Sparse Jaccard",
            Self::Angle => "Angle",
            Self::NormalizedAngle => "Normalized Angle",
            Self::Cosine => "Cosine",
            Self::NormalizedCosine => "Normalized Cosine",
        }
    }

    /// Whether stored and query vectors are scaled to unit length.
    #[must_use]
    pub const fn normalizes(self) -> bool {
        matches!(
            self,
            Self::NormalizedL2 | Self::NormalizedAngle | Self::NormalizedCosine
        )
    }

    /// Whether the metric is defined for `object_type`.
    #[must_use]
    pub const fn supports(self, object_type: ObjectType) -> bool {
        match self {
            Self::NormalizedL2 | Self::NormalizedAngle | Self::NormalizedCosine => {
                matches!(object_type, ObjectType::Float | ObjectType::Float16)
            }
            Self::Hamming => matches!(object_type, ObjectType::Uint8),
            Self::SparseJaccard => matches!(object_type, ObjectType::Float),
            Self::L1 | Self::L2 | Self::Jaccard | Self::Angle | Self::Cosine => true,
        }
    }
}

impl fmt::Display for DistanceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DistanceType {
    type Err = IndexError;

    fn from_str(value: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|candidate| candidate.as_str() == value)
            .ok_or_else(|| IndexError::invalid(format!("unknown distance type `{value}`")))
    }
}

/// Number of edges traversed per node during a search.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum EdgeBound {
    /// Use the index's search-time edge bound.
    #[default]
    Default,
    /// Traverse every edge.
    Unlimited,
    /// Traverse at most this many of the closest edges.
    Limited(NonZeroUsize),
}

impl EdgeBound {
    /// Maps the signed convention used on the command line: negative selects
    /// the default, zero is unlimited.
    #[must_use]
    pub fn from_signed(value: i64) -> Self {
        match usize::try_from(value) {
            Err(_) => Self::Default,
            Ok(count) => NonZeroUsize::new(count).map_or(Self::Unlimited, Self::Limited),
        }
    }

    pub(crate) fn resolve(self, property: &Property) -> Option<usize> {
        match self {
            Self::Default => NonZeroUsize::new(property.edge_size_for_search).map(NonZeroUsize::get),
            Self::Unlimited => None,
            Self::Limited(count) => Some(count.get()),
        }
    }
}

/// Immutable description of an index.
///
/// # Examples
/// ```
/// use grove_core::{DistanceType, ObjectType, Property};
///
/// let property = Property::new(128, ObjectType::Float, DistanceType::L2)
///     .expect("valid property")
///     .with_edge_size_for_creation(16);
/// assert_eq!(property.dimension(), 128);
/// assert_eq!(property.edge_size_for_creation(), 16);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    dimension: usize,
    object_type: ObjectType,
    distance_type: DistanceType,
    edge_size_for_creation: usize,
    edge_size_for_search: usize,
}

impl Property {
    /// Creates a property with default edge bounds.
    ///
    /// # Errors
    /// Returns [`IndexError::InvalidConfiguration`] when the dimension is zero
    /// or the metric is not defined for the object type.
    pub fn new(dimension: usize, object_type: ObjectType, distance_type: DistanceType) -> Result<Self> {
        let property = Self {
            dimension,
            object_type,
            distance_type,
            edge_size_for_creation: DEFAULT_EDGE_SIZE_FOR_CREATION,
            edge_size_for_search: DEFAULT_EDGE_SIZE_FOR_SEARCH,
        };
        property.validate()?;
        Ok(property)
    }

    /// Builds a property from the textual names used by the command line.
    ///
    /// # Errors
    /// Returns [`IndexError::InvalidConfiguration`] for unknown names, invalid
    /// combinations, a zero dimension, or a zero creation bound.
    pub fn parse(
        dimension: usize,
        edge_size_for_creation: usize,
        edge_size_for_search: usize,
        distance_name: &str,
        object_name: &str,
    ) -> Result<Self> {
        let property = Self::new(dimension, object_name.parse()?, distance_name.parse()?)?
            .with_edge_size_for_creation(edge_size_for_creation)
            .with_edge_size_for_search(edge_size_for_search);
        property.validate()?;
        Ok(property)
    }

    /// Overrides the number of edges kept per node during construction.
    #[must_use]
    pub const fn with_edge_size_for_creation(mut self, edges: usize) -> Self {
        self.edge_size_for_creation = edges;
        self
    }

    /// Overrides the number of edges traversed per node during search; zero
    /// traverses every edge.
    #[must_use]
    pub const fn with_edge_size_for_search(mut self, edges: usize) -> Self {
        self.edge_size_for_search = edges;
        self
    }

    /// Checks every field.
    ///
    /// # Errors
    /// Returns [`IndexError::InvalidConfiguration`] describing the first
    /// rejected field.
    pub fn validate(&self) -> Result<()> {
        if self.dimension == 0 {
            return Err(IndexError::invalid("dimension must be at least 1"));
        }
        if self.edge_size_for_creation == 0 {
            return Err(IndexError::invalid(
                "edge_size_for_creation must be at least 1",
            ));
        }
        if !self.distance_type.supports(self.object_type) {
            return Err(IndexError::invalid(format!(
                "distance type `{}` is not defined for object type `{}`",
                self.distance_type, self.object_type
            )));
        }
        Ok(())
    }

    pub(crate) fn ensure_compatible(&self, other: &Self) -> Result<()> {
        if self.dimension != other.dimension
            || self.object_type != other.object_type
            || self.distance_type != other.distance_type
        {
            return Err(IndexError::invalid(format!(
                "incompatible index: expected {}-d {} / {}, found {}-d {} / {}",
                self.dimension,
                self.object_type,
                self.distance_type,
                other.dimension,
                other.object_type,
                other.distance_type
            )));
        }
        Ok(())
    }

    /// Number of elements per object.
    #[must_use]
    #[rustfmt::skip]
    pub const fn dimension(&self) -> usize { self.dimension }

    /// Element representation.
    #[must_use]
    #[rustfmt::skip]
    pub const fn object_type(&self) -> ObjectType { self.object_type }

    /// Metric.
    #[must_use]
    #[rustfmt::skip]
    pub const fn distance_type(&self) -> DistanceType { self.distance_type }

    /// Edges kept per node during construction.
    #[must_use]
    #[rustfmt::skip]
    pub const fn edge_size_for_creation(&self) -> usize { self.edge_size_for_creation }

    /// Edges traversed per node during search (zero: all).
    #[must_use]
    #[rustfmt::skip]
    pub const fn edge_size_for_search(&self) -> usize { self.edge_size_for_search }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("L1", DistanceType::L1)]
    #[case("Normalized L2", DistanceType::NormalizedL2)]
    #[case("Sparse Jaccard", DistanceType::SparseJaccard)]
    #[case("Normalized Cosine", DistanceType::NormalizedCosine)]
    fn parses_distance_names(#[case] name: &str, #[case] expected: DistanceType) {
        assert_eq!(name.parse::<DistanceType>().expect("known name"), expected);
        assert_eq!(expected.as_str(), name);
    }

    #[rstest]
    #[case("float", ObjectType::Float)]
    #[case("Byte", ObjectType::Uint8)]
    #[case("float16", ObjectType::Float16)]
    fn parses_object_names(#[case] name: &str, #[case] expected: ObjectType) {
        assert_eq!(name.parse::<ObjectType>().expect("known name"), expected);
    }

    #[test]
    fn rejects_unknown_names() {
        let error = "Manhattan".parse::<DistanceType>().expect_err("unknown name");
        assert!(matches!(error, IndexError::InvalidConfiguration { .. }));
    }

    #[rstest]
    #[case(DistanceType::Hamming, ObjectType::Float)]
    #[case(DistanceType::NormalizedL2, ObjectType::Uint8)]
    #[case(DistanceType::SparseJaccard, ObjectType::Float16)]
    fn rejects_invalid_combinations(#[case] distance: DistanceType, #[case] object: ObjectType) {
        let error = Property::new(4, object, distance).expect_err("combination must fail");
        assert!(matches!(error, IndexError::InvalidConfiguration { .. }));
    }

    #[test]
    fn rejects_zero_dimension_and_creation_bound() {
        assert!(Property::new(0, ObjectType::Float, DistanceType::L2).is_err());
        assert!(Property::parse(4, 0, 10, "L2", "Float").is_err());
    }

    #[rstest]
    #[case(-1, EdgeBound::Default)]
    #[case(0, EdgeBound::Unlimited)]
    #[case(7, EdgeBound::Limited(NonZeroUsize::new(7).expect("non-zero")))]
    fn maps_signed_edge_bounds(#[case] raw: i64, #[case] expected: EdgeBound) {
        assert_eq!(EdgeBound::from_signed(raw), expected);
    }

    #[test]
    fn default_edge_bound_follows_property() {
        let property = Property::new(2, ObjectType::Float, DistanceType::L2)
            .expect("valid")
            .with_edge_size_for_search(0);
        assert_eq!(EdgeBound::Default.resolve(&property), None);
        let bounded = property.with_edge_size_for_search(5);
        assert_eq!(EdgeBound::Default.resolve(&bounded), Some(5));
    }
}
