//! Append-only, tombstoned object storage.

use half::f16;
use serde::{Deserialize, Serialize};

use super::element::{Element, encode};
use crate::distance::{Kernel, kernel_for};
use crate::error::{IndexError, ObjectError, Result};
use crate::property::{DistanceType, ObjectType, Property};

/// Contiguous row-major storage for one element representation.
#[derive(Clone, Debug)]
pub(crate) struct TypedStore<T: Element> {
    dimension: usize,
    distance_type: DistanceType,
    data: Vec<T>,
    kernel: Kernel<T>,
}

impl<T: Element> TypedStore<T> {
    fn new(dimension: usize, distance_type: DistanceType, data: Vec<T>) -> Self {
        Self {
            dimension,
            distance_type,
            data,
            kernel: kernel_for::<T>(distance_type),
        }
    }

    pub(crate) fn vector(&self, id: usize) -> Option<&[T]> {
        let start = id.checked_mul(self.dimension)?;
        self.data.get(start..start.checked_add(self.dimension)?)
    }

    pub(crate) fn encode<V: Copy + Into<f64>>(&self, values: &[V]) -> Result<Vec<T>, ObjectError> {
        encode(values, self.dimension, self.distance_type)
    }

    #[inline]
    pub(crate) fn distance(&self, left: &[T], right: &[T]) -> f32 {
        (self.kernel)(left, right)
    }

    fn push(&mut self, encoded: &[T]) {
        self.data.extend_from_slice(encoded);
    }

    fn reserve(&mut self, objects: usize) {
        self.data
            .reserve(objects.saturating_mul(self.dimension));
    }
}

/// Storage for whichever representation the index was created with.
#[derive(Clone, Debug)]
pub(crate) enum ObjectStore {
    Float(TypedStore<f32>),
    Uint8(TypedStore<u8>),
    Float16(TypedStore<f16>),
}

/// Outcome of tombstoning a single id.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Removal {
    Removed,
    AlreadyRemoved,
    NotFound,
}

/// Serialisable form of the repository.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct ObjectsImage {
    removed: Vec<bool>,
    elements: StoredElements,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
enum StoredElements {
    Float(Vec<f32>),
    Uint8(Vec<u8>),
    Float16(Vec<u16>),
}

/// Id-addressed vector store. Ids are dense and never reused.
#[derive(Clone, Debug)]
pub(crate) struct ObjectRepository {
    store: ObjectStore,
    removed: Vec<bool>,
    live: usize,
}

impl ObjectRepository {
    pub(crate) fn new(property: &Property) -> Self {
        let (dimension, distance_type) = (property.dimension(), property.distance_type());
        let store = match property.object_type() {
            ObjectType::Float => ObjectStore::Float(TypedStore::new(dimension, distance_type, Vec::new())),
            ObjectType::Uint8 => ObjectStore::Uint8(TypedStore::new(dimension, distance_type, Vec::new())),
            ObjectType::Float16 => {
                ObjectStore::Float16(TypedStore::new(dimension, distance_type, Vec::new()))
            }
        };
        Self {
            store,
            removed: Vec::new(),
            live: 0,
        }
    }

    /// Validates and stores `values`, returning the new id.
    pub(crate) fn append<V: Copy + Into<f64>>(&mut self, values: &[V]) -> Result<usize, ObjectError> {
        match &mut self.store {
            ObjectStore::Float(store) => {
                let encoded = store.encode(values)?;
                store.push(&encoded);
            }
            ObjectStore::Uint8(store) => {
                let encoded = store.encode(values)?;
                store.push(&encoded);
            }
            ObjectStore::Float16(store) => {
                let encoded = store.encode(values)?;
                store.push(&encoded);
            }
        }
        let id = self.removed.len();
        self.removed.push(false);
        self.live += 1;
        Ok(id)
    }

    pub(crate) fn get(&self, id: usize) -> Result<Vec<f32>> {
        match self.removed.get(id) {
            None => return Err(IndexError::NotFound { id }),
            Some(true) => return Err(IndexError::Removed { id }),
            Some(false) => {}
        }
        self.stored_values(id)
            .ok_or_else(|| IndexError::GraphInvariant {
                message: format!("object {id} has a liveness flag but no elements"),
            })
    }

    /// Stored elements widened to `f32`, regardless of liveness.
    pub(crate) fn stored_values(&self, id: usize) -> Option<Vec<f32>> {
        fn widen<T: Element>(store: &TypedStore<T>, id: usize) -> Option<Vec<f32>> {
            store
                .vector(id)
                .map(|values| values.iter().map(|value| value.to_f32()).collect())
        }
        match &self.store {
            ObjectStore::Float(store) => widen(store, id),
            ObjectStore::Uint8(store) => widen(store, id),
            ObjectStore::Float16(store) => widen(store, id),
        }
    }

    pub(crate) fn remove(&mut self, id: usize) -> Removal {
        match self.removed.get_mut(id) {
            None => Removal::NotFound,
            Some(true) => Removal::AlreadyRemoved,
            Some(flag) => {
                *flag = true;
                self.live -= 1;
                Removal::Removed
            }
        }
    }

    /// Re-applies a tombstone while restoring exported data.
    pub(crate) fn mark_removed(&mut self, id: usize) {
        self.remove(id);
    }

    pub(crate) fn reserve(&mut self, objects: usize) {
        self.removed.reserve(objects);
        match &mut self.store {
            ObjectStore::Float(store) => store.reserve(objects),
            ObjectStore::Uint8(store) => store.reserve(objects),
            ObjectStore::Float16(store) => store.reserve(objects),
        }
    }

    pub(crate) fn is_live(&self, id: usize) -> bool {
        matches!(self.removed.get(id), Some(false))
    }

    pub(crate) fn live_ids(&self) -> impl Iterator<Item = usize> + '_ {
        self.removed
            .iter()
            .enumerate()
            .filter_map(|(id, removed)| (!removed).then_some(id))
    }

    #[rustfmt::skip]
    pub(crate) fn count_live(&self) -> usize { self.live }

    /// Every slot ever assigned, tombstones included.
    #[rustfmt::skip]
    pub(crate) fn capacity(&self) -> usize { self.removed.len() }

    #[rustfmt::skip]
    pub(crate) fn removed(&self) -> &[bool] { &self.removed }

    #[rustfmt::skip]
    pub(crate) fn store(&self) -> &ObjectStore { &self.store }

    pub(crate) fn image(&self) -> ObjectsImage {
        let elements = match &self.store {
            ObjectStore::Float(store) => StoredElements::Float(store.data.clone()),
            ObjectStore::Uint8(store) => StoredElements::Uint8(store.data.clone()),
            ObjectStore::Float16(store) => {
                StoredElements::Float16(store.data.iter().map(|value| value.to_bits()).collect())
            }
        };
        ObjectsImage {
            removed: self.removed.clone(),
            elements,
        }
    }

    /// Rebuilds a repository from a snapshot image, checking it against the
    /// property it was saved with.
    pub(crate) fn from_image(property: &Property, image: ObjectsImage) -> std::result::Result<Self, String> {
        let (dimension, distance_type) = (property.dimension(), property.distance_type());
        let expected_len = image.removed.len().saturating_mul(dimension);
        let store = match (property.object_type(), image.elements) {
            (ObjectType::Float, StoredElements::Float(data)) if data.len() == expected_len => {
                ObjectStore::Float(TypedStore::new(dimension, distance_type, data))
            }
            (ObjectType::Uint8, StoredElements::Uint8(data)) if data.len() == expected_len => {
                ObjectStore::Uint8(TypedStore::new(dimension, distance_type, data))
            }
            (ObjectType::Float16, StoredElements::Float16(bits)) if bits.len() == expected_len => {
                let data = bits.into_iter().map(f16::from_bits).collect();
                ObjectStore::Float16(TypedStore::new(dimension, distance_type, data))
            }
            _ => {
                return Err(format!(
                    "object data does not match a {dimension}-d {} repository of {} slots",
                    property.object_type(),
                    image.removed.len()
                ));
            }
        };
        let live = image.removed.iter().filter(|removed| !**removed).count();
        Ok(Self {
            store,
            removed: image.removed,
            live,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn repository() -> ObjectRepository {
        let property = Property::new(3, ObjectType::Float, DistanceType::L2).expect("valid property");
        ObjectRepository::new(&property)
    }

    #[rstest]
    fn assigns_dense_ids(mut repository: ObjectRepository) {
        assert_eq!(repository.append(&[1.0_f32, 2.0, 3.0]).expect("append"), 0);
        assert_eq!(repository.append(&[4_u8, 5, 6]).expect("append"), 1);
        assert_eq!(repository.count_live(), 2);
        assert_eq!(repository.get(1).expect("live"), vec![4.0, 5.0, 6.0]);
    }

    #[rstest]
    fn rejected_vectors_do_not_consume_ids(mut repository: ObjectRepository) {
        assert!(repository.append(&[1.0_f64, 2.0]).is_err());
        assert!(repository.append(&[1.0_f64, f64::INFINITY, 2.0]).is_err());
        assert_eq!(repository.append(&[0.0_f64, 0.0, 0.0]).expect("append"), 0);
    }

    #[rstest]
    fn remove_reports_each_outcome(mut repository: ObjectRepository) {
        repository.append(&[1.0_f32, 2.0, 3.0]).expect("append");
        assert_eq!(repository.remove(0), Removal::Removed);
        assert_eq!(repository.remove(0), Removal::AlreadyRemoved);
        assert_eq!(repository.remove(9), Removal::NotFound);
        assert_eq!(repository.count_live(), 0);
        assert_eq!(repository.capacity(), 1);
        assert!(matches!(repository.get(0), Err(IndexError::Removed { id: 0 })));
        assert!(matches!(repository.get(5), Err(IndexError::NotFound { id: 5 })));
    }

    #[test]
    fn images_round_trip_half_floats() {
        let property =
            Property::new(2, ObjectType::Float16, DistanceType::L1).expect("valid property");
        let mut repository = ObjectRepository::new(&property);
        repository.append(&[0.5_f32, -1.25]).expect("append");
        repository.remove(0);
        let restored =
            ObjectRepository::from_image(&property, repository.image()).expect("image decodes");
        assert_eq!(restored.stored_values(0), Some(vec![0.5, -1.25]));
        assert!(!restored.is_live(0));
    }

    #[test]
    fn images_reject_mismatched_layouts() {
        let property = Property::new(2, ObjectType::Float, DistanceType::L1).expect("valid");
        let mut repository = ObjectRepository::new(&property);
        repository.append(&[0.5_f32, -1.25]).expect("append");
        let wider = Property::new(3, ObjectType::Float, DistanceType::L1).expect("valid");
        assert!(ObjectRepository::from_image(&wider, repository.image()).is_err());
    }
}
