//! Object repository: validated, append-only vector storage addressed by id.

mod element;
mod repository;
mod space;

pub(crate) use self::element::{Element, prepare};
pub(crate) use self::repository::{ObjectRepository, ObjectStore, ObjectsImage, Removal};
pub(crate) use self::space::Space;

/// Evaluates `$body` with `$space` bound to a typed [`Space`] over the
/// repository's element representation.
macro_rules! with_space {
    ($objects:expr, |$space:ident| $body:expr) => {{
        let objects = $objects;
        match objects.store() {
            $crate::object::ObjectStore::Float(store) => {
                let $space = $crate::object::Space::new(store, objects.removed());
                $body
            }
            $crate::object::ObjectStore::Uint8(store) => {
                let $space = $crate::object::Space::new(store, objects.removed());
                $body
            }
            $crate::object::ObjectStore::Float16(store) => {
                let $space = $crate::object::Space::new(store, objects.removed());
                $body
            }
        }
    }};
}

pub(crate) use with_space;
