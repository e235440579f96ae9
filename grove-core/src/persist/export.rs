//! Portable JSON export and import.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{IndexError, Result};
use crate::graph::{Edge, GraphImage, GraphRepository};
use crate::object::ObjectRepository;
use crate::property::Property;

const EXPORT_FORMAT: &str = "grove-export";
const EXPORT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ExportDocument {
    format: String,
    version: u32,
    pub(crate) property: Property,
    objects: Vec<ExportedObject>,
    graph: Vec<ExportedNode>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ExportedObject {
    id: usize,
    removed: bool,
    vector: Vec<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ExportedNode {
    id: usize,
    edges: Vec<(usize, f32)>,
}

impl ExportDocument {
    pub(crate) fn capture(
        property: Property,
        objects: &ObjectRepository,
        graph: &GraphRepository,
    ) -> Result<Self> {
        let objects = (0..objects.capacity())
            .map(|id| {
                let vector = objects.stored_values(id).ok_or_else(|| IndexError::GraphInvariant {
                    message: format!("object {id} has a liveness flag but no elements"),
                })?;
                Ok(ExportedObject {
                    id,
                    removed: !objects.is_live(id),
                    vector: vector.into_iter().map(f64::from).collect(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let graph = graph
            .image()?
            .nodes
            .into_iter()
            .enumerate()
            .filter_map(|(id, edges)| {
                edges.map(|edges| ExportedNode {
                    id,
                    edges: edges.iter().map(|edge| (edge.id, edge.distance)).collect(),
                })
            })
            .collect();
        Ok(Self {
            format: EXPORT_FORMAT.to_owned(),
            version: EXPORT_VERSION,
            property,
            objects,
            graph,
        })
    }

    /// Rebuilds repositories for `target`, which must agree with the exported
    /// dimension, object type, and distance type.
    pub(crate) fn restore(
        self,
        target: &Property,
        path: &Path,
    ) -> Result<(ObjectRepository, GraphRepository)> {
        target.ensure_compatible(&self.property)?;

        let mut objects = ObjectRepository::new(target);
        objects.reserve(self.objects.len());
        for (expected, object) in self.objects.into_iter().enumerate() {
            if object.id != expected {
                return Err(IndexError::corrupt(
                    path,
                    format!("object ids must be dense; expected {expected}, found {}", object.id),
                ));
            }
            objects.append(&object.vector).map_err(|error| {
                IndexError::corrupt(path, format!("object {expected}: {error}"))
            })?;
            if object.removed {
                objects.mark_removed(expected);
            }
        }

        let capacity = objects.capacity();
        let mut image = GraphImage {
            nodes: vec![None; capacity],
        };
        for node in self.graph {
            let slot = image.nodes.get_mut(node.id).ok_or_else(|| {
                IndexError::corrupt(path, format!("graph node {} has no object", node.id))
            })?;
            *slot = Some(
                node.edges
                    .into_iter()
                    .map(|(id, distance)| Edge::new(id, distance))
                    .collect(),
            );
        }
        let graph = GraphRepository::from_image(image, capacity, target.edge_size_for_creation())
            .map_err(|reason| IndexError::corrupt(path, reason))?;
        Ok((objects, graph))
    }
}

pub(crate) fn write(path: &Path, document: &ExportDocument) -> Result<()> {
    let json = serde_json::to_vec(document)
        .map_err(|error| IndexError::io(path, std::io::Error::other(error)))?;
    fs::write(path, json).map_err(|error| IndexError::io(path, error))?;
    debug!(
        path = %path.display(),
        objects = document.objects.len(),
        nodes = document.graph.len(),
        "wrote export document"
    );
    Ok(())
}

pub(crate) fn read(path: &Path) -> Result<ExportDocument> {
    let raw = fs::read(path).map_err(|error| IndexError::io(path, error))?;
    let document: ExportDocument =
        serde_json::from_slice(&raw).map_err(|error| IndexError::corrupt(path, error))?;
    if document.format != EXPORT_FORMAT || document.version != EXPORT_VERSION {
        return Err(IndexError::corrupt(
            path,
            format!(
                "unsupported export `{}` version {}",
                document.format, document.version
            ),
        ));
    }
    Ok(document)
}
