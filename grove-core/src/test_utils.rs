//! Shared test utilities for `grove-core`.

use grove_test_support::ci::property_test_profile::ProptestRunProfile;
use proptest::test_runner::Config as ProptestConfig;

use crate::builder::{Linker, worker_pool};
use crate::graph::GraphRepository;
use crate::object::{ObjectRepository, with_space};
use crate::property::{DistanceType, ObjectType, Property};
use crate::search::{Seeding, Traversal};
use crate::tree::VpTree;

/// Builds a proptest configuration from the shared CI profile.
#[must_use]
pub(crate) fn suite_proptest_config(default_cases: u32) -> ProptestConfig {
    let profile = ProptestRunProfile::load(default_cases, false);
    ProptestConfig {
        cases: profile.cases(),
        fork: profile.fork(),
        ..ProptestConfig::default()
    }
}

/// Index components assembled without an `Index` handle.
pub(crate) struct Fixture {
    pub(crate) property: Property,
    pub(crate) objects: ObjectRepository,
    pub(crate) graph: GraphRepository,
    pub(crate) tree: VpTree,
}

impl Fixture {
    /// L2 float components holding `points`, nothing linked yet.
    pub(crate) fn new(points: &[Vec<f32>], bound: usize) -> Self {
        let dimension = points.first().map_or(1, Vec::len);
        let property = Property::new(dimension, ObjectType::Float, DistanceType::L2)
            .expect("valid property")
            .with_edge_size_for_creation(bound);
        let mut objects = ObjectRepository::new(&property);
        for point in points {
            objects.append(point).expect("valid point");
        }
        let mut graph = GraphRepository::default();
        graph.ensure_slots(objects.capacity());
        Self {
            property,
            objects,
            graph,
            tree: VpTree::default(),
        }
    }

    pub(crate) fn bound(&self) -> usize {
        self.property.edge_size_for_creation()
    }

    /// Links every live object with `threads` workers and rebuilds the tree.
    pub(crate) fn link_all(&mut self, threads: usize) -> usize {
        let pool = worker_pool(threads).expect("pool");
        let ids: Vec<usize> = self.objects.live_ids().collect();
        let bound = self.bound();
        let Self {
            objects,
            graph,
            tree,
            ..
        } = self;
        let computations = with_space!(&*objects, |space| {
            let traversal = Traversal {
                space,
                graph: &*graph,
            };
            Linker::new(traversal, Seeding::Tree, bound)
                .link_all(tree, &ids, &pool)
                .expect("link")
        });
        self.tree = with_space!(&self.objects, |space| VpTree::build(space, space.live_ids().collect()));
        computations
    }

    /// Asserts every adjacency list is sorted, bounded, self-free, and points
    /// at known objects with the right distances.
    pub(crate) fn assert_well_formed(&self) {
        let bound = self.bound();
        with_space!(&self.objects, |space| {
            for id in self.graph.linked_ids().expect("ids") {
                let slot = self.graph.read(id).expect("slot");
                let node = slot.as_ref().expect("linked node");
                let edges = node.edges();
                assert!(edges.len() <= bound, "node {id} has {} edges", edges.len());
                assert!(
                    edges.windows(2).all(|pair| {
                        (pair[0].distance, pair[0].id) < (pair[1].distance, pair[1].id)
                    }),
                    "node {id} edges are not strictly ordered"
                );
                for edge in edges {
                    assert_ne!(edge.id, id, "node {id} links to itself");
                    let expected = space.between(id, edge.id);
                    assert!((edge.distance - expected).abs() <= 1e-4 * expected.max(1.0));
                }
            }
        });
    }
}
