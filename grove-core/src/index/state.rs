//! Contents of an open index and the operations that span its components.

use std::path::PathBuf;

use rayon::ThreadPool;

use crate::accuracy::AccuracyTable;
use crate::builder::{
    Linker, RefineParams, RefineSummary, Refiner, RemovalPolicy, RemovalReport, excise,
    worker_pool,
};
use crate::error::{IndexError, Result};
use crate::graph::GraphRepository;
use crate::object::{ObjectRepository, Removal, with_space};
use crate::persist::Snapshot;
use crate::persist::snapshot::SNAPSHOT_FILE;
use crate::property::Property;
use crate::search::{DEFAULT_EPSILON, SearchDefaults, SearchOutcome, SearchParams, Seeding, Traversal};
use crate::tree::VpTree;

#[derive(Debug)]
pub(crate) struct IndexState {
    pub(crate) property: Property,
    pub(crate) objects: ObjectRepository,
    pub(crate) graph: GraphRepository,
    pub(crate) tree: VpTree,
    pub(crate) accuracy: AccuracyTable,
    pub(crate) defaults: SearchDefaults,
    pub(crate) path: PathBuf,
}

impl IndexState {
    pub(crate) fn empty(path: PathBuf, property: Property) -> Self {
        Self {
            objects: ObjectRepository::new(&property),
            property,
            graph: GraphRepository::default(),
            tree: VpTree::default(),
            accuracy: AccuracyTable::default(),
            defaults: SearchDefaults::default(),
            path,
        }
    }

    pub(crate) fn from_snapshot(path: PathBuf, snapshot: Snapshot) -> Result<Self> {
        let file = path.join(SNAPSHOT_FILE);
        let property = snapshot.property;
        let objects = ObjectRepository::from_image(&property, snapshot.objects)
            .map_err(|reason| IndexError::corrupt(&file, reason))?;
        let graph = GraphRepository::from_image(
            snapshot.graph,
            objects.capacity(),
            property.edge_size_for_creation(),
        )
        .map_err(|reason| IndexError::corrupt(&file, reason))?;
        Ok(Self {
            property,
            objects,
            graph,
            tree: snapshot.tree,
            accuracy: snapshot.accuracy,
            defaults: SearchDefaults::default(),
            path,
        })
    }

    pub(crate) fn snapshot(&self) -> Result<Snapshot> {
        Ok(Snapshot {
            property: self.property,
            objects: self.objects.image(),
            graph: self.graph.image()?,
            tree: self.tree.clone(),
            accuracy: self.accuracy.clone(),
        })
    }

    fn creation_bound(&self) -> usize {
        self.property.edge_size_for_creation()
    }

    pub(crate) fn reserve(&mut self, repository_size_hint: usize) {
        let additional = repository_size_hint.saturating_sub(self.objects.capacity());
        self.objects.reserve(additional);
        self.graph.reserve(additional);
    }

    /// Links a freshly appended object and adds it to the tree.
    pub(crate) fn link_one(&mut self, id: usize, seeding: Seeding) -> Result<usize> {
        self.graph.ensure_slots(self.objects.capacity());
        let bound = self.creation_bound();
        let Self {
            objects,
            graph,
            tree,
            ..
        } = self;
        with_space!(&*objects, |space| {
            let traversal = Traversal {
                space,
                graph: &*graph,
            };
            Linker::new(traversal, seeding, bound).link_one(tree, id)
        })
    }

    /// Links every live object that has no adjacency list yet, growing the
    /// tree round by round.
    pub(crate) fn link_pending(&mut self, seeding: Seeding, pool: &ThreadPool) -> Result<usize> {
        self.graph.ensure_slots(self.objects.capacity());
        let mut pending = Vec::new();
        for id in self.objects.live_ids() {
            if !self.graph.is_linked(id)? {
                pending.push(id);
            }
        }
        if pending.is_empty() {
            return Ok(0);
        }
        let bound = self.creation_bound();
        let Self {
            objects,
            graph,
            tree,
            ..
        } = self;
        with_space!(&*objects, |space| {
            let traversal = Traversal {
                space,
                graph: &*graph,
            };
            Linker::new(traversal, seeding, bound).link_all(tree, &pending, pool)
        })
    }

    /// Rebuilds a balanced tree over the live, linked objects.
    pub(crate) fn rebuild_tree(&mut self) -> Result<()> {
        let mut ids = self.graph.linked_ids()?;
        ids.retain(|id| self.objects.is_live(*id));
        self.tree = with_space!(&self.objects, |space| VpTree::build(space, ids));
        Ok(())
    }

    pub(crate) fn recalibrate(&mut self, seeding: Seeding, pool: &ThreadPool) -> Result<()> {
        let edge_limit = self.defaults.edge_bound().resolve(&self.property);
        let accuracy = with_space!(&self.objects, |space| {
            let traversal = Traversal {
                space,
                graph: &self.graph,
            };
            AccuracyTable::calibrate(&traversal, seeding, &self.tree, edge_limit, pool)
        })?;
        self.accuracy = accuracy;
        Ok(())
    }

    pub(crate) fn search<V: Copy + Into<f64>>(
        &self,
        query: &[V],
        params: &SearchParams,
        seeding: Seeding,
    ) -> Result<SearchOutcome> {
        let limits = self.defaults.resolve(params, &self.property, &self.accuracy);
        let found = with_space!(&self.objects, |space| {
            let query = space.encode(query)?;
            let traversal = Traversal {
                space,
                graph: &self.graph,
            };
            traversal.seeded_search(seeding, &self.tree, &query, &limits)
        })?;
        Ok(SearchOutcome::new(
            found.neighbours,
            found.distance_computations,
            limits.epsilon,
        ))
    }

    /// Tombstones `ids` and applies `policy` to the graph. Returns the report
    /// and the number of repaired nodes.
    pub(crate) fn remove(
        &mut self,
        ids: &[usize],
        policy: RemovalPolicy,
    ) -> Result<(RemovalReport, usize)> {
        let mut report = RemovalReport::default();
        let mut removed = Vec::new();
        for &id in ids {
            match self.objects.remove(id) {
                Removal::Removed => {
                    removed.push(id);
                    report.record_removed(id);
                }
                Removal::AlreadyRemoved => report.record_already_removed(id),
                Removal::NotFound => report.record_not_found(id),
            }
        }
        // Tree leaves keep removed ids until a rebuild drops them.
        let live = self.objects.count_live();
        if !removed.is_empty() && self.tree.len().saturating_sub(live) > live {
            self.rebuild_tree()?;
        }
        if policy == RemovalPolicy::Lazy || removed.is_empty() {
            return Ok((report, 0));
        }

        let bound = self.creation_bound();
        let Self { objects, graph, .. } = self;
        let repaired = with_space!(&*objects, |space| excise(graph, space, &removed, bound))?;
        Ok((report, repaired))
    }

    pub(crate) fn refine(
        &self,
        params: &RefineParams,
        seeding: Seeding,
        verbose: bool,
    ) -> Result<RefineSummary> {
        let epsilon = match params.expected_accuracy() {
            Some(target) => self.accuracy.epsilon_for(target),
            None if params.epsilon().is_finite() && params.epsilon() > -1.0 => params.epsilon(),
            None => DEFAULT_EPSILON,
        };
        let mut ids = self.graph.linked_ids()?;
        ids.retain(|id| self.objects.is_live(*id));
        let pool = worker_pool(params.thread_count())?;
        with_space!(&self.objects, |space| {
            let refiner = Refiner {
                traversal: Traversal {
                    space,
                    graph: &self.graph,
                },
                seeding,
                tree: &self.tree,
                bound: self.creation_bound(),
                verbose,
            };
            refiner.refine(&ids, params, epsilon, &pool)
        })
    }

    /// Replaces objects and graph wholesale, then rebuilds derived structures.
    pub(crate) fn replace_contents(
        &mut self,
        objects: ObjectRepository,
        graph: GraphRepository,
        seeding: Seeding,
        pool: &ThreadPool,
    ) -> Result<()> {
        self.objects = objects;
        self.graph = graph;
        self.graph.ensure_slots(self.objects.capacity());
        self.rebuild_tree()?;
        self.recalibrate(seeding, pool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::{DistanceType, ObjectType};
    use grove_test_support::datasets;
    use rstest::rstest;

    fn appended_state(count: usize) -> IndexState {
        let property = Property::new(3, ObjectType::Float, DistanceType::L2).expect("valid property");
        let mut state = IndexState::empty(PathBuf::from("unsaved"), property);
        for point in datasets::uniform(count, 3, 13) {
            state.objects.append(&point).expect("valid point");
        }
        state
    }

    #[rstest]
    fn pending_links_grow_the_tree_before_any_rebuild() {
        let mut state = appended_state(300);
        let pool = worker_pool(2).expect("pool");
        state.link_pending(Seeding::Tree, &pool).expect("link");
        assert_eq!(state.tree.len(), 300);
        assert_eq!(state.link_pending(Seeding::Tree, &pool).expect("relink"), 0);
    }

    #[rstest]
    #[case::eager(RemovalPolicy::Eager)]
    #[case::lazy(RemovalPolicy::Lazy)]
    fn removals_rebuild_the_tree_once_most_members_are_gone(#[case] policy: RemovalPolicy) {
        let mut state = appended_state(100);
        let pool = worker_pool(2).expect("pool");
        state.link_pending(Seeding::Tree, &pool).expect("link");

        let few: Vec<usize> = (0..30).collect();
        state.remove(&few, policy).expect("remove");
        assert_eq!(state.tree.len(), 100);

        let many: Vec<usize> = (30..60).collect();
        state.remove(&many, policy).expect("remove");
        assert_eq!(state.tree.len(), 40);
        let outcome = state
            .search(&[0.0_f32, 0.0, 0.0], &SearchParams::new(5), Seeding::Tree)
            .expect("search");
        assert!(outcome.ids().iter().all(|id| *id >= 60));
    }
}
