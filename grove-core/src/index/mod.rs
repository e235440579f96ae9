//! The index handle: lifecycle, locking, and the public operations.

mod options;
mod state;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock, RwLockWriteGuard};

use tracing::{Span, field, info, instrument, warn};

pub use self::options::OpenOptions;
use self::state::IndexState;
use crate::builder::{
    BatchInsertOutcome, RefineParams, RefineSummary, RemovalReport, SkippedRow, worker_pool,
};
use crate::error::{IndexError, Result};
use crate::persist::{ExportDocument, export, snapshot};
use crate::property::Property;
use crate::search::{SearchDefaults, SearchOutcome, SearchParams};

const STATE_RESOURCE: &str = "index state";

fn poisoned<T>(_: PoisonError<T>) -> IndexError {
    IndexError::LockPoisoned {
        resource: STATE_RESOURCE,
    }
}

/// Handle to an approximate nearest-neighbour index stored in a directory.
///
/// Searches take a shared lock and may run concurrently from many threads;
/// mutations take an exclusive lock. After [`Index::close`], every operation
/// fails with [`IndexError::ClosedIndex`].
///
/// # Examples
/// ```
/// use grove_core::{DistanceType, Index, ObjectType, Property, SearchParams};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let dir = tempfile::tempdir()?;
/// let property = Property::new(4, ObjectType::Float, DistanceType::L2)?;
/// let index = Index::create(dir.path().join("points"), property)?;
///
/// index.insert(&[0.0_f32, 0.0, 0.0, 0.0])?;
/// index.insert(&[1.0_f32, 0.0, 0.0, 0.0])?;
/// index.insert(&[10.0_f32, 10.0, 10.0, 10.0])?;
///
/// let outcome = index.search(&[0.9_f32, 0.0, 0.0, 0.0], &SearchParams::new(2))?;
/// assert_eq!(outcome.ids(), vec![1, 0]);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Index {
    state: RwLock<Option<IndexState>>,
    options: OpenOptions,
    distance_computations: AtomicUsize,
}

impl Index {
    fn from_state(state: IndexState, options: OpenOptions) -> Self {
        Self {
            state: RwLock::new(Some(state)),
            options,
            distance_computations: AtomicUsize::new(0),
        }
    }

    /// Creates an empty index at `path` and writes its first snapshot.
    ///
    /// # Errors
    /// Returns [`IndexError::InvalidConfiguration`] when the property is
    /// invalid or an index already exists at `path`, and
    /// [`IndexError::Io`] when the directory cannot be written.
    #[instrument(
        name = "index.create",
        err,
        skip(path, property),
        fields(path = field::Empty, dimension = property.dimension()),
    )]
    pub fn create(path: impl AsRef<Path>, property: Property) -> Result<Self> {
        let path = path.as_ref();
        Span::current().record("path", field::display(path.display()));
        property.validate()?;
        if snapshot::exists(path) {
            return Err(IndexError::invalid(format!(
                "an index already exists at {}",
                path.display()
            )));
        }

        let state = IndexState::empty(path.to_path_buf(), property);
        snapshot::write(path, &state.snapshot()?)?;
        info!(
            distance = %property.distance_type(),
            object_type = %property.object_type(),
            "created index"
        );
        Ok(Self::from_state(state, OpenOptions::default()))
    }

    /// Opens the index stored at `path`.
    ///
    /// # Errors
    /// Returns [`IndexError::Io`] when the files cannot be read and
    /// [`IndexError::Corrupt`] when they fail to decode or disagree.
    #[instrument(
        name = "index.open",
        err,
        skip(path),
        fields(path = field::Empty),
    )]
    pub fn open(path: impl AsRef<Path>, options: OpenOptions) -> Result<Self> {
        let path = path.as_ref();
        Span::current().record("path", field::display(path.display()));
        let snapshot = snapshot::read(path)?;
        let state = IndexState::from_snapshot(path.to_path_buf(), snapshot)?;
        if options.verbose() {
            info!(
                objects = state.objects.count_live(),
                slots = state.objects.capacity(),
                "opened index"
            );
        }
        Ok(Self::from_state(state, options))
    }

    fn with_state<R>(&self, operation: impl FnOnce(&IndexState) -> Result<R>) -> Result<R> {
        let guard = self.state.read().map_err(poisoned)?;
        let state = guard.as_ref().ok_or(IndexError::ClosedIndex)?;
        operation(state)
    }

    fn write_state(&self) -> Result<RwLockWriteGuard<'_, Option<IndexState>>> {
        let guard = self.state.write().map_err(poisoned)?;
        if guard.is_none() {
            return Err(IndexError::ClosedIndex);
        }
        Ok(guard)
    }

    fn with_exclusive<R>(&self, operation: impl FnOnce(&mut IndexState) -> Result<R>) -> Result<R> {
        let mut guard = self.write_state()?;
        let state = guard.as_mut().ok_or(IndexError::ClosedIndex)?;
        operation(state)
    }

    fn mutate<R>(
        &self,
        name: &'static str,
        operation: impl FnOnce(&mut IndexState) -> Result<R>,
    ) -> Result<R> {
        self.with_exclusive(|state| {
            if self.options.read_only() {
                return Err(IndexError::ReadOnly { operation: name });
            }
            operation(state)
        })
    }

    /// Options this handle was opened with.
    #[must_use]
    #[rustfmt::skip]
    pub const fn options(&self) -> OpenOptions { self.options }

    /// Reports whether [`Index::close`] has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.read().map_or(true, |guard| guard.is_none())
    }

    /// The immutable property of the index.
    ///
    /// # Errors
    /// Returns [`IndexError::ClosedIndex`] after close.
    pub fn property(&self) -> Result<Property> {
        self.with_state(|state| Ok(state.property))
    }

    /// Directory the index was created in or opened from.
    ///
    /// # Errors
    /// Returns [`IndexError::ClosedIndex`] after close.
    pub fn path(&self) -> Result<PathBuf> {
        self.with_state(|state| Ok(state.path.clone()))
    }

    /// Validates, stores, and links one vector. Returns its id.
    ///
    /// # Errors
    /// Returns [`IndexError::InvalidObject`] when the vector has the wrong
    /// length, contains non-finite values, or does not fit the object type.
    #[instrument(name = "index.insert", err, skip_all, fields(dimension = vector.len()))]
    pub fn insert<V: Copy + Into<f64>>(&self, vector: &[V]) -> Result<usize> {
        self.mutate("insert", |state| {
            let id = state.objects.append(vector)?;
            let computations = state.link_one(id, self.options.seeding())?;
            self.distance_computations
                .store(computations, Ordering::Relaxed);
            Ok(id)
        })
    }

    /// Validates and stores one vector without linking it. A later
    /// [`Index::build`] links every appended object.
    ///
    /// # Errors
    /// Returns [`IndexError::InvalidObject`] for a rejected vector.
    pub fn append<V: Copy + Into<f64>>(&self, vector: &[V]) -> Result<usize> {
        self.mutate("append", |state| Ok(state.objects.append(vector)?))
    }

    /// Stores every valid row, then links all unlinked objects with
    /// `thread_count` workers (zero selects the available parallelism).
    ///
    /// Invalid rows are skipped and reported in the outcome; they never fail
    /// the batch.
    ///
    /// # Errors
    /// Returns [`IndexError::InvalidConfiguration`] when the worker pool cannot
    /// start.
    #[instrument(name = "index.batch_insert", err, skip_all, fields(rows = rows.len(), thread_count = thread_count))]
    pub fn batch_insert<R, V>(&self, rows: &[R], thread_count: usize) -> Result<BatchInsertOutcome>
    where
        R: AsRef<[V]>,
        V: Copy + Into<f64>,
    {
        self.mutate("batch_insert", |state| {
            state.reserve(state.objects.capacity() + rows.len());
            let mut ids = Vec::with_capacity(rows.len());
            let mut skipped = Vec::new();
            for (row, values) in rows.iter().enumerate() {
                match state.objects.append(values.as_ref()) {
                    Ok(id) => ids.push(id),
                    Err(error) => {
                        warn!(row, code = %error.code(), %error, "skipping invalid row");
                        skipped.push(SkippedRow { row, error });
                    }
                }
            }
            self.rebuild(state, thread_count)?;
            Ok(BatchInsertOutcome::new(ids, skipped))
        })
    }

    /// Links every unlinked object, rebuilds the seeding tree over the live
    /// objects, and recalibrates the accuracy table. Running it twice in a row
    /// changes nothing.
    ///
    /// # Errors
    /// Returns [`IndexError::InvalidConfiguration`] when the worker pool cannot
    /// start.
    #[instrument(name = "index.build", err, skip(self))]
    pub fn build(&self, thread_count: usize, repository_size_hint: usize) -> Result<()> {
        self.mutate("build", |state| {
            state.reserve(repository_size_hint);
            self.rebuild(state, thread_count).map(drop)
        })
    }

    fn rebuild(&self, state: &mut IndexState, thread_count: usize) -> Result<usize> {
        let pool = worker_pool(thread_count)?;
        let seeding = self.options.seeding();
        let computations = state.link_pending(seeding, &pool)?;
        state.rebuild_tree()?;
        state.recalibrate(seeding, &pool)?;
        self.distance_computations
            .store(computations, Ordering::Relaxed);
        if self.options.verbose() {
            info!(
                objects = state.objects.count_live(),
                distance_computations = computations,
                "graph built"
            );
        }
        Ok(computations)
    }

    /// Finds approximate nearest neighbours of `query`.
    ///
    /// Unset fields of `params` fall back to the handle's search defaults.
    /// An empty index yields an empty outcome.
    ///
    /// # Errors
    /// Returns [`IndexError::InvalidObject`] for a malformed query.
    #[instrument(
        name = "index.search",
        level = "debug",
        err,
        skip_all,
        fields(size = params.size()),
    )]
    pub fn search<V: Copy + Into<f64>>(
        &self,
        query: &[V],
        params: &SearchParams,
    ) -> Result<SearchOutcome> {
        let outcome = self.with_state(|state| state.search(query, params, self.options.seeding()))?;
        self.distance_computations
            .fetch_add(outcome.distance_computations(), Ordering::Relaxed);
        #[cfg(feature = "metrics")]
        {
            metrics::counter!("grove_search_total").increment(1);
            metrics::counter!("grove_distance_computations_total")
                .increment(outcome.distance_computations() as u64);
        }
        Ok(outcome)
    }

    /// Removes objects. Unknown and already removed ids are reported rather
    /// than treated as failures.
    ///
    /// # Errors
    /// Returns [`IndexError::ReadOnly`] on a read-only handle.
    #[instrument(name = "index.remove", err, skip_all, fields(ids = ids.len()))]
    pub fn remove(&self, ids: &[usize]) -> Result<RemovalReport> {
        self.mutate("remove", |state| {
            let (report, repaired) = state.remove(ids, self.options.removal_policy())?;
            if self.options.verbose() {
                info!(
                    removed = report.removed().len(),
                    already_removed = report.already_removed().len(),
                    not_found = report.not_found().len(),
                    repaired,
                    "removed objects"
                );
            }
            Ok(report)
        })
    }

    /// Rebuilds every live node's edge list from a fresh search.
    ///
    /// # Errors
    /// Returns [`IndexError::ReadOnly`] on a read-only handle.
    #[instrument(name = "index.refine", err, skip_all)]
    pub fn refine(&self, params: &RefineParams) -> Result<RefineSummary> {
        self.mutate("refine", |state| {
            state.refine(params, self.options.seeding(), self.options.verbose())
        })
    }

    /// Stored vectors for `ids`, widened to `f32`, in request order.
    ///
    /// # Errors
    /// Returns [`IndexError::NotFound`] or [`IndexError::Removed`] for the
    /// first id that has no live object.
    pub fn get_objects(&self, ids: &[usize]) -> Result<Vec<Vec<f32>>> {
        self.with_state(|state| ids.iter().map(|id| state.objects.get(*id)).collect())
    }

    /// Stored vector for `id`.
    ///
    /// # Errors
    /// As [`Index::get_objects`].
    pub fn get_object(&self, id: usize) -> Result<Vec<f32>> {
        self.with_state(|state| state.objects.get(id))
    }

    /// Number of live objects.
    ///
    /// # Errors
    /// Returns [`IndexError::ClosedIndex`] after close.
    pub fn count_objects(&self) -> Result<usize> {
        self.with_state(|state| Ok(state.objects.count_live()))
    }

    /// Number of object slots ever assigned, removed ones included.
    ///
    /// # Errors
    /// Returns [`IndexError::ClosedIndex`] after close.
    pub fn object_repository_size(&self) -> Result<usize> {
        self.with_state(|state| Ok(state.objects.capacity()))
    }

    /// Number of graph slots.
    ///
    /// # Errors
    /// Returns [`IndexError::ClosedIndex`] after close.
    pub fn graph_repository_size(&self) -> Result<usize> {
        self.with_state(|state| Ok(state.graph.slots()))
    }

    /// Distance evaluations since the last insert or build, including every
    /// search performed since.
    ///
    /// # Errors
    /// Returns [`IndexError::ClosedIndex`] after close.
    pub fn distance_computation_count(&self) -> Result<usize> {
        self.with_state(|_| Ok(self.distance_computations.load(Ordering::Relaxed)))
    }

    /// Updates the handle's search defaults with every valid field of
    /// `params`. Defaults are not persisted.
    ///
    /// # Errors
    /// Returns [`IndexError::ClosedIndex`] after close.
    pub fn set_search_defaults(&self, params: &SearchParams) -> Result<()> {
        self.with_exclusive(|state| {
            state.defaults.merge(params);
            Ok(())
        })
    }

    /// Current search defaults.
    ///
    /// # Errors
    /// Returns [`IndexError::ClosedIndex`] after close.
    pub fn search_defaults(&self) -> Result<SearchDefaults> {
        self.with_state(|state| Ok(state.defaults))
    }

    /// Writes the whole index to `path`, which may differ from the directory
    /// it was opened from.
    ///
    /// # Errors
    /// Returns [`IndexError::Io`] when the files cannot be written.
    #[instrument(name = "index.save", err, skip_all, fields(path = field::Empty))]
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        Span::current().record("path", field::display(path.display()));
        self.with_state(|state| {
            snapshot::write(path, &state.snapshot()?)?;
            if self.options.verbose() {
                info!(objects = state.objects.count_live(), "saved index");
            }
            Ok(())
        })
    }

    /// Releases the in-memory state. Nothing is saved.
    ///
    /// # Errors
    /// Returns [`IndexError::ClosedIndex`] when already closed.
    pub fn close(&self) -> Result<()> {
        let mut guard = self.write_state()?;
        *guard = None;
        Ok(())
    }

    /// Writes a portable JSON document holding every object and adjacency
    /// list.
    ///
    /// # Errors
    /// Returns [`IndexError::Io`] when the file cannot be written.
    #[instrument(name = "index.export", err, skip_all, fields(path = field::Empty))]
    pub fn export(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        Span::current().record("path", field::display(path.display()));
        self.with_state(|state| {
            let document = ExportDocument::capture(state.property, &state.objects, &state.graph)?;
            export::write(path, &document)
        })
    }

    /// Replaces the contents of this handle with an exported document, then
    /// rebuilds the tree and accuracy table.
    ///
    /// # Errors
    /// Returns [`IndexError::InvalidConfiguration`] when the document's
    /// dimension, object type, or distance type differ from this index, and
    /// [`IndexError::Corrupt`] when it cannot be decoded.
    #[instrument(name = "index.import", err, skip_all, fields(path = field::Empty))]
    pub fn import(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        Span::current().record("path", field::display(path.display()));
        self.mutate("import", |state| {
            let document = export::read(path)?;
            let (objects, graph) = document.restore(&state.property, path)?;
            let pool = worker_pool(0)?;
            state.replace_contents(objects, graph, self.options.seeding(), &pool)?;
            if self.options.verbose() {
                info!(objects = state.objects.count_live(), "imported index");
            }
            Ok(())
        })
    }
}
