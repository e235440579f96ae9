//! Handle options chosen when an index is opened.

use crate::builder::RemovalPolicy;
use crate::search::Seeding;

/// Options for [`crate::Index::open`].
///
/// # Examples
/// ```
/// use grove_core::{OpenOptions, RemovalPolicy};
///
/// let options = OpenOptions::default()
///     .with_read_only(true)
///     .with_removal_policy(RemovalPolicy::Lazy);
/// assert!(options.read_only());
/// assert_eq!(options.removal_policy(), RemovalPolicy::Lazy);
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct OpenOptions {
    read_only: bool,
    tree_disabled: bool,
    logging_disabled: bool,
    removal_policy: RemovalPolicy,
}

impl OpenOptions {
    /// Rejects every mutating operation with [`crate::IndexError::ReadOnly`].
    #[must_use]
    pub const fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Seeds searches from a strided sample instead of the vantage-point tree.
    #[must_use]
    pub const fn with_tree_disabled(mut self, tree_disabled: bool) -> Self {
        self.tree_disabled = tree_disabled;
        self
    }

    /// Suppresses progress and informational events from this handle.
    #[must_use]
    pub const fn with_logging_disabled(mut self, logging_disabled: bool) -> Self {
        self.logging_disabled = logging_disabled;
        self
    }

    /// How removals treat the graph.
    #[must_use]
    pub const fn with_removal_policy(mut self, policy: RemovalPolicy) -> Self {
        self.removal_policy = policy;
        self
    }

    /// Whether mutations are rejected.
    #[must_use]
    #[rustfmt::skip]
    pub const fn read_only(&self) -> bool { self.read_only }

    /// Whether tree seeding is disabled.
    #[must_use]
    #[rustfmt::skip]
    pub const fn tree_disabled(&self) -> bool { self.tree_disabled }

    /// Whether progress events are suppressed.
    #[must_use]
    #[rustfmt::skip]
    pub const fn logging_disabled(&self) -> bool { self.logging_disabled }

    /// Removal policy.
    #[must_use]
    #[rustfmt::skip]
    pub const fn removal_policy(&self) -> RemovalPolicy { self.removal_policy }

    pub(crate) const fn seeding(&self) -> Seeding {
        if self.tree_disabled {
            Seeding::Naive
        } else {
            Seeding::Tree
        }
    }

    #[rustfmt::skip]
    pub(crate) const fn verbose(&self) -> bool { !self.logging_disabled }
}
