//! Grove core library: a graph-based approximate nearest-neighbour index.
#![cfg_attr(docsrs, feature(doc_cfg))]

mod accuracy;
mod builder;
pub mod distance;
mod error;
mod graph;
mod index;
mod neighbour;
mod object;
mod persist;
mod property;
mod search;
#[cfg(test)]
mod test_utils;
mod tree;

pub use crate::{
    builder::{
        BatchInsertOutcome, DEFAULT_REFINE_BATCH_SIZE, RefineParams, RefineSummary, RemovalPolicy,
        RemovalReport, SkippedRow,
    },
    distance::{Distance, DistanceError, VectorKind},
    error::{IndexError, IndexErrorCode, ObjectError, ObjectErrorCode, Result},
    index::{Index, OpenOptions},
    neighbour::Neighbour,
    property::{
        DEFAULT_EDGE_SIZE_FOR_CREATION, DEFAULT_EDGE_SIZE_FOR_SEARCH, DistanceType, EdgeBound,
        ObjectType, Property,
    },
    search::{DEFAULT_EPSILON, DEFAULT_SIZE, SearchDefaults, SearchOutcome, SearchParams},
};
