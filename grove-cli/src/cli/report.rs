//! Command results and their text rendering.

use std::io::{self, Write};
use std::path::PathBuf;

use grove_core::{Neighbour, Property, RefineSummary, RemovalReport, SkippedRow};

/// Counters describing an index on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSummary {
    /// Static configuration of the index.
    pub property: Property,
    /// Live objects.
    pub objects: usize,
    /// Every id ever assigned.
    pub object_repository_size: usize,
    /// Graph slots.
    pub graph_repository_size: usize,
}

/// Outcome of one CLI command.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum Report {
    /// A new index was written.
    Created {
        /// Directory of the new index.
        path: PathBuf,
    },
    /// Vectors were stored.
    Inserted {
        /// Ids in input order.
        ids: Vec<usize>,
        /// Rows that failed validation, numbered by input file line.
        skipped: Vec<SkippedRow>,
    },
    /// Pending objects were linked.
    Built {
        /// Live objects after the build.
        objects: usize,
    },
    /// One result list per query, nearest first.
    Results(Vec<Vec<Neighbour>>),
    /// Removal bookkeeping.
    Removed(RemovalReport),
    /// Refinement counters.
    Refined(RefineSummary),
    /// The index was written to a portable document.
    Exported {
        /// Destination file.
        path: PathBuf,
    },
    /// The index contents were replaced from a portable document.
    Imported {
        /// Live objects after the import.
        objects: usize,
    },
    /// Index counters.
    Info(IndexSummary),
}

/// Renders `report` to `writer` as tab-separated text.
///
/// # Errors
/// Returns [`io::Error`] if writing to the supplied writer fails.
///
/// # Examples
/// ```
/// # use std::error::Error;
/// # use std::io::Cursor;
/// # use grove_cli::cli::{Report, render_report};
/// # use grove_core::Neighbour;
/// #
/// # fn main() -> Result<(), Box<dyn Error>> {
/// let report = Report::Results(vec![vec![Neighbour { id: 3, distance: 0.5 }]]);
/// let mut buffer = Cursor::new(Vec::new());
/// render_report(&report, &mut buffer)?;
/// assert_eq!(String::from_utf8(buffer.into_inner())?, "query 0\n1\t3\t0.5\n");
/// # Ok(())
/// # }
/// ```
pub fn render_report(report: &Report, mut writer: impl Write) -> io::Result<()> {
    match report {
        Report::Created { path } => writeln!(writer, "created {}", path.display())?,
        Report::Inserted { ids, skipped } => {
            writeln!(writer, "inserted: {}", ids.len())?;
            for id in ids {
                writeln!(writer, "{id}")?;
            }
            for row in skipped {
                writeln!(writer, "skipped line {}: {}", row.row, row.error)?;
            }
        }
        Report::Built { objects } => writeln!(writer, "built: {objects} objects")?,
        Report::Results(lists) => {
            for (query, neighbours) in lists.iter().enumerate() {
                writeln!(writer, "query {query}")?;
                for (rank, neighbour) in neighbours.iter().enumerate() {
                    writeln!(writer, "{}\t{}\t{}", rank + 1, neighbour.id, neighbour.distance)?;
                }
            }
        }
        Report::Removed(removal) => {
            writeln!(writer, "removed: {:?}", removal.removed())?;
            writeln!(writer, "already removed: {:?}", removal.already_removed())?;
            writeln!(writer, "not found: {:?}", removal.not_found())?;
        }
        Report::Refined(summary) => {
            writeln!(writer, "refined: {} nodes", summary.refined_nodes())?;
            writeln!(writer, "distance computations: {}", summary.distance_computations())?;
        }
        Report::Exported { path } => writeln!(writer, "exported {}", path.display())?,
        Report::Imported { objects } => writeln!(writer, "imported: {objects} objects")?,
        Report::Info(summary) => {
            let property = &summary.property;
            writeln!(writer, "dimension: {}", property.dimension())?;
            writeln!(writer, "object type: {}", property.object_type())?;
            writeln!(writer, "distance type: {}", property.distance_type())?;
            writeln!(writer, "edges for creation: {}", property.edge_size_for_creation())?;
            writeln!(writer, "edges for search: {}", property.edge_size_for_search())?;
            writeln!(writer, "objects: {}", summary.objects)?;
            writeln!(writer, "object repository size: {}", summary.object_repository_size)?;
            writeln!(writer, "graph repository size: {}", summary.graph_repository_size)?;
        }
    }
    Ok(())
}
