//! Command implementations and argument parsing for the grove CLI.

use std::io;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use grove_core::{
    DEFAULT_EDGE_SIZE_FOR_CREATION, DEFAULT_EDGE_SIZE_FOR_SEARCH, DEFAULT_REFINE_BATCH_SIZE,
    DEFAULT_SIZE, EdgeBound, Index, IndexError, OpenOptions, Property, RefineParams,
    RemovalPolicy, SearchParams, SkippedRow,
};
use thiserror::Error;
use tracing::{Span, field, info, instrument};

use super::input::{read_rows, read_vectors};
use super::report::{IndexSummary, Report};

/// Top-level CLI options parsed by [`clap`].
#[derive(Debug, Parser, Clone)]
#[command(name = "grove", about = "Build and query graph-based nearest-neighbour indexes.")]
pub struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported CLI commands.
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Create an empty index directory.
    Create(CreateArgs),
    /// Insert and link every vector of a file in parallel.
    Insert(InsertArgs),
    /// Store vectors without linking them; run `build` afterwards.
    Append(InsertArgs),
    /// Link every stored but unlinked object.
    Build(BuildArgs),
    /// Search for the nearest neighbours of every vector in a file.
    Search(SearchArgs),
    /// Remove objects by id.
    Remove(RemoveArgs),
    /// Rebuild edge lists from fresh searches.
    Refine(RefineArgs),
    /// Write the index to a portable JSON document.
    Export(ExchangeArgs),
    /// Replace the index contents with a portable JSON document.
    Import(ExchangeArgs),
    /// Print index counters.
    Info(PathArg),
}

/// Index directory argument shared by several commands.
#[derive(Debug, Args, Clone)]
pub struct PathArg {
    /// Index directory.
    pub index: PathBuf,
}

/// Options accepted by `create`.
#[derive(Debug, Args, Clone)]
pub struct CreateArgs {
    /// Directory that will hold the index.
    pub index: PathBuf,

    /// Vector dimension.
    #[arg(long, short = 'd')]
    pub dimension: usize,

    /// Edges kept per node while building.
    #[arg(long = "edges", default_value_t = DEFAULT_EDGE_SIZE_FOR_CREATION)]
    pub edge_size_for_creation: usize,

    /// Edges traversed per node while searching.
    #[arg(long = "search-edges", default_value_t = DEFAULT_EDGE_SIZE_FOR_SEARCH)]
    pub edge_size_for_search: usize,

    /// Distance name, for example `L2`, `Cosine`, or `Hamming`.
    #[arg(long, default_value = "L2")]
    pub distance: String,

    /// Object type: `Float`, `Byte`, or `Float16`.
    #[arg(long, default_value = "Float")]
    pub object: String,
}

/// Options accepted by `insert` and `append`.
#[derive(Debug, Args, Clone)]
pub struct InsertArgs {
    /// Index directory.
    pub index: PathBuf,

    /// Text file with one vector per line.
    pub input: PathBuf,

    /// Worker threads; zero picks one per core.
    #[arg(long, default_value_t = 0)]
    pub threads: usize,
}

/// Options accepted by `build`.
#[derive(Debug, Args, Clone)]
pub struct BuildArgs {
    /// Index directory.
    pub index: PathBuf,

    /// Worker threads; zero picks one per core.
    #[arg(long, default_value_t = 0)]
    pub threads: usize,

    /// Expected final object count, used to pre-size storage.
    #[arg(long, default_value_t = 0)]
    pub hint: usize,
}

/// Options accepted by `search`.
#[derive(Debug, Args, Clone)]
pub struct SearchArgs {
    /// Index directory.
    pub index: PathBuf,

    /// Text file with one query vector per line.
    pub queries: PathBuf,

    /// Neighbours returned per query.
    #[arg(long, short = 'k', default_value_t = DEFAULT_SIZE)]
    pub size: usize,

    /// Search slack; larger values explore more of the graph.
    #[arg(long, allow_negative_numbers = true)]
    pub epsilon: Option<f32>,

    /// Maximum distance of a returned neighbour.
    #[arg(long)]
    pub radius: Option<f32>,

    /// Edges traversed per node: negative uses the index default, zero
    /// traverses every edge.
    #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
    pub edge_bound: i64,

    /// Target recall; replaces `--epsilon` through the calibration table.
    #[arg(long)]
    pub accuracy: Option<f32>,
}

/// Options accepted by `remove`.
#[derive(Debug, Args, Clone)]
pub struct RemoveArgs {
    /// Index directory.
    pub index: PathBuf,

    /// Ids to remove.
    #[arg(required = true)]
    pub ids: Vec<usize>,

    /// Only tombstone the objects and leave the graph untouched.
    #[arg(long)]
    pub lazy: bool,
}

/// Options accepted by `refine`.
#[derive(Debug, Args, Clone)]
pub struct RefineArgs {
    /// Index directory.
    pub index: PathBuf,

    /// Search slack used to rediscover neighbours.
    #[arg(long, allow_negative_numbers = true)]
    pub epsilon: Option<f32>,

    /// Target recall; replaces `--epsilon` through the calibration table.
    #[arg(long)]
    pub accuracy: Option<f32>,

    /// Edges kept per node; zero keeps the creation bound.
    #[arg(long, default_value_t = 0)]
    pub edges: usize,

    /// Edges traversed per node while searching; zero traverses every edge.
    #[arg(long, default_value_t = 0)]
    pub explored_edges: usize,

    /// Nodes refined per batch.
    #[arg(
        long,
        default_value_t = NonZeroUsize::new(DEFAULT_REFINE_BATCH_SIZE).unwrap_or(NonZeroUsize::MIN),
    )]
    pub batch_size: NonZeroUsize,

    /// Worker threads; zero picks one per core.
    #[arg(long, default_value_t = 0)]
    pub threads: usize,
}

/// Options accepted by `export` and `import`.
#[derive(Debug, Args, Clone)]
pub struct ExchangeArgs {
    /// Index directory.
    pub index: PathBuf,

    /// Portable document to write or read.
    pub file: PathBuf,
}

/// Errors surfaced while executing CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// An input file could not be read.
    #[error("failed to read `{}`: {source}", .path.display())]
    Io {
        /// Path that triggered the failure.
        path: PathBuf,
        /// Underlying operating system error.
        #[source]
        source: io::Error,
    },
    /// An input file held something other than numbers.
    #[error("{}:{line}: {reason}", .path.display())]
    Parse {
        /// File being parsed.
        path: PathBuf,
        /// One-based line number.
        line: usize,
        /// What was wrong with the line.
        reason: String,
    },
    /// The index rejected an operation.
    #[error(transparent)]
    Core(#[from] IndexError),
}

/// Executes the CLI command represented by `cli`.
///
/// Mutating commands save the index back to its directory before returning.
///
/// # Errors
/// Returns [`CliError`] when an input file is unreadable or the index rejects
/// the operation.
///
/// # Examples
/// ```
/// # use std::error::Error;
/// # use grove_cli::cli::{Cli, Command, CreateArgs, Report, run_cli};
/// # use tempfile::TempDir;
/// #
/// # fn main() -> Result<(), Box<dyn Error>> {
/// let dir = TempDir::new()?;
/// let index = dir.path().join("index");
/// let cli = Cli {
///     command: Command::Create(CreateArgs {
///         index: index.clone(),
///         dimension: 4,
///         edge_size_for_creation: 10,
///         edge_size_for_search: 40,
///         distance: "L2".into(),
///         object: "Float".into(),
///     }),
/// };
/// let report = run_cli(cli)?;
/// assert!(matches!(report, Report::Created { .. }));
/// assert!(index.join("property.json").exists());
/// # Ok(())
/// # }
/// ```
#[instrument(name = "cli.run", err, skip(cli), fields(command = field::Empty))]
pub fn run_cli(cli: Cli) -> Result<Report, CliError> {
    let span = Span::current();
    let report = match cli.command {
        Command::Create(args) => {
            span.record("command", "create");
            create(args)?
        }
        Command::Insert(args) => {
            span.record("command", "insert");
            insert(args)?
        }
        Command::Append(args) => {
            span.record("command", "append");
            append(args)?
        }
        Command::Build(args) => {
            span.record("command", "build");
            build(args)?
        }
        Command::Search(args) => {
            span.record("command", "search");
            search(args)?
        }
        Command::Remove(args) => {
            span.record("command", "remove");
            remove(args)?
        }
        Command::Refine(args) => {
            span.record("command", "refine");
            refine(args)?
        }
        Command::Export(args) => {
            span.record("command", "export");
            let index = Index::open(&args.index, read_only())?;
            index.export(&args.file)?;
            Report::Exported { path: args.file }
        }
        Command::Import(args) => {
            span.record("command", "import");
            let index = Index::open(&args.index, OpenOptions::default())?;
            index.import(&args.file)?;
            let objects = index.count_objects()?;
            persist(&index, &args.index)?;
            Report::Imported { objects }
        }
        Command::Info(args) => {
            span.record("command", "info");
            info_of(&args.index)?
        }
    };
    info!("command completed");
    Ok(report)
}

pub(super) fn create(args: CreateArgs) -> Result<Report, CliError> {
    let property = Property::parse(
        args.dimension,
        args.edge_size_for_creation,
        args.edge_size_for_search,
        &args.distance,
        &args.object,
    )?;
    Index::create(&args.index, property)?.close()?;
    Ok(Report::Created { path: args.index })
}

#[instrument(
    name = "cli.insert",
    err,
    skip(args),
    fields(path = field::Empty, rows = field::Empty, skipped = field::Empty),
)]
pub(super) fn insert(args: InsertArgs) -> Result<Report, CliError> {
    let span = Span::current();
    span.record("path", field::display(args.index.display()));
    let rows = read_rows(&args.input)?;
    span.record("rows", rows.vectors.len());

    let index = Index::open(&args.index, OpenOptions::default())?;
    let outcome = index.batch_insert(&rows.vectors, args.threads)?;
    span.record("skipped", outcome.skipped().len());
    persist(&index, &args.index)?;
    let skipped = outcome
        .skipped()
        .iter()
        .map(|rejected| SkippedRow {
            row: rows.line_of(rejected.row).unwrap_or(rejected.row),
            error: rejected.error.clone(),
        })
        .collect();
    Ok(Report::Inserted {
        ids: outcome.ids().to_vec(),
        skipped,
    })
}

pub(super) fn append(args: InsertArgs) -> Result<Report, CliError> {
    let rows = read_vectors(&args.input)?;
    let index = Index::open(&args.index, OpenOptions::default())?;
    let ids = rows
        .iter()
        .map(|row| index.append(row))
        .collect::<Result<Vec<_>, _>>()?;
    persist(&index, &args.index)?;
    Ok(Report::Inserted {
        ids,
        skipped: Vec::new(),
    })
}

pub(super) fn build(args: BuildArgs) -> Result<Report, CliError> {
    let index = Index::open(&args.index, OpenOptions::default())?;
    index.build(args.threads, args.hint)?;
    let objects = index.count_objects()?;
    persist(&index, &args.index)?;
    Ok(Report::Built { objects })
}

#[instrument(
    name = "cli.search",
    err,
    skip(args),
    fields(path = field::Empty, queries = field::Empty, size = args.size),
)]
pub(super) fn search(args: SearchArgs) -> Result<Report, CliError> {
    let span = Span::current();
    span.record("path", field::display(args.index.display()));
    let queries = read_vectors(&args.queries)?;
    span.record("queries", queries.len());

    let params = search_params(&args);
    let index = Index::open(&args.index, read_only())?;
    let lists = queries
        .iter()
        .map(|query| Ok(index.search(query, &params)?.into_neighbours()))
        .collect::<Result<Vec<_>, CliError>>()?;
    Ok(Report::Results(lists))
}

pub(super) fn search_params(args: &SearchArgs) -> SearchParams {
    let mut params =
        SearchParams::new(args.size).with_edge_bound(EdgeBound::from_signed(args.edge_bound));
    if let Some(epsilon) = args.epsilon {
        params = params.with_epsilon(epsilon);
    }
    if let Some(radius) = args.radius {
        params = params.with_radius(radius);
    }
    if let Some(accuracy) = args.accuracy {
        params = params.with_expected_accuracy(accuracy);
    }
    params
}

pub(super) fn remove(args: RemoveArgs) -> Result<Report, CliError> {
    let policy = if args.lazy {
        RemovalPolicy::Lazy
    } else {
        RemovalPolicy::Eager
    };
    let index = Index::open(&args.index, OpenOptions::default().with_removal_policy(policy))?;
    let report = index.remove(&args.ids)?;
    persist(&index, &args.index)?;
    Ok(Report::Removed(report))
}

pub(super) fn refine(args: RefineArgs) -> Result<Report, CliError> {
    let index = Index::open(&args.index, OpenOptions::default())?;
    let summary = index.refine(&refine_params(&args))?;
    persist(&index, &args.index)?;
    Ok(Report::Refined(summary))
}

pub(super) fn refine_params(args: &RefineArgs) -> RefineParams {
    let mut params = RefineParams::default()
        .with_edge_count(args.edges)
        .with_explored_edge_count(args.explored_edges)
        .with_batch_size(args.batch_size)
        .with_thread_count(args.threads);
    if let Some(epsilon) = args.epsilon {
        params = params.with_epsilon(epsilon);
    }
    if let Some(accuracy) = args.accuracy {
        params = params.with_expected_accuracy(accuracy);
    }
    params
}

pub(super) fn info_of(path: &Path) -> Result<Report, CliError> {
    let index = Index::open(path, read_only())?;
    Ok(Report::Info(IndexSummary {
        property: index.property()?,
        objects: index.count_objects()?,
        object_repository_size: index.object_repository_size()?,
        graph_repository_size: index.graph_repository_size()?,
    }))
}

fn read_only() -> OpenOptions {
    OpenOptions::default()
        .with_read_only(true)
        .with_logging_disabled(true)
}

fn persist(index: &Index, path: &Path) -> Result<(), CliError> {
    index.save(path)?;
    index.close()?;
    Ok(())
}
