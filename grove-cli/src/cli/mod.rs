//! Command-line interface for creating, filling, querying, and maintaining
//! grove indexes on disk.

mod commands;
mod input;
mod report;

pub use commands::{
    BuildArgs, Cli, CliError, Command, CreateArgs, ExchangeArgs, InsertArgs, PathArg, RefineArgs,
    RemoveArgs, SearchArgs, run_cli,
};
pub use input::{VectorRows, read_rows, read_vectors};
pub use report::{IndexSummary, Report, render_report};
