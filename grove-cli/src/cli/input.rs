//! Plain-text vector files: one vector per line.
//!
//! Elements are separated by whitespace or commas. Blank lines and lines
//! starting with `#` are ignored.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::{Span, field, instrument};

use super::commands::CliError;

/// Vectors read from a file with the 1-based line each came from.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VectorRows {
    /// Parsed vectors in file order.
    pub vectors: Vec<Vec<f64>>,
    /// Line number of each vector.
    pub lines: Vec<usize>,
}

impl VectorRows {
    /// Line holding the vector at position `row`.
    #[must_use]
    pub fn line_of(&self, row: usize) -> Option<usize> {
        self.lines.get(row).copied()
    }
}

/// Reads every vector stored in `path`.
///
/// # Errors
/// Returns [`CliError::Io`] when the file cannot be read and
/// [`CliError::Parse`] when a line holds a token that is not a number.
///
/// # Examples
/// ```
/// # use std::error::Error;
/// # use grove_cli::cli::read_vectors;
/// # use tempfile::NamedTempFile;
/// #
/// # fn main() -> Result<(), Box<dyn Error>> {
/// let file = NamedTempFile::new()?;
/// std::fs::write(file.path(), "# header\n1 2 3\n4,5,6\n")?;
/// let vectors = read_vectors(file.path())?;
/// assert_eq!(vectors, vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]);
/// # Ok(())
/// # }
/// ```
pub fn read_vectors(path: &Path) -> Result<Vec<Vec<f64>>, CliError> {
    read_rows(path).map(|rows| rows.vectors)
}

/// Reads every vector stored in `path`, keeping line numbers.
///
/// # Errors
/// Fails like [`read_vectors`].
#[instrument(name = "cli.read_rows", err, fields(path = field::Empty, rows = field::Empty))]
pub fn read_rows(path: &Path) -> Result<VectorRows, CliError> {
    let span = Span::current();
    span.record("path", field::display(path.display()));
    let io_error = |source| CliError::Io {
        path: path.to_path_buf(),
        source,
    };

    let reader = BufReader::new(File::open(path).map_err(io_error)?);
    let mut rows = VectorRows::default();
    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(io_error)?;
        if let Some(vector) = parse_line(&line).map_err(|reason| CliError::Parse {
            path: path.to_path_buf(),
            line: index + 1,
            reason,
        })? {
            rows.vectors.push(vector);
            rows.lines.push(index + 1);
        }
    }
    span.record("rows", rows.vectors.len());
    Ok(rows)
}

pub(super) fn parse_line(line: &str) -> Result<Option<Vec<f64>>, String> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }
    trimmed
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .map(|token| {
            token
                .parse::<f64>()
                .map_err(|error| format!("`{token}` is not a number: {error}"))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}
