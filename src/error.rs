//! Error type shared by every stage of the report pipeline.

use std::io;
use std::path::PathBuf;

/// Boxed cause for errors coming from different parsers and drawing backends.
pub type BoxedCause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failures that abort a report run.
///
/// None of these are recovered; the binary prints the message together with the `source()` chain
/// and exits with a non-zero status.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("input file not found: {}", .path.display())]
    InputNotFound { path: PathBuf },

    #[error("failed to read input file {}", .path.display())]
    InputRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{table} table {} is missing required column(s): {}", .path.display(), .missing.join(", "))]
    InputSchemaMismatch {
        table: &'static str,
        path: PathBuf,
        missing: Vec<String>,
    },

    #[error("malformed {table} row {row} in {}", .path.display())]
    InputMalformed {
        table: &'static str,
        path: PathBuf,
        row: usize,
        #[source]
        source: BoxedCause,
    },

    #[error("{table} table {} could not be parsed as a whole", .path.display())]
    InputUnparsable {
        table: &'static str,
        path: PathBuf,
        #[source]
        source: BoxedCause,
    },

    #[error("{count} vehicle row(s) reference unknown brand ids: {}", format_ids(.ids))]
    UnmatchedBrand { count: usize, ids: Vec<u64> },

    #[error("cannot compute {view}: no rows left after joining vehicles with brands")]
    AggregationEmpty { view: &'static str },

    #[error("unit totals for {view} exceed the supported range")]
    UnitsOverflow { view: &'static str },

    #[error("page layout does not fit: {0}")]
    Layout(String),

    #[error("no usable font family found")]
    FontUnavailable(#[source] genpdf::error::Error),

    #[error("failed to draw or encode chart '{title}'")]
    ChartEncode {
        title: String,
        #[source]
        source: BoxedCause,
    },

    #[error("chart image missing at {}; charts must be rendered before the report", .path.display())]
    ChartMissing { path: PathBuf },

    #[error("failed to render the PDF document")]
    Render(#[source] genpdf::error::Error),

    #[error("failed to write output file {}", .path.display())]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn format_ids(ids: &[u64]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl ReportError {
    /// Maps an I/O error raised while opening an input file.
    pub(crate) fn input_io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        if source.kind() == io::ErrorKind::NotFound {
            Self::InputNotFound { path }
        } else {
            Self::InputRead { path, source }
        }
    }

    /// Maps an I/O error raised while writing an output file.
    pub(crate) fn output_io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::OutputWriteFailed {
            path: path.into(),
            source,
        }
    }
}
