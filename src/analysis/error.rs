use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid glob pattern `{pattern}`: {source}")]
    InvalidGlob {
        pattern: String,
        #[source]
        source: globset::Error,
    },
    #[error("no files in {dir} match `{pattern}`")]
    NoInputFiles { dir: PathBuf, pattern: String },
    #[error("unparseable filename `{name}`: {reason}")]
    UnparseableFilename { name: String, reason: String },
    #[error("malformed row at line {line}: {reason}")]
    MalformedRow { line: usize, reason: String },
    #[error("trace has no data rows")]
    EmptyTrace,
    #[error("{path}: {source}")]
    InFile {
        path: PathBuf,
        #[source]
        source: Box<AnalysisError>,
    },
    #[error("smoothed sequence has {actual} samples but the trace has {expected}")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("insufficient minima: need 2 candidates, found {found}")]
    InsufficientMinima { found: usize },
    #[error("parameter value {value} appears in both {first} and {second}")]
    DuplicateParameter {
        value: i64,
        first: PathBuf,
        second: PathBuf,
    },
    #[error("summary table header mismatch: expected `{expected}`, got `{actual}`")]
    SummaryHeader { expected: String, actual: String },
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to read configuration {path}: {source}")]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("failed to render plot: {0}")]
    Plot(String),
}

impl AnalysisError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| AnalysisError::Io { path, source }
    }

    pub(crate) fn in_file(path: impl Into<PathBuf>) -> impl FnOnce(Self) -> Self {
        let path = path.into();
        move |source| AnalysisError::InFile {
            path,
            source: Box::new(source),
        }
    }
}

impl<E: std::error::Error + Send + Sync + 'static> From<plotters::drawing::DrawingAreaErrorKind<E>>
    for AnalysisError
{
    fn from(value: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
        AnalysisError::Plot(format!("{value:?}"))
    }
}

impl From<image::ImageError> for AnalysisError {
    fn from(value: image::ImageError) -> Self {
        AnalysisError::Plot(value.to_string())
    }
}
