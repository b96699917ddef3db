// src/analysis/mod.rs
pub mod error;
pub mod loader;
pub mod minima;
pub mod pipeline;
pub mod plot;
pub mod preprocess;
pub mod smooth;
pub mod source;
pub mod summary;

pub use error::AnalysisError;
pub use minima::{ExtractorConfig, MinimumExtractor};
pub use pipeline::{write_outputs, AnalysisPipeline, OutputDirs, RunOutcome};
pub use plot::PlotStyle;
pub use source::{DirectorySource, LoadedTrace, ManualSource, TraceSource};
pub use summary::{SummaryRow, SummaryTable};
