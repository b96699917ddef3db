use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use crate::analysis::{loader, AnalysisError};
use crate::types::{Parameter, ParameterKind, Trace};

/// A parsed input file together with its identifying parameter.
#[derive(Clone, Debug)]
pub struct LoadedTrace {
    pub path: PathBuf,
    pub parameter: Parameter,
    pub trace: Trace,
}

/// Trait representing something that can yield traces on demand.
pub trait TraceSource {
    fn next_trace(&mut self) -> Result<Option<LoadedTrace>, AnalysisError>;
}

/// Reads the files of one data directory that match a glob.
pub struct DirectorySource {
    pending: VecDeque<PathBuf>,
    kind: ParameterKind,
}

impl DirectorySource {
    pub fn discover(
        data_dir: &Path,
        pattern: &str,
        kind: ParameterKind,
    ) -> Result<Self, AnalysisError> {
        Ok(Self::from_paths(loader::discover(data_dir, pattern)?, kind))
    }

    pub fn from_paths(paths: impl IntoIterator<Item = PathBuf>, kind: ParameterKind) -> Self {
        Self {
            pending: paths.into_iter().collect(),
            kind,
        }
    }

    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

impl TraceSource for DirectorySource {
    fn next_trace(&mut self) -> Result<Option<LoadedTrace>, AnalysisError> {
        let Some(path) = self.pending.pop_front() else {
            return Ok(None);
        };
        let (parameter, trace) = loader::load_file(&path, self.kind)?;
        Ok(Some(LoadedTrace {
            path,
            parameter,
            trace,
        }))
    }
}

/// In-memory source useful for tests and deterministic playback.
pub struct ManualSource {
    queue: VecDeque<LoadedTrace>,
}

impl ManualSource {
    pub fn new(traces: impl IntoIterator<Item = LoadedTrace>) -> Self {
        Self {
            queue: traces.into_iter().collect(),
        }
    }
}

impl TraceSource for ManualSource {
    fn next_trace(&mut self) -> Result<Option<LoadedTrace>, AnalysisError> {
        Ok(self.queue.pop_front())
    }
}
