//! Discovery and parsing of recorded trace files.
//!
//! The recorder writes whitespace-separated tables with a comma decimal
//! separator:
//!
//! ```text
//! <free-form line>
//! <free-form line>
//! Time    I       U
//! 0       1,25E-9 0,010
//! 1       1,31E-9 0,020
//! ```
//!
//! The first two lines are always skipped. The column-label row is optional.
use std::fs;
use std::path::{Path, PathBuf};

use globset::Glob;
use log::debug;

use crate::analysis::AnalysisError;
use crate::types::{Parameter, ParameterKind, Sample, Trace};

/// Lines at the top of every file that carry no tabular data.
pub const SKIPPED_LINES: usize = 2;

const STOP_VOLTAGE_PREFIX: &str = "VR_";
const STOP_VOLTAGE_SUFFIX: &str = "mV";

/// Regular files directly inside `data_dir` whose names match `pattern`, sorted by path.
pub fn discover(data_dir: &Path, pattern: &str) -> Result<Vec<PathBuf>, AnalysisError> {
    let matcher = Glob::new(pattern)
        .map_err(|source| AnalysisError::InvalidGlob {
            pattern: pattern.to_string(),
            source,
        })?
        .compile_matcher();
    let mut files = Vec::new();
    for entry in fs::read_dir(data_dir).map_err(AnalysisError::io(data_dir))? {
        let path = entry.map_err(AnalysisError::io(data_dir))?.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name() else {
            continue;
        };
        if matcher.is_match(name) {
            files.push(path);
        }
    }
    if files.is_empty() {
        return Err(AnalysisError::NoInputFiles {
            dir: data_dir.to_path_buf(),
            pattern: pattern.to_string(),
        });
    }
    files.sort();
    debug!("{} file(s) in {} match `{pattern}`", files.len(), data_dir.display());
    Ok(files)
}

/// Extracts the identifying parameter from a bare file name.
///
/// * `Temperature`: the second `_`-separated field, e.g. `T_300_VR_3000mV` gives 300.
/// * `StopVoltage`: the text between the first `VR_` and the next `mV`,
///   e.g. `T_150_VR_-500mV` gives -500.
///
/// A name without the expected shape is an error; no default is substituted.
pub fn parse_parameter(file_name: &str, kind: ParameterKind) -> Result<Parameter, AnalysisError> {
    let unparseable = |reason: String| AnalysisError::UnparseableFilename {
        name: file_name.to_string(),
        reason,
    };
    let raw = match kind {
        ParameterKind::Temperature => file_name
            .split('_')
            .nth(1)
            .ok_or_else(|| unparseable("no field after the first `_`".into()))?,
        ParameterKind::StopVoltage => {
            let start = file_name
                .find(STOP_VOLTAGE_PREFIX)
                .ok_or_else(|| unparseable(format!("missing `{STOP_VOLTAGE_PREFIX}`")))?
                + STOP_VOLTAGE_PREFIX.len();
            let rest = &file_name[start..];
            // The value needs at least one character before the unit.
            let end = rest
                .char_indices()
                .nth(1)
                .and_then(|(offset, _)| {
                    rest[offset..]
                        .find(STOP_VOLTAGE_SUFFIX)
                        .map(|found| offset + found)
                })
                .ok_or_else(|| {
                    unparseable(format!(
                        "missing value between `{STOP_VOLTAGE_PREFIX}` and `{STOP_VOLTAGE_SUFFIX}`"
                    ))
                })?;
            &rest[..end]
        }
    };
    let value = raw
        .trim()
        .parse::<i64>()
        .map_err(|err| unparseable(format!("`{raw}` is not an integer ({err})")))?;
    Ok(Parameter::new(kind, value))
}

/// Parses a file body into a trace. See the module docs for the layout.
pub fn parse_trace(text: &str) -> Result<Trace, AnalysisError> {
    let mut samples = Vec::new();
    let mut first_row = true;
    for (idx, line) in text.lines().enumerate().skip(SKIPPED_LINES) {
        if line.trim().is_empty() {
            continue;
        }
        match parse_row(line) {
            Ok(sample) => samples.push(sample),
            Err(reason) if first_row => {
                debug!("treating line {} as column labels ({reason})", idx + 1);
            }
            Err(reason) => {
                return Err(AnalysisError::MalformedRow {
                    line: idx + 1,
                    reason,
                })
            }
        }
        first_row = false;
    }
    if samples.is_empty() {
        return Err(AnalysisError::EmptyTrace);
    }
    Ok(Trace::from_samples(&samples))
}

/// Reads one file and its identifying parameter. Errors name the offending path.
pub fn load_file(path: &Path, kind: ParameterKind) -> Result<(Parameter, Trace), AnalysisError> {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let parameter = parse_parameter(&name, kind).map_err(AnalysisError::in_file(path))?;
    // Instrument headers are not guaranteed to be UTF-8.
    let bytes = fs::read(path).map_err(AnalysisError::io(path))?;
    let trace =
        parse_trace(&String::from_utf8_lossy(&bytes)).map_err(AnalysisError::in_file(path))?;
    debug!("loaded {} ({parameter}, {} samples)", path.display(), trace.len());
    Ok((parameter, trace))
}

fn parse_row(line: &str) -> Result<Sample, String> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let [time, current, voltage] = fields.as_slice() else {
        return Err(format!(
            "expected 3 fields (time, current, voltage), found {}",
            fields.len()
        ));
    };
    Ok(Sample {
        time: parse_decimal(time)?,
        current: parse_decimal(current)?,
        voltage: parse_decimal(voltage)?,
    })
}

/// Parses a finite number written with either `,` or `.` as the decimal separator.
pub(crate) fn parse_decimal(field: &str) -> Result<f64, String> {
    let normalized = field.trim().replace(',', ".");
    let value = normalized
        .parse::<f64>()
        .map_err(|err| format!("`{field}` is not a number ({err})"))?;
    if !value.is_finite() {
        return Err(format!("`{field}` is not a finite number"));
    }
    Ok(value)
}
