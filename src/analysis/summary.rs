//! Per-rank summary tables across all traces of a stop-voltage sweep.
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use csv::{QuoteStyle, ReaderBuilder, WriterBuilder};

use crate::analysis::loader::parse_decimal;
use crate::analysis::AnalysisError;
use crate::types::{MinimumRank, TraceAnalysis};

pub const SUMMARY_HEADER: [&str; 3] = ["U_stop", "I", "U_drive"];

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SummaryRow {
    /// Stop voltage in millivolts, straight from the file name.
    pub stop_voltage: f64,
    pub current: f64,
    /// Rescaled drive voltage at the minimum.
    pub drive_voltage: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SummaryTable {
    pub rank: MinimumRank,
    pub rows: Vec<SummaryRow>,
}

impl SummaryTable {
    pub fn stop_voltages(&self) -> impl Iterator<Item = f64> + '_ {
        self.rows.iter().map(|row| row.stop_voltage)
    }

    pub fn currents(&self) -> impl Iterator<Item = f64> + '_ {
        self.rows.iter().map(|row| row.current)
    }
}

/// One table per minimum rank, rows ascending by stop voltage.
///
/// Traces without extracted minima contribute no rows.
pub fn build_summary_tables(
    analyses: &[TraceAnalysis],
) -> Result<[SummaryTable; 2], AnalysisError> {
    let mut ordered: Vec<&TraceAnalysis> =
        analyses.iter().filter(|a| a.minima.is_some()).collect();
    ordered.sort_by_key(|a| a.parameter.value);
    if let Some(pair) = ordered
        .windows(2)
        .find(|pair| pair[0].parameter.value == pair[1].parameter.value)
    {
        return Err(AnalysisError::DuplicateParameter {
            value: pair[0].parameter.value,
            first: pair[0].source.clone(),
            second: pair[1].source.clone(),
        });
    }
    Ok(MinimumRank::ALL.map(|rank| SummaryTable {
        rank,
        rows: ordered
            .iter()
            .filter_map(|analysis| {
                let minimum = analysis.minima.as_ref()?[rank.position()];
                Some(SummaryRow {
                    stop_voltage: analysis.parameter.value as f64,
                    current: minimum.current,
                    drive_voltage: minimum.voltage,
                })
            })
            .collect(),
    }))
}

/// Writes `U_stop,I,U_drive` with comma decimals; such fields are quoted.
pub fn write_summary<W: Write>(table: &SummaryTable, writer: W) -> Result<(), AnalysisError> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Necessary)
        .from_writer(writer);
    writer.write_record(SUMMARY_HEADER)?;
    for row in &table.rows {
        writer.write_record([
            format_decimal(row.stop_voltage),
            format_decimal(row.current),
            format_decimal(row.drive_voltage),
        ])?;
    }
    writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

pub fn write_summary_csv(table: &SummaryTable, path: &Path) -> Result<(), AnalysisError> {
    let file = File::create(path).map_err(AnalysisError::io(path))?;
    write_summary(table, file).map_err(AnalysisError::in_file(path))
}

pub fn read_summary<R: Read>(rank: MinimumRank, reader: R) -> Result<SummaryTable, AnalysisError> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(reader);
    let header = reader.headers()?;
    if header.iter().ne(SUMMARY_HEADER) {
        return Err(AnalysisError::SummaryHeader {
            expected: SUMMARY_HEADER.join(","),
            actual: header.iter().collect::<Vec<_>>().join(","),
        });
    }
    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record?;
        let line = idx + 2;
        let malformed = |reason: String| AnalysisError::MalformedRow { line, reason };
        let [stop_voltage, current, drive_voltage] = [0, 1, 2].map(|column| {
            record
                .get(column)
                .ok_or_else(|| format!("missing column {}", SUMMARY_HEADER[column]))
                .and_then(parse_decimal)
        });
        rows.push(SummaryRow {
            stop_voltage: stop_voltage.map_err(malformed)?,
            current: current.map_err(malformed)?,
            drive_voltage: drive_voltage.map_err(malformed)?,
        });
    }
    Ok(SummaryTable { rank, rows })
}

pub fn read_summary_csv(rank: MinimumRank, path: &Path) -> Result<SummaryTable, AnalysisError> {
    let file = File::open(path).map_err(AnalysisError::io(path))?;
    read_summary(rank, file).map_err(AnalysisError::in_file(path))
}

/// Shortest round-tripping representation, with `,` as the decimal separator.
fn format_decimal(value: f64) -> String {
    format!("{value:?}").replace('.', ",")
}
