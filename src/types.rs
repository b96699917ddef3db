// src/types.rs
use std::fmt;
use std::path::PathBuf;

use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Which physical quantity a file name encodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterKind {
    /// Sample temperature in kelvin, e.g. `T_300_VR_3000mV.txt`.
    Temperature,
    /// Retarding (stop) voltage in millivolts, e.g. `T_150_VR_-500mV.txt`.
    StopVoltage,
}

impl ParameterKind {
    pub fn symbol(self) -> &'static str {
        match self {
            ParameterKind::Temperature => "T",
            ParameterKind::StopVoltage => "U_s",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            ParameterKind::Temperature => "K",
            ParameterKind::StopVoltage => "mV",
        }
    }
}

/// Identifying parameter parsed from a file name. Only used for ordering and labels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Parameter {
    pub kind: ParameterKind,
    pub value: i64,
}

impl Parameter {
    pub fn new(kind: ParameterKind, value: i64) -> Self {
        Self { kind, value }
    }

    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} = {} {}",
            self.kind.symbol(),
            self.value,
            self.kind.unit()
        )
    }
}

/// One acquisition row.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample {
    pub time: f64,
    pub current: f64,
    pub voltage: f64,
}

/// Column-wise storage of one recorded file, in acquisition order.
#[derive(Clone, Debug, PartialEq)]
pub struct Trace {
    pub time: Array1<f64>,
    pub current: Array1<f64>,
    pub voltage: Array1<f64>,
}

impl Trace {
    pub fn from_samples(samples: &[Sample]) -> Self {
        Self {
            time: samples.iter().map(|s| s.time).collect(),
            current: samples.iter().map(|s| s.current).collect(),
            voltage: samples.iter().map(|s| s.voltage).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.current.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    pub fn sample(&self, index: usize) -> Option<Sample> {
        Some(Sample {
            time: *self.time.get(index)?,
            current: *self.current.get(index)?,
            voltage: *self.voltage.get(index)?,
        })
    }

    /// First and last drive voltage, used as the overlay plot's x extent.
    pub fn voltage_span(&self) -> Option<(f64, f64)> {
        let last = self.len().checked_sub(1)?;
        Some((self.voltage[0], self.voltage[last]))
    }
}

/// Gaussian-smoothed copy of a trace. Same length as its source.
#[derive(Clone, Debug, PartialEq)]
pub struct SmoothedTrace {
    pub current: Array1<f64>,
    pub voltage: Array1<f64>,
}

impl SmoothedTrace {
    pub fn len(&self) -> usize {
        self.current.len()
    }

    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.voltage.iter().copied().zip(self.current.iter().copied())
    }
}

/// Order in which a minimum was found among the last two candidates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MinimumRank {
    First,
    Second,
}

impl MinimumRank {
    pub const ALL: [MinimumRank; 2] = [MinimumRank::First, MinimumRank::Second];

    pub fn position(self) -> usize {
        match self {
            MinimumRank::First => 0,
            MinimumRank::Second => 1,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MinimumRank::First => "first minimum",
            MinimumRank::Second => "second minimum",
        }
    }
}

/// Raw sample picked out at a local minimum of the smoothed current.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MinimumRecord {
    pub rank: MinimumRank,
    pub index: usize,
    pub current: f64,
    pub voltage: f64,
}

/// Everything derived from one input file.
#[derive(Clone, Debug)]
pub struct TraceAnalysis {
    pub source: PathBuf,
    pub parameter: Parameter,
    pub trace: Trace,
    pub smoothed: SmoothedTrace,
    pub minima: Option<[MinimumRecord; 2]>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameter_labels_carry_units() {
        assert_eq!(
            Parameter::new(ParameterKind::Temperature, 300).label(),
            "T = 300 K"
        );
        assert_eq!(
            Parameter::new(ParameterKind::StopVoltage, -500).label(),
            "U_s = -500 mV"
        );
    }

    #[test]
    fn trace_keeps_acquisition_order() {
        let samples = [
            Sample { time: 0.0, current: 3.0, voltage: 0.5 },
            Sample { time: 1.0, current: 1.0, voltage: 0.1 },
            Sample { time: 2.0, current: 2.0, voltage: 0.9 },
        ];
        let trace = Trace::from_samples(&samples);
        assert_eq!(trace.len(), 3);
        assert_eq!(trace.sample(1), Some(samples[1]));
        assert_eq!(trace.sample(3), None);
        assert_eq!(trace.voltage_span(), Some((0.5, 0.9)));
    }
}
