use log::debug;
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

use crate::analysis::AnalysisError;
use crate::types::{MinimumRank, MinimumRecord, Trace};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Report a flat valley once (its first position) instead of once per flat sample.
    pub collapse_plateaus: bool,
}

/// Positions where the slope turns from non-increasing to increasing, in sequence order.
///
/// Every position of a flat valley bottom qualifies on its own, so one
/// physical valley can produce adjacent candidates. A position next to a
/// NaN value never qualifies.
pub fn minimum_candidates(values: ArrayView1<'_, f64>) -> Vec<usize> {
    let slopes: Vec<Option<i8>> = values
        .iter()
        .zip(values.iter().skip(1))
        .map(|(a, b)| slope_sign(b - a))
        .collect();
    slopes
        .iter()
        .zip(slopes.iter().skip(1))
        .enumerate()
        .filter_map(|(idx, pair)| match pair {
            (Some(before), Some(after)) if after - before > 0 => Some(idx + 1),
            _ => None,
        })
        .collect()
}

/// Keeps the first position of each run of consecutive candidates.
pub fn collapse_plateaus(candidates: &[usize]) -> Vec<usize> {
    let mut collapsed: Vec<usize> = Vec::with_capacity(candidates.len());
    let mut previous: Option<usize> = None;
    for &candidate in candidates {
        if previous.map_or(true, |p| candidate != p + 1) {
            collapsed.push(candidate);
        }
        previous = Some(candidate);
    }
    collapsed
}

/// `None` for NaN.
fn slope_sign(delta: f64) -> Option<i8> {
    if delta > 0.0 {
        Some(1)
    } else if delta < 0.0 {
        Some(-1)
    } else if delta == 0.0 {
        Some(0)
    } else {
        None
    }
}

/// Finds the last two local minima of a smoothed current and reports the raw samples there.
#[derive(Clone, Copy, Debug, Default)]
pub struct MinimumExtractor {
    config: ExtractorConfig,
}

impl MinimumExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    pub fn candidates(&self, smoothed_current: ArrayView1<'_, f64>) -> Vec<usize> {
        let candidates = minimum_candidates(smoothed_current);
        if !self.config.collapse_plateaus {
            return candidates;
        }
        let collapsed = collapse_plateaus(&candidates);
        if collapsed.len() != candidates.len() {
            debug!(
                "collapsed {} plateau candidate(s)",
                candidates.len() - collapsed.len()
            );
        }
        collapsed
    }

    /// Detection runs on `smoothed_current`; the reported values come from `trace`.
    pub fn extract(
        &self,
        smoothed_current: ArrayView1<'_, f64>,
        trace: &Trace,
    ) -> Result<[MinimumRecord; 2], AnalysisError> {
        if smoothed_current.len() != trace.len() {
            return Err(AnalysisError::LengthMismatch {
                expected: trace.len(),
                actual: smoothed_current.len(),
            });
        }
        let candidates = self.candidates(smoothed_current);
        let [.., first, second] = candidates.as_slice() else {
            return Err(AnalysisError::InsufficientMinima {
                found: candidates.len(),
            });
        };
        Ok([
            record(MinimumRank::First, *first, trace)?,
            record(MinimumRank::Second, *second, trace)?,
        ])
    }
}

fn record(rank: MinimumRank, index: usize, trace: &Trace) -> Result<MinimumRecord, AnalysisError> {
    let sample = trace.sample(index).ok_or(AnalysisError::LengthMismatch {
        expected: trace.len(),
        actual: index + 1,
    })?;
    Ok(MinimumRecord {
        rank,
        index,
        current: sample.current,
        voltage: sample.voltage,
    })
}
