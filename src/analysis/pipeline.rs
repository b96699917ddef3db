use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::analysis::error::AnalysisError;
use crate::analysis::minima::MinimumExtractor;
use crate::analysis::plot::{render_minima_png, render_overlay_png, save_png, PlotStyle};
use crate::analysis::preprocess::rescale_voltage;
use crate::analysis::smooth::{smooth_trace, GaussianKernel, DEFAULT_TRUNCATE};
use crate::analysis::source::{LoadedTrace, TraceSource};
use crate::analysis::summary::{build_summary_tables, write_summary_csv, SummaryTable};
use crate::config::RunConfig;
use crate::types::TraceAnalysis;

/// Result of one run, ordered by identifying parameter.
#[derive(Clone, Debug)]
pub struct RunOutcome {
    pub analyses: Vec<TraceAnalysis>,
    pub summaries: Option<[SummaryTable; 2]>,
}

/// Where a run writes its artifacts.
#[derive(Clone, Debug)]
pub struct OutputDirs {
    pub plots_dir: PathBuf,
    pub output_dir: PathBuf,
}

/// Load → rescale → smooth → extract, one trace at a time.
pub struct AnalysisPipeline<S: TraceSource> {
    source: S,
    run: RunConfig,
    extractor: MinimumExtractor,
}

impl<S: TraceSource> AnalysisPipeline<S> {
    pub fn new(source: S, run: RunConfig) -> Self {
        let extractor = MinimumExtractor::new(run.extractor);
        Self {
            source,
            run,
            extractor,
        }
    }

    pub fn analyse_next(&mut self) -> Result<Option<TraceAnalysis>, AnalysisError> {
        let Some(loaded) = self.source.next_trace()? else {
            return Ok(None);
        };
        let analysis = analyse_trace(loaded, &self.run, &self.extractor)?;
        Ok(Some(analysis))
    }

    /// Drains the source. The first failing trace aborts the run.
    pub fn run(mut self) -> Result<RunOutcome, AnalysisError> {
        let mut analyses = Vec::new();
        while let Some(analysis) = self.analyse_next()? {
            analyses.push(analysis);
        }
        sort_by_parameter(&mut analyses);
        let summaries = if self.run.extract_minima {
            Some(build_summary_tables(&analyses)?)
        } else {
            None
        };
        info!("{}: analysed {} trace(s)", self.run.name, analyses.len());
        Ok(RunOutcome {
            analyses,
            summaries,
        })
    }
}

pub fn analyse_trace(
    loaded: LoadedTrace,
    run: &RunConfig,
    extractor: &MinimumExtractor,
) -> Result<TraceAnalysis, AnalysisError> {
    let LoadedTrace {
        path,
        parameter,
        trace,
    } = loaded;
    let trace = rescale_voltage(trace, run.voltage_factor);
    let kernel_width = 2 * GaussianKernel::new(run.sigma, DEFAULT_TRUNCATE).radius() + 1;
    if trace.len() < kernel_width {
        warn!(
            "{}: {} samples is shorter than the smoothing kernel ({kernel_width})",
            path.display(),
            trace.len()
        );
    }
    let smoothed = smooth_trace(&trace, run.sigma);
    let minima = if run.extract_minima {
        let minima = extractor
            .extract(smoothed.current.view(), &trace)
            .map_err(AnalysisError::in_file(&path))?;
        debug!(
            "{} ({parameter}): minima at rows {} and {}",
            path.display(),
            minima[0].index,
            minima[1].index
        );
        Some(minima)
    } else {
        None
    };
    Ok(TraceAnalysis {
        source: path,
        parameter,
        trace,
        smoothed,
        minima,
    })
}

/// Ascending by parameter value. Repeat measurements keep their load order.
pub fn sort_by_parameter(analyses: &mut [TraceAnalysis]) {
    analyses.sort_by_key(|analysis| analysis.parameter.value);
}

/// Renders and writes every artifact the run is configured for. Returns the written paths.
pub fn write_outputs(
    outcome: &RunOutcome,
    run: &RunConfig,
    style: &PlotStyle,
    dirs: &OutputDirs,
) -> Result<Vec<PathBuf>, AnalysisError> {
    create_dir(&dirs.plots_dir)?;
    let mut written = Vec::new();

    let overlay = dirs.plots_dir.join(&run.overlay_plot);
    save_png(&render_overlay_png(&outcome.analyses, style)?, &overlay)?;
    written.push(overlay);

    if let Some(tables) = &outcome.summaries {
        if let Some(name) = &run.minima_plot {
            let path = dirs.plots_dir.join(name);
            save_png(&render_minima_png(tables, style)?, &path)?;
            written.push(path);
        }
        if let Some(names) = &run.summary_files {
            create_dir(&dirs.output_dir)?;
            for (table, name) in tables.iter().zip(names) {
                let path = dirs.output_dir.join(name);
                write_summary_csv(table, &path)?;
                written.push(path);
            }
        }
    }
    Ok(written)
}

fn create_dir(dir: &Path) -> Result<(), AnalysisError> {
    fs::create_dir_all(dir).map_err(AnalysisError::io(dir))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::source::{DirectorySource, ManualSource};
    use crate::analysis::summary::read_summary_csv;
    use crate::types::{MinimumRank, Parameter, ParameterKind, Sample, Trace};

    /// Two smooth valleys whose depth depends on `depth`.
    fn valley_trace(depth: f64) -> Trace {
        let samples: Vec<Sample> = (0..120)
            .map(|i| {
                let x = i as f64 / 119.0;
                Sample {
                    time: i as f64,
                    current: (1.0 + depth * (4.0 * std::f64::consts::PI * x).cos()) * 1e-9,
                    voltage: x * 10.0,
                }
            })
            .collect();
        Trace::from_samples(&samples)
    }

    fn loaded(stop_mv: i64) -> LoadedTrace {
        LoadedTrace {
            path: PathBuf::from(format!("T_150_VR_{stop_mv}mV.txt")),
            parameter: Parameter::new(ParameterKind::StopVoltage, stop_mv),
            trace: valley_trace(0.2 + stop_mv as f64 / 10_000.0),
        }
    }

    fn bare_style() -> PlotStyle {
        PlotStyle {
            width_in: 2.0,
            height_in: 1.5,
            dpi: 40,
            annotate: false,
            ..PlotStyle::default()
        }
    }

    fn trace_file(trace: &Trace) -> String {
        let mut text = String::from("Messdaten\nKanal 1/2\nTime\tI\tU\n");
        for i in 0..trace.len() {
            text.push_str(
                &format!("{}\t{:e}\t{}\n", trace.time[i], trace.current[i], trace.voltage[i])
                    .replace('.', ","),
            );
        }
        text
    }

    #[test]
    fn pipeline_sorts_and_extracts() {
        let source = ManualSource::new([loaded(1500), loaded(-500), loaded(250)]);
        let outcome = AnalysisPipeline::new(source, RunConfig::stop_voltage_sweep())
            .run()
            .unwrap();
        let order: Vec<i64> = outcome.analyses.iter().map(|a| a.parameter.value).collect();
        assert_eq!(order, vec![-500, 250, 1500]);
        for analysis in &outcome.analyses {
            assert_eq!(analysis.smoothed.len(), analysis.trace.len());
            assert!((analysis.trace.voltage[119] - 20.0).abs() < 1e-9);
            let minima = analysis.minima.unwrap();
            assert!(minima[0].index < minima[1].index);
            assert!((minima[0].index as i64 - 30).abs() <= 2);
            assert!((minima[1].index as i64 - 89).abs() <= 2);
        }
        let tables = outcome.summaries.unwrap();
        assert_eq!(tables[0].rank, MinimumRank::First);
        assert_eq!(tables[1].rows.len(), 3);
    }

    #[test]
    fn temperature_run_skips_extraction() {
        let trace = LoadedTrace {
            path: PathBuf::from("T_300_VR_3000mV.txt"),
            parameter: Parameter::new(ParameterKind::Temperature, 300),
            trace: valley_trace(0.0),
        };
        let outcome = AnalysisPipeline::new(ManualSource::new([trace]), RunConfig::temperature_sweep())
            .run()
            .unwrap();
        assert!(outcome.analyses[0].minima.is_none());
        assert!(outcome.summaries.is_none());
    }

    #[test]
    fn missing_minima_abort_the_run() {
        let flat = LoadedTrace {
            path: PathBuf::from("T_150_VR_100mV.txt"),
            parameter: Parameter::new(ParameterKind::StopVoltage, 100),
            trace: valley_trace(0.0),
        };
        let err = AnalysisPipeline::new(ManualSource::new([loaded(0), flat]), RunConfig::stop_voltage_sweep())
            .run()
            .unwrap_err();
        match err {
            AnalysisError::InFile { source, .. } => {
                assert!(matches!(*source, AnalysisError::InsufficientMinima { .. }))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn duplicate_stop_voltages_abort_the_run() {
        let source = ManualSource::new([loaded(100), loaded(200), loaded(100)]);
        let err = AnalysisPipeline::new(source, RunConfig::stop_voltage_sweep())
            .run()
            .unwrap_err();
        assert!(matches!(err, AnalysisError::DuplicateParameter { value: 100, .. }));
    }

    #[test]
    fn repeated_temperatures_are_all_plotted() {
        let at = |value: i64, name: &str| LoadedTrace {
            path: PathBuf::from(name),
            parameter: Parameter::new(ParameterKind::Temperature, value),
            trace: valley_trace(0.1),
        };
        let source = ManualSource::new([
            at(300, "T_300_VR_3000mV.txt"),
            at(150, "T_150_VR_3000mV.txt"),
            at(300, "T_300_VR_3000mV_repeat.txt"),
        ]);
        let outcome = AnalysisPipeline::new(source, RunConfig::temperature_sweep())
            .run()
            .unwrap();
        let sources: Vec<&Path> = outcome.analyses.iter().map(|a| a.source.as_path()).collect();
        assert_eq!(
            sources,
            vec![
                Path::new("T_150_VR_3000mV.txt"),
                Path::new("T_300_VR_3000mV.txt"),
                Path::new("T_300_VR_3000mV_repeat.txt"),
            ]
        );
        assert!(outcome.summaries.is_none());
    }

    #[test]
    fn runs_from_files_to_csv() {
        let data = tempfile::tempdir().unwrap();
        for stop_mv in [750, -250, 0] {
            let trace = valley_trace(0.3);
            std::fs::write(
                data.path().join(format!("T_150_VR_{stop_mv}mV.txt")),
                trace_file(&trace),
            )
            .unwrap();
        }
        std::fs::write(data.path().join("T_300_VR_3000mV.txt"), "a\nb\n0 1 2\n").unwrap();

        let run = RunConfig::stop_voltage_sweep();
        let source = DirectorySource::discover(data.path(), &run.file_glob, run.parameter).unwrap();
        assert_eq!(source.remaining(), 3);
        let outcome = AnalysisPipeline::new(source, run.clone()).run().unwrap();
        let out = tempfile::tempdir().unwrap();
        let dirs = OutputDirs {
            plots_dir: out.path().join("plots"),
            output_dir: out.path().to_path_buf(),
        };
        write_outputs(&outcome, &run, &bare_style(), &dirs).unwrap();
        let first = read_summary_csv(MinimumRank::First, &out.path().join("first_minimum.csv")).unwrap();
        let second = read_summary_csv(MinimumRank::Second, &out.path().join("second_minimum.csv")).unwrap();
        let stops: Vec<f64> = first.stop_voltages().collect();
        assert_eq!(stops, vec![-250.0, 0.0, 750.0]);
        let tables = outcome.summaries.as_ref().unwrap();
        assert_eq!(&first, &tables[0]);
        assert_eq!(&second, &tables[1]);
    }

    #[test]
    fn writes_every_artifact() {
        let source = ManualSource::new([loaded(300), loaded(100)]);
        let run = RunConfig::stop_voltage_sweep();
        let outcome = AnalysisPipeline::new(source, run.clone()).run().unwrap();
        let out = tempfile::tempdir().unwrap();
        let dirs = OutputDirs {
            plots_dir: out.path().join("plots"),
            output_dir: out.path().join("tables"),
        };
        let written = write_outputs(&outcome, &run, &bare_style(), &dirs).unwrap();
        assert_eq!(
            written,
            vec![
                dirs.plots_dir.join("constant_temp.png"),
                dirs.plots_dir.join("current_minima.png"),
                dirs.output_dir.join("first_minimum.csv"),
                dirs.output_dir.join("second_minimum.csv"),
            ]
        );
        assert!(written.iter().all(|path| path.is_file()));
    }
}
