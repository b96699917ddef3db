// src/main.rs
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::info;

use retarding_analysis::analysis::{
    write_outputs, AnalysisPipeline, DirectorySource, OutputDirs, PlotStyle,
};
use retarding_analysis::config::{AnalysisConfig, RunConfig};

#[derive(Parser, Debug)]
#[command(author, version, about = "Retarding-potential trace analysis", long_about = None)]
struct Cli {
    /// Which measurement series to analyse
    #[arg(value_enum, default_value_t = RunSelection::All)]
    run: RunSelection,

    /// Directory holding the recorded traces
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Directory for PNG figures
    #[arg(long, default_value = "plots")]
    plots_dir: PathBuf,

    /// Directory for the summary CSV files
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// JSON file overriding the built-in run and plot settings
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum RunSelection {
    /// Temperature series at constant stop voltage
    Temperature,
    /// Stop-voltage series at constant temperature
    StopVoltage,
    /// Both series, one after the other
    All,
}

impl RunSelection {
    fn runs(self, config: &AnalysisConfig) -> Vec<&RunConfig> {
        match self {
            RunSelection::Temperature => vec![&config.temperature],
            RunSelection::StopVoltage => vec![&config.stop_voltage],
            RunSelection::All => vec![&config.temperature, &config.stop_voltage],
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AnalysisConfig::from_json_file(path)
            .with_context(|| format!("failed to load configuration {}", path.display()))?,
        None => AnalysisConfig::default(),
    };
    config.validate()?;
    let dirs = OutputDirs {
        plots_dir: cli.plots_dir.clone(),
        output_dir: cli.output_dir.clone(),
    };
    for run in cli.run.runs(&config) {
        run_analysis(&cli.data_dir, run, &config.plot, &dirs)
            .with_context(|| format!("{} analysis failed", run.name))?;
    }
    Ok(())
}

fn run_analysis(
    data_dir: &Path,
    run: &RunConfig,
    style: &PlotStyle,
    dirs: &OutputDirs,
) -> Result<()> {
    let source = DirectorySource::discover(data_dir, &run.file_glob, run.parameter)?;
    info!(
        "{}: {} file(s) matching `{}` in {}",
        run.name,
        source.remaining(),
        run.file_glob,
        data_dir.display()
    );
    let outcome = AnalysisPipeline::new(source, run.clone()).run()?;
    for path in write_outputs(&outcome, run, style, dirs)? {
        info!("wrote {}", path.display());
    }
    Ok(())
}
