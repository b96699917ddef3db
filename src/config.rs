use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::analysis::minima::ExtractorConfig;
use crate::analysis::plot::PlotStyle;
use crate::analysis::preprocess::VOLTAGE_CALIBRATION_FACTOR;
use crate::analysis::AnalysisError;
use crate::types::ParameterKind;

/// Settings of one analysis run (one measurement series).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub name: String,
    /// Matched against bare file names inside the data directory.
    pub file_glob: String,
    pub parameter: ParameterKind,
    /// Gaussian standard deviation in samples.
    pub sigma: f64,
    #[serde(default = "default_voltage_factor")]
    pub voltage_factor: f64,
    #[serde(default)]
    pub extract_minima: bool,
    #[serde(default)]
    pub extractor: ExtractorConfig,
    /// File name of the overlay plot inside the plots directory.
    pub overlay_plot: String,
    /// File name of the minima-vs-parameter plot, when minima are extracted.
    #[serde(default)]
    pub minima_plot: Option<String>,
    /// Summary CSV names for the first and second minimum.
    #[serde(default)]
    pub summary_files: Option<[String; 2]>,
}

fn default_voltage_factor() -> f64 {
    VOLTAGE_CALIBRATION_FACTOR
}

impl RunConfig {
    /// Temperature series at a fixed 3000 mV stop voltage.
    pub fn temperature_sweep() -> Self {
        Self {
            name: "temperature".into(),
            file_glob: "T*3000mV*".into(),
            parameter: ParameterKind::Temperature,
            sigma: 2.0,
            voltage_factor: VOLTAGE_CALIBRATION_FACTOR,
            extract_minima: false,
            extractor: ExtractorConfig::default(),
            overlay_plot: "constant_stop_voltage.png".into(),
            minima_plot: None,
            summary_files: None,
        }
    }

    /// Stop-voltage series at a fixed temperature.
    pub fn stop_voltage_sweep() -> Self {
        Self {
            name: "stop-voltage".into(),
            file_glob: "T_15*".into(),
            parameter: ParameterKind::StopVoltage,
            sigma: 3.0,
            voltage_factor: VOLTAGE_CALIBRATION_FACTOR,
            extract_minima: true,
            extractor: ExtractorConfig::default(),
            overlay_plot: "constant_temp.png".into(),
            minima_plot: Some("current_minima.png".into()),
            summary_files: Some(["first_minimum.csv".into(), "second_minimum.csv".into()]),
        }
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        let invalid = |reason: String| AnalysisError::InvalidConfig(format!("{}: {reason}", self.name));
        if !self.sigma.is_finite() || self.sigma < 0.0 {
            return Err(invalid(format!("sigma must be finite and >= 0, got {}", self.sigma)));
        }
        if !self.voltage_factor.is_finite() {
            return Err(invalid("voltage_factor must be finite".into()));
        }
        if self.file_glob.trim().is_empty() {
            return Err(invalid("file_glob is empty".into()));
        }
        if !self.extract_minima && (self.minima_plot.is_some() || self.summary_files.is_some()) {
            return Err(invalid(
                "minima_plot and summary_files require extract_minima".into(),
            ));
        }
        Ok(())
    }
}

/// Complete tool configuration. Every field falls back to the lab defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub temperature: RunConfig,
    pub stop_voltage: RunConfig,
    pub plot: PlotStyle,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            temperature: RunConfig::temperature_sweep(),
            stop_voltage: RunConfig::stop_voltage_sweep(),
            plot: PlotStyle::default(),
        }
    }
}

impl AnalysisConfig {
    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, AnalysisError> {
        let text = fs::read_to_string(path).map_err(AnalysisError::io(path))?;
        let config = Self::from_json_str(&text).map_err(|source| AnalysisError::ConfigFile {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        self.temperature.validate()?;
        self.stop_voltage.validate()?;
        self.plot.validate()
    }
}
