//! Configuration for the electrification pipeline
//!
//! Every bound, ratio and seed the pipeline uses lives here. Stages receive
//! their section by reference; nothing reads a hidden constant.

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Closed interval `[min, max]` used for clipping and outlier bounds
///
/// Serialized as a two-element array so TOML reads naturally:
/// `electrification_clip = [30.0, 98.0]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Clamp a value to the nearest bound
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    fn validate(&self, name: &str) -> Result<()> {
        if !(self.min.is_finite() && self.max.is_finite()) || self.min > self.max {
            return Err(PipelineError::InvalidConfig(format!(
                "{name} must satisfy min <= max, got [{}, {}]",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

impl From<[f64; 2]> for Bounds {
    fn from([min, max]: [f64; 2]) -> Self {
        Self { min, max }
    }
}

impl From<Bounds> for [f64; 2] {
    fn from(bounds: Bounds) -> Self {
        [bounds.min, bounds.max]
    }
}

/// Cleaning thresholds
///
/// # Example
/// ```
/// use electrify::config::CleaningConfig;
///
/// let config = CleaningConfig::default();
/// assert_eq!(config.electrification_clip.max, 98.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningConfig {
    /// Villages below this population are listed as outliers (not removed)
    pub min_population: i64,

    /// Villages above this population are listed as outliers (not removed)
    pub max_population: i64,

    /// Smallest plausible village area in km²
    pub min_area_sqkm: f64,

    /// Largest plausible village area in km²
    pub max_area_sqkm: f64,

    /// Electrification percentages are clamped into this range
    pub electrification_clip: Bounds,

    /// Grid distances (km) are clamped into this range
    pub distance_clip: Bounds,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            min_population: 500,
            max_population: 100_000,
            min_area_sqkm: 1.0,
            max_area_sqkm: 100.0,
            electrification_clip: Bounds::new(30.0, 98.0),
            distance_clip: Bounds::new(1.0, 100.0),
        }
    }
}

impl CleaningConfig {
    pub fn population_bounds(&self) -> Bounds {
        Bounds::new(self.min_population as f64, self.max_population as f64)
    }

    pub fn area_bounds(&self) -> Bounds {
        Bounds::new(self.min_area_sqkm, self.max_area_sqkm)
    }

    pub fn validate(&self) -> Result<()> {
        self.population_bounds().validate("population bounds")?;
        self.area_bounds().validate("area bounds")?;
        self.electrification_clip.validate("electrification_clip")?;
        self.distance_clip.validate("distance_clip")?;
        Ok(())
    }
}

/// Train/test split parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Share of records assigned to the test partition (rounded up)
    pub test_fraction: f64,

    /// Seed for the shuffle; the same seed and row count give the same split
    pub split_seed: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            split_seed: 42,
        }
    }
}

impl SplitConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(PipelineError::InvalidConfig(format!(
                "test_fraction must be in (0, 1), got {}",
                self.test_fraction
            )));
        }
        Ok(())
    }
}

/// Evaluation report parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Number of test records shown in the prediction sample
    pub sample_report_rows: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            sample_report_rows: 10,
        }
    }
}

impl ModelConfig {
    pub fn validate(&self) -> Result<()> {
        if self.sample_report_rows == 0 {
            return Err(PipelineError::InvalidConfig(
                "sample_report_rows must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Complete pipeline configuration
///
/// Loaded from TOML; any missing key falls back to its default.
///
/// ```toml
/// input_path = "Data/data.csv"
/// output_path = "Data/cleaned_data.csv"
///
/// [cleaning]
/// electrification_clip = [30.0, 98.0]
///
/// [split]
/// test_fraction = 0.25
/// split_seed = 7
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub cleaning: CleaningConfig,
    pub split: SplitConfig,
    pub model: ModelConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("Data/data.csv"),
            output_path: PathBuf::from("Data/cleaned_data.csv"),
            cleaning: CleaningConfig::default(),
            split: SplitConfig::default(),
            model: ModelConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Parse a configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: PipelineConfig =
            toml::from_str(text).map_err(|e| PipelineError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| PipelineError::file_access(path, e))?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| PipelineError::InvalidConfig(e.to_string()))
    }

    /// Validate every section
    pub fn validate(&self) -> Result<()> {
        self.cleaning.validate()?;
        self.split.validate()?;
        self.model.validate()?;
        Ok(())
    }
}
