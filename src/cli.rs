//! CLI argument parsing for electrify

use crate::config::PipelineConfig;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Console output format for the pipeline report
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    Text,
    /// JSON format for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "electrify")]
#[command(version)]
#[command(about = "Rural electrification predictor: clean village data and fit a linear model", long_about = None)]
pub struct Cli {
    /// Raw village CSV (overrides the config file; default Data/data.csv)
    #[arg(short, long, value_name = "PATH")]
    pub input: Option<PathBuf>,

    /// Destination of the cleaned CSV (default Data/cleaned_data.csv)
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// TOML configuration file with cleaning bounds, split and report settings
    #[arg(short, long, value_name = "TOML")]
    pub config: Option<PathBuf>,

    /// Share of villages held out for testing, in (0, 1)
    #[arg(long = "test-fraction", value_name = "FRACTION")]
    pub test_fraction: Option<f64>,

    /// Seed for the train/test shuffle
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Number of test predictions listed in the report
    #[arg(long = "sample-rows", value_name = "N")]
    pub sample_rows: Option<usize>,

    /// Output format (text or json)
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Also write the structured report as JSON to this path
    #[arg(long = "report-json", value_name = "PATH")]
    pub report_json: Option<PathBuf>,

    /// Stop after writing the cleaned dataset
    #[arg(long = "clean-only")]
    pub clean_only: bool,

    /// Enable debug tracing output to stderr
    #[arg(long = "debug")]
    pub debug: bool,
}

impl Cli {
    /// Apply command-line overrides on top of a loaded configuration
    pub fn apply_overrides(&self, config: &mut PipelineConfig) {
        if let Some(input) = &self.input {
            config.input_path = input.clone();
        }
        if let Some(output) = &self.output {
            config.output_path = output.clone();
        }
        if let Some(fraction) = self.test_fraction {
            config.split.test_fraction = fraction;
        }
        if let Some(seed) = self.seed {
            config.split.split_seed = seed;
        }
        if let Some(rows) = self.sample_rows {
            config.model.sample_report_rows = rows;
        }
    }
}
