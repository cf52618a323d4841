//! Error taxonomy for the electrification pipeline
//!
//! Every stage returns [`PipelineError`]. Input problems (unreadable files,
//! missing columns) and fitting problems (degenerate partitions) surface
//! immediately; nothing is retried and no partial results are produced.

use std::fmt;
use thiserror::Error;

/// Pipeline stage names, used to tell the user where a run failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Cleaning,
    Exploration,
    Preprocessing,
    Modeling,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Cleaning => "data cleaning",
            Stage::Exploration => "exploratory analysis",
            Stage::Preprocessing => "preprocessing",
            Stage::Modeling => "model training & evaluation",
        };
        f.write_str(name)
    }
}

/// Errors for pipeline operations
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Cannot access {path}: {message}")]
    FileAccess { path: String, message: String },

    #[error("Malformed CSV in {path}: {message}")]
    Csv { path: String, message: String },

    #[error("Required column '{column}' is missing")]
    MissingColumn { column: String },

    #[error("Invalid data in column '{column}': {message}")]
    DataQuality { column: String, message: String },

    #[error("Insufficient data: need at least {required} records, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("Model fitting failed: {0}")]
    Fit(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Report export failed: {0}")]
    Report(String),

    #[error("{stage} failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: Box<PipelineError>,
    },
}

impl PipelineError {
    /// Wrap an error with the stage it occurred in
    pub fn in_stage(self, stage: Stage) -> Self {
        match self {
            already @ PipelineError::Stage { .. } => already,
            other => PipelineError::Stage {
                stage,
                source: Box::new(other),
            },
        }
    }

    pub(crate) fn file_access(path: impl AsRef<std::path::Path>, err: impl fmt::Display) -> Self {
        PipelineError::FileAccess {
            path: path.as_ref().display().to_string(),
            message: err.to_string(),
        }
    }

    pub(crate) fn missing_column(column: &str) -> Self {
        PipelineError::MissingColumn {
            column: column.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
