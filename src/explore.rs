//! Exploratory statistics for a cleaned village table
//!
//! Textual counterpart of a dataframe `describe()`/`info()` plus the
//! correlation between grid distance and electrification. Basic moments come
//! from trueno vectors; quartiles use aprender's R-7 quantiles and the
//! correlation is aprender's `stats::corr`.

use crate::error::{PipelineError, Result};
use crate::table::{Table, DISTANCE_FROM_GRID_KM, ELECTRIFICATION_PCT};
use aprender::stats::{corr, DescriptiveStats};
use serde::Serialize;
use trueno::Vector;

/// Schema entry for one column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnInfo {
    pub column: String,
    pub non_null: usize,
    pub dtype: String,
}

/// Descriptive statistics for one numeric column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub column: String,
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (n - 1); absent for a single value
    pub std: Option<f64>,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExplorationReport {
    pub rows: usize,
    pub columns: Vec<ColumnInfo>,
    pub summaries: Vec<ColumnSummary>,
    /// Pearson r between grid distance and electrification
    pub distance_electrification_corr: Option<f64>,
}

/// Summarize a cleaned table
pub fn explore(table: &Table) -> Result<ExplorationReport> {
    let distance = table.require(DISTANCE_FROM_GRID_KM)?.numeric_values();
    let electrification = table.require(ELECTRIFICATION_PCT)?.numeric_values();

    let columns = table
        .columns()
        .map(|(name, column)| ColumnInfo {
            column: name.to_string(),
            non_null: column.len() - column.null_count(),
            dtype: column.dtype().to_string(),
        })
        .collect();

    let mut summaries = Vec::new();
    for (name, column) in table.columns().filter(|(_, c)| c.is_numeric()) {
        let values = column.numeric_values();
        if values.is_empty() {
            continue;
        }
        summaries.push(summarize(name, &values)?);
    }

    let distance_electrification_corr = if distance.len() == electrification.len() {
        pearson(&distance, &electrification)
    } else {
        None
    };
    tracing::debug!(corr = ?distance_electrification_corr, "distance/electrification correlation");

    Ok(ExplorationReport {
        rows: table.n_rows(),
        columns,
        summaries,
        distance_electrification_corr,
    })
}

fn summarize(name: &str, values: &[f64]) -> Result<ColumnSummary> {
    let as_f32: Vec<f32> = values.iter().map(|&v| v as f32).collect();
    let vector = Vector::from_slice(&as_f32);
    let stats_error = |e: String| PipelineError::DataQuality {
        column: name.to_string(),
        message: e,
    };

    let mean = vector.mean().map_err(|e| stats_error(e.to_string()))?;
    let min = vector.min().map_err(|e| stats_error(e.to_string()))?;
    let max = vector.max().map_err(|e| stats_error(e.to_string()))?;

    let n = values.len();
    // trueno reports population variance; rescale to the sample estimate
    let std = if n > 1 {
        let variance = vector.variance().map_err(|e| stats_error(e.to_string()))?;
        Some((f64::from(variance) * n as f64 / (n - 1) as f64).sqrt())
    } else {
        None
    };

    let stats = DescriptiveStats::new(&vector);
    let q25 = stats.quantile(0.25).map_err(stats_error)?;
    let median = stats.quantile(0.5).map_err(stats_error)?;
    let q75 = stats.quantile(0.75).map_err(stats_error)?;

    Ok(ColumnSummary {
        column: name.to_string(),
        count: n,
        mean: f64::from(mean),
        std,
        min: f64::from(min),
        q25: f64::from(q25),
        median: f64::from(median),
        q75: f64::from(q75),
        max: f64::from(max),
    })
}

/// Pearson correlation; `None` when undefined (too few rows or a constant side)
fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() < 2 || x.len() != y.len() {
        return None;
    }
    let to_vector = |values: &[f64]| {
        let values: Vec<f32> = values.iter().map(|&v| v as f32).collect();
        aprender::primitives::Vector::from_slice(&values)
    };
    match corr(&to_vector(x), &to_vector(y)) {
        Ok(r) if r.is_finite() => Some(f64::from(r)),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!(error = %e, "correlation undefined");
            None
        }
    }
}
