//! Structured pipeline report and its renderings
//!
//! Stages return plain data; this module turns it into console text
//! (`Display`) or JSON (`serde_json`).

use crate::cleaning::{CleaningReport, OutlierRow};
use crate::error::{PipelineError, Result};
use crate::explore::ExplorationReport;
use crate::model::EvaluationReport;
use crate::preprocess::PreprocessingSummary;
use serde::Serialize;
use std::fmt;
use std::path::Path;

const RULE: &str = "──────────────────────────────────────────────────────────────────────";

/// Aggregated output of one pipeline run
///
/// Later stages are absent when the run stopped after cleaning.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineReport {
    pub cleaning: CleaningReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exploration: Option<ExplorationReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preprocessing: Option<PreprocessingSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<EvaluationReport>,
}

impl PipelineReport {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| PipelineError::Report(e.to_string()))
    }

    /// Write the JSON report, creating parent directories as needed
    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| PipelineError::file_access(parent, e))?;
        }
        std::fs::write(path, self.to_json()?).map_err(|e| PipelineError::file_access(path, e))
    }
}

fn section(f: &mut fmt::Formatter<'_>, step: usize, title: &str) -> fmt::Result {
    writeln!(f)?;
    writeln!(f, "[STEP {step}/4] {title}")?;
    writeln!(f, "{RULE}")
}

impl fmt::Display for PipelineReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        section(f, 1, "DATA CLEANING")?;
        write!(f, "{}", self.cleaning)?;

        if let Some(exploration) = &self.exploration {
            section(f, 2, "EXPLORATORY DATA ANALYSIS")?;
            write!(f, "{exploration}")?;
        }
        if let Some(preprocessing) = &self.preprocessing {
            section(f, 3, "DATA PREPROCESSING")?;
            write!(f, "{preprocessing}")?;
        }
        if let Some(evaluation) = &self.evaluation {
            section(f, 4, "MODEL TRAINING & EVALUATION")?;
            write!(f, "{evaluation}")?;
        }
        Ok(())
    }
}

fn write_outliers(
    f: &mut fmt::Formatter<'_>,
    title: &str,
    column: &str,
    rows: &[OutlierRow],
) -> fmt::Result {
    writeln!(f, "{title}")?;
    if rows.is_empty() {
        return writeln!(f, "  None found");
    }
    writeln!(f, "  {:<24} {:>14}", "village_name", column)?;
    for row in rows {
        writeln!(f, "  {:<24} {:>14.2}", row.village_name, row.value)?;
    }
    Ok(())
}

impl fmt::Display for CleaningReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Missing values before cleaning:")?;
        for missing in &self.missing_before {
            writeln!(f, "  {:<24} {:>6}", missing.column, missing.missing)?;
        }
        writeln!(
            f,
            "Dropped {} row(s) missing village_name or electrification_pct",
            self.dropped_missing_keys
        )?;
        for imputation in &self.imputations {
            writeln!(
                f,
                "Filled {} null(s) in {} with median {}",
                imputation.filled, imputation.column, imputation.median
            )?;
        }
        writeln!(f, "Removed {} duplicate village name(s)", self.duplicates_removed)?;

        write_outliers(
            f,
            &format!(
                "Population outliers (<{} or >{}):",
                self.population_bounds.min, self.population_bounds.max
            ),
            "population",
            &self.population_outliers,
        )?;
        write_outliers(
            f,
            &format!(
                "Area outliers (<{} or >{}):",
                self.area_bounds.min, self.area_bounds.max
            ),
            "area_sqkm",
            &self.area_outliers,
        )?;

        writeln!(
            f,
            "Dropped {} row(s) with non-positive pop_density",
            self.dropped_non_positive_density
        )?;
        for clip in &self.clipped {
            writeln!(
                f,
                "Clipped {} to [{}, {}]: {} raised, {} lowered",
                clip.column, clip.bounds.min, clip.bounds.max, clip.raised_to_min, clip.lowered_to_max
            )?;
        }
        writeln!(
            f,
            "Final cleaned dataset shape: ({}, {})",
            self.final_shape.0, self.final_shape.1
        )?;
        if let Some(path) = &self.output_path {
            writeln!(f, "Cleaned dataset saved to: {path}")?;
        }
        Ok(())
    }
}

impl fmt::Display for ExplorationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Descriptive Statistics:")?;
        writeln!(
            f,
            "  {:<24} {:>6} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10}",
            "column", "count", "mean", "std", "min", "25%", "50%", "75%", "max"
        )?;
        for s in &self.summaries {
            let std = s
                .std
                .map_or_else(|| "NaN".to_string(), |v| format!("{v:.2}"));
            writeln!(
                f,
                "  {:<24} {:>6} {:>10.2} {:>10} {:>10.2} {:>10.2} {:>10.2} {:>10.2} {:>10.2}",
                s.column, s.count, s.mean, std, s.min, s.q25, s.median, s.q75, s.max
            )?;
        }

        writeln!(f)?;
        writeln!(f, "DataFrame Info: {} entries, {} columns", self.rows, self.columns.len())?;
        for info in &self.columns {
            writeln!(f, "  {:<24} {:>6} non-null  {}", info.column, info.non_null, info.dtype)?;
        }

        writeln!(f)?;
        match self.distance_electrification_corr {
            Some(r) => writeln!(f, "Correlation (distance_from_grid_km vs electrification_pct): {r:.4}"),
            None => writeln!(f, "Correlation (distance_from_grid_km vs electrification_pct): undefined"),
        }
    }
}

impl fmt::Display for PreprocessingSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Train/test split: {} train, {} test (test_fraction={}, seed={})",
            self.train_rows, self.test_rows, self.test_fraction, self.split_seed
        )?;
        writeln!(f, "Scaler fitted on training partition:")?;
        writeln!(f, "  {:<24} {:>12} {:>12}", "feature", "mean", "std")?;
        for ((feature, mean), std) in self
            .scaler
            .features
            .iter()
            .zip(&self.scaler.mean)
            .zip(&self.scaler.std)
        {
            writeln!(f, "  {feature:<24} {mean:>12.4} {std:>12.4}")?;
        }
        Ok(())
    }
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Model Parameters:")?;
        writeln!(f, "  {:<24} {:>12.4}", "intercept", self.intercept)?;
        for coefficient in &self.coefficients {
            writeln!(f, "  {:<24} {:>12.4}", coefficient.feature, coefficient.value)?;
        }

        writeln!(f)?;
        writeln!(f, "Model Performance ({} test records):", self.metrics.n_test)?;
        writeln!(f, "{RULE}")?;
        match self.metrics.r_squared {
            Some(r2) => writeln!(f, "  {:<24} {:>12.4}", "R² Score", r2)?,
            None => writeln!(f, "  {:<24} {:>12}", "R² Score", "undefined")?,
        }
        writeln!(f, "  {:<24} {:>12.4}", "Mean Absolute Error", self.metrics.mae)?;
        writeln!(f, "  {:<24} {:>12.4}", "Root Mean Squared Error", self.metrics.rmse)?;
        writeln!(f, "{RULE}")?;

        writeln!(f)?;
        writeln!(f, "Sample Predictions (first {}):", self.samples.len())?;
        writeln!(
            f,
            "  {:<20} {:>10} {:>10} {:>10} {:>10} {:>10}",
            "village_name", "distance", "density", "actual", "predicted", "error"
        )?;
        for s in &self.samples {
            writeln!(
                f,
                "  {:<20} {:>10.2} {:>10.2} {:>10.2} {:>10.2} {:>+10.2}",
                s.village_name, s.distance_from_grid_km, s.pop_density, s.actual, s.predicted, s.error
            )?;
        }
        Ok(())
    }
}
