//! Village dataset cleaning
//!
//! Repairs a raw village table in a fixed order. Each step narrows the rows
//! the next one sees, so the order is part of the contract:
//!
//! 1. drop rows without `village_name` or `electrification_pct`
//! 2. fill remaining numeric nulls with the column median
//! 3. deduplicate on `village_name`, first occurrence wins
//! 4. coerce column types
//! 5. list population/area outliers (observe-only)
//! 6. drop rows with non-positive `pop_density`
//! 7. clamp `electrification_pct` and `distance_from_grid_km`
//! 8. persist (see [`clean_dataset`])

use crate::config::{Bounds, CleaningConfig};
use crate::error::{PipelineError, Result};
use crate::table::{
    Column, Table, AREA_SQKM, DISTANCE_FROM_GRID_KM, ELECTRIFICATION_PCT, POPULATION,
    POP_DENSITY, REQUIRED_COLUMNS, VILLAGE_NAME,
};
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, warn};

/// Columns coerced to floating point
const FLOAT_COLUMNS: [&str; 4] = [AREA_SQKM, POP_DENSITY, DISTANCE_FROM_GRID_KM, ELECTRIFICATION_PCT];

/// Null count for one column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissingCount {
    pub column: String,
    pub missing: usize,
}

/// Median fill applied to one numeric column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Imputation {
    pub column: String,
    pub median: f64,
    pub filled: usize,
}

/// A village whose value falls outside the expected range
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutlierRow {
    pub village_name: String,
    pub value: f64,
}

/// How many values one clip step moved onto a bound
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClipSummary {
    pub column: String,
    pub bounds: Bounds,
    pub raised_to_min: usize,
    pub lowered_to_max: usize,
}

/// Everything the cleaning stage observed and changed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CleaningReport {
    pub input_shape: (usize, usize),
    pub missing_before: Vec<MissingCount>,
    pub dropped_missing_keys: usize,
    pub imputations: Vec<Imputation>,
    pub duplicates_removed: usize,
    pub population_bounds: Bounds,
    pub population_outliers: Vec<OutlierRow>,
    pub area_bounds: Bounds,
    pub area_outliers: Vec<OutlierRow>,
    pub dropped_non_positive_density: usize,
    pub clipped: Vec<ClipSummary>,
    pub final_shape: (usize, usize),
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
}

/// Median of a non-empty sample; even lengths average the middle pair
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Clean a raw village table
///
/// Fails with [`PipelineError::MissingColumn`] when a required column is
/// absent and with [`PipelineError::DataQuality`] when a required numeric
/// column cannot be repaired (non-numeric text, or no values to impute from).
pub fn clean(mut table: Table, config: &CleaningConfig) -> Result<(Table, CleaningReport)> {
    table.require_all(&REQUIRED_COLUMNS)?;

    let input_shape = table.shape();
    let missing_before: Vec<MissingCount> = table
        .columns()
        .map(|(name, column)| MissingCount {
            column: name.to_string(),
            missing: column.null_count(),
        })
        .collect();
    info!(rows = input_shape.0, cols = input_shape.1, "cleaning started");

    let dropped_missing_keys = drop_missing_keys(&mut table)?;
    let imputations = impute_medians(&mut table)?;
    let duplicates_removed = deduplicate_names(&mut table)?;
    coerce_types(&mut table)?;

    let population_bounds = config.population_bounds();
    let population_outliers = find_outliers(&table, POPULATION, population_bounds)?;
    let area_bounds = config.area_bounds();
    let area_outliers = find_outliers(&table, AREA_SQKM, area_bounds)?;
    if !population_outliers.is_empty() || !area_outliers.is_empty() {
        warn!(
            population = population_outliers.len(),
            area = area_outliers.len(),
            "outliers found (kept)"
        );
    }

    let dropped_non_positive_density = drop_non_positive_density(&mut table)?;

    let clipped = vec![
        clip_column(&mut table, ELECTRIFICATION_PCT, config.electrification_clip)?,
        clip_column(&mut table, DISTANCE_FROM_GRID_KM, config.distance_clip)?,
    ];

    let final_shape = table.shape();
    info!(rows = final_shape.0, cols = final_shape.1, "cleaning finished");

    let report = CleaningReport {
        input_shape,
        missing_before,
        dropped_missing_keys,
        imputations,
        duplicates_removed,
        population_bounds,
        population_outliers,
        area_bounds,
        area_outliers,
        dropped_non_positive_density,
        clipped,
        final_shape,
        output_path: None,
    };
    Ok((table, report))
}

/// Load `source`, clean it and write the result to `destination`
pub fn clean_dataset(
    source: &Path,
    destination: &Path,
    config: &CleaningConfig,
) -> Result<(Table, CleaningReport)> {
    let raw = Table::load(source)?;
    let (cleaned, mut report) = clean(raw, config)?;
    cleaned.save(destination)?;
    report.output_path = Some(destination.display().to_string());
    info!(path = %destination.display(), "cleaned dataset saved");
    Ok((cleaned, report))
}

fn drop_missing_keys(table: &mut Table) -> Result<usize> {
    let names = table.require(VILLAGE_NAME)?;
    let target = table.require(ELECTRIFICATION_PCT)?;
    let keep: Vec<bool> = (0..table.n_rows())
        .map(|row| !names.is_null(row) && !target.is_null(row))
        .collect();
    let dropped = keep.iter().filter(|k| !**k).count();
    table.retain_rows(&keep);
    debug!(dropped, "dropped rows missing village_name or electrification_pct");
    Ok(dropped)
}

fn impute_medians(table: &mut Table) -> Result<Vec<Imputation>> {
    let numeric_columns: Vec<String> = table
        .columns()
        .filter(|(_, column)| column.is_numeric() && column.null_count() > 0)
        .map(|(name, _)| name.to_string())
        .collect();

    let mut imputations = Vec::new();
    for name in numeric_columns {
        let column = table.require_mut(&name)?;
        let Some(fill) = median(&column.numeric_values()) else {
            if REQUIRED_COLUMNS.contains(&name.as_str()) {
                return Err(PipelineError::DataQuality {
                    column: name,
                    message: "no non-null values to impute from".to_string(),
                });
            }
            debug!(column = %name, "column entirely null, left as is");
            continue;
        };

        let filled = match column {
            Column::Float(values) => fill_nulls(values, fill),
            Column::Integer(values) => fill_nulls(values, fill.round_ties_even() as i64),
            Column::Text(_) => 0,
        };
        debug!(column = %name, median = fill, filled, "imputed median");
        imputations.push(Imputation {
            column: name,
            median: fill,
            filled,
        });
    }
    Ok(imputations)
}

fn fill_nulls<T: Copy>(values: &mut [Option<T>], fill: T) -> usize {
    let mut filled = 0;
    for value in values.iter_mut().filter(|v| v.is_none()) {
        *value = Some(fill);
        filled += 1;
    }
    filled
}

fn deduplicate_names(table: &mut Table) -> Result<usize> {
    let names = table.require(VILLAGE_NAME)?;
    let mut seen = HashSet::new();
    let keep: Vec<bool> = (0..table.n_rows())
        .map(|row| seen.insert(names.display(row)))
        .collect();
    let removed = keep.iter().filter(|k| !**k).count();
    table.retain_rows(&keep);
    debug!(removed, "removed duplicate village names");
    Ok(removed)
}

fn coerce_types(table: &mut Table) -> Result<()> {
    let names = table.require_mut(VILLAGE_NAME)?;
    if names.is_numeric() {
        *names = Column::Text(
            (0..names.len())
                .map(|row| names.numeric(row).map(|v| v.to_string()))
                .collect(),
        );
    }

    let population = table.require_mut(POPULATION)?;
    let values = float_values(POPULATION, population)?;
    *population = Column::Integer(
        values
            .into_iter()
            .map(|v| v.map(|v| v.round_ties_even() as i64))
            .collect(),
    );

    for name in FLOAT_COLUMNS {
        let column = table.require_mut(name)?;
        *column = Column::Float(float_values(name, column)?);
    }
    Ok(())
}

/// Read a column as floats, parsing text cells
fn float_values(name: &str, column: &Column) -> Result<Vec<Option<f64>>> {
    match column {
        Column::Float(values) => Ok(values.clone()),
        Column::Integer(values) => Ok(values.iter().map(|v| v.map(|v| v as f64)).collect()),
        Column::Text(values) => values
            .iter()
            .map(|cell| match cell {
                None => Ok(None),
                Some(text) => text.trim().parse::<f64>().map(Some).map_err(|_| {
                    PipelineError::DataQuality {
                        column: name.to_string(),
                        message: format!("cannot convert '{text}' to a number"),
                    }
                }),
            })
            .collect(),
    }
}

fn find_outliers(table: &Table, column: &str, bounds: Bounds) -> Result<Vec<OutlierRow>> {
    let names = table.require(VILLAGE_NAME)?;
    let values = table.require(column)?;
    Ok((0..table.n_rows())
        .filter_map(|row| {
            let value = values.numeric(row)?;
            (!bounds.contains(value)).then(|| OutlierRow {
                village_name: names.display(row),
                value,
            })
        })
        .collect())
}

fn drop_non_positive_density(table: &mut Table) -> Result<usize> {
    let density = table.require(POP_DENSITY)?;
    let keep: Vec<bool> = (0..table.n_rows())
        .map(|row| density.numeric(row).is_some_and(|d| d > 0.0))
        .collect();
    let dropped = keep.iter().filter(|k| !**k).count();
    table.retain_rows(&keep);
    debug!(dropped, "dropped rows with non-positive pop_density");
    Ok(dropped)
}

fn clip_column(table: &mut Table, name: &str, bounds: Bounds) -> Result<ClipSummary> {
    let mut summary = ClipSummary {
        column: name.to_string(),
        bounds,
        raised_to_min: 0,
        lowered_to_max: 0,
    };
    if let Column::Float(values) = table.require_mut(name)? {
        for value in values.iter_mut().flatten() {
            if *value < bounds.min {
                summary.raised_to_min += 1;
            } else if *value > bounds.max {
                summary.lowered_to_max += 1;
            }
            *value = bounds.clamp(*value);
        }
    }
    debug!(
        column = name,
        raised = summary.raised_to_min,
        lowered = summary.lowered_to_max,
        "clipped values"
    );
    Ok(summary)
}
