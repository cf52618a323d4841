//! Feature selection, train/test split and standardization
//!
//! The scaler is fitted on the training partition only and then applied to
//! both partitions, so no test statistic leaks into fitting.

use crate::config::SplitConfig;
use crate::error::{PipelineError, Result};
use crate::table::{Table, DISTANCE_FROM_GRID_KM, ELECTRIFICATION_PCT, POP_DENSITY, VILLAGE_NAME};
use aprender::preprocessing::StandardScaler;
use aprender::primitives::{Matrix, Vector};
use aprender::traits::Transformer;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;

/// Model inputs, in matrix column order
pub const FEATURES: [&str; 2] = [DISTANCE_FROM_GRID_KM, POP_DENSITY];

/// Model output
pub const TARGET: &str = ELECTRIFICATION_PCT;

/// Smallest table that still yields a non-empty train and test partition
pub const MIN_RECORDS: usize = 2;

/// Unscaled feature rows of one partition, kept for readable reporting
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureFrame {
    pub village_names: Vec<String>,
    pub rows: Vec<[f64; 2]>,
}

impl FeatureFrame {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row-major `f32` matrix (n_rows x 2)
    pub fn to_matrix(&self) -> Result<Matrix<f32>> {
        let data = self
            .rows
            .iter()
            .flat_map(|row| row.iter().map(|&v| v as f32))
            .collect();
        Matrix::from_vec(self.rows.len(), FEATURES.len(), data)
            .map_err(|e| PipelineError::Fit(e.to_string()))
    }
}

/// Fitted standardization parameters
#[derive(Debug, Clone)]
pub struct ScalerState {
    feature_names: Vec<String>,
    scaler: StandardScaler,
}

impl ScalerState {
    /// Fit mean and standard deviation per feature column
    pub fn fit(features: &Matrix<f32>) -> Result<Self> {
        let mut scaler = StandardScaler::new().with_mean(true).with_std(true);
        scaler
            .fit(features)
            .map_err(|e| PipelineError::Fit(format!("scaler: {e}")))?;
        Ok(Self {
            feature_names: FEATURES.iter().map(|f| f.to_string()).collect(),
            scaler,
        })
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn mean(&self) -> &[f32] {
        self.scaler.mean()
    }

    pub fn std(&self) -> &[f32] {
        self.scaler.std()
    }

    /// Apply the fitted transform to new data
    pub fn transform(&self, features: &Matrix<f32>) -> Result<Matrix<f32>> {
        self.scaler
            .transform(features)
            .map_err(|e| PipelineError::Fit(format!("scaler: {e}")))
    }

    pub fn summary(&self) -> ScalerSummary {
        ScalerSummary {
            features: self.feature_names.clone(),
            mean: self.mean().iter().map(|&v| f64::from(v)).collect(),
            std: self.std().iter().map(|&v| f64::from(v)).collect(),
        }
    }
}

/// Serializable view of the fitted scaler
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScalerSummary {
    pub features: Vec<String>,
    pub mean: Vec<f64>,
    pub std: Vec<f64>,
}

/// Everything the modeling stage consumes
#[derive(Debug, Clone)]
pub struct PreparedData {
    pub scaled_train: Matrix<f32>,
    pub scaled_test: Matrix<f32>,
    pub raw_train: FeatureFrame,
    pub raw_test: FeatureFrame,
    pub y_train: Vector<f32>,
    pub y_test: Vector<f32>,
    pub scaler: ScalerState,
}

/// Partition sizes and scaler statistics for the report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreprocessingSummary {
    pub train_rows: usize,
    pub test_rows: usize,
    pub test_fraction: f64,
    pub split_seed: u64,
    pub scaler: ScalerSummary,
}

impl PreparedData {
    pub fn summary(&self, config: &SplitConfig) -> PreprocessingSummary {
        PreprocessingSummary {
            train_rows: self.raw_train.len(),
            test_rows: self.raw_test.len(),
            test_fraction: config.test_fraction,
            split_seed: config.split_seed,
            scaler: self.scaler.summary(),
        }
    }
}

/// Shuffle row indices with the configured seed and cut off the test share
///
/// The test partition holds `ceil(n * test_fraction)` rows. The result depends
/// only on `n` and the seed.
pub fn split_indices(n: usize, config: &SplitConfig) -> Result<(Vec<usize>, Vec<usize>)> {
    config.validate()?;
    if n < MIN_RECORDS {
        return Err(PipelineError::InsufficientData {
            required: MIN_RECORDS,
            actual: n,
        });
    }

    let n_test = ((n as f64) * config.test_fraction).ceil() as usize;
    let n_train = n.saturating_sub(n_test);
    if n_test == 0 || n_train == 0 {
        return Err(PipelineError::InsufficientData {
            required: MIN_RECORDS.max(n + 1),
            actual: n,
        });
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(config.split_seed);
    indices.shuffle(&mut rng);

    let test = indices.split_off(n_train);
    Ok((indices, test))
}

/// Select features and target, split, and scale
pub fn prepare(table: &Table, config: &SplitConfig) -> Result<PreparedData> {
    table.require_all(&[VILLAGE_NAME, DISTANCE_FROM_GRID_KM, POP_DENSITY, TARGET])?;

    let (train_idx, test_idx) = split_indices(table.n_rows(), config)?;
    let (raw_train, y_train) = select_rows(table, &train_idx)?;
    let (raw_test, y_test) = select_rows(table, &test_idx)?;

    let train_matrix = raw_train.to_matrix()?;
    let test_matrix = raw_test.to_matrix()?;

    let scaler = ScalerState::fit(&train_matrix)?;
    let scaled_train = scaler.transform(&train_matrix)?;
    let scaled_test = scaler.transform(&test_matrix)?;

    tracing::info!(
        train = raw_train.len(),
        test = raw_test.len(),
        seed = config.split_seed,
        "split and scaled features"
    );

    Ok(PreparedData {
        scaled_train,
        scaled_test,
        raw_train,
        raw_test,
        y_train,
        y_test,
        scaler,
    })
}

fn select_rows(table: &Table, indices: &[usize]) -> Result<(FeatureFrame, Vector<f32>)> {
    let names = table.require(VILLAGE_NAME)?;
    let distance = table.require(DISTANCE_FROM_GRID_KM)?;
    let density = table.require(POP_DENSITY)?;
    let target = table.require(TARGET)?;

    let value = |column: &crate::table::Column, name: &str, row: usize| {
        column.numeric(row).ok_or_else(|| PipelineError::DataQuality {
            column: name.to_string(),
            message: format!("row {row} has no numeric value"),
        })
    };

    let mut frame = FeatureFrame {
        village_names: Vec::with_capacity(indices.len()),
        rows: Vec::with_capacity(indices.len()),
    };
    let mut y = Vec::with_capacity(indices.len());
    for &row in indices {
        frame.village_names.push(names.display(row));
        frame.rows.push([
            value(distance, DISTANCE_FROM_GRID_KM, row)?,
            value(density, POP_DENSITY, row)?,
        ]);
        y.push(value(target, TARGET, row)? as f32);
    }
    Ok((frame, Vector::from_vec(y)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Column;

    fn village_table(n: usize) -> Table {
        let names = (0..n).map(|i| Some(format!("V{i}"))).collect();
        let distance = (0..n).map(|i| Some(1.0 + i as f64 * 3.0)).collect();
        let density = (0..n).map(|i| Some(50.0 + (i * i) as f64)).collect();
        let target = (0..n).map(|i| Some(95.0 - i as f64 * 2.5)).collect();
        Table::from_columns(vec![
            (VILLAGE_NAME.to_string(), Column::Text(names)),
            (DISTANCE_FROM_GRID_KM.to_string(), Column::Float(distance)),
            (POP_DENSITY.to_string(), Column::Float(density)),
            (TARGET.to_string(), Column::Float(target)),
        ])
        .unwrap()
    }

    #[test]
    fn test_split_sizes_round_test_share_up() {
        let config = SplitConfig::default();
        let (train, test) = split_indices(10, &config).unwrap();
        assert_eq!((train.len(), test.len()), (8, 2));

        let (train, test) = split_indices(4, &config).unwrap();
        assert_eq!((train.len(), test.len()), (3, 1));

        let (train, test) = split_indices(2, &config).unwrap();
        assert_eq!((train.len(), test.len()), (1, 1));
    }

    #[test]
    fn test_split_is_a_partition() {
        let (mut train, test) = split_indices(25, &SplitConfig::default()).unwrap();
        train.extend(test);
        train.sort_unstable();
        assert_eq!(train, (0..25).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_is_reproducible_for_fixed_seed() {
        let config = SplitConfig {
            test_fraction: 0.3,
            split_seed: 99,
        };
        assert_eq!(
            split_indices(30, &config).unwrap(),
            split_indices(30, &config).unwrap()
        );
    }

    #[test]
    fn test_too_few_records() {
        assert!(matches!(
            split_indices(1, &SplitConfig::default()),
            Err(PipelineError::InsufficientData { required: 2, actual: 1 })
        ));
        assert!(matches!(
            prepare(&village_table(0), &SplitConfig::default()),
            Err(PipelineError::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_prepare_shapes_and_names() {
        let data = prepare(&village_table(10), &SplitConfig::default()).unwrap();
        assert_eq!(data.scaled_train.shape(), (8, 2));
        assert_eq!(data.scaled_test.shape(), (2, 2));
        assert_eq!(data.y_train.len(), 8);
        assert_eq!(data.y_test.len(), 2);
        assert_eq!(data.raw_test.village_names.len(), 2);
        assert_eq!(data.scaler.feature_names(), &FEATURES.map(String::from));
    }

    #[test]
    fn test_scaled_train_is_standardized() {
        let data = prepare(&village_table(20), &SplitConfig::default()).unwrap();
        let (rows, cols) = data.scaled_train.shape();
        for col in 0..cols {
            let mean: f32 = (0..rows).map(|r| data.scaled_train.get(r, col)).sum::<f32>() / rows as f32;
            assert!(mean.abs() < 1e-4, "column {col} mean {mean}");
        }
    }

    #[test]
    fn test_scaler_ignores_test_partition_values() {
        let config = SplitConfig::default();
        let table = village_table(20);
        let baseline = prepare(&table, &config).unwrap();

        // inflate every feature of the test villages
        let (_, test_idx) = split_indices(table.n_rows(), &config).unwrap();
        let mut perturbed = table.clone();
        for name in FEATURES {
            if let Some(Column::Float(values)) = perturbed.column_mut(name) {
                for &row in &test_idx {
                    values[row] = values[row].map(|v| v * 1000.0 + 7.0);
                }
            }
        }
        let rerun = prepare(&perturbed, &config).unwrap();

        assert_eq!(baseline.scaler.mean(), rerun.scaler.mean());
        assert_eq!(baseline.scaler.std(), rerun.scaler.std());
        assert_eq!(baseline.raw_train, rerun.raw_train);
        assert_ne!(baseline.raw_test, rerun.raw_test);
    }

    #[test]
    fn test_missing_feature_column() {
        let table = Table::from_columns(vec![(
            VILLAGE_NAME.to_string(),
            Column::Text(vec![Some("A".to_string())]),
        )])
        .unwrap();
        assert!(matches!(
            prepare(&table, &SplitConfig::default()),
            Err(PipelineError::MissingColumn { .. })
        ));
    }

    #[test]
    fn test_null_feature_is_data_quality_error() {
        let mut table = village_table(5);
        if let Some(Column::Float(values)) = table.column_mut(POP_DENSITY) {
            for v in values.iter_mut() {
                *v = None;
            }
        }
        assert!(matches!(
            prepare(&table, &SplitConfig::default()),
            Err(PipelineError::DataQuality { .. })
        ));
    }
}
