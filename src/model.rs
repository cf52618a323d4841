//! Linear regression training and evaluation
//!
//! Fits aprender's OLS `LinearRegression` on the scaled training partition,
//! predicts the scaled test partition and scores the predictions with
//! R², MAE and RMSE.

use crate::config::ModelConfig;
use crate::error::{PipelineError, Result};
use crate::preprocess::{FeatureFrame, PreparedData, ScalerState, FEATURES};
use aprender::linear_model::LinearRegression;
use aprender::metrics::{mae, r_squared, rmse};
use aprender::primitives::{Matrix, Vector};
use aprender::traits::Estimator;
use serde::Serialize;

/// Standardized features with less spread than this carry no signal
const MIN_FEATURE_STD: f32 = 1e-10;

/// Fitted regression together with the scaler it expects its inputs in
///
/// Features that were constant in the training partition are left out of the
/// fit and reported with a zero coefficient.
#[derive(Debug, Clone)]
pub struct TrainedModel {
    regression: LinearRegression,
    /// Indices into [`FEATURES`] the regression was fitted on
    active: Vec<usize>,
    scaler: ScalerState,
}

impl TrainedModel {
    pub fn intercept(&self) -> f64 {
        f64::from(self.regression.intercept())
    }

    /// Coefficients on the standardized features, paired with feature names
    pub fn coefficients(&self) -> Vec<Coefficient> {
        let fitted = self.regression.coefficients().as_slice();
        FEATURES
            .iter()
            .enumerate()
            .map(|(index, feature)| Coefficient {
                feature: feature.to_string(),
                value: self
                    .active
                    .iter()
                    .position(|&a| a == index)
                    .map_or(0.0, |slot| f64::from(fitted[slot])),
            })
            .collect()
    }

    pub fn scaler(&self) -> &ScalerState {
        &self.scaler
    }

    /// Predict from already standardized features
    pub fn predict_scaled(&self, features: &Matrix<f32>) -> Result<Vector<f32>> {
        let active = select_columns(features, &self.active)?;
        Ok(self.regression.predict(&active))
    }

    /// Standardize raw feature rows with the training scaler, then predict
    pub fn predict_raw(&self, frame: &FeatureFrame) -> Result<Vec<f64>> {
        if frame.is_empty() {
            return Ok(Vec::new());
        }
        let scaled = self.scaler.transform(&frame.to_matrix()?)?;
        Ok(self
            .predict_scaled(&scaled)?
            .as_slice()
            .iter()
            .map(|&v| f64::from(v))
            .collect())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Coefficient {
    pub feature: String,
    pub value: f64,
}

/// Accuracy of test-set predictions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegressionMetrics {
    /// Undefined when the actual values have zero variance
    pub r_squared: Option<f64>,
    pub mae: f64,
    pub rmse: f64,
    pub n_test: usize,
}

impl RegressionMetrics {
    /// Score predictions against actual values
    pub fn compute(y_true: &Vector<f32>, y_pred: &Vector<f32>) -> Result<Self> {
        if y_true.len() != y_pred.len() {
            return Err(PipelineError::Fit(format!(
                "{} actual values but {} predictions",
                y_true.len(),
                y_pred.len()
            )));
        }
        if y_true.len() == 0 {
            return Err(PipelineError::Fit(
                "metrics are undefined for an empty test partition".to_string(),
            ));
        }

        let r2 = if is_constant(y_true.as_slice()) {
            None
        } else {
            Some(f64::from(r_squared(y_pred, y_true)))
        };

        Ok(Self {
            r_squared: r2,
            mae: f64::from(mae(y_pred, y_true)),
            rmse: f64::from(rmse(y_pred, y_true)),
            n_test: y_true.len(),
        })
    }
}

/// Copy the given columns of a row-major matrix into a new matrix
fn select_columns(matrix: &Matrix<f32>, columns: &[usize]) -> Result<Matrix<f32>> {
    let (rows, _) = matrix.shape();
    let data = (0..rows)
        .flat_map(|row| columns.iter().map(move |&col| matrix.get(row, col)))
        .collect();
    Matrix::from_vec(rows, columns.len(), data).map_err(|e| PipelineError::Fit(e.to_string()))
}

fn is_constant(values: &[f32]) -> bool {
    values.windows(2).all(|pair| pair[0] == pair[1])
}

/// One test village in the prediction sample
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionSample {
    pub village_name: String,
    pub distance_from_grid_km: f64,
    pub pop_density: f64,
    pub actual: f64,
    pub predicted: f64,
    /// actual - predicted
    pub error: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    pub intercept: f64,
    pub coefficients: Vec<Coefficient>,
    pub metrics: RegressionMetrics,
    pub samples: Vec<PredictionSample>,
}

/// Fit OLS on the training partition and evaluate on the test partition
///
/// Returns the fitted model, the test-set predictions (partition order) and
/// the evaluation report.
pub fn fit_and_report(
    data: &PreparedData,
    config: &ModelConfig,
) -> Result<(TrainedModel, Vector<f32>, EvaluationReport)> {
    if data.y_train.len() == 0 {
        return Err(PipelineError::Fit("training partition is empty".to_string()));
    }
    if data.y_test.len() == 0 {
        return Err(PipelineError::Fit("test partition is empty".to_string()));
    }
    if is_constant(data.y_train.as_slice()) {
        return Err(PipelineError::Fit(
            "training target is constant; nothing to learn".to_string(),
        ));
    }

    let active: Vec<usize> = data
        .scaler
        .std()
        .iter()
        .enumerate()
        .filter(|&(_, &std)| std > MIN_FEATURE_STD)
        .map(|(index, _)| index)
        .collect();
    for (index, feature) in FEATURES.iter().enumerate() {
        if !active.contains(&index) {
            tracing::warn!(feature = *feature, "feature constant in training partition, coefficient fixed at 0");
        }
    }
    if active.is_empty() {
        return Err(PipelineError::Fit(
            "every feature is constant in the training partition".to_string(),
        ));
    }

    // OLS with an intercept needs one more row than there are fitted features
    let required = active.len() + 1;
    if data.y_train.len() < required {
        return Err(PipelineError::Fit(format!(
            "need at least {required} training records, got {}",
            data.y_train.len()
        )));
    }

    let mut regression = LinearRegression::new();
    regression
        .fit(&select_columns(&data.scaled_train, &active)?, &data.y_train)
        .map_err(|e| PipelineError::Fit(e.to_string()))?;

    let model = TrainedModel {
        regression,
        active,
        scaler: data.scaler.clone(),
    };
    tracing::info!(
        intercept = model.intercept(),
        train = data.y_train.len(),
        "fitted linear regression"
    );

    let predictions = model.predict_scaled(&data.scaled_test)?;
    let metrics = RegressionMetrics::compute(&data.y_test, &predictions)?;
    tracing::info!(r2 = ?metrics.r_squared, mae = metrics.mae, rmse = metrics.rmse, "evaluated on test partition");

    let samples = data
        .raw_test
        .village_names
        .iter()
        .zip(&data.raw_test.rows)
        .zip(data.y_test.as_slice().iter().zip(predictions.as_slice()))
        .take(config.sample_report_rows)
        .map(|((name, features), (&actual, &predicted))| PredictionSample {
            village_name: name.clone(),
            distance_from_grid_km: features[0],
            pop_density: features[1],
            actual: f64::from(actual),
            predicted: f64::from(predicted),
            error: f64::from(actual) - f64::from(predicted),
        })
        .collect();

    let report = EvaluationReport {
        intercept: model.intercept(),
        coefficients: model.coefficients(),
        metrics,
        samples,
    };
    Ok((model, predictions, report))
}
