//! Four-stage pipeline: clean → explore → prepare → fit and evaluate
//!
//! Stages run strictly in sequence and hand their output forward. The first
//! error aborts the run and is tagged with the stage it came from.

use crate::cleaning::clean_dataset;
use crate::config::PipelineConfig;
use crate::error::{Result, Stage};
use crate::explore::explore;
use crate::model::{fit_and_report, TrainedModel};
use crate::preprocess::prepare;
use crate::report::PipelineReport;
use crate::table::Table;
use aprender::primitives::Vector;
use tracing::info_span;

/// Everything a completed run produced
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub report: PipelineReport,
    pub cleaned: Table,
    /// Absent when the run stopped after cleaning
    pub model: Option<TrainedModel>,
    pub predictions: Option<Vector<f32>>,
}

/// Run only the cleaning stage (load, clean, persist)
pub fn run_cleaning(config: &PipelineConfig) -> Result<PipelineRun> {
    config.validate()?;
    let _span = info_span!("cleaning").entered();
    let (cleaned, cleaning) =
        clean_dataset(&config.input_path, &config.output_path, &config.cleaning)
            .map_err(|e| e.in_stage(Stage::Cleaning))?;

    Ok(PipelineRun {
        report: PipelineReport {
            cleaning,
            exploration: None,
            preprocessing: None,
            evaluation: None,
        },
        cleaned,
        model: None,
        predictions: None,
    })
}

/// Run all four stages
pub fn run(config: &PipelineConfig) -> Result<PipelineRun> {
    let mut run = run_cleaning(config)?;

    let exploration = {
        let _span = info_span!("exploration").entered();
        explore(&run.cleaned).map_err(|e| e.in_stage(Stage::Exploration))?
    };

    let prepared = {
        let _span = info_span!("preprocessing").entered();
        prepare(&run.cleaned, &config.split).map_err(|e| e.in_stage(Stage::Preprocessing))?
    };

    let (model, predictions, evaluation) = {
        let _span = info_span!("modeling").entered();
        fit_and_report(&prepared, &config.model).map_err(|e| e.in_stage(Stage::Modeling))?
    };

    run.report.exploration = Some(exploration);
    run.report.preprocessing = Some(prepared.summary(&config.split));
    run.report.evaluation = Some(evaluation);
    run.model = Some(model);
    run.predictions = Some(predictions);
    tracing::info!("pipeline completed");
    Ok(run)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;

    #[test]
    fn test_missing_input_reports_cleaning_stage() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            input_path: dir.path().join("absent.csv"),
            output_path: dir.path().join("out.csv"),
            ..PipelineConfig::default()
        };
        let err = run(&config).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Stage {
                stage: Stage::Cleaning,
                ..
            }
        ));
        assert!(err.to_string().contains("absent.csv"));
    }

    #[test]
    fn test_invalid_config_rejected_before_reading() {
        let mut config = PipelineConfig::default();
        config.split.test_fraction = 2.0;
        assert!(matches!(
            run(&config),
            Err(PipelineError::InvalidConfig(_))
        ));
    }
}
