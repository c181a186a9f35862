//! Risk Predictor - Training and scoring
//!
//! State machine `Untrained -> Trained`; training again replaces the model.
//! A trained `RiskModel` is immutable and remembers the exact ordered column
//! list it was fitted on. Scoring with any other list is rejected.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::classifier::{Classifier, ModelConfig, ModelKind};
use super::metrics::EvaluationReport;
use crate::logic::dataset::LabeledDataset;
use crate::logic::error::{RiskError, RiskResult};
use crate::logic::features::layout::{self, FEATURE_VERSION};
use crate::logic::features::FeatureFrame;

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// Model metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub id: Uuid,
    pub kind: ModelKind,
    pub feature_columns: Vec<String>,
    pub schema_hash: u32,
    pub feature_version: u8,
    /// SHA-256 over the training inputs, hex
    pub fingerprint: String,
    pub trained_at: DateTime<Utc>,
    pub train_rows: usize,
    pub train_positives: usize,
    pub train_span: Option<(DateTime<Utc>, DateTime<Utc>)>,
    pub test_span: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

/// Trained classifier bound to its feature schema
#[derive(Debug)]
pub struct RiskModel {
    metadata: ModelMetadata,
    classifier: Box<dyn Classifier>,
}

impl RiskModel {
    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    pub fn feature_columns(&self) -> &[String] {
        &self.metadata.feature_columns
    }

    /// P(rescue needed) per row
    pub fn predict(&self, features: &FeatureFrame) -> RiskResult<Vec<f64>> {
        layout::validate_columns(&self.metadata.feature_columns, features.columns())?;
        if features.is_empty() {
            return Ok(Vec::new());
        }
        self.classifier.predict_proba(features.to_matrix().view())
    }
}

/// Outcome of one `train` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub model_id: Uuid,
    pub train_rows: usize,
    pub test_rows: usize,
    /// `None` when the held-out split is empty
    pub evaluation: Option<EvaluationReport>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictorState {
    Untrained,
    Trained,
}

// ============================================================================
// PREDICTOR
// ============================================================================

#[derive(Debug)]
pub struct RiskPredictor {
    config: ModelConfig,
    model: Option<RiskModel>,
    last_report: Option<TrainingReport>,
}

impl RiskPredictor {
    pub fn new(config: ModelConfig) -> Self {
        Self {
            config,
            model: None,
            last_report: None,
        }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn state(&self) -> PredictorState {
        if self.model.is_some() {
            PredictorState::Trained
        } else {
            PredictorState::Untrained
        }
    }

    pub fn is_trained(&self) -> bool {
        self.model.is_some()
    }

    pub fn model(&self) -> Option<&RiskModel> {
        self.model.as_ref()
    }

    pub fn metadata(&self) -> Option<&ModelMetadata> {
        self.model.as_ref().map(|m| &m.metadata)
    }

    pub fn last_report(&self) -> Option<&TrainingReport> {
        self.last_report.as_ref()
    }

    /// Fit on the earliest rows, evaluate on the latest.
    ///
    /// The previous model stays in place if fitting fails.
    pub fn train(&mut self, dataset: &LabeledDataset) -> RiskResult<TrainingReport> {
        let (train, test) = dataset.chronological_split(self.config.test_fraction);
        if train.is_empty() {
            return Err(RiskError::InsufficientData(format!(
                "{} labeled rows leave no training split",
                dataset.len()
            )));
        }

        log::info!(
            "Training {} on {} rows ({} positive), holding out {}",
            self.config.kind,
            train.len(),
            train.positives(),
            test.len()
        );

        let mut classifier = self.config.build();
        classifier.fit(train.features().to_matrix().view(), train.labels())?;

        let columns = dataset.columns().to_vec();
        let metadata = ModelMetadata {
            id: Uuid::new_v4(),
            kind: self.config.kind,
            schema_hash: layout::schema_hash(&columns),
            feature_columns: columns,
            feature_version: FEATURE_VERSION,
            fingerprint: fingerprint(self.config.kind, &train),
            trained_at: Utc::now(),
            train_rows: train.len(),
            train_positives: train.positives(),
            train_span: span(train.features()),
            test_span: span(test.features()),
        };
        let model = RiskModel {
            metadata,
            classifier,
        };

        let evaluation = if test.is_empty() {
            log::warn!("Held-out split is empty; skipping evaluation");
            None
        } else {
            let scores = model.predict(test.features())?;
            let report = EvaluationReport::from_scores(&scores, test.labels())?;
            log::info!("Held-out evaluation:\n{}", report);
            Some(report)
        };

        let report = TrainingReport {
            model_id: model.metadata.id,
            train_rows: train.len(),
            test_rows: test.len(),
            evaluation,
        };

        log::info!(
            "Model {} trained (fingerprint {})",
            model.metadata.id,
            &model.metadata.fingerprint[..16]
        );

        self.model = Some(model);
        self.last_report = Some(report.clone());
        Ok(report)
    }

    /// P(rescue needed) per row
    pub fn predict(&self, features: &FeatureFrame) -> RiskResult<Vec<f64>> {
        self.model
            .as_ref()
            .ok_or(RiskError::ModelNotTrained)?
            .predict(features)
    }

    /// Probability for the most recent row
    pub fn predict_latest(&self, features: &FeatureFrame) -> RiskResult<f64> {
        if features.is_empty() {
            return Err(RiskError::InsufficientData("no feature rows to score".into()));
        }
        let scores = self.predict(&features.tail())?;
        scores
            .last()
            .copied()
            .ok_or_else(|| RiskError::InsufficientData("no feature rows to score".into()))
    }

    /// Score `features` and compare with `labels`, e.g. for backtesting
    pub fn evaluate(&self, features: &FeatureFrame, labels: &[bool]) -> RiskResult<EvaluationReport> {
        let scores = self.predict(features)?;
        EvaluationReport::from_scores(&scores, labels)
    }
}

impl Default for RiskPredictor {
    fn default() -> Self {
        Self::new(ModelConfig::default())
    }
}

// ============================================================================
// HELPERS
// ============================================================================

fn span(frame: &FeatureFrame) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let first = frame.rows().first()?;
    let last = frame.last()?;
    Some((first.timestamp, last.timestamp))
}

fn fingerprint(kind: ModelKind, train: &LabeledDataset) -> String {
    let mut hasher = Sha256::new();
    hasher.update(kind.as_str().as_bytes());
    for column in train.columns() {
        hasher.update(column.as_bytes());
        hasher.update([0u8]);
    }
    for (row, label) in train.features().rows().iter().zip(train.labels()) {
        hasher.update(row.timestamp.timestamp().to_le_bytes());
        for v in &row.values {
            hasher.update(v.to_le_bytes());
        }
        hasher.update([*label as u8]);
    }
    hex::encode(hasher.finalize())
}
