//! Risk Service - pipeline facade
//!
//! Wires a data source through preprocessing and feature engineering into
//! the predictor and the dynamic threshold. Training takes the model slot
//! exclusively; scoring shares it. Threshold updates are serialized.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::logic::config::RiskConfig;
use crate::logic::dataset::LabeledDataset;
use crate::logic::error::{RiskError, RiskResult};
use crate::logic::features::{FeatureEngineer, FeatureFrame};
use crate::logic::ingest::{self, ContractId, DataSource};
use crate::logic::model::{
    DynamicThreshold, ModelMetadata, RiskPredictor, ThresholdStats, TrainingReport,
};

/// One scored decision for a vault
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub contract: ContractId,
    /// P(rescue needed)
    pub probability: f64,
    pub threshold: f64,
    pub alert: bool,
    /// Tick the probability refers to
    pub as_of: DateTime<Utc>,
    pub model_id: Option<Uuid>,
}

pub struct RiskService<S: DataSource> {
    source: S,
    config: RiskConfig,
    engineer: FeatureEngineer,
    predictor: RwLock<RiskPredictor>,
    threshold: Mutex<DynamicThreshold>,
}

impl<S: DataSource> RiskService<S> {
    pub fn new(source: S, config: RiskConfig) -> Self {
        Self {
            engineer: FeatureEngineer::new(config.features.clone()),
            predictor: RwLock::new(RiskPredictor::new(config.model.clone())),
            threshold: Mutex::new(DynamicThreshold::new(config.threshold.clone())),
            source,
            config,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    // ========================================================================
    // FEATURES
    // ========================================================================

    /// Fetch, preprocess and featurize `[start, end)`
    pub async fn features_for(
        &self,
        contract: &ContractId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> RiskResult<FeatureFrame> {
        let frame = ingest::fetch_and_prepare(&self.source, contract, start, end, &self.config.ingest).await?;
        self.engineer.engineer(&frame)
    }

    /// Featurize a historical range and join it with observed outcomes
    pub async fn build_dataset(
        &self,
        contract: &ContractId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        outcomes: &[(DateTime<Utc>, bool)],
    ) -> RiskResult<LabeledDataset> {
        let features = self.features_for(contract, start, end).await?;
        LabeledDataset::join_labels(&features, outcomes)
    }

    // ========================================================================
    // TRAINING
    // ========================================================================

    /// Replace the model. Blocks scoring until done.
    pub fn train(&self, dataset: &LabeledDataset) -> RiskResult<TrainingReport> {
        self.predictor.write().train(dataset)
    }

    /// `train` on the blocking pool, for callers on an async runtime
    pub async fn train_in_background(self: Arc<Self>, dataset: LabeledDataset) -> RiskResult<TrainingReport>
    where
        S: 'static,
    {
        tokio::task::spawn_blocking(move || self.train(&dataset))
            .await
            .map_err(|e| RiskError::Task(e.to_string()))?
    }

    pub fn is_trained(&self) -> bool {
        self.predictor.read().is_trained()
    }

    pub fn model_metadata(&self) -> Option<ModelMetadata> {
        self.predictor.read().metadata().cloned()
    }

    // ========================================================================
    // SCORING
    // ========================================================================

    /// P(rescue needed) for the latest full tick
    pub async fn score_vault(&self, contract: &ContractId) -> RiskResult<f64> {
        self.score_vault_at(contract, Utc::now()).await
    }

    /// P(rescue needed) at the last tick before `at`, over the configured lookback
    pub async fn score_vault_at(&self, contract: &ContractId, at: DateTime<Utc>) -> RiskResult<f64> {
        self.score_latest(contract, at).await.map(|(p, _)| p)
    }

    async fn score_latest(
        &self,
        contract: &ContractId,
        at: DateTime<Utc>,
    ) -> RiskResult<(f64, DateTime<Utc>)> {
        let start = at - Duration::hours(self.config.ingest.lookback_hours);

        let result: RiskResult<(f64, DateTime<Utc>)> = async {
            let features = self.features_for(contract, start, at).await?;
            let probability = self.predictor.read().predict_latest(&features)?;
            let as_of = features.last().map(|r| r.timestamp).unwrap_or(at);
            Ok((probability, as_of))
        }
        .await;

        if let Err(e) = &result {
            log::warn!("Scoring {} failed: {}", contract, e);
        }
        result
    }

    /// Alert decision for a probability under the current threshold
    pub fn decide(&self, probability: f64) -> bool {
        self.threshold.lock().determine_action(probability)
    }

    /// Score, decide and package the result
    pub async fn assess(&self, contract: &ContractId) -> RiskResult<RiskAssessment> {
        self.assess_at(contract, Utc::now()).await
    }

    pub async fn assess_at(&self, contract: &ContractId, at: DateTime<Utc>) -> RiskResult<RiskAssessment> {
        let (probability, as_of) = self.score_latest(contract, at).await?;

        let (threshold, alert) = {
            let guard = self.threshold.lock();
            (guard.get_threshold(), guard.determine_action(probability))
        };

        let assessment = RiskAssessment {
            contract: contract.clone(),
            probability,
            threshold,
            alert,
            as_of,
            model_id: self.predictor.read().metadata().map(|m| m.id),
        };

        log::debug!(
            "Assessed {}: p={:.4} threshold={:.4} alert={}",
            contract,
            probability,
            threshold,
            alert
        );
        Ok(assessment)
    }

    // ========================================================================
    // FEEDBACK
    // ========================================================================

    /// Feed observed outcomes back; returns the new threshold
    pub fn report_outcome(&self, scores: &[f64], outcomes: &[bool]) -> RiskResult<f64> {
        self.threshold.lock().update(scores, outcomes)
    }

    pub fn threshold(&self) -> f64 {
        self.threshold.lock().get_threshold()
    }

    pub fn threshold_stats(&self) -> ThresholdStats {
        self.threshold.lock().stats()
    }

    pub fn reset_threshold(&self) {
        self.threshold.lock().reset();
    }
}
