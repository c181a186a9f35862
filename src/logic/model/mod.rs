//! Model Module - Risk prediction and decision
//!
//! Classifiers behind a common trait, the predictor that trains and scores
//! them on labeled feature rows, and the dynamic threshold that turns a
//! probability into an alert.

pub mod classifier;
pub mod tree;
pub mod forest;
pub mod logistic;
pub mod metrics;
pub mod predictor;
pub mod buffer;
pub mod threshold;

#[cfg(test)]
mod tests;

// Re-export common types
pub use buffer::{BufferStatus, RollingWindow};
pub use classifier::{Classifier, ModelConfig, ModelKind};
pub use forest::{ForestConfig, RandomForest};
pub use logistic::{LogisticConfig, LogisticRegression};
pub use metrics::EvaluationReport;
pub use predictor::{ModelMetadata, PredictorState, RiskModel, RiskPredictor, TrainingReport};
pub use threshold::{DynamicThreshold, ThresholdConfig, ThresholdStats};
