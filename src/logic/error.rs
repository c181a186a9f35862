//! Error handling
//!
//! Every stage of the pipeline reports through `RiskError`. None of these are
//! recovered inside the core: a failed stage surfaces to the caller as-is.

use thiserror::Error;

pub type RiskResult<T> = Result<T, RiskError>;

#[derive(Debug, Error)]
pub enum RiskError {
    // Ingestion errors
    #[error("Data source error: {0}")]
    DataSource(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Invalid time range: start {start} is not before end {end}")]
    InvalidRange { start: String, end: String },

    #[error("Invalid contract id: {0}")]
    InvalidContract(String),

    // Feature engineering errors
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    // Predictor errors
    #[error("Missing label column: {0}")]
    MissingLabel(String),

    #[error("Model not trained. Call train first")]
    ModelNotTrained,

    #[error(
        "Feature schema mismatch: expected {} columns (hash: {expected_hash:08x}), got {} columns (hash: {actual_hash:08x})",
        .expected.len(),
        .actual.len()
    )]
    FeatureSchemaMismatch {
        expected: Vec<String>,
        actual: Vec<String>,
        expected_hash: u32,
        actual_hash: u32,
    },

    #[error("Unsupported model type: {0}")]
    UnsupportedModel(String),

    // Threshold errors
    #[error("Shape mismatch: {scores} scores vs {outcomes} outcomes")]
    ShapeMismatch { scores: usize, outcomes: usize },

    #[error("Background task failed: {0}")]
    Task(String),

    // Storage errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RiskError {
    /// True when the failure came from outside the process (provider, network).
    /// Callers typically retry these on the next polling cycle.
    pub fn is_transient(&self) -> bool {
        matches!(self, RiskError::DataSource(_))
    }

    /// Short message for the user-facing layer.
    pub fn user_message(&self) -> &'static str {
        match self {
            RiskError::ModelNotTrained => "Risk model is not ready yet",
            RiskError::DataSource(_) => "Vault data temporarily unavailable",
            _ => "Risk assessment unavailable",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_mismatch_message() {
        let err = RiskError::FeatureSchemaMismatch {
            expected: vec!["a".into(), "b".into()],
            actual: vec!["a".into()],
            expected_hash: 0xdeadbeef,
            actual_hash: 0x1,
        };
        let msg = err.to_string();
        assert!(msg.contains("expected 2 columns"));
        assert!(msg.contains("deadbeef"));
        assert!(msg.contains("got 1 columns"));
    }

    #[test]
    fn test_transient_classification() {
        assert!(RiskError::DataSource("timeout".into()).is_transient());
        assert!(!RiskError::ModelNotTrained.is_transient());
        assert_eq!(
            RiskError::MissingColumn("debt_value".into()).user_message(),
            "Risk assessment unavailable"
        );
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: RiskError = io.into();
        assert!(matches!(err, RiskError::Io(_)));
    }
}
