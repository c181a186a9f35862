//! Vault Rescue - Risk Scoring Core
//!
//! Estimates how likely a monitored collateral vault is to need an emergency
//! rescue, and turns that probability into an alert decision under a
//! threshold re-tuned from observed outcomes.

pub mod constants;
pub mod logic;

pub use logic::config::RiskConfig;
pub use logic::dataset::LabeledDataset;
pub use logic::error::{RiskError, RiskResult};
pub use logic::features::{engineer_features, FeatureFrame, FeatureRow};
pub use logic::ingest::{fetch_and_prepare, BitqueryClient, ContractId, DataSource, MemorySource, RawRecord, TimeSeriesFrame};
pub use logic::model::{DynamicThreshold, RiskPredictor, ThresholdConfig};
pub use logic::service::{RiskAssessment, RiskService};
pub use logic::session::{MemorySessionStore, RescueDecision, SessionStore, VaultSession};
