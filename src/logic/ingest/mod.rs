//! Ingest Module - Data Ingestion & Preprocessing
//!
//! Pulls raw vault records from a `DataSource` and turns them into a
//! fixed-cadence, gap-free, normalized `TimeSeriesFrame`.
//!
//! # Architecture
//! - `source.rs`: `DataSource` trait, `RawRecord`, `ContractId`, in-memory source
//! - `bitquery.rs`: GraphQL provider client
//! - `frame.rs`: `TimeSeriesFrame`
//! - `preprocess.rs`: resample / fill / z-score / outlier flags

pub mod source;
pub mod bitquery;
pub mod frame;
pub mod preprocess;


use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants;
use crate::logic::error::{RiskError, RiskResult};

pub use bitquery::{BitqueryClient, SourceConfig};
pub use frame::{ColumnStats, TimeSeriesFrame};
pub use source::{ContractId, DataSource, MemorySource, RawRecord};

/// Preprocessing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Tick spacing in seconds
    pub cadence_secs: i64,
    /// Outlier flag cut-off in standard deviations
    pub outlier_sigmas: f64,
    /// Fields the provider must deliver
    pub required_columns: Vec<String>,
    /// Scoring window length in hours
    pub lookback_hours: i64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            cadence_secs: constants::DEFAULT_CADENCE_SECS,
            outlier_sigmas: constants::DEFAULT_OUTLIER_SIGMAS,
            required_columns: vec![
                constants::COLLATERAL_COLUMN.to_string(),
                constants::DEBT_COLUMN.to_string(),
            ],
            lookback_hours: constants::DEFAULT_LOOKBACK_HOURS,
        }
    }
}

/// Fetch `[start, end)` for a contract and preprocess it
pub async fn fetch_and_prepare<S: DataSource>(
    source: &S,
    contract: &ContractId,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    config: &IngestConfig,
) -> RiskResult<TimeSeriesFrame> {
    if start >= end {
        return Err(RiskError::InvalidRange {
            start: start.to_rfc3339(),
            end: end.to_rfc3339(),
        });
    }

    let records = source.fetch(contract, start, end).await?;
    log::debug!(
        "Fetched {} raw records for {} from {}",
        records.len(),
        contract,
        source.name()
    );

    preprocess::prepare(&records, start, end, config)
}
