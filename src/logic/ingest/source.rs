//! Data Source - raw record contract with the indexing provider
//!
//! A source returns arbitrary-frequency timestamped numeric records for one
//! contract. Everything downstream (resampling, filling, scaling) happens in
//! `preprocess`, so sources stay thin.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::future::Future;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::logic::error::{RiskError, RiskResult};

// ============================================================================
// CONTRACT ID
// ============================================================================

static CONTRACT_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_\-]{1,128}$").expect("valid contract id regex"));

/// Stellar contract strkey: 'C' followed by 55 base32 characters
static STELLAR_CONTRACT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^C[A-Z2-7]{55}$").expect("valid stellar strkey regex"));

/// Identifier of a monitored vault / contract
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContractId(String);

impl ContractId {
    pub fn parse(raw: &str) -> RiskResult<Self> {
        let trimmed = raw.trim();
        if !CONTRACT_ID_RE.is_match(trimmed) {
            return Err(RiskError::InvalidContract(raw.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for on-chain Stellar contract addresses (vs. internal vault aliases)
    pub fn is_stellar_contract(&self) -> bool {
        STELLAR_CONTRACT_RE.is_match(&self.0)
    }
}

impl fmt::Display for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ContractId {
    type Err = RiskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ContractId {
    type Error = RiskError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ContractId> for String {
    fn from(id: ContractId) -> Self {
        id.0
    }
}

// ============================================================================
// RAW RECORD
// ============================================================================

/// One observation as delivered by the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub timestamp: DateTime<Utc>,
    /// Named numeric fields. Absent or non-finite fields are gaps.
    pub fields: BTreeMap<String, f64>,
}

impl RawRecord {
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            fields: BTreeMap::new(),
        }
    }

    pub fn with(mut self, name: &str, value: f64) -> Self {
        self.fields.insert(name.to_string(), value);
        self
    }

    /// Finite value of a field, if present
    pub fn get(&self, name: &str) -> Option<f64> {
        self.fields.get(name).copied().filter(|v| v.is_finite())
    }
}

// ============================================================================
// DATA SOURCE TRAIT
// ============================================================================

/// Provider of raw records for a contract over `[start, end)`
pub trait DataSource: Send + Sync {
    fn name(&self) -> &str;

    fn fetch(
        &self,
        contract: &ContractId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> impl Future<Output = RiskResult<Vec<RawRecord>>> + Send;
}

// ============================================================================
// IN-MEMORY SOURCE
// ============================================================================

/// Records held in memory, keyed by contract. Used for backfills and replays.
#[derive(Debug, Default)]
pub struct MemorySource {
    records: RwLock<HashMap<String, Vec<RawRecord>>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append records for a contract, keeping them ordered by timestamp
    pub fn insert(&self, contract: &ContractId, records: impl IntoIterator<Item = RawRecord>) {
        let mut guard = self.records.write();
        let entry = guard.entry(contract.as_str().to_string()).or_default();
        entry.extend(records);
        entry.sort_by_key(|r| r.timestamp);
    }

    pub fn record_count(&self, contract: &ContractId) -> usize {
        self.records
            .read()
            .get(contract.as_str())
            .map(|r| r.len())
            .unwrap_or(0)
    }

    pub fn clear(&self) {
        self.records.write().clear();
    }
}

impl DataSource for MemorySource {
    fn name(&self) -> &str {
        "memory"
    }

    fn fetch(
        &self,
        contract: &ContractId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> impl Future<Output = RiskResult<Vec<RawRecord>>> + Send {
        let records = self
            .records
            .read()
            .get(contract.as_str())
            .map(|all| {
                all.iter()
                    .filter(|r| r.timestamp >= start && r.timestamp < end)
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        std::future::ready(Ok(records))
    }
}
