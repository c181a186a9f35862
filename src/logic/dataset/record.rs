use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::logic::features::layout::{self, FEATURE_VERSION};
use crate::logic::features::FeatureRow;

/// One labeled feature row as stored in the JSONL label source
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LabeledRecord {
    pub timestamp: DateTime<Utc>,

    // Feature contract
    pub feature_version: u8,
    pub layout_hash: u32,
    /// Explicit column names; absent means the layout named by `layout_hash`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<String>>,
    pub features: Vec<f64>,

    // Outcome, absent for rows not yet labeled
    #[serde(default)]
    pub is_rescue_needed: Option<bool>,
}

impl LabeledRecord {
    /// Record for a row in the current layout
    pub fn from_row(row: &FeatureRow, label: Option<bool>) -> Self {
        Self {
            timestamp: row.timestamp,
            feature_version: FEATURE_VERSION,
            layout_hash: layout::layout_hash(),
            columns: None,
            features: row.values.clone(),
            is_rescue_needed: label,
        }
    }

    /// Record carrying its own column list
    pub fn with_columns(mut self, columns: &[String]) -> Self {
        self.layout_hash = layout::schema_hash(columns);
        self.columns = Some(columns.to_vec());
        self
    }

    /// Column names this record's features follow, if resolvable
    pub fn resolve_columns(&self) -> Option<Vec<String>> {
        match &self.columns {
            Some(columns) => Some(columns.clone()),
            None if self.layout_hash == layout::layout_hash() => Some(layout::layout_columns()),
            None => None,
        }
    }

    pub fn to_row(&self) -> FeatureRow {
        FeatureRow::new(self.timestamp, self.features.clone())
    }
}
