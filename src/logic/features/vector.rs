//! Feature Rows - Core data structure for model input
//!
//! A `FeatureFrame` is an ordered run of `FeatureRow`s sharing one named
//! column list. The column list travels with the data so the predictor can
//! check it against the schema it was trained on.

use chrono::{DateTime, Utc};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::layout::{self, FEATURE_VERSION};
use crate::logic::error::{RiskError, RiskResult};

/// One tick's feature values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub timestamp: DateTime<Utc>,
    pub values: Vec<f64>,
}

impl FeatureRow {
    pub fn new(timestamp: DateTime<Utc>, values: Vec<f64>) -> Self {
        Self { timestamp, values }
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied()
    }
}

/// Ordered feature rows with their column names
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureFrame {
    columns: Vec<String>,
    rows: Vec<FeatureRow>,
}

impl FeatureFrame {
    pub fn new(columns: Vec<String>, rows: Vec<FeatureRow>) -> RiskResult<Self> {
        if let Some(bad) = rows.iter().find(|r| r.values.len() != columns.len()) {
            return Err(RiskError::Schema(format!(
                "row at {} has {} values for {} columns",
                bad.timestamp,
                bad.values.len(),
                columns.len()
            )));
        }
        Ok(Self { columns, rows })
    }

    /// Empty frame with the current vault layout
    pub fn empty_layout() -> Self {
        Self {
            columns: layout::layout_columns(),
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<FeatureRow> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn last(&self) -> Option<&FeatureRow> {
        self.rows.last()
    }

    pub fn schema_hash(&self) -> u32 {
        layout::schema_hash(&self.columns)
    }

    /// True when the columns are exactly the current vault layout
    pub fn is_current_layout(&self) -> bool {
        self.schema_hash() == layout::layout_hash() && self.columns.len() == layout::FEATURE_COUNT
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn value(&self, row: usize, name: &str) -> Option<f64> {
        let j = self.column_index(name)?;
        self.rows.get(row).and_then(|r| r.get(j))
    }

    pub fn column_values(&self, name: &str) -> Option<Vec<f64>> {
        let j = self.column_index(name)?;
        Some(self.rows.iter().map(|r| r.values[j]).collect())
    }

    /// Sub-frame over a row range, same columns
    pub fn slice(&self, range: std::ops::Range<usize>) -> Self {
        Self {
            columns: self.columns.clone(),
            rows: self.rows[range].to_vec(),
        }
    }

    /// Frame holding only the last row
    pub fn tail(&self) -> Self {
        let n = self.rows.len();
        self.slice(n.saturating_sub(1)..n)
    }

    /// rows x columns matrix for the classifier
    pub fn to_matrix(&self) -> Array2<f64> {
        let mut matrix = Array2::<f64>::zeros((self.rows.len(), self.columns.len()));
        for (i, row) in self.rows.iter().enumerate() {
            for (j, v) in row.values.iter().enumerate() {
                matrix[[i, j]] = *v;
            }
        }
        matrix
    }

    /// JSON-serializable view of one row for logging
    pub fn to_log_entry(&self, row: usize) -> Option<serde_json::Value> {
        let r = self.rows.get(row)?;
        Some(serde_json::json!({
            "feature_version": FEATURE_VERSION,
            "schema_hash": self.schema_hash(),
            "timestamp": r.timestamp,
            "named_values": self.columns.iter()
                .zip(r.values.iter())
                .map(|(name, value)| (name.clone(), *value))
                .collect::<std::collections::BTreeMap<_, _>>(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, h, 0, 0).unwrap()
    }

    #[test]
    fn test_frame_rejects_ragged_rows() {
        let result = FeatureFrame::new(
            vec!["a".into(), "b".into()],
            vec![FeatureRow::new(ts(0), vec![1.0])],
        );
        assert!(matches!(result, Err(RiskError::Schema(_))));
    }

    #[test]
    fn test_matrix_and_lookup() {
        let frame = FeatureFrame::new(
            vec!["a".into(), "b".into()],
            vec![
                FeatureRow::new(ts(0), vec![1.0, 2.0]),
                FeatureRow::new(ts(1), vec![3.0, 4.0]),
            ],
        )
        .unwrap();

        let m = frame.to_matrix();
        assert_eq!(m.dim(), (2, 2));
        assert_eq!(m[[1, 0]], 3.0);
        assert_eq!(frame.value(0, "b"), Some(2.0));
        assert_eq!(frame.column_values("a"), Some(vec![1.0, 3.0]));
        assert_eq!(frame.tail().len(), 1);
        assert_eq!(frame.tail().rows()[0].timestamp, ts(1));
        assert!(!frame.is_current_layout());
    }

    #[test]
    fn test_empty_layout() {
        let frame = FeatureFrame::empty_layout();
        assert!(frame.is_empty());
        assert!(frame.is_current_layout());
        assert!(frame.tail().is_empty());
    }

    #[test]
    fn test_to_log_entry() {
        let frame = FeatureFrame::new(
            vec!["a".into()],
            vec![FeatureRow::new(ts(0), vec![0.5])],
        )
        .unwrap();

        let log = frame.to_log_entry(0).unwrap();
        assert_eq!(log["feature_version"], FEATURE_VERSION);
        assert_eq!(log["named_values"]["a"], 0.5);
        assert!(frame.to_log_entry(3).is_none());
    }
}
