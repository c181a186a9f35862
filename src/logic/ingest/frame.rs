//! Time Series Frame
//!
//! Fixed-cadence, gap-free table produced by preprocessing. Rows are ticks,
//! columns are numeric metrics; each column also carries its outlier flags
//! and the statistics used to scale it.

use chrono::{DateTime, Duration, Utc};
use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};

use crate::logic::error::{RiskError, RiskResult};

/// Scaling statistics of one column over the fetched window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColumnStats {
    pub mean: f64,
    pub std: f64,
}

impl Default for ColumnStats {
    fn default() -> Self {
        Self { mean: 0.0, std: 1.0 }
    }
}

#[derive(Debug, Clone)]
pub struct TimeSeriesFrame {
    cadence: Duration,
    timestamps: Vec<DateTime<Utc>>,
    columns: Vec<String>,
    /// rows x columns
    values: Array2<f64>,
    /// rows x columns, `<col>_is_outlier`
    outliers: Array2<bool>,
    stats: Vec<ColumnStats>,
}

impl TimeSeriesFrame {
    pub(crate) fn from_parts(
        cadence: Duration,
        timestamps: Vec<DateTime<Utc>>,
        columns: Vec<String>,
        values: Array2<f64>,
        outliers: Array2<bool>,
        stats: Vec<ColumnStats>,
    ) -> Self {
        debug_assert_eq!(values.dim(), (timestamps.len(), columns.len()));
        debug_assert_eq!(outliers.dim(), values.dim());
        debug_assert_eq!(stats.len(), columns.len());

        Self {
            cadence,
            timestamps,
            columns,
            values,
            outliers,
            stats,
        }
    }

    /// Build a frame from already-clean columns (no scaling, no flags).
    ///
    /// Timestamps must be strictly increasing and uniformly spaced, and every
    /// value finite. Used for replaying stored series through feature engineering.
    pub fn from_columns(
        timestamps: Vec<DateTime<Utc>>,
        columns: Vec<(String, Vec<f64>)>,
    ) -> RiskResult<Self> {
        let rows = timestamps.len();
        let cadence = match timestamps.as_slice() {
            [first, second, ..] => *second - *first,
            _ => Duration::hours(1),
        };

        if cadence <= Duration::zero() {
            return Err(RiskError::Schema("timestamps must be strictly increasing".into()));
        }
        for pair in timestamps.windows(2) {
            if pair[1] - pair[0] != cadence {
                return Err(RiskError::Schema(format!(
                    "non-uniform spacing at {} (expected {}s)",
                    pair[1],
                    cadence.num_seconds()
                )));
            }
        }

        let mut values = Array2::<f64>::zeros((rows, columns.len()));
        let mut names = Vec::with_capacity(columns.len());
        for (j, (name, series)) in columns.into_iter().enumerate() {
            if series.len() != rows {
                return Err(RiskError::Schema(format!(
                    "column '{}' has {} values for {} timestamps",
                    name,
                    series.len(),
                    rows
                )));
            }
            if let Some(pos) = series.iter().position(|v| !v.is_finite()) {
                return Err(RiskError::Schema(format!(
                    "column '{}' has a non-finite value at row {}",
                    name, pos
                )));
            }
            for (i, v) in series.into_iter().enumerate() {
                values[[i, j]] = v;
            }
            names.push(name);
        }

        let cols = names.len();
        Ok(Self::from_parts(
            cadence,
            timestamps,
            names,
            values,
            Array2::from_elem((rows, cols), false),
            vec![ColumnStats::default(); cols],
        ))
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn cadence(&self) -> Duration {
        self.cadence
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn column(&self, name: &str) -> Option<ArrayView1<'_, f64>> {
        self.column_index(name).map(|j| self.values.column(j))
    }

    pub fn outlier_flags(&self, name: &str) -> Option<ArrayView1<'_, bool>> {
        self.column_index(name).map(|j| self.outliers.column(j))
    }

    /// Names of the flag columns, in column order (`<col>_is_outlier`)
    pub fn outlier_column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| format!("{}_is_outlier", c)).collect()
    }

    pub fn stats(&self, name: &str) -> Option<ColumnStats> {
        self.column_index(name).map(|j| self.stats[j])
    }

    pub fn value(&self, row: usize, name: &str) -> Option<f64> {
        let j = self.column_index(name)?;
        self.values.get((row, j)).copied()
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn outlier_count(&self) -> usize {
        self.outliers.iter().filter(|f| **f).count()
    }
}
