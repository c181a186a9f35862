//! Preprocessing - raw records to a clean frame
//!
//! Steps, in order:
//! 1. Keep records inside `[start, end)`
//! 2. Resample onto the cadence grid (last observation per bucket wins)
//! 3. Forward-fill, then backward-fill the leading gap
//! 4. Z-score every column over the window (zero variance -> constant 0)
//! 5. Flag values beyond `outlier_sigmas` standard deviations (never removed)

use chrono::{DateTime, Duration, Utc};
use ndarray::Array2;

use super::frame::{ColumnStats, TimeSeriesFrame};
use super::source::RawRecord;
use super::IngestConfig;
use crate::logic::error::{RiskError, RiskResult};

/// Relative tolerance under which a column is treated as constant
const ZERO_VARIANCE_EPS: f64 = 1e-12;

/// Run the full preprocessing chain
pub fn prepare(
    records: &[RawRecord],
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
    let cadence_secs = config.cadence_secs.max(1);

    let mut in_range: Vec<&RawRecord> = records
        .iter()
        .filter(|r| r.timestamp >= start && r.timestamp < end)
        .collect();
    in_range.sort_by_key(|r| r.timestamp);

    if in_range.is_empty() {
        return Err(RiskError::InsufficientData(format!(
            "no records in [{} .. {}) after resampling",
            start, end
        )));
    }

    let columns = collect_columns(&in_range, &config.required_columns);
    for required in &config.required_columns {
        if !columns.contains(required) {
            return Err(RiskError::Schema(format!(
                "field '{}' missing from every record",
                required
            )));
        }
    }

    let ticks = tick_grid(start, end, cadence_secs);
    let Some(&first_tick) = ticks.first() else {
        return Err(RiskError::InsufficientData(format!(
            "no {}s tick boundary inside [{} .. {})",
            cadence_secs, start, end
        )));
    };
    let rows = ticks.len();

    // Resample: one slot per tick, later observations overwrite earlier ones.
    // Records before the first boundary belong to a bucket labeled before `start`.
    let mut grid: Vec<Vec<Option<f64>>> = vec![vec![None; rows]; columns.len()];
    for record in &in_range {
        let offset = (align_down(record.timestamp, cadence_secs) - first_tick).num_seconds();
        if offset < 0 {
            continue;
        }
        let idx = (offset / cadence_secs) as usize;
        if idx >= rows {
            continue;
        }
        for (j, name) in columns.iter().enumerate() {
            if let Some(v) = record.get(name) {
                grid[j][idx] = Some(v);
            }
        }
    }

    let mut values = Array2::<f64>::zeros((rows, columns.len()));
    let mut outliers = Array2::from_elem((rows, columns.len()), false);
    let mut stats = Vec::with_capacity(columns.len());
    let mut filled_total = 0;

    for (j, slots) in grid.iter_mut().enumerate() {
        filled_total += fill_gaps(slots);

        let mut series: Vec<f64> = slots
            .iter()
            .copied()
            .collect::<Option<Vec<f64>>>()
            .ok_or_else(|| {
                RiskError::Schema(format!("column '{}' has no observations", columns[j]))
            })?;

        stats.push(zscore(&mut series));

        let flags = flag_outliers(&series, config.outlier_sigmas);
        for i in 0..rows {
            values[[i, j]] = series[i];
            outliers[[i, j]] = flags[i];
        }
    }

    let frame = TimeSeriesFrame::from_parts(
        Duration::seconds(cadence_secs),
        ticks,
        columns,
        values,
        outliers,
        stats,
    );

    log::debug!(
        "Prepared frame: {} records -> {} ticks x {} columns ({} gaps filled, {} outliers flagged)",
        in_range.len(),
        frame.len(),
        frame.columns().len(),
        filled_total,
        frame.outlier_count()
    );

    Ok(frame)
}

/// Column order: required columns first, then any extra metrics alphabetically
fn collect_columns(records: &[&RawRecord], required: &[String]) -> Vec<String> {
    let mut extra: Vec<String> = Vec::new();
    for record in records {
        for (name, value) in &record.fields {
            if value.is_finite() && !required.contains(name) && !extra.contains(name) {
                extra.push(name.clone());
            }
        }
    }
    extra.sort();

    required
        .iter()
        .filter(|name| records.iter().any(|r| r.get(name).is_some()))
        .cloned()
        .chain(extra)
        .collect()
}

pub(crate) fn align_down(ts: DateTime<Utc>, cadence_secs: i64) -> DateTime<Utc> {
    let secs = ts.timestamp().div_euclid(cadence_secs) * cadence_secs;
    DateTime::from_timestamp(secs, 0).unwrap_or(ts)
}

pub(crate) fn align_up(ts: DateTime<Utc>, cadence_secs: i64) -> DateTime<Utc> {
    let down = align_down(ts, cadence_secs);
    if down < ts {
        down + Duration::seconds(cadence_secs)
    } else {
        down
    }
}

/// Cadence boundaries inside `[start, end)`
pub fn tick_grid(start: DateTime<Utc>, end: DateTime<Utc>, cadence_secs: i64) -> Vec<DateTime<Utc>> {
    let step = Duration::seconds(cadence_secs.max(1));
    let mut ticks = Vec::new();
    let mut t = align_up(start, cadence_secs.max(1));
    while t < end {
        ticks.push(t);
        t += step;
    }
    ticks
}

/// Forward-fill then backward-fill. Returns how many slots were filled.
pub fn fill_gaps(series: &mut [Option<f64>]) -> usize {
    let mut filled = 0;

    let mut last = None;
    for slot in series.iter_mut() {
        match slot {
            Some(v) => last = Some(*v),
            None => {
                if let Some(v) = last {
                    *slot = Some(v);
                    filled += 1;
                }
            }
        }
    }

    // Leading gap: take the first observation
    if let Some(first) = series.iter().flatten().next().copied() {
        for slot in series.iter_mut() {
            if slot.is_some() {
                break;
            }
            *slot = Some(first);
            filled += 1;
        }
    }

    filled
}

/// Mean and sample standard deviation (n - 1)
pub fn mean_std(values: &[f64]) -> (f64, f64) {
    let n = values.len();
    if n == 0 {
        return (0.0, 0.0);
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    if n < 2 {
        return (mean, 0.0);
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    (mean, variance.sqrt())
}

fn is_constant(mean: f64, std: f64) -> bool {
    !std.is_finite() || std <= ZERO_VARIANCE_EPS * mean.abs().max(1.0)
}

/// In-place z-score. Constant columns become all zeros.
pub fn zscore(values: &mut [f64]) -> ColumnStats {
    let (mean, std) = mean_std(values);

    if is_constant(mean, std) {
        values.iter_mut().for_each(|v| *v = 0.0);
        return ColumnStats { mean, std: 0.0 };
    }

    values.iter_mut().for_each(|v| *v = (*v - mean) / std);
    ColumnStats { mean, std }
}

/// `|x - mean| > sigmas * std` per value
pub fn flag_outliers(values: &[f64], sigmas: f64) -> Vec<bool> {
    let (mean, std) = mean_std(values);
    if is_constant(mean, std) {
        return vec![false; values.len()];
    }
    values.iter().map(|v| (v - mean).abs() > sigmas * std).collect()
}
