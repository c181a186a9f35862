//! Feature engineering tests

use chrono::{DateTime, Duration, TimeZone, Utc};

use super::layout::{feature_index, layout_columns};
use super::*;
use crate::constants::WARMUP_TICKS;
use crate::logic::error::RiskError;
use crate::logic::ingest::preprocess::prepare;
use crate::logic::ingest::{IngestConfig, RawRecord, TimeSeriesFrame};

fn hours(n: usize) -> Vec<DateTime<Utc>> {
    // Friday
    let base = Utc.with_ymd_and_hms(2024, 5, 31, 0, 0, 0).unwrap();
    (0..n).map(|h| base + Duration::hours(h as i64)).collect()
}

fn linear_frame(n: usize) -> TimeSeriesFrame {
    TimeSeriesFrame::from_columns(
        hours(n),
        vec![
            ("collateral_value".into(), (0..n).map(|i| 100.0 + i as f64).collect()),
            ("debt_value".into(), (0..n).map(|i| 50.0 + 0.5 * i as f64).collect()),
        ],
    )
    .unwrap()
}

fn idx(name: &str) -> usize {
    feature_index(name).unwrap()
}

#[test]
fn test_warmup_rows_are_dropped() {
    let frame = linear_frame(30);
    let features = engineer_features(&frame).unwrap();

    assert_eq!(features.len(), 30 - WARMUP_TICKS);
    assert_eq!(features.rows()[0].timestamp, frame.timestamps()[WARMUP_TICKS]);
    assert_eq!(features.last().unwrap().timestamp, frame.timestamps()[29]);
}

#[test]
fn test_columns_follow_layout() {
    let features = engineer_features(&linear_frame(12)).unwrap();

    assert_eq!(features.columns(), layout_columns().as_slice());
    assert!(features.is_current_layout());
    assert!(features.rows().iter().all(|r| r.values.len() == FEATURE_COUNT));
}

#[test]
fn test_order_is_preserved() {
    let features = engineer_features(&linear_frame(40)).unwrap();
    for pair in features.rows().windows(2) {
        assert!(pair[0].timestamp < pair[1].timestamp);
    }
}

#[test]
fn test_lag_and_rolling_values() {
    let features = engineer_features(&linear_frame(20)).unwrap();
    let first = &features.rows()[0]; // tick 7

    assert_eq!(first.values[idx("collateral_value")], 107.0);
    assert_eq!(first.values[idx("collateral_value_lag_1")], 106.0);
    assert_eq!(first.values[idx("collateral_value_lag_7")], 100.0);
    assert_eq!(first.values[idx("debt_value_lag_7")], 50.0);

    // window 101..=107
    assert!((first.values[idx("collateral_rolling_mean_7")] - 104.0).abs() < 1e-12);
    let expected_std = (28.0f64 / 6.0).sqrt();
    assert!((first.values[idx("collateral_rolling_std_7")] - expected_std).abs() < 1e-12);
    assert!((first.values[idx("debt_rolling_std_7")] - expected_std / 2.0).abs() < 1e-12);
}

#[test]
fn test_calendar_columns() {
    let features = engineer_features(&linear_frame(30)).unwrap();
    let weekend = idx("is_weekend");

    // Hours 7..23 fall on Friday, 24.. on Saturday
    assert_eq!(features.rows()[0].values[weekend], 0.0);
    assert_eq!(features.rows()[24 - WARMUP_TICKS].values[weekend], 1.0);

    for row in features.rows() {
        let s = row.values[idx("hour_sin")];
        let c = row.values[idx("hour_cos")];
        assert!((s * s + c * c - 1.0).abs() < 1e-9);
    }
}

#[test]
fn test_ratio_stays_finite_at_zero_denominator() {
    let n = 20;
    let mut debt: Vec<f64> = (0..n).map(|i| 2.0 + i as f64).collect();
    debt[10] = -1e-9;
    let frame = TimeSeriesFrame::from_columns(
        hours(n),
        vec![
            ("collateral_value".into(), vec![4.0; n]),
            ("debt_value".into(), debt),
        ],
    )
    .unwrap();

    let features = engineer_features(&frame).unwrap();
    let ratio = features.column_values("collateral_to_debt_ratio").unwrap();

    assert!(ratio.iter().all(|r| r.is_finite()));
    assert!(features.rows().iter().flat_map(|r| r.values.iter()).all(|v| v.is_finite()));
}

#[test]
fn test_ratio_fill_uses_finite_mean() {
    let engineer = FeatureEngineer::default();
    let ratio = engineer.collateral_to_debt_ratio(&[2.0, 4.0, 1.0], &[1.0, 2.0, -1e-9]);

    assert!((ratio[0] - 2.0).abs() < 1e-6);
    assert!((ratio[1] - 2.0).abs() < 1e-6);
    assert!((ratio[2] - 2.0).abs() < 1e-6);

    let all_bad = engineer.collateral_to_debt_ratio(&[1.0], &[-1e-9]);
    assert_eq!(all_bad, vec![0.0]);
}

#[test]
fn test_missing_column() {
    let frame = TimeSeriesFrame::from_columns(
        hours(10),
        vec![("collateral_value".into(), vec![1.0; 10])],
    )
    .unwrap();

    match engineer_features(&frame) {
        Err(RiskError::MissingColumn(name)) => assert_eq!(name, "debt_value"),
        other => panic!("expected MissingColumn, got {:?}", other),
    }
}

#[test]
fn test_short_frame_yields_no_rows() {
    let features = engineer_features(&linear_frame(WARMUP_TICKS)).unwrap();
    assert!(features.is_empty());
    assert!(features.is_current_layout());
}

#[test]
fn test_deterministic() {
    let frame = linear_frame(50);
    let a = engineer_features(&frame).unwrap();
    let b = engineer_features(&frame).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_from_preprocessed_frame() {
    let start = hours(1)[0];
    let records: Vec<RawRecord> = (0..72)
        .map(|h| {
            let wobble = if h % 5 == 0 { 40.0 } else { 0.0 };
            RawRecord::new(start + Duration::hours(h) + Duration::minutes(10))
                .with("collateral_value", 1000.0 - h as f64 * 2.0 + wobble)
                .with("debt_value", 500.0 + h as f64)
        })
        .collect();

    let frame = prepare(&records, start, start + Duration::hours(72), &IngestConfig::default()).unwrap();
    let features = engineer_features(&frame).unwrap();

    assert_eq!(features.len(), 72 - WARMUP_TICKS);
    for row in features.rows() {
        let flag = row.values[idx("collateral_value_is_outlier")];
        assert!(flag == 0.0 || flag == 1.0);
        assert!(row.values.iter().all(|v| v.is_finite()));
    }
}
