//! Predictor tests

use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::*;
use crate::logic::dataset::LabeledDataset;
use crate::logic::error::RiskError;
use crate::logic::features::{FeatureFrame, FeatureRow};

fn ts(h: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::hours(h)
}

fn columns() -> Vec<String> {
    vec!["ratio".into(), "debt_trend".into(), "noise".into()]
}

/// Rescue needed when the ratio is low
fn synthetic(n: usize) -> LabeledDataset {
    let mut rng = StdRng::seed_from_u64(11);
    let mut rows = Vec::with_capacity(n);
    let mut labels = Vec::with_capacity(n);
    for i in 0..n {
        let ratio: f64 = rng.gen_range(1.0..3.0);
        let trend: f64 = rng.gen_range(-1.0..1.0);
        let noise: f64 = rng.gen_range(-1.0..1.0);
        rows.push(FeatureRow::new(ts(i as i64), vec![ratio, trend, noise]));
        labels.push(ratio < 1.3);
    }
    LabeledDataset::new(FeatureFrame::new(columns(), rows).unwrap(), labels).unwrap()
}

fn quick_config() -> ModelConfig {
    ModelConfig {
        forest: ForestConfig {
            n_estimators: 10,
            ..Default::default()
        },
        ..Default::default()
    }
}

#[test]
fn test_predict_before_train() {
    let predictor = RiskPredictor::default();
    assert_eq!(predictor.state(), PredictorState::Untrained);

    let data = synthetic(10);
    assert!(matches!(
        predictor.predict(data.features()),
        Err(RiskError::ModelNotTrained)
    ));
    assert!(matches!(
        predictor.evaluate(data.features(), data.labels()),
        Err(RiskError::ModelNotTrained)
    ));
}

#[test]
fn test_train_splits_chronologically() {
    let data = synthetic(1000);
    let mut predictor = RiskPredictor::new(quick_config());

    let report = predictor.train(&data).unwrap();

    assert_eq!(report.train_rows, 800);
    assert_eq!(report.test_rows, 200);
    let meta = predictor.metadata().unwrap();
    assert_eq!(meta.train_span, Some((ts(0), ts(799))));
    assert_eq!(meta.test_span, Some((ts(800), ts(999))));
    assert_eq!(meta.feature_columns, columns());
    assert_eq!(meta.fingerprint.len(), 64);
    assert_eq!(predictor.state(), PredictorState::Trained);
}

#[test]
fn test_train_then_predict_same_schema() {
    let data = synthetic(300);
    let mut predictor = RiskPredictor::new(quick_config());
    let report = predictor.train(&data).unwrap();

    let scores = predictor.predict(data.features()).unwrap();
    assert_eq!(scores.len(), 300);
    assert!(scores.iter().all(|s| (0.0..=1.0).contains(s)));

    let evaluation = report.evaluation.unwrap();
    assert_eq!(evaluation.samples, 60);
    assert!(evaluation.accuracy > 0.8);
}

#[test]
fn test_schema_mismatch() {
    let data = synthetic(100);
    let mut predictor = RiskPredictor::new(quick_config());
    predictor.train(&data).unwrap();

    let reordered = FeatureFrame::new(
        vec!["debt_trend".into(), "ratio".into(), "noise".into()],
        vec![FeatureRow::new(ts(0), vec![0.0, 2.0, 0.0])],
    )
    .unwrap();

    match predictor.predict(&reordered) {
        Err(RiskError::FeatureSchemaMismatch { expected, actual, .. }) => {
            assert_eq!(expected, columns());
            assert_eq!(actual[0], "debt_trend");
        }
        other => panic!("expected schema mismatch, got {:?}", other),
    }
}

#[test]
fn test_predict_latest() {
    let data = synthetic(200);
    let mut predictor = RiskPredictor::new(quick_config());
    predictor.train(&data).unwrap();

    let all = predictor.predict(data.features()).unwrap();
    let latest = predictor.predict_latest(data.features()).unwrap();
    assert_eq!(latest, *all.last().unwrap());

    let empty = FeatureFrame::new(columns(), vec![]).unwrap();
    assert!(matches!(
        predictor.predict_latest(&empty),
        Err(RiskError::InsufficientData(_))
    ));
    assert!(predictor.predict(&empty).unwrap().is_empty());
}

#[test]
fn test_single_row_has_no_test_split() {
    let data = synthetic(1);
    let mut predictor = RiskPredictor::new(quick_config());
    let result = predictor.train(&data);
    assert!(matches!(result, Err(RiskError::InsufficientData(_))));
    assert!(!predictor.is_trained());

    let report = predictor.train(&synthetic(4)).unwrap();
    assert_eq!(report.train_rows, 3);
    assert_eq!(report.test_rows, 1);

    let mut no_holdout = RiskPredictor::new(ModelConfig {
        test_fraction: 0.0,
        ..quick_config()
    });
    let report = no_holdout.train(&synthetic(20)).unwrap();
    assert_eq!(report.test_rows, 0);
    assert!(report.evaluation.is_none());
}

#[test]
fn test_retrain_replaces_model() {
    let mut predictor = RiskPredictor::new(quick_config());
    let first = predictor.train(&synthetic(100)).unwrap();
    let second = predictor.train(&synthetic(150)).unwrap();

    assert_ne!(first.model_id, second.model_id);
    assert_eq!(predictor.metadata().unwrap().id, second.model_id);
    assert_eq!(predictor.last_report(), Some(&second));
}

#[test]
fn test_logistic_backend() {
    let data = synthetic(300);
    let mut predictor = RiskPredictor::new(ModelConfig {
        kind: ModelKind::Logistic,
        ..Default::default()
    });

    let report = predictor.train(&data).unwrap();
    assert_eq!(predictor.metadata().unwrap().kind, ModelKind::Logistic);
    assert!(report.evaluation.unwrap().roc_auc.unwrap() > 0.8);
}

#[test]
fn test_standalone_evaluate() {
    let data = synthetic(400);
    let mut predictor = RiskPredictor::new(quick_config());
    predictor.train(&data).unwrap();

    let (_, test) = data.chronological_split(0.5);
    let report = predictor.evaluate(test.features(), test.labels()).unwrap();
    assert_eq!(report.samples, 200);
    assert!(predictor.evaluate(test.features(), &[true]).is_err());
}
