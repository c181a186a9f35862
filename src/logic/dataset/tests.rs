use chrono::{DateTime, Duration, TimeZone, Utc};
use std::fs;
use tempfile::tempdir;

use super::*;
use crate::logic::features::layout::{layout_columns, FEATURE_COUNT};

fn ts(h: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap() + Duration::hours(h)
}

fn layout_frame(n: usize) -> FeatureFrame {
    let rows = (0..n)
        .map(|i| FeatureRow::new(ts(i as i64), vec![i as f64; FEATURE_COUNT]))
        .collect();
    FeatureFrame::new(layout_columns(), rows).unwrap()
}

fn dataset(n: usize) -> LabeledDataset {
    let labels = (0..n).map(|i| i % 4 == 0).collect();
    LabeledDataset::new(layout_frame(n), labels).unwrap()
}

#[test]
fn test_chronological_split_1000_rows() {
    let data = dataset(1000);
    let (train, test) = data.chronological_split(0.2);

    assert_eq!(train.len(), 800);
    assert_eq!(test.len(), 200);
    assert_eq!(train.features().rows()[0].timestamp, ts(0));
    assert_eq!(train.features().last().unwrap().timestamp, ts(799));
    assert_eq!(test.features().rows()[0].timestamp, ts(800));
    assert_eq!(test.features().last().unwrap().timestamp, ts(999));
}

#[test]
fn test_split_edges() {
    assert_eq!(dataset(1).split_index(0.2), 0);
    assert_eq!(dataset(10).split_index(0.0), 10);
    assert_eq!(dataset(10).split_index(1.0), 0);
    assert_eq!(dataset(5).split_index(0.2), 4);
}

#[test]
fn test_label_must_not_be_feature() {
    let frame = FeatureFrame::new(
        vec!["x".into(), LABEL_COLUMN.into()],
        vec![FeatureRow::new(ts(0), vec![1.0, 0.0])],
    )
    .unwrap();
    assert!(matches!(
        LabeledDataset::new(frame, vec![false]),
        Err(RiskError::Schema(_))
    ));
}

#[test]
fn test_rejects_unordered_rows() {
    let frame = FeatureFrame::new(
        vec!["x".into()],
        vec![
            FeatureRow::new(ts(1), vec![1.0]),
            FeatureRow::new(ts(0), vec![2.0]),
        ],
    )
    .unwrap();
    assert!(LabeledDataset::new(frame, vec![true, false]).is_err());
}

#[test]
fn test_from_table_extracts_label() {
    let columns = vec!["a".to_string(), LABEL_COLUMN.to_string(), "b".to_string()];
    let rows = vec![
        FeatureRow::new(ts(0), vec![1.0, 1.0, 2.0]),
        FeatureRow::new(ts(1), vec![3.0, 0.0, 4.0]),
    ];

    let data = LabeledDataset::from_table(columns, rows, LABEL_COLUMN).unwrap();
    assert_eq!(data.columns(), &["a".to_string(), "b".to_string()]);
    assert_eq!(data.labels(), &[true, false]);
    assert_eq!(data.features().value(1, "b"), Some(4.0));
    assert_eq!(data.positives(), 1);
}

#[test]
fn test_from_table_missing_label() {
    let result = LabeledDataset::from_table(
        vec!["a".into()],
        vec![FeatureRow::new(ts(0), vec![1.0])],
        LABEL_COLUMN,
    );
    assert!(matches!(result, Err(RiskError::MissingLabel(_))));
}

#[test]
fn test_from_table_rejects_non_binary_label() {
    let result = LabeledDataset::from_table(
        vec!["a".into(), LABEL_COLUMN.into()],
        vec![FeatureRow::new(ts(0), vec![1.0, 0.5])],
        LABEL_COLUMN,
    );
    assert!(matches!(result, Err(RiskError::Schema(_))));
}

#[test]
fn test_join_labels() {
    let frame = layout_frame(10);
    let outcomes = vec![(ts(2), true), (ts(5), false), (ts(50), true)];

    let data = LabeledDataset::join_labels(&frame, &outcomes).unwrap();
    assert_eq!(data.len(), 2);
    assert_eq!(data.labels(), &[true, false]);
    assert_eq!(data.features().rows()[1].timestamp, ts(5));

    let none = LabeledDataset::join_labels(&frame, &[(ts(99), true)]);
    assert!(matches!(none, Err(RiskError::InsufficientData(_))));
}

#[test]
fn test_records_require_label() {
    let mut records = dataset(3).to_records();
    records[1].is_rescue_needed = None;
    assert!(matches!(
        LabeledDataset::from_records(&records),
        Err(RiskError::MissingLabel(_))
    ));
}

#[test]
fn test_records_with_unknown_layout() {
    let mut records = dataset(2).to_records();
    for r in &mut records {
        r.layout_hash = 7;
    }
    assert!(matches!(
        LabeledDataset::from_records(&records),
        Err(RiskError::Schema(_))
    ));
}

#[test]
fn test_jsonl_write_and_read() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("labels.jsonl");
    let data = dataset(12);

    let written = write_jsonl(&path, &data.to_records()).unwrap();
    assert_eq!(written, 12);

    let restored = LabeledDataset::from_records(&read_jsonl(&path).unwrap()).unwrap();
    assert_eq!(restored, data);
}

#[test]
fn test_custom_columns_survive_storage() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("custom.jsonl");
    let frame = FeatureFrame::new(
        vec!["a".into(), "b".into()],
        vec![FeatureRow::new(ts(0), vec![1.0, 2.0])],
    )
    .unwrap();
    let data = LabeledDataset::new(frame, vec![true]).unwrap();

    write_jsonl(&path, &data.to_records()).unwrap();
    let records = read_jsonl(&path).unwrap();
    assert_eq!(records[0].columns.as_deref(), Some(&["a".to_string(), "b".to_string()][..]));
    assert_eq!(LabeledDataset::from_records(&records).unwrap(), data);
}

#[test]
fn test_read_reports_bad_line() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.jsonl");
    fs::write(&path, "\n{not json}\n").unwrap();

    match read_jsonl(&path) {
        Err(RiskError::Schema(msg)) => assert!(msg.contains(":2:")),
        other => panic!("expected Schema error, got {:?}", other),
    }
}

#[test]
fn test_writer_appends_to_one_file() {
    let dir = tempdir().unwrap();
    let writer = DatasetWriter::from_path(dir.path().to_path_buf()).unwrap();

    for record in dataset(3).to_records() {
        writer.append(&record).unwrap();
    }

    let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().map(|e| e.unwrap()).collect();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].path().extension().unwrap() == "jsonl");

    let records = read_dataset_dir(dir.path()).unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(records[2].timestamp, ts(2));
}

#[test]
fn test_list_dataset_files() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("b.jsonl"), "").unwrap();
    fs::write(dir.path().join("a.jsonl"), "").unwrap();
    fs::write(dir.path().join("notes.txt"), "").unwrap();

    let files = list_dataset_files(dir.path()).unwrap();
    let names: Vec<_> = files
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["a.jsonl", "b.jsonl"]);

    let missing = list_dataset_files(&dir.path().join("absent"));
    assert!(matches!(missing, Err(RiskError::Io(_))));
}
