//! JSONL storage for labeled rows
//!
//! One `LabeledRecord` per line. The writer appends to timestamped files under
//! a base directory and rotates them by size; readers merge files in filename
//! order, which is chronological.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use parking_lot::Mutex;

use super::record::LabeledRecord;
use crate::logic::error::{RiskError, RiskResult};

const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024; // 10 MB

/// Default directory for labeled dataset files
pub fn default_dataset_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vault-rescue")
        .join("dataset")
}

/// Write records to `path`, replacing its content. Returns the record count.
pub fn write_jsonl(path: &Path, records: &[LabeledRecord]) -> RiskResult<usize> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut out = BufWriter::new(File::create(path)?);
    for record in records {
        serde_json::to_writer(&mut out, record)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;

    Ok(records.len())
}

/// Read every record in one file. Blank lines are skipped.
pub fn read_jsonl(path: &Path) -> RiskResult<Vec<LabeledRecord>> {
    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();

    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line).map_err(|e| {
            RiskError::Schema(format!("{}:{}: {}", path.display(), n + 1, e))
        })?;
        records.push(record);
    }

    Ok(records)
}

/// `.jsonl` files directly under `dir`, sorted by name
pub fn list_dataset_files(dir: &Path) -> RiskResult<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().map_or(false, |e| e == "jsonl") {
            paths.push(path);
        }
    }

    paths.sort();
    Ok(paths)
}

/// Read all dataset files under `dir` in chronological file order
pub fn read_dataset_dir(dir: &Path) -> RiskResult<Vec<LabeledRecord>> {
    let mut records = Vec::new();
    for path in list_dataset_files(dir)? {
        records.extend(read_jsonl(&path)?);
    }
    log::debug!("Read {} labeled records from {}", records.len(), dir.display());
    Ok(records)
}

/// Appending writer with size-based rotation
pub struct DatasetWriter {
    file: Mutex<Option<File>>,
    base_dir: PathBuf,
}

impl DatasetWriter {
    pub fn new() -> RiskResult<Self> {
        Self::from_path(default_dataset_dir())
    }

    pub fn from_path(base_dir: PathBuf) -> RiskResult<Self> {
        fs::create_dir_all(&base_dir)?;
        Ok(Self {
            file: Mutex::new(None),
            base_dir,
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Append one record, opening or rotating the current file as needed
    pub fn append(&self, record: &LabeledRecord) -> RiskResult<()> {
        let mut guard = self.file.lock();

        let reusable = match guard.as_ref() {
            Some(f) => f.metadata()?.len() < MAX_FILE_SIZE,
            None => false,
        };

        if !reusable {
            *guard = Some(self.open_latest_or_new(guard.is_some())?);
        }

        if let Some(file) = guard.as_mut() {
            let json = serde_json::to_string(record)?;
            writeln!(file, "{}", json)?;
        }

        Ok(())
    }

    fn open_latest_or_new(&self, rotating: bool) -> RiskResult<File> {
        if !rotating {
            if let Some(path) = list_dataset_files(&self.base_dir)?.pop() {
                let f = OpenOptions::new().create(true).append(true).open(&path)?;
                if f.metadata()?.len() < MAX_FILE_SIZE {
                    return Ok(f);
                }
            }
        }

        // dataset-YYYY-MM-DD-HHMMSS.jsonl
        let filename = format!("dataset-{}.jsonl", Utc::now().format("%Y-%m-%d-%H%M%S"));
        let path = self.base_dir.join(filename);
        log::info!("Opening dataset file {}", path.display());

        Ok(OpenOptions::new().create(true).append(true).open(path)?)
    }
}
