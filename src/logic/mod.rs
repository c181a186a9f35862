//! Logic Module - Risk scoring pipeline
//!
//! ## Architecture
//! - `ingest/` - Data source, resampling, gap filling, scaling, outlier flags
//! - `features/` - Feature layout and engineering
//! - `dataset/` - Labeled rows and JSONL storage
//! - `model/` - Classifiers, predictor, metrics, dynamic threshold
//! - `session` - Per-user vault state behind an injected store
//! - `service` - Facade tying the pipeline together

pub mod error;
pub mod config;

pub mod ingest;
pub mod features;
pub mod dataset;
pub mod model;

pub mod session;
pub mod service;
