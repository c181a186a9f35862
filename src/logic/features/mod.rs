//! Features Module - Feature Engineering Engine
//!
//! Derives the model's input rows from a preprocessed time series.
//! The column order is owned by `layout`; everything else builds on it.

pub mod layout;
pub mod vector;
pub mod calendar;
pub mod window;
pub mod engineer;

#[cfg(test)]
mod tests;

// Re-export common types
pub use engineer::{engineer_features, FeatureConfig, FeatureEngineer};
pub use layout::{FEATURE_COUNT, FEATURE_LAYOUT, FEATURE_VERSION};
pub use vector::{FeatureFrame, FeatureRow};
