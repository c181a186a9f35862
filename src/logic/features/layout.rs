//! Feature Layout - Centralized Feature Definition
//!
//! **This file controls the feature schema shared by feature engineering and
//! the risk predictor.**
//!
//! ## Rules:
//! 1. Add feature → increment FEATURE_VERSION
//! 2. Change order → increment FEATURE_VERSION
//! 3. Remove feature → increment FEATURE_VERSION
//!
//! A trained model stores the column list it was fitted on; any drift here is
//! caught as a schema mismatch at predict time.

use crc32fast::Hasher;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::logic::error::{RiskError, RiskResult};

// ============================================================================
// FEATURE VERSION
// ============================================================================

/// Current feature layout version
pub const FEATURE_VERSION: u8 = 1;

// ============================================================================
// FEATURE LAYOUT (Authoritative source)
// ============================================================================

/// Feature names in exact order they appear in a row
pub const FEATURE_LAYOUT: &[&str] = &[
    // === Scaled raw values (0-3) ===
    "collateral_value",              // 0
    "debt_value",                    // 1
    "collateral_value_is_outlier",   // 2: 1.0 when flagged
    "debt_value_is_outlier",         // 3

    // === Lags (4-7) ===
    "collateral_value_lag_1",        // 4
    "debt_value_lag_1",              // 5
    "collateral_value_lag_7",        // 6
    "debt_value_lag_7",              // 7

    // === Rolling window, 7 ticks (8-11) ===
    "collateral_rolling_mean_7",     // 8
    "collateral_rolling_std_7",      // 9
    "debt_rolling_mean_7",           // 10
    "debt_rolling_std_7",            // 11

    // === Calendar, sine/cosine (12-20) ===
    "hour_sin",                      // 12
    "hour_cos",                      // 13
    "day_of_week_sin",               // 14
    "day_of_week_cos",               // 15
    "day_of_month_sin",              // 16
    "day_of_month_cos",              // 17
    "month_sin",                     // 18
    "month_cos",                     // 19
    "is_weekend",                    // 20

    // === Risk ratio (21) ===
    "collateral_to_debt_ratio",      // 21
];

/// Total number of features
/// IMPORTANT: Must match FEATURE_LAYOUT.len()!
pub const FEATURE_COUNT: usize = 22;

// ============================================================================
// LAYOUT HASH
// ============================================================================

/// CRC32 over an ordered list of column names
pub fn schema_hash<S: AsRef<str>>(columns: &[S]) -> u32 {
    let mut hasher = Hasher::new();
    for name in columns {
        hasher.update(name.as_ref().as_bytes());
        hasher.update(&[0]); // Separator
    }
    hasher.finalize()
}

static LAYOUT_HASH: Lazy<u32> = Lazy::new(|| schema_hash(FEATURE_LAYOUT));

/// Hash of the current layout (cached)
pub fn layout_hash() -> u32 {
    *LAYOUT_HASH
}

/// Current layout as owned column names
pub fn layout_columns() -> Vec<String> {
    FEATURE_LAYOUT.iter().map(|s| s.to_string()).collect()
}

// ============================================================================
// LAYOUT INFO
// ============================================================================

/// Complete layout information for serialization/logging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutInfo {
    pub version: u8,
    pub hash: u32,
    pub feature_count: usize,
    pub feature_names: Vec<String>,
}

impl LayoutInfo {
    pub fn current() -> Self {
        Self {
            version: FEATURE_VERSION,
            hash: layout_hash(),
            feature_count: FEATURE_COUNT,
            feature_names: layout_columns(),
        }
    }
}

impl Default for LayoutInfo {
    fn default() -> Self {
        Self::current()
    }
}

// ============================================================================
// SCHEMA VALIDATION
// ============================================================================

/// Exact, ordered column match
pub fn validate_columns(expected: &[String], actual: &[String]) -> RiskResult<()> {
    if expected == actual {
        return Ok(());
    }

    Err(RiskError::FeatureSchemaMismatch {
        expected: expected.to_vec(),
        actual: actual.to_vec(),
        expected_hash: schema_hash(expected),
        actual_hash: schema_hash(actual),
    })
}

// ============================================================================
// FEATURE INDEX LOOKUP
// ============================================================================

/// Get feature index by name
pub fn feature_index(name: &str) -> Option<usize> {
    FEATURE_LAYOUT.iter().position(|&n| n == name)
}

/// Get feature name by index
pub fn feature_name(index: usize) -> Option<&'static str> {
    FEATURE_LAYOUT.get(index).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_count() {
        assert_eq!(FEATURE_LAYOUT.len(), FEATURE_COUNT);
    }

    #[test]
    fn test_layout_has_no_duplicates() {
        let mut names = layout_columns();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), FEATURE_COUNT);
    }

    #[test]
    fn test_label_not_in_layout() {
        assert_eq!(feature_index(crate::constants::LABEL_COLUMN), None);
    }

    #[test]
    fn test_hash_depends_on_order() {
        let forward = schema_hash(&["a", "b"]);
        let reversed = schema_hash(&["b", "a"]);
        assert_ne!(forward, reversed);
        assert_eq!(layout_hash(), schema_hash(FEATURE_LAYOUT));
        assert_ne!(layout_hash(), 0);
    }

    #[test]
    fn test_validate_columns() {
        let expected = layout_columns();
        assert!(validate_columns(&expected, &expected).is_ok());

        let mut swapped = expected.clone();
        swapped.swap(0, 1);
        assert!(matches!(
            validate_columns(&expected, &swapped),
            Err(RiskError::FeatureSchemaMismatch { .. })
        ));

        let shorter = expected[..5].to_vec();
        assert!(validate_columns(&expected, &shorter).is_err());
    }

    #[test]
    fn test_feature_index() {
        assert_eq!(feature_index("collateral_value"), Some(0));
        assert_eq!(feature_index("hour_sin"), Some(12));
        assert_eq!(feature_index("collateral_to_debt_ratio"), Some(21));
        assert_eq!(feature_index("nonexistent"), None);
        assert_eq!(feature_name(21), Some("collateral_to_debt_ratio"));
        assert_eq!(feature_name(100), None);
    }

    #[test]
    fn test_layout_info() {
        let info = LayoutInfo::current();
        assert_eq!(info.version, FEATURE_VERSION);
        assert_eq!(info.feature_count, FEATURE_COUNT);
        assert_eq!(info.feature_names.len(), FEATURE_COUNT);
    }
}
