//! Central Configuration Constants
//!
//! Single source of truth for all configuration defaults.
//! Env getters fall back to these values when a variable is unset or unparsable.

/// Default Bitquery GraphQL endpoint
pub const DEFAULT_BITQUERY_URL: &str = "https://graphql.bitquery.io/";

/// Default request timeout for the indexing provider (seconds)
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Resampling cadence (seconds) - hourly ticks
pub const DEFAULT_CADENCE_SECS: i64 = 3600;

/// How far back `score_vault` looks when building features (hours)
pub const DEFAULT_LOOKBACK_HOURS: i64 = 168;

/// Deviation (in standard deviations) above which a value is flagged
pub const DEFAULT_OUTLIER_SIGMAS: f64 = 3.0;

/// Guard added to debt before computing the collateral/debt ratio
pub const RATIO_EPSILON: f64 = 1e-9;

/// Longest lag / rolling window used by feature engineering (ticks)
pub const WARMUP_TICKS: usize = 7;

/// Fraction of the most recent rows held out for evaluation
pub const DEFAULT_TEST_FRACTION: f64 = 0.2;

/// Tree ensemble defaults
pub const DEFAULT_N_ESTIMATORS: usize = 100;
pub const DEFAULT_RANDOM_SEED: u64 = 42;

/// Decision threshold defaults
pub const DEFAULT_INITIAL_THRESHOLD: f64 = 0.5;
pub const DEFAULT_THRESHOLD_WINDOW: usize = 200;
pub const DEFAULT_POSITIVE_PERCENTILE: f64 = 25.0;
pub const DEFAULT_QUIET_PERCENTILE: f64 = 95.0;

/// Name of the label column in training data
pub const LABEL_COLUMN: &str = "is_rescue_needed";

/// Raw columns every frame must provide
pub const COLLATERAL_COLUMN: &str = "collateral_value";
pub const DEBT_COLUMN: &str = "debt_value";

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================
// Helper functions to read from env with fallback
// ============================================

/// Get Bitquery endpoint from environment or use default
pub fn get_bitquery_url() -> String {
    std::env::var("BITQUERY_URL")
        .unwrap_or_else(|_| DEFAULT_BITQUERY_URL.to_string())
}

/// Get Bitquery API key from environment (optional)
pub fn get_bitquery_api_key() -> Option<String> {
    std::env::var("BITQUERY_API_KEY")
        .ok()
        .filter(|k| !k.trim().is_empty())
}

/// Get initial decision threshold from environment or use default
pub fn get_initial_threshold() -> f64 {
    std::env::var("RESCUE_INITIAL_THRESHOLD")
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|t: &f64| (0.0..=1.0).contains(t))
        .unwrap_or(DEFAULT_INITIAL_THRESHOLD)
}

/// Get threshold window size from environment or use default
pub fn get_threshold_window() -> usize {
    std::env::var("RESCUE_THRESHOLD_WINDOW")
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|n: &usize| *n > 0)
        .unwrap_or(DEFAULT_THRESHOLD_WINDOW)
}

/// Get scoring lookback from environment or use default
pub fn get_lookback_hours() -> i64 {
    std::env::var("RESCUE_LOOKBACK_HOURS")
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|h: &i64| *h > WARMUP_TICKS as i64)
        .unwrap_or(DEFAULT_LOOKBACK_HOURS)
}

/// Get model kind name from environment (parsed by the model layer)
pub fn get_model_kind() -> Option<String> {
    std::env::var("RESCUE_MODEL_KIND").ok()
}
