//! Risk Configuration
//!
//! One aggregate for every tunable of the pipeline. Defaults come from
//! `constants`; `from_env` applies the environment overrides and `load` /
//! `save` round-trip the whole thing as pretty JSON.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::logic::error::RiskResult;
use crate::logic::features::FeatureConfig;
use crate::logic::ingest::{IngestConfig, SourceConfig};
use crate::logic::model::{ModelConfig, ModelKind, ThresholdConfig};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    pub source: SourceConfig,
    pub ingest: IngestConfig,
    pub features: FeatureConfig,
    pub model: ModelConfig,
    pub threshold: ThresholdConfig,
}

impl RiskConfig {
    /// Defaults with environment overrides applied.
    ///
    /// An unknown `RESCUE_MODEL_KIND` is an error rather than a silent fallback.
    pub fn from_env() -> RiskResult<Self> {
        let mut config = Self {
            source: SourceConfig::from_env(),
            threshold: ThresholdConfig::from_env(),
            ..Default::default()
        };
        config.ingest.lookback_hours = constants::get_lookback_hours();

        if let Some(kind) = constants::get_model_kind() {
            config.model.kind = kind.parse::<ModelKind>()?;
        }

        Ok(config)
    }

    /// Save as pretty JSON, creating parent directories
    pub fn save(&self, path: &Path) -> RiskResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_vec_pretty(self)?;
        fs::write(path, json)?;
        log::info!("Saved risk config to {}", path.display());
        Ok(())
    }

    /// Load from JSON; missing fields take their defaults.
    ///
    /// The provider key is not persisted, so it comes from the environment
    /// unless the file sets one explicitly.
    pub fn load(path: &Path) -> RiskResult<Self> {
        let data = fs::read(path)?;
        let mut config: RiskConfig = serde_json::from_slice(&data)?;
        if config.source.api_key.is_none() {
            config.source.api_key = constants::get_bitquery_api_key();
        }
        Ok(config)
    }
}
