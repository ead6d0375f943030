use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use assist_core::SchedulerConfig;
use assist_engine::DetectorConfig;
use serde::Deserialize;

/// The optional `--config` file; every section falls back to defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub(crate) struct AppConfig {
    pub detector: DetectorConfig,
    pub scheduler: SchedulerConfig,
}

impl AppConfig {
    pub(crate) fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: AppConfig = ron::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config
            .detector
            .validate()
            .with_context(|| format!("invalid detector settings in {}", path.display()))?;
        Ok(config)
    }
}
