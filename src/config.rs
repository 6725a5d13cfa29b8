//! Crate configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CgpError, Result};
use crate::policy::{TeamDirectory, TimeRules};
use crate::risk::RiskWeights;
use crate::webhook::WebhookConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Directory holding `memory.json`
    pub dir: PathBuf,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(".cgp"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Top-level configuration, loadable from a TOML file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CgpConfig {
    pub memory: MemoryConfig,
    pub risk: RiskWeights,
    pub time: TimeRules,
    pub teams: TeamDirectory,
    pub webhooks: Vec<WebhookConfig>,
    pub logging: LoggingConfig,
}

impl CgpConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: CgpConfig =
            toml::from_str(&contents).map_err(|e| CgpError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.risk.validate()?;
        for webhook in &self.webhooks {
            if webhook.url.is_empty() {
                return Err(CgpError::Config(format!(
                    "webhook {:?} has no url",
                    webhook.name
                )));
            }
        }
        Ok(())
    }
}
