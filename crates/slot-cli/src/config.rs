//! CLI settings: a JSON file plus environment overrides.

use anyhow::{Context, Result};
use chrono_tz::Tz;
use serde::Deserialize;
use slot_engine::EngineConfig;

/// Environment variable that overrides the configured timezone.
pub const TIMEZONE_ENV: &str = "SLOTS_TIMEZONE";

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CliConfig {
    /// IANA timezone used to decide what "today" is.
    pub timezone: String,
    pub engine: EngineConfig,
}

impl Default for CliConfig {
    fn default() -> Self {
        CliConfig {
            timezone: "UTC".to_string(),
            engine: EngineConfig::default(),
        }
    }
}

impl CliConfig {
    /// Read `path` if given, then apply environment overrides.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config: {}", path))?;
                serde_json::from_str(&raw)
                    .with_context(|| format!("Invalid config file: {}", path))?
            }
            None => CliConfig::default(),
        };
        if let Ok(tz) = std::env::var(TIMEZONE_ENV) {
            config.timezone = tz;
        }
        Ok(config)
    }

    pub fn timezone(&self) -> Result<Tz> {
        self.timezone
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid timezone: '{}'", self.timezone))
    }
}
