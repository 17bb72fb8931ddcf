use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerAppConfig {
    #[serde(default)]
    pub server: ServerAppSettings,
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub extract: ExtractSettings,
    #[serde(default)]
    pub log: LogSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerAppSettings {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Request body limit for uploads and searches.
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: usize,
}

impl Default for ServerAppSettings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_upload_mb: default_max_upload_mb(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:5055".into()
}

fn default_max_upload_mb() -> usize { 512 }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl StoreSettings {
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        // A zero interval would make tokio::time::interval panic.
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            retention_secs: default_retention_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

fn default_retention_secs() -> u64 { 3600 }
fn default_sweep_interval_secs() -> u64 { 300 }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractSettings {
    /// Legacy .doc converter executable. `None` uses the platform default.
    #[serde(default)]
    pub converter: Option<String>,
    #[serde(default = "default_converter_timeout_secs")]
    pub converter_timeout_secs: u64,
    /// Characters of context kept on each side of a PDF match.
    #[serde(default = "default_preview_context_chars")]
    pub preview_context_chars: usize,
}

impl ExtractSettings {
    pub fn converter_timeout(&self) -> Duration {
        Duration::from_secs(self.converter_timeout_secs)
    }
}

impl Default for ExtractSettings {
    fn default() -> Self {
        Self {
            converter: None,
            converter_timeout_secs: default_converter_timeout_secs(),
            preview_context_chars: default_preview_context_chars(),
        }
    }
}

fn default_converter_timeout_secs() -> u64 { 60 }
fn default_preview_context_chars() -> usize { 50 }

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogSettings {
    /// Regexes matched against `"{target}: {message}"`; matching events are dropped.
    #[serde(default)]
    pub ignore: Vec<String>,
}

/// Parse a TOML config, warning about keys that are not part of the schema.
pub fn parse_config(text: &str) -> Result<ServerAppConfig> {
    let de = toml::Deserializer::new(text);
    let mut unknown = Vec::new();
    let config: ServerAppConfig = serde_ignored::deserialize(de, |path| {
        unknown.push(path.to_string());
    })
    .context("parsing server config")?;
    for key in unknown {
        tracing::warn!("unknown config key ignored: {key}");
    }
    Ok(config)
}

/// Load the config from `path`, falling back to defaults when the file does not exist.
pub fn load_config(path: &Path) -> Result<ServerAppConfig> {
    if !path.exists() {
        tracing::info!("no config at {}, using defaults", path.display());
        return Ok(ServerAppConfig::default());
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config: {}", path.display()))?;
    parse_config(&text)
}
