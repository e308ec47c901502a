use anyhow::{Context, Result};
use config::{Config, File};
use serde::Deserialize;

use crate::infra_http::DEFAULT_REFRESH_PATH;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub api: Api,
    pub log: Log,
    #[serde(default)]
    pub refresh: Refresh,
    pub store: Store,
}

#[derive(Debug, Deserialize)]
pub struct Api {
    pub base_url: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct Log {
    pub filter: String,
}

#[derive(Debug, Deserialize)]
pub struct Refresh {
    #[serde(default = "default_refresh_path")]
    pub path: String,
    #[serde(default = "default_refresh_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for Refresh {
    fn default() -> Self {
        Self {
            path: default_refresh_path(),
            timeout_ms: default_refresh_timeout_ms(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Store {
    pub backend: String, // "memory", "file" or "redis"
    pub namespace: String,
    pub collection: String,
    pub version: u32,
    pub path: Option<String>,
    pub redis_url: Option<String>,
}

fn default_request_timeout_ms() -> u64 {
    15_000
}

fn default_refresh_path() -> String {
    DEFAULT_REFRESH_PATH.to_string()
}

fn default_refresh_timeout_ms() -> u64 {
    10_000
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);

    let settings: Settings = Config::builder()
        .add_source(File::with_name(path))
        .build()
        .with_context(|| format!("loading settings from {}", path))?
        .try_deserialize()
        .context("parsing settings")?;

    Ok(settings)
}
