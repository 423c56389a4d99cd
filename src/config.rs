use crate::poller::DEFAULT_INTERVAL;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "trackdeck";
const SETTINGS_FILE: &str = "settings.json";
const LOG_FILE: &str = "trackdeck.log";

/// Read-only user settings. Every field has a default so a partial file is fine.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub asset_dir: Option<PathBuf>,
    pub catalog_file: Option<PathBuf>,
    pub seek_step_seconds: f64,
    pub poll_interval_ms: u64,
    pub shuffle_seed: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            asset_dir: None,
            catalog_file: None,
            seek_step_seconds: 10.0,
            poll_interval_ms: u64::try_from(DEFAULT_INTERVAL.as_millis()).unwrap_or(1_000),
            shuffle_seed: None,
        }
    }
}

impl Settings {
    pub fn asset_dir(&self) -> PathBuf {
        self.asset_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

pub fn config_root() -> Result<PathBuf> {
    if let Ok(override_dir) = env::var("TRACKDECK_CONFIG_DIR") {
        return Ok(PathBuf::from(override_dir));
    }

    let home = env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .context("neither HOME nor USERPROFILE is set")?;
    Ok(PathBuf::from(home).join(".config").join(APP_DIR))
}

pub fn settings_path() -> Result<PathBuf> {
    Ok(config_root()?.join(SETTINGS_FILE))
}

pub fn log_path() -> Result<PathBuf> {
    let root = config_root()?;
    fs::create_dir_all(&root).with_context(|| format!("failed to create {}", root.display()))?;
    Ok(root.join(LOG_FILE))
}

pub fn load_settings() -> Result<Settings> {
    load_settings_from(&settings_path()?)
}

pub fn load_settings_from(path: &Path) -> Result<Settings> {
    if !path.exists() {
        return Ok(Settings::default());
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read settings file {}", path.display()))?;
    let settings: Settings = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse settings file {}", path.display()))?;
    anyhow::ensure!(
        settings.seek_step_seconds.is_finite() && settings.seek_step_seconds > 0.0,
        "seek_step_seconds must be positive in {}",
        path.display()
    );
    anyhow::ensure!(
        settings.poll_interval_ms > 0,
        "poll_interval_ms must be positive in {}",
        path.display()
    );
    Ok(settings)
}
