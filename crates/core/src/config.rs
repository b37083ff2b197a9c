//! Application configuration handling.
//!
//! Settings are layered: built-in defaults, then an optional TOML file under
//! the user's config directory, then `MEMHUB_`-prefixed environment
//! variables. A commented default file is written on first run so users have
//! something to edit.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use ::config::{Config, Environment, File};

/// Directory and file name under `dirs::config_dir()`.
pub const CONFIG_DIR: &str = "memhub";
/// File name of the user configuration.
pub const CONFIG_FILE: &str = "config.toml";

const DEFAULT_BACKEND_URL: &str = "http://localhost:8080";
const DEFAULT_REQUEST_TIMEOUT_SECS: i64 = 10;
const DEFAULT_TICK_INTERVAL_MS: i64 = 100;
const DEFAULT_FLIP_BACK_DELAY_MS: i64 = 1000;
const DEFAULT_PREVIEW_SECONDS: i64 = 5;

const DEFAULT_CONFIG_TEMPLATE: &str = r#"# MemHub configuration.
# Values here override the built-in defaults; MEMHUB_* environment
# variables override both (e.g. MEMHUB_BACKEND_URL).

# Base URL of the MemoryHub backend.
backend_url = "http://localhost:8080"

# Timeout for backend requests, in seconds.
request_timeout_secs = 10

# Game clock sampling interval, in milliseconds.
tick_interval_ms = 100

# How long a mismatched pair stays face up, in milliseconds.
flip_back_delay_ms = 1000

# Length of the pre-game deck preview, in seconds.
preview_seconds = 5
"#;

/// Runtime configuration shared by the frontend and the core services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Base URL of the backend collaborator.
    pub backend_url: String,
    /// Timeout applied to every backend request.
    pub request_timeout_secs: u64,
    /// Game clock sampling interval.
    pub tick_interval_ms: u64,
    /// Delay before a mismatched pair flips back face down.
    pub flip_back_delay_ms: u64,
    /// Duration of the pre-game preview.
    pub preview_seconds: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS as u64,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS as u64,
            flip_back_delay_ms: DEFAULT_FLIP_BACK_DELAY_MS as u64,
            preview_seconds: DEFAULT_PREVIEW_SECONDS as u64,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default file location plus environment.
    pub fn load() -> Result<Self> {
        Self::load_from(Some(&config_path()))
    }

    /// Load configuration, optionally merging the given file when present.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("backend_url", DEFAULT_BACKEND_URL)?
            .set_default("request_timeout_secs", DEFAULT_REQUEST_TIMEOUT_SECS)?
            .set_default("tick_interval_ms", DEFAULT_TICK_INTERVAL_MS)?
            .set_default("flip_back_delay_ms", DEFAULT_FLIP_BACK_DELAY_MS)?
            .set_default("preview_seconds", DEFAULT_PREVIEW_SECONDS)?;

        if let Some(path) = path.filter(|path| path.exists()) {
            builder = builder.add_source(File::from(path.to_path_buf()));
        }

        builder = builder.add_source(Environment::with_prefix("MEMHUB"));

        let config = builder
            .build()
            .context("failed to assemble configuration")?
            .try_deserialize()
            .context("invalid configuration values")?;
        Ok(config)
    }

    /// Sampling interval of the game clock.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// How long a mismatched pair stays visible.
    pub fn flip_back_delay(&self) -> Duration {
        Duration::from_millis(self.flip_back_delay_ms)
    }

    /// Timeout for backend requests.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Length of the pre-game preview.
    pub fn preview_duration(&self) -> Duration {
        Duration::from_secs(self.preview_seconds)
    }
}

/// Path of the user configuration file.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR)
        .join(CONFIG_FILE)
}

/// Write the commented default configuration if no file exists yet.
pub fn ensure_default_config() -> Result<()> {
    ensure_default_config_at(&config_path())
}

fn ensure_default_config_at(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, DEFAULT_CONFIG_TEMPLATE)
        .with_context(|| format!("failed to write {}", path.display()))
}
