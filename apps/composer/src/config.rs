use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::render::Style;

/// Application configuration loaded from environment variables.
/// Everything has a default; the suggestion service is disabled when no API
/// key is present.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    /// Directory holding the single persistence slot file.
    pub storage_dir: PathBuf,
    pub default_style: Style,
    pub anthropic_api_key: Option<String>,
    pub suggestion_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            storage_dir: std::env::var("STORAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data")),
            default_style: std::env::var("DEFAULT_STYLE")
                .unwrap_or_else(|_| "professional".to_string())
                .parse::<Style>()
                .context("DEFAULT_STYLE must be 'professional' or 'modern'")?,
            anthropic_api_key: optional_env("ANTHROPIC_API_KEY"),
            suggestion_timeout: Duration::from_secs(
                std::env::var("SUGGESTION_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse::<u64>()
                    .context("SUGGESTION_TIMEOUT_SECS must be a whole number of seconds")?,
            ),
        })
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
