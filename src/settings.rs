use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::browser::ChromeOptions;
use crate::models::{StudioTarget, default_cleanup_studios, default_studios};
use crate::scraper::ScrapeTimings;
use crate::selectors::SelectorTable;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("{0} is not set in the environment")]
    Missing(&'static str),
    #[error("Invalid selectors in configuration: {0:?}")]
    InvalidSelectors(Vec<&'static str>),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Settings {
    pub debug: bool,
    #[serde(default)]
    pub supabase_url: String,
    #[serde(default)]
    pub supabase_key: String,
    pub supabase_email: Option<String>,
    pub supabase_password: Option<String>,
    pub table: String,
    pub store_timeout_secs: u64,
    pub chrome_path: Option<PathBuf>,
    pub headless: bool,
    pub window_width: u32,
    pub window_height: u32,
    pub weeks: u32,
    pub wait_timeout_secs: u64,
    pub week_timeout_secs: u64,
    pub consent_timeout_secs: u64,
    pub week_settle_ms: u64,
    #[serde(default)]
    pub selectors: SelectorTable,
    #[serde(default = "default_studios")]
    pub studios: Vec<StudioTarget>,
    #[serde(default = "default_cleanup_studios")]
    pub cleanup_studios: Vec<String>,
}

impl Settings {
    pub fn from_env() -> Result<Self, SettingsError> {
        let _ = dotenvy::dotenv();

        let config = Config::builder()
            .add_source(File::with_name("class-sync").required(false))
            // SUPABASE_URL, SUPABASE_KEY, SUPABASE_EMAIL, SUPABASE_PASSWORD
            .add_source(Environment::with_prefix("SUPABASE").keep_prefix(true))
            // Everything else from environment variables with APP_ prefix
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .set_default("debug", false)?
            .set_default("table", "danceClassStorage")?
            .set_default("store_timeout_secs", 4)?
            .set_default("headless", true)?
            .set_default("window_width", 1920)?
            .set_default("window_height", 1080)?
            .set_default("weeks", 3)?
            .set_default("wait_timeout_secs", 5)?
            .set_default("week_timeout_secs", 10)?
            .set_default("consent_timeout_secs", 5)?
            .set_default("week_settle_ms", 1000)?
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.supabase_url.trim().is_empty() {
            return Err(SettingsError::Missing("SUPABASE_URL"));
        }
        if self.supabase_key.trim().is_empty() {
            return Err(SettingsError::Missing("SUPABASE_KEY"));
        }
        let invalid = self.selectors.invalid_entries();
        if !invalid.is_empty() {
            return Err(SettingsError::InvalidSelectors(invalid));
        }
        Ok(())
    }

    pub fn timings(&self) -> ScrapeTimings {
        ScrapeTimings {
            weeks: self.weeks,
            wait_timeout: Duration::from_secs(self.wait_timeout_secs),
            week_timeout: Duration::from_secs(self.week_timeout_secs),
            consent_timeout: Duration::from_secs(self.consent_timeout_secs),
            week_settle: Duration::from_millis(self.week_settle_ms),
        }
    }

    pub fn chrome_options(&self, profile_dir: &Path) -> ChromeOptions {
        ChromeOptions {
            headless: self.headless,
            window_width: self.window_width,
            window_height: self.window_height,
            profile_dir: profile_dir.to_path_buf(),
            chrome_path: self.chrome_path.clone(),
        }
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout_secs)
    }
}
