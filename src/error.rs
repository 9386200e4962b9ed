use thiserror::Error;

use crate::browser::BrowserError;
use crate::extract::InvalidSelector;
use crate::settings::SettingsError;
use crate::store::StoreError;

/// Failures that end the run before or around scraping. Anything that goes
/// wrong for a single studio is absorbed by the orchestrator instead.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("Store setup failed: {0}")]
    Store(#[from] StoreError),
    #[error("Browser session failed: {0}")]
    Browser(#[from] BrowserError),
    #[error(transparent)]
    Selector(#[from] InvalidSelector),
    #[error("Could not create browser profile directory: {0}")]
    Profile(#[from] std::io::Error),
}
