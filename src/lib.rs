pub mod browser;
pub mod error;
pub mod extract;
pub mod models;
pub mod orchestrator;
pub mod parse;
pub mod scraper;
pub mod selectors;
pub mod settings;
pub mod store;

use std::time::Instant;

use tracing::{info, warn};

use crate::browser::{ChromeLauncher, Launcher};
use crate::error::RunError;
use crate::orchestrator::{Orchestrator, RunState, RunSummary};
use crate::scraper::StudioScraper;
use crate::settings::Settings;
use crate::store::{ClassStore, StoreConfig, SupabaseStore};

pub async fn run() -> Result<RunSummary, RunError> {
    let started = Instant::now();
    let settings = Settings::from_env()?;

    let env_filter = if settings.debug { "debug" } else { "info" };
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let store = connect_store(&settings).await?;
    let summary = sync_studios(&settings, &ChromeLauncher, &store).await;

    info!(
        elapsed_secs = started.elapsed().as_secs_f64(),
        inserted = summary.as_ref().map(RunSummary::inserted).unwrap_or(0),
        "run finished"
    );
    summary
}

async fn connect_store(settings: &Settings) -> Result<SupabaseStore, RunError> {
    let mut store = SupabaseStore::new(StoreConfig {
        url: settings.supabase_url.clone(),
        api_key: settings.supabase_key.clone(),
        table: settings.table.clone(),
        timeout: settings.store_timeout(),
    })?;

    if let (Some(email), Some(password)) = (&settings.supabase_email, &settings.supabase_password) {
        store.sign_in(email, password).await?;
    }

    match store.ping().await {
        Ok(()) => info!(table = %settings.table, "connected to store"),
        Err(err) => warn!(error = %err, "store connectivity check failed"),
    }
    Ok(store)
}

/// Launches a browser on a fresh temporary profile and runs every studio
/// through it.
///
/// The browser and the profile directory are owned by this frame, so both
/// are released on every way out of it: the browser first, then the profile
/// it was writing to.
pub async fn sync_studios<L, S>(
    settings: &Settings,
    launcher: &L,
    store: &S,
) -> Result<RunSummary, RunError>
where
    L: Launcher,
    S: ClassStore,
{
    let profile_dir = tempfile::Builder::new()
        .prefix("class-sync-profile-")
        .tempdir()?;
    let browser = launcher
        .launch(&settings.chrome_options(profile_dir.path()))
        .await?;

    let summary = {
        let scraper = StudioScraper::new(&browser, &settings.selectors, settings.timings())?;
        let orchestrator = Orchestrator::new(
            scraper,
            store,
            &settings.studios,
            &settings.cleanup_studios,
        );
        let mut state = RunState::default();
        orchestrator.run(&mut state).await
    };

    drop(browser);
    if let Err(err) = profile_dir.close() {
        warn!(error = %err, "failed to remove browser profile directory");
    }
    Ok(summary)
}
