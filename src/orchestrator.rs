use tracing::{error, info, warn};

use crate::browser::Driver;
use crate::models::{ClassRecord, StudioTarget};
use crate::scraper::StudioScraper;
use crate::store::{ClassStore, StoreError};

/// State carried from one studio scrape to the next within a run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunState {
    /// The cookie banner is only offered once per browser session.
    pub consent_handled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StudioOutcome {
    Inserted(usize),
    Empty,
    Failed(String),
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub cleanup_failures: Vec<String>,
    pub studios: Vec<(String, StudioOutcome)>,
}

impl RunSummary {
    pub fn outcome(&self, studio: &str) -> Option<&StudioOutcome> {
        self.studios
            .iter()
            .find(|(name, _)| name == studio)
            .map(|(_, outcome)| outcome)
    }

    pub fn inserted(&self) -> usize {
        self.studios
            .iter()
            .map(|(_, outcome)| match outcome {
                StudioOutcome::Inserted(count) => *count,
                _ => 0,
            })
            .sum()
    }
}

pub struct Orchestrator<'a, D: Driver, S: ClassStore> {
    scraper: StudioScraper<'a, D>,
    store: &'a S,
    studios: &'a [StudioTarget],
    cleanup_studios: &'a [String],
}

impl<'a, D: Driver, S: ClassStore> Orchestrator<'a, D, S> {
    pub fn new(
        scraper: StudioScraper<'a, D>,
        store: &'a S,
        studios: &'a [StudioTarget],
        cleanup_studios: &'a [String],
    ) -> Self {
        Self {
            scraper,
            store,
            studios,
            cleanup_studios,
        }
    }

    /// Clears every known studio, then scrapes and republishes each target in
    /// order. Failures are logged per studio and never abort the run.
    pub async fn run(&self, state: &mut RunState) -> RunSummary {
        let mut summary = RunSummary::default();

        for studio in self.cleanup_studios {
            match self.store.delete_studio(studio).await {
                Ok(()) => info!(%studio, "cleared stored classes"),
                Err(err) => {
                    error!(%studio, error = %err, "failed to clear stored classes");
                    summary.cleanup_failures.push(studio.clone());
                }
            }
        }

        for target in self.studios {
            let outcome = self.process(state, target).await;
            summary.studios.push((target.studio_name.clone(), outcome));
        }

        info!(
            studios = summary.studios.len(),
            inserted = summary.inserted(),
            "all studios processed"
        );
        summary
    }

    async fn process(&self, state: &mut RunState, target: &StudioTarget) -> StudioOutcome {
        let studio = target.studio_name.as_str();
        if !self.cleanup_studios.iter().any(|known| known == studio) {
            // Not cleared up front; the replace below still drops its old rows.
            warn!(studio, "studio is not in the cleanup set");
        }

        let classes = match self
            .scraper
            .scrape_studio(state, &target.listing_url, studio)
            .await
        {
            Ok(classes) => classes,
            Err(err) => {
                error!(studio, error = %err, "scraping studio failed");
                return StudioOutcome::Failed(err.to_string());
            }
        };

        info!(studio, count = classes.len(), "inserting classes");
        if classes.is_empty() {
            return StudioOutcome::Empty;
        }

        match self.replace(studio, &classes).await {
            Ok(()) => {
                info!(studio, count = classes.len(), "inserted class data");
                StudioOutcome::Inserted(classes.len())
            }
            Err(err) => {
                error!(studio, error = %err, "storing classes failed");
                StudioOutcome::Failed(err.to_string())
            }
        }
    }

    /// Replace-all publish: drop the studio's rows, then insert the batch.
    /// The two calls are not atomic.
    async fn replace(&self, studio: &str, classes: &[ClassRecord]) -> Result<(), StoreError> {
        self.store.delete_studio(studio).await?;
        self.store.insert_batch(classes).await
    }
}
