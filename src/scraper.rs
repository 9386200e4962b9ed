use std::collections::HashSet;
use std::time::Duration;

use chrono::{Datelike, Local};
use scraper::Html;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::browser::{BrowserError, Driver, require_in};
use crate::extract::{InvalidSelector, PageSelectors, element_text, extract};
use crate::models::{ClassRecord, NOT_AVAILABLE};
use crate::orchestrator::RunState;
use crate::parse::{iso_date, parse_heading_date};
use crate::selectors::SelectorTable;

const WEEKDAYS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Could not open {url}: {source}")]
    Navigation { url: String, source: BrowserError },
    #[error("Selecting day failed: {0}")]
    DayClick(#[source] BrowserError),
    #[error("Next week control unavailable: {0}")]
    NextWeek(#[source] BrowserError),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScrapeTimings {
    pub weeks: u32,
    pub wait_timeout: Duration,
    pub week_timeout: Duration,
    pub consent_timeout: Duration,
    pub week_settle: Duration,
}

impl Default for ScrapeTimings {
    fn default() -> Self {
        Self {
            weeks: 3,
            wait_timeout: Duration::from_secs(5),
            week_timeout: Duration::from_secs(10),
            consent_timeout: Duration::from_secs(5),
            week_settle: Duration::from_secs(1),
        }
    }
}

/// Normalizes a day button label to `Mon`..`Sun`, or `None` for other controls.
pub fn day_abbreviation(label: &str) -> Option<String> {
    let mut chars = label.trim().chars().take(3);
    let first = chars.next()?;
    let abbr: String = first
        .to_uppercase()
        .chain(chars.flat_map(char::to_lowercase))
        .collect();
    WEEKDAYS.contains(&abbr.as_str()).then_some(abbr)
}

/// Per-studio accumulator that ingests each calendar date at most once.
///
/// Only the first record of a batch is looked at: a day page carries one
/// heading, so every record in a batch shares its date.
#[derive(Debug, Default)]
pub struct DayAccumulator {
    seen_dates: HashSet<String>,
    records: Vec<ClassRecord>,
}

impl DayAccumulator {
    /// Returns false when the batch was empty or its date was already taken.
    pub fn push_batch(&mut self, batch: Vec<ClassRecord>) -> bool {
        let Some(first) = batch.first() else {
            return false;
        };
        if !self.seen_dates.insert(first.date.clone()) {
            return false;
        }
        self.records.extend(batch);
        true
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_records(self) -> Vec<ClassRecord> {
        self.records
    }
}

/// Walks one studio's booking calendar through a browser session.
pub struct StudioScraper<'a, D: Driver> {
    driver: &'a D,
    selectors: &'a SelectorTable,
    page: PageSelectors,
    timings: ScrapeTimings,
}

impl<'a, D: Driver> StudioScraper<'a, D> {
    pub fn new(
        driver: &'a D,
        selectors: &'a SelectorTable,
        timings: ScrapeTimings,
    ) -> Result<Self, InvalidSelector> {
        Ok(Self {
            driver,
            selectors,
            page: PageSelectors::compile(selectors)?,
            timings,
        })
    }

    async fn wait(&self, selector: &str, timeout: Duration) -> Result<D::Element, BrowserError> {
        self.driver.wait_for(selector, timeout).await
    }

    /// Scrapes whichever day the calendar currently shows. Never fails:
    /// anything missing on the page yields an empty list.
    pub async fn scrape_day(&self, studio: &str) -> Vec<ClassRecord> {
        match self
            .wait(&self.selectors.schedule_list, self.timings.wait_timeout)
            .await
        {
            Ok(_) => debug!(studio, "classes loaded"),
            Err(err @ BrowserError::WaitTimeout { .. }) => {
                warn!(studio, error = %err, "timed out waiting for class list");
                return Vec::new();
            }
            Err(err) => {
                warn!(studio, error = %err, "class list not found");
                return Vec::new();
            }
        }

        let html = match self.driver.page_source().await {
            Ok(html) => html,
            Err(err) => {
                warn!(studio, error = %err, "could not read page source");
                return Vec::new();
            }
        };
        self.parse_day_html(&html, studio, Local::now().year())
    }

    pub fn parse_day_html(&self, html: &str, studio: &str, year: i32) -> Vec<ClassRecord> {
        let document = Html::parse_document(html);

        let Some(list) = document.select(&self.page.schedule_list).next() else {
            warn!(studio, "class list missing from page snapshot");
            return Vec::new();
        };

        let entries: Vec<_> = list.select(&self.page.schedule_entry).collect();
        if entries.is_empty() {
            warn!(studio, "no class entries on page");
            return Vec::new();
        }

        let date = match document.select(&self.page.date_heading).next() {
            Some(heading) => {
                let raw = element_text(heading);
                match parse_heading_date(&raw, year) {
                    Ok(date) => iso_date(date),
                    Err(err) => {
                        warn!(studio, error = %err, "day heading not parsed");
                        NOT_AVAILABLE.to_string()
                    }
                }
            }
            None => {
                warn!(studio, "day heading not found");
                NOT_AVAILABLE.to_string()
            }
        };

        entries
            .into_iter()
            .map(|entry| extract(entry, &self.page, studio, &date))
            .collect()
    }

    /// Loads the studio page and collects classes for the configured number
    /// of weeks. Only failing to open the page is an error.
    pub async fn scrape_studio(
        &self,
        state: &mut RunState,
        url: &str,
        studio: &str,
    ) -> Result<Vec<ClassRecord>, ScrapeError> {
        info!(studio, url, "scraping studio");
        self.driver
            .goto(url)
            .await
            .map_err(|source| ScrapeError::Navigation {
                url: url.to_string(),
                source,
            })?;

        if !state.consent_handled {
            self.dismiss_consent().await;
            state.consent_handled = true;
        }

        let mut classes = DayAccumulator::default();

        for week in 1..=self.timings.weeks {
            debug!(studio, week, "starting week");
            let container = match self
                .wait(&self.selectors.week_container, self.timings.week_timeout)
                .await
            {
                Ok(container) => container,
                Err(err) => {
                    warn!(studio, week, error = %err, "week container not found");
                    continue;
                }
            };

            let buttons = self.day_buttons(&container, week).await;
            for (day_idx, button) in buttons.iter().enumerate() {
                match self.open_day(button, studio).await {
                    Ok(batch) if batch.is_empty() => {
                        debug!(studio, week, day_idx, "no classes for day");
                    }
                    Ok(batch) => {
                        let date = batch[0].date.clone();
                        let count = batch.len();
                        if classes.push_batch(batch) {
                            debug!(studio, %date, count, "added classes");
                        } else {
                            debug!(studio, %date, "skipping duplicate date");
                        }
                    }
                    Err(err) => warn!(studio, week, day_idx, error = %err, "day skipped"),
                }
            }

            if let Err(err) = self.advance_week(&container).await {
                warn!(studio, week, error = %err, "stopping week navigation");
                break;
            }
            debug!(studio, week, "moved to next week");
            tokio::time::sleep(self.timings.week_settle).await;
        }

        info!(studio, count = classes.len(), "studio scrape finished");
        Ok(classes.into_records())
    }

    async fn dismiss_consent(&self) {
        match self
            .wait(&self.selectors.consent_button, self.timings.consent_timeout)
            .await
        {
            Ok(button) => match self.driver.click(&button).await {
                Ok(()) => debug!("consent button clicked"),
                Err(err) => warn!(error = %err, "consent button click failed"),
            },
            Err(err) => debug!(error = %err, "consent button not found"),
        }
    }

    async fn day_buttons(&self, container: &D::Element, week: u32) -> Vec<D::Element> {
        let candidates = match self
            .driver
            .find_all_in(container, &self.selectors.day_button)
            .await
        {
            Ok(candidates) => candidates,
            Err(err) => {
                warn!(week, error = %err, "day buttons not readable");
                return Vec::new();
            }
        };

        let mut days = Vec::new();
        for (idx, button) in candidates.into_iter().enumerate() {
            match self.button_label(&button).await {
                Ok(label) => match day_abbreviation(&label) {
                    Some(day) => {
                        debug!(week, idx, %day, "valid day button");
                        days.push(button);
                    }
                    None => debug!(week, idx, %label, "ignoring non-day button"),
                },
                Err(err) => debug!(week, idx, error = %err, "ignoring button without day label"),
            }
        }
        debug!(week, count = days.len(), "day buttons found");
        days
    }

    async fn button_label(&self, button: &D::Element) -> Result<String, BrowserError> {
        let label = require_in(self.driver, button, &self.selectors.day_label).await?;
        self.driver.text(&label).await
    }

    async fn select_day(&self, button: &D::Element) -> Result<(), BrowserError> {
        self.driver.scroll_into_view(button).await?;
        self.driver.click(button).await?;
        self.wait(&self.selectors.schedule_list, self.timings.wait_timeout)
            .await?;
        Ok(())
    }

    async fn open_day(
        &self,
        button: &D::Element,
        studio: &str,
    ) -> Result<Vec<ClassRecord>, ScrapeError> {
        self.select_day(button).await.map_err(ScrapeError::DayClick)?;
        Ok(self.scrape_day(studio).await)
    }

    async fn advance_week(&self, container: &D::Element) -> Result<(), ScrapeError> {
        let arrows = self
            .driver
            .find_all_in(container, &self.selectors.next_week)
            .await
            .map_err(ScrapeError::NextWeek)?;
        // The forward arrow is the last one in the week strip.
        let next = arrows.last().ok_or_else(|| {
            ScrapeError::NextWeek(BrowserError::ElementNotFound(
                self.selectors.next_week.clone(),
            ))
        })?;
        self.driver
            .scroll_into_view(next)
            .await
            .map_err(ScrapeError::NextWeek)?;
        self.driver
            .click(next)
            .await
            .map_err(ScrapeError::NextWeek)
    }
}
