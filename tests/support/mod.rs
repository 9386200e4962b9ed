#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{Datelike, Local, NaiveDate, Weekday};
use studio_class_sync::browser::{BrowserError, Driver};
use studio_class_sync::models::ClassRecord;
use studio_class_sync::scraper::ScrapeTimings;
use studio_class_sync::selectors::SelectorTable;
use studio_class_sync::store::{ClassStore, StoreError};

/// Timings small enough that a full three-week walk stays well under a second.
pub fn fast_timings() -> ScrapeTimings {
    ScrapeTimings {
        weeks: 3,
        wait_timeout: Duration::from_millis(30),
        week_timeout: Duration::from_millis(30),
        consent_timeout: Duration::from_millis(30),
        week_settle: Duration::ZERO,
    }
}

/// First Monday of the current year, so every fixture date parses against
/// the year the scraper assumes.
pub fn first_monday() -> NaiveDate {
    let year = Local::now().year();
    NaiveDate::from_weekday_of_month_opt(year, 1, Weekday::Mon, 1).expect("valid first monday")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeElement {
    Consent,
    WeekContainer(usize),
    DayButton { week: usize, index: usize },
    DayLabel { week: usize, index: usize },
    Arrow { week: usize, index: usize },
    ScheduleList,
}

#[derive(Debug, Clone)]
pub struct FakeDay {
    pub date: NaiveDate,
    /// (class name, raw time text)
    pub classes: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct FakeButton {
    pub label: Option<String>,
    pub day: Option<FakeDay>,
}

#[derive(Debug, Clone)]
pub struct FakeWeek {
    pub buttons: Vec<FakeButton>,
    pub has_next: bool,
}

/// Seven days starting at `start`, each with `per_day` classes, plus a month
/// separator and an unlabeled control sharing the day button class.
pub fn week_from(start: NaiveDate, per_day: usize) -> FakeWeek {
    let mut buttons = vec![
        FakeButton {
            label: Some(start.format("%b").to_string().to_uppercase()),
            day: None,
        },
        FakeButton {
            label: None,
            day: None,
        },
    ];
    for offset in 0..7 {
        let date = start + chrono::Duration::days(offset);
        let classes = (0..per_day)
            .map(|i| (format!("Class {i}"), format!("{}:30pm PST", i + 5)))
            .collect();
        buttons.push(FakeButton {
            label: Some(date.format("%a").to_string().to_uppercase()),
            day: Some(FakeDay { date, classes }),
        });
    }
    FakeWeek {
        buttons,
        has_next: true,
    }
}

pub fn consecutive_weeks(count: usize, per_day: usize) -> Vec<FakeWeek> {
    let start = first_monday();
    (0..count)
        .map(|w| week_from(start + chrono::Duration::weeks(w as i64), per_day))
        .collect()
}

#[derive(Debug, Default)]
struct SiteState {
    week: usize,
    selected: Option<usize>,
    consent_visible: bool,
    consent_clicks: usize,
    day_clicks: usize,
    visits: Vec<String>,
}

/// In-memory booking calendar answering the scraper's default selectors.
pub struct FakeSite {
    selectors: SelectorTable,
    weeks: Vec<FakeWeek>,
    pub list_never_renders: bool,
    pub unreachable_urls: HashSet<String>,
    state: Mutex<SiteState>,
    closed: Option<Arc<AtomicBool>>,
}

impl FakeSite {
    pub fn new(weeks: Vec<FakeWeek>) -> Self {
        Self {
            selectors: SelectorTable::default(),
            weeks,
            list_never_renders: false,
            unreachable_urls: HashSet::new(),
            state: Mutex::new(SiteState {
                consent_visible: true,
                ..SiteState::default()
            }),
            closed: None,
        }
    }

    /// Raises `flag` when the site is dropped, the way a real browser
    /// process goes away with its session.
    pub fn signal_close(mut self, flag: Arc<AtomicBool>) -> Self {
        self.closed = Some(flag);
        self
    }

    pub fn without_consent_banner(self) -> Self {
        self.state.lock().unwrap().consent_visible = false;
        self
    }

    pub fn consent_clicks(&self) -> usize {
        self.state.lock().unwrap().consent_clicks
    }

    pub fn day_clicks(&self) -> usize {
        self.state.lock().unwrap().day_clicks
    }

    pub fn current_week(&self) -> usize {
        self.state.lock().unwrap().week
    }

    pub fn visits(&self) -> Vec<String> {
        self.state.lock().unwrap().visits.clone()
    }

    fn check_current(&self, week: usize) -> Result<(), BrowserError> {
        if self.state.lock().unwrap().week == week {
            Ok(())
        } else {
            Err(BrowserError::Chrome(format!(
                "stale element: week {week} is no longer shown"
            )))
        }
    }

    fn render_day(day: &FakeDay) -> String {
        let entries: String = day
            .classes
            .iter()
            .map(|(name, time)| {
                format!(
                    r#"<div class="ClassTimeScheduleItemDesktop_separator__1vvuL">
                        <h5 class="has-text-primary is-marginless">{time}</h5>
                        <p class="ClassTimeScheduleItemDesktop_endTime__26mcG">(60 min)</p>
                        <a class="ClassTimeScheduleItemDetails_classLink__1tyYz">{name}</a>
                        <a class="ClassTimeScheduleItemDetails_link__1gju5">Instructor</a>
                        <p class="Price_price__295Er Price_priceFont__1nZCw">$20.00</p>
                    </div>"#
                )
            })
            .collect();
        format!(
            r#"<html><body>
            <h5 class="title is-marginless">Schedule - {}</h5>
            <div class="ClassTimeScheduleList_wrapper__Pve3t">{entries}</div>
            </body></html>"#,
            day.date.format("%A, %B %-d")
        )
    }
}

impl Driver for FakeSite {
    type Element = FakeElement;

    async fn goto(&self, url: &str) -> Result<(), BrowserError> {
        if self.unreachable_urls.contains(url) {
            return Err(BrowserError::Chrome(format!(
                "net::ERR_NAME_NOT_RESOLVED at {url}"
            )));
        }
        let mut state = self.state.lock().unwrap();
        state.visits.push(url.to_string());
        state.week = 0;
        state.selected = None;
        Ok(())
    }

    async fn find(&self, selector: &str) -> Result<Option<FakeElement>, BrowserError> {
        let state = self.state.lock().unwrap();
        let found = if selector == self.selectors.consent_button {
            state.consent_visible.then_some(FakeElement::Consent)
        } else if selector == self.selectors.week_container {
            (state.week < self.weeks.len()).then_some(FakeElement::WeekContainer(state.week))
        } else if selector == self.selectors.schedule_list {
            (state.selected.is_some() && !self.list_never_renders)
                .then_some(FakeElement::ScheduleList)
        } else {
            None
        };
        Ok(found)
    }

    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<FakeElement, BrowserError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(element) = self.find(selector).await? {
                return Ok(element);
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(BrowserError::WaitTimeout {
                    selector: selector.to_string(),
                    timeout,
                });
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    }

    async fn find_in(
        &self,
        parent: &FakeElement,
        selector: &str,
    ) -> Result<Option<FakeElement>, BrowserError> {
        match parent {
            FakeElement::DayButton { week, index } if selector == self.selectors.day_label => {
                self.check_current(*week)?;
                let has_label = self.weeks[*week].buttons[*index].label.is_some();
                Ok(has_label.then_some(FakeElement::DayLabel {
                    week: *week,
                    index: *index,
                }))
            }
            _ => Ok(None),
        }
    }

    async fn find_all_in(
        &self,
        parent: &FakeElement,
        selector: &str,
    ) -> Result<Vec<FakeElement>, BrowserError> {
        let FakeElement::WeekContainer(week) = parent else {
            return Ok(Vec::new());
        };
        self.check_current(*week)?;
        let week_data = &self.weeks[*week];
        if selector == self.selectors.day_button {
            Ok((0..week_data.buttons.len())
                .map(|index| FakeElement::DayButton { week: *week, index })
                .collect())
        } else if selector == self.selectors.next_week && week_data.has_next {
            Ok((0..2)
                .map(|index| FakeElement::Arrow { week: *week, index })
                .collect())
        } else {
            Ok(Vec::new())
        }
    }

    async fn text(&self, element: &FakeElement) -> Result<String, BrowserError> {
        match element {
            FakeElement::DayLabel { week, index } => Ok(self.weeks[*week].buttons[*index]
                .label
                .clone()
                .unwrap_or_default()),
            _ => Ok(String::new()),
        }
    }

    async fn scroll_into_view(&self, element: &FakeElement) -> Result<(), BrowserError> {
        match element {
            FakeElement::DayButton { week, .. } | FakeElement::Arrow { week, .. } => {
                self.check_current(*week)
            }
            _ => Ok(()),
        }
    }

    async fn click(&self, element: &FakeElement) -> Result<(), BrowserError> {
        match element {
            FakeElement::Consent => {
                let mut state = self.state.lock().unwrap();
                state.consent_visible = false;
                state.consent_clicks += 1;
            }
            FakeElement::DayButton { week, index } => {
                self.check_current(*week)?;
                let mut state = self.state.lock().unwrap();
                state.selected = Some(*index);
                state.day_clicks += 1;
            }
            FakeElement::Arrow { week, index } => {
                self.check_current(*week)?;
                let mut state = self.state.lock().unwrap();
                if *index == 1 {
                    state.week += 1;
                } else {
                    state.week = state.week.saturating_sub(1);
                }
                state.selected = None;
            }
            _ => {}
        }
        Ok(())
    }

    async fn page_source(&self) -> Result<String, BrowserError> {
        let state = self.state.lock().unwrap();
        let day = state
            .selected
            .and_then(|index| self.weeks.get(state.week)?.buttons[index].day.as_ref());
        Ok(day
            .map(Self::render_day)
            .unwrap_or_else(|| "<html><body></body></html>".to_string()))
    }
}

impl Drop for FakeSite {
    fn drop(&mut self) {
        if let Some(flag) = &self.closed {
            flag.store(true, Ordering::SeqCst);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Delete(String),
    Insert(String, usize),
}

/// Records every call; deletes for the listed studios fail.
#[derive(Default)]
pub struct FakeStore {
    pub failing_deletes: HashSet<String>,
    pub calls: Mutex<Vec<StoreCall>>,
    pub rows: Mutex<Vec<ClassRecord>>,
}

impl FakeStore {
    pub fn failing_delete_for(studio: &str) -> Self {
        Self {
            failing_deletes: HashSet::from([studio.to_string()]),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn rows_for(&self, studio: &str) -> Vec<ClassRecord> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.studio_name == studio)
            .cloned()
            .collect()
    }
}

impl ClassStore for FakeStore {
    async fn delete_studio(&self, studio: &str) -> Result<(), StoreError> {
        self.calls
            .lock()
            .unwrap()
            .push(StoreCall::Delete(studio.to_string()));
        if self.failing_deletes.contains(studio) {
            return Err(StoreError::Auth(format!("permission denied for {studio}")));
        }
        self.rows.lock().unwrap().retain(|r| r.studio_name != studio);
        Ok(())
    }

    async fn insert_batch(&self, records: &[ClassRecord]) -> Result<(), StoreError> {
        let studio = records
            .first()
            .map(|r| r.studio_name.clone())
            .unwrap_or_default();
        self.calls
            .lock()
            .unwrap()
            .push(StoreCall::Insert(studio, records.len()));
        self.rows.lock().unwrap().extend_from_slice(records);
        Ok(())
    }
}
