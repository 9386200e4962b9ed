use serde::{Deserialize, Serialize};

/// Every CSS selector the scraper depends on.
///
/// The booking site ships generated class names (`Day_item__1lPxK` and the
/// like) that change whenever it is redeployed, so they are kept here and can
/// be overridden from the `[selectors]` table of `class-sync.toml` without a
/// rebuild. The same strings are used for browser lookups and for parsing
/// page snapshots with `scraper`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SelectorTable {
    pub consent_button: String,
    pub week_container: String,
    pub day_button: String,
    pub day_label: String,
    pub next_week: String,
    pub schedule_list: String,
    pub schedule_entry: String,
    pub date_heading: String,
    pub class_name: String,
    pub instructor: String,
    pub price: String,
    pub time: String,
    pub duration: String,
}

impl Default for SelectorTable {
    fn default() -> Self {
        Self {
            consent_button: "#truste-consent-button".into(),
            week_container: ".columns.is-vcentered.is-mobile".into(),
            day_button: ".Day_item__1lPxK".into(),
            day_label: ".Day_uppercase__A-4T9".into(),
            next_week: ".Arrow_arrow__2dDFC".into(),
            schedule_list: "div.ClassTimeScheduleList_wrapper__Pve3t".into(),
            schedule_entry: "div.ClassTimeScheduleItemDesktop_separator__1vvuL".into(),
            date_heading: "h5.is-marginless:not(.has-text-primary)".into(),
            class_name: "a.ClassTimeScheduleItemDetails_classLink__1tyYz".into(),
            instructor: "a.ClassTimeScheduleItemDetails_link__1gju5".into(),
            price: "p.Price_price__295Er.Price_priceFont__1nZCw".into(),
            time: "h5.has-text-primary.is-marginless".into(),
            duration: "p.ClassTimeScheduleItemDesktop_endTime__26mcG".into(),
        }
    }
}

impl SelectorTable {
    fn entries(&self) -> [(&'static str, &str); 13] {
        [
            ("consent_button", self.consent_button.as_str()),
            ("week_container", self.week_container.as_str()),
            ("day_button", self.day_button.as_str()),
            ("day_label", self.day_label.as_str()),
            ("next_week", self.next_week.as_str()),
            ("schedule_list", self.schedule_list.as_str()),
            ("schedule_entry", self.schedule_entry.as_str()),
            ("date_heading", self.date_heading.as_str()),
            ("class_name", self.class_name.as_str()),
            ("instructor", self.instructor.as_str()),
            ("price", self.price.as_str()),
            ("time", self.time.as_str()),
            ("duration", self.duration.as_str()),
        ]
    }

    /// Names of entries that `scraper` cannot parse as CSS.
    pub fn invalid_entries(&self) -> Vec<&'static str> {
        self.entries()
            .into_iter()
            .filter(|(_, css)| scraper::Selector::parse(css).is_err())
            .map(|(name, _)| name)
            .collect()
    }
}
