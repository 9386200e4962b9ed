use serde::{Deserialize, Serialize};

/// Placeholder for any text field that could not be found on the page.
pub const NOT_AVAILABLE: &str = "N/A";

/// Placeholder for a class time that could not be parsed.
pub const ZERO_TIME: &str = "00:00:00";

/// One scraped class session, in the shape of a `danceClassStorage` row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClassRecord {
    #[serde(rename = "classname")]
    pub class_name: String,
    pub instructor: String,
    pub price: String,
    pub time: String,
    #[serde(rename = "length")]
    pub duration: String,
    pub date: String,
    pub studio_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StudioTarget {
    pub studio_name: String,
    pub listing_url: String,
}

impl StudioTarget {
    pub fn new(studio_name: impl Into<String>, listing_url: impl Into<String>) -> Self {
        Self {
            studio_name: studio_name.into(),
            listing_url: listing_url.into(),
        }
    }
}

const LISTING_BASE: &str = "https://www.mindbodyonline.com/explore/locations";

pub fn default_studios() -> Vec<StudioTarget> {
    [
        ("TMILLY", "tmilly-studio"),
        ("MDC", "millennium-dance-complex-studio-city"),
        ("ML", "movement-lifestyle-noho"),
        ("EIGHTYEIGHT", "eighty-eight-studios"),
        ("PLAYGROUND", "the-playground-la"),
        ("THESIX", "the-six-compound"),
    ]
    .into_iter()
    .map(|(name, slug)| StudioTarget::new(name, format!("{LISTING_BASE}/{slug}")))
    .collect()
}

/// Studios whose stored rows are wiped before each run.
pub fn default_cleanup_studios() -> Vec<String> {
    default_studios()
        .into_iter()
        .map(|target| target.studio_name)
        .collect()
}
