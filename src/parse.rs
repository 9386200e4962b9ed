use chrono::{NaiveDate, NaiveTime};
use thiserror::Error;

/// Characters preceding the `"<Weekday>, <Month> <Day>"` part of a day heading.
pub const HEADING_PREFIX_LEN: usize = 11;

const HEADING_DATE_FORMAT: &str = "%A, %B %d, %Y";
const CLASS_TIME_FORMAT: &str = "%I:%M%p";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Unrecognized day heading: {0:?}")]
    DateFormat(String),
    #[error("Unrecognized class time: {0:?}")]
    TimeFormat(String),
}

pub fn parse_heading_date(raw_heading: &str, reference_year: i32) -> Result<NaiveDate, ParseError> {
    let tail: String = raw_heading.trim().chars().skip(HEADING_PREFIX_LEN).collect();
    let candidate = format!("{}, {reference_year}", tail.trim());
    NaiveDate::parse_from_str(&candidate, HEADING_DATE_FORMAT)
        .map_err(|_| ParseError::DateFormat(raw_heading.to_string()))
}

pub fn parse_class_time(raw_time: &str) -> Result<NaiveTime, ParseError> {
    let token = raw_time
        .split_whitespace()
        .next()
        .ok_or_else(|| ParseError::TimeFormat(raw_time.to_string()))?
        .to_lowercase();
    NaiveTime::parse_from_str(&token, CLASS_TIME_FORMAT)
        .map_err(|_| ParseError::TimeFormat(raw_time.to_string()))
}

pub fn clean_duration(raw: &str) -> String {
    raw.chars().filter(|c| !matches!(c, '(' | ')')).collect()
}

pub fn iso_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn iso_time(time: NaiveTime) -> String {
    time.format("%H:%M:%S").to_string()
}
