use scraper::{ElementRef, Node, Selector};
use thiserror::Error;

use crate::models::{ClassRecord, NOT_AVAILABLE, ZERO_TIME};
use crate::parse::{clean_duration, iso_time, parse_class_time};
use crate::selectors::SelectorTable;

#[derive(Debug, Error)]
#[error("Invalid CSS selector for {name}: {css:?}")]
pub struct InvalidSelector {
    pub name: &'static str,
    pub css: String,
}

/// The snapshot-side half of the selector table, compiled for `scraper`.
#[derive(Debug, Clone)]
pub struct PageSelectors {
    pub schedule_list: Selector,
    pub schedule_entry: Selector,
    pub date_heading: Selector,
    class_name: Selector,
    instructor: Selector,
    price: Selector,
    time: Selector,
    duration: Selector,
}

fn compile(name: &'static str, css: &str) -> Result<Selector, InvalidSelector> {
    Selector::parse(css).map_err(|_| InvalidSelector {
        name,
        css: css.to_string(),
    })
}

impl PageSelectors {
    pub fn compile(table: &SelectorTable) -> Result<Self, InvalidSelector> {
        Ok(Self {
            schedule_list: compile("schedule_list", &table.schedule_list)?,
            schedule_entry: compile("schedule_entry", &table.schedule_entry)?,
            date_heading: compile("date_heading", &table.date_heading)?,
            class_name: compile("class_name", &table.class_name)?,
            instructor: compile("instructor", &table.instructor)?,
            price: compile("price", &table.price)?,
            time: compile("time", &table.time)?,
            duration: compile("duration", &table.duration)?,
        })
    }
}

const BLOCK_TAGS: [&str; 14] = [
    "address", "article", "div", "dd", "dl", "dt", "footer", "h1", "h2", "h3", "h4", "h5", "li",
    "p",
];

/// Rendered text of an element, as a browser reports it: whitespace inside a
/// line is collapsed, `<br>` and block children start new lines.
pub fn element_text(element: ElementRef<'_>) -> String {
    let mut raw = String::new();
    push_rendered(element, &mut raw);
    raw.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn push_rendered(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            // Source line breaks render as plain spaces.
            Node::Text(text) => {
                out.extend(text.chars().map(|c| if c.is_whitespace() { ' ' } else { c }));
            }
            Node::Element(el) if el.name() == "br" => out.push('\n'),
            Node::Element(el) => {
                let Some(child) = ElementRef::wrap(child) else {
                    continue;
                };
                let block = BLOCK_TAGS.contains(&el.name());
                if block {
                    out.push('\n');
                }
                push_rendered(child, out);
                if block {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}

fn sub_text(node: ElementRef<'_>, selector: &Selector) -> Option<String> {
    node.select(selector).next().map(element_text)
}

/// Builds a record from one schedule entry. Missing pieces become sentinels.
pub fn extract(
    node: ElementRef<'_>,
    selectors: &PageSelectors,
    studio: &str,
    date: &str,
) -> ClassRecord {
    let or_na = |value: Option<String>| value.unwrap_or_else(|| NOT_AVAILABLE.to_string());

    let time = match sub_text(node, &selectors.time) {
        Some(raw) => match parse_class_time(&raw) {
            Ok(time) => iso_time(time),
            Err(err) => {
                tracing::debug!(error = %err, "class time fell back to midnight");
                ZERO_TIME.to_string()
            }
        },
        None => ZERO_TIME.to_string(),
    };

    ClassRecord {
        class_name: or_na(sub_text(node, &selectors.class_name)),
        instructor: or_na(sub_text(node, &selectors.instructor)),
        price: or_na(sub_text(node, &selectors.price)),
        time,
        duration: or_na(sub_text(node, &selectors.duration).map(|raw| clean_duration(&raw))),
        date: date.to_string(),
        studio_name: studio.to_string(),
    }
}
