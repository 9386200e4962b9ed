pub mod chrome;

use std::fmt::Debug;
use std::time::Duration;

use thiserror::Error;

pub use chrome::{ChromeElement, ChromeLauncher, ChromeOptions, ChromeSession};

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("No element matches {0:?}")]
    ElementNotFound(String),
    #[error("Timed out after {timeout:?} waiting for {selector:?}")]
    WaitTimeout { selector: String, timeout: Duration },
    #[error("Browser launch failed: {0}")]
    Launch(String),
    #[error("Chrome error: {0}")]
    Chrome(String),
}

/// The slice of browser automation the scraper needs.
///
/// Lookups take CSS selectors. `find*` report a missing element as `None` or
/// an empty list; anything else the browser refuses is an `Err`.
#[allow(async_fn_in_trait)]
pub trait Driver {
    type Element: Clone + Debug;

    async fn goto(&self, url: &str) -> Result<(), BrowserError>;

    async fn find(&self, selector: &str) -> Result<Option<Self::Element>, BrowserError>;

    /// Waits until `selector` is present, failing with
    /// [`BrowserError::WaitTimeout`] once `timeout` has passed.
    async fn wait_for(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<Self::Element, BrowserError>;

    async fn find_in(
        &self,
        parent: &Self::Element,
        selector: &str,
    ) -> Result<Option<Self::Element>, BrowserError>;

    async fn find_all_in(
        &self,
        parent: &Self::Element,
        selector: &str,
    ) -> Result<Vec<Self::Element>, BrowserError>;

    async fn text(&self, element: &Self::Element) -> Result<String, BrowserError>;

    /// Moves the pointer onto the element and clicks there.
    async fn click(&self, element: &Self::Element) -> Result<(), BrowserError>;

    async fn scroll_into_view(&self, element: &Self::Element) -> Result<(), BrowserError>;

    async fn page_source(&self) -> Result<String, BrowserError>;
}

/// Starts a browser for one run. Dropping the returned driver shuts the
/// browser down.
#[allow(async_fn_in_trait)]
pub trait Launcher {
    type Driver: Driver;

    async fn launch(&self, options: &ChromeOptions) -> Result<Self::Driver, BrowserError>;
}

/// Finds a required child, turning absence into [`BrowserError::ElementNotFound`].
pub async fn require_in<D: Driver>(
    driver: &D,
    parent: &D::Element,
    selector: &str,
) -> Result<D::Element, BrowserError> {
    driver
        .find_in(parent, selector)
        .await?
        .ok_or_else(|| BrowserError::ElementNotFound(selector.to_string()))
}
