use std::ffi::OsStr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use headless_chrome::browser::tab::NoElementFound;
use headless_chrome::util::Timeout;
use headless_chrome::{Browser, Element, LaunchOptions, Tab};
use tracing::debug;

use super::{BrowserError, Driver, Launcher};

/// Chrome otherwise shuts itself down after 30 seconds without CDP traffic,
/// which a slow studio page can exceed.
const IDLE_BROWSER_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChromeOptions {
    pub headless: bool,
    pub window_width: u32,
    pub window_height: u32,
    pub profile_dir: PathBuf,
    /// Chrome binary; located on the system when unset.
    pub chrome_path: Option<PathBuf>,
}

impl ChromeOptions {
    pub fn launch_options(&self) -> Result<LaunchOptions<'static>, BrowserError> {
        LaunchOptions::default_builder()
            .headless(self.headless)
            .sandbox(false)
            .window_size(Some((self.window_width, self.window_height)))
            .user_data_dir(Some(self.profile_dir.clone()))
            .path(self.chrome_path.clone())
            .idle_browser_timeout(IDLE_BROWSER_TIMEOUT)
            .args(vec![
                OsStr::new("--disable-dev-shm-usage"),
                OsStr::new("--log-level=3"),
            ])
            .build()
            .map_err(|err| BrowserError::Launch(err.to_string()))
    }
}

/// Owned handle to a DOM node of the session's tab.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChromeElement {
    node_id: u32,
}

impl From<&Element<'_>> for ChromeElement {
    fn from(element: &Element<'_>) -> Self {
        Self {
            node_id: element.node_id,
        }
    }
}

/// A Chrome process with the one tab the scraper drives.
///
/// The process is killed when the session is dropped, so the browser goes
/// away on every exit path, panics included.
pub struct ChromeSession {
    _browser: Browser,
    tab: Arc<Tab>,
}

impl ChromeSession {
    /// Runs blocking CDP calls against the tab off the async workers.
    async fn on_tab<T, F>(&self, call: F) -> Result<T, BrowserError>
    where
        T: Send + 'static,
        F: FnOnce(&Tab) -> Result<T, BrowserError> + Send + 'static,
    {
        let tab = Arc::clone(&self.tab);
        tokio::task::spawn_blocking(move || call(&tab))
            .await
            .map_err(|err| BrowserError::Chrome(format!("browser task failed: {err}")))?
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        debug!("closing browser");
    }
}

fn chrome_error(err: anyhow::Error) -> BrowserError {
    BrowserError::Chrome(format!("{err:#}"))
}

fn is_not_found(err: &anyhow::Error) -> bool {
    err.downcast_ref::<NoElementFound>().is_some()
}

fn node<'t>(tab: &'t Tab, element: &ChromeElement) -> Result<Element<'t>, BrowserError> {
    Element::new(tab, element.node_id).map_err(chrome_error)
}

fn optional(
    found: anyhow::Result<Element<'_>>,
) -> Result<Option<ChromeElement>, BrowserError> {
    match found {
        Ok(element) => Ok(Some(ChromeElement::from(&element))),
        Err(err) if is_not_found(&err) => Ok(None),
        Err(err) => Err(chrome_error(err)),
    }
}

impl Driver for ChromeSession {
    type Element = ChromeElement;

    async fn goto(&self, url: &str) -> Result<(), BrowserError> {
        let url = url.to_string();
        self.on_tab(move |tab| {
            tab.navigate_to(&url).map_err(chrome_error)?;
            Ok(())
        })
        .await
    }

    async fn find(&self, selector: &str) -> Result<Option<ChromeElement>, BrowserError> {
        let selector = selector.to_string();
        self.on_tab(move |tab| optional(tab.find_element(&selector)))
            .await
    }

    async fn wait_for(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<ChromeElement, BrowserError> {
        let selector = selector.to_string();
        self.on_tab(move |tab| {
            match tab.wait_for_element_with_custom_timeout(&selector, timeout) {
                Ok(element) => Ok(ChromeElement::from(&element)),
                Err(err) if err.downcast_ref::<Timeout>().is_some() || is_not_found(&err) => {
                    Err(BrowserError::WaitTimeout { selector, timeout })
                }
                Err(err) => Err(chrome_error(err)),
            }
        })
        .await
    }

    async fn find_in(
        &self,
        parent: &ChromeElement,
        selector: &str,
    ) -> Result<Option<ChromeElement>, BrowserError> {
        let (parent, selector) = (parent.clone(), selector.to_string());
        self.on_tab(move |tab| optional(node(tab, &parent)?.find_element(&selector)))
            .await
    }

    async fn find_all_in(
        &self,
        parent: &ChromeElement,
        selector: &str,
    ) -> Result<Vec<ChromeElement>, BrowserError> {
        let (parent, selector) = (parent.clone(), selector.to_string());
        self.on_tab(move |tab| match node(tab, &parent)?.find_elements(&selector) {
            Ok(found) => Ok(found.iter().map(ChromeElement::from).collect()),
            Err(err) if is_not_found(&err) => Ok(Vec::new()),
            Err(err) => Err(chrome_error(err)),
        })
        .await
    }

    async fn text(&self, element: &ChromeElement) -> Result<String, BrowserError> {
        let element = element.clone();
        self.on_tab(move |tab| node(tab, &element)?.get_inner_text().map_err(chrome_error))
            .await
    }

    async fn click(&self, element: &ChromeElement) -> Result<(), BrowserError> {
        let element = element.clone();
        self.on_tab(move |tab| {
            node(tab, &element)?.click().map_err(chrome_error)?;
            Ok(())
        })
        .await
    }

    async fn scroll_into_view(&self, element: &ChromeElement) -> Result<(), BrowserError> {
        let element = element.clone();
        self.on_tab(move |tab| {
            node(tab, &element)?
                .scroll_into_view()
                .map_err(chrome_error)?;
            Ok(())
        })
        .await
    }

    async fn page_source(&self) -> Result<String, BrowserError> {
        self.on_tab(|tab| tab.get_content().map_err(chrome_error))
            .await
    }
}

/// Launches a local Chrome through `headless_chrome`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ChromeLauncher;

impl Launcher for ChromeLauncher {
    type Driver = ChromeSession;

    async fn launch(&self, options: &ChromeOptions) -> Result<ChromeSession, BrowserError> {
        let launch_options = options.launch_options()?;
        let session = tokio::task::spawn_blocking(move || -> Result<_, BrowserError> {
            let browser =
                Browser::new(launch_options).map_err(|err| BrowserError::Launch(format!("{err:#}")))?;
            let tab = browser.new_tab().map_err(chrome_error)?;
            Ok(ChromeSession {
                _browser: browser,
                tab,
            })
        })
        .await
        .map_err(|err| BrowserError::Launch(format!("browser task failed: {err}")))??;
        debug!(headless = options.headless, "browser started");
        Ok(session)
    }
}
