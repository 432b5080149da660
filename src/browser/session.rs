//! Browser session management
//!
//! Launches and controls the single browser instance a batch run drives.
//! One session spans the whole run; targets are scraped through it one at
//! a time.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tracing::{debug, info, warn};

use super::BrowserError;
use crate::{BrowserKind, RunConfig};

/// Smallest poll interval of a condition wait.
const POLL_FLOOR: Duration = Duration::from_millis(250);
/// Largest poll interval a condition wait backs off to.
const POLL_CEIL: Duration = Duration::from_secs(2);

/// Find a CDP-capable executable for the requested browser.
fn find_binary(kind: BrowserKind) -> Option<PathBuf> {
    let candidates: Vec<PathBuf> = if cfg!(target_os = "windows") {
        let program_files = [
            std::env::var("ProgramFiles").unwrap_or_else(|_| r"C:\Program Files".into()),
            std::env::var("ProgramFiles(x86)")
                .unwrap_or_else(|_| r"C:\Program Files (x86)".into()),
        ];
        let suffix = match kind {
            BrowserKind::Chrome => r"Google\Chrome\Application\chrome.exe",
            BrowserKind::Chromium => r"Chromium\Application\chrome.exe",
            BrowserKind::Edge => r"Microsoft\Edge\Application\msedge.exe",
        };
        program_files
            .iter()
            .map(|base| PathBuf::from(format!(r"{base}\{suffix}")))
            .collect()
    } else if cfg!(target_os = "macos") {
        match kind {
            BrowserKind::Chrome => vec![PathBuf::from(
                "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            )],
            BrowserKind::Chromium => {
                vec![PathBuf::from("/Applications/Chromium.app/Contents/MacOS/Chromium")]
            }
            BrowserKind::Edge => vec![PathBuf::from(
                "/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
            )],
        }
    } else {
        match kind {
            BrowserKind::Chrome => vec![
                PathBuf::from("/usr/bin/google-chrome"),
                PathBuf::from("/usr/bin/google-chrome-stable"),
            ],
            BrowserKind::Chromium => vec![
                PathBuf::from("/usr/bin/chromium"),
                PathBuf::from("/usr/bin/chromium-browser"),
            ],
            BrowserKind::Edge => vec![
                PathBuf::from("/usr/bin/microsoft-edge"),
                PathBuf::from("/usr/bin/microsoft-edge-stable"),
            ],
        }
    };

    candidates.into_iter().find(|p| p.exists())
}

/// The one browser-automation session a batch run owns.
///
/// Wraps the browser process, its active page and the spawned task that
/// drains CDP events.
pub struct BrowserSession {
    browser: Browser,
    page: Page,
    handler_handle: tokio::task::JoinHandle<()>,
}

impl BrowserSession {
    /// Launch the configured browser and take its initial page.
    pub async fn launch(config: &RunConfig) -> Result<Self, BrowserError> {
        let binary = find_binary(config.browser)
            .ok_or_else(|| BrowserError::BinaryNotFound(config.browser.to_string()))?;

        info!(
            "Launching {} from {} (headless: {})",
            config.browser,
            binary.display(),
            config.headless
        );

        let mut builder = BrowserConfig::builder()
            .chrome_executable(binary)
            .window_size(1440, 900)
            .args(vec![
                "--no-first-run",
                "--no-default-browser-check",
                "--disable-notifications",
                // Firewall consoles serve self-signed certificates.
                "--ignore-certificate-errors",
                // Required when running as root (e.g. in a container).
                "--no-sandbox",
            ]);

        if !config.headless {
            builder = builder.with_head();
        }

        let browser_config = builder
            .build()
            .map_err(BrowserError::LaunchFailed)?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;

        // The handler stream must be drained for the browser to function.
        // When it ends, the browser has disconnected.
        let handler_handle = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                debug!("browser event: {:?}", event);
            }
            warn!("Browser disconnected (event handler ended)");
        });

        // The browser opens with one blank tab; reuse it and drop any extras.
        let page = {
            let mut pages = browser
                .pages()
                .await
                .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;

            let main_page = if pages.is_empty() {
                browser
                    .new_page("about:blank")
                    .await
                    .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?
            } else {
                pages.remove(0)
            };

            for extra in pages {
                debug!("Closing extra blank tab");
                let _ = extra.close().await;
            }

            main_page
        };

        info!("Browser session ready");

        Ok(Self {
            browser,
            page,
            handler_handle,
        })
    }

    /// Navigate to a URL and let the load settle, bounded by `budget`.
    pub async fn navigate(&self, url: &str, budget: Duration) -> Result<(), BrowserError> {
        debug!("Navigating to {}", url);

        self.page
            .goto(url)
            .await
            .map_err(|e| BrowserError::NavigationFailed(format!("{url}: {e}")))?;

        match tokio::time::timeout(budget, self.page.wait_for_navigation()).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(BrowserError::NavigationFailed(format!("{url}: {e}"))),
            // A slow load is not fatal by itself; the next condition wait
            // decides whether the page is usable.
            Err(_) => {
                debug!("{} still loading after {:?}, continuing", url, budget);
                Ok(())
            }
        }
    }

    /// Poll until `selector` exists, backing off between probes.
    ///
    /// Succeeds as soon as the element appears; a budget exhausted without a
    /// match is reported as [`BrowserError::WaitTimeout`], distinct from the
    /// immediate [`BrowserError::ElementNotFound`] of the direct lookups.
    pub async fn wait_for_selector(
        &self,
        selector: &str,
        budget: Duration,
    ) -> Result<(), BrowserError> {
        let deadline = Instant::now() + budget;
        let mut interval = POLL_FLOOR;

        loop {
            if self.page.find_element(selector).await.is_ok() {
                return Ok(());
            }

            if Instant::now() + interval >= deadline {
                return Err(BrowserError::WaitTimeout {
                    selector: selector.to_string(),
                    budget_secs: budget.as_secs(),
                });
            }

            tokio::time::sleep(interval).await;
            interval = (interval * 2).min(POLL_CEIL);
        }
    }

    /// Click the element matching `selector`.
    pub async fn click(&self, selector: &str) -> Result<(), BrowserError> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|e| BrowserError::ElementNotFound(format!("{selector}: {e}")))?;

        element
            .click()
            .await
            .map_err(|e| BrowserError::JavaScriptError(e.to_string()))?;

        Ok(())
    }

    /// Wait for `selector` to appear, then click it.
    pub async fn click_when_ready(
        &self,
        selector: &str,
        budget: Duration,
    ) -> Result<(), BrowserError> {
        self.wait_for_selector(selector, budget).await?;
        self.click(selector).await
    }

    /// Focus the element matching `selector` and type `text` into it.
    pub async fn type_text(&self, selector: &str, text: &str) -> Result<(), BrowserError> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|e| BrowserError::ElementNotFound(format!("{selector}: {e}")))?;

        element
            .click()
            .await
            .map_err(|e| BrowserError::JavaScriptError(e.to_string()))?;

        element
            .type_str(text)
            .await
            .map_err(|e| BrowserError::JavaScriptError(e.to_string()))?;

        Ok(())
    }

    /// Execute JavaScript on the page, bounded by `budget`.
    pub async fn evaluate(
        &self,
        script: &str,
        budget: Duration,
    ) -> Result<serde_json::Value, BrowserError> {
        let result = tokio::time::timeout(budget, self.page.evaluate(script))
            .await
            .map_err(|_| {
                BrowserError::JavaScriptError(format!(
                    "evaluation timed out after {}s",
                    budget.as_secs()
                ))
            })?
            .map_err(|e| BrowserError::JavaScriptError(e.to_string()))?;

        result
            .into_value()
            .map_err(|e| BrowserError::JavaScriptError(e.to_string()))
    }

    /// Close the session: page first, then a graceful browser shutdown.
    pub async fn close(mut self) -> Result<(), BrowserError> {
        let _ = self.page.close().await;

        if let Err(e) = self.browser.close().await {
            warn!("Graceful browser close failed: {}", e);
        }
        let _ = self.browser.wait().await;

        self.handler_handle.abort();

        info!("Browser session closed");
        Ok(())
    }
}
