//! fwscribe
//!
//! Batch scraper for firewall administration web consoles. Logs into each
//! device through a single browser-automation session, pulls a fixed set of
//! operational metrics from the dashboard and management panels, and writes
//! one spreadsheet report per device from a template.

pub mod browser;
pub mod report;
pub mod runner;
pub mod scrape;
pub mod targets;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Browsers the session driver can speak CDP to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserKind {
    Chrome,
    Chromium,
    Edge,
}

impl FromStr for BrowserKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chrome" => Ok(BrowserKind::Chrome),
            "chromium" => Ok(BrowserKind::Chromium),
            "edge" => Ok(BrowserKind::Edge),
            other => Err(format!(
                "unknown browser {other:?} (expected chrome, chromium or edge)"
            )),
        }
    }
}

impl fmt::Display for BrowserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrowserKind::Chrome => write!(f, "chrome"),
            BrowserKind::Chromium => write!(f, "chromium"),
            BrowserKind::Edge => write!(f, "edge"),
        }
    }
}

/// Run configuration, constructed once from parsed CLI flags and passed by
/// reference into every component that needs it.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunConfig {
    /// Which browser binary to drive.
    pub browser: BrowserKind,
    /// Path to the CSV target list.
    pub target_list: PathBuf,
    /// Global output-directory override; wins over per-row directories.
    pub out_dir: Option<PathBuf>,
    /// Upper bound, in seconds, on every per-step condition wait.
    pub wait_secs: u64,
    /// Run the browser without a visible window.
    pub headless: bool,
    /// Spreadsheet template the reports are rendered from.
    pub template: PathBuf,
}

impl RunConfig {
    /// The per-step wait budget as a [`Duration`].
    pub fn wait(&self) -> Duration {
        Duration::from_secs(self.wait_secs)
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            browser: BrowserKind::Chrome,
            target_list: PathBuf::from("targets.csv"),
            out_dir: None,
            wait_secs: 10,
            headless: true,
            template: PathBuf::from("report-template.xlsx"),
        }
    }
}

/// Get log directory path (shared across modules)
pub fn log_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("fwscribe").join("logs"))
}

/// Initialize logging: console layer plus a daily-rolling file layer when a
/// log directory is available.
pub fn init_logging() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::INFO.into());

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false);

    if let Some(log_dir) = log_dir() {
        let _ = std::fs::create_dir_all(&log_dir);
        let file_appender = tracing_appender::rolling::daily(&log_dir, "fwscribe.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_target(true)
            .with_writer(non_blocking);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .with(file_layer)
            .init();

        Some(guard)
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .init();

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_browser_kind_parses_case_insensitively() {
        assert_eq!("Chrome".parse::<BrowserKind>(), Ok(BrowserKind::Chrome));
        assert_eq!("CHROMIUM".parse::<BrowserKind>(), Ok(BrowserKind::Chromium));
        assert_eq!("edge".parse::<BrowserKind>(), Ok(BrowserKind::Edge));
        assert!("firefox".parse::<BrowserKind>().is_err());
    }

    #[test]
    fn test_run_config_defaults() {
        let config = RunConfig::default();
        assert_eq!(config.wait_secs, 10);
        assert!(config.headless);
        assert_eq!(config.wait(), Duration::from_secs(10));
    }
}
