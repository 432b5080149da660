//! Per-target scrape workflow
//!
//! Authenticates a session against one firewall console and runs the five
//! ordered extraction steps against it. Every failure carries the step it
//! happened in; the batch runner decides what a failure means for the rest
//! of the run.

mod extract;
mod login;
mod metrics;
pub mod selectors;

pub use extract::extract_metrics;
pub use login::login;
pub use metrics::{
    first_percentage, status_value, FirewallMetrics, HaStatus, Metric, MetricValue,
    MetricsBuilder,
};

use std::fmt;

use thiserror::Error;

use crate::browser::BrowserError;

/// The ordered steps of a target's scrape, used for failure attribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrapeStep {
    Login,
    ResourceUsage,
    FirmwareVersion,
    Uptime,
    LicenseExpiry,
    HaStatus,
}

impl fmt::Display for ScrapeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScrapeStep::Login => "login",
            ScrapeStep::ResourceUsage => "resource usage",
            ScrapeStep::FirmwareVersion => "firmware version",
            ScrapeStep::Uptime => "uptime",
            ScrapeStep::LicenseExpiry => "license expiry",
            ScrapeStep::HaStatus => "HA status",
        };
        write!(f, "{name}")
    }
}

/// A per-target scrape failure. Both kinds are caught by the batch runner
/// and recorded as that target's outcome; they never abort the batch.
#[derive(Error, Debug)]
pub enum ScrapeError {
    /// An expected UI element never appeared, or the login did not complete.
    #[error("expected UI element unavailable: {source}")]
    Navigation {
        step: ScrapeStep,
        #[source]
        source: BrowserError,
    },

    /// A scraped value did not match its expected shape.
    #[error("{reason}")]
    Extraction { step: ScrapeStep, reason: String },
}

impl ScrapeError {
    /// The step this failure is attributed to.
    pub fn step(&self) -> ScrapeStep {
        match self {
            ScrapeError::Navigation { step, .. } => *step,
            ScrapeError::Extraction { step, .. } => *step,
        }
    }
}
