//! Scraped metric values
//!
//! A fresh [`MetricsBuilder`] is constructed for every target and only yields
//! a [`FirewallMetrics`] once each field has been set to a value or explicitly
//! marked absent. Nothing here is reused across targets.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

/// Percentage token: at least one digit followed by `%`.
static PERCENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+%").expect("valid regex"));

/// The six metrics a report covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    FirmwareVersion,
    LicenseExpiry,
    Uptime,
    LogDiskPct,
    DataDiskPct,
    HaStatus,
}

impl Metric {
    pub const ALL: [Metric; 6] = [
        Metric::FirmwareVersion,
        Metric::LicenseExpiry,
        Metric::Uptime,
        Metric::LogDiskPct,
        Metric::DataDiskPct,
        Metric::HaStatus,
    ];

    fn slot(self) -> usize {
        match self {
            Metric::FirmwareVersion => 0,
            Metric::LicenseExpiry => 1,
            Metric::Uptime => 2,
            Metric::LogDiskPct => 3,
            Metric::DataDiskPct => 4,
            Metric::HaStatus => 5,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Metric::FirmwareVersion => "firmware_version",
            Metric::LicenseExpiry => "license_expiry",
            Metric::Uptime => "uptime",
            Metric::LogDiskPct => "log_disk_pct",
            Metric::DataDiskPct => "data_disk_pct",
            Metric::HaStatus => "ha_status",
        };
        write!(f, "{name}")
    }
}

/// One scraped scalar: either the value text or an explicit absence.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub enum MetricValue {
    Value(String),
    Absent,
}

impl MetricValue {
    /// Build from an optional scrape result; blank text counts as absent.
    pub fn from_text(text: Option<String>) -> Self {
        match text {
            Some(raw) => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    MetricValue::Absent
                } else {
                    MetricValue::Value(trimmed.to_string())
                }
            }
            None => MetricValue::Absent,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, MetricValue::Absent)
    }

    /// The text written into the report cell.
    pub fn report_text(&self) -> &str {
        match self {
            MetricValue::Value(v) => v,
            MetricValue::Absent => "unknown",
        }
    }
}

/// Extract the first percentage token from a gauge text.
///
/// `"RAM 42%"` yields `42%`; text without a digit-percent substring yields
/// an explicit absence, never an error.
pub fn first_percentage(text: &str) -> MetricValue {
    match PERCENT.find(text) {
        Some(m) => MetricValue::Value(m.as_str().to_string()),
        None => MetricValue::Absent,
    }
}

/// The value half of a `"label: value"` status node, split on the first
/// colon. `None` when the text has no colon at all.
pub fn status_value(text: &str) -> Option<&str> {
    text.split_once(':').map(|(_, value)| value.trim())
}

/// High-availability role as shown in the console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HaStatus {
    Active,
    Passive,
    Standalone,
    Other(String),
}

impl HaStatus {
    /// Normalize the scraped role text. Unrecognized states are preserved
    /// verbatim rather than guessed at.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "active" => HaStatus::Active,
            "passive" | "standby" => HaStatus::Passive,
            "standalone" => HaStatus::Standalone,
            _ => HaStatus::Other(trimmed.to_string()),
        }
    }
}

impl fmt::Display for HaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HaStatus::Active => write!(f, "Active"),
            HaStatus::Passive => write!(f, "Passive"),
            HaStatus::Standalone => write!(f, "Standalone"),
            HaStatus::Other(raw) => write!(f, "{raw}"),
        }
    }
}

/// The complete per-target metric set. Only constructible through
/// [`MetricsBuilder`], so no partially populated value ever reaches a report.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FirewallMetrics {
    pub firmware_version: MetricValue,
    pub license_expiry: MetricValue,
    pub uptime: MetricValue,
    pub log_disk_pct: MetricValue,
    pub data_disk_pct: MetricValue,
    pub ha_status: MetricValue,
}

impl FirewallMetrics {
    pub fn get(&self, metric: Metric) -> &MetricValue {
        match metric {
            Metric::FirmwareVersion => &self.firmware_version,
            Metric::LicenseExpiry => &self.license_expiry,
            Metric::Uptime => &self.uptime,
            Metric::LogDiskPct => &self.log_disk_pct,
            Metric::DataDiskPct => &self.data_disk_pct,
            Metric::HaStatus => &self.ha_status,
        }
    }

    /// The metrics recorded as absent, for the partial-outcome summary.
    pub fn absent_fields(&self) -> Vec<Metric> {
        Metric::ALL
            .into_iter()
            .filter(|m| self.get(*m).is_absent())
            .collect()
    }
}

/// Incremental assembly of one target's metrics.
#[derive(Debug, Default)]
pub struct MetricsBuilder {
    slots: [Option<MetricValue>; 6],
}

impl MetricsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, metric: Metric, value: MetricValue) {
        self.slots[metric.slot()] = Some(value);
    }

    /// Yield the complete metric set, or the list of fields never visited.
    pub fn build(mut self) -> Result<FirewallMetrics, Vec<Metric>> {
        let missing: Vec<Metric> = Metric::ALL
            .into_iter()
            .filter(|m| self.slots[m.slot()].is_none())
            .collect();
        if !missing.is_empty() {
            return Err(missing);
        }

        let mut take = |m: Metric| self.slots[m.slot()].take().expect("checked above");
        Ok(FirewallMetrics {
            firmware_version: take(Metric::FirmwareVersion),
            license_expiry: take(Metric::LicenseExpiry),
            uptime: take(Metric::Uptime),
            log_disk_pct: take(Metric::LogDiskPct),
            data_disk_pct: take(Metric::DataDiskPct),
            ha_status: take(Metric::HaStatus),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_builder() -> MetricsBuilder {
        let mut builder = MetricsBuilder::new();
        for metric in Metric::ALL {
            builder.set(metric, MetricValue::Value("x".into()));
        }
        builder
    }

    #[test]
    fn test_percentage_extraction() {
        assert_eq!(first_percentage("RAM 42%"), MetricValue::Value("42%".into()));
        assert_eq!(
            first_percentage("Log disk: 7% of 120 GB"),
            MetricValue::Value("7%".into())
        );
        assert_eq!(first_percentage("no usage data"), MetricValue::Absent);
        // A bare percent sign carries no number.
        assert_eq!(first_percentage("usage %"), MetricValue::Absent);
    }

    #[test]
    fn test_status_value_splits_on_first_colon() {
        assert_eq!(status_value("HA status: Active"), Some("Active"));
        assert_eq!(status_value("HA: state: odd"), Some("state: odd"));
        assert_eq!(status_value("no colon here"), None);
    }

    #[test]
    fn test_ha_status_normalization() {
        assert_eq!(HaStatus::parse(" ACTIVE "), HaStatus::Active);
        assert_eq!(HaStatus::parse("standby"), HaStatus::Passive);
        assert_eq!(HaStatus::parse("Standalone"), HaStatus::Standalone);
        assert_eq!(
            HaStatus::parse("Cluster node 2"),
            HaStatus::Other("Cluster node 2".into())
        );
        assert_eq!(HaStatus::parse("passive").to_string(), "Passive");
    }

    #[test]
    fn test_metric_value_from_text() {
        assert_eq!(
            MetricValue::from_text(Some(" 18.5.3 ".into())),
            MetricValue::Value("18.5.3".into())
        );
        assert_eq!(MetricValue::from_text(Some("   ".into())), MetricValue::Absent);
        assert_eq!(MetricValue::from_text(None), MetricValue::Absent);
        assert_eq!(MetricValue::Absent.report_text(), "unknown");
    }

    #[test]
    fn test_builder_requires_every_field() {
        let mut builder = MetricsBuilder::new();
        builder.set(Metric::FirmwareVersion, MetricValue::Value("18.5".into()));

        let missing = builder.build().unwrap_err();
        assert_eq!(missing.len(), 5);
        assert!(!missing.contains(&Metric::FirmwareVersion));
    }

    #[test]
    fn test_builder_accepts_explicit_absents() {
        let mut builder = complete_builder();
        builder.set(Metric::LicenseExpiry, MetricValue::Absent);

        let metrics = builder.build().unwrap();
        assert_eq!(metrics.absent_fields(), vec![Metric::LicenseExpiry]);
        assert_eq!(metrics.license_expiry.report_text(), "unknown");
    }

    #[test]
    fn test_complete_builder_has_no_absents() {
        let metrics = complete_builder().build().unwrap();
        assert!(metrics.absent_fields().is_empty());
    }
}
