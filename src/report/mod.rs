//! Spreadsheet report rendering
//!
//! Fills the pre-formatted template with one target's metrics and persists
//! it. The template's internal structure is opaque; only the documented cell
//! coordinates are written.

use std::path::PathBuf;

use chrono::Local;
use thiserror::Error;
use tracing::{info, warn};
use umya_spreadsheet::{reader, writer};

use crate::scrape::{FirewallMetrics, Metric};
use crate::targets::Target;

/// Timestamp suffix of report filenames, second resolution.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// One-to-one field-to-cell map of the report template.
pub const CELL_MAP: [(Metric, &str); 6] = [
    (Metric::FirmwareVersion, "H2"),
    (Metric::LicenseExpiry, "H4"),
    (Metric::HaStatus, "H5"),
    (Metric::Uptime, "H6"),
    (Metric::LogDiskPct, "H7"),
    (Metric::DataDiskPct, "H8"),
];

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Could not load template {path}: {detail}")]
    Template { path: PathBuf, detail: String },

    #[error("Could not persist report for {target}: {detail}")]
    Persist { target: String, detail: String },
}

/// Renders per-target reports from one template.
pub struct ReportBuilder {
    template: PathBuf,
    fallback_dir: PathBuf,
}

impl ReportBuilder {
    pub fn new(template: impl Into<PathBuf>) -> Self {
        Self {
            template: template.into(),
            fallback_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Directory used when the target's own directory is not writable.
    /// Defaults to the current working directory.
    pub fn with_fallback_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.fallback_dir = dir.into();
        self
    }

    /// `{target_name}-{timestamp}.xlsx`
    pub fn file_name(target_name: &str) -> String {
        format!(
            "{}-{}.xlsx",
            target_name,
            Local::now().format(TIMESTAMP_FORMAT)
        )
    }

    /// Fill the template with `metrics` and persist it to the target's
    /// output directory, falling back once to the working directory.
    pub fn render(
        &self,
        target: &Target,
        metrics: &FirewallMetrics,
    ) -> Result<PathBuf, ReportError> {
        let mut book = reader::xlsx::read(&self.template).map_err(|e| ReportError::Template {
            path: self.template.clone(),
            detail: format!("{e:?}"),
        })?;

        let sheet = book.get_sheet_mut(&0).ok_or_else(|| ReportError::Template {
            path: self.template.clone(),
            detail: "template has no worksheets".to_string(),
        })?;

        for (metric, cell) in CELL_MAP {
            sheet
                .get_cell_mut(cell)
                .set_value(metrics.get(metric).report_text());
        }

        let file_name = Self::file_name(&target.name);
        let primary = target.output_dir.join(&file_name);

        match writer::xlsx::write(&book, &primary) {
            Ok(()) => {
                info!("{}: report written to {}", target.name, primary.display());
                Ok(primary)
            }
            Err(e) => {
                warn!(
                    "{}: could not write {} ({e:?}), retrying in {}",
                    target.name,
                    primary.display(),
                    self.fallback_dir.display()
                );

                let fallback = self.fallback_dir.join(&file_name);
                writer::xlsx::write(&book, &fallback).map_err(|e2| ReportError::Persist {
                    target: target.name.clone(),
                    detail: format!(
                        "{} ({e:?}); fallback {} ({e2:?})",
                        primary.display(),
                        fallback.display()
                    ),
                })?;

                info!("{}: report written to {}", target.name, fallback.display());
                Ok(fallback)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrape::{MetricValue, MetricsBuilder};
    use std::path::Path;

    fn write_template(dir: &Path) -> PathBuf {
        let book = umya_spreadsheet::new_file();
        let path = dir.join("template.xlsx");
        writer::xlsx::write(&book, &path).unwrap();
        path
    }

    fn target_into(dir: &Path) -> Target {
        Target {
            name: "fw1".to_string(),
            url: url::Url::parse("https://10.0.0.1").unwrap(),
            username: "admin".to_string(),
            password: "secret1".to_string(),
            output_dir: dir.to_path_buf(),
        }
    }

    fn sample_metrics() -> FirewallMetrics {
        let mut builder = MetricsBuilder::new();
        builder.set(Metric::FirmwareVersion, MetricValue::Value("18.5.3".into()));
        builder.set(Metric::LicenseExpiry, MetricValue::Value("2026-12-31".into()));
        builder.set(Metric::Uptime, MetricValue::Value("42 days".into()));
        builder.set(Metric::LogDiskPct, MetricValue::Value("55%".into()));
        builder.set(Metric::DataDiskPct, MetricValue::Value("7%".into()));
        builder.set(Metric::HaStatus, MetricValue::Value("Active".into()));
        builder.build().unwrap()
    }

    #[test]
    fn test_render_fills_every_mapped_cell() {
        let dir = tempfile::tempdir().unwrap();
        let template = write_template(dir.path());
        let target = target_into(dir.path());

        let path = ReportBuilder::new(&template)
            .render(&target, &sample_metrics())
            .unwrap();

        assert!(path.file_name().unwrap().to_str().unwrap().starts_with("fw1-"));
        assert!(path.exists());

        let book = reader::xlsx::read(&path).unwrap();
        let sheet = book.get_sheet(&0).unwrap();
        assert_eq!(sheet.get_value("H2"), "18.5.3");
        assert_eq!(sheet.get_value("H4"), "2026-12-31");
        assert_eq!(sheet.get_value("H5"), "Active");
        assert_eq!(sheet.get_value("H6"), "42 days");
        assert_eq!(sheet.get_value("H7"), "55%");
        assert_eq!(sheet.get_value("H8"), "7%");
    }

    #[test]
    fn test_absent_metrics_render_as_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let template = write_template(dir.path());
        let target = target_into(dir.path());

        let mut builder = MetricsBuilder::new();
        for metric in Metric::ALL {
            builder.set(metric, MetricValue::Absent);
        }
        let metrics = builder.build().unwrap();

        let path = ReportBuilder::new(&template).render(&target, &metrics).unwrap();
        let book = reader::xlsx::read(&path).unwrap();
        let sheet = book.get_sheet(&0).unwrap();

        for (_, cell) in CELL_MAP {
            assert_eq!(sheet.get_value(cell), "unknown");
        }
    }

    #[test]
    fn test_unwritable_directory_falls_back_once() {
        let dir = tempfile::tempdir().unwrap();
        let fallback = tempfile::tempdir().unwrap();
        let template = write_template(dir.path());

        // A directory that does not exist makes the first write fail.
        let mut target = target_into(dir.path());
        target.output_dir = dir.path().join("missing").join("deeper");

        let path = ReportBuilder::new(&template)
            .with_fallback_dir(fallback.path())
            .render(&target, &sample_metrics())
            .unwrap();

        assert!(path.starts_with(fallback.path()));
        assert!(path.exists());
    }

    #[test]
    fn test_persist_failure_names_the_target() {
        let dir = tempfile::tempdir().unwrap();
        let template = write_template(dir.path());

        let mut target = target_into(dir.path());
        target.output_dir = dir.path().join("missing").join("deeper");

        let err = ReportBuilder::new(&template)
            .with_fallback_dir(dir.path().join("also").join("missing"))
            .render(&target, &sample_metrics())
            .unwrap_err();

        match err {
            ReportError::Persist { target, .. } => assert_eq!(target, "fw1"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_distinct_names_never_collide() {
        assert_ne!(
            ReportBuilder::file_name("fw1"),
            ReportBuilder::file_name("fw2")
        );
    }

    #[test]
    fn test_missing_template_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let target = target_into(dir.path());

        let err = ReportBuilder::new(dir.path().join("absent.xlsx"))
            .render(&target, &sample_metrics())
            .unwrap_err();

        assert!(matches!(err, ReportError::Template { .. }));
    }
}
