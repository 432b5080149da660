//! Batch pipeline
//!
//! Drives the whole run: load the target list, launch the one browser
//! session, scrape each target through it in order, and aggregate every
//! per-target outcome into a summary. A failing target never aborts the
//! batch; the session is released exactly once at the end.

use std::path::PathBuf;

use thiserror::Error;
use tracing::{error, info, warn};

use crate::browser::{BrowserError, BrowserSession};
use crate::report::ReportBuilder;
use crate::scrape::{extract_metrics, login, Metric};
use crate::targets::{load_targets, LoadError, Target};
use crate::RunConfig;

/// What happened to one target.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase", tag = "result")]
pub enum TargetOutcome {
    /// Report written with every metric populated.
    Success { report: PathBuf },
    /// Report written, but some metrics were recorded as absent.
    Partial { report: PathBuf, missing: Vec<Metric> },
    /// No report; the step the target failed at and why.
    Failed { step: String, error: String },
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetReport {
    pub target: String,
    pub outcome: TargetOutcome,
}

/// Aggregated per-target outcomes of one run.
#[derive(Debug, Default, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub reports: Vec<TargetReport>,
}

impl BatchSummary {
    pub fn succeeded(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| matches!(r.outcome, TargetOutcome::Success { .. }))
            .count()
    }

    pub fn partial(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| matches!(r.outcome, TargetOutcome::Partial { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| matches!(r.outcome, TargetOutcome::Failed { .. }))
            .count()
    }
}

/// Errors that stop the run before the first target is scraped. Per-target
/// failures never surface here; they live in the summary.
#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("Template {0} not found")]
    TemplateMissing(PathBuf),

    #[error(transparent)]
    Browser(#[from] BrowserError),
}

/// Run the full batch described by `config`.
pub async fn run_batch(config: &RunConfig) -> Result<BatchSummary, RunError> {
    // The template is a hard requirement; fail before a browser ever starts.
    if !config.template.is_file() {
        return Err(RunError::TemplateMissing(config.template.clone()));
    }

    let targets = load_targets(&config.target_list, config.out_dir.as_deref())?;
    let reporter = ReportBuilder::new(&config.template);

    let session = BrowserSession::launch(config).await?;

    let mut reports = Vec::with_capacity(targets.len());
    for target in &targets {
        info!("Working on {}", target.name);

        let outcome = scrape_target(&session, &reporter, target, config).await;
        match &outcome {
            TargetOutcome::Success { report } => {
                info!("{}: done ({})", target.name, report.display());
            }
            TargetOutcome::Partial { report, missing } => {
                warn!(
                    "{}: done with {} metric(s) absent ({})",
                    target.name,
                    missing.len(),
                    report.display()
                );
            }
            TargetOutcome::Failed { step, error } => {
                error!("{}: failed at {}: {}", target.name, step, error);
            }
        }

        reports.push(TargetReport {
            target: target.name.clone(),
            outcome,
        });
    }

    // Release the session exactly once, whatever happened per target.
    if let Err(e) = session.close().await {
        warn!("Browser session did not close cleanly: {}", e);
    }

    let summary = BatchSummary { reports };
    info!(
        "Batch finished: {} ok, {} partial, {} failed",
        summary.succeeded(),
        summary.partial(),
        summary.failed()
    );
    Ok(summary)
}

/// Scrape one target and capture whatever happens as its outcome.
async fn scrape_target(
    session: &BrowserSession,
    reporter: &ReportBuilder,
    target: &Target,
    config: &RunConfig,
) -> TargetOutcome {
    let wait = config.wait();

    if let Err(e) = login(session, target, wait).await {
        return TargetOutcome::Failed {
            step: e.step().to_string(),
            error: e.to_string(),
        };
    }

    let metrics = match extract_metrics(session, target, wait).await {
        Ok(metrics) => metrics,
        Err(e) => {
            return TargetOutcome::Failed {
                step: e.step().to_string(),
                error: e.to_string(),
            };
        }
    };

    match reporter.render(target, &metrics) {
        Ok(report) => {
            let missing = metrics.absent_fields();
            if missing.is_empty() {
                TargetOutcome::Success { report }
            } else {
                TargetOutcome::Partial { report, missing }
            }
        }
        Err(e) => TargetOutcome::Failed {
            step: "report".to_string(),
            error: e.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> BatchSummary {
        BatchSummary {
            reports: vec![
                TargetReport {
                    target: "fw1".into(),
                    outcome: TargetOutcome::Success {
                        report: PathBuf::from("fw1-x.xlsx"),
                    },
                },
                TargetReport {
                    target: "fw2".into(),
                    outcome: TargetOutcome::Failed {
                        step: "login".into(),
                        error: "expected UI element unavailable".into(),
                    },
                },
                TargetReport {
                    target: "fw3".into(),
                    outcome: TargetOutcome::Partial {
                        report: PathBuf::from("fw3-x.xlsx"),
                        missing: vec![Metric::LicenseExpiry],
                    },
                },
            ],
        }
    }

    #[test]
    fn test_summary_counts() {
        let summary = summary();
        assert_eq!(summary.succeeded(), 1);
        assert_eq!(summary.partial(), 1);
        assert_eq!(summary.failed(), 1);
    }

    #[test]
    fn test_failed_outcome_keeps_step_attribution() {
        let summary = summary();
        match &summary.reports[1].outcome {
            TargetOutcome::Failed { step, .. } => assert_eq!(step, "login"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
