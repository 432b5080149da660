//! Metric extraction
//!
//! The five ordered steps that pull operational values out of an
//! authenticated session. Each step is driven by its selector-table entry:
//! navigation that cannot complete is fatal for the target, a missing value
//! element follows the entry's own absent/failure contract.

use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::metrics::{
    first_percentage, status_value, FirewallMetrics, HaStatus, Metric, MetricValue,
    MetricsBuilder,
};
use super::selectors::{self as sel, MissingPolicy};
use super::{ScrapeError, ScrapeStep};
use crate::browser::{BrowserError, BrowserSession};
use crate::targets::Target;

/// Quote a string as a JavaScript literal.
fn js_string(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

/// Run all five extraction steps against an authenticated session and yield
/// the complete metric set for this target.
pub async fn extract_metrics(
    session: &BrowserSession,
    target: &Target,
    wait: Duration,
) -> Result<FirewallMetrics, ScrapeError> {
    let mut builder = MetricsBuilder::new();

    resource_usage(session, target, wait, &mut builder).await?;

    let firmware = label_sibling(
        session,
        target,
        wait,
        &sel::FIRMWARE_VERSION,
        Metric::FirmwareVersion,
        ScrapeStep::FirmwareVersion,
    )
    .await?;
    builder.set(Metric::FirmwareVersion, firmware);

    let uptime = label_sibling(
        session,
        target,
        wait,
        &sel::UPTIME,
        Metric::Uptime,
        ScrapeStep::Uptime,
    )
    .await?;
    builder.set(Metric::Uptime, uptime);

    let license = license_expiry(session, target, wait).await?;
    builder.set(Metric::LicenseExpiry, license);

    let ha = ha_status(session, target, wait).await?;
    builder.set(Metric::HaStatus, ha);

    builder.build().map_err(|missing| ScrapeError::Extraction {
        step: ScrapeStep::HaStatus,
        reason: format!(
            "metric set incomplete after the final step: {}",
            missing
                .iter()
                .map(|m| m.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ),
    })
}

/// Evaluate a text-producing script until it yields something, bounded by
/// `budget`. `None` means the element never appeared; the caller's missing
/// contract decides what that means.
async fn poll_text(
    session: &BrowserSession,
    script: &str,
    budget: Duration,
) -> Result<Option<String>, BrowserError> {
    let deadline = Instant::now() + budget;
    let mut interval = Duration::from_millis(250);

    loop {
        let payload = session.evaluate(script, budget).await?;
        if let Some(text) = payload.as_str() {
            return Ok(Some(text.to_string()));
        }

        if Instant::now() + interval >= deadline {
            return Ok(None);
        }
        tokio::time::sleep(interval).await;
        interval = (interval * 2).min(Duration::from_secs(2));
    }
}

/// Resolve a scraped value against its table entry's missing contract.
fn apply_missing_policy(
    target: &Target,
    step: ScrapeStep,
    metric: Metric,
    value: MetricValue,
    policy: MissingPolicy,
) -> Result<MetricValue, ScrapeError> {
    if value.is_absent() {
        match policy {
            MissingPolicy::Unknown => {
                warn!("{}: {} not found, recording as absent", target.name, metric);
            }
            MissingPolicy::Fatal => {
                return Err(ScrapeError::Extraction {
                    step,
                    reason: format!("{metric} missing from a panel that must provide it"),
                });
            }
        }
    }
    Ok(value)
}

/// Step 1: the dashboard usage gauges.
///
/// The gauge count is validated against the table minimum before any
/// indexing; positions 2 and 3 are log disk and data disk by console
/// convention (see `selectors::RESOURCE_USAGE`).
async fn resource_usage(
    session: &BrowserSession,
    target: &Target,
    wait: Duration,
    builder: &mut MetricsBuilder,
) -> Result<(), ScrapeError> {
    let step = ScrapeStep::ResourceUsage;
    let entry = &sel::RESOURCE_USAGE;
    let nav = |source| ScrapeError::Navigation { step, source };

    session.wait_for_selector(entry.selector, wait).await.map_err(nav)?;

    let script = format!(
        "Array.from(document.querySelectorAll({})).map(el => el.innerText || '')",
        js_string(entry.selector)
    );
    let payload = session.evaluate(&script, wait).await.map_err(nav)?;
    let texts: Vec<String> =
        serde_json::from_value(payload).map_err(|e| ScrapeError::Extraction {
            step,
            reason: format!("unexpected gauge payload: {e}"),
        })?;

    let (log_disk, data_disk) =
        disk_percentages(&texts, entry).map_err(|reason| ScrapeError::Extraction { step, reason })?;

    debug!(
        "{}: log disk {:?}, data disk {:?}",
        target.name, log_disk, data_disk
    );

    let log_disk =
        apply_missing_policy(target, step, Metric::LogDiskPct, log_disk, entry.on_missing)?;
    let data_disk =
        apply_missing_policy(target, step, Metric::DataDiskPct, data_disk, entry.on_missing)?;

    builder.set(Metric::LogDiskPct, log_disk);
    builder.set(Metric::DataDiskPct, data_disk);
    Ok(())
}

/// Pick the disk percentages out of the ordered gauge texts, refusing to
/// index into a collection shorter than the table minimum.
fn disk_percentages(
    texts: &[String],
    entry: &sel::UsageGauges,
) -> Result<(MetricValue, MetricValue), String> {
    if texts.len() < entry.min_count {
        return Err(format!(
            "dashboard shows {} usage gauges, expected at least {}",
            texts.len(),
            entry.min_count
        ));
    }

    Ok((
        first_percentage(&texts[entry.log_disk_index]),
        first_percentage(&texts[entry.data_disk_index]),
    ))
}

/// Steps 2 and 3: a labelled dashboard row whose value sits a fixed number
/// of sibling cells after the label cell.
async fn label_sibling(
    session: &BrowserSession,
    target: &Target,
    wait: Duration,
    entry: &sel::LabelSibling,
    metric: Metric,
    step: ScrapeStep,
) -> Result<MetricValue, ScrapeError> {
    let text = poll_text(session, &label_sibling_js(entry), wait)
        .await
        .map_err(|source| ScrapeError::Navigation { step, source })?;

    debug!("{}: {} = {:?}", target.name, metric, text);
    apply_missing_policy(target, step, metric, MetricValue::from_text(text), entry.on_missing)
}

fn label_sibling_js(entry: &sel::LabelSibling) -> String {
    format!(
        r#"(function() {{
            const cells = Array.from(document.querySelectorAll('td'));
            const label = cells.find(td => (td.innerText || '').includes({label}));
            if (!label) return null;
            let node = label;
            for (let i = 0; i < {offset}; i++) {{
                node = node.nextElementSibling;
                if (!node) return null;
            }}
            return node.innerText;
        }})()"#,
        label = js_string(entry.label),
        offset = entry.sibling_offset,
    )
}

/// Read one element's text, or `null` while it does not exist.
fn text_of_js(selector: &str) -> String {
    format!(
        "(function() {{ const el = document.querySelector({}); return el ? el.innerText : null; }})()",
        js_string(selector)
    )
}

/// Step 4: license expiry, two clicks deep in the management panel.
async fn license_expiry(
    session: &BrowserSession,
    target: &Target,
    wait: Duration,
) -> Result<MetricValue, ScrapeError> {
    let step = ScrapeStep::LicenseExpiry;
    let entry = &sel::LICENSE_EXPIRY;
    let nav = |source| ScrapeError::Navigation { step, source };

    session.click_when_ready(entry.menu, wait).await.map_err(nav)?;
    session.click_when_ready(entry.entry, wait).await.map_err(nav)?;
    session.wait_for_selector(entry.panel_ready, wait).await.map_err(nav)?;

    let text = poll_text(session, &text_of_js(entry.value_cell), wait)
        .await
        .map_err(nav)?;

    debug!("{}: license expiry = {:?}", target.name, text);
    apply_missing_policy(
        target,
        step,
        Metric::LicenseExpiry,
        MetricValue::from_text(text),
        entry.on_missing,
    )
}

/// Step 5: HA role from the high-availability sub-panel.
async fn ha_status(
    session: &BrowserSession,
    target: &Target,
    wait: Duration,
) -> Result<MetricValue, ScrapeError> {
    let step = ScrapeStep::HaStatus;
    let entry = &sel::HA_STATUS;
    let nav = |source| ScrapeError::Navigation { step, source };

    session.click_when_ready(entry.menu, wait).await.map_err(nav)?;
    session.click_when_ready(entry.entry, wait).await.map_err(nav)?;
    session.wait_for_selector(entry.panel_ready, wait).await.map_err(nav)?;

    let text = poll_text(session, &text_of_js(entry.node), wait)
        .await
        .map_err(nav)?;

    let value = match text.as_deref().map(str::trim) {
        None | Some("") => MetricValue::Absent,
        Some(raw) => match status_value(raw) {
            Some(role) => MetricValue::Value(HaStatus::parse(role).to_string()),
            None => {
                return Err(ScrapeError::Extraction {
                    step,
                    reason: format!("malformed status text {raw:?} (expected \"label: value\")"),
                });
            }
        },
    };

    debug!("{}: HA status = {:?}", target.name, value);
    apply_missing_policy(target, step, Metric::HaStatus, value, entry.on_missing)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gauge_texts(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_disk_percentages_use_positions_two_and_three() {
        let texts = gauge_texts(&[
            "CPU 10%",
            "RAM 42%",
            "Log disk: 55% of 60 GB",
            "Data disk: 7% of 120 GB",
        ]);
        let (log, data) = disk_percentages(&texts, &sel::RESOURCE_USAGE).unwrap();

        assert_eq!(log, MetricValue::Value("55%".into()));
        assert_eq!(data, MetricValue::Value("7%".into()));
    }

    #[test]
    fn test_too_few_gauges_is_an_error_not_a_panic() {
        let texts = gauge_texts(&["CPU 10%", "RAM 42%", "Log disk 55%"]);
        let err = disk_percentages(&texts, &sel::RESOURCE_USAGE).unwrap_err();

        assert!(err.contains("3 usage gauges"));
    }

    #[test]
    fn test_gauge_without_percentage_is_absent() {
        let texts = gauge_texts(&["CPU 10%", "RAM 42%", "Log disk n/a", "Data disk 7%"]);
        let (log, data) = disk_percentages(&texts, &sel::RESOURCE_USAGE).unwrap();

        assert_eq!(log, MetricValue::Absent);
        assert_eq!(data, MetricValue::Value("7%".into()));
    }

    #[test]
    fn test_label_sibling_js_quotes_the_label() {
        let entry = sel::LabelSibling {
            label: "Uptime:",
            sibling_offset: 2,
            on_missing: MissingPolicy::Unknown,
        };
        let js = label_sibling_js(&entry);

        assert!(js.contains("\"Uptime:\""));
        assert!(js.contains("i < 2"));
    }

    #[test]
    fn test_text_of_js_embeds_selector_as_literal() {
        let js = text_of_js("table.ha_overview b");
        assert!(js.contains("\"table.ha_overview b\""));
    }
}
