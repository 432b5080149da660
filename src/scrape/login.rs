//! Login flow
//!
//! Authenticates the session against one target. Completion is verified by
//! waiting for the dashboard ready marker; a login page that never shows the
//! form, or a dashboard that never renders, is a navigation failure for this
//! target only.

use std::time::Duration;

use tracing::{debug, info};

use super::selectors::LOGIN;
use super::{ScrapeError, ScrapeStep};
use crate::browser::BrowserSession;
use crate::targets::Target;

pub async fn login(
    session: &BrowserSession,
    target: &Target,
    wait: Duration,
) -> Result<(), ScrapeError> {
    let nav = |source| ScrapeError::Navigation {
        step: ScrapeStep::Login,
        source,
    };

    info!("{}: logging in at {}", target.name, target.url);

    session
        .navigate(target.url.as_str(), wait)
        .await
        .map_err(nav)?;

    session.wait_for_selector(LOGIN.username, wait).await.map_err(nav)?;

    session
        .type_text(LOGIN.username, &target.username)
        .await
        .map_err(nav)?;
    session
        .type_text(LOGIN.password, &target.password)
        .await
        .map_err(nav)?;
    session.click(LOGIN.submit).await.map_err(nav)?;

    // A bad credential or a hung console surfaces here, not in a later
    // extraction step.
    session.wait_for_selector(LOGIN.ready, wait).await.map_err(nav)?;

    debug!("{}: authenticated", target.name);
    Ok(())
}
