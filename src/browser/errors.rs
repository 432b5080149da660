//! Browser error types

use thiserror::Error;

/// Browser-related errors
#[derive(Error, Debug)]
pub enum BrowserError {
    #[error("No {0} binary found on this system")]
    BinaryNotFound(String),

    #[error("Failed to launch browser: {0}")]
    LaunchFailed(String),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("JavaScript error: {0}")]
    JavaScriptError(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Timed out after {budget_secs}s waiting for {selector}")]
    WaitTimeout { selector: String, budget_secs: u64 },
}
