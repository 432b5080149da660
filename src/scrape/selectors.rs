//! Selector table for the firewall console UI
//!
//! The console's layout is an unstable external schema, not an API: every
//! structural assumption the scraper makes lives here, versioned, so a UI
//! change is a table revision rather than a code change. Each entry carries
//! its own contract for what a missing element means.

/// Console layout revision these selectors were validated against.
pub const UI_SCHEMA_VERSION: &str = "webadmin-2022.1";

/// What a missing value element means for the entry that names it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingPolicy {
    /// Record the metric as absent and continue with the target.
    Unknown,
    /// Abort this target's extraction.
    Fatal,
}

/// The login form and the marker that proves the login completed.
pub struct LoginForm {
    pub username: &'static str,
    pub password: &'static str,
    pub submit: &'static str,
    /// Dashboard element that only renders for an authenticated session.
    pub ready: &'static str,
}

/// The dashboard usage gauges, read as one ordered collection.
pub struct UsageGauges {
    pub selector: &'static str,
    /// Gauges the dashboard must show before indexing into them is allowed.
    pub min_count: usize,
    pub log_disk_index: usize,
    pub data_disk_index: usize,
    /// Contract for a gauge text with no percentage token in it.
    pub on_missing: MissingPolicy,
}

/// A `label … value` dashboard row: the value sits a fixed number of
/// sibling cells after the cell whose text contains the label.
pub struct LabelSibling {
    pub label: &'static str,
    pub sibling_offset: usize,
    pub on_missing: MissingPolicy,
}

/// A value read from a sub-panel reached by two clicks: open the menu, open
/// the panel entry, wait for the panel marker, read one cell.
pub struct PanelValue {
    pub menu: &'static str,
    pub entry: &'static str,
    pub panel_ready: &'static str,
    pub value_cell: &'static str,
    pub on_missing: MissingPolicy,
}

/// A `label: value` status node inside a click-reachable sub-panel.
pub struct StatusText {
    pub menu: &'static str,
    pub entry: &'static str,
    pub panel_ready: &'static str,
    pub node: &'static str,
    pub on_missing: MissingPolicy,
}

pub const LOGIN: LoginForm = LoginForm {
    username: "#login_username",
    password: "#login_password",
    submit: "#login_button",
    ready: ".dashboard_usage_bar_txt",
};

/// Gauge order by console convention: CPU, RAM, log disk, data disk.
pub const RESOURCE_USAGE: UsageGauges = UsageGauges {
    selector: ".dashboard_usage_bar_txt",
    min_count: 4,
    log_disk_index: 2,
    data_disk_index: 3,
    on_missing: MissingPolicy::Unknown,
};

pub const FIRMWARE_VERSION: LabelSibling = LabelSibling {
    label: "Firmware version:",
    sibling_offset: 2,
    on_missing: MissingPolicy::Unknown,
};

pub const UPTIME: LabelSibling = LabelSibling {
    label: "Uptime:",
    sibling_offset: 2,
    on_missing: MissingPolicy::Unknown,
};

/// Network Protection expiry inside Management > Licensing.
pub const LICENSE_EXPIRY: PanelValue = PanelValue {
    menu: "ul.main_menu > li:nth-child(2) > div",
    entry: "ul.main_menu > li:nth-child(2) > ul > li:nth-child(3) > div",
    panel_ready: "table.license_list",
    value_cell: "table.license_list tr:nth-child(3) td:nth-child(3)",
    on_missing: MissingPolicy::Unknown,
};

/// High-availability overview inside Management > High Availability.
pub const HA_STATUS: StatusText = StatusText {
    menu: "ul.main_menu > li:nth-child(2) > div",
    entry: "ul.main_menu > li:nth-child(2) > ul > li:nth-child(12) > div",
    panel_ready: "table.ha_overview",
    node: "table.ha_overview b",
    on_missing: MissingPolicy::Unknown,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gauge_indices_fit_the_minimum_count() {
        assert!(RESOURCE_USAGE.log_disk_index < RESOURCE_USAGE.min_count);
        assert!(RESOURCE_USAGE.data_disk_index < RESOURCE_USAGE.min_count);
    }

    #[test]
    fn test_login_ready_marker_matches_dashboard_gauges() {
        // The post-login ready check and step 1 must agree on what a loaded
        // dashboard looks like.
        assert_eq!(LOGIN.ready, RESOURCE_USAGE.selector);
    }

    #[test]
    fn test_schema_is_versioned() {
        assert!(!UI_SCHEMA_VERSION.is_empty());
    }
}
