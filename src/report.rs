//! Response bodies.
//!
//! Each report is built fresh per request and stamped while it is being
//! built, in UTC.

use std::collections::BTreeMap;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::probe::Dependencies;

/// Machine name used in health and error reports.
pub const SERVICE_ID: &str = "thakii-pdf-engine";
/// Human name used in the info report.
pub const SERVICE_NAME: &str = "Thakii PDF Engine";
pub const SERVICE_DESCRIPTION: &str = "Video-to-PDF conversion service";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Current UTC time as RFC 3339 with microseconds and a `Z` suffix.
pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportCheck {
    Ok,
}

#[derive(Debug, Clone, Serialize)]
pub struct Checks {
    pub application_import: ImportCheck,
    pub dependencies: Dependencies,
}

/// Body of a `200` from `/health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub service: &'static str,
    pub timestamp: String,
    pub version: &'static str,
    pub uptime: String,
    pub checks: Checks,
}

impl HealthReport {
    pub fn healthy(uptime: String, dependencies: Dependencies) -> Self {
        Self {
            status: HealthStatus::Healthy,
            service: SERVICE_ID,
            timestamp: timestamp(),
            version: VERSION,
            uptime,
            checks: Checks { application_import: ImportCheck::Ok, dependencies },
        }
    }
}

/// Body of a `503` from `/health`.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorReport {
    pub status: HealthStatus,
    pub service: &'static str,
    pub timestamp: String,
    pub error: String,
}

impl ErrorReport {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Unhealthy,
            service: SERVICE_ID,
            timestamp: timestamp(),
            error: error.into(),
        }
    }
}

/// Body of `/`.
#[derive(Debug, Clone, Serialize)]
pub struct InfoReport {
    pub service: &'static str,
    pub description: &'static str,
    pub version: &'static str,
    pub endpoints: BTreeMap<&'static str, &'static str>,
    pub timestamp: String,
}

impl InfoReport {
    pub fn new() -> Self {
        Self {
            service: SERVICE_NAME,
            description: SERVICE_DESCRIPTION,
            version: VERSION,
            endpoints: BTreeMap::from([
                ("/health", "Health check endpoint"),
                ("/", "Service information"),
            ]),
            timestamp: timestamp(),
        }
    }
}

impl Default for InfoReport {
    fn default() -> Self { Self::new() }
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;
    use serde_json::json;

    use super::*;
    use crate::probe::Availability;

    #[test]
    fn timestamps_are_utc_rfc3339() {
        let ts = timestamp();
        assert!(ts.ends_with('Z'), "{ts}");
        let parsed = DateTime::parse_from_rfc3339(&ts).unwrap();
        assert_eq!(parsed.offset().local_minus_utc(), 0);
        // Microsecond precision: 2026-10-16T09:14:03.512345Z
        assert_eq!(ts.len(), 27, "{ts}");
    }

    #[test]
    fn health_report_shape() {
        let deps = Dependencies(vec![
            ("opencv".into(), Availability::Present("4.8.1".into())),
            ("fpdf2".into(), Availability::Absent),
        ]);
        let value = serde_json::to_value(HealthReport::healthy("12.00 seconds".into(), deps)).unwrap();

        assert_eq!(value["status"], "healthy");
        assert_eq!(value["service"], "thakii-pdf-engine");
        assert_eq!(value["version"], "1.0.0");
        assert_eq!(value["uptime"], "12.00 seconds");
        assert_eq!(
            value["checks"],
            json!({
                "application_import": "ok",
                "dependencies": { "opencv": "4.8.1", "fpdf2": "missing" }
            })
        );
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn error_report_shape() {
        let value = serde_json::to_value(ErrorReport::new("no module named 'src.main'")).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), 4);
        assert_eq!(value["status"], "unhealthy");
        assert_eq!(value["service"], "thakii-pdf-engine");
        assert_eq!(value["error"], "no module named 'src.main'");
    }

    #[test]
    fn info_report_lists_both_endpoints() {
        let value = serde_json::to_value(InfoReport::new()).unwrap();
        assert_eq!(value["service"], "Thakii PDF Engine");
        assert_eq!(value["description"], "Video-to-PDF conversion service");
        assert_eq!(
            value["endpoints"],
            json!({ "/health": "Health check endpoint", "/": "Service information" })
        );
    }
}
