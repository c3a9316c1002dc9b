//! Uptime reading.
//!
//! Advisory only: any failure becomes the literal `"unknown"`.

use std::fs;
use std::path::PathBuf;

/// Reported when uptime cannot be read.
pub const UNKNOWN: &str = "unknown";

/// Linux uptime file; the first field is seconds since boot.
pub const PROC_UPTIME: &str = "/proc/uptime";

/// A source of the uptime string shown in health reports.
pub trait UptimeSource: Send + Sync {
    /// Rendered uptime, e.g. `"5234.17 seconds"`, or `"unknown"`.
    fn uptime(&self) -> String;
}

/// Reads a `/proc/uptime`-formatted file.
#[derive(Debug, Clone)]
pub struct ProcUptime {
    path: PathBuf,
}

impl ProcUptime {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn seconds(&self) -> Option<f64> {
        let text = fs::read_to_string(&self.path).ok()?;
        let secs: f64 = text.split_whitespace().next()?.parse().ok()?;
        secs.is_finite().then_some(secs)
    }
}

impl Default for ProcUptime {
    fn default() -> Self {
        Self::new(PROC_UPTIME)
    }
}

impl UptimeSource for ProcUptime {
    fn uptime(&self) -> String {
        match self.seconds() {
            Some(secs) => format!("{secs:.2} seconds"),
            None => {
                tracing::debug!(path = %self.path.display(), "uptime unavailable");
                UNKNOWN.to_owned()
            }
        }
    }
}
