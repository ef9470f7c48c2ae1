//! Inbound structured event

use chrono::{DateTime, FixedOffset};

use crate::{Facility, Severity, StructuredData};

/// A decoded inbound syslog message
///
/// Always populated. When structured decomposition fails, `message` holds the
/// raw input verbatim, the header fields are `None`, `structured_data` is
/// empty and `structured` is false.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructuredEvent {
    pub facility: Option<Facility>,
    pub severity: Option<Severity>,
    pub version: Option<u32>,
    pub timestamp: Option<DateTime<FixedOffset>>,
    pub host: Option<String>,
    pub app_name: Option<String>,
    pub proc_id: Option<String>,
    pub msg_id: Option<String>,
    pub structured_data: StructuredData,
    pub message: String,
    /// Whether the header and structured data were decomposed
    pub structured: bool,
}

impl StructuredEvent {
    /// Degraded event carrying the raw text
    pub fn raw(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    /// Look up one structured-data parameter
    pub fn sd_param(&self, id: &str, key: &str) -> Option<&str> {
        self.structured_data.get(id)?.get(key).map(String::as_str)
    }
}
