//! Outbound syslog message
//!
//! `SyslogMessage` is immutable once built. Modifiers and senders derive new
//! messages through the consuming `with_*` builders.

use std::collections::BTreeMap;
use std::fmt::{self, Write as _};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::{MAX_PRI, ProtocolError};

/// Structured data: SD-ID → ordered key/value parameters
pub type StructuredData = BTreeMap<String, BTreeMap<String, String>>;

// =============================================================================
// Facility
// =============================================================================

/// Syslog facility (RFC 5424 §6.2.1)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(try_from = "String")]
pub enum Facility {
    Kern,
    #[default]
    User,
    Mail,
    Daemon,
    Auth,
    Syslog,
    Lpr,
    News,
    Uucp,
    Cron,
    AuthPriv,
    Ftp,
    Ntp,
    Audit,
    Alert,
    Clock,
    Local0,
    Local1,
    Local2,
    Local3,
    Local4,
    Local5,
    Local6,
    Local7,
}

impl Facility {
    const ALL: [Facility; 24] = [
        Self::Kern,
        Self::User,
        Self::Mail,
        Self::Daemon,
        Self::Auth,
        Self::Syslog,
        Self::Lpr,
        Self::News,
        Self::Uucp,
        Self::Cron,
        Self::AuthPriv,
        Self::Ftp,
        Self::Ntp,
        Self::Audit,
        Self::Alert,
        Self::Clock,
        Self::Local0,
        Self::Local1,
        Self::Local2,
        Self::Local3,
        Self::Local4,
        Self::Local5,
        Self::Local6,
        Self::Local7,
    ];

    /// Numeric facility code (0-23)
    #[inline]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Look up a facility by numeric code
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    /// Lowercase facility name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Kern => "kern",
            Self::User => "user",
            Self::Mail => "mail",
            Self::Daemon => "daemon",
            Self::Auth => "auth",
            Self::Syslog => "syslog",
            Self::Lpr => "lpr",
            Self::News => "news",
            Self::Uucp => "uucp",
            Self::Cron => "cron",
            Self::AuthPriv => "authpriv",
            Self::Ftp => "ftp",
            Self::Ntp => "ntp",
            Self::Audit => "audit",
            Self::Alert => "alert",
            Self::Clock => "clock",
            Self::Local0 => "local0",
            Self::Local1 => "local1",
            Self::Local2 => "local2",
            Self::Local3 => "local3",
            Self::Local4 => "local4",
            Self::Local5 => "local5",
            Self::Local6 => "local6",
            Self::Local7 => "local7",
        }
    }
}

impl FromStr for Facility {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        if let Ok(code) = name.parse::<u8>() {
            return Self::from_code(code).ok_or_else(|| ProtocolError::invalid_facility(s));
        }
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == name)
            .ok_or_else(|| ProtocolError::invalid_facility(s))
    }
}

impl TryFrom<String> for Facility {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for Facility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Severity
// =============================================================================

/// Syslog severity (RFC 5424 §6.2.1)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(try_from = "String")]
pub enum Severity {
    Emergency,
    Alert,
    Critical,
    Error,
    Warning,
    Notice,
    #[default]
    Info,
    Debug,
}

impl Severity {
    const ALL: [Severity; 8] = [
        Self::Emergency,
        Self::Alert,
        Self::Critical,
        Self::Error,
        Self::Warning,
        Self::Notice,
        Self::Info,
        Self::Debug,
    ];

    /// Numeric severity code (0-7)
    #[inline]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Look up a severity by numeric code
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    /// Short lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Emergency => "emerg",
            Self::Alert => "alert",
            Self::Critical => "crit",
            Self::Error => "err",
            Self::Warning => "warning",
            Self::Notice => "notice",
            Self::Info => "info",
            Self::Debug => "debug",
        }
    }
}

impl FromStr for Severity {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        if let Ok(code) = name.parse::<u8>() {
            return Self::from_code(code).ok_or_else(|| ProtocolError::invalid_severity(s));
        }
        match name.as_str() {
            "emerg" | "emergency" | "panic" => Ok(Self::Emergency),
            "alert" => Ok(Self::Alert),
            "crit" | "critical" => Ok(Self::Critical),
            "err" | "error" => Ok(Self::Error),
            "warning" | "warn" => Ok(Self::Warning),
            "notice" => Ok(Self::Notice),
            "info" | "informational" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            _ => Err(ProtocolError::invalid_severity(s)),
        }
    }
}

impl TryFrom<String> for Severity {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, ProtocolError> {
        value.parse()
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Split a PRI value into facility and severity
///
/// Returns `None` for values above 191.
pub fn split_pri(pri: u8) -> Option<(Facility, Severity)> {
    if pri > MAX_PRI {
        return None;
    }
    Some((Facility::from_code(pri >> 3)?, Severity::from_code(pri & 0x07)?))
}

// =============================================================================
// Message
// =============================================================================

/// Wire rendering of a message
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageFormat {
    /// `<PRI>Mmm dd hh:mm:ss HOST IDENT: BODY`
    #[default]
    Bsd,
    /// `<PRI>1 TIMESTAMP HOST APP PROCID MSGID SD BODY`
    Rfc5424,
}

/// A single syslog event headed for the wire
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyslogMessage {
    facility: Facility,
    severity: Severity,
    timestamp: Option<DateTime<Utc>>,
    host: Option<String>,
    ident: Option<String>,
    body: String,
    app_name: Option<String>,
    proc_id: Option<String>,
    msg_id: Option<String>,
    structured_data: StructuredData,
}

impl SyslogMessage {
    /// Create a message with the given facility, severity and body
    pub fn new(facility: Facility, severity: Severity, body: impl Into<String>) -> Self {
        Self {
            facility,
            severity,
            body: body.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_facility(mut self, facility: Facility) -> Self {
        self.facility = facility;
        self
    }

    #[must_use]
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    #[must_use]
    pub fn with_ident(mut self, ident: impl Into<String>) -> Self {
        self.ident = Some(ident.into());
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    #[must_use]
    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = Some(app_name.into());
        self
    }

    #[must_use]
    pub fn with_proc_id(mut self, proc_id: impl Into<String>) -> Self {
        self.proc_id = Some(proc_id.into());
        self
    }

    #[must_use]
    pub fn with_msg_id(mut self, msg_id: impl Into<String>) -> Self {
        self.msg_id = Some(msg_id.into());
        self
    }

    /// Add (or replace) one structured-data element
    #[must_use]
    pub fn with_sd_element(
        mut self,
        id: impl Into<String>,
        params: BTreeMap<String, String>,
    ) -> Self {
        self.structured_data.insert(id.into(), params);
        self
    }

    #[inline]
    pub fn facility(&self) -> Facility {
        self.facility
    }

    #[inline]
    pub fn severity(&self) -> Severity {
        self.severity
    }

    #[inline]
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn ident(&self) -> Option<&str> {
        self.ident.as_deref()
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn app_name(&self) -> Option<&str> {
        self.app_name.as_deref()
    }

    pub fn proc_id(&self) -> Option<&str> {
        self.proc_id.as_deref()
    }

    pub fn msg_id(&self) -> Option<&str> {
        self.msg_id.as_deref()
    }

    pub fn structured_data(&self) -> &StructuredData {
        &self.structured_data
    }

    /// PRI value: `facility * 8 + severity`
    #[inline]
    pub fn pri(&self) -> u8 {
        self.facility.code() * 8 + self.severity.code()
    }

    /// Render the message as wire text
    pub fn render(&self, format: MessageFormat) -> String {
        match format {
            MessageFormat::Bsd => self.render_bsd(),
            MessageFormat::Rfc5424 => self.render_rfc5424(),
        }
    }

    fn render_bsd(&self) -> String {
        let mut out = String::with_capacity(self.body.len() + 48);
        let _ = write!(out, "<{}>", self.pri());
        if let Some(ts) = self.timestamp {
            let _ = write!(out, "{} ", ts.format("%b %e %H:%M:%S"));
        }
        if let Some(host) = &self.host {
            out.push_str(host);
            out.push(' ');
        }
        if let Some(ident) = &self.ident {
            out.push_str(ident);
            out.push_str(": ");
        }
        out.push_str(&self.body);
        out
    }

    fn render_rfc5424(&self) -> String {
        let mut out = String::with_capacity(self.body.len() + 96);
        let _ = write!(out, "<{}>1 ", self.pri());
        match self.timestamp {
            Some(ts) => out.push_str(&ts.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)),
            None => out.push('-'),
        }
        let app = self.app_name.as_deref().or(self.ident.as_deref());
        for field in [self.host.as_deref(), app, self.proc_id.as_deref(), self.msg_id.as_deref()] {
            out.push(' ');
            out.push_str(nil_or(field));
        }
        out.push(' ');
        if self.structured_data.is_empty() {
            out.push('-');
        } else {
            for (id, params) in &self.structured_data {
                out.push('[');
                out.push_str(id);
                for (key, value) in params {
                    let _ = write!(out, " {}=\"{}\"", key, escape_sd_value(value));
                }
                out.push(']');
            }
        }
        if !self.body.is_empty() {
            out.push(' ');
            out.push_str(&self.body);
        }
        out
    }
}

fn nil_or(field: Option<&str>) -> &str {
    match field {
        Some(v) if !v.is_empty() => v,
        _ => "-",
    }
}

fn escape_sd_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '"' | '\\' | ']') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
