//! Instants recorded on audit entries.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// When an access attempt started, in UTC.
///
/// Serializes as an RFC 3339 string. Audit order comes from sequence
/// numbers, so two calls may carry equal timestamps.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now())
    }

    pub fn from_datetime(instant: DateTime<Utc>) -> Self {
        Self(instant)
    }

    /// Stable text form: RFC 3339 with a `Z` suffix and only as many
    /// fractional digits as the instant needs.
    ///
    /// The audit hash chain digests this string, so it must not depend on
    /// locale or formatting options.
    pub fn canonical(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }

    /// `YYYY-MM-DD HH:MM:SS`, as printed in access log lines.
    pub fn to_log_format(&self) -> String {
        self.0.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.canonical())
    }
}
