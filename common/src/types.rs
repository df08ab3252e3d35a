use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const TITLE_MAX_LEN: usize = 255;
pub const SERVICE_MAX_LEN: usize = 100;
pub const OWNER_MAX_LEN: usize = 255;
pub const SUMMARY_MAX_LEN: usize = 1000;

/// Urgency tier, SEV1 being the most urgent.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    #[serde(rename = "SEV1")]
    Sev1,
    #[serde(rename = "SEV2")]
    Sev2,
    #[serde(rename = "SEV3")]
    Sev3,
    #[serde(rename = "SEV4")]
    Sev4,
}

impl Severity {
    pub const ALL: [Severity; 4] = [Severity::Sev1, Severity::Sev2, Severity::Sev3, Severity::Sev4];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Sev1 => "SEV1",
            Severity::Sev2 => "SEV2",
            Severity::Sev3 => "SEV3",
            Severity::Sev4 => "SEV4",
        }
    }
}

/// Lifecycle stage, in lifecycle order.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    #[default]
    Open,
    Mitigated,
    Resolved,
}

impl Status {
    pub const ALL: [Status; 3] = [Status::Open, Status::Mitigated, Status::Resolved];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Open => "OPEN",
            Status::Mitigated => "MITIGATED",
            Status::Resolved => "RESOLVED",
        }
    }

    /// Title-cased label for display.
    pub fn label(&self) -> &'static str {
        match self {
            Status::Open => "Open",
            Status::Mitigated => "Mitigated",
            Status::Resolved => "Resolved",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    pub value: String,
    pub expected: &'static [&'static str],
}

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' is not one of: {}", self.value, self.expected.join(", "))
    }
}

impl std::error::Error for UnknownVariant {}

impl FromStr for Severity {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Severity::ALL
            .into_iter()
            .find(|sev| sev.as_str() == s)
            .ok_or_else(|| UnknownVariant {
                value: s.to_string(),
                expected: &["SEV1", "SEV2", "SEV3", "SEV4"],
            })
    }
}

impl FromStr for Status {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Status::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| UnknownVariant {
                value: s.to_string(),
                expected: &["OPEN", "MITIGATED", "RESOLVED"],
            })
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    pub id: String,
    pub title: String,
    pub service: String,
    pub severity: Severity,
    pub status: Status,
    pub owner: Option<String>,
    pub summary: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated fields for a new incident.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewIncident {
    pub title: String,
    pub service: String,
    pub severity: Severity,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

/// Validated partial update. `None` leaves a field untouched; for the
/// nullable fields `Some(None)` clears the stored value.
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IncidentPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<Option<String>>,
}

impl IncidentPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.service.is_none()
            && self.severity.is_none()
            && self.status.is_none()
            && self.owner.is_none()
            && self.summary.is_none()
    }

}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
}

impl PageMeta {
    pub fn new(page: u32, limit: u32, total: u64) -> Self {
        let total_pages = if limit == 0 { 0 } else { total.div_ceil(limit as u64) };
        Self { page, limit, total, total_pages }
    }
}

/// List envelope: `{ data, meta }`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub meta: PageMeta,
}

/// Open incident counts per severity.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpenCounts {
    #[serde(rename = "SEV1")]
    pub sev1: u64,
    #[serde(rename = "SEV2")]
    pub sev2: u64,
    #[serde(rename = "SEV3")]
    pub sev3: u64,
    #[serde(rename = "SEV4")]
    pub sev4: u64,
}

impl OpenCounts {
    pub fn set(&mut self, severity: Severity, count: u64) {
        match severity {
            Severity::Sev1 => self.sev1 = count,
            Severity::Sev2 => self.sev2 = count,
            Severity::Sev3 => self.sev3 = count,
            Severity::Sev4 => self.sev4 = count,
        }
    }

    pub fn total(&self) -> u64 {
        self.sev1 + self.sev2 + self.sev3 + self.sev4
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct IncidentCounts {
    pub open: OpenCounts,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServerStatus {
    pub status: String,
    pub uptime_seconds: u64,
    pub incidents: IncidentCounts,
}
