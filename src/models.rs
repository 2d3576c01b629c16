//! Domain types shared by the polling engine and the dashboard API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::aggregate::{display_response_time, display_uptime, is_down, Aggregate};
use crate::client::SiteRecord;

/// Backend-assigned site identifier.
pub type SiteId = i64;

/// Input rejected before it reaches the backend.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SiteValidationError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("invalid check frequency {0}s, expected one of 10, 30, 60, 300, 600, 1800, 3600")]
    InvalidFrequency(u32),
}

/// How often the backend probes a site.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum CheckFrequency {
    TenSeconds,
    ThirtySeconds,
    #[default]
    OneMinute,
    FiveMinutes,
    TenMinutes,
    ThirtyMinutes,
    OneHour,
}

impl CheckFrequency {
    pub const ALL: [CheckFrequency; 7] = [
        CheckFrequency::TenSeconds,
        CheckFrequency::ThirtySeconds,
        CheckFrequency::OneMinute,
        CheckFrequency::FiveMinutes,
        CheckFrequency::TenMinutes,
        CheckFrequency::ThirtyMinutes,
        CheckFrequency::OneHour,
    ];

    pub fn as_secs(self) -> u32 {
        match self {
            CheckFrequency::TenSeconds => 10,
            CheckFrequency::ThirtySeconds => 30,
            CheckFrequency::OneMinute => 60,
            CheckFrequency::FiveMinutes => 300,
            CheckFrequency::TenMinutes => 600,
            CheckFrequency::ThirtyMinutes => 1800,
            CheckFrequency::OneHour => 3600,
        }
    }
}

impl TryFrom<u32> for CheckFrequency {
    type Error = SiteValidationError;

    fn try_from(secs: u32) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_secs() == secs)
            .ok_or(SiteValidationError::InvalidFrequency(secs))
    }
}

impl From<CheckFrequency> for u32 {
    fn from(f: CheckFrequency) -> u32 {
        f.as_secs()
    }
}

/// Check that `raw` parses as an absolute URL.
pub fn validate_url(raw: &str) -> Result<Url, SiteValidationError> {
    Url::parse(raw.trim()).map_err(|e| SiteValidationError::InvalidUrl(format!("{}: {}", raw, e)))
}

/// A site tracked by the dashboard, with its display fields for the last cycle.
#[derive(Debug, Clone, Serialize)]
pub struct MonitoredSite {
    pub id: SiteId,
    pub url: String,
    pub name: String,
    pub check_frequency_secs: u32,
    /// Uptime in [0, 1] from the last aggregation.
    pub raw_uptime_fraction: f64,
    /// Mean response time in ms; `None` until a successful sample exists.
    pub raw_response_time_ms: Option<f64>,
    pub display_uptime: String,
    pub display_response_time: String,
    pub is_down: bool,
    /// When the last refresh cycle touched this site. `None` means never.
    pub last_checked: Option<DateTime<Utc>>,
    /// The last cycle could not fetch metrics and fell back to down/unknown.
    pub degraded: bool,
    /// Down state of the last successful measurement. Fallbacks leave it alone.
    pub last_known_down: Option<bool>,
}

impl MonitoredSite {
    /// Build a site from a backend listing entry. Listing metrics seed the
    /// display fields until the first refresh cycle.
    pub fn from_record(record: SiteRecord) -> Self {
        let uptime = record.uptime.filter(|u| !u.is_nan()).unwrap_or(0.0);
        let response_time = record.response_time.unwrap_or(0.0);

        let mut site = Self {
            id: record.id,
            url: record.url,
            name: record.name,
            check_frequency_secs: record.frequency,
            raw_uptime_fraction: 0.0,
            raw_response_time_ms: None,
            display_uptime: String::new(),
            display_response_time: String::new(),
            is_down: true,
            last_checked: None,
            degraded: false,
            last_known_down: None,
        };
        site.apply(&Aggregate { uptime, response_time });
        site
    }

    /// The configured check frequency, if it is one of the supported values.
    pub fn frequency(&self) -> Option<CheckFrequency> {
        CheckFrequency::try_from(self.check_frequency_secs).ok()
    }

    /// Copy of this site updated with a fresh aggregate.
    pub fn refreshed(&self, agg: &Aggregate, at: DateTime<Utc>) -> Self {
        let mut site = self.clone();
        site.apply(agg);
        site.last_checked = Some(at);
        site.degraded = false;
        site.last_known_down = Some(site.is_down);
        site
    }

    /// Copy of this site marked down with unknown metrics.
    pub fn fallback(&self, at: DateTime<Utc>) -> Self {
        let mut site = self.refreshed(&Aggregate::default(), at);
        site.degraded = true;
        site.last_known_down = self.last_known_down;
        site
    }

    fn apply(&mut self, agg: &Aggregate) {
        self.raw_uptime_fraction = agg.uptime;
        self.raw_response_time_ms = if agg.response_time > 0.0 {
            Some(agg.response_time)
        } else {
            None
        };
        self.display_uptime = display_uptime(agg.uptime);
        self.display_response_time = display_response_time(agg.response_time);
        self.is_down = is_down(agg.uptime);
    }
}

/// Fleet-wide statistics computed at a single poll instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FleetSnapshot {
    pub site_count: usize,
    /// Mean uptime in percent with one decimal, "0.0" when nothing is valid.
    pub average_uptime_percent: String,
    /// Mean response time in ms with two decimals, "0.0" when nothing is valid.
    pub average_response_time_ms: String,
    pub active_alert_count: usize,
    pub taken_at: Option<DateTime<Utc>>,
}

impl Default for FleetSnapshot {
    fn default() -> Self {
        Self {
            site_count: 0,
            average_uptime_percent: "0.0".to_string(),
            average_response_time_ms: "0.0".to_string(),
            active_alert_count: 0,
            taken_at: None,
        }
    }
}

/// Everything the presentation layer reads, replaced as a whole.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DashboardSnapshot {
    pub sites: Vec<MonitoredSite>,
    pub fleet: FleetSnapshot,
}
