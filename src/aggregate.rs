//! Per-site aggregation of raw metric samples and fleet-wide statistics.
//!
//! Everything here is pure: the same input always yields the same output.

use chrono::{DateTime, Utc};

use crate::client::MetricSample;
use crate::models::{FleetSnapshot, MonitoredSite};

/// Uptime below this fraction marks a site as down.
pub const DOWN_THRESHOLD: f64 = 0.5;

/// Mean uptime and response time over a set of samples.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Aggregate {
    /// Fraction in [0, 1].
    pub uptime: f64,
    /// Milliseconds, 0 when unknown.
    pub response_time: f64,
}

/// Aggregate raw samples for one site.
///
/// Only samples with a present, non-NaN uptime count. A missing response time
/// on a counted sample makes the response mean unknown (0).
pub fn aggregate(samples: &[MetricSample]) -> Aggregate {
    let valid: Vec<&MetricSample> = samples
        .iter()
        .filter(|s| s.uptime.map_or(false, |u| !u.is_nan()))
        .collect();

    if valid.is_empty() {
        return Aggregate::default();
    }

    let n = valid.len() as f64;
    let uptime = valid.iter().filter_map(|s| s.uptime).sum::<f64>() / n;
    let response_time = valid
        .iter()
        .map(|s| s.response_time.unwrap_or(f64::NAN))
        .sum::<f64>()
        / n;

    Aggregate {
        uptime,
        response_time: if response_time.is_nan() { 0.0 } else { response_time },
    }
}

/// Uptime fraction as a percentage with one decimal, e.g. "99.5%".
pub fn display_uptime(uptime: f64) -> String {
    format!("{:.1}%", uptime * 100.0)
}

/// Response time with two decimals, or "N/A" when there is no valid sample.
pub fn display_response_time(response_time: f64) -> String {
    if response_time > 0.0 {
        format!("{:.2}", response_time)
    } else {
        "N/A".to_string()
    }
}

pub fn is_down(uptime: f64) -> bool {
    uptime < DOWN_THRESHOLD
}

/// Compute fleet statistics over the given sites.
///
/// NaN uptimes are left out of the uptime mean; sites without a positive
/// response time are left out of the response mean. An empty candidate set
/// yields "0.0".
pub fn fleet_snapshot(
    sites: &[MonitoredSite],
    active_alert_count: usize,
    taken_at: DateTime<Utc>,
) -> FleetSnapshot {
    let uptimes: Vec<f64> = sites
        .iter()
        .map(|s| s.raw_uptime_fraction)
        .filter(|u| !u.is_nan())
        .collect();

    let response_times: Vec<f64> = sites
        .iter()
        .filter_map(|s| s.raw_response_time_ms)
        .filter(|r| !r.is_nan() && *r > 0.0)
        .collect();

    let average_uptime_percent = match mean(&uptimes) {
        Some(avg) => format!("{:.1}", avg * 100.0),
        None => "0.0".to_string(),
    };

    let average_response_time_ms = match mean(&response_times) {
        Some(avg) => format!("{:.2}", avg),
        None => "0.0".to_string(),
    };

    FleetSnapshot {
        site_count: sites.len(),
        average_uptime_percent,
        average_response_time_ms,
        active_alert_count,
        taken_at: Some(taken_at),
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}
