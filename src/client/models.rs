//! Wire types of the monitoring backend.

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::models::{CheckFrequency, SiteId};

/// A site as listed by `GET /websites`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteRecord {
    pub id: SiteId,
    pub url: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub frequency: u32,
    /// Latest uptime known to the backend, if any.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub uptime: Option<f64>,
    /// Latest response time; the backend sends "N/A" when there is none.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub response_time: Option<f64>,
}

/// One probe result from `GET /metrics`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricSample {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub uptime: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub response_time: Option<f64>,
}

/// An alert record from `GET /alerts`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRecord {
    pub id: i64,
    pub website_id: SiteId,
    #[serde(default)]
    pub alert_type: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub timestamp: Option<NaiveDateTime>,
}

/// Body of `POST /websites/add`.
#[derive(Debug, Clone, Serialize)]
pub struct NewSite {
    pub url: String,
    pub name: String,
    pub frequency: CheckFrequency,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AddSiteResponse {
    pub website: SiteRecord,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginResponse {
    #[serde(default)]
    pub access_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct FrequencyUpdate {
    pub frequency: CheckFrequency,
}

/// Accept numbers, numeric strings and null; anything else reads as absent.
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_site_record_with_na_response_time() {
        let json = r#"{"id": 3, "url": "https://a.com", "name": "a", "frequency": 60,
                       "uptime": 0, "response_time": "N/A"}"#;
        let record: SiteRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.id, 3);
        assert_eq!(record.uptime, Some(0.0));
        assert_eq!(record.response_time, None);
    }

    #[test]
    fn test_site_record_minimal() {
        let record: SiteRecord = serde_json::from_str(r#"{"id": 1, "url": "https://a.com"}"#).unwrap();
        assert_eq!(record.frequency, 0);
        assert!(record.uptime.is_none());
        assert!(record.response_time.is_none());
    }

    #[test]
    fn test_metric_sample_null_uptime() {
        let samples: Vec<MetricSample> = serde_json::from_str(
            r#"[{"uptime": null, "response_time": 10.5},
                {"uptime": 1.0, "response_time": 120},
                {"uptime": "NaN", "response_time": 3}]"#,
        )
        .unwrap();
        assert_eq!(samples[0].uptime, None);
        assert_eq!(samples[0].response_time, Some(10.5));
        assert_eq!(samples[1].response_time, Some(120.0));
        assert!(samples[2].uptime.unwrap().is_nan());
    }

    #[test]
    fn test_alert_record_timestamp() {
        let alert: AlertRecord = serde_json::from_str(
            r#"{"id": 9, "website_id": 1, "alert_type": "downtime", "status": "unresolved",
                "timestamp": "2025-02-15T12:10:00.123456"}"#,
        )
        .unwrap();
        assert_eq!(alert.status, "unresolved");
        assert!(alert.timestamp.is_some());
    }

    #[test]
    fn test_new_site_body() {
        let body = serde_json::to_value(NewSite {
            url: "https://a.com".to_string(),
            name: "https://a.com".to_string(),
            frequency: CheckFrequency::FiveMinutes,
        })
        .unwrap();
        assert_eq!(body["frequency"], 300);
        assert_eq!(body["name"], "https://a.com");
    }
}
