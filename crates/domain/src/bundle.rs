//! Canonical evidence bundle schema.
//!
//! A bundle is written once by the evidence pipeline and never mutated in
//! place; consumers get their own validated copy via [`EvidenceBundle::from_json`],
//! the single gate between raw storage bytes and any derived computation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, ValidationError};

pub const SCHEMA_VERSION: &str = "v1";

fn default_schema_version() -> String {
    SCHEMA_VERSION.to_string()
}

/// Evidence collection window. `start` inclusive, `end` exclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// A metric-like value captured at collection time. Keys are not required to
/// be unique within a bundle; consumers treat the first match as canonical.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub key: String,
    pub value: SignalValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

/// Signal values arrive as JSON numbers or strings. Numbers keep their source
/// representation (`serde_json::Number`) so round-trips are lossless.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SignalValue {
    Number(serde_json::Number),
    Text(String),
}

impl fmt::Display for SignalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalValue::Number(n) => n.fmt(f),
            SignalValue::Text(s) => s.fmt(f),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertProvider {
    Datadog,
    Mock,
    Other,
}

impl Default for AlertProvider {
    fn default() -> Self {
        AlertProvider::Mock
    }
}

impl fmt::Display for AlertProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AlertProvider::Datadog => "datadog",
            AlertProvider::Mock => "mock",
            AlertProvider::Other => "other",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Triggered,
    Warning,
    Resolved,
}

impl Default for AlertStatus {
    fn default() -> Self {
        AlertStatus::Triggered
    }
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AlertStatus::Triggered => "triggered",
            AlertStatus::Warning => "warning",
            AlertStatus::Resolved => "resolved",
        };
        f.write_str(s)
    }
}

/// Alert priority. The derived `Ord` puts P1 first, so "most severe" is
/// simply the minimum of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    P1,
    P2,
    P3,
    P4,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::P2
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Priority::P1 => "P1",
            Priority::P2 => "P2",
            Priority::P3 => "P3",
            Priority::P4 => "P4",
        };
        f.write_str(s)
    }
}

/// The raw measurement that tripped an alert.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AlertSignal {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<serde_json::Number>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub alert_id: String,
    #[serde(default)]
    pub provider: AlertProvider,
    pub service: String,
    pub name: String,
    #[serde(default)]
    pub status: AlertStatus,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal: Option<AlertSignal>,
}

/// A runbook matched to the incident by keyword relevance. `score` is a
/// relevance measure in [0, 1], not a probability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunbookHit {
    pub doc_id: String,
    pub title: String,
    pub score: f64,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
}

/// Root aggregate: everything known about an incident at collection time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceBundle {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    pub incident_id: String,
    pub service: String,
    pub time_window: TimeWindow,

    #[serde(default)]
    pub alerts: Vec<Alert>,
    #[serde(default)]
    pub signals: Vec<Signal>,
    #[serde(default)]
    pub runbook_hits: Vec<RunbookHit>,

    #[serde(default)]
    pub hypotheses: Vec<String>,
    #[serde(default)]
    pub recommended_next_steps: Vec<String>,

    #[serde(default)]
    pub links: Vec<Link>,
    pub generated_at: DateTime<Utc>,
}

impl EvidenceBundle {
    /// Validate raw JSON into a typed bundle. This is the only way a bundle
    /// enters the system; nothing downstream re-checks fields. Deserialization
    /// errors keep the path to the offending field (`alerts[0].status`), not
    /// just serde's message, so producers can find what to fix.
    pub fn from_json(raw: serde_json::Value) -> Result<Self> {
        let bundle: Self = serde_path_to_error::deserialize(raw)
            .map_err(|e| ValidationError::Malformed(e.to_string()))?;
        bundle.check()?;
        Ok(bundle)
    }

    fn check(&self) -> Result<()> {
        if self.time_window.start > self.time_window.end {
            return Err(ValidationError::WindowInverted {
                start: self.time_window.start,
                end: self.time_window.end,
            });
        }
        for (index, hit) in self.runbook_hits.iter().enumerate() {
            if !(0.0..=1.0).contains(&hit.score) {
                return Err(ValidationError::ScoreOutOfRange {
                    index,
                    doc_id: hit.doc_id.clone(),
                    score: hit.score,
                });
            }
        }
        Ok(())
    }

    /// Most severe priority across alerts, P3 when there are none.
    pub fn most_severe_priority(&self) -> Priority {
        self.alerts
            .iter()
            .map(|a| a.priority)
            .min()
            .unwrap_or(Priority::P3)
    }

    /// Overall incident status: any triggered alert wins, then warning,
    /// then resolved. No alerts at all means we simply do not know.
    pub fn resolve_status(&self) -> IncidentStatus {
        if self.alerts.is_empty() {
            return IncidentStatus::Unknown;
        }
        if self.alerts.iter().any(|a| a.status == AlertStatus::Triggered) {
            IncidentStatus::Triggered
        } else if self.alerts.iter().any(|a| a.status == AlertStatus::Warning) {
            IncidentStatus::Warning
        } else if self.alerts.iter().any(|a| a.status == AlertStatus::Resolved) {
            IncidentStatus::Resolved
        } else {
            IncidentStatus::Unknown
        }
    }

    /// First signal with the given key, if any.
    pub fn signal(&self, key: &str) -> Option<&Signal> {
        self.signals.iter().find(|s| s.key == key)
    }
}

/// Status derived for the incident as a whole, as opposed to per-alert
/// [`AlertStatus`]. `Unknown` covers the no-alerts case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncidentStatus {
    Triggered,
    Warning,
    Resolved,
    Unknown,
}

impl fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IncidentStatus::Triggered => "triggered",
            IncidentStatus::Warning => "warning",
            IncidentStatus::Resolved => "resolved",
            IncidentStatus::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    pub(crate) fn sample_bundle_json() -> serde_json::Value {
        json!({
            "schema_version": "v1",
            "incident_id": "inc_1001",
            "service": "payments-api",
            "time_window": {
                "start": "2026-08-30T10:00:00Z",
                "end": "2026-08-30T10:30:00Z"
            },
            "alerts": [
                {
                    "alert_id": "mock_501",
                    "provider": "mock",
                    "service": "payments-api",
                    "name": "5xx rate high",
                    "status": "triggered",
                    "started_at": "2026-08-30T10:24:00Z",
                    "priority": "P1",
                    "signal": {"metric": "http.server.errors", "value": 0.12, "threshold": 0.05}
                }
            ],
            "signals": [
                {"key": "error_rate", "value": 0.12, "unit": "ratio"},
                {"key": "latency_p95_ms", "value": 840, "unit": "ms"},
                {"key": "top_endpoint", "value": "POST /checkout"}
            ],
            "runbook_hits": [
                {"doc_id": "rb_07", "title": "5xx spike checklist", "score": 0.72,
                 "summary": "Check recent deploys and dependency health."}
            ],
            "hypotheses": ["Recent deploy regression", "DB pool saturation"],
            "recommended_next_steps": ["Confirm deploy", "Check DB health"],
            "links": [{"type": "dashboard", "url": "https://example.local/d/payments"}],
            "generated_at": "2026-08-30T10:30:05Z"
        })
    }

    #[test]
    fn valid_bundle_parses() {
        let bundle = EvidenceBundle::from_json(sample_bundle_json()).unwrap();
        assert_eq!(bundle.incident_id, "inc_1001");
        assert_eq!(bundle.alerts.len(), 1);
        assert_eq!(bundle.alerts[0].priority, Priority::P1);
        assert_eq!(bundle.signals[2].value, SignalValue::Text("POST /checkout".into()));
    }

    #[test]
    fn missing_required_field_names_it() {
        let mut raw = sample_bundle_json();
        raw.as_object_mut().unwrap().remove("incident_id");
        let err = EvidenceBundle::from_json(raw).unwrap_err();
        assert!(err.to_string().contains("incident_id"), "got: {err}");
    }

    #[test]
    fn unknown_enum_value_rejected_naming_field_path() {
        let mut raw = sample_bundle_json();
        raw["alerts"][0]["status"] = json!("flapping");
        let err = EvidenceBundle::from_json(raw).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("flapping"), "got: {msg}");
        assert!(msg.contains("alerts[0].status"), "got: {msg}");
    }

    #[test]
    fn nested_type_error_names_field_path() {
        let mut raw = sample_bundle_json();
        raw["signals"][1]["key"] = json!(42);
        let err = EvidenceBundle::from_json(raw).unwrap_err();
        assert!(err.to_string().contains("signals[1].key"), "got: {err}");
    }

    #[test]
    fn unknown_priority_rejected() {
        let mut raw = sample_bundle_json();
        raw["alerts"][0]["priority"] = json!("P9");
        assert!(EvidenceBundle::from_json(raw).is_err());
    }

    #[test]
    fn score_out_of_range_rejected() {
        let mut raw = sample_bundle_json();
        raw["runbook_hits"][0]["score"] = json!(1.5);
        let err = EvidenceBundle::from_json(raw).unwrap_err();
        assert!(matches!(err, ValidationError::ScoreOutOfRange { index: 0, .. }));
    }

    #[test]
    fn inverted_window_rejected() {
        let mut raw = sample_bundle_json();
        raw["time_window"]["start"] = json!("2026-08-30T11:00:00Z");
        let err = EvidenceBundle::from_json(raw).unwrap_err();
        assert!(matches!(err, ValidationError::WindowInverted { .. }));
    }

    #[test]
    fn absent_lists_default_to_empty() {
        let raw = json!({
            "incident_id": "inc_2",
            "service": "web",
            "time_window": {"start": "2026-08-30T10:00:00Z", "end": "2026-08-30T10:30:00Z"},
            "generated_at": "2026-08-30T10:30:00Z"
        });
        let bundle = EvidenceBundle::from_json(raw).unwrap();
        assert!(bundle.alerts.is_empty());
        assert!(bundle.signals.is_empty());
        assert!(bundle.runbook_hits.is_empty());
        assert!(bundle.links.is_empty());
        assert_eq!(bundle.schema_version, SCHEMA_VERSION);
    }

    #[test]
    fn round_trip_preserves_all_fields() {
        let bundle = EvidenceBundle::from_json(sample_bundle_json()).unwrap();
        let raw = serde_json::to_value(&bundle).unwrap();
        let again = EvidenceBundle::from_json(raw).unwrap();
        assert_eq!(bundle, again);
    }

    #[test]
    fn most_severe_priority_picks_p1() {
        let mut bundle = EvidenceBundle::from_json(sample_bundle_json()).unwrap();
        let mut p2 = bundle.alerts[0].clone();
        p2.priority = Priority::P2;
        let mut p3 = bundle.alerts[0].clone();
        p3.priority = Priority::P3;
        bundle.alerts = vec![p2, bundle.alerts[0].clone(), p3];
        assert_eq!(bundle.most_severe_priority(), Priority::P1);
    }

    #[test]
    fn no_alerts_defaults_to_p3_and_unknown() {
        let mut bundle = EvidenceBundle::from_json(sample_bundle_json()).unwrap();
        bundle.alerts.clear();
        assert_eq!(bundle.most_severe_priority(), Priority::P3);
        assert_eq!(bundle.resolve_status(), IncidentStatus::Unknown);
    }

    #[test]
    fn warning_beats_resolved() {
        let mut bundle = EvidenceBundle::from_json(sample_bundle_json()).unwrap();
        let mut warning = bundle.alerts[0].clone();
        warning.status = AlertStatus::Warning;
        let mut resolved = bundle.alerts[0].clone();
        resolved.status = AlertStatus::Resolved;
        bundle.alerts = vec![warning, resolved];
        assert_eq!(bundle.resolve_status(), IncidentStatus::Warning);
    }
}
