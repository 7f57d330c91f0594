//! Views derived from a validated bundle. Both are ephemeral: computed fresh
//! on every request, never written back to storage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::bundle::{Alert, IncidentStatus, Priority, RunbookHit, Signal, TimeWindow};

/// Deterministic human-readable digest of a bundle. Every field is a pure
/// function of the bundle except `generated_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageSummary {
    pub incident_id: String,
    pub service: String,
    pub priority: Priority,
    pub status: IncidentStatus,
    pub time_window: TimeWindow,

    pub headline: String,
    pub key_findings: Vec<String>,
    pub top_signals: Vec<Signal>,
    pub top_alerts: Vec<Alert>,
    pub runbook_hits: Vec<RunbookHit>,

    pub likely_causes: Vec<String>,
    pub recommended_next_steps: Vec<String>,

    pub evidence_uri: Option<String>,
    pub generated_at: DateTime<Utc>,
}

/// Draft ticket rendered from a bundle; no ticketing system is ever called.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JiraDraftTicket {
    pub incident_id: String,
    pub title: String,
    pub priority: Priority,
    pub labels: Vec<String>,
    pub description_md: String,
    pub evidence_uri: Option<String>,
    pub generated_at: DateTime<Utc>,
}
