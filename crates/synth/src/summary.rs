//! Triage summary derivation. Every field is a pure function of the bundle;
//! only the generation timestamp depends on the clock, and the clock is an
//! explicit argument so tests can freeze it.

use chrono::{DateTime, Utc};

use triage_domain::{EvidenceBundle, RunbookHit, Signal, TriageSummary};

/// Signal keys surfaced first in `top_signals`, in bundle order within the
/// preferred group. Anything else fills the remaining slots, also in bundle
/// order; neither group is re-sorted.
pub const PREFERRED_SIGNAL_KEYS: &[&str] = &[
    "error_rate",
    "latency_p95_ms",
    "rps",
    "cpu",
    "memory",
    "db_timeouts",
    "top_endpoint",
];

const TOP_SIGNALS: usize = 4;
const TOP_ALERTS: usize = 3;
const TOP_RUNBOOKS: usize = 3;
const MAX_CAUSES: usize = 3;
const MAX_NEXT_STEPS: usize = 5;

/// Generic triage steps used when a bundle carries no recommendations, so a
/// summary is never actionable-empty.
pub const FALLBACK_NEXT_STEPS: &[&str] = &[
    "Confirm if a deploy occurred in the incident window",
    "Check downstream dependencies and DB health",
    "Inspect logs for top failing endpoint and error codes",
];

pub fn summarize(bundle: &EvidenceBundle, evidence_uri: Option<&str>) -> TriageSummary {
    summarize_at(bundle, evidence_uri, Utc::now())
}

pub fn summarize_at(
    bundle: &EvidenceBundle,
    evidence_uri: Option<&str>,
    now: DateTime<Utc>,
) -> TriageSummary {
    let priority = bundle.most_severe_priority();
    let status = bundle.resolve_status();

    let runbook_hits = top_runbooks(&bundle.runbook_hits);

    let recommended_next_steps = if bundle.recommended_next_steps.is_empty() {
        FALLBACK_NEXT_STEPS.iter().map(|s| s.to_string()).collect()
    } else {
        bundle
            .recommended_next_steps
            .iter()
            .take(MAX_NEXT_STEPS)
            .cloned()
            .collect()
    };

    TriageSummary {
        incident_id: bundle.incident_id.clone(),
        service: bundle.service.clone(),
        priority,
        status,
        time_window: bundle.time_window.clone(),
        headline: headline(bundle, &priority.to_string(), &status.to_string()),
        key_findings: key_findings(bundle, &runbook_hits),
        top_signals: top_signals(&bundle.signals),
        top_alerts: bundle.alerts.iter().take(TOP_ALERTS).cloned().collect(),
        runbook_hits,
        likely_causes: bundle.hypotheses.iter().take(MAX_CAUSES).cloned().collect(),
        recommended_next_steps,
        evidence_uri: evidence_uri.map(str::to_string),
        generated_at: now,
    }
}

/// Preferred keys first, then the rest; bundle order within each group.
fn top_signals(signals: &[Signal]) -> Vec<Signal> {
    let preferred = signals
        .iter()
        .filter(|s| PREFERRED_SIGNAL_KEYS.contains(&s.key.as_str()));
    let others = signals
        .iter()
        .filter(|s| !PREFERRED_SIGNAL_KEYS.contains(&s.key.as_str()));
    preferred.chain(others).take(TOP_SIGNALS).cloned().collect()
}

/// All hits sorted descending by score (stable, so ties keep bundle order),
/// truncated to the top few.
fn top_runbooks(hits: &[RunbookHit]) -> Vec<RunbookHit> {
    let mut sorted: Vec<RunbookHit> = hits.to_vec();
    sorted.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    sorted.truncate(TOP_RUNBOOKS);
    sorted
}

/// `[<priority>] <service> incident is <status>`, with an optional
/// parenthetical of the headline signals when they are present.
fn headline(bundle: &EvidenceBundle, priority: &str, status: &str) -> String {
    let mut bits = Vec::new();
    if let Some(signal) = bundle.signal("error_rate") {
        bits.push(format!("error_rate={}", signal.value));
    }
    if let Some(signal) = bundle.signal("latency_p95_ms") {
        bits.push(format!("p95={}ms", signal.value));
    }
    let tail = if bits.is_empty() {
        String::new()
    } else {
        format!(" ({})", bits.join(", "))
    };
    format!("[{priority}] {} incident is {status}{tail}", bundle.service)
}

/// Each condition contributes zero or one line; no padding to a fixed length.
fn key_findings(bundle: &EvidenceBundle, runbooks: &[RunbookHit]) -> Vec<String> {
    let mut findings = Vec::new();
    if let Some(first) = bundle.alerts.first() {
        findings.push(format!(
            "{} alert(s) in window; top: {}",
            bundle.alerts.len(),
            first.name
        ));
    }
    if let Some(endpoint) = bundle.signal("top_endpoint") {
        findings.push(format!("Top impacted endpoint: {}", endpoint.value));
    }
    if let Some(top) = runbooks.first() {
        findings.push(format!(
            "Top runbook match: {} (score={})",
            top.title, top.score
        ));
    }
    findings
}
