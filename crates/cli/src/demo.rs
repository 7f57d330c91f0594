//! Demo evidence producer. Stands in for the asynchronous evidence pipeline
//! so the whole flow (seed -> await -> summarize -> draft) can be exercised
//! locally without a scheduler or monitoring credentials.

use chrono::{DateTime, Duration, Utc};

use triage_alerts::MockDatadog;
use triage_domain::{
    EvidenceBundle, Link, RunbookHit, TimeWindow, SCHEMA_VERSION,
};

pub fn demo_bundle(
    incident_id: &str,
    service: &str,
    window_minutes: i64,
    now: DateTime<Utc>,
) -> EvidenceBundle {
    let window = TimeWindow {
        start: now - Duration::minutes(window_minutes),
        end: now,
    };

    let source = MockDatadog::new();
    let snapshot = source.health_snapshot(service, window.clone());

    let mut alert = triage_domain::Alert {
        alert_id: "mock_501".to_string(),
        provider: triage_domain::AlertProvider::Mock,
        service: service.to_string(),
        name: "5xx rate high".to_string(),
        status: triage_domain::AlertStatus::Triggered,
        started_at: now - Duration::minutes(6),
        priority: triage_domain::Priority::P1,
        signal: None,
    };
    alert.signal = Some(triage_domain::AlertSignal {
        metric: Some("http.server.errors".to_string()),
        value: serde_json::Number::from_f64(0.12),
        threshold: serde_json::Number::from_f64(0.05),
    });

    EvidenceBundle {
        schema_version: SCHEMA_VERSION.to_string(),
        incident_id: incident_id.to_string(),
        service: service.to_string(),
        time_window: window,
        alerts: vec![alert],
        signals: snapshot.indicators,
        runbook_hits: vec![RunbookHit {
            doc_id: "rb_07".to_string(),
            title: "5xx spike checklist".to_string(),
            score: 0.72,
            summary: "Check recent deploys, dependency health, and top failing endpoints; \
                      confirm feature flags."
                .to_string(),
        }],
        hypotheses: vec![
            "Recent deploy regression".to_string(),
            "Downstream dependency timeout".to_string(),
            "DB connection pool saturation".to_string(),
        ],
        recommended_next_steps: vec![
            "Confirm if a deploy happened in the last 30 minutes".to_string(),
            "Check dependency health and error budgets".to_string(),
            "Inspect logs for top failing endpoint".to_string(),
        ],
        links: vec![
            Link {
                kind: "dashboard".to_string(),
                url: "https://example.local/dashboards/payments".to_string(),
            },
            Link {
                kind: "logs".to_string(),
                url: "https://example.local/logs?q=5xx".to_string(),
            },
        ],
        generated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_bundle_passes_validation() {
        let now = Utc::now();
        let bundle = demo_bundle("inc_demo", "payments-api", 30, now);
        let raw = serde_json::to_value(&bundle).unwrap();
        let validated = EvidenceBundle::from_json(raw).unwrap();
        assert_eq!(validated, bundle);
        assert_eq!(validated.most_severe_priority(), triage_domain::Priority::P1);
    }
}
