//! Alert sources.
//!
//! [`AlertSource`] carries exactly the one method consumers need; the mock
//! provider produces deterministic synthetic alerts so the pipeline can run
//! end-to-end without monitoring credentials.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use serde::Serialize;
use thiserror::Error;

use triage_domain::{
    Alert, AlertProvider, AlertSignal, AlertStatus, Priority, Signal, SignalValue, TimeWindow,
};

pub type Result<T> = std::result::Result<T, AlertError>;

#[derive(Error, Debug)]
pub enum AlertError {
    #[error("Alert provider error: {0}")]
    Upstream(String),
}

#[async_trait]
pub trait AlertSource: Send + Sync {
    /// Active alerts for the given services over the last `since_minutes`,
    /// capped at `max_alerts`.
    async fn fetch_active(
        &self,
        services: &[String],
        since_minutes: i64,
        max_alerts: usize,
    ) -> Result<Vec<Alert>>;
}

/// Point-in-time health of a service, used by the demo evidence producer.
#[derive(Debug, Clone, Serialize)]
pub struct HealthSnapshot {
    pub service: String,
    pub window: TimeWindow,
    pub status: String,
    pub indicators: Vec<Signal>,
}

/// Synthetic Datadog-shaped provider: one triggered P1 "5xx rate high" alert
/// per service. Ids come from a process-local counter so repeated calls stay
/// distinguishable without being random.
#[derive(Debug, Default)]
pub struct MockDatadog {
    next_id: AtomicU64,
}

impl MockDatadog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn health_snapshot(&self, service: &str, window: TimeWindow) -> HealthSnapshot {
        let number = |n: serde_json::Number| SignalValue::Number(n);
        HealthSnapshot {
            service: service.to_string(),
            window,
            status: "degraded".to_string(),
            indicators: vec![
                Signal {
                    key: "error_rate".to_string(),
                    value: number(serde_json::Number::from_f64(0.12).unwrap_or_else(|| 0.into())),
                    unit: Some("ratio".to_string()),
                },
                Signal {
                    key: "latency_p95_ms".to_string(),
                    value: number(840.into()),
                    unit: Some("ms".to_string()),
                },
                Signal {
                    key: "rps".to_string(),
                    value: number(2100.into()),
                    unit: Some("rps".to_string()),
                },
                Signal {
                    key: "top_endpoint".to_string(),
                    value: SignalValue::Text("POST /checkout".to_string()),
                    unit: None,
                },
            ],
        }
    }
}

#[async_trait]
impl AlertSource for MockDatadog {
    async fn fetch_active(
        &self,
        services: &[String],
        since_minutes: i64,
        max_alerts: usize,
    ) -> Result<Vec<Alert>> {
        let now = Utc::now();
        let started_at = now - ChronoDuration::minutes(since_minutes.clamp(1, 60).min(6));

        let fallback = ["payments-api".to_string()];
        let services: &[String] = if services.is_empty() { &fallback } else { services };

        let mut alerts = Vec::new();
        for service in services {
            let n = self.next_id.fetch_add(1, Ordering::Relaxed) + 100;
            alerts.push(Alert {
                alert_id: format!("dd_{n}"),
                provider: AlertProvider::Datadog,
                service: service.clone(),
                name: "5xx rate high".to_string(),
                status: AlertStatus::Triggered,
                started_at,
                priority: Priority::P1,
                signal: Some(AlertSignal {
                    metric: Some("http.server.errors".to_string()),
                    value: serde_json::Number::from_f64(0.12),
                    threshold: serde_json::Number::from_f64(0.05),
                }),
            });
        }
        alerts.truncate(max_alerts);
        Ok(alerts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn one_alert_per_service_capped() {
        let source = MockDatadog::new();
        let services = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let alerts = source.fetch_active(&services, 30, 2).await.unwrap();

        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].service, "a");
        assert_eq!(alerts[0].priority, Priority::P1);
        assert_eq!(alerts[0].status, AlertStatus::Triggered);
        assert_ne!(alerts[0].alert_id, alerts[1].alert_id);
    }

    #[tokio::test]
    async fn empty_service_list_uses_fallback() {
        let source = MockDatadog::new();
        let alerts = source.fetch_active(&[], 30, 10).await.unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].service, "payments-api");
    }

    #[test]
    fn snapshot_carries_triage_signals() {
        let source = MockDatadog::new();
        let window = TimeWindow {
            start: Utc::now() - ChronoDuration::minutes(30),
            end: Utc::now(),
        };
        let snapshot = source.health_snapshot("payments-api", window);
        assert_eq!(snapshot.status, "degraded");
        let keys: Vec<&str> = snapshot.indicators.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(keys, vec!["error_rate", "latency_p95_ms", "rps", "top_endpoint"]);
    }
}
