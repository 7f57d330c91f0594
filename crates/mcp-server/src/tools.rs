//! MCP tools for incident triage.
//!
//! Each tool is stateless and independently invocable: it fetches and
//! validates its own copy of the evidence bundle, derives its view, writes
//! one audit record, and echoes the correlation id back in the response.
//! An absent bundle is a normal `found=false` outcome, never a tool error.

use std::sync::Arc;

use anyhow::Context as AnyhowContext;
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{CallToolResult, Content, Implementation, ServerCapabilities, ServerInfo};
use rmcp::schemars;
use rmcp::{tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use triage_alerts::{AlertSource, MockDatadog};
use triage_audit::{AuditLog, AuditMode};
use triage_config::{AppConfig, ArtifactStoreKind};
use triage_domain::{Alert, EvidenceBundle, JiraDraftTicket, RunbookHit, TriageSummary};
use triage_store::{await_bundle, BundleStore, FsStore, ObjectStore};

const DEFAULT_RUNBOOK_LIMIT: usize = 5;
const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_POLL_SECONDS: u64 = 2;

/// Incident Triage MCP service. Collaborators are injected at construction
/// and shared immutably across tool invocations.
#[derive(Clone)]
pub struct TriageService {
    store: Arc<dyn BundleStore>,
    alerts: Arc<dyn AlertSource>,
    audit: Arc<AuditLog>,
    runbooks_dir: PathBuf,
    tool_router: ToolRouter<Self>,
}

impl TriageService {
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let audit = match config.audit_mode {
            AuditMode::Stdout => AuditLog::stdout(),
            AuditMode::File => AuditLog::file(&config.audit_path)
                .with_context(|| format!("cannot open audit log at {}", config.audit_path))?,
        };
        Ok(Self {
            store: build_store(config)?,
            alerts: Arc::new(MockDatadog::new()),
            audit: Arc::new(audit),
            runbooks_dir: config.runbooks_dir.clone(),
            tool_router: Self::tool_router(),
        })
    }

    #[cfg(test)]
    pub fn with_parts(
        store: Arc<dyn BundleStore>,
        alerts: Arc<dyn AlertSource>,
        audit: Arc<AuditLog>,
        runbooks_dir: PathBuf,
    ) -> Self {
        Self {
            store,
            alerts,
            audit,
            runbooks_dir,
            tool_router: Self::tool_router(),
        }
    }

    /// Write the audit record for a finished operation. Audit failures are
    /// logged but never fail the operation itself; the caller still gets a
    /// correlation id.
    fn audited(&self, tool: &str, arguments: serde_json::Value, ok: bool) -> String {
        match self.audit.record(tool, arguments, ok, None, None) {
            Ok(id) => id,
            Err(e) => {
                log::warn!("audit write failed for {tool}: {e}");
                AuditLog::mint_id()
            }
        }
    }

    /// Fetch and validate the bundle for an incident. `Ok(None)` means the
    /// producer has not written it yet.
    async fn fetch_validated(
        &self,
        operation: &str,
        incident_id: &str,
    ) -> Result<Option<(String, EvidenceBundle)>, String> {
        let stored = self
            .store
            .get(incident_id)
            .await
            .map_err(|e| format!("{operation} failed for incident {incident_id}: {e}"))?;
        match stored {
            None => Ok(None),
            Some(stored) => {
                let bundle = EvidenceBundle::from_json(stored.raw)
                    .map_err(|e| format!("{operation} failed for incident {incident_id}: {e}"))?;
                Ok(Some((stored.uri, bundle)))
            }
        }
    }
}

pub fn build_store(config: &AppConfig) -> anyhow::Result<Arc<dyn BundleStore>> {
    match config.artifact_store {
        ArtifactStoreKind::Fs => Ok(Arc::new(FsStore::new(&config.artifact_dir))),
        ArtifactStoreKind::S3 => {
            let s3 = config
                .s3
                .as_ref()
                .context("ARTIFACT_STORE=s3 but credentials were not configured")?;
            Ok(Arc::new(ObjectStore::new(
                &s3.endpoint_url,
                &s3.bucket,
                &s3.access_key_id,
                &s3.secret_access_key,
            )))
        }
    }
}

#[tool_handler]
impl ServerHandler for TriageService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Incident triage tools. Use 'await_evidence' to wait for the evidence \
                 pipeline, 'triage_summary' for a prioritized digest, 'jira_draft' for a \
                 ticket draft, and 'search_runbooks' to rank remediation docs."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            ..Default::default()
        }
    }
}

// ============================================================================
// Tool Input/Output Schemas
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct PingRequest {
    /// Message to echo back
    #[schemars(description = "Message to echo back")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PingResponse {
    pub ok: bool,
    pub message: String,
    pub correlation_id: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SearchRunbooksRequest {
    /// Free-text query matched against runbook text
    #[schemars(description = "Keyword query, e.g. 'db timeout after deploy'")]
    pub query: String,

    /// Maximum results (default: 5)
    #[schemars(description = "Maximum number of results")]
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SearchRunbooksResponse {
    pub results: Vec<RunbookHit>,
    pub correlation_id: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct FetchAlertsRequest {
    /// Services to query alerts for
    #[schemars(description = "Service names, e.g. ['payments-api']")]
    pub services: Vec<String>,

    /// Look-back window in minutes (default: 30)
    #[schemars(description = "Look-back window in minutes")]
    pub since_minutes: Option<i64>,

    /// Maximum alerts to return (default: 50)
    #[schemars(description = "Maximum number of alerts")]
    pub max_alerts: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct FetchAlertsResponse {
    pub alerts: Vec<Alert>,
    pub correlation_id: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GetEvidenceRequest {
    /// Incident identifier
    #[schemars(description = "Incident id, e.g. 'inc_1001'")]
    pub incident_id: String,
}

#[derive(Debug, Serialize)]
pub struct GetEvidenceResponse {
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bundle: Option<EvidenceBundle>,
    pub correlation_id: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AwaitEvidenceRequest {
    /// Incident identifier
    #[schemars(description = "Incident id, e.g. 'inc_1001'")]
    pub incident_id: String,

    /// Overall deadline in seconds (default: 30)
    #[schemars(description = "Give up after this many seconds (1-300)")]
    pub timeout_seconds: Option<u64>,

    /// Interval between fetch attempts in seconds (default: 2)
    #[schemars(description = "Seconds between fetch attempts")]
    pub poll_seconds: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct AwaitEvidenceResponse {
    pub found: bool,
    pub attempts: u32,
    pub waited_seconds: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bundle: Option<EvidenceBundle>,
    pub correlation_id: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct TriageSummaryRequest {
    /// Incident identifier
    #[schemars(description = "Incident id, e.g. 'inc_1001'")]
    pub incident_id: String,
}

#[derive(Debug, Serialize)]
pub struct TriageSummaryResponse {
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<TriageSummary>,
    pub correlation_id: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct JiraDraftRequest {
    /// Incident identifier
    #[schemars(description = "Incident id, e.g. 'inc_1001'")]
    pub incident_id: String,
}

#[derive(Debug, Serialize)]
pub struct JiraDraftResponse {
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket: Option<JiraDraftTicket>,
    pub correlation_id: String,
}

// ============================================================================
// Tool Implementations
// ============================================================================

fn ok_json<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::success(vec![Content::text(
        serde_json::to_string_pretty(value).unwrap_or_default(),
    )]))
}

fn err_text(message: String) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::error(vec![Content::text(message)]))
}

#[tool_router]
impl TriageService {
    /// Liveness check
    #[tool(description = "Health check; echoes the message back.")]
    pub async fn ping(
        &self,
        Parameters(request): Parameters<PingRequest>,
    ) -> Result<CallToolResult, McpError> {
        let message = request.message.unwrap_or_else(|| "hello".to_string());
        let correlation_id = self.audited("ping", serde_json::json!({"message": &message}), true);
        ok_json(&PingResponse {
            ok: true,
            message,
            correlation_id,
        })
    }

    /// Rank runbooks against a keyword query
    #[tool(description = "Search runbooks by keyword relevance. Returns the top matches with scores in [0,1]; documents with no matching keywords are excluded.")]
    pub async fn search_runbooks(
        &self,
        Parameters(request): Parameters<SearchRunbooksRequest>,
    ) -> Result<CallToolResult, McpError> {
        let limit = request.limit.unwrap_or(DEFAULT_RUNBOOK_LIMIT).clamp(1, 50);
        let corpus = triage_runbooks::corpus_for(&self.runbooks_dir);

        match triage_runbooks::search(corpus.as_ref(), &request.query, limit) {
            Ok(results) => {
                let correlation_id = self.audited(
                    "search_runbooks",
                    serde_json::json!({"query": &request.query, "limit": limit}),
                    true,
                );
                ok_json(&SearchRunbooksResponse {
                    results,
                    correlation_id,
                })
            }
            Err(e) => {
                self.audited(
                    "search_runbooks",
                    serde_json::json!({"query": &request.query, "limit": limit}),
                    false,
                );
                err_text(format!("search_runbooks failed: {e}"))
            }
        }
    }

    /// Active alerts from the configured provider
    #[tool(description = "Fetch active alerts for the given services from the alert provider.")]
    pub async fn fetch_alerts(
        &self,
        Parameters(request): Parameters<FetchAlertsRequest>,
    ) -> Result<CallToolResult, McpError> {
        let since_minutes = request.since_minutes.unwrap_or(30).clamp(1, 24 * 60);
        let max_alerts = request.max_alerts.unwrap_or(50).clamp(1, 200);
        let arguments = serde_json::json!({
            "services": &request.services,
            "since_minutes": since_minutes,
            "max_alerts": max_alerts,
        });

        match self
            .alerts
            .fetch_active(&request.services, since_minutes, max_alerts)
            .await
        {
            Ok(alerts) => {
                let correlation_id = self.audited("fetch_alerts", arguments, true);
                ok_json(&FetchAlertsResponse {
                    alerts,
                    correlation_id,
                })
            }
            Err(e) => {
                self.audited("fetch_alerts", arguments, false);
                err_text(format!("fetch_alerts failed: {e}"))
            }
        }
    }

    /// Single fetch of a validated evidence bundle
    #[tool(description = "Fetch the evidence bundle for an incident. found=false means the evidence pipeline has not written it yet.")]
    pub async fn get_evidence(
        &self,
        Parameters(request): Parameters<GetEvidenceRequest>,
    ) -> Result<CallToolResult, McpError> {
        let arguments = serde_json::json!({"incident_id": &request.incident_id});

        match self.fetch_validated("get_evidence", &request.incident_id).await {
            Ok(Some((uri, bundle))) => {
                let correlation_id = self.audited("get_evidence", arguments, true);
                ok_json(&GetEvidenceResponse {
                    found: true,
                    uri: Some(uri),
                    bundle: Some(bundle),
                    correlation_id,
                })
            }
            Ok(None) => {
                let correlation_id = self.audited("get_evidence", arguments, true);
                ok_json(&GetEvidenceResponse {
                    found: false,
                    uri: None,
                    bundle: None,
                    correlation_id,
                })
            }
            Err(message) => {
                self.audited("get_evidence", arguments, false);
                err_text(message)
            }
        }
    }

    /// Bounded polling for a bundle that may not exist yet
    #[tool(description = "Wait for the evidence bundle of an incident, polling the store until a deadline. Timing out is a normal outcome (found=false), not an error; re-invoke later to keep waiting.")]
    pub async fn await_evidence(
        &self,
        Parameters(request): Parameters<AwaitEvidenceRequest>,
    ) -> Result<CallToolResult, McpError> {
        let timeout = Duration::from_secs(
            request
                .timeout_seconds
                .unwrap_or(DEFAULT_TIMEOUT_SECONDS)
                .clamp(1, 300),
        );
        let poll = Duration::from_secs(request.poll_seconds.unwrap_or(DEFAULT_POLL_SECONDS).max(1));
        let arguments = serde_json::json!({
            "incident_id": &request.incident_id,
            "timeout_seconds": timeout.as_secs(),
            "poll_seconds": poll.as_secs(),
        });

        let incident_id = request.incident_id.clone();
        let store = Arc::clone(&self.store);
        let outcome = await_bundle(|| store.get(&incident_id), timeout, poll).await;

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                self.audited("await_evidence", arguments, false);
                return err_text(format!(
                    "await_evidence failed for incident {}: {e}",
                    request.incident_id
                ));
            }
        };

        let (uri, bundle) = match outcome.bundle {
            Some(stored) => match EvidenceBundle::from_json(stored.raw) {
                Ok(bundle) => (Some(stored.uri), Some(bundle)),
                Err(e) => {
                    self.audited("await_evidence", arguments, false);
                    return err_text(format!(
                        "await_evidence failed for incident {}: {e}",
                        request.incident_id
                    ));
                }
            },
            None => (None, None),
        };

        let correlation_id = self.audited("await_evidence", arguments, true);
        ok_json(&AwaitEvidenceResponse {
            found: outcome.found,
            attempts: outcome.attempts,
            waited_seconds: outcome.waited.as_secs(),
            uri,
            bundle,
            correlation_id,
        })
    }

    /// Deterministic triage digest
    #[tool(description = "Derive a prioritized triage summary (priority, status, headline, findings, next steps) from the incident's evidence bundle.")]
    pub async fn triage_summary(
        &self,
        Parameters(request): Parameters<TriageSummaryRequest>,
    ) -> Result<CallToolResult, McpError> {
        let arguments = serde_json::json!({"incident_id": &request.incident_id});

        match self.fetch_validated("triage_summary", &request.incident_id).await {
            Ok(Some((uri, bundle))) => {
                let summary = triage_synth::summarize(&bundle, Some(&uri));
                let correlation_id = self.audited("triage_summary", arguments, true);
                ok_json(&TriageSummaryResponse {
                    found: true,
                    summary: Some(summary),
                    correlation_id,
                })
            }
            Ok(None) => {
                let correlation_id = self.audited("triage_summary", arguments, true);
                ok_json(&TriageSummaryResponse {
                    found: false,
                    summary: None,
                    correlation_id,
                })
            }
            Err(message) => {
                self.audited("triage_summary", arguments, false);
                err_text(message)
            }
        }
    }

    /// Draft ticket from the bundle
    #[tool(description = "Render a draft Jira ticket (title, labels, markdown body) from the incident's evidence bundle. Nothing is created in any ticketing system.")]
    pub async fn jira_draft(
        &self,
        Parameters(request): Parameters<JiraDraftRequest>,
    ) -> Result<CallToolResult, McpError> {
        let arguments = serde_json::json!({"incident_id": &request.incident_id});

        match self.fetch_validated("jira_draft", &request.incident_id).await {
            Ok(Some((uri, bundle))) => {
                let ticket = triage_synth::draft(&bundle, Some(&uri));
                let correlation_id = self.audited("jira_draft", arguments, true);
                ok_json(&JiraDraftResponse {
                    found: true,
                    ticket: Some(ticket),
                    correlation_id,
                })
            }
            Ok(None) => {
                let correlation_id = self.audited("jira_draft", arguments, true);
                ok_json(&JiraDraftResponse {
                    found: false,
                    ticket: None,
                    correlation_id,
                })
            }
            Err(message) => {
                self.audited("jira_draft", arguments, false);
                err_text(message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn service(dir: &std::path::Path) -> TriageService {
        let audit = AuditLog::file(dir.join("audit.jsonl")).unwrap();
        TriageService::with_parts(
            Arc::new(FsStore::new(dir.join("artifacts"))),
            Arc::new(MockDatadog::new()),
            Arc::new(audit),
            dir.join("runbooks"),
        )
    }

    fn bundle_json(incident_id: &str) -> serde_json::Value {
        json!({
            "incident_id": incident_id,
            "service": "payments-api",
            "time_window": {"start": "2026-08-30T10:00:00Z", "end": "2026-08-30T10:30:00Z"},
            "alerts": [{
                "alert_id": "mock_501",
                "service": "payments-api",
                "name": "5xx rate high",
                "status": "triggered",
                "started_at": "2026-08-30T10:24:00Z",
                "priority": "P1"
            }],
            "generated_at": "2026-08-30T10:30:05Z"
        })
    }

    #[tokio::test]
    async fn fetch_validated_distinguishes_absent_from_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path());

        // Absent bundle: Ok(None).
        let absent = svc.fetch_validated("get_evidence", "inc_x").await.unwrap();
        assert!(absent.is_none());

        // Valid bundle round-trips.
        svc.store.put("inc_1", &bundle_json("inc_1")).await.unwrap();
        let (uri, bundle) = svc
            .fetch_validated("get_evidence", "inc_1")
            .await
            .unwrap()
            .unwrap();
        assert!(uri.ends_with("inc_1.json"));
        assert_eq!(bundle.incident_id, "inc_1");

        // Invalid bundle surfaces the operation and incident id.
        let mut broken = bundle_json("inc_2");
        broken.as_object_mut().unwrap().remove("service");
        svc.store.put("inc_2", &broken).await.unwrap();
        let err = svc.fetch_validated("get_evidence", "inc_2").await.unwrap_err();
        assert!(err.contains("get_evidence"), "got: {err}");
        assert!(err.contains("inc_2"), "got: {err}");
        assert!(err.contains("service"), "got: {err}");
    }

    #[tokio::test]
    async fn audited_always_yields_a_correlation_id() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path());
        let id = svc.audited("ping", json!({}), true);
        assert!(id.starts_with("corr_"));

        let contents = std::fs::read_to_string(dir.path().join("audit.jsonl")).unwrap();
        assert!(contents.contains(&id));
    }

    #[test]
    fn build_store_picks_backend_from_config() {
        let cfg = AppConfig::from_lookup(|_| None).unwrap();
        assert!(build_store(&cfg).is_ok());

        let s3_cfg = AppConfig::from_lookup(|name| {
            match name {
                "ARTIFACT_STORE" => Some("s3".to_string()),
                "S3_ENDPOINT_URL" => Some("http://localhost:9000".to_string()),
                "S3_BUCKET" => Some("triage-artifacts".to_string()),
                "AWS_ACCESS_KEY_ID" => Some("minio".to_string()),
                "AWS_SECRET_ACCESS_KEY" => Some("minio123".to_string()),
                _ => None,
            }
        })
        .unwrap();
        assert!(build_store(&s3_cfg).is_ok());
    }
}
