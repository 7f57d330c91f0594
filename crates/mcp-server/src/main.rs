//! Incident Triage MCP Server
//!
//! Exposes the evidence-correlation and triage-synthesis tools to AI agents
//! via the MCP protocol over stdio.
//!
//! ## Tools
//!
//! - `search_runbooks` - rank runbooks against a keyword query
//! - `fetch_alerts` - active alerts from the configured provider
//! - `get_evidence` / `await_evidence` - fetch (or wait for) an incident's
//!   evidence bundle
//! - `triage_summary` - deterministic prioritized digest of a bundle
//! - `jira_draft` - draft ticket rendered from the same bundle
//!
//! Configuration is environment-driven (`ARTIFACT_STORE`, `AUDIT_MODE`,
//! `RUNBOOKS_DIR`, ...) and validated before the server starts serving.

use anyhow::{Context, Result};
use rmcp::transport::stdio;
use rmcp::ServiceExt;

use triage_audit::AuditMode;
use triage_config::AppConfig;

mod tools;

use tools::TriageService;

#[tokio::main]
async fn main() -> Result<()> {
    // Logging to stderr only (stdout is for MCP protocol)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Stderr)
        .init();

    let config = AppConfig::load().context("invalid configuration")?;
    if config.audit_mode == AuditMode::Stdout {
        log::warn!(
            "AUDIT_MODE=stdout shares the stream with the MCP protocol; \
             set AUDIT_MODE=file when serving stdio"
        );
    }

    log::info!("Starting Incident Triage MCP server");

    let service = TriageService::from_config(&config)?;
    let server = service.serve(stdio()).await?;

    server.waiting().await?;

    log::info!("Incident Triage MCP server stopped");
    Ok(())
}
