//! Local driver for the incident triage tools.
//!
//! Runs the same operations the MCP server exposes, against the configured
//! store and runbook directory. JSON goes to stdout; logs go to stderr.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use triage_audit::{AuditLog, AuditMode};
use triage_config::{AppConfig, ArtifactStoreKind};
use triage_domain::EvidenceBundle;
use triage_store::{await_bundle, BundleStore, FsStore, ObjectStore};

mod demo;

#[derive(Parser)]
#[command(name = "triage")]
#[command(about = "Incident evidence correlation and triage synthesis", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank runbooks against a keyword query
    Search {
        query: String,

        /// Maximum number of results
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },

    /// Fetch an incident's evidence bundle once
    Get { incident_id: String },

    /// Wait for an incident's evidence bundle with bounded polling
    Await {
        incident_id: String,

        /// Give up after this many seconds
        #[arg(long, default_value_t = 30)]
        timeout_seconds: u64,

        /// Seconds between fetch attempts
        #[arg(long, default_value_t = 2)]
        poll_seconds: u64,
    },

    /// Derive the triage summary for an incident
    Summarize { incident_id: String },

    /// Render a draft ticket for an incident
    Draft { incident_id: String },

    /// Write a synthetic evidence bundle to the store (demo producer)
    SeedDemo {
        incident_id: String,

        #[arg(long, default_value = "payments-api")]
        service: String,

        /// Evidence window length in minutes
        #[arg(long, default_value_t = 30)]
        window_minutes: i64,
    },
}

/// Uniform output envelope: payload plus the audit correlation id.
#[derive(Serialize)]
struct Envelope<T: Serialize> {
    #[serde(flatten)]
    payload: T,
    correlation_id: String,
}

#[derive(Serialize)]
struct FetchOutput {
    found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bundle: Option<EvidenceBundle>,
}

#[derive(Serialize)]
struct AwaitOutput {
    found: bool,
    attempts: u32,
    waited_seconds: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bundle: Option<EvidenceBundle>,
}

fn build_store(config: &AppConfig) -> Result<Arc<dyn BundleStore>> {
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

fn build_audit(config: &AppConfig) -> Result<AuditLog> {
    match config.audit_mode {
        AuditMode::Stdout => Ok(AuditLog::stdout()),
        AuditMode::File => AuditLog::file(&config.audit_path)
            .with_context(|| format!("cannot open audit log at {}", config.audit_path)),
    }
}

fn print_json<T: Serialize>(payload: T, correlation_id: String) -> Result<()> {
    let envelope = Envelope {
        payload,
        correlation_id,
    };
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(())
}

/// Fetch and validate; absence is `Ok(None)`.
async fn fetch_validated(
    store: &dyn BundleStore,
    incident_id: &str,
) -> Result<Option<(String, EvidenceBundle)>> {
    let stored = store
        .get(incident_id)
        .await
        .with_context(|| format!("fetch failed for incident {incident_id}"))?;
    match stored {
        None => Ok(None),
        Some(stored) => {
            let bundle = EvidenceBundle::from_json(stored.raw)
                .with_context(|| format!("invalid bundle for incident {incident_id}"))?;
            Ok(Some((stored.uri, bundle)))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter))
        .target(env_logger::Target::Stderr)
        .init();

    let config = AppConfig::load().context("invalid configuration")?;
    log::info!(
        "artifact store: {:?}, audit mode: {:?}",
        config.artifact_store,
        config.audit_mode
    );
    let store = build_store(&config)?;
    let audit = build_audit(&config)?;

    match cli.command {
        Commands::Search { query, limit } => {
            let corpus = triage_runbooks::corpus_for(&config.runbooks_dir);
            let results = triage_runbooks::search(corpus.as_ref(), &query, limit)?;
            let corr = audit.record(
                "search_runbooks",
                serde_json::json!({"query": query, "limit": limit}),
                true,
                None,
                None,
            )?;
            print_json(serde_json::json!({ "results": results }), corr)?;
        }

        Commands::Get { incident_id } => {
            let fetched = fetch_validated(store.as_ref(), &incident_id).await;
            let ok = fetched.is_ok();
            let corr = audit.record(
                "get_evidence",
                serde_json::json!({"incident_id": incident_id}),
                ok,
                None,
                None,
            )?;
            let (uri, bundle) = match fetched? {
                Some((uri, bundle)) => (Some(uri), Some(bundle)),
                None => (None, None),
            };
            print_json(
                FetchOutput {
                    found: bundle.is_some(),
                    uri,
                    bundle,
                },
                corr,
            )?;
        }

        Commands::Await {
            incident_id,
            timeout_seconds,
            poll_seconds,
        } => {
            let outcome = await_bundle(
                || store.get(&incident_id),
                Duration::from_secs(timeout_seconds),
                Duration::from_secs(poll_seconds.max(1)),
            )
            .await?;
            let corr = audit.record(
                "await_evidence",
                serde_json::json!({
                    "incident_id": &incident_id,
                    "timeout_seconds": timeout_seconds,
                    "poll_seconds": poll_seconds,
                }),
                true,
                Some(serde_json::json!({"attempts": outcome.attempts})),
                None,
            )?;
            let (uri, bundle) = match outcome.bundle {
                Some(stored) => {
                    let bundle = EvidenceBundle::from_json(stored.raw)
                        .with_context(|| format!("invalid bundle for incident {incident_id}"))?;
                    (Some(stored.uri), Some(bundle))
                }
                None => (None, None),
            };
            print_json(
                AwaitOutput {
                    found: outcome.found,
                    attempts: outcome.attempts,
                    waited_seconds: outcome.waited.as_secs(),
                    uri,
                    bundle,
                },
                corr,
            )?;
        }

        Commands::Summarize { incident_id } => {
            match fetch_validated(store.as_ref(), &incident_id).await? {
                Some((uri, bundle)) => {
                    let summary = triage_synth::summarize(&bundle, Some(&uri));
                    let corr = audit.record(
                        "triage_summary",
                        serde_json::json!({"incident_id": incident_id}),
                        true,
                        None,
                        None,
                    )?;
                    print_json(serde_json::json!({ "found": true, "summary": summary }), corr)?;
                }
                None => {
                    let corr = audit.record(
                        "triage_summary",
                        serde_json::json!({"incident_id": incident_id}),
                        true,
                        None,
                        None,
                    )?;
                    print_json(serde_json::json!({ "found": false }), corr)?;
                }
            }
        }

        Commands::Draft { incident_id } => {
            match fetch_validated(store.as_ref(), &incident_id).await? {
                Some((uri, bundle)) => {
                    let ticket = triage_synth::draft(&bundle, Some(&uri));
                    let corr = audit.record(
                        "jira_draft",
                        serde_json::json!({"incident_id": incident_id}),
                        true,
                        None,
                        None,
                    )?;
                    print_json(serde_json::json!({ "found": true, "ticket": ticket }), corr)?;
                }
                None => {
                    let corr = audit.record(
                        "jira_draft",
                        serde_json::json!({"incident_id": incident_id}),
                        true,
                        None,
                        None,
                    )?;
                    print_json(serde_json::json!({ "found": false }), corr)?;
                }
            }
        }

        Commands::SeedDemo {
            incident_id,
            service,
            window_minutes,
        } => {
            let bundle = demo::demo_bundle(&incident_id, &service, window_minutes, chrono::Utc::now());
            let raw = serde_json::to_value(&bundle)?;
            let uri = store.put(&incident_id, &raw).await?;
            let corr = audit.record(
                "seed_demo",
                serde_json::json!({"incident_id": incident_id, "service": service}),
                true,
                None,
                None,
            )?;
            print_json(serde_json::json!({ "uri": uri }), corr)?;
        }
    }

    Ok(())
}
