//! Append-only audit trail.
//!
//! Every externally invoked operation writes exactly one record and gets
//! back a correlation id, which is echoed to the caller so a response can be
//! tied to its audit line.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, AuditError>;

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditMode {
    Stdout,
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub ts: DateTime<Utc>,
    pub correlation_id: String,
    pub tool: String,
    pub arguments: serde_json::Value,
    pub ok: bool,
    pub meta: serde_json::Value,
}

/// JSONL audit sink. `Stdout` mode streams records to standard output;
/// `File` mode appends to a path, creating parent directories on first use.
#[derive(Debug, Clone)]
pub struct AuditLog {
    mode: AuditMode,
    path: PathBuf,
}

impl AuditLog {
    pub fn stdout() -> Self {
        Self {
            mode: AuditMode::Stdout,
            path: PathBuf::new(),
        }
    }

    pub fn file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(Self {
            mode: AuditMode::File,
            path,
        })
    }

    pub fn mode(&self) -> AuditMode {
        self.mode
    }

    /// Mint a fresh correlation id.
    pub fn mint_id() -> String {
        format!("corr_{}", Uuid::new_v4().simple())
    }

    /// Write one record. A caller-supplied `correlation_id` is propagated
    /// unchanged; otherwise a new one is minted. Returns the id either way.
    pub fn record(
        &self,
        tool: &str,
        arguments: serde_json::Value,
        ok: bool,
        meta: Option<serde_json::Value>,
        correlation_id: Option<String>,
    ) -> Result<String> {
        let correlation_id = correlation_id.unwrap_or_else(Self::mint_id);
        let record = AuditRecord {
            ts: Utc::now(),
            correlation_id: correlation_id.clone(),
            tool: tool.to_string(),
            arguments,
            ok,
            meta: meta.unwrap_or_else(|| serde_json::json!({})),
        };
        let line = serde_json::to_string(&record)?;

        match self.mode {
            AuditMode::Stdout => println!("{line}"),
            AuditMode::File => {
                let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
                writeln!(file, "{line}")?;
            }
        }
        Ok(correlation_id)
    }
}
