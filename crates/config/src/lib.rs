//! Process configuration, read once from the environment at startup.
//!
//! Invalid combinations (an object store selected without credentials, an
//! unknown audit mode) fail here, before any tool is served.

use std::path::PathBuf;

use thiserror::Error;
use triage_audit::AuditMode;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{name} must be one of {expected}, got '{value}'")]
    Invalid {
        name: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("Missing required env vars for ARTIFACT_STORE=s3: {0}")]
    MissingS3Vars(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactStoreKind {
    Fs,
    S3,
}

#[derive(Debug, Clone)]
pub struct S3Config {
    pub endpoint_url: String,
    pub bucket: String,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub audit_mode: AuditMode,
    pub audit_path: String,

    pub artifact_store: ArtifactStoreKind,
    pub artifact_dir: PathBuf,
    pub s3: Option<S3Config>,

    pub runbooks_dir: PathBuf,
}

impl AppConfig {
    /// Read configuration from process environment variables.
    pub fn load() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`AppConfig::load`] but with an injected variable lookup, so
    /// tests never mutate process-global env state.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        let audit_mode = match get("AUDIT_MODE", "stdout").to_lowercase().as_str() {
            "stdout" => AuditMode::Stdout,
            "file" => AuditMode::File,
            other => {
                return Err(ConfigError::Invalid {
                    name: "AUDIT_MODE",
                    value: other.to_string(),
                    expected: "'stdout' or 'file'",
                })
            }
        };

        let artifact_store = match get("ARTIFACT_STORE", "fs").to_lowercase().as_str() {
            "fs" => ArtifactStoreKind::Fs,
            "s3" => ArtifactStoreKind::S3,
            other => {
                return Err(ConfigError::Invalid {
                    name: "ARTIFACT_STORE",
                    value: other.to_string(),
                    expected: "'fs' or 's3'",
                })
            }
        };

        let s3 = if artifact_store == ArtifactStoreKind::S3 {
            let mut missing = Vec::new();
            let mut require = |name: &'static str| {
                lookup(name).filter(|v| !v.is_empty()).unwrap_or_else(|| {
                    missing.push(name);
                    String::new()
                })
            };
            let endpoint_url = require("S3_ENDPOINT_URL");
            let bucket = require("S3_BUCKET");
            let access_key_id = require("AWS_ACCESS_KEY_ID");
            let secret_access_key = require("AWS_SECRET_ACCESS_KEY");
            if !missing.is_empty() {
                return Err(ConfigError::MissingS3Vars(missing.join(", ")));
            }
            Some(S3Config {
                endpoint_url,
                bucket,
                region: get("S3_REGION", "us-east-1"),
                access_key_id,
                secret_access_key,
            })
        } else {
            None
        };

        Ok(AppConfig {
            audit_mode,
            audit_path: get("AUDIT_PATH", "audit.jsonl"),
            artifact_store,
            artifact_dir: PathBuf::from(get("ARTIFACT_DIR", "./artifacts")),
            s3,
            runbooks_dir: PathBuf::from(get("RUNBOOKS_DIR", "./runbooks")),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        let map: HashMap<&str, &str> = pairs.iter().copied().collect();
        move |name| map.get(name).map(|v| v.to_string())
    }

    #[test]
    fn defaults_are_local_first() {
        let cfg = AppConfig::from_lookup(env(&[])).unwrap();
        assert_eq!(cfg.audit_mode, AuditMode::Stdout);
        assert_eq!(cfg.artifact_store, ArtifactStoreKind::Fs);
        assert!(cfg.s3.is_none());
        assert_eq!(cfg.runbooks_dir, PathBuf::from("./runbooks"));
    }

    #[test]
    fn s3_without_credentials_fails_fast_listing_vars() {
        let err = AppConfig::from_lookup(env(&[
            ("ARTIFACT_STORE", "s3"),
            ("S3_BUCKET", "triage-artifacts"),
        ]))
        .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("S3_ENDPOINT_URL"), "got: {msg}");
        assert!(msg.contains("AWS_ACCESS_KEY_ID"), "got: {msg}");
        assert!(msg.contains("AWS_SECRET_ACCESS_KEY"), "got: {msg}");
        assert!(!msg.contains("S3_BUCKET"), "got: {msg}");
    }

    #[test]
    fn complete_s3_config_parses() {
        let cfg = AppConfig::from_lookup(env(&[
            ("ARTIFACT_STORE", "s3"),
            ("S3_ENDPOINT_URL", "http://localhost:9000"),
            ("S3_BUCKET", "triage-artifacts"),
            ("AWS_ACCESS_KEY_ID", "minio"),
            ("AWS_SECRET_ACCESS_KEY", "minio123"),
        ]))
        .unwrap();
        let s3 = cfg.s3.unwrap();
        assert_eq!(s3.bucket, "triage-artifacts");
        assert_eq!(s3.region, "us-east-1");
    }

    #[test]
    fn unknown_audit_mode_rejected() {
        let err = AppConfig::from_lookup(env(&[("AUDIT_MODE", "syslog")])).unwrap_err();
        assert!(err.to_string().contains("AUDIT_MODE"));
    }

    #[test]
    fn unknown_store_kind_rejected() {
        let err = AppConfig::from_lookup(env(&[("ARTIFACT_STORE", "gcs")])).unwrap_err();
        assert!(err.to_string().contains("ARTIFACT_STORE"));
    }
}
