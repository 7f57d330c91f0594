use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::Result;
use crate::{BundleStore, StoredBundle};

/// Filesystem-backed store: one `<incident_id>.json` document per incident
/// under a flat artifact directory.
#[derive(Debug, Clone)]
pub struct FsStore {
    dir: PathBuf,
}

impl FsStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, incident_id: &str) -> PathBuf {
        self.dir.join(format!("{incident_id}.json"))
    }

    fn uri_for(&self, incident_id: &str) -> String {
        format!("file://{}", self.path_for(incident_id).display())
    }
}

#[async_trait]
impl BundleStore for FsStore {
    async fn get(&self, incident_id: &str) -> Result<Option<StoredBundle>> {
        let path = self.path_for(incident_id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let raw = serde_json::from_slice(&bytes)?;
        Ok(Some(StoredBundle {
            uri: self.uri_for(incident_id),
            raw,
        }))
    }

    async fn put(&self, incident_id: &str, raw: &serde_json::Value) -> Result<String> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let body = serde_json::to_vec_pretty(raw)?;
        tokio::fs::write(self.path_for(incident_id), body).await?;
        Ok(self.uri_for(incident_id))
    }
}
