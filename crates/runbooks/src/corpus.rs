use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::Result;

/// One runbook document: an identifier plus its full text.
#[derive(Debug, Clone)]
pub struct RunbookDoc {
    pub doc_id: String,
    pub text: String,
}

impl RunbookDoc {
    pub fn new(doc_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            doc_id: doc_id.into(),
            text: text.into(),
        }
    }
}

/// Narrow capability interface for anything that can enumerate runbooks.
/// Enumeration order is part of the contract: it is the tie-break for
/// equally-scored search results, so it must be deterministic.
pub trait RunbookCorpus {
    fn documents(&self) -> Result<Vec<RunbookDoc>>;
}

/// In-memory corpus, used for built-in runbooks and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticCorpus {
    docs: Vec<RunbookDoc>,
}

impl StaticCorpus {
    pub fn new(docs: Vec<RunbookDoc>) -> Self {
        Self { docs }
    }

    /// Built-in remediation snippets shipped with the demo deployment.
    pub fn builtin() -> Self {
        Self::new(vec![
            RunbookDoc::new(
                "rb_42",
                "Payments DB timeout mitigation\nIf DB timeouts spike after deploy: rollback, \
                 scale read replicas, check connection pool.",
            ),
            RunbookDoc::new(
                "rb_07",
                "5xx spike checklist\nCheck recent deploys, dependency health, and top failing \
                 endpoints; confirm feature flags.",
            ),
        ])
    }
}

impl RunbookCorpus for StaticCorpus {
    fn documents(&self) -> Result<Vec<RunbookDoc>> {
        Ok(self.docs.clone())
    }
}

/// Directory of `.md` files, one runbook per file; `doc_id` is the file stem.
/// Files are listed in sorted path order so scoring ties stay deterministic
/// across filesystems.
#[derive(Debug, Clone)]
pub struct DirCorpus {
    dir: PathBuf,
}

impl DirCorpus {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl RunbookCorpus for DirCorpus {
    fn documents(&self) -> Result<Vec<RunbookDoc>> {
        if !self.dir.exists() {
            log::warn!("runbook directory {} does not exist", self.dir.display());
            return Ok(Vec::new());
        }

        let mut paths: Vec<PathBuf> = WalkDir::new(&self.dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("md"))
            .collect();
        paths.sort();

        let mut docs = Vec::with_capacity(paths.len());
        for path in paths {
            let doc_id = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_string();
            let text = std::fs::read_to_string(&path)?;
            docs.push(RunbookDoc { doc_id, text });
        }
        Ok(docs)
    }
}
