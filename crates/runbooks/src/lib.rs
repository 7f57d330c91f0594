//! Runbook index and keyword-relevance scorer.
//!
//! Documents are ranked by how many distinct query tokens appear anywhere in
//! their text. Scores follow `1 - exp(-hits / K)`: zero at zero hits,
//! strictly increasing, asymptotic to 1. Zero-hit documents are excluded from
//! results entirely rather than ranked last.

mod corpus;
mod error;

use std::collections::HashSet;
use std::path::Path;

use triage_domain::RunbookHit;

pub use corpus::{DirCorpus, RunbookCorpus, RunbookDoc, StaticCorpus};
pub use error::{Result, RunbookError};

/// Smoothing constant K in `1 - exp(-hits / K)`. Larger values flatten the
/// curve, requiring more keyword hits to approach 1. Tunable; 4.0 is the
/// production default.
pub const SMOOTHING_K: f64 = 4.0;

const SUMMARY_LINES: usize = 20;
const SUMMARY_MAX_CHARS: usize = 220;

/// Corpus for a configured runbook location: the directory when it exists,
/// the built-in runbooks otherwise, so search never comes up empty-handed on
/// a fresh deployment.
pub fn corpus_for(dir: &Path) -> Box<dyn RunbookCorpus> {
    if dir.exists() {
        Box::new(DirCorpus::new(dir))
    } else {
        log::info!(
            "runbook directory {} not found, using built-in runbooks",
            dir.display()
        );
        Box::new(StaticCorpus::builtin())
    }
}

/// Lower-case and split on any run of non-alphanumeric characters,
/// discarding empty tokens. Applied identically to queries and documents.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Relevance of `text` to the query tokens: distinct tokens that occur as
/// substrings of the lower-cased text, smoothed into [0, 1).
pub fn score(query_tokens: &[String], text: &str) -> f64 {
    let haystack = text.to_lowercase();
    let distinct: HashSet<&str> = query_tokens.iter().map(String::as_str).collect();
    let hits = distinct.iter().filter(|t| haystack.contains(**t)).count();
    1.0 - (-(hits as f64) / SMOOTHING_K).exp()
}

/// Rank a corpus against a query. Results are sorted non-increasing by score
/// with corpus enumeration order as the tie-break, capped at `limit`, and
/// carry scores rounded to 3 decimals.
pub fn search(corpus: &dyn RunbookCorpus, query: &str, limit: usize) -> Result<Vec<RunbookHit>> {
    let query_tokens = tokenize(query);
    let mut scored: Vec<(f64, RunbookHit)> = Vec::new();

    for doc in corpus.documents()? {
        let s = score(&query_tokens, &doc.text);
        if s > 0.0 {
            scored.push((
                s,
                RunbookHit {
                    title: title_of(&doc),
                    summary: summary_of(&doc.text),
                    doc_id: doc.doc_id,
                    score: round3(s),
                },
            ));
        }
    }

    // Stable sort: equal raw scores keep enumeration order.
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(limit);
    Ok(scored.into_iter().map(|(_, hit)| hit).collect())
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// First non-empty line with leading `#` and whitespace stripped; falls back
/// to the document id when the document is blank.
fn title_of(doc: &RunbookDoc) -> String {
    doc.text
        .lines()
        .find(|line| !line.trim().is_empty())
        .map(|line| {
            line.trim_start_matches(|c: char| c == '#' || c.is_whitespace())
                .trim_end()
                .to_string()
        })
        .unwrap_or_else(|| doc.doc_id.clone())
}

fn summary_of(text: &str) -> String {
    let joined = text
        .lines()
        .take(SUMMARY_LINES)
        .collect::<Vec<_>>()
        .join(" ");
    joined.chars().take(SUMMARY_MAX_CHARS).collect()
}
