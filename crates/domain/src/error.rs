use chrono::{DateTime, Utc};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ValidationError>;

/// Rejection reasons for raw bundle JSON. Validation never repairs input:
/// every variant names the offending field so producers can fix their output.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("invalid evidence bundle: {0}")]
    Malformed(String),

    #[error("runbook_hits[{index}].score out of range [0,1]: {score} (doc {doc_id})")]
    ScoreOutOfRange {
        index: usize,
        doc_id: String,
        score: f64,
    },

    #[error("time_window.start {start} is after time_window.end {end}")]
    WindowInverted {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}
