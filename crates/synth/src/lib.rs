//! Derivation of human-facing views from a validated evidence bundle.
//!
//! Both operations are pure apart from the generation timestamp: the same
//! bundle and a frozen clock always produce byte-identical output. Nothing
//! here performs I/O; fetching and validation happen upstream.

mod summary;
mod ticket;

pub use summary::{summarize, summarize_at, FALLBACK_NEXT_STEPS, PREFERRED_SIGNAL_KEYS};
pub use ticket::{draft, draft_at, slugify};
