//! Shared data model for incident triage.
//!
//! The [`EvidenceBundle`] is the contract between the evidence-producing
//! pipeline and every consumer; [`EvidenceBundle::from_json`] is the trust
//! boundary where raw storage bytes become a typed, validated value.

mod bundle;
mod derived;
mod error;

pub use bundle::{
    Alert, AlertProvider, AlertSignal, AlertStatus, EvidenceBundle, IncidentStatus, Link,
    Priority, RunbookHit, Signal, SignalValue, TimeWindow, SCHEMA_VERSION,
};
pub use derived::{JiraDraftTicket, TriageSummary};
pub use error::{Result, ValidationError};
