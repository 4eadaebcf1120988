//! Error taxonomy for a pipeline run.
//!
//! Component failures are typed per layer ([`EnrichmentError`],
//! [`PersistenceError`], [`FetchError`]) and folded into a run-wide
//! [`PipelineError`] with an [`ErrorKind`] the summary can be queried by.

use gravity_core::data::{FailureClass, FetchError};
use gravity_core::domain::{MatchId, ValidationError};
use gravity_core::store::StoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Retryable network failure that exhausted its retry budget.
    TransientNetwork,
    /// Network failure that is never retried (4xx, bad body, bad URL).
    PermanentNetwork,
    /// A single raw record failed validation and was dropped.
    RecordValidation,
    /// The unit's match metadata or assembled payload was invalid.
    PayloadAssemble,
    /// Storage or encrypted flush failed.
    Persistence,
    /// A quality check found anomalies.
    QualityAnomaly,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::TransientNetwork => "transient_network",
            ErrorKind::PermanentNetwork => "permanent_network",
            ErrorKind::RecordValidation => "record_validation",
            ErrorKind::PayloadAssemble => "payload_assemble",
            ErrorKind::Persistence => "persistence",
            ErrorKind::QualityAnomaly => "quality_anomaly",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&FetchError> for ErrorKind {
    fn from(e: &FetchError) -> Self {
        match e.class() {
            FailureClass::Transient => ErrorKind::TransientNetwork,
            FailureClass::Permanent => ErrorKind::PermanentNetwork,
        }
    }
}

/// One entry of the run-wide error list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineError {
    pub kind: ErrorKind,
    /// The unit being processed, or `None` for planning failures.
    pub unit: Option<MatchId>,
    pub message: String,
}

impl PipelineError {
    pub fn new(kind: ErrorKind, unit: Option<MatchId>, message: impl Into<String>) -> Self {
        Self {
            kind,
            unit,
            message: message.into(),
        }
    }

    pub fn fetch(unit: Option<MatchId>, e: &FetchError) -> Self {
        Self::new(ErrorKind::from(e), unit, e.to_string())
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.unit {
            Some(unit) => write!(f, "[{}] match {}: {}", self.kind, unit, self.message),
            None => write!(f, "[{}] {}", self.kind, self.message),
        }
    }
}

/// Unit-level enrichment failure. Record-level problems never surface here.
#[derive(Debug, Error)]
pub enum EnrichmentError {
    #[error("listing metadata for match {match_id} is invalid: {source}")]
    InvalidMetadata {
        match_id: MatchId,
        #[source]
        source: ValidationError,
    },

    #[error("payload for match {match_id} failed its invariants: {source}")]
    PayloadAssemble {
        match_id: MatchId,
        #[source]
        source: ValidationError,
    },
}

impl EnrichmentError {
    pub fn match_id(&self) -> MatchId {
        match self {
            EnrichmentError::InvalidMetadata { match_id, .. }
            | EnrichmentError::PayloadAssemble { match_id, .. } => *match_id,
        }
    }
}

/// Unit-level persistence failure.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("open storage session: {0}")]
    Session(#[source] StoreError),

    #[error("upsert match {match_id}: {source}")]
    Upsert {
        match_id: MatchId,
        #[source]
        source: StoreError,
    },

    #[error("encrypted flush: {0}")]
    Flush(#[source] StoreError),
}
