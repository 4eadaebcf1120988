//! Match source trait and structured fetch errors.
//!
//! The MatchSource trait abstracts over where match data comes from (the
//! open-data HTTP feed, recorded fixtures) so the pipeline can be driven by a
//! fake in tests.

use crate::domain::{CompetitionSeason, MatchId};
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Whether a failure is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    Transient,
    Permanent,
}

/// Structured error for a single fetch.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("rate limited by provider: {url}")]
    RateLimited { url: String },

    #[error("server error HTTP {status} for {url}")]
    Server { status: u16, url: String },

    #[error("client error HTTP {status} for {url}")]
    Client { status: u16, url: String },

    #[error("response could not be decoded: {0}")]
    Decode(String),

    #[error("refusing insecure URL: {0}")]
    InsecureUrl(String),

    #[error("HTTP client setup failed: {0}")]
    Setup(String),
}

impl FetchError {
    /// I/O errors, timeouts, 5xx and 429 are transient; everything else is permanent.
    pub fn class(&self) -> FailureClass {
        match self {
            FetchError::Network(_)
            | FetchError::Timeout(_)
            | FetchError::RateLimited { .. }
            | FetchError::Server { .. } => FailureClass::Transient,
            FetchError::Client { .. }
            | FetchError::Decode(_)
            | FetchError::InsecureUrl(_)
            | FetchError::Setup(_) => FailureClass::Permanent,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.class() == FailureClass::Transient
    }
}

/// Raw events for one match, as returned by the feed.
///
/// Records are kept as untyped JSON so that one malformed record cannot
/// poison the decoding of its neighbours.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedEvents {
    pub match_id: MatchId,
    pub records: Vec<Value>,
    pub size_bytes: usize,
}

/// A source of match listings and per-match event streams.
#[async_trait]
pub trait MatchSource: Send + Sync {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// Match metadata objects for one competition season.
    async fn list_matches(&self, target: CompetitionSeason) -> Result<Vec<Value>, FetchError>;

    /// Raw event records for one match.
    async fn fetch_events(&self, match_id: MatchId) -> Result<FetchedEvents, FetchError>;
}
