//! Open-data HTTP source.
//!
//! Fetches match listings and event streams as JSON over HTTPS. Every call has
//! a hard timeout and runs under a [`RetryPolicy`]; each attempt, success and
//! failure is written to the audit trail.

use super::provider::{FetchError, FetchedEvents, MatchSource};
use super::retry::RetryPolicy;
use crate::audit::{agent, AuditSink};
use crate::domain::{CompetitionSeason, MatchId};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Public open-data mirror.
pub const DEFAULT_BASE_URL: &str = "https://raw.githubusercontent.com/statsbomb/open-data/master/data";

const SOURCE_LABEL: &str = "StatsBomb";

/// Open-data HTTP source.
///
/// Owns its transport handle; the connection pool is released when the
/// client is dropped.
pub struct StatsBombClient {
    client: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
    audit: Arc<dyn AuditSink>,
}

impl StatsBombClient {
    /// Build a client. Only `https://` base URLs are accepted and certificate
    /// validation stays on.
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        retry: RetryPolicy,
        audit: Arc<dyn AuditSink>,
    ) -> Result<Self, FetchError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if !base_url.starts_with("https://") {
            return Err(FetchError::InsecureUrl(base_url));
        }

        let client = reqwest::Client::builder()
            .https_only(true)
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Setup(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            retry,
            audit,
        })
    }

    pub fn listing_url(&self, target: CompetitionSeason) -> String {
        format!(
            "{}/matches/{}/{}.json",
            self.base_url, target.competition_id, target.season_id
        )
    }

    pub fn events_url(&self, match_id: MatchId) -> String {
        format!("{}/events/{}.json", self.base_url, match_id)
    }

    /// GET a JSON array with retry. Returns the elements and the body size.
    async fn get_json_array(&self, url: &str, unit: Value) -> Result<(Vec<Value>, usize), FetchError> {
        let trace = FetchTrace {
            source: SOURCE_LABEL,
            url,
            unit: &unit,
        };
        audited_fetch(&self.retry, self.audit.as_ref(), trace, |_| self.get_once(url)).await
    }

    async fn get_once(&self, url: &str) -> Result<(Vec<Value>, usize), FetchError> {
        let resp = self.client.get(url).send().await.map_err(map_transport_error)?;
        classify_status(resp.status(), url)?;

        let body = resp.bytes().await.map_err(map_transport_error)?;
        let size = body.len();
        let records: Vec<Value> = serde_json::from_slice(&body)
            .map_err(|e| FetchError::Decode(format!("{url}: {e}")))?;
        Ok((records, size))
    }
}

#[async_trait]
impl MatchSource for StatsBombClient {
    fn name(&self) -> &str {
        "statsbomb_open_data"
    }

    async fn list_matches(&self, target: CompetitionSeason) -> Result<Vec<Value>, FetchError> {
        let url = self.listing_url(target);
        let (records, _) = self
            .get_json_array(&url, json!({"type": "matches", "target": target.to_string()}))
            .await?;
        Ok(records)
    }

    async fn fetch_events(&self, match_id: MatchId) -> Result<FetchedEvents, FetchError> {
        let url = self.events_url(match_id);
        let (records, size_bytes) = self
            .get_json_array(&url, json!({"type": "events", "match_id": match_id}))
            .await?;
        Ok(FetchedEvents {
            match_id,
            records,
            size_bytes,
        })
    }
}

/// Identifies a fetch in audit records.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FetchTrace<'a> {
    pub source: &'a str,
    pub url: &'a str,
    pub unit: &'a Value,
}

/// Run `op` under `policy`, auditing every attempt, each success with its
/// byte size, each failure, and exhaustion of the retry budget.
pub(crate) async fn audited_fetch<F, Fut>(
    policy: &RetryPolicy,
    audit: &dyn AuditSink,
    trace: FetchTrace<'_>,
    mut op: F,
) -> Result<(Vec<Value>, usize), FetchError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<(Vec<Value>, usize), FetchError>>,
{
    let FetchTrace { source, url, unit } = trace;
    let result = policy
        .execute(|attempt| {
            audit.record(
                "fetch_start",
                agent::FETCHER,
                json!({"source": source, "url": url, "unit": unit, "attempt": attempt}),
            );
            let call = op(attempt);
            async move {
                match call.await {
                    Ok((records, size)) => {
                        audit.record(
                            "fetch_success",
                            agent::FETCHER,
                            json!({"source": source, "unit": unit, "size_bytes": size, "attempt": attempt}),
                        );
                        Ok((records, size))
                    }
                    Err(e) => {
                        audit.record(
                            "fetch_error",
                            agent::FETCHER,
                            json!({
                                "source": source,
                                "unit": unit,
                                "attempt": attempt,
                                "transient": e.is_transient(),
                                "error": e.to_string(),
                            }),
                        );
                        Err(e)
                    }
                }
            }
        })
        .await;

    if let Err(e) = &result {
        if e.is_transient() {
            audit.record(
                "fetch_exhausted",
                agent::FETCHER,
                json!({
                    "source": source,
                    "unit": unit,
                    "attempts": policy.max_attempts,
                    "error": e.to_string(),
                }),
            );
        }
    }
    result
}

/// Map an HTTP status to `Ok` or the matching error class.
pub fn classify_status(status: StatusCode, url: &str) -> Result<(), FetchError> {
    if status.is_success() {
        return Ok(());
    }
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(FetchError::RateLimited {
            url: url.to_string(),
        });
    }
    if status.is_server_error() {
        return Err(FetchError::Server {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }
    Err(FetchError::Client {
        status: status.as_u16(),
        url: url.to_string(),
    })
}

fn map_transport_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout(e.to_string())
    } else if e.is_builder() {
        FetchError::Setup(e.to_string())
    } else if e.is_decode() {
        FetchError::Decode(e.to_string())
    } else {
        FetchError::Network(e.to_string())
    }
}
