//! Loading: hand a validated payload to storage and flush it encrypted.

use crate::error::PersistenceError;
use crate::state::LoadReceipt;
use gravity_core::audit::{agent, AuditSink};
use gravity_core::domain::EnrichedPayload;
use gravity_core::store::Storage;
use serde_json::json;
use std::sync::Arc;

pub struct Loader {
    storage: Arc<dyn Storage>,
    audit: Arc<dyn AuditSink>,
}

impl Loader {
    pub fn new(storage: Arc<dyn Storage>, audit: Arc<dyn AuditSink>) -> Self {
        Self { storage, audit }
    }

    /// Upsert the payload and flush. The storage session is scoped to this
    /// call and released on every path out of it.
    pub fn load(&self, payload: &EnrichedPayload) -> Result<LoadReceipt, PersistenceError> {
        let match_id = payload.fixture.id;
        self.audit.record(
            "load_started",
            agent::LOADER,
            json!({"match_id": match_id, "events": payload.events.len()}),
        );

        let result = self.upsert_and_flush(payload);
        match &result {
            Ok(receipt) => {
                tracing::info!(
                    %match_id,
                    match_rows = receipt.flush.match_rows,
                    event_rows = receipt.flush.event_rows,
                    bytes = receipt.flush.bytes_written,
                    "payload persisted"
                );
                self.audit.record(
                    "load_success",
                    agent::LOADER,
                    json!({
                        "match_id": match_id,
                        "events_upserted": receipt.counts.events,
                        "bytes_written": receipt.flush.bytes_written,
                    }),
                );
            }
            Err(e) => {
                tracing::error!(%match_id, error = %e, "load failed");
                self.audit.record(
                    "load_failed",
                    agent::LOADER,
                    json!({"match_id": match_id, "error": e.to_string()}),
                );
            }
        }
        result
    }

    fn upsert_and_flush(&self, payload: &EnrichedPayload) -> Result<LoadReceipt, PersistenceError> {
        let mut session = self.storage.open_session().map_err(PersistenceError::Session)?;
        let counts = session
            .upsert(payload)
            .map_err(|source| PersistenceError::Upsert {
                match_id: payload.fixture.id,
                source,
            })?;
        let flush = session.flush_encrypted().map_err(PersistenceError::Flush)?;
        Ok(LoadReceipt { counts, flush })
    }
}
