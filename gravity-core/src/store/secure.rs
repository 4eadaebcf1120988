//! Encrypted on-disk store for the `matches` and `events` tables.
//!
//! Layout under the data directory:
//!
//! ```text
//! {data_dir}/matches.{generation}.parquet.enc
//! {data_dir}/events.{generation}.parquet.enc
//! {data_dir}/manifest.json
//! ```
//!
//! A session loads both tables into memory (decrypting and verifying them
//! against the manifest), applies upserts keyed by match id and event id, and
//! on flush writes each table as a sealed Parquet blob of the next generation.
//! Renaming `manifest.json` into place is the commit point: readers only ever
//! open the blobs the manifest names, so a flush that fails part way leaves
//! the previous generation intact.

use super::tables::{
    events_from_parquet, events_to_dataframe, matches_from_parquet, matches_to_dataframe,
    to_parquet_bytes, EventRow, MatchRow,
};
use super::vault::{Vault, VaultError};
use crate::domain::EnrichedPayload;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

pub const MATCHES_TABLE: &str = "matches";
pub const EVENTS_TABLE: &str = "events";
const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(String),

    #[error("parquet error: {0}")]
    Parquet(String),

    #[error(transparent)]
    Vault(#[from] VaultError),

    #[error("integrity check failed for table '{table}': {reason}")]
    Integrity { table: String, reason: String },

    #[error("manifest error: {0}")]
    Manifest(String),
}

/// Rows touched by one upsert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertCounts {
    pub matches: usize,
    pub events: usize,
}

/// What a flush wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlushReport {
    pub match_rows: usize,
    pub event_rows: usize,
    pub bytes_written: usize,
}

/// Per-table entry in `manifest.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableManifest {
    pub file: String,
    pub rows: usize,
    /// BLAKE3 of the plaintext Parquet bytes.
    pub data_hash: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Incremented by every committed flush.
    #[serde(default)]
    pub generation: u64,
    pub tables: BTreeMap<String, TableManifest>,
    pub flushed_at: DateTime<Utc>,
}

/// Decrypted contents of the store, for inspection.
#[derive(Debug, Clone, Default)]
pub struct StoreSnapshot {
    pub matches: Vec<MatchRow>,
    pub events: Vec<EventRow>,
    pub manifest: Option<Manifest>,
}

/// A storage engine the loader can open scoped sessions against.
pub trait Storage: Send + Sync {
    fn open_session(&self) -> Result<Box<dyn StorageSession + '_>, StoreError>;
}

/// A unit of storage work. Dropping the session releases it.
pub trait StorageSession {
    /// Insert or replace the match row and every event row of `payload`.
    fn upsert(&mut self, payload: &EnrichedPayload) -> Result<UpsertCounts, StoreError>;

    /// Persist all tables as encrypted artifacts.
    fn flush_encrypted(&mut self) -> Result<FlushReport, StoreError>;
}

/// Parquet tables sealed with ChaCha20-Poly1305.
#[derive(Debug, Clone)]
pub struct EncryptedStore {
    dir: PathBuf,
    vault: Arc<Vault>,
}

impl EncryptedStore {
    pub fn new(dir: impl Into<PathBuf>, vault: Vault) -> Self {
        Self {
            dir: dir.into(),
            vault: Arc::new(vault),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn table_file(table: &str, generation: u64) -> String {
        format!("{table}.{generation:06}.parquet.enc")
    }

    fn manifest_path(&self) -> PathBuf {
        self.dir.join(MANIFEST_FILE)
    }

    pub fn read_manifest(&self) -> Result<Option<Manifest>, StoreError> {
        let path = self.manifest_path();
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)
            .map_err(|e| StoreError::Io(format!("read {}: {e}", path.display())))?;
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| StoreError::Manifest(e.to_string()))
    }

    /// Decrypt and verify the table the manifest names. Returns `None` if
    /// nothing has been committed for it.
    fn read_table(
        &self,
        table: &str,
        manifest: Option<&Manifest>,
    ) -> Result<Option<Vec<u8>>, StoreError> {
        let Some(entry) = manifest.and_then(|m| m.tables.get(table)) else {
            return Ok(None);
        };
        let path = self.dir.join(&entry.file);
        if !path.exists() {
            return Err(StoreError::Integrity {
                table: table.to_string(),
                reason: format!("manifest names missing file {}", entry.file),
            });
        }
        let blob =
            fs::read(&path).map_err(|e| StoreError::Io(format!("read {}: {e}", path.display())))?;
        let plain = self.vault.open(&blob)?;

        let actual = blake3::hash(&plain).to_hex().to_string();
        if actual != entry.data_hash {
            return Err(StoreError::Integrity {
                table: table.to_string(),
                reason: format!("hash mismatch (manifest {}, file {actual})", entry.data_hash),
            });
        }
        Ok(Some(plain))
    }

    fn check_rows(table: &str, manifest: Option<&Manifest>, rows: usize) -> Result<(), StoreError> {
        if let Some(entry) = manifest.and_then(|m| m.tables.get(table)) {
            if entry.rows != rows {
                return Err(StoreError::Integrity {
                    table: table.to_string(),
                    reason: format!("manifest says {} rows, file has {rows}", entry.rows),
                });
            }
        }
        Ok(())
    }

    /// Decrypt everything currently on disk.
    pub fn snapshot(&self) -> Result<StoreSnapshot, StoreError> {
        let manifest = self.read_manifest()?;

        let matches = match self.read_table(MATCHES_TABLE, manifest.as_ref())? {
            Some(bytes) => matches_from_parquet(bytes)?,
            None => Vec::new(),
        };
        Self::check_rows(MATCHES_TABLE, manifest.as_ref(), matches.len())?;

        let events = match self.read_table(EVENTS_TABLE, manifest.as_ref())? {
            Some(bytes) => events_from_parquet(bytes)?,
            None => Vec::new(),
        };
        Self::check_rows(EVENTS_TABLE, manifest.as_ref(), events.len())?;

        Ok(StoreSnapshot {
            matches,
            events,
            manifest,
        })
    }

    /// Seal `plain` into `file`. Not visible to readers until a manifest
    /// naming it is committed.
    fn write_sealed(&self, file: &str, plain: &[u8]) -> Result<usize, StoreError> {
        let blob = self.vault.seal(plain)?;
        write_atomic(&self.dir.join(file), &blob)?;
        Ok(blob.len())
    }

    /// Commit point of a flush.
    fn write_manifest(&self, manifest: &Manifest) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(manifest)
            .map_err(|e| StoreError::Manifest(e.to_string()))?;
        write_atomic(&self.manifest_path(), json.as_bytes())
    }

    /// Delete blobs of a superseded generation. Failures only leave garbage.
    fn remove_superseded(&self, previous: &Manifest, current: &Manifest) {
        for entry in previous.tables.values() {
            if current.tables.values().any(|e| e.file == entry.file) {
                continue;
            }
            let path = self.dir.join(&entry.file);
            if let Err(e) = fs::remove_file(&path) {
                tracing::warn!(path = %path.display(), error = %e, "could not remove superseded blob");
            }
        }
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    fs::write(&tmp_path, bytes)
        .map_err(|e| StoreError::Io(format!("write {}: {e}", tmp_path.display())))?;
    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        StoreError::Io(format!("atomic rename to {} failed: {e}", path.display()))
    })
}

impl Storage for EncryptedStore {
    fn open_session(&self) -> Result<Box<dyn StorageSession + '_>, StoreError> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| StoreError::Io(format!("create {}: {e}", self.dir.display())))?;

        let snapshot = self.snapshot()?;
        tracing::debug!(
            dir = %self.dir.display(),
            matches = snapshot.matches.len(),
            events = snapshot.events.len(),
            "storage session opened"
        );

        Ok(Box::new(EncryptedSession {
            store: self,
            committed: snapshot.manifest,
            matches: snapshot.matches.into_iter().map(|r| (r.match_id, r)).collect(),
            events: snapshot
                .events
                .into_iter()
                .map(|r| (r.event_id.clone(), r))
                .collect(),
            flushed: true,
        }))
    }
}

struct EncryptedSession<'a> {
    store: &'a EncryptedStore,
    /// Manifest the session was loaded from.
    committed: Option<Manifest>,
    matches: BTreeMap<i64, MatchRow>,
    events: HashMap<String, EventRow>,
    flushed: bool,
}

impl StorageSession for EncryptedSession<'_> {
    fn upsert(&mut self, payload: &EnrichedPayload) -> Result<UpsertCounts, StoreError> {
        let row = MatchRow::from_payload(payload);
        let match_id = row.match_id;
        self.matches.insert(match_id, row);

        // The payload carries the match's full event set.
        self.events.retain(|_, e| e.match_id != match_id);

        for event in &payload.events {
            let row = EventRow::from_event(event);
            self.events.insert(row.event_id.clone(), row);
        }
        self.flushed = false;

        Ok(UpsertCounts {
            matches: 1,
            events: payload.events.len(),
        })
    }

    fn flush_encrypted(&mut self) -> Result<FlushReport, StoreError> {
        let match_rows: Vec<&MatchRow> = self.matches.values().collect();
        let mut event_rows: Vec<&EventRow> = self.events.values().collect();
        event_rows.sort_by(|a, b| {
            (a.match_id, a.index, &a.event_id).cmp(&(b.match_id, b.index, &b.event_id))
        });

        let matches_bytes = to_parquet_bytes(&mut matches_to_dataframe(&match_rows)?)?;
        let events_bytes = to_parquet_bytes(&mut events_to_dataframe(&event_rows)?)?;

        let generation = self.committed.as_ref().map_or(0, |m| m.generation) + 1;
        let mut tables = BTreeMap::new();
        let mut bytes_written = 0;
        for (table, plain, rows) in [
            (MATCHES_TABLE, &matches_bytes, match_rows.len()),
            (EVENTS_TABLE, &events_bytes, event_rows.len()),
        ] {
            let file = EncryptedStore::table_file(table, generation);
            bytes_written += self.store.write_sealed(&file, plain)?;
            tables.insert(
                table.to_string(),
                TableManifest {
                    file,
                    rows,
                    data_hash: blake3::hash(plain).to_hex().to_string(),
                },
            );
        }
        let manifest = Manifest {
            generation,
            tables,
            flushed_at: Utc::now(),
        };
        self.store.write_manifest(&manifest)?;
        tracing::debug!(generation, "store flush committed");

        if let Some(previous) = self.committed.replace(manifest) {
            if let Some(current) = &self.committed {
                self.store.remove_superseded(&previous, current);
            }
        }
        self.flushed = true;

        Ok(FlushReport {
            match_rows: match_rows.len(),
            event_rows: event_rows.len(),
            bytes_written,
        })
    }
}

impl Drop for EncryptedSession<'_> {
    fn drop(&mut self) {
        if !self.flushed {
            tracing::warn!(
                dir = %self.store.dir.display(),
                "storage session released with unflushed changes"
            );
        } else {
            tracing::debug!(dir = %self.store.dir.display(), "storage session released");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        Event, EventId, Location, Match, MatchId, ShotContext, ShotOutcome, Team,
    };
    use tempfile::TempDir;

    fn payload() -> EnrichedPayload {
        let fixture = Match::placeholder(MatchId(909));
        let shot = Event {
            id: EventId::new("e-2"),
            match_id: MatchId(909),
            index: 2,
            period: 1,
            timestamp: "00:01:10.000".into(),
            minute: 1,
            second: 10,
            type_name: "Shot".into(),
            possession_team: Team::new(1, "Home Team"),
            player: None,
            location: Some(Location::new(110.0, 40.0).unwrap()),
            shot_context: Some(ShotContext {
                xg: 0.25,
                xa: 0.0,
                outcome: ShotOutcome::Goal,
                body_part: "Right Foot".into(),
                distance_to_goal: 10.0,
                angle_to_goal: 0.7,
            }),
        };
        let pass = Event {
            id: EventId::new("e-1"),
            index: 1,
            type_name: "Pass".into(),
            location: None,
            shot_context: None,
            ..shot.clone()
        };
        EnrichedPayload::assemble(fixture, vec![shot, pass], 0.25, 0.0).unwrap()
    }

    fn store(dir: &TempDir, key: &str) -> EncryptedStore {
        EncryptedStore::new(dir.path(), Vault::from_base64(key).unwrap())
    }

    #[test]
    fn upsert_twice_keeps_one_row_per_key() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, &Vault::generate_key());
        let p = payload();

        let mut session = store.open_session().unwrap();
        session.upsert(&p).unwrap();
        session.upsert(&p).unwrap();
        let report = session.flush_encrypted().unwrap();
        drop(session);

        assert_eq!(report.match_rows, 1);
        assert_eq!(report.event_rows, 2);
        let snap = store.snapshot().unwrap();
        assert_eq!(snap.matches.len(), 1);
        assert_eq!(snap.events.len(), 2);
        assert_eq!(snap.events[0].event_id, "e-1");
        assert_eq!(snap.matches[0].total_home_xg, 0.25);
    }

    #[test]
    fn reload_makes_upserts_idempotent_across_sessions() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, &Vault::generate_key());

        for _ in 0..2 {
            let mut session = store.open_session().unwrap();
            session.upsert(&payload()).unwrap();
            session.flush_encrypted().unwrap();
        }

        let snap = store.snapshot().unwrap();
        assert_eq!(snap.matches.len(), 1);
        assert_eq!(snap.events.len(), 2);
        let manifest = snap.manifest.unwrap();
        assert_eq!(manifest.tables[EVENTS_TABLE].rows, 2);
    }

    #[test]
    fn artifacts_are_not_plaintext_parquet() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, &Vault::generate_key());
        let mut session = store.open_session().unwrap();
        session.upsert(&payload()).unwrap();
        session.flush_encrypted().unwrap();
        drop(session);

        let manifest = store.read_manifest().unwrap().unwrap();
        let file = &manifest.tables[MATCHES_TABLE].file;
        let blob = fs::read(dir.path().join(file)).unwrap();
        assert_ne!(&blob[..4], b"PAR1");
        assert!(!dir.path().join(format!("{file}.tmp")).exists());
    }

    #[test]
    fn superseded_generation_is_removed() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, &Vault::generate_key());
        for _ in 0..2 {
            let mut session = store.open_session().unwrap();
            session.upsert(&payload()).unwrap();
            session.flush_encrypted().unwrap();
        }

        let manifest = store.read_manifest().unwrap().unwrap();
        assert_eq!(manifest.generation, 2);
        let mut files: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        files.sort();
        assert_eq!(
            files,
            [
                "events.000002.parquet.enc",
                "manifest.json",
                "matches.000002.parquet.enc"
            ]
        );
    }

    #[test]
    fn failed_flush_leaves_last_commit_readable() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, &Vault::generate_key());

        let mut session = store.open_session().unwrap();
        session.upsert(&payload()).unwrap();
        session.flush_encrypted().unwrap();
        drop(session);

        // A directory squatting on the next events blob's temp path makes the
        // second table write fail after the matches blob is already on disk.
        let blocker = dir.path().join("events.000002.parquet.enc.tmp");
        fs::create_dir(&blocker).unwrap();

        let mut other = payload();
        other.fixture.id = MatchId(910);
        for event in &mut other.events {
            event.match_id = MatchId(910);
            event.id = EventId::new(format!("910-{}", event.id));
        }
        let mut session = store.open_session().unwrap();
        session.upsert(&other).unwrap();
        assert!(matches!(session.flush_encrypted(), Err(StoreError::Io(_))));
        drop(session);
        fs::remove_dir(&blocker).unwrap();

        let snap = store.snapshot().unwrap();
        assert_eq!(snap.manifest.as_ref().unwrap().generation, 1);
        assert_eq!(snap.matches.len(), 1);
        assert_eq!(snap.matches[0].match_id, 909);

        let mut session = store.open_session().unwrap();
        session.upsert(&other).unwrap();
        session.flush_encrypted().unwrap();
        drop(session);

        let snap = store.snapshot().unwrap();
        assert_eq!(snap.manifest.unwrap().generation, 2);
        assert_eq!(snap.matches.len(), 2);
        assert_eq!(snap.events.len(), 4);
    }

    #[test]
    fn reupsert_replaces_the_match_event_set() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, &Vault::generate_key());

        let mut session = store.open_session().unwrap();
        session.upsert(&payload()).unwrap();
        session.flush_encrypted().unwrap();
        drop(session);

        // Rerun where the pass no longer survives validation.
        let full = payload();
        let shot_only: Vec<Event> = full
            .events
            .iter()
            .filter(|e| e.type_name == "Shot")
            .cloned()
            .collect();
        let rerun = EnrichedPayload::assemble(full.fixture.clone(), shot_only, 0.25, 0.0).unwrap();

        let mut session = store.open_session().unwrap();
        let counts = session.upsert(&rerun).unwrap();
        session.flush_encrypted().unwrap();
        drop(session);

        assert_eq!(counts.events, 1);
        let snap = store.snapshot().unwrap();
        assert_eq!(snap.events.len(), 1);
        assert_eq!(snap.events[0].event_id, "e-2");
    }

    #[test]
    fn wrong_key_cannot_open_existing_store() {
        let dir = TempDir::new().unwrap();
        let writer = store(&dir, &Vault::generate_key());
        let mut session = writer.open_session().unwrap();
        session.upsert(&payload()).unwrap();
        session.flush_encrypted().unwrap();
        drop(session);

        let reader = store(&dir, &Vault::generate_key());
        assert!(matches!(
            reader.open_session().err(),
            Some(StoreError::Vault(VaultError::Decrypt))
        ));
    }

    #[test]
    fn tampered_manifest_hash_is_detected() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, &Vault::generate_key());
        let mut session = store.open_session().unwrap();
        session.upsert(&payload()).unwrap();
        session.flush_encrypted().unwrap();
        drop(session);

        let mut manifest = store.read_manifest().unwrap().unwrap();
        if let Some(entry) = manifest.tables.get_mut(MATCHES_TABLE) {
            entry.data_hash = "0".repeat(64);
        }
        store.write_manifest(&manifest).unwrap();

        assert!(matches!(
            store.snapshot(),
            Err(StoreError::Integrity { ref table, .. }) if table == MATCHES_TABLE
        ));
    }

    #[test]
    fn empty_store_snapshot_is_empty() {
        let dir = TempDir::new().unwrap();
        let snap = store(&dir, &Vault::generate_key()).snapshot().unwrap();
        assert!(snap.matches.is_empty());
        assert!(snap.events.is_empty());
        assert!(snap.manifest.is_none());
    }
}
