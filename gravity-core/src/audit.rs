//! Audit trail — JSONL append-only record of every pipeline decision.
//!
//! One JSON object per line: `{timestamp, event_type, agent, details}`, with
//! the timestamp in UTC ISO-8601 and a trailing `Z`. The file is never
//! rewritten, only appended to.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Agent names used in audit records.
pub mod agent {
    pub const SYSTEM: &str = "System";
    pub const SUPERVISOR: &str = "SupervisorAgent";
    pub const FETCHER: &str = "FetcherAgent";
    pub const ENRICHER: &str = "EnricherAgent";
    pub const LOADER: &str = "LoaderAgent";
    pub const VALIDATOR: &str = "ValidatorAgent";
}

/// A single audit line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: String,
    pub event_type: String,
    pub agent: String,
    pub details: Value,
}

impl AuditEntry {
    pub fn now(event_type: &str, agent: &str, details: Value) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            event_type: event_type.to_string(),
            agent: agent.to_string(),
            details,
        }
    }
}

/// Where audit records go.
///
/// Recording never fails from the caller's point of view: a sink that cannot
/// persist a record reports it through `tracing` and carries on.
pub trait AuditSink: Send + Sync {
    fn record(&self, event_type: &str, agent: &str, details: Value);
}

/// Audit sink backed by an append-only JSONL file.
pub struct JsonlAudit {
    path: PathBuf,
}

impl JsonlAudit {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, entry: &AuditEntry) -> io::Result<()> {
        let json = serde_json::to_string(entry)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{json}")?;
        file.flush()
    }

    /// Read every entry back. Malformed lines are skipped.
    pub fn read_all(&self) -> io::Result<Vec<AuditEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let reader = io::BufReader::new(fs::File::open(&self.path)?);
        let mut entries = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            if let Ok(entry) = serde_json::from_str::<AuditEntry>(&line) {
                entries.push(entry);
            }
        }
        Ok(entries)
    }
}

impl AuditSink for JsonlAudit {
    fn record(&self, event_type: &str, agent: &str, details: Value) {
        let entry = AuditEntry::now(event_type, agent, details);
        if let Err(e) = self.append(&entry) {
            tracing::warn!(
                path = %self.path.display(),
                event_type,
                error = %e,
                "failed to append audit record"
            );
        }
    }
}

/// In-memory sink, for tests and dry runs.
#[derive(Default)]
pub struct MemoryAudit {
    entries: Mutex<Vec<AuditEntry>>,
}

impl MemoryAudit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Number of records with the given event type.
    pub fn count(&self, event_type: &str) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .filter(|e| e.event_type == event_type)
            .count()
    }
}

impl AuditSink for MemoryAudit {
    fn record(&self, event_type: &str, agent: &str, details: Value) {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(AuditEntry::now(event_type, agent, details));
    }
}
