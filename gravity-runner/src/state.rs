//! Pipeline state: status, stage payloads, work queue, run summary.

use crate::error::{ErrorKind, PipelineError};
use crate::validator::QualityReport;
use chrono::{NaiveDate, Utc};
use gravity_core::data::FetchedEvents;
use gravity_core::domain::{CompetitionSeason, EnrichedPayload, MatchId};
use gravity_core::store::{FlushReport, UpsertCounts};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid target date '{0}' (expected 'today' or YYYY-MM-DD)")]
pub struct TargetDateError(pub String);

/// The day a run is for. Parsed from `today` or `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetDate(pub NaiveDate);

impl TargetDate {
    /// Parse relative to an explicit `today`.
    pub fn parse_with_today(input: &str, today: NaiveDate) -> Result<Self, TargetDateError> {
        let trimmed = input.trim();
        if trimmed.eq_ignore_ascii_case("today") {
            return Ok(Self(today));
        }
        NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
            .map(Self)
            .map_err(|_| TargetDateError(input.to_string()))
    }
}

impl FromStr for TargetDate {
    type Err = TargetDateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_with_today(s, Utc::now().date_naive())
    }
}

impl fmt::Display for TargetDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

/// Routing status. The orchestrator dispatches on this alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    Planning,
    Fetching,
    Enriching,
    Loading,
    Validating,
    Supervising,
    Done,
    Failed,
}

impl PipelineStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStatus::Planning => "planning",
            PipelineStatus::Fetching => "fetching",
            PipelineStatus::Enriching => "enriching",
            PipelineStatus::Loading => "loading",
            PipelineStatus::Validating => "validating",
            PipelineStatus::Supervising => "supervising",
            PipelineStatus::Done => "done",
            PipelineStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineStatus::Done | PipelineStatus::Failed)
    }
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw data for one unit, as handed from the fetcher to the enricher.
#[derive(Debug, Clone)]
pub struct FetchOutput {
    pub match_id: MatchId,
    /// Listing entry for this match, if planning saw one.
    pub metadata: Option<Value>,
    pub events: FetchedEvents,
}

#[derive(Debug, Clone)]
pub struct EnrichOutput {
    pub payload: EnrichedPayload,
    /// Raw records rejected during enrichment.
    pub dropped: usize,
}

#[derive(Debug, Clone)]
pub struct LoadReceipt {
    pub counts: UpsertCounts,
    pub flush: FlushReport,
}

#[derive(Debug, Clone)]
pub struct LoadOutput {
    pub payload: EnrichedPayload,
    pub receipt: LoadReceipt,
}

/// Current status together with whatever the previous node produced.
///
/// Stage data is moved out when a node runs, so nothing from one unit
/// survives into the next.
#[derive(Debug, Clone)]
pub enum Stage {
    Planning,
    Fetching,
    Enriching(FetchOutput),
    Loading(EnrichOutput),
    Validating(LoadOutput),
    Supervising,
    Done,
    Failed,
}

impl Stage {
    pub fn status(&self) -> PipelineStatus {
        match self {
            Stage::Planning => PipelineStatus::Planning,
            Stage::Fetching => PipelineStatus::Fetching,
            Stage::Enriching(_) => PipelineStatus::Enriching,
            Stage::Loading(_) => PipelineStatus::Loading,
            Stage::Validating(_) => PipelineStatus::Validating,
            Stage::Supervising => PipelineStatus::Supervising,
            Stage::Done => PipelineStatus::Done,
            Stage::Failed => PipelineStatus::Failed,
        }
    }
}

/// Mutable state of one run. Owned by the orchestrator loop.
#[derive(Debug)]
pub struct PipelineState {
    pub target_date: TargetDate,
    pub target_competitions: Vec<CompetitionSeason>,
    pub work_queue: VecDeque<MatchId>,
    pub current_unit: Option<MatchId>,
    /// Listing entries keyed by match id; taken when the unit is dequeued.
    pub listings: HashMap<MatchId, Value>,
    pub stage: Stage,
    pub errors: Vec<PipelineError>,
    pub quality_reports: Vec<QualityReport>,
    pub units_completed: usize,
    pub dropped_records: usize,
    /// Set once planning has populated the queue.
    pub planned: bool,
}

impl PipelineState {
    pub fn new(target_date: TargetDate, target_competitions: Vec<CompetitionSeason>) -> Self {
        Self {
            target_date,
            target_competitions,
            work_queue: VecDeque::new(),
            current_unit: None,
            listings: HashMap::new(),
            stage: Stage::Planning,
            errors: Vec::new(),
            quality_reports: Vec::new(),
            units_completed: 0,
            dropped_records: 0,
            planned: false,
        }
    }

    pub fn status(&self) -> PipelineStatus {
        self.stage.status()
    }

    pub fn into_summary(self) -> RunSummary {
        RunSummary {
            status: self.status(),
            target_date: self.target_date,
            units_completed: self.units_completed,
            errors: self.errors,
            quality_reports: self.quality_reports,
            dropped_records: self.dropped_records,
        }
    }
}

/// Outcome of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub status: PipelineStatus,
    pub target_date: TargetDate,
    pub units_completed: usize,
    pub errors: Vec<PipelineError>,
    pub quality_reports: Vec<QualityReport>,
    pub dropped_records: usize,
}

impl RunSummary {
    /// Occurrences of one error kind.
    ///
    /// Record drops and quality anomalies are not kept in `errors`; they are
    /// counted from `dropped_records` and the failing reports.
    pub fn count_of(&self, kind: ErrorKind) -> usize {
        match kind {
            ErrorKind::RecordValidation => self.dropped_records,
            ErrorKind::QualityAnomaly => self.quality_reports.iter().filter(|r| !r.passed).count(),
            _ => self.errors.iter().filter(|e| e.kind == kind).count(),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.status == PipelineStatus::Done
    }
}
