//! The pipeline state machine.
//!
//! ```text
//! planning ─▶ fetching ─▶ enriching ─▶ loading ─▶ validating ─▶ supervising
//!    │           │            │           │                        │   │
//!    ▼           └────────────┴───────────┴──────▶ supervising ◀───┘   ▼
//!  failed                  (policy may abort ─▶ failed)              done
//! ```
//!
//! Each call to [`Pipeline::step`] looks only at the current status, runs the
//! matching component, and computes the next status. Units are processed one
//! at a time and fully drained before the next is dequeued.

use crate::config::{PipelineConfig, UnitFailurePolicy};
use crate::enricher::Enricher;
use crate::error::{ErrorKind, PipelineError};
use crate::loader::Loader;
use crate::state::{FetchOutput, LoadOutput, PipelineState, RunSummary, Stage, TargetDate};
use crate::validator::QualityValidator;
use gravity_core::audit::{agent, AuditSink};
use gravity_core::data::MatchSource;
use gravity_core::domain::MatchId;
use gravity_core::scoring::ShotScorer;
use gravity_core::store::Storage;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;

/// Collaborators a pipeline is built from.
pub struct Collaborators {
    pub source: Arc<dyn MatchSource>,
    pub scorer: Arc<dyn ShotScorer>,
    pub storage: Arc<dyn Storage>,
    pub audit: Arc<dyn AuditSink>,
}

pub struct Pipeline {
    config: Arc<PipelineConfig>,
    source: Arc<dyn MatchSource>,
    enricher: Enricher,
    loader: Loader,
    validator: QualityValidator,
    audit: Arc<dyn AuditSink>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, parts: Collaborators) -> Self {
        let config = Arc::new(config);
        Self {
            enricher: Enricher::new(parts.scorer, parts.audit.clone()),
            loader: Loader::new(parts.storage, parts.audit.clone()),
            validator: QualityValidator::new(config.quality, parts.audit.clone()),
            source: parts.source,
            audit: parts.audit,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Fresh state for a run on `target_date`.
    pub fn initial_state(&self, target_date: TargetDate) -> PipelineState {
        PipelineState::new(target_date, self.config.planning.competitions.clone())
    }

    /// Drive a run to a terminal status.
    pub async fn run(&self, target_date: TargetDate) -> RunSummary {
        let mut state = self.initial_state(target_date);
        tracing::info!(
            date = %target_date,
            source = self.source.name(),
            competitions = state.target_competitions.len(),
            "pipeline starting"
        );
        self.audit.record(
            "pipeline_start",
            agent::SYSTEM,
            json!({
                "date": target_date,
                "competitions": state.target_competitions,
                "source": self.source.name(),
            }),
        );

        while !state.status().is_terminal() {
            self.step(&mut state).await;
        }

        let summary = state.into_summary();
        tracing::info!(
            status = %summary.status,
            units = summary.units_completed,
            errors = summary.errors.len(),
            dropped = summary.dropped_records,
            "pipeline finished"
        );
        self.audit.record(
            "pipeline_complete",
            agent::SYSTEM,
            json!({
                "status": summary.status,
                "units_completed": summary.units_completed,
                "errors": summary.errors.len(),
                "dropped_records": summary.dropped_records,
                "failed_quality_checks": summary.count_of(ErrorKind::QualityAnomaly),
            }),
        );
        summary
    }

    /// Run exactly one node. Terminal states are left untouched.
    pub async fn step(&self, state: &mut PipelineState) {
        let stage = std::mem::replace(&mut state.stage, Stage::Failed);
        let from = stage.status();

        state.stage = match stage {
            Stage::Planning => self.plan(state).await,
            Stage::Fetching => self.fetch(state).await,
            Stage::Enriching(input) => match self.enricher.enrich(input) {
                Ok(out) => {
                    state.dropped_records += out.dropped;
                    Stage::Loading(out)
                }
                Err(e) => {
                    let error =
                        PipelineError::new(ErrorKind::PayloadAssemble, Some(e.match_id()), e.to_string());
                    self.unit_failed(state, error)
                }
            },
            Stage::Loading(out) => match self.loader.load(&out.payload) {
                Ok(receipt) => Stage::Validating(LoadOutput {
                    payload: out.payload,
                    receipt,
                }),
                Err(e) => {
                    let unit = Some(out.payload.fixture.id);
                    let error = PipelineError::new(ErrorKind::Persistence, unit, e.to_string());
                    self.unit_failed(state, error)
                }
            },
            Stage::Validating(out) => {
                let report = self.validator.validate(&out.payload);
                state.quality_reports.push(report);
                state.units_completed += 1;
                Stage::Supervising
            }
            Stage::Supervising => self.supervise(state),
            terminal @ (Stage::Done | Stage::Failed) => terminal,
        };

        let to = state.status();
        if from != to {
            tracing::debug!(%from, %to, unit = ?state.current_unit, "transition");
        }
    }

    /// Populate the queue from listings, once per run.
    async fn plan(&self, state: &mut PipelineState) -> Stage {
        self.audit.record(
            "supervisor_decision",
            agent::SUPERVISOR,
            json!({
                "date": state.target_date,
                "competitions": state.target_competitions,
                "queued": state.work_queue.len(),
            }),
        );

        if state.work_queue.is_empty() && !state.planned {
            let planning = &self.config.planning;
            let mut seen: HashSet<MatchId> = HashSet::new();

            for target in state.target_competitions.clone() {
                let listing = match self.source.list_matches(target).await {
                    Ok(listing) => listing,
                    Err(e) => {
                        tracing::error!(%target, error = %e, "match listing failed");
                        self.record_error(state, PipelineError::fetch(None, &e));
                        return Stage::Failed;
                    }
                };

                for entry in listing {
                    if seen.len() >= planning.max_units {
                        break;
                    }
                    let Some(id) = entry.get("match_id").and_then(Value::as_i64).map(MatchId) else {
                        tracing::warn!(%target, "listing entry without match_id skipped");
                        continue;
                    };
                    if planning.filter_by_date && !played_on(&entry, state.target_date) {
                        continue;
                    }
                    if seen.insert(id) {
                        state.work_queue.push_back(id);
                        state.listings.insert(id, entry);
                    }
                }
            }
            state.planned = true;

            let queue: Vec<MatchId> = state.work_queue.iter().copied().collect();
            tracing::info!(units = queue.len(), "work queue built");
            self.audit.record(
                "planner_queue_built",
                agent::SUPERVISOR,
                json!({"len_matches": queue.len(), "queue": queue}),
            );
        }

        if state.work_queue.is_empty() {
            Stage::Done
        } else {
            Stage::Fetching
        }
    }

    async fn fetch(&self, state: &mut PipelineState) -> Stage {
        let Some(match_id) = state.work_queue.pop_front() else {
            return Stage::Supervising;
        };
        state.current_unit = Some(match_id);
        let metadata = state.listings.remove(&match_id);
        tracing::info!(%match_id, remaining = state.work_queue.len(), "fetching unit");

        match self.source.fetch_events(match_id).await {
            Ok(events) => Stage::Enriching(FetchOutput {
                match_id,
                metadata,
                events,
            }),
            Err(e) => {
                tracing::error!(%match_id, error = %e, "fetch failed, unit skipped");
                self.record_error(state, PipelineError::fetch(Some(match_id), &e));
                Stage::Supervising
            }
        }
    }

    fn supervise(&self, state: &mut PipelineState) -> Stage {
        state.current_unit = None;
        let next = if state.work_queue.is_empty() {
            Stage::Done
        } else {
            Stage::Fetching
        };
        self.audit.record(
            "supervisor_decision",
            agent::SUPERVISOR,
            json!({
                "remaining": state.work_queue.len(),
                "next": next.status(),
            }),
        );
        next
    }

    /// Apply the unit-failure policy to an enrichment or load failure.
    fn unit_failed(&self, state: &mut PipelineState, error: PipelineError) -> Stage {
        tracing::error!(error = %error, policy = ?self.config.on_unit_failure, "unit failed");
        self.record_error(state, error);
        match self.config.on_unit_failure {
            UnitFailurePolicy::AbortRun => Stage::Failed,
            UnitFailurePolicy::SkipUnit => Stage::Supervising,
        }
    }

    fn record_error(&self, state: &mut PipelineState, error: PipelineError) {
        self.audit.record(
            "pipeline_error",
            agent::SUPERVISOR,
            json!({
                "kind": error.kind,
                "unit": error.unit,
                "message": error.message,
            }),
        );
        state.errors.push(error);
    }
}

fn played_on(entry: &Value, date: TargetDate) -> bool {
    entry
        .get("match_date")
        .and_then(Value::as_str)
        .is_some_and(|d| d == date.to_string())
}

