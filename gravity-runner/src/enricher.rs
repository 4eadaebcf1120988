//! Enrichment: raw feed records in, one validated [`EnrichedPayload`] out.
//!
//! Invalid records are dropped one at a time and audited as
//! `validation_drop`; they never fail the unit. Only bad match metadata or a
//! payload that breaks its own invariants fails the unit.

use crate::error::EnrichmentError;
use crate::state::{EnrichOutput, FetchOutput};
use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use gravity_core::audit::{agent, AuditSink};
use gravity_core::data::{RawEvent, RawMatchMeta};
use gravity_core::domain::{
    placeholder_kickoff, EnrichedPayload, Event, EventId, Location, Match, MatchId, MatchStatus,
    Player, ShotContext, ShotOutcome, Side, Team, ValidationError, SHOT_TYPE,
};
use gravity_core::scoring::ShotScorer;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// Body part recorded when the feed omits one.
const DEFAULT_BODY_PART: &str = "Foot";

pub struct Enricher {
    scorer: Arc<dyn ShotScorer>,
    audit: Arc<dyn AuditSink>,
}

impl Enricher {
    pub fn new(scorer: Arc<dyn ShotScorer>, audit: Arc<dyn AuditSink>) -> Self {
        Self { scorer, audit }
    }

    pub fn enrich(&self, input: FetchOutput) -> Result<EnrichOutput, EnrichmentError> {
        let match_id = input.match_id;
        self.audit.record(
            "enrichment_started",
            agent::ENRICHER,
            json!({"match_id": match_id, "raw_events": input.events.records.len()}),
        );

        let fixture = match &input.metadata {
            Some(listing) => match_from_listing(match_id, listing).map_err(|source| {
                self.audit.record(
                    "enrichment_failed",
                    agent::ENRICHER,
                    json!({"match_id": match_id, "error": source.to_string()}),
                );
                EnrichmentError::InvalidMetadata { match_id, source }
            })?,
            None => {
                tracing::warn!(%match_id, "no listing metadata, using placeholder match header");
                self.audit.record(
                    "metadata_placeholder",
                    agent::ENRICHER,
                    json!({"match_id": match_id}),
                );
                Match::placeholder(match_id)
            }
        };

        let mut events = Vec::with_capacity(input.events.records.len());
        let mut dropped = 0;
        let mut total_home_xg = 0.0;
        let mut total_away_xg = 0.0;

        for record in &input.events.records {
            match self.build_event(match_id, record) {
                Ok(event) => {
                    match Side::of(&event.possession_team, &fixture) {
                        Some(Side::Home) => total_home_xg += event.xg(),
                        Some(Side::Away) => total_away_xg += event.xg(),
                        None => {}
                    }
                    events.push(event);
                }
                Err(reason) => {
                    dropped += 1;
                    let event_id = record.get("id").cloned().unwrap_or(Value::Null);
                    tracing::warn!(%match_id, %event_id, %reason, "dropping invalid event");
                    self.audit.record(
                        "validation_drop",
                        agent::ENRICHER,
                        json!({"match_id": match_id, "event_id": event_id, "error": reason.to_string()}),
                    );
                }
            }
        }

        let valid_events = events.len();
        let payload = EnrichedPayload::assemble(fixture, events, total_home_xg, total_away_xg)
            .map_err(|source| {
                self.audit.record(
                    "enrichment_failed",
                    agent::ENRICHER,
                    json!({"match_id": match_id, "error": source.to_string()}),
                );
                EnrichmentError::PayloadAssemble { match_id, source }
            })?;

        self.audit.record(
            "enrichment_success",
            agent::ENRICHER,
            json!({
                "match_id": match_id,
                "valid_events": valid_events,
                "dropped": dropped,
                "home_xg": payload.total_home_xg,
                "away_xg": payload.total_away_xg,
            }),
        );
        Ok(EnrichOutput { payload, dropped })
    }

    /// Map one feed record to a validated event, scoring it if it is a shot.
    fn build_event(&self, match_id: MatchId, record: &Value) -> Result<Event, ValidationError> {
        let raw = RawEvent::deserialize(record)?;

        let location = match raw.location.as_deref() {
            None => None,
            Some([x, y, ..]) => Some(Location::new(*x, *y)?),
            Some(other) => {
                return Err(ValidationError::Invalid {
                    field: "location",
                    reason: format!("expected [x, y], got {} values", other.len()),
                })
            }
        };

        let type_name = raw.kind.ok_or(ValidationError::Missing("type"))?.name;
        let shot_context = match location {
            Some(loc) if type_name == SHOT_TYPE => {
                let shot = raw.shot.as_ref();
                let label = shot.and_then(|s| s.outcome.as_ref()).map(|n| n.name.as_str());
                let (outcome, coerced) = ShotOutcome::coerce(label);
                if coerced {
                    tracing::debug!(%match_id, label, "unrecognised shot outcome, recorded as {outcome}");
                }
                let geometry = self.scorer.geometry(&loc);
                Some(ShotContext {
                    xg: self.scorer.score(&loc),
                    xa: 0.0,
                    outcome,
                    body_part: shot
                        .and_then(|s| s.body_part.as_ref())
                        .map(|n| n.name.clone())
                        .unwrap_or_else(|| DEFAULT_BODY_PART.to_string()),
                    distance_to_goal: geometry.distance,
                    angle_to_goal: geometry.angle,
                })
            }
            _ => None,
        };

        let possession = raw
            .possession_team
            .ok_or(ValidationError::Missing("possession_team"))?;
        let position = raw.position.map(|p| p.name);

        let event = Event {
            id: EventId::new(raw.id.ok_or(ValidationError::Missing("id"))?),
            match_id,
            index: raw.index.ok_or(ValidationError::Missing("index"))?,
            period: raw.period.ok_or(ValidationError::Missing("period"))?,
            timestamp: raw.timestamp.ok_or(ValidationError::Missing("timestamp"))?,
            minute: raw.minute.ok_or(ValidationError::Missing("minute"))?,
            second: raw.second.ok_or(ValidationError::Missing("second"))?,
            type_name,
            possession_team: Team::new(possession.id, possession.name),
            player: raw.player.map(|p| Player {
                id: p.id,
                name: p.name,
                position,
            }),
            location,
            shot_context,
        };
        event.validate()?;
        Ok(event)
    }
}

/// Build the match header from a listing entry.
///
/// Absent optional fields take the feed's conventional defaults; present
/// fields must be valid.
pub fn match_from_listing(match_id: MatchId, listing: &Value) -> Result<Match, ValidationError> {
    let raw = RawMatchMeta::deserialize(listing)?;
    if raw.match_id != match_id.0 {
        return Err(ValidationError::Invalid {
            field: "match_id",
            reason: format!("listing is for match {}, not {match_id}", raw.match_id),
        });
    }

    let date = match raw.match_date.as_deref() {
        Some(day) => kickoff(day, raw.kick_off.as_deref())?,
        None => placeholder_kickoff(),
    };
    let home = raw.home_team.ok_or(ValidationError::Missing("home_team"))?;
    let away = raw.away_team.ok_or(ValidationError::Missing("away_team"))?;
    let status = match raw.match_status.as_deref() {
        Some(s) => s.to_ascii_lowercase().parse::<MatchStatus>()?,
        None => MatchStatus::Finished,
    };

    Match::new(
        match_id,
        date,
        raw.competition.map_or(1, |c| c.competition_id),
        raw.season.map_or(1, |s| s.season_id),
        Team::new(home.home_team_id, home.home_team_name),
        Team::new(away.away_team_id, away.away_team_name),
        raw.home_score.unwrap_or(0),
        raw.away_score.unwrap_or(0),
        status,
    )
}

fn kickoff(day: &str, time: Option<&str>) -> Result<chrono::DateTime<Utc>, ValidationError> {
    let date = NaiveDate::parse_from_str(day, "%Y-%m-%d").map_err(|e| ValidationError::Invalid {
        field: "match_date",
        reason: format!("'{day}': {e}"),
    })?;
    let time = match time {
        Some(t) => NaiveTime::parse_from_str(t, "%H:%M:%S%.f").map_err(|e| {
            ValidationError::Invalid {
                field: "kick_off",
                reason: format!("'{t}': {e}"),
            }
        })?,
        None => NaiveTime::default(),
    };
    Ok(Utc.from_utc_datetime(&date.and_time(time)))
}
