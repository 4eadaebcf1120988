//! EnrichedPayload — the unit of persistence.

use super::error::ValidationError;
use super::event::Event;
use super::fixture::Match;
use super::team::Team;
use serde::{Deserialize, Serialize};

/// Tolerance when comparing accumulated xG totals against a recomputation.
const XG_TOLERANCE: f64 = 1e-9;

/// A match plus its surviving events and per-side xG totals.
///
/// Invariant: `total_home_xg` equals the sum of shot xG over events whose
/// possession team is the home side, and likewise for away.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedPayload {
    #[serde(rename = "match")]
    pub fixture: Match,
    pub events: Vec<Event>,
    pub total_home_xg: f64,
    pub total_away_xg: f64,
}

impl EnrichedPayload {
    /// Assemble a payload, checking the totals supplied by the caller.
    pub fn assemble(
        fixture: Match,
        events: Vec<Event>,
        total_home_xg: f64,
        total_away_xg: f64,
    ) -> Result<Self, ValidationError> {
        let payload = Self {
            fixture,
            events,
            total_home_xg,
            total_away_xg,
        };
        payload.validate()?;
        Ok(payload)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.fixture.validate()?;
        for (field, total) in [
            ("total_home_xg", self.total_home_xg),
            ("total_away_xg", self.total_away_xg),
        ] {
            if !total.is_finite() || total < 0.0 {
                return Err(ValidationError::out_of_range(field, total, ">= 0"));
            }
        }

        let home = side_xg(&self.events, &self.fixture, Side::Home);
        let away = side_xg(&self.events, &self.fixture, Side::Away);
        if (home - self.total_home_xg).abs() > XG_TOLERANCE {
            return Err(ValidationError::Invalid {
                field: "total_home_xg",
                reason: format!("{} != event sum {home}", self.total_home_xg),
            });
        }
        if (away - self.total_away_xg).abs() > XG_TOLERANCE {
            return Err(ValidationError::Invalid {
                field: "total_away_xg",
                reason: format!("{} != event sum {away}", self.total_away_xg),
            });
        }
        Ok(())
    }

    pub fn shot_count(&self) -> usize {
        self.events.iter().filter(|e| e.shot_context.is_some()).count()
    }
}

fn side_xg(events: &[Event], fixture: &Match, side: Side) -> f64 {
    events
        .iter()
        .filter(|e| Side::of(&e.possession_team, fixture) == Some(side))
        .map(Event::xg)
        .sum()
}

/// Which side of a match a possession team belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Home,
    Away,
}

impl Side {
    /// Home attribution wins when a possession team could match both sides.
    pub fn of(team: &Team, fixture: &Match) -> Option<Side> {
        if team.same_side(&fixture.home_team) {
            Some(Side::Home)
        } else if team.same_side(&fixture.away_team) {
            Some(Side::Away)
        } else {
            None
        }
    }
}
