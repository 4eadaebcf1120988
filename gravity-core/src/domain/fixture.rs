//! Match — the header record every unit of work is keyed on.

use super::error::ValidationError;
use super::ids::MatchId;
use super::team::Team;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status reported by the listing feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Scheduled,
    Finished,
    Cancelled,
    Available,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Scheduled => "scheduled",
            MatchStatus::Finished => "finished",
            MatchStatus::Cancelled => "cancelled",
            MatchStatus::Available => "available",
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(MatchStatus::Scheduled),
            "finished" => Ok(MatchStatus::Finished),
            "cancelled" => Ok(MatchStatus::Cancelled),
            "available" => Ok(MatchStatus::Available),
            other => Err(ValidationError::Invalid {
                field: "status",
                reason: format!("unknown match status '{other}'"),
            }),
        }
    }
}

/// A validated match header.
///
/// Scores are carried as signed integers so that a negative value coming off
/// the wire is representable long enough to be rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MatchFields")]
pub struct Match {
    pub id: MatchId,
    pub date: DateTime<Utc>,
    pub competition_id: i64,
    pub season_id: i64,
    pub home_team: Team,
    pub away_team: Team,
    pub home_score: i64,
    pub away_score: i64,
    pub status: MatchStatus,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct MatchFields {
    id: MatchId,
    date: DateTime<Utc>,
    competition_id: i64,
    season_id: i64,
    home_team: Team,
    away_team: Team,
    home_score: i64,
    away_score: i64,
    #[serde(default = "default_status")]
    status: MatchStatus,
}

fn default_status() -> MatchStatus {
    MatchStatus::Finished
}

impl TryFrom<MatchFields> for Match {
    type Error = ValidationError;

    fn try_from(f: MatchFields) -> Result<Self, Self::Error> {
        let m = Match {
            id: f.id,
            date: f.date,
            competition_id: f.competition_id,
            season_id: f.season_id,
            home_team: f.home_team,
            away_team: f.away_team,
            home_score: f.home_score,
            away_score: f.away_score,
            status: f.status,
        };
        m.validate()?;
        Ok(m)
    }
}

impl Match {
    /// Build a match and check its invariants.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: MatchId,
        date: DateTime<Utc>,
        competition_id: i64,
        season_id: i64,
        home_team: Team,
        away_team: Team,
        home_score: i64,
        away_score: i64,
        status: MatchStatus,
    ) -> Result<Self, ValidationError> {
        let m = Self {
            id,
            date,
            competition_id,
            season_id,
            home_team,
            away_team,
            home_score,
            away_score,
            status,
        };
        m.validate()?;
        Ok(m)
    }

    /// Stand-in header for a unit whose listing metadata is missing.
    pub fn placeholder(id: MatchId) -> Self {
        Self {
            id,
            date: placeholder_kickoff(),
            competition_id: 1,
            season_id: 1,
            home_team: Team::new(1, "Home Team"),
            away_team: Team::new(2, "Away Team"),
            home_score: 0,
            away_score: 0,
            status: MatchStatus::Finished,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.home_score < 0 {
            return Err(ValidationError::out_of_range(
                "home_score",
                self.home_score,
                ">= 0",
            ));
        }
        if self.away_score < 0 {
            return Err(ValidationError::out_of_range(
                "away_score",
                self.away_score,
                ">= 0",
            ));
        }
        if self.home_team.name.trim().is_empty() || self.away_team.name.trim().is_empty() {
            return Err(ValidationError::Missing("team name"));
        }
        Ok(())
    }
}

/// Kick-off used when the feed gives no usable date: 2026-01-01 15:00 UTC.
pub fn placeholder_kickoff() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 15, 0, 0)
        .single()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_json() -> serde_json::Value {
        json!({
            "id": 1,
            "date": "2022-12-18T15:00:00Z",
            "competition_id": 43,
            "season_id": 106,
            "home_team": {"id": 779, "name": "Argentina"},
            "away_team": {"id": 771, "name": "France"},
            "home_score": 3,
            "away_score": 3,
            "status": "available"
        })
    }

    #[test]
    fn deserializes_valid_match() {
        let m: Match = serde_json::from_value(valid_json()).unwrap();
        assert_eq!(m.id, MatchId(1));
        assert_eq!(m.status, MatchStatus::Available);
    }

    #[test]
    fn rejects_undeclared_field() {
        let mut v = valid_json();
        v["injected"] = json!("<script>alert(1)</script>");
        assert!(serde_json::from_value::<Match>(v).is_err());
    }

    #[test]
    fn rejects_negative_score_on_construction() {
        let res = Match::new(
            MatchId(1),
            placeholder_kickoff(),
            1,
            1,
            Team::new(1, "Home"),
            Team::new(2, "Away"),
            -1,
            0,
            MatchStatus::Finished,
        );
        assert!(matches!(
            res,
            Err(ValidationError::OutOfRange { field: "home_score", .. })
        ));
    }

    #[test]
    fn rejects_negative_score_on_deserialize() {
        let mut v = valid_json();
        v["away_score"] = json!(-2);
        assert!(serde_json::from_value::<Match>(v).is_err());
    }

    #[test]
    fn rejects_unknown_status() {
        let mut v = valid_json();
        v["status"] = json!("postponed");
        assert!(serde_json::from_value::<Match>(v).is_err());
        assert!("postponed".parse::<MatchStatus>().is_err());
    }

    #[test]
    fn placeholder_is_valid() {
        let m = Match::placeholder(MatchId(42));
        assert!(m.validate().is_ok());
        assert_eq!(m.home_team.name, "Home Team");
        assert_eq!(m.date.to_rfc3339(), "2026-01-01T15:00:00+00:00");
    }
}
