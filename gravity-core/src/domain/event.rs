//! Event — one on-ball action, optionally carrying a shot context.

use super::error::ValidationError;
use super::ids::{EventId, MatchId};
use super::team::{Location, Player, Team};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Event type name the feed uses for shots.
pub const SHOT_TYPE: &str = "Shot";

/// Recognized shot outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShotOutcome {
    Goal,
    Saved,
    OffTarget,
    Post,
    Wayward,
    Blocked,
}

impl ShotOutcome {
    /// Outcome assumed when the feed sends a label we don't know.
    pub const DEFAULT: ShotOutcome = ShotOutcome::Saved;

    /// Map a feed label to an outcome. The feed abbreviates off-target as "Off T".
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Goal" => Some(ShotOutcome::Goal),
            "Saved" => Some(ShotOutcome::Saved),
            "Off T" | "Off Target" | "OffTarget" => Some(ShotOutcome::OffTarget),
            "Post" => Some(ShotOutcome::Post),
            "Wayward" => Some(ShotOutcome::Wayward),
            "Blocked" => Some(ShotOutcome::Blocked),
            _ => None,
        }
    }

    /// Like [`from_label`](Self::from_label) but never fails; unknown labels
    /// become [`ShotOutcome::DEFAULT`]. The bool reports whether coercion happened.
    pub fn coerce(label: Option<&str>) -> (Self, bool) {
        match label.and_then(Self::from_label) {
            Some(outcome) => (outcome, false),
            None => (Self::DEFAULT, label.is_some()),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ShotOutcome::Goal => "Goal",
            ShotOutcome::Saved => "Saved",
            ShotOutcome::OffTarget => "OffTarget",
            ShotOutcome::Post => "Post",
            ShotOutcome::Wayward => "Wayward",
            ShotOutcome::Blocked => "Blocked",
        }
    }
}

impl fmt::Display for ShotOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shot-specific data, present only on shot events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ShotContextFields")]
pub struct ShotContext {
    pub xg: f64,
    pub xa: f64,
    pub outcome: ShotOutcome,
    pub body_part: String,
    pub distance_to_goal: f64,
    pub angle_to_goal: f64,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ShotContextFields {
    xg: f64,
    xa: f64,
    outcome: ShotOutcome,
    body_part: String,
    distance_to_goal: f64,
    angle_to_goal: f64,
}

impl TryFrom<ShotContextFields> for ShotContext {
    type Error = ValidationError;

    fn try_from(f: ShotContextFields) -> Result<Self, Self::Error> {
        let ctx = ShotContext {
            xg: f.xg,
            xa: f.xa,
            outcome: f.outcome,
            body_part: f.body_part,
            distance_to_goal: f.distance_to_goal,
            angle_to_goal: f.angle_to_goal,
        };
        ctx.validate()?;
        Ok(ctx)
    }
}

impl ShotContext {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.xg.is_finite() || !(0.0..=1.0).contains(&self.xg) {
            return Err(ValidationError::out_of_range("xg", self.xg, "0..=1"));
        }
        if !self.xa.is_finite() || !(0.0..=1.0).contains(&self.xa) {
            return Err(ValidationError::out_of_range("xa", self.xa, "0..=1"));
        }
        if !self.distance_to_goal.is_finite() || self.distance_to_goal < 0.0 {
            return Err(ValidationError::out_of_range(
                "distance_to_goal",
                self.distance_to_goal,
                ">= 0",
            ));
        }
        if !self.angle_to_goal.is_finite() {
            return Err(ValidationError::out_of_range(
                "angle_to_goal",
                self.angle_to_goal,
                "finite",
            ));
        }
        Ok(())
    }
}

/// A validated event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "EventFields")]
pub struct Event {
    pub id: EventId,
    pub match_id: MatchId,
    pub index: i64,
    pub period: i64,
    pub timestamp: String,
    pub minute: i64,
    pub second: i64,
    pub type_name: String,
    pub possession_team: Team,
    pub player: Option<Player>,
    pub location: Option<Location>,
    pub shot_context: Option<ShotContext>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct EventFields {
    id: EventId,
    match_id: MatchId,
    index: i64,
    period: i64,
    timestamp: String,
    minute: i64,
    second: i64,
    type_name: String,
    possession_team: Team,
    #[serde(default)]
    player: Option<Player>,
    #[serde(default)]
    location: Option<Location>,
    #[serde(default)]
    shot_context: Option<ShotContext>,
}

impl TryFrom<EventFields> for Event {
    type Error = ValidationError;

    fn try_from(f: EventFields) -> Result<Self, Self::Error> {
        let event = Event {
            id: f.id,
            match_id: f.match_id,
            index: f.index,
            period: f.period,
            timestamp: f.timestamp,
            minute: f.minute,
            second: f.second,
            type_name: f.type_name,
            possession_team: f.possession_team,
            player: f.player,
            location: f.location,
            shot_context: f.shot_context,
        };
        event.validate()?;
        Ok(event)
    }
}

impl Event {
    pub fn is_shot(&self) -> bool {
        self.type_name == SHOT_TYPE
    }

    /// xG carried by this event, zero for non-shots.
    pub fn xg(&self) -> f64 {
        self.shot_context.as_ref().map_or(0.0, |s| s.xg)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.as_str().trim().is_empty() {
            return Err(ValidationError::Missing("id"));
        }
        if self.index < 1 {
            return Err(ValidationError::out_of_range("index", self.index, ">= 1"));
        }
        if !(1..=5).contains(&self.period) {
            return Err(ValidationError::out_of_range("period", self.period, "1..=5"));
        }
        if self.timestamp.trim().is_empty() {
            return Err(ValidationError::Missing("timestamp"));
        }
        if self.minute < 0 {
            return Err(ValidationError::out_of_range("minute", self.minute, ">= 0"));
        }
        if !(0..=59).contains(&self.second) {
            return Err(ValidationError::out_of_range("second", self.second, "0..=59"));
        }
        if self.type_name.trim().is_empty() {
            return Err(ValidationError::Missing("type.name"));
        }
        if let Some(shot) = &self.shot_context {
            shot.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pass_event() -> Event {
        Event {
            id: EventId::new("e-1"),
            match_id: MatchId(909),
            index: 1,
            period: 1,
            timestamp: "00:00:01.000".into(),
            minute: 0,
            second: 1,
            type_name: "Pass".into(),
            possession_team: Team::new(1, "A"),
            player: None,
            location: None,
            shot_context: None,
        }
    }

    #[test]
    fn valid_event_passes() {
        assert!(pass_event().validate().is_ok());
        assert!(!pass_event().is_shot());
        assert_eq!(pass_event().xg(), 0.0);
    }

    #[test]
    fn rejects_out_of_range_fields() {
        let mut e = pass_event();
        e.index = 0;
        assert!(e.validate().is_err());

        let mut e = pass_event();
        e.period = 6;
        assert!(e.validate().is_err());

        let mut e = pass_event();
        e.second = 60;
        assert!(e.validate().is_err());

        let mut e = pass_event();
        e.minute = -1;
        assert!(e.validate().is_err());
    }

    #[test]
    fn rejects_shot_with_xg_above_one() {
        let mut e = pass_event();
        e.type_name = SHOT_TYPE.into();
        e.shot_context = Some(ShotContext {
            xg: 1.2,
            xa: 0.0,
            outcome: ShotOutcome::Goal,
            body_part: "Right Foot".into(),
            distance_to_goal: 10.0,
            angle_to_goal: 0.5,
        });
        assert!(matches!(
            e.validate(),
            Err(ValidationError::OutOfRange { field: "xg", .. })
        ));
    }

    #[test]
    fn outcome_labels_map_and_coerce() {
        assert_eq!(ShotOutcome::from_label("Off T"), Some(ShotOutcome::OffTarget));
        assert_eq!(ShotOutcome::coerce(Some("Goal")), (ShotOutcome::Goal, false));
        assert_eq!(
            ShotOutcome::coerce(Some("Saved to Post")),
            (ShotOutcome::Saved, true)
        );
        assert_eq!(ShotOutcome::coerce(None), (ShotOutcome::Saved, false));
    }

    #[test]
    fn event_roundtrip_rejects_extra_field() {
        let mut v = serde_json::to_value(pass_event()).unwrap();
        assert!(serde_json::from_value::<Event>(v.clone()).is_ok());
        v["debug"] = serde_json::json!(true);
        assert!(serde_json::from_value::<Event>(v).is_err());
    }
}
