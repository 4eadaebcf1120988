//! Simple value records: teams, players, pitch locations.

use super::error::ValidationError;
use serde::{Deserialize, Serialize};

/// Pitch length in the feed's coordinate system (goal lines at x=0 and x=120).
pub const PITCH_LENGTH: f64 = 120.0;
/// Pitch width (touchlines at y=0 and y=80).
pub const PITCH_WIDTH: f64 = 80.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Team {
    pub id: i64,
    pub name: String,
}

impl Team {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    /// Same side if either the id or the name matches.
    ///
    /// Event feeds and listing feeds occasionally disagree on one of the two.
    pub fn same_side(&self, other: &Team) -> bool {
        self.id == other.id || self.name == other.name
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Player {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub position: Option<String>,
}

/// Planar coordinates on a 120 x 80 pitch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LocationFields")]
pub struct Location {
    pub x: f64,
    pub y: f64,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct LocationFields {
    x: f64,
    y: f64,
}

impl TryFrom<LocationFields> for Location {
    type Error = ValidationError;

    fn try_from(f: LocationFields) -> Result<Self, Self::Error> {
        Location::new(f.x, f.y)
    }
}

impl Location {
    pub fn new(x: f64, y: f64) -> Result<Self, ValidationError> {
        if !x.is_finite() || !(0.0..=PITCH_LENGTH).contains(&x) {
            return Err(ValidationError::out_of_range("location.x", x, "0..=120"));
        }
        if !y.is_finite() || !(0.0..=PITCH_WIDTH).contains(&y) {
            return Err(ValidationError::out_of_range("location.y", y, "0..=80"));
        }
        Ok(Self { x, y })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_accepts_pitch_corners() {
        assert!(Location::new(0.0, 0.0).is_ok());
        assert!(Location::new(120.0, 80.0).is_ok());
    }

    #[test]
    fn location_rejects_off_pitch_and_nan() {
        assert!(Location::new(121.0, 40.0).is_err());
        assert!(Location::new(60.0, -0.5).is_err());
        assert!(Location::new(f64::NAN, 40.0).is_err());
    }

    #[test]
    fn location_deserialize_validates_range() {
        let ok: Result<Location, _> = serde_json::from_str(r#"{"x": 100.0, "y": 40.0}"#);
        assert!(ok.is_ok());
        let bad: Result<Location, _> = serde_json::from_str(r#"{"x": 200.0, "y": 40.0}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn team_rejects_unknown_fields() {
        let res: Result<Team, _> =
            serde_json::from_str(r#"{"id": 1, "name": "A", "colour": "red"}"#);
        assert!(res.is_err());
    }

    #[test]
    fn same_side_matches_on_id_or_name() {
        let a = Team::new(1, "Argentina");
        assert!(a.same_side(&Team::new(1, "ARG")));
        assert!(a.same_side(&Team::new(0, "Argentina")));
        assert!(!a.same_side(&Team::new(2, "France")));
    }
}
