use serde::{Deserialize, Serialize};
use std::fmt;

/// Upstream match identifier. One match is one unit of pipeline work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchId(pub i64);

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for MatchId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Upstream event identifier (a UUID string in the open-data feed).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub String);

impl EventId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A competition and season pair, the key of a match listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompetitionSeason {
    pub competition_id: i64,
    pub season_id: i64,
}

impl fmt::Display for CompetitionSeason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.competition_id, self.season_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_id_serializes_as_bare_integer() {
        let json = serde_json::to_string(&MatchId(909)).unwrap();
        assert_eq!(json, "909");
        let back: MatchId = serde_json::from_str("3857256").unwrap();
        assert_eq!(back, MatchId(3857256));
    }

    #[test]
    fn competition_season_display() {
        let cs = CompetitionSeason {
            competition_id: 43,
            season_id: 106,
        };
        assert_eq!(cs.to_string(), "43/106");
    }
}
