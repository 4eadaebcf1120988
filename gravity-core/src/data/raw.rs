//! Wire shapes of the open-data feed.
//!
//! These are deliberately lenient: unknown fields are ignored and almost
//! everything is optional, because the feed carries far more than we use.
//! Strictness is applied when converting into domain entities.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Named {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdName {
    pub id: i64,
    pub name: String,
}

/// One entry of `matches/{competition}/{season}.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawMatchMeta {
    pub match_id: i64,
    #[serde(default)]
    pub match_date: Option<String>,
    #[serde(default)]
    pub kick_off: Option<String>,
    #[serde(default)]
    pub competition: Option<RawCompetition>,
    #[serde(default)]
    pub season: Option<RawSeason>,
    #[serde(default)]
    pub home_team: Option<RawHomeTeam>,
    #[serde(default)]
    pub away_team: Option<RawAwayTeam>,
    #[serde(default)]
    pub home_score: Option<i64>,
    #[serde(default)]
    pub away_score: Option<i64>,
    #[serde(default)]
    pub match_status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawCompetition {
    pub competition_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawSeason {
    pub season_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawHomeTeam {
    pub home_team_id: i64,
    pub home_team_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawAwayTeam {
    pub away_team_id: i64,
    pub away_team_name: String,
}

/// One entry of `events/{match_id}.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawEvent {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub index: Option<i64>,
    #[serde(default)]
    pub period: Option<i64>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub minute: Option<i64>,
    #[serde(default)]
    pub second: Option<i64>,
    #[serde(rename = "type", default)]
    pub kind: Option<Named>,
    #[serde(default)]
    pub possession_team: Option<IdName>,
    #[serde(default)]
    pub player: Option<IdName>,
    #[serde(default)]
    pub position: Option<Named>,
    #[serde(default)]
    pub location: Option<Vec<f64>>,
    #[serde(default)]
    pub shot: Option<RawShot>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawShot {
    #[serde(default)]
    pub outcome: Option<Named>,
    #[serde(default)]
    pub body_part: Option<Named>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_feed_event_ignoring_extras() {
        let v = json!({
            "id": "8f2c",
            "index": 12,
            "period": 1,
            "timestamp": "00:03:12.400",
            "minute": 3,
            "second": 12,
            "type": {"id": 16, "name": "Shot"},
            "possession_team": {"id": 779, "name": "Argentina"},
            "player": {"id": 5503, "name": "Lionel Messi"},
            "position": {"id": 17, "name": "Right Wing"},
            "location": [108.1, 38.4],
            "shot": {"outcome": {"name": "Goal"}, "body_part": {"name": "Left Foot"}, "statsbomb_xg": 0.7},
            "related_events": ["a", "b"]
        });
        let e: RawEvent = serde_json::from_value(v).unwrap();
        assert_eq!(e.kind.unwrap().name, "Shot");
        assert_eq!(e.location.unwrap(), vec![108.1, 38.4]);
        assert_eq!(e.shot.unwrap().outcome.unwrap().name, "Goal");
    }

    #[test]
    fn parses_listing_entry() {
        let v = json!({
            "match_id": 3869685,
            "match_date": "2022-12-18",
            "kick_off": "17:00:00.000",
            "competition": {"competition_id": 43, "competition_name": "FIFA World Cup"},
            "season": {"season_id": 106},
            "home_team": {"home_team_id": 779, "home_team_name": "Argentina"},
            "away_team": {"away_team_id": 771, "away_team_name": "France"},
            "home_score": 3,
            "away_score": 3,
            "match_status": "available"
        });
        let m: RawMatchMeta = serde_json::from_value(v).unwrap();
        assert_eq!(m.match_id, 3869685);
        assert_eq!(m.home_team.unwrap().home_team_name, "Argentina");
    }
}
