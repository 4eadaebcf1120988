//! The two persisted tables and their Parquet encoding.

use super::StoreError;
use crate::domain::{EnrichedPayload, Event};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::io::Cursor;

/// One row of the `matches` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRow {
    pub match_id: i64,
    pub match_date: String,
    pub competition_id: i64,
    pub season_id: i64,
    pub home_team: String,
    pub away_team: String,
    pub home_score: i64,
    pub away_score: i64,
    pub total_home_xg: f64,
    pub total_away_xg: f64,
    pub status: String,
}

impl MatchRow {
    pub fn from_payload(payload: &EnrichedPayload) -> Self {
        let m = &payload.fixture;
        Self {
            match_id: m.id.0,
            match_date: m.date.to_rfc3339(),
            competition_id: m.competition_id,
            season_id: m.season_id,
            home_team: m.home_team.name.clone(),
            away_team: m.away_team.name.clone(),
            home_score: m.home_score,
            away_score: m.away_score,
            total_home_xg: payload.total_home_xg,
            total_away_xg: payload.total_away_xg,
            status: m.status.as_str().to_string(),
        }
    }
}

/// One row of the `events` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRow {
    pub event_id: String,
    pub match_id: i64,
    pub index: i64,
    pub period: i64,
    pub minute: i64,
    pub second: i64,
    pub type_name: String,
    pub team_name: String,
    pub player_name: Option<String>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub xg: Option<f64>,
    pub xa: Option<f64>,
    pub outcome: Option<String>,
}

impl EventRow {
    pub fn from_event(e: &Event) -> Self {
        let shot = e.shot_context.as_ref();
        Self {
            event_id: e.id.0.clone(),
            match_id: e.match_id.0,
            index: e.index,
            period: e.period,
            minute: e.minute,
            second: e.second,
            type_name: e.type_name.clone(),
            team_name: e.possession_team.name.clone(),
            player_name: e.player.as_ref().map(|p| p.name.clone()),
            x: e.location.map(|l| l.x),
            y: e.location.map(|l| l.y),
            xg: shot.map(|s| s.xg),
            xa: shot.map(|s| s.xa),
            outcome: shot.map(|s| s.outcome.as_str().to_string()),
        }
    }
}

// ── Parquet I/O helpers ─────────────────────────────────────────────

fn parquet_err(context: &str) -> impl Fn(PolarsError) -> StoreError + '_ {
    move |e| StoreError::Parquet(format!("{context}: {e}"))
}

pub(crate) fn matches_to_dataframe(rows: &[&MatchRow]) -> Result<DataFrame, StoreError> {
    DataFrame::new(vec![
        Column::new("match_id".into(), rows.iter().map(|r| r.match_id).collect::<Vec<_>>()),
        Column::new("match_date".into(), rows.iter().map(|r| r.match_date.clone()).collect::<Vec<_>>()),
        Column::new("competition_id".into(), rows.iter().map(|r| r.competition_id).collect::<Vec<_>>()),
        Column::new("season_id".into(), rows.iter().map(|r| r.season_id).collect::<Vec<_>>()),
        Column::new("home_team".into(), rows.iter().map(|r| r.home_team.clone()).collect::<Vec<_>>()),
        Column::new("away_team".into(), rows.iter().map(|r| r.away_team.clone()).collect::<Vec<_>>()),
        Column::new("home_score".into(), rows.iter().map(|r| r.home_score).collect::<Vec<_>>()),
        Column::new("away_score".into(), rows.iter().map(|r| r.away_score).collect::<Vec<_>>()),
        Column::new("total_home_xg".into(), rows.iter().map(|r| r.total_home_xg).collect::<Vec<_>>()),
        Column::new("total_away_xg".into(), rows.iter().map(|r| r.total_away_xg).collect::<Vec<_>>()),
        Column::new("status".into(), rows.iter().map(|r| r.status.clone()).collect::<Vec<_>>()),
    ])
    .map_err(parquet_err("matches dataframe"))
}

pub(crate) fn events_to_dataframe(rows: &[&EventRow]) -> Result<DataFrame, StoreError> {
    DataFrame::new(vec![
        Column::new("event_id".into(), rows.iter().map(|r| r.event_id.clone()).collect::<Vec<_>>()),
        Column::new("match_id".into(), rows.iter().map(|r| r.match_id).collect::<Vec<_>>()),
        Column::new("index".into(), rows.iter().map(|r| r.index).collect::<Vec<_>>()),
        Column::new("period".into(), rows.iter().map(|r| r.period).collect::<Vec<_>>()),
        Column::new("minute".into(), rows.iter().map(|r| r.minute).collect::<Vec<_>>()),
        Column::new("second".into(), rows.iter().map(|r| r.second).collect::<Vec<_>>()),
        Column::new("type_name".into(), rows.iter().map(|r| r.type_name.clone()).collect::<Vec<_>>()),
        Column::new("team_name".into(), rows.iter().map(|r| r.team_name.clone()).collect::<Vec<_>>()),
        Column::new("player_name".into(), rows.iter().map(|r| r.player_name.clone()).collect::<Vec<_>>()),
        Column::new("x".into(), rows.iter().map(|r| r.x).collect::<Vec<_>>()),
        Column::new("y".into(), rows.iter().map(|r| r.y).collect::<Vec<_>>()),
        Column::new("xg".into(), rows.iter().map(|r| r.xg).collect::<Vec<_>>()),
        Column::new("xa".into(), rows.iter().map(|r| r.xa).collect::<Vec<_>>()),
        Column::new("outcome".into(), rows.iter().map(|r| r.outcome.clone()).collect::<Vec<_>>()),
    ])
    .map_err(parquet_err("events dataframe"))
}

/// Encode a DataFrame as Parquet bytes.
pub(crate) fn to_parquet_bytes(df: &mut DataFrame) -> Result<Vec<u8>, StoreError> {
    let mut buf = Vec::new();
    ParquetWriter::new(&mut buf)
        .finish(df)
        .map_err(parquet_err("write parquet"))?;
    Ok(buf)
}

fn from_parquet_bytes(bytes: Vec<u8>) -> Result<DataFrame, StoreError> {
    ParquetReader::new(Cursor::new(bytes))
        .finish()
        .map_err(parquet_err("read parquet"))
}

fn require_columns(df: &DataFrame, table: &str, expected: &[&str]) -> Result<(), StoreError> {
    for name in expected {
        if df.column(name).is_err() {
            return Err(StoreError::Integrity {
                table: table.to_string(),
                reason: format!("missing column '{name}'"),
            });
        }
    }
    Ok(())
}

fn null_at(table: &str, column: &str, row: usize) -> StoreError {
    StoreError::Integrity {
        table: table.to_string(),
        reason: format!("null {column} at row {row}"),
    }
}

pub(crate) fn matches_from_parquet(bytes: Vec<u8>) -> Result<Vec<MatchRow>, StoreError> {
    let df = from_parquet_bytes(bytes)?;
    require_columns(
        &df,
        "matches",
        &[
            "match_id", "match_date", "competition_id", "season_id", "home_team", "away_team",
            "home_score", "away_score", "total_home_xg", "total_away_xg", "status",
        ],
    )?;
    let col_err = parquet_err("matches column");

    let match_id = df.column("match_id").map_err(&col_err)?.i64().map_err(&col_err)?;
    let match_date = df.column("match_date").map_err(&col_err)?.str().map_err(&col_err)?;
    let competition_id = df.column("competition_id").map_err(&col_err)?.i64().map_err(&col_err)?;
    let season_id = df.column("season_id").map_err(&col_err)?.i64().map_err(&col_err)?;
    let home_team = df.column("home_team").map_err(&col_err)?.str().map_err(&col_err)?;
    let away_team = df.column("away_team").map_err(&col_err)?.str().map_err(&col_err)?;
    let home_score = df.column("home_score").map_err(&col_err)?.i64().map_err(&col_err)?;
    let away_score = df.column("away_score").map_err(&col_err)?.i64().map_err(&col_err)?;
    let total_home_xg = df.column("total_home_xg").map_err(&col_err)?.f64().map_err(&col_err)?;
    let total_away_xg = df.column("total_away_xg").map_err(&col_err)?.f64().map_err(&col_err)?;
    let status = df.column("status").map_err(&col_err)?.str().map_err(&col_err)?;

    let mut rows = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        rows.push(MatchRow {
            match_id: match_id.get(i).ok_or_else(|| null_at("matches", "match_id", i))?,
            match_date: match_date.get(i).unwrap_or_default().to_string(),
            competition_id: competition_id.get(i).unwrap_or_default(),
            season_id: season_id.get(i).unwrap_or_default(),
            home_team: home_team.get(i).unwrap_or_default().to_string(),
            away_team: away_team.get(i).unwrap_or_default().to_string(),
            home_score: home_score.get(i).unwrap_or_default(),
            away_score: away_score.get(i).unwrap_or_default(),
            total_home_xg: total_home_xg.get(i).unwrap_or_default(),
            total_away_xg: total_away_xg.get(i).unwrap_or_default(),
            status: status.get(i).unwrap_or_default().to_string(),
        });
    }
    Ok(rows)
}

pub(crate) fn events_from_parquet(bytes: Vec<u8>) -> Result<Vec<EventRow>, StoreError> {
    let df = from_parquet_bytes(bytes)?;
    require_columns(
        &df,
        "events",
        &[
            "event_id", "match_id", "index", "period", "minute", "second", "type_name",
            "team_name", "player_name", "x", "y", "xg", "xa", "outcome",
        ],
    )?;
    let col_err = parquet_err("events column");

    let event_id = df.column("event_id").map_err(&col_err)?.str().map_err(&col_err)?;
    let match_id = df.column("match_id").map_err(&col_err)?.i64().map_err(&col_err)?;
    let index = df.column("index").map_err(&col_err)?.i64().map_err(&col_err)?;
    let period = df.column("period").map_err(&col_err)?.i64().map_err(&col_err)?;
    let minute = df.column("minute").map_err(&col_err)?.i64().map_err(&col_err)?;
    let second = df.column("second").map_err(&col_err)?.i64().map_err(&col_err)?;
    let type_name = df.column("type_name").map_err(&col_err)?.str().map_err(&col_err)?;
    let team_name = df.column("team_name").map_err(&col_err)?.str().map_err(&col_err)?;
    let player_name = df.column("player_name").map_err(&col_err)?.str().map_err(&col_err)?;
    let x = df.column("x").map_err(&col_err)?.f64().map_err(&col_err)?;
    let y = df.column("y").map_err(&col_err)?.f64().map_err(&col_err)?;
    let xg = df.column("xg").map_err(&col_err)?.f64().map_err(&col_err)?;
    let xa = df.column("xa").map_err(&col_err)?.f64().map_err(&col_err)?;
    let outcome = df.column("outcome").map_err(&col_err)?.str().map_err(&col_err)?;

    let mut rows = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        rows.push(EventRow {
            event_id: event_id
                .get(i)
                .ok_or_else(|| null_at("events", "event_id", i))?
                .to_string(),
            match_id: match_id.get(i).ok_or_else(|| null_at("events", "match_id", i))?,
            index: index.get(i).unwrap_or_default(),
            period: period.get(i).unwrap_or_default(),
            minute: minute.get(i).unwrap_or_default(),
            second: second.get(i).unwrap_or_default(),
            type_name: type_name.get(i).unwrap_or_default().to_string(),
            team_name: team_name.get(i).unwrap_or_default().to_string(),
            player_name: player_name.get(i).map(str::to_string),
            x: x.get(i),
            y: y.get(i),
            xg: xg.get(i),
            xa: xa.get(i),
            outcome: outcome.get(i).map(str::to_string),
        });
    }
    Ok(rows)
}
