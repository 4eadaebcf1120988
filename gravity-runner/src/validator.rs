//! Post-load quality gate.
//!
//! Flags matches whose event stream looks incomplete or whose scorelines are
//! wildly out of line with the accumulated xG. A failing report is recorded
//! and logged; it never stops the run.

use crate::config::QualityConfig;
use gravity_core::audit::{agent, AuditSink};
use gravity_core::domain::{EnrichedPayload, MatchId};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub match_id: MatchId,
    pub total_events: usize,
    pub total_shots: usize,
    pub home_xg: f64,
    pub away_xg: f64,
    pub passed: bool,
    pub anomalies: Vec<String>,
}

/// Build a report without side effects.
pub fn generate_report(payload: &EnrichedPayload, config: &QualityConfig) -> QualityReport {
    let total_events = payload.events.len();
    let home_goals = payload.fixture.home_score as f64;
    let away_goals = payload.fixture.away_score as f64;

    let mut anomalies = Vec::new();
    if total_events < config.min_events {
        anomalies.push(format!(
            "Low event count: {total_events} (minimum {})",
            config.min_events
        ));
    }
    if (home_goals - payload.total_home_xg).abs() > config.xg_margin {
        anomalies.push(format!(
            "Home xG anomaly. Goals: {home_goals}, xG: {:.2}",
            payload.total_home_xg
        ));
    }
    if (away_goals - payload.total_away_xg).abs() > config.xg_margin {
        anomalies.push(format!(
            "Away xG anomaly. Goals: {away_goals}, xG: {:.2}",
            payload.total_away_xg
        ));
    }

    QualityReport {
        match_id: payload.fixture.id,
        total_events,
        total_shots: payload.shot_count(),
        home_xg: payload.total_home_xg,
        away_xg: payload.total_away_xg,
        passed: anomalies.is_empty(),
        anomalies,
    }
}

pub struct QualityValidator {
    config: QualityConfig,
    audit: Arc<dyn AuditSink>,
}

impl QualityValidator {
    pub fn new(config: QualityConfig, audit: Arc<dyn AuditSink>) -> Self {
        Self { config, audit }
    }

    /// Generate, audit and return the report for one persisted payload.
    pub fn validate(&self, payload: &EnrichedPayload) -> QualityReport {
        let report = generate_report(payload, &self.config);
        self.audit.record(
            "validation_report",
            agent::VALIDATOR,
            serde_json::to_value(&report).unwrap_or_else(|_| json!({"match_id": report.match_id})),
        );

        if !report.passed {
            tracing::warn!(
                match_id = %report.match_id,
                anomalies = ?report.anomalies,
                "quality check failed"
            );
            self.audit.record(
                "validation_failed",
                agent::VALIDATOR,
                json!({"match_id": report.match_id, "anomalies": report.anomalies}),
            );
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gravity_core::audit::MemoryAudit;
    use gravity_core::domain::{Event, EventId, Match, Team};

    fn events(n: usize) -> Vec<Event> {
        (1..=n as i64)
            .map(|i| Event {
                id: EventId::new(format!("e{i}")),
                match_id: MatchId(1),
                index: i,
                period: 1,
                timestamp: "00:00:01.000".into(),
                minute: 0,
                second: 1,
                type_name: "Pass".into(),
                possession_team: Team::new(1, "Home Team"),
                player: None,
                location: None,
                shot_context: None,
            })
            .collect()
    }

    fn payload(n: usize, home_score: i64) -> EnrichedPayload {
        let mut fixture = Match::placeholder(MatchId(1));
        fixture.home_score = home_score;
        EnrichedPayload::assemble(fixture, events(n), 0.0, 0.0).unwrap()
    }

    #[test]
    fn healthy_match_passes() {
        let report = generate_report(&payload(600, 2), &QualityConfig::default());
        assert!(report.passed, "{:?}", report.anomalies);
        assert_eq!(report.total_events, 600);
        assert_eq!(report.total_shots, 0);
    }

    #[test]
    fn low_event_count_is_flagged() {
        let report = generate_report(&payload(10, 0), &QualityConfig::default());
        assert!(!report.passed);
        assert_eq!(report.anomalies.len(), 1);
        assert!(report.anomalies[0].starts_with("Low event count: 10"));
    }

    #[test]
    fn score_far_from_xg_is_flagged() {
        let report = generate_report(&payload(600, 7), &QualityConfig::default());
        assert!(!report.passed);
        assert!(report.anomalies[0].starts_with("Home xG anomaly"));

        let lenient = QualityConfig {
            xg_margin: 10.0,
            ..QualityConfig::default()
        };
        assert!(generate_report(&payload(600, 7), &lenient).passed);
    }

    #[test]
    fn failing_report_is_audited_twice() {
        let audit = Arc::new(MemoryAudit::new());
        let validator = QualityValidator::new(QualityConfig::default(), audit.clone());
        let report = validator.validate(&payload(1, 0));
        assert!(!report.passed);
        assert_eq!(audit.count("validation_report"), 1);
        assert_eq!(audit.count("validation_failed"), 1);
    }
}
