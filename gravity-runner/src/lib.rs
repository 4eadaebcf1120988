//! Gravity Runner — pipeline orchestration over the `gravity-core` collaborators.
//!
//! This crate provides:
//! - TOML configuration with validation
//! - Pipeline state, stage payloads and run summary
//! - Enricher (drop-on-invalid, xG scoring)
//! - Loader (scoped storage session, encrypted flush)
//! - Quality validator
//! - The orchestrator state machine

pub mod config;
pub mod enricher;
pub mod error;
pub mod loader;
pub mod orchestrator;
pub mod state;
pub mod validator;

pub use config::{
    encryption_key_from_env, ConfigError, PipelineConfig, QualityConfig, UnitFailurePolicy,
    ENCRYPTION_KEY_VAR,
};
pub use enricher::{match_from_listing, Enricher};
pub use error::{EnrichmentError, ErrorKind, PersistenceError, PipelineError};
pub use loader::Loader;
pub use orchestrator::{Collaborators, Pipeline};
pub use state::{
    EnrichOutput, FetchOutput, LoadOutput, LoadReceipt, PipelineState, PipelineStatus,
    RunSummary, Stage, TargetDate, TargetDateError,
};
pub use validator::{generate_report, QualityReport, QualityValidator};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn config_is_send_sync() {
        assert_send::<PipelineConfig>();
        assert_sync::<PipelineConfig>();
    }

    #[test]
    fn pipeline_is_send_sync() {
        assert_send::<Pipeline>();
        assert_sync::<Pipeline>();
    }

    #[test]
    fn summary_is_send_sync() {
        assert_send::<RunSummary>();
        assert_sync::<RunSummary>();
        assert_send::<PipelineError>();
        assert_sync::<PipelineError>();
    }

    #[test]
    fn stage_is_send() {
        assert_send::<Stage>();
    }
}
