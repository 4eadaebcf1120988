//! Gravity Core — domain entities and the collaborators the pipeline runs on.
//!
//! - Domain types (matches, events, shot context, enriched payloads) with
//!   strict validation
//! - Match data acquisition over HTTPS with bounded retry
//! - Append-only JSONL audit trail
//! - Logistic xG scorer
//! - Encrypted Parquet store

pub mod audit;
pub mod data;
pub mod domain;
pub mod scoring;
pub mod store;
