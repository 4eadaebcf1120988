//! Domain entities produced by enrichment.
//!
//! Every entity is strictly validated: undeclared fields are rejected on
//! deserialization and range checks run on both construction and
//! deserialization.

pub mod error;
pub mod event;
pub mod fixture;
pub mod ids;
pub mod payload;
pub mod team;

pub use error::ValidationError;
pub use event::{Event, ShotContext, ShotOutcome, SHOT_TYPE};
pub use fixture::{placeholder_kickoff, Match, MatchStatus};
pub use ids::{CompetitionSeason, EventId, MatchId};
pub use payload::{EnrichedPayload, Side};
pub use team::{Location, Player, Team, PITCH_LENGTH, PITCH_WIDTH};
