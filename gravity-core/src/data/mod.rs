//! Match data acquisition: source trait, wire shapes, retry policy, HTTP client.

pub mod provider;
pub mod raw;
pub mod retry;
pub mod statsbomb;

pub use provider::{FailureClass, FetchError, FetchedEvents, MatchSource};
pub use raw::{RawEvent, RawMatchMeta};
pub use retry::RetryPolicy;
pub use statsbomb::{StatsBombClient, DEFAULT_BASE_URL};
