//! Encrypted persistence: sealed Parquet tables plus a manifest.

pub mod secure;
pub mod tables;
pub mod vault;

pub use secure::{
    EncryptedStore, FlushReport, Manifest, Storage, StorageSession, StoreError, StoreSnapshot,
    TableManifest, UpsertCounts, EVENTS_TABLE, MATCHES_TABLE,
};
pub use tables::{EventRow, MatchRow};
pub use vault::{Vault, VaultError};
