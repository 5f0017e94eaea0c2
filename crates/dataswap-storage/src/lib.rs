//! dataswap-storage: record stores for the Dataswap sync layer.
//!
//! Backends:
//! - [`memory`]: in-memory (dev/testing, no persistence)
//! - [`sqlite`]: SQLite via `sqlx` (feature `sqlite`)
//!
//! [`open`] picks a backend from [`StorageConfig`].

pub mod memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

use async_trait::async_trait;
use tracing::info;

use dataswap_core::config::{StorageBackend, StorageConfig};
use dataswap_core::error::StoreError;
use dataswap_core::store::{RecordStore, UpsertOutcome};
use dataswap_core::types::{Car, CarKey, CarReplica, CarReplicaKey};

pub use memory::InMemoryStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

/// A store chosen at runtime from configuration.
pub enum SyncStore {
    Memory(InMemoryStore),
    #[cfg(feature = "sqlite")]
    Sqlite(SqliteStore),
}

/// Open the backend named by `config`.
pub async fn open(config: &StorageConfig) -> Result<SyncStore, StoreError> {
    match config.backend {
        StorageBackend::Memory => {
            info!(backend = "memory", "record store opened");
            Ok(SyncStore::Memory(InMemoryStore::new()))
        }
        #[cfg(feature = "sqlite")]
        StorageBackend::Sqlite => {
            let path = config
                .path
                .as_deref()
                .ok_or_else(|| StoreError::Backend("sqlite backend requires a path".into()))?;
            let store = SqliteStore::open(path).await?;
            info!(backend = "sqlite", path, "record store opened");
            Ok(SyncStore::Sqlite(store))
        }
        #[cfg(not(feature = "sqlite"))]
        StorageBackend::Sqlite => Err(StoreError::Backend(
            "sqlite backend requested but the `sqlite` feature is disabled".into(),
        )),
    }
}

macro_rules! delegate_store {
    ($record:ty, $key:ty) => {
        #[async_trait]
        impl RecordStore<$record> for SyncStore {
            async fn create_or_update_by_unique_index(&self, record: $record) -> Result<UpsertOutcome, StoreError> {
                match self {
                    Self::Memory(s) => s.create_or_update_by_unique_index(record).await,
                    #[cfg(feature = "sqlite")]
                    Self::Sqlite(s) => s.create_or_update_by_unique_index(record).await,
                }
            }

            async fn find_by_unique_index(&self, key: &$key) -> Result<Option<$record>, StoreError> {
                match self {
                    Self::Memory(s) => s.find_by_unique_index(key).await,
                    #[cfg(feature = "sqlite")]
                    Self::Sqlite(s) => s.find_by_unique_index(key).await,
                }
            }

            async fn count(&self) -> Result<usize, StoreError> {
                match self {
                    Self::Memory(s) => RecordStore::<$record>::count(s).await,
                    #[cfg(feature = "sqlite")]
                    Self::Sqlite(s) => RecordStore::<$record>::count(s).await,
                }
            }
        }
    };
}

delegate_store!(Car, CarKey);
delegate_store!(CarReplica, CarReplicaKey);
