//! In-memory record store.
//!
//! Keeps cars and car replicas in RAM, keyed by their unique index.
//! Useful for tests and one-shot syncs that don't need persistence.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use tracing::trace;

use dataswap_core::error::StoreError;
use dataswap_core::store::{Record, RecordStore, UpsertOutcome};
use dataswap_core::types::{Car, CarKey, CarReplica, CarReplicaKey};

type Table<R> = Mutex<BTreeMap<<R as Record>::Key, R>>;

/// In-memory store. All data is lost when the process exits.
#[derive(Default)]
pub struct InMemoryStore {
    cars: Table<Car>,
    car_replicas: Table<CarReplica>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored car, ordered by unique index.
    pub fn cars(&self) -> Vec<Car> {
        snapshot(&self.cars, |_| true)
    }

    /// Cars belonging to one dataset.
    pub fn cars_for_dataset(&self, dataset_id: u64) -> Vec<Car> {
        snapshot(&self.cars, |c| c.dataset_id == dataset_id)
    }

    /// Every stored replica, ordered by unique index.
    pub fn car_replicas(&self) -> Vec<CarReplica> {
        snapshot(&self.car_replicas, |_| true)
    }

    /// Replicas created for one matching.
    pub fn replicas_for_matching(&self, matching_id: u64) -> Vec<CarReplica> {
        snapshot(&self.car_replicas, |r| r.matching_id == matching_id)
    }
}

fn lock<R: Record>(table: &Table<R>) -> Result<MutexGuard<'_, BTreeMap<R::Key, R>>, StoreError> {
    table
        .lock()
        .map_err(|_| StoreError::Backend(format!("{} table lock poisoned", R::COLLECTION)))
}

fn snapshot<R: Record>(table: &Table<R>, keep: impl Fn(&R) -> bool) -> Vec<R> {
    match table.lock() {
        Ok(rows) => rows.values().filter(|r| keep(r)).cloned().collect(),
        Err(poisoned) => poisoned.into_inner().values().filter(|r| keep(r)).cloned().collect(),
    }
}

fn upsert<R: Record>(table: &Table<R>, record: R) -> Result<UpsertOutcome, StoreError> {
    let key = record.unique_index();
    record.validate().map_err(|reason| StoreError::InvalidRecord {
        key: key.to_string(),
        reason,
    })?;

    let mut rows = lock(table)?;
    let (record, outcome) = match rows.get(&key) {
        None => (record, UpsertOutcome::Created),
        Some(existing) => {
            let merged = record.merged_with(existing);
            if merged == *existing {
                return Ok(UpsertOutcome::Unchanged);
            }
            (merged, UpsertOutcome::Updated)
        }
    };
    trace!(collection = R::COLLECTION, %key, ?outcome, "memory upsert");
    rows.insert(key, record);
    Ok(outcome)
}

fn find<R: Record>(table: &Table<R>, key: &R::Key) -> Result<Option<R>, StoreError> {
    Ok(lock(table)?.get(key).cloned())
}

#[async_trait]
impl RecordStore<Car> for InMemoryStore {
    async fn create_or_update_by_unique_index(&self, record: Car) -> Result<UpsertOutcome, StoreError> {
        upsert(&self.cars, record)
    }

    async fn find_by_unique_index(&self, key: &CarKey) -> Result<Option<Car>, StoreError> {
        find(&self.cars, key)
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(lock(&self.cars)?.len())
    }
}

#[async_trait]
impl RecordStore<CarReplica> for InMemoryStore {
    async fn create_or_update_by_unique_index(&self, record: CarReplica) -> Result<UpsertOutcome, StoreError> {
        upsert(&self.car_replicas, record)
    }

    async fn find_by_unique_index(&self, key: &CarReplicaKey) -> Result<Option<CarReplica>, StoreError> {
        find(&self.car_replicas, key)
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(lock(&self.car_replicas)?.len())
    }
}
