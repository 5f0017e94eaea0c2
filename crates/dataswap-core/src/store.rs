//! Reconciliation store: create-or-update by business unique index.

use async_trait::async_trait;
use futures::stream::{self, TryStreamExt};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;
use tracing::{debug, info};

use crate::error::{ReconcileError, StoreError};
use crate::types::{Car, CarKey, CarReplica, CarReplicaKey};

/// A record the store can reconcile.
///
/// `unique_index` is the business-defined composite key. Converter and store
/// must derive it the same way or duplicates accumulate.
pub trait Record: Clone + PartialEq + Send + Sync + 'static {
    /// Logical collection / table name.
    const COLLECTION: &'static str;

    type Key: Clone + Eq + Hash + Ord + fmt::Display + Send + Sync + 'static;

    fn unique_index(&self) -> Self::Key;

    /// Fold what the stored record already knows into an incoming one.
    ///
    /// Stores apply this before comparing and writing, so a source that
    /// carries less detail never erases it.
    fn merged_with(self, _stored: &Self) -> Self {
        self
    }

    /// Structural checks applied by stores before writing.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

impl Record for Car {
    const COLLECTION: &'static str = "cars";
    type Key = CarKey;

    fn unique_index(&self) -> CarKey {
        CarKey {
            hash: self.hash.clone(),
            dataset_id: self.dataset_id,
            data_type: self.data_type,
        }
    }

    /// A known size survives an update whose source has none.
    fn merged_with(self, stored: &Self) -> Self {
        Car {
            size: self.size.or(stored.size),
            ..self
        }
    }

    fn validate(&self) -> Result<(), String> {
        if self.hash.trim().is_empty() {
            return Err("car hash is empty".into());
        }
        Ok(())
    }
}

impl Record for CarReplica {
    const COLLECTION: &'static str = "car_replicas";
    type Key = CarReplicaKey;

    fn unique_index(&self) -> CarReplicaKey {
        CarReplicaKey {
            car_id: self.car_id,
            matching_id: self.matching_id,
        }
    }
}

/// What a single upsert did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpsertOutcome {
    /// No record with this unique index existed.
    Created,
    /// An existing record was overwritten with different content.
    Updated,
    /// The stored record already matched.
    Unchanged,
}

/// Persistence adapter for one record type.
#[async_trait]
pub trait RecordStore<R: Record>: Send + Sync {
    /// Create the record, or replace the one sharing its unique index.
    async fn create_or_update_by_unique_index(&self, record: R) -> Result<UpsertOutcome, StoreError>;

    /// Fetch the record stored under `key`.
    async fn find_by_unique_index(&self, key: &R::Key) -> Result<Option<R>, StoreError>;

    /// Number of stored records.
    async fn count(&self) -> Result<usize, StoreError>;
}

/// Tally of a successful batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
}

impl BatchReport {
    fn record(&mut self, outcome: UpsertOutcome) {
        match outcome {
            UpsertOutcome::Created => self.created += 1,
            UpsertOutcome::Updated => self.updated += 1,
            UpsertOutcome::Unchanged => self.unchanged += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.created + self.updated + self.unchanged
    }
}

/// Upsert `records` in order, stopping at the first failure.
///
/// Records are applied one at a time. On failure the error carries the
/// zero-based index of the failing record; everything before it is already
/// committed and nothing after it was attempted.
pub async fn upsert_batch<R, S>(store: &S, records: Vec<R>) -> Result<BatchReport, ReconcileError>
where
    R: Record,
    S: RecordStore<R> + ?Sized,
{
    let total = records.len();

    let report = stream::iter(records.into_iter().enumerate().map(Ok::<_, ReconcileError>))
        .try_fold(BatchReport::default(), |mut report, (index, record)| async move {
            let key = record.unique_index();
            match store.create_or_update_by_unique_index(record).await {
                Ok(outcome) => {
                    debug!(collection = R::COLLECTION, index, %key, ?outcome, "record reconciled");
                    report.record(outcome);
                    Ok(report)
                }
                Err(source) => Err(ReconcileError::RecordFailed {
                    collection: R::COLLECTION,
                    index,
                    key: key.to_string(),
                    source,
                }),
            }
        })
        .await?;

    info!(
        collection = R::COLLECTION,
        total,
        created = report.created,
        updated = report.updated,
        unchanged = report.unchanged,
        "batch reconciled"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DataType, ReplicaState};
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    /// Minimal map-backed store that rejects invalid records.
    #[derive(Default)]
    struct MapStore {
        rows: Mutex<BTreeMap<CarKey, Car>>,
        writes: Mutex<usize>,
    }

    #[async_trait]
    impl RecordStore<Car> for MapStore {
        async fn create_or_update_by_unique_index(&self, record: Car) -> Result<UpsertOutcome, StoreError> {
            let key = record.unique_index();
            record.validate().map_err(|reason| StoreError::InvalidRecord {
                key: key.to_string(),
                reason,
            })?;
            *self.writes.lock().unwrap() += 1;
            let mut rows = self.rows.lock().unwrap();
            let record = match rows.get(&key) {
                Some(old) => record.merged_with(old),
                None => record,
            };
            Ok(match rows.insert(key, record.clone()) {
                None => UpsertOutcome::Created,
                Some(old) if old == record => UpsertOutcome::Unchanged,
                Some(_) => UpsertOutcome::Updated,
            })
        }

        async fn find_by_unique_index(&self, key: &CarKey) -> Result<Option<Car>, StoreError> {
            Ok(self.rows.lock().unwrap().get(key).cloned())
        }

        async fn count(&self) -> Result<usize, StoreError> {
            Ok(self.rows.lock().unwrap().len())
        }
    }

    fn car(hash: &str) -> Car {
        Car {
            hash: hash.into(),
            dataset_id: 1,
            data_type: DataType::Source,
            size: None,
            replicas_count: 2,
        }
    }

    #[tokio::test]
    async fn second_application_creates_nothing() {
        let store = MapStore::default();
        let batch = vec![car("0xa"), car("0xb"), car("0xc")];

        let first = upsert_batch(&store, batch.clone()).await.unwrap();
        assert_eq!(first.created, 3);

        let second = upsert_batch(&store, batch).await.unwrap();
        assert_eq!(second, BatchReport { created: 0, updated: 0, unchanged: 3 });
        assert_eq!(store.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn stops_at_first_failure() {
        let store = MapStore::default();
        let batch = vec![car("0xa"), car("0xb"), car(""), car("0xd")];

        let err = upsert_batch(&store, batch).await.unwrap_err();
        assert_eq!(err.index(), 2);
        assert!(matches!(&err, ReconcileError::RecordFailed { collection: "cars", .. }));

        // 0xa and 0xb committed, 0xd never attempted
        assert_eq!(store.count().await.unwrap(), 2);
        assert_eq!(*store.writes.lock().unwrap(), 2);
        let d = car("0xd").unique_index();
        assert!(store.find_by_unique_index(&d).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn changed_content_is_an_update() {
        let store = MapStore::default();
        upsert_batch(&store, vec![car("0xa")]).await.unwrap();

        let mut grown = car("0xa");
        grown.size = Some(4096);
        let report = upsert_batch(&store, vec![grown.clone()]).await.unwrap();
        assert_eq!(report.updated, 1);
        let stored = store.find_by_unique_index(&grown.unique_index()).await.unwrap();
        assert_eq!(stored, Some(grown));
    }

    #[tokio::test]
    async fn unknown_size_keeps_the_stored_one() {
        let store = MapStore::default();
        let mut sized = car("0xa");
        sized.size = Some(1024);
        upsert_batch(&store, vec![sized.clone()]).await.unwrap();

        let report = upsert_batch(&store, vec![car("0xa")]).await.unwrap();
        assert_eq!(report.unchanged, 1);
        let stored = store.find_by_unique_index(&sized.unique_index()).await.unwrap();
        assert_eq!(stored.and_then(|c| c.size), Some(1024));
    }

    #[test]
    fn merge_prefers_incoming_fields() {
        let mut stored = car("0xa");
        stored.size = Some(1);
        let mut incoming = car("0xa");
        incoming.size = Some(2);
        incoming.replicas_count = 5;

        let merged = incoming.clone().merged_with(&stored);
        assert_eq!(merged, incoming);
        assert_eq!(car("0xa").merged_with(&stored).size, Some(1));
    }

    #[tokio::test]
    async fn empty_batch_is_ok() {
        let store = MapStore::default();
        let report = upsert_batch(&store, Vec::<Car>::new()).await.unwrap();
        assert_eq!(report.total(), 0);
    }

    #[test]
    fn replica_key_ignores_state() {
        let a = CarReplica { car_id: 1, matching_id: 2, state: ReplicaState::Matched };
        let b = CarReplica { state: ReplicaState::Stored, ..a.clone() };
        assert_eq!(a.unique_index(), b.unique_index());
    }
}
