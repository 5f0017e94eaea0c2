//! SQLite record store.
//!
//! Persists cars and car replicas to a single SQLite file, one table per
//! record type with the unique index as primary key.
//!
//! # Usage
//! ```rust,no_run
//! use dataswap_storage::sqlite::SqliteStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // File-backed (persistent)
//! let store = SqliteStore::open("./dataswap.db").await?;
//!
//! // In-memory (tests / ephemeral)
//! let store = SqliteStore::in_memory().await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use tracing::debug;

use dataswap_core::error::StoreError;
use dataswap_core::store::{Record, RecordStore, UpsertOutcome};
use dataswap_core::types::{Car, CarKey, CarReplica, CarReplicaKey, DataType, ReplicaState};

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

/// SQLite-backed store for cars and car replicas.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) a SQLite database at `path`.
    ///
    /// The path may be a plain file path (`"./dataswap.db"`) or a full
    /// SQLite URL (`"sqlite:./dataswap.db?mode=rwc"`).
    pub async fn open(path: &str) -> Result<Self, StoreError> {
        let url = if path.starts_with("sqlite:") {
            path.to_string()
        } else {
            format!("sqlite:{path}?mode=rwc")
        };

        let pool = SqlitePool::connect(&url).await.map_err(backend)?;
        let store = Self { pool };
        sqlx::query("PRAGMA journal_mode=WAL;")
            .execute(&store.pool)
            .await
            .map_err(backend)?;
        store.init_schema().await?;
        Ok(store)
    }

    /// Open an in-memory database. All data is lost when the pool is dropped.
    pub async fn in_memory() -> Result<Self, StoreError> {
        // every connection to :memory: is a separate database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(backend)?;
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS cars (
                hash           TEXT    NOT NULL,
                dataset_id     INTEGER NOT NULL,
                data_type      INTEGER NOT NULL,
                size           INTEGER,
                replicas_count INTEGER NOT NULL,
                PRIMARY KEY (hash, dataset_id, data_type)
            );",
        )
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS car_replicas (
                car_id      INTEGER NOT NULL,
                matching_id INTEGER NOT NULL,
                state       TEXT    NOT NULL,
                PRIMARY KEY (car_id, matching_id)
            );",
        )
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_car_replicas_matching ON car_replicas (matching_id);")
            .execute(&self.pool)
            .await
            .map_err(backend)?;

        Ok(())
    }

    /// Replicas created for one matching, ordered by car id.
    pub async fn replicas_for_matching(&self, matching_id: u64) -> Result<Vec<CarReplica>, StoreError> {
        let rows = sqlx::query(
            "SELECT car_id, matching_id, state FROM car_replicas
             WHERE matching_id = ? ORDER BY car_id",
        )
        .bind(matching_id as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.iter().map(replica_from_row).collect()
    }

    /// Cars belonging to one dataset, ordered by hash.
    pub async fn cars_for_dataset(&self, dataset_id: u64) -> Result<Vec<Car>, StoreError> {
        let rows = sqlx::query(
            "SELECT hash, dataset_id, data_type, size, replicas_count FROM cars
             WHERE dataset_id = ? ORDER BY hash, data_type",
        )
        .bind(dataset_id as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.iter().map(car_from_row).collect()
    }

    async fn count_rows(&self, table: &str) -> Result<usize, StoreError> {
        let row = sqlx::query(&format!("SELECT COUNT(*) AS cnt FROM {table}"))
            .fetch_one(&self.pool)
            .await
            .map_err(backend)?;
        let cnt: i64 = row.get("cnt");
        Ok(cnt as usize)
    }
}

// ─── Row mapping ─────────────────────────────────────────────────────────────

fn car_from_row(row: &SqliteRow) -> Result<Car, StoreError> {
    let hash: String = row.get("hash");
    let raw_type: i64 = row.get("data_type");
    let data_type = u8::try_from(raw_type)
        .ok()
        .and_then(DataType::from_u8)
        .ok_or_else(|| StoreError::InvalidRecord {
            key: hash.clone(),
            reason: format!("unknown data_type {raw_type}"),
        })?;
    let raw_count: i64 = row.get("replicas_count");
    let replicas_count = u16::try_from(raw_count).map_err(|_| StoreError::InvalidRecord {
        key: hash.clone(),
        reason: format!("replicas_count {raw_count} out of range"),
    })?;

    Ok(Car {
        dataset_id: row.get::<i64, _>("dataset_id") as u64,
        data_type,
        size: row.get::<Option<i64>, _>("size").map(|s| s as u64),
        replicas_count,
        hash,
    })
}

fn replica_from_row(row: &SqliteRow) -> Result<CarReplica, StoreError> {
    let car_id = row.get::<i64, _>("car_id") as u64;
    let matching_id = row.get::<i64, _>("matching_id") as u64;
    let raw_state: String = row.get("state");
    let state = ReplicaState::parse(&raw_state).ok_or_else(|| StoreError::InvalidRecord {
        key: CarReplicaKey { car_id, matching_id }.to_string(),
        reason: format!("unknown state '{raw_state}'"),
    })?;

    Ok(CarReplica {
        car_id,
        matching_id,
        state,
    })
}

fn outcome_for<R: Record>(existing: Option<R>, record: &R) -> UpsertOutcome {
    match existing {
        None => UpsertOutcome::Created,
        Some(old) if old == *record => UpsertOutcome::Unchanged,
        Some(_) => UpsertOutcome::Updated,
    }
}

// ─── RecordStore impls ───────────────────────────────────────────────────────

#[async_trait]
impl RecordStore<Car> for SqliteStore {
    async fn create_or_update_by_unique_index(&self, record: Car) -> Result<UpsertOutcome, StoreError> {
        let key = record.unique_index();
        record.validate().map_err(|reason| StoreError::InvalidRecord {
            key: key.to_string(),
            reason,
        })?;

        let mut tx = self.pool.begin().await.map_err(backend)?;

        let existing = sqlx::query(
            "SELECT hash, dataset_id, data_type, size, replicas_count FROM cars
             WHERE hash = ? AND dataset_id = ? AND data_type = ?",
        )
        .bind(&key.hash)
        .bind(key.dataset_id as i64)
        .bind(key.data_type.as_u8() as i64)
        .fetch_optional(&mut *tx)
        .await
        .map_err(backend)?
        .map(|row| car_from_row(&row))
        .transpose()?;

        let record = match &existing {
            Some(stored) => record.merged_with(stored),
            None => record,
        };
        let outcome = outcome_for(existing, &record);
        if outcome != UpsertOutcome::Unchanged {
            sqlx::query(
                "INSERT INTO cars (hash, dataset_id, data_type, size, replicas_count)
                 VALUES (?, ?, ?, ?, ?)
                 ON CONFLICT (hash, dataset_id, data_type) DO UPDATE SET
                     size = excluded.size,
                     replicas_count = excluded.replicas_count",
            )
            .bind(&record.hash)
            .bind(record.dataset_id as i64)
            .bind(record.data_type.as_u8() as i64)
            .bind(record.size.map(|s| s as i64))
            .bind(record.replicas_count as i64)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
        }
        tx.commit().await.map_err(backend)?;

        debug!(%key, ?outcome, "car upserted");
        Ok(outcome)
    }

    async fn find_by_unique_index(&self, key: &CarKey) -> Result<Option<Car>, StoreError> {
        sqlx::query(
            "SELECT hash, dataset_id, data_type, size, replicas_count FROM cars
             WHERE hash = ? AND dataset_id = ? AND data_type = ?",
        )
        .bind(&key.hash)
        .bind(key.dataset_id as i64)
        .bind(key.data_type.as_u8() as i64)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?
        .map(|row| car_from_row(&row))
        .transpose()
    }

    async fn count(&self) -> Result<usize, StoreError> {
        self.count_rows(Car::COLLECTION).await
    }
}

#[async_trait]
impl RecordStore<CarReplica> for SqliteStore {
    async fn create_or_update_by_unique_index(&self, record: CarReplica) -> Result<UpsertOutcome, StoreError> {
        let key = record.unique_index();
        let mut tx = self.pool.begin().await.map_err(backend)?;

        let existing = sqlx::query(
            "SELECT car_id, matching_id, state FROM car_replicas
             WHERE car_id = ? AND matching_id = ?",
        )
        .bind(key.car_id as i64)
        .bind(key.matching_id as i64)
        .fetch_optional(&mut *tx)
        .await
        .map_err(backend)?
        .map(|row| replica_from_row(&row))
        .transpose()?;

        let outcome = outcome_for(existing, &record);
        if outcome != UpsertOutcome::Unchanged {
            sqlx::query(
                "INSERT INTO car_replicas (car_id, matching_id, state)
                 VALUES (?, ?, ?)
                 ON CONFLICT (car_id, matching_id) DO UPDATE SET state = excluded.state",
            )
            .bind(record.car_id as i64)
            .bind(record.matching_id as i64)
            .bind(record.state.as_str())
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
        }
        tx.commit().await.map_err(backend)?;

        debug!(%key, ?outcome, "car replica upserted");
        Ok(outcome)
    }

    async fn find_by_unique_index(&self, key: &CarReplicaKey) -> Result<Option<CarReplica>, StoreError> {
        sqlx::query(
            "SELECT car_id, matching_id, state FROM car_replicas
             WHERE car_id = ? AND matching_id = ?",
        )
        .bind(key.car_id as i64)
        .bind(key.matching_id as i64)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?
        .map(|row| replica_from_row(&row))
        .transpose()
    }

    async fn count(&self) -> Result<usize, StoreError> {
        self.count_rows(CarReplica::COLLECTION).await
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use dataswap_core::store::upsert_batch;

    fn car(hash: &str, size: Option<u64>) -> Car {
        Car {
            hash: hash.into(),
            dataset_id: 9,
            data_type: DataType::Source,
            size,
            replicas_count: 3,
        }
    }

    #[tokio::test]
    async fn car_roundtrip() {
        let store = SqliteStore::in_memory().await.unwrap();
        let c = car("0xaa", Some(2048));

        let outcome = store.create_or_update_by_unique_index(c.clone()).await.unwrap();
        assert_eq!(outcome, UpsertOutcome::Created);

        let loaded = store.find_by_unique_index(&c.unique_index()).await.unwrap();
        assert_eq!(loaded, Some(c));
    }

    #[tokio::test]
    async fn car_upsert_detects_changes() {
        let store = SqliteStore::in_memory().await.unwrap();
        store.create_or_update_by_unique_index(car("0xaa", None)).await.unwrap();

        let same = store.create_or_update_by_unique_index(car("0xaa", None)).await.unwrap();
        assert_eq!(same, UpsertOutcome::Unchanged);

        let grown = store.create_or_update_by_unique_index(car("0xaa", Some(10))).await.unwrap();
        assert_eq!(grown, UpsertOutcome::Updated);
        assert_eq!(RecordStore::<Car>::count(&store).await.unwrap(), 1);
        assert_eq!(store.cars_for_dataset(9).await.unwrap()[0].size, Some(10));
    }

    #[tokio::test]
    async fn unknown_size_does_not_erase_a_stored_one() {
        let store = SqliteStore::in_memory().await.unwrap();
        store.create_or_update_by_unique_index(car("0xaa", Some(1024))).await.unwrap();

        let outcome = store.create_or_update_by_unique_index(car("0xaa", None)).await.unwrap();
        assert_eq!(outcome, UpsertOutcome::Unchanged);
        assert_eq!(store.cars_for_dataset(9).await.unwrap()[0].size, Some(1024));
    }

    #[tokio::test]
    async fn out_of_range_replicas_count_is_rejected_on_read() {
        let store = SqliteStore::in_memory().await.unwrap();
        sqlx::query(
            "INSERT INTO cars (hash, dataset_id, data_type, size, replicas_count)
             VALUES ('0xbb', 9, 0, NULL, 70000)",
        )
        .execute(&store.pool)
        .await
        .unwrap();

        let err = store.cars_for_dataset(9).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidRecord { ref key, .. } if key == "0xbb"));
    }

    #[tokio::test]
    async fn replica_batch_is_idempotent() {
        let store = SqliteStore::in_memory().await.unwrap();
        let batch: Vec<CarReplica> = [101, 102]
            .into_iter()
            .map(|car_id| CarReplica { car_id, matching_id: 3, state: ReplicaState::Matched })
            .collect();

        let first = upsert_batch(&store, batch.clone()).await.unwrap();
        assert_eq!(first.created, 2);
        let second = upsert_batch(&store, batch).await.unwrap();
        assert_eq!(second.unchanged, 2);

        let replicas = store.replicas_for_matching(3).await.unwrap();
        assert_eq!(replicas.iter().map(|r| r.car_id).collect::<Vec<_>>(), vec![101, 102]);
    }

    #[tokio::test]
    async fn batch_stops_at_invalid_car() {
        let store = SqliteStore::in_memory().await.unwrap();
        let batch = vec![car("0x1", None), car("", None), car("0x3", None)];

        let err = upsert_batch(&store, batch).await.unwrap_err();
        assert_eq!(err.index(), 1);
        assert_eq!(RecordStore::<Car>::count(&store).await.unwrap(), 1);
    }
}
