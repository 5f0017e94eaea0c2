//! Converter output reconciled into the in-memory store.

use dataswap_core::store::{upsert_batch, RecordStore};
use dataswap_core::types::{Car, CarReplica, DataType, DatasetProofData, MatchingTarget, ReplicaState};
use dataswap_core::{matching_target_to_car_replicas, proof_data_to_cars, ReconcileError};
use dataswap_storage::InMemoryStore;

fn target(matching_id: u64, cars: Vec<u64>) -> MatchingTarget {
    MatchingTarget {
        matching_id,
        dataset_id: 9,
        cars,
        size: 4096,
        data_type: DataType::Source,
        associated_mapping_files_matching_id: 0,
    }
}

#[tokio::test]
async fn matching_target_scenario() {
    let store = InMemoryStore::new();
    let replicas = matching_target_to_car_replicas(&target(3, vec![101, 102]));

    let report = upsert_batch(&store, replicas).await.unwrap();
    assert_eq!(report.created, 2);
    assert_eq!(
        store.car_replicas(),
        vec![
            CarReplica { car_id: 101, matching_id: 3, state: ReplicaState::Matched },
            CarReplica { car_id: 102, matching_id: 3, state: ReplicaState::Matched },
        ]
    );
}

#[tokio::test]
async fn resync_after_crash_converges() {
    let store = InMemoryStore::new();
    let hashes: Vec<String> = (0..6).map(|i| format!("0x{i:02x}")).collect();
    let proof = DatasetProofData::new(9, DataType::Source, hashes).with_replicas_count(2);
    let cars = proof_data_to_cars(&proof);

    // first pass only got halfway
    upsert_batch(&store, cars[..3].to_vec()).await.unwrap();

    let report = upsert_batch(&store, cars.clone()).await.unwrap();
    assert_eq!((report.unchanged, report.created), (3, 3));
    assert_eq!(RecordStore::<Car>::count(&store).await.unwrap(), 6);
    assert_eq!(store.cars_for_dataset(9), cars);
}

#[tokio::test]
async fn failure_reports_position_and_key() {
    let store = InMemoryStore::new();
    let proof = DatasetProofData::new(
        4,
        DataType::MappingFiles,
        vec!["0xa".into(), "0xb".into(), "".into(), "0xd".into()],
    );

    let err = upsert_batch(&store, proof_data_to_cars(&proof)).await.unwrap_err();
    let ReconcileError::RecordFailed { collection, index, .. } = &err;
    assert_eq!((*collection, *index), ("cars", 2));
    assert_eq!(store.cars().len(), 2);
}

#[tokio::test]
async fn replicas_of_different_matchings_coexist() {
    let store = InMemoryStore::new();
    upsert_batch(&store, matching_target_to_car_replicas(&target(3, vec![101]))).await.unwrap();
    upsert_batch(&store, matching_target_to_car_replicas(&target(4, vec![101]))).await.unwrap();

    assert_eq!(RecordStore::<CarReplica>::count(&store).await.unwrap(), 2);
    assert_eq!(store.replicas_for_matching(4).len(), 1);
}

#[tokio::test]
async fn one_car_per_hash_regardless_of_case() {
    let store = InMemoryStore::new();
    let lower = DatasetProofData::new(9, DataType::Source, vec![format!("0x{}", "ab".repeat(32))]);
    let upper = DatasetProofData::new(9, DataType::Source, vec![format!("0x{}", "AB".repeat(32))]);

    upsert_batch(&store, proof_data_to_cars(&lower)).await.unwrap();
    let report = upsert_batch(&store, proof_data_to_cars(&upper)).await.unwrap();

    assert_eq!(report.unchanged, 1);
    assert_eq!(RecordStore::<Car>::count(&store).await.unwrap(), 1);
}
