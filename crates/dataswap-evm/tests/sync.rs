//! ProtocolSync against a scripted chain and the in-memory store.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use dataswap_core::client::{ChainClient, TxOptions, TxReceipt};
use dataswap_core::config::ContractAddresses;
use dataswap_core::error::{ContractError, TransportError};
use dataswap_core::message::RawMessage;
use dataswap_core::types::{DataType, ReplicaState};
use dataswap_core::value::ParamValue;
use dataswap_evm::{DataswapContracts, ProtocolSync, SyncError};
use dataswap_storage::InMemoryStore;

const PROOF: &str = "0x3333333333333333333333333333333333333333";
const TARGET: &str = "0x4444444444444444444444444444444444444444";

fn addresses() -> ContractAddresses {
    ContractAddresses {
        escrow: "0x1111111111111111111111111111111111111111".into(),
        dataset_requirement: "0x2222222222222222222222222222222222222222".into(),
        dataset_proof: PROOF.into(),
        matching_target: TARGET.into(),
    }
}

fn leaf(i: u8) -> String {
    format!("0x{}", hex::encode([i; 32]))
}

/// A deployment holding one dataset proof and one matching target.
struct Chain {
    leaves: Vec<String>,
    replicas: u64,
    cars: Vec<u64>,
    timeout_on: Option<&'static str>,
    calls: Mutex<Vec<(String, Vec<ParamValue>)>>,
}

impl Chain {
    fn new(leaves: usize) -> Self {
        Self {
            leaves: (0..leaves as u8).map(leaf).collect(),
            replicas: 3,
            cars: vec![101, 102],
            timeout_on: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls_to(&self, method: &str) -> Vec<Vec<ParamValue>> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, a)| a.clone())
            .collect()
    }
}

#[async_trait]
impl ChainClient for Chain {
    async fn call(&self, _address: &str, method: &str, args: Vec<ParamValue>) -> Result<ParamValue, TransportError> {
        self.calls.lock().unwrap().push((method.to_string(), args.clone()));
        if self.timeout_on == Some(method) {
            return Err(TransportError::Timeout { ms: 30_000 });
        }
        let arg = |i: usize| args.get(i).and_then(ParamValue::as_u64).unwrap_or(0) as usize;

        match method {
            "getDatasetProofCount" => Ok(ParamValue::from(self.leaves.len() as u64)),
            "getDatasetProof" => {
                let start = arg(2).min(self.leaves.len());
                let end = (start + arg(3)).min(self.leaves.len());
                Ok(ParamValue::Array(
                    self.leaves[start..end].iter().cloned().map(ParamValue::Str).collect(),
                ))
            }
            "getDatasetReplicasCount" => Ok(ParamValue::from(self.replicas)),
            "getMatchingTarget" => Ok(ParamValue::Tuple(vec![
                ("datasetId".into(), ParamValue::Uint(9)),
                (
                    "cars".into(),
                    ParamValue::Array(self.cars.iter().map(|c| ParamValue::from(*c)).collect()),
                ),
                ("size".into(), ParamValue::Uint(4096)),
                ("dataType".into(), ParamValue::Uint(0)),
                ("associatedMappingFilesMatchingID".into(), ParamValue::Uint(0)),
            ])),
            other => Err(TransportError::Other(format!("unexpected call {other}"))),
        }
    }

    async fn send(
        &self,
        _address: &str,
        method: &str,
        args: Vec<ParamValue>,
        _options: &TxOptions,
    ) -> Result<TxReceipt, TransportError> {
        self.calls.lock().unwrap().push((method.to_string(), args));
        Ok(TxReceipt { tx_hash: "0x01".into() })
    }
}

fn sync(chain: Arc<Chain>) -> ProtocolSync<InMemoryStore> {
    let contracts = DataswapContracts::new(&addresses(), chain).unwrap();
    ProtocolSync::new(contracts, Arc::new(InMemoryStore::new()))
}

#[tokio::test]
async fn matching_target_becomes_two_replicas() {
    let sync = sync(Arc::new(Chain::new(0)));

    let report = sync.sync_matching(3).await.unwrap();
    assert_eq!(report.created, 2);

    let stored = sync.store().replicas_for_matching(3);
    assert_eq!(stored.iter().map(|r| r.car_id).collect::<Vec<_>>(), vec![101, 102]);
    assert!(stored.iter().all(|r| r.state == ReplicaState::Matched));
}

#[tokio::test]
async fn repeated_sync_leaves_one_record_per_key() {
    let sync = sync(Arc::new(Chain::new(5)));

    sync.sync_dataset(9, DataType::Source).await.unwrap();
    let again = sync.sync_dataset(9, DataType::Source).await.unwrap();

    assert_eq!((again.created, again.updated, again.unchanged), (0, 0, 5));
    assert_eq!(sync.store().cars().len(), 5);
}

#[tokio::test]
async fn proof_is_fetched_in_pages() {
    let chain = Arc::new(Chain::new(5));
    let sync = sync(chain.clone()).with_page_size(2);

    let proof = sync.fetch_proof_data(9, DataType::Source).await.unwrap();
    assert_eq!(proof.leaf_hashes, (0..5).map(leaf).collect::<Vec<_>>());
    assert_eq!(proof.replicas_count, 3);

    let pages: Vec<(u64, u64)> = chain
        .calls_to("getDatasetProof")
        .iter()
        .map(|a| (a[2].as_u64().unwrap(), a[3].as_u64().unwrap()))
        .collect();
    assert_eq!(pages, vec![(0, 2), (2, 2), (4, 1)]);
}

#[tokio::test]
async fn cars_carry_dataset_context() {
    let sync = sync(Arc::new(Chain::new(3)));
    sync.sync_dataset(9, DataType::MappingFiles).await.unwrap();

    let cars = sync.store().cars_for_dataset(9);
    assert_eq!(cars.len(), 3);
    assert!(cars.iter().all(|c| c.data_type == DataType::MappingFiles && c.replicas_count == 3));
}

#[tokio::test]
async fn reconcile_runs_both_batches() {
    let sync = sync(Arc::new(Chain::new(4)));
    let (cars, replicas) = sync.reconcile(9, DataType::Source, 3).await.unwrap();
    assert_eq!(cars.created, 4);
    assert_eq!(replicas.created, 2);
}

#[tokio::test]
async fn timeout_is_returned_not_retried() {
    let mut chain = Chain::new(4);
    chain.timeout_on = Some("getMatchingTarget");
    let chain = Arc::new(chain);
    let sync = sync(chain.clone());

    let err = sync.sync_matching(3).await.unwrap_err();
    assert!(err.is_timeout(), "{err}");
    assert_eq!(chain.calls_to("getMatchingTarget").len(), 1);
    assert!(sync.store().car_replicas().is_empty());
}

#[tokio::test]
async fn submitted_proof_event_stores_its_leaves() {
    let sync = sync(Arc::new(Chain::new(0)));
    let msg = RawMessage::with_params(
        "submitDatasetProof",
        [
            ("datasetId", ParamValue::Uint(9)),
            ("dataType", ParamValue::Uint(0)),
            ("leafHashes", ParamValue::Array(vec![leaf(7).into(), leaf(8).into()])),
            ("leafIndex", ParamValue::Uint(0)),
            ("leafSizes", ParamValue::Array(vec![ParamValue::Uint(1024), ParamValue::Uint(2048)])),
            ("completed", ParamValue::Bool(false)),
        ],
    )
    .in_tx("0xabc", "0x00000000000000000000000000000000000000aa", PROOF, 42);

    let event = sync.contracts().decode_message(&msg).unwrap();
    assert_eq!(event.dataset_id(), Some(9));

    let report = sync.handle_event(&event).await.unwrap().unwrap();
    assert_eq!(report.created, 2);

    let cars = sync.store().cars();
    assert_eq!(cars.iter().map(|c| c.size).collect::<Vec<_>>(), vec![Some(1024), Some(2048)]);
    assert!(cars.iter().all(|c| c.replicas_count == 3));
}

#[tokio::test]
async fn published_matching_event_resyncs_replicas() {
    let sync = sync(Arc::new(Chain::new(0)));
    let msg = RawMessage::with_params("publishMatching", [("matchingId", 3u64), ("datasetId", 9u64)])
        .in_tx("0xdef", "0x00000000000000000000000000000000000000aa", TARGET, 43);

    let event = sync.contracts().decode_message(&msg).unwrap();
    let report = sync.handle_event(&event).await.unwrap().unwrap();
    assert_eq!(report.created, 2);
}

#[tokio::test]
async fn other_events_leave_the_store_alone() {
    let sync = sync(Arc::new(Chain::new(0)));
    let msg = RawMessage::with_params("submitDatasetProofCompleted", [("datasetId", 9u64)]).in_tx(
        "0x1",
        "0x00000000000000000000000000000000000000aa",
        PROOF,
        44,
    );
    let event = sync.contracts().decode_message(&msg).unwrap();
    assert!(sync.handle_event(&event).await.unwrap().is_none());
}

#[tokio::test]
async fn invalid_options_never_reach_the_chain() {
    let chain = Arc::new(Chain::new(0));
    let sync = sync(chain.clone());

    let err = sync
        .contracts()
        .proof
        .submit_dataset_proof_completed(9, &TxOptions::from_address("not-an-address"))
        .await
        .unwrap_err();
    assert!(matches!(err, ContractError::InvalidTxOptions(_)));
    assert!(chain.calls_to("submitDatasetProofCompleted").is_empty());

    let err = sync
        .contracts()
        .proof
        .submit_dataset_proof_completed(9, &TxOptions::from_address(PROOF).gas_limit(0))
        .await
        .unwrap_err();
    assert!(matches!(err, ContractError::InvalidTxOptions(_)));
}

#[tokio::test]
async fn sync_error_keeps_the_failing_call() {
    let mut chain = Chain::new(2);
    chain.timeout_on = Some("getDatasetReplicasCount");
    let sync = sync(Arc::new(chain));

    match sync.sync_dataset(9, DataType::Source).await {
        Err(SyncError::Contract(ContractError::Transport { method, .. })) => {
            assert_eq!(method, "getDatasetReplicasCount")
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(sync.store().cars().is_empty());
}

fn submitted_proof(leaves: Vec<String>, sizes: Vec<u64>) -> RawMessage {
    RawMessage::with_params(
        "submitDatasetProof",
        [
            ("datasetId", ParamValue::Uint(9)),
            ("dataType", ParamValue::Uint(0)),
            ("leafHashes", ParamValue::Array(leaves.into_iter().map(ParamValue::Str).collect())),
            ("leafIndex", ParamValue::Uint(0)),
            ("leafSizes", ParamValue::Array(sizes.into_iter().map(|s| ParamValue::Uint(u128::from(s))).collect())),
            ("completed", ParamValue::Bool(false)),
        ],
    )
    .in_tx("0xabc", "0x00000000000000000000000000000000000000aa", PROOF, 42)
}

#[tokio::test]
async fn event_and_full_sync_agree_on_cars() {
    let sync = sync(Arc::new(Chain::new(3)));
    let event = sync
        .contracts()
        .decode_message(&submitted_proof(vec![leaf(0), leaf(1)], vec![1024, 2048]))
        .unwrap();

    let first = sync.handle_event(&event).await.unwrap().unwrap();
    assert_eq!(first.created, 2);

    let full = sync.sync_dataset(9, DataType::Source).await.unwrap();
    assert_eq!((full.created, full.updated, full.unchanged), (1, 0, 2));

    let again = sync.handle_event(&event).await.unwrap().unwrap();
    assert_eq!((again.updated, again.unchanged), (0, 2));

    let sizes: Vec<_> = sync.store().cars().iter().map(|c| c.size).collect();
    assert_eq!(sizes, vec![Some(1024), Some(2048), None]);
}

#[tokio::test]
async fn hash_case_does_not_split_a_car() {
    let sync = sync(Arc::new(Chain::new(12)));
    sync.sync_dataset(9, DataType::Source).await.unwrap();
    assert_eq!(sync.store().cars().len(), 12);

    let shouted = format!("0x{}", hex::encode_upper([11u8; 32]));
    assert_ne!(shouted, leaf(11));
    let event = sync
        .contracts()
        .decode_message(&submitted_proof(vec![shouted], vec![]))
        .unwrap();

    let report = sync.handle_event(&event).await.unwrap().unwrap();
    assert_eq!((report.created, report.unchanged), (0, 1));
    assert_eq!(sync.store().cars().len(), 12);
}
