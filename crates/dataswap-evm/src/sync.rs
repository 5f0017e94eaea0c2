//! Proof and matching reconciliation against a record store.
//!
//! # Cars
//! Count the proof leaves of a dataset, fetch them page by page, attach the
//! dataset's replica count, convert every leaf into a `Car` and upsert.
//!
//! # Replicas
//! Fetch a matching target, convert its car ids into `CarReplica` records and
//! upsert.
//!
//! Within a batch records are written strictly in order and the first failing
//! record stops the batch. Car and replica batches touch disjoint keys and may
//! run side by side.

use std::sync::Arc;

use tracing::{debug, info, warn};

use dataswap_core::config::SyncConfig;
use dataswap_core::convert::{matching_target_to_car_replicas, proof_data_from_event, proof_data_to_cars};
use dataswap_core::error::DecodeError;
use dataswap_core::message::ProtocolEvent;
use dataswap_core::store::{upsert_batch, BatchReport, RecordStore};
use dataswap_core::types::{Car, CarReplica, DataType, DatasetProofData, MatchingTarget};

use crate::contracts::DataswapContracts;
use crate::error::SyncError;

const DEFAULT_PAGE_SIZE: u64 = 100;

/// Drives facades, converter and store for one deployment.
pub struct ProtocolSync<S> {
    contracts: DataswapContracts,
    store: Arc<S>,
    page_size: u64,
}

impl<S> ProtocolSync<S>
where
    S: RecordStore<Car> + RecordStore<CarReplica>,
{
    pub fn new(contracts: DataswapContracts, store: Arc<S>) -> Self {
        Self {
            contracts,
            store,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn from_config(config: &SyncConfig, contracts: DataswapContracts, store: Arc<S>) -> Self {
        Self::new(contracts, store).with_page_size(config.proof_page_size)
    }

    /// Leaves requested per `getDatasetProof` call (at least one).
    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn contracts(&self) -> &DataswapContracts {
        &self.contracts
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    // ─── Fetch ────────────────────────────────────────────────────────────────

    /// Every submitted leaf of `dataset_id` / `data_type`, with the dataset's
    /// replica count attached.
    pub async fn fetch_proof_data(&self, dataset_id: u64, data_type: DataType) -> Result<DatasetProofData, SyncError> {
        let proof = &self.contracts.proof;
        let total = proof.get_dataset_proof_count(dataset_id, data_type).await?;

        let mut leaves = Vec::new();
        let mut current = 0u64;
        while current < total {
            let len = self.page_size.min(total - current);
            let page = proof.get_dataset_proof(dataset_id, data_type, current, len).await?;
            if page.is_empty() {
                warn!(dataset_id, %data_type, current, total, "proof page came back empty, stopping early");
                break;
            }
            debug!(dataset_id, %data_type, current, leaves = page.len(), total, "proof page fetched");
            current += page.len() as u64;
            leaves.extend(page);
        }

        let replicas = self
            .contracts
            .requirement
            .get_dataset_replicas_count(dataset_id)
            .await?;
        Ok(DatasetProofData::new(dataset_id, data_type, leaves).with_replicas_count(replicas))
    }

    pub async fn fetch_matching_target(&self, matching_id: u64) -> Result<MatchingTarget, SyncError> {
        Ok(self.contracts.matching_target.get_matching_target(matching_id).await?)
    }

    // ─── Store ────────────────────────────────────────────────────────────────

    pub async fn store_cars(&self, proof: &DatasetProofData) -> Result<BatchReport, SyncError> {
        let cars = proof_data_to_cars(proof);
        let report = upsert_batch(self.store.as_ref(), cars).await?;
        info!(
            dataset_id = proof.dataset_id,
            data_type = %proof.data_type,
            created = report.created,
            updated = report.updated,
            unchanged = report.unchanged,
            "cars stored"
        );
        Ok(report)
    }

    pub async fn store_car_replicas(&self, target: &MatchingTarget) -> Result<BatchReport, SyncError> {
        let replicas = matching_target_to_car_replicas(target);
        let report = upsert_batch(self.store.as_ref(), replicas).await?;
        info!(
            matching_id = target.matching_id,
            dataset_id = target.dataset_id,
            created = report.created,
            updated = report.updated,
            unchanged = report.unchanged,
            "car replicas stored"
        );
        Ok(report)
    }

    // ─── Sync ─────────────────────────────────────────────────────────────────

    /// Fetch the full proof of a dataset and reconcile its cars.
    pub async fn sync_dataset(&self, dataset_id: u64, data_type: DataType) -> Result<BatchReport, SyncError> {
        let proof = self.fetch_proof_data(dataset_id, data_type).await?;
        self.store_cars(&proof).await
    }

    /// Fetch a matching target and reconcile its replicas.
    pub async fn sync_matching(&self, matching_id: u64) -> Result<BatchReport, SyncError> {
        let target = self.fetch_matching_target(matching_id).await?;
        self.store_car_replicas(&target).await
    }

    /// Reconcile a dataset's cars and a matching's replicas side by side.
    ///
    /// Returns `(cars, replicas)`. The first error wins; the other batch may
    /// already have committed some records.
    pub async fn reconcile(
        &self,
        dataset_id: u64,
        data_type: DataType,
        matching_id: u64,
    ) -> Result<(BatchReport, BatchReport), SyncError> {
        futures::try_join!(
            self.sync_dataset(dataset_id, data_type),
            self.sync_matching(matching_id)
        )
    }

    /// Apply a decoded transaction to the store.
    ///
    /// `submitDatasetProof` stores the submitted leaves as cars and
    /// `publishMatching` resyncs the published matching. Other events do not
    /// change stored records and yield `None`.
    pub async fn handle_event(&self, event: &ProtocolEvent) -> Result<Option<BatchReport>, SyncError> {
        match event.method.as_str() {
            "submitDatasetProof" => {
                let proof = proof_data_from_event(event)?;
                let replicas = self
                    .contracts
                    .requirement
                    .get_dataset_replicas_count(proof.dataset_id)
                    .await?;
                let report = self.store_cars(&proof.with_replicas_count(replicas)).await?;
                Ok(Some(report))
            }
            "publishMatching" => {
                let matching_id = event
                    .matching_id()
                    .ok_or_else(|| DecodeError::MissingField { field: "matchingId".into() })?;
                Ok(Some(self.sync_matching(matching_id).await?))
            }
            other => {
                debug!(contract = %event.contract, method = other, "event does not touch stored records");
                Ok(None)
            }
        }
    }
}
