//! DatasetProof contract: merkle proof submission and dataset funds.

use std::sync::Arc;

use dataswap_core::client::{ChainClient, TxOptions, TxReceipt};
use dataswap_core::error::{ConfigError, ContractError};
use dataswap_core::message::CorrelationRule;
use dataswap_core::result;
use dataswap_core::types::{ContractKind, DataType};
use dataswap_core::value::ParamValue;

use super::{decoded, impl_protocol_contract, Binding, ContractSpec};

pub const ABI: &[&str] = &[
    "function getDatasetAppendCollateral(uint64 datasetId) view returns (uint256)",
    "function getDatasetProof(uint64 datasetId, uint8 dataType, uint64 index, uint64 len) view returns (bytes32[])",
    "function getDatasetProofCount(uint64 datasetId, uint8 dataType) view returns (uint64)",
    "function getDatasetProofSubmitter(uint64 datasetId) view returns (address)",
    "function getDatasetSize(uint64 datasetId, uint8 dataType) view returns (uint64)",
    "function getDatasetCollateralRequirement(uint64 datasetId) view returns (uint256)",
    "function getDatasetDataAuditorFeesRequirement(uint64 datasetId) view returns (uint256)",
    "function getDatasetDataAuditorFees(uint64 datasetId) view returns (uint256)",
    "function isDatasetProofallCompleted(uint64 datasetId, uint8 dataType) view returns (bool)",
    "function isDatasetContainsCar(uint64 datasetId, uint64 id) view returns (bool)",
    "function isDatasetContainsCars(uint64 datasetId, uint64[] ids) view returns (bool)",
    "function isDatasetProofSubmitter(uint64 datasetId, address submitter) view returns (bool)",
    "function submitDatasetProofRoot(uint64 datasetId, uint8 dataType, string mappingFilesAccessMethod, bytes32 rootHash)",
    "function submitDatasetProof(uint64 datasetId, uint8 dataType, bytes32[] leafHashes, uint64 leafIndex, uint64[] leafSizes, bool completed)",
    "function submitDatasetProofCompleted(uint64 datasetId)",
    "function appendDatasetFunds(uint64 datasetId, uint256 datacapCollateral, uint256 dataAuditorFees) payable",
];

pub(crate) const SPEC: ContractSpec = ContractSpec {
    kind: ContractKind::DatasetProof,
    calls: &[
        "getDatasetAppendCollateral",
        "getDatasetProof",
        "getDatasetProofCount",
        "getDatasetProofSubmitter",
        "getDatasetSize",
        "getDatasetCollateralRequirement",
        "getDatasetDataAuditorFeesRequirement",
        "getDatasetDataAuditorFees",
        "isDatasetProofallCompleted",
        "isDatasetContainsCar",
        "isDatasetContainsCars",
        "isDatasetProofSubmitter",
    ],
    sends: &[
        "submitDatasetProofRoot",
        "submitDatasetProof",
        "submitDatasetProofCompleted",
        "appendDatasetFunds",
    ],
    rules: &[
        ("submitDatasetProofRoot", CorrelationRule::dataset("datasetId")),
        ("submitDatasetProof", CorrelationRule::dataset("datasetId")),
        ("submitDatasetProofCompleted", CorrelationRule::dataset("datasetId")),
        ("appendDatasetFunds", CorrelationRule::dataset("datasetId")),
    ],
};

fn dataset(dataset_id: u64, data_type: DataType) -> Vec<ParamValue> {
    vec![ParamValue::from(dataset_id), ParamValue::Uint(data_type.as_u8().into())]
}

#[derive(Clone)]
pub struct DatasetProofContract {
    binding: Binding,
}

impl DatasetProofContract {
    pub fn new(address: &str, client: Arc<dyn ChainClient>) -> Result<Self, ConfigError> {
        Ok(Self {
            binding: Binding::new(&SPEC, address, client)?,
        })
    }

    async fn call(&self, method: &str, args: Vec<ParamValue>) -> Result<ParamValue, ContractError> {
        self.binding.dispatcher.call(method, args).await
    }

    async fn call_amount(&self, method: &str, dataset_id: u64) -> Result<u128, ContractError> {
        let raw = self.call(method, vec![ParamValue::from(dataset_id)]).await?;
        decoded(SPEC.kind, method, result::as_u128("amount", &raw))
    }

    async fn call_bool(&self, method: &str, args: Vec<ParamValue>) -> Result<bool, ContractError> {
        let raw = self.call(method, args).await?;
        decoded(SPEC.kind, method, result::as_bool(method, &raw))
    }

    pub async fn get_dataset_append_collateral(&self, dataset_id: u64) -> Result<u128, ContractError> {
        self.call_amount("getDatasetAppendCollateral", dataset_id).await
    }

    /// One page of leaf hashes: `len` leaves starting at zero-based `index`.
    pub async fn get_dataset_proof(
        &self,
        dataset_id: u64,
        data_type: DataType,
        index: u64,
        len: u64,
    ) -> Result<Vec<String>, ContractError> {
        let mut args = dataset(dataset_id, data_type);
        args.extend([ParamValue::from(index), ParamValue::from(len)]);
        let raw = self.call("getDatasetProof", args).await?;
        decoded(SPEC.kind, "getDatasetProof", result::as_text_list("leafHashes", &raw))
    }

    /// Number of leaves submitted so far.
    pub async fn get_dataset_proof_count(&self, dataset_id: u64, data_type: DataType) -> Result<u64, ContractError> {
        let raw = self
            .call("getDatasetProofCount", dataset(dataset_id, data_type))
            .await?;
        decoded(SPEC.kind, "getDatasetProofCount", result::as_u64("count", &raw))
    }

    pub async fn get_dataset_proof_submitter(&self, dataset_id: u64) -> Result<String, ContractError> {
        let raw = self
            .call("getDatasetProofSubmitter", vec![ParamValue::from(dataset_id)])
            .await?;
        decoded(SPEC.kind, "getDatasetProofSubmitter", result::as_text("submitter", &raw))
    }

    pub async fn get_dataset_size(&self, dataset_id: u64, data_type: DataType) -> Result<u64, ContractError> {
        let raw = self.call("getDatasetSize", dataset(dataset_id, data_type)).await?;
        decoded(SPEC.kind, "getDatasetSize", result::as_u64("size", &raw))
    }

    pub async fn get_dataset_collateral_requirement(&self, dataset_id: u64) -> Result<u128, ContractError> {
        self.call_amount("getDatasetCollateralRequirement", dataset_id).await
    }

    pub async fn get_dataset_data_auditor_fees_requirement(&self, dataset_id: u64) -> Result<u128, ContractError> {
        self.call_amount("getDatasetDataAuditorFeesRequirement", dataset_id).await
    }

    pub async fn get_dataset_data_auditor_fees(&self, dataset_id: u64) -> Result<u128, ContractError> {
        self.call_amount("getDatasetDataAuditorFees", dataset_id).await
    }

    pub async fn is_dataset_proofall_completed(
        &self,
        dataset_id: u64,
        data_type: DataType,
    ) -> Result<bool, ContractError> {
        self.call_bool("isDatasetProofallCompleted", dataset(dataset_id, data_type))
            .await
    }

    pub async fn is_dataset_contains_car(&self, dataset_id: u64, car_id: u64) -> Result<bool, ContractError> {
        self.call_bool(
            "isDatasetContainsCar",
            vec![ParamValue::from(dataset_id), ParamValue::from(car_id)],
        )
        .await
    }

    pub async fn is_dataset_contains_cars(&self, dataset_id: u64, car_ids: &[u64]) -> Result<bool, ContractError> {
        let ids = ParamValue::Array(car_ids.iter().map(|id| ParamValue::from(*id)).collect());
        self.call_bool("isDatasetContainsCars", vec![ParamValue::from(dataset_id), ids])
            .await
    }

    pub async fn is_dataset_proof_submitter(&self, dataset_id: u64, submitter: &str) -> Result<bool, ContractError> {
        self.call_bool(
            "isDatasetProofSubmitter",
            vec![ParamValue::from(dataset_id), ParamValue::Address(submitter.to_string())],
        )
        .await
    }

    // ─── Sends ────────────────────────────────────────────────────────────────

    /// `root_hash` is a `0x`-prefixed 32-byte hex string.
    pub async fn submit_dataset_proof_root(
        &self,
        dataset_id: u64,
        data_type: DataType,
        mapping_files_access_method: &str,
        root_hash: &str,
        options: &TxOptions,
    ) -> Result<TxReceipt, ContractError> {
        let mut args = dataset(dataset_id, data_type);
        args.push(ParamValue::Str(mapping_files_access_method.to_string()));
        args.push(ParamValue::Str(root_hash.to_string()));
        self.binding
            .dispatcher
            .send("submitDatasetProofRoot", args, options)
            .await
    }

    /// Submit a batch of leaves. `leaf_index` is the position of the first leaf.
    #[allow(clippy::too_many_arguments)]
    pub async fn submit_dataset_proof(
        &self,
        dataset_id: u64,
        data_type: DataType,
        leaf_hashes: &[String],
        leaf_index: u64,
        leaf_sizes: &[u64],
        completed: bool,
        options: &TxOptions,
    ) -> Result<TxReceipt, ContractError> {
        let mut args = dataset(dataset_id, data_type);
        args.extend([
            ParamValue::Array(leaf_hashes.iter().cloned().map(ParamValue::Str).collect()),
            ParamValue::from(leaf_index),
            ParamValue::Array(leaf_sizes.iter().map(|s| ParamValue::from(*s)).collect()),
            ParamValue::Bool(completed),
        ]);
        self.binding
            .dispatcher
            .send("submitDatasetProof", args, options)
            .await
    }

    pub async fn submit_dataset_proof_completed(
        &self,
        dataset_id: u64,
        options: &TxOptions,
    ) -> Result<TxReceipt, ContractError> {
        self.binding
            .dispatcher
            .send("submitDatasetProofCompleted", vec![ParamValue::from(dataset_id)], options)
            .await
    }

    pub async fn append_dataset_funds(
        &self,
        dataset_id: u64,
        datacap_collateral: u128,
        data_auditor_fees: u128,
        options: &TxOptions,
    ) -> Result<TxReceipt, ContractError> {
        let args = vec![
            ParamValue::from(dataset_id),
            ParamValue::Uint(datacap_collateral),
            ParamValue::Uint(data_auditor_fees),
        ];
        self.binding
            .dispatcher
            .send("appendDatasetFunds", args, options)
            .await
    }
}

impl_protocol_contract!(DatasetProofContract);
