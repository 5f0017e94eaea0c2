//! MatchingTarget contract: the cars a matching covers.

use std::sync::Arc;

use dataswap_core::client::{ChainClient, TxOptions, TxReceipt};
use dataswap_core::error::{ConfigError, ContractError};
use dataswap_core::message::CorrelationRule;
use dataswap_core::result;
use dataswap_core::types::{ContractKind, DataType, MatchingTarget};
use dataswap_core::value::ParamValue;

use super::{decoded, impl_protocol_contract, Binding, ContractSpec};

pub const ABI: &[&str] = &[
    "function getMatchingTarget(uint64 matchingId) view returns (uint64 datasetId, uint64[] cars, uint64 size, uint8 dataType, uint64 associatedMappingFilesMatchingID)",
    "function isMatchingContainsCar(uint64 matchingId, uint64 id) view returns (bool)",
    "function isMatchingContainsCars(uint64 matchingId, uint64[] ids) view returns (bool)",
    "function isMatchingTargetValid(uint64 datasetId, uint64[] cars, uint64 size, uint8 dataType, uint64 associatedMappingFilesMatchingID) view returns (bool)",
    "function isMatchingTargetMeetsFilPlusRequirements(uint64 matchingId, address candidate) view returns (bool)",
    "function initDependencies(address matchings, address matchingsBids)",
    "function createTarget(uint64 matchingId, uint64 datasetId, uint8 dataType, uint64 associatedMappingFilesMatchingId, uint16 replicaIndex)",
    "function publishMatching(uint64 matchingId, uint64 datasetId, uint64[] carsStarts, uint64[] carsEnds, bool complete)",
];

pub(crate) const SPEC: ContractSpec = ContractSpec {
    kind: ContractKind::MatchingTarget,
    calls: &[
        "getMatchingTarget",
        "isMatchingContainsCar",
        "isMatchingContainsCars",
        "isMatchingTargetValid",
        "isMatchingTargetMeetsFilPlusRequirements",
    ],
    sends: &["initDependencies", "createTarget", "publishMatching"],
    rules: &[
        ("initDependencies", CorrelationRule::NONE),
        ("createTarget", CorrelationRule::dataset_and_matching("datasetId", "matchingId")),
        ("publishMatching", CorrelationRule::dataset_and_matching("datasetId", "matchingId")),
    ],
};

fn ids(values: &[u64]) -> ParamValue {
    ParamValue::Array(values.iter().map(|v| ParamValue::from(*v)).collect())
}

#[derive(Clone)]
pub struct MatchingTargetContract {
    binding: Binding,
}

impl MatchingTargetContract {
    pub fn new(address: &str, client: Arc<dyn ChainClient>) -> Result<Self, ConfigError> {
        Ok(Self {
            binding: Binding::new(&SPEC, address, client)?,
        })
    }

    async fn call_bool(&self, method: &str, args: Vec<ParamValue>) -> Result<bool, ContractError> {
        let raw = self.binding.dispatcher.call(method, args).await?;
        decoded(SPEC.kind, method, result::as_bool(method, &raw))
    }

    /// The target of `matching_id`. The contract does not echo the id back,
    /// so it is set on the result here.
    pub async fn get_matching_target(&self, matching_id: u64) -> Result<MatchingTarget, ContractError> {
        let raw = self
            .binding
            .dispatcher
            .call("getMatchingTarget", vec![ParamValue::from(matching_id)])
            .await?;
        decoded(
            SPEC.kind,
            "getMatchingTarget",
            result::decode_matching_target(matching_id, &raw),
        )
    }

    pub async fn is_matching_contains_car(&self, matching_id: u64, car_id: u64) -> Result<bool, ContractError> {
        self.call_bool(
            "isMatchingContainsCar",
            vec![ParamValue::from(matching_id), ParamValue::from(car_id)],
        )
        .await
    }

    pub async fn is_matching_contains_cars(&self, matching_id: u64, car_ids: &[u64]) -> Result<bool, ContractError> {
        self.call_bool("isMatchingContainsCars", vec![ParamValue::from(matching_id), ids(car_ids)])
            .await
    }

    /// Check a prospective target against the dataset before it is created.
    pub async fn is_matching_target_valid(
        &self,
        dataset_id: u64,
        cars: &[u64],
        size: u64,
        data_type: DataType,
        associated_mapping_files_matching_id: u64,
    ) -> Result<bool, ContractError> {
        let args = vec![
            ParamValue::from(dataset_id),
            ids(cars),
            ParamValue::from(size),
            ParamValue::Uint(data_type.as_u8().into()),
            ParamValue::from(associated_mapping_files_matching_id),
        ];
        self.call_bool("isMatchingTargetValid", args).await
    }

    pub async fn is_matching_target_meets_fil_plus_requirements(
        &self,
        matching_id: u64,
        candidate: &str,
    ) -> Result<bool, ContractError> {
        self.call_bool(
            "isMatchingTargetMeetsFilPlusRequirements",
            vec![ParamValue::from(matching_id), ParamValue::Address(candidate.to_string())],
        )
        .await
    }

    // ─── Sends ────────────────────────────────────────────────────────────────

    pub async fn init_dependencies(
        &self,
        matchings: &str,
        matchings_bids: &str,
        options: &TxOptions,
    ) -> Result<TxReceipt, ContractError> {
        let args = vec![
            ParamValue::Address(matchings.to_string()),
            ParamValue::Address(matchings_bids.to_string()),
        ];
        self.binding.dispatcher.send("initDependencies", args, options).await
    }

    pub async fn create_target(
        &self,
        matching_id: u64,
        dataset_id: u64,
        data_type: DataType,
        associated_mapping_files_matching_id: u64,
        replica_index: u16,
        options: &TxOptions,
    ) -> Result<TxReceipt, ContractError> {
        let args = vec![
            ParamValue::from(matching_id),
            ParamValue::from(dataset_id),
            ParamValue::Uint(data_type.as_u8().into()),
            ParamValue::from(associated_mapping_files_matching_id),
            ParamValue::Uint(replica_index.into()),
        ];
        self.binding.dispatcher.send("createTarget", args, options).await
    }

    /// Publish car ranges `[cars_starts[i], cars_ends[i]]` for a matching.
    pub async fn publish_matching(
        &self,
        matching_id: u64,
        dataset_id: u64,
        cars_starts: &[u64],
        cars_ends: &[u64],
        complete: bool,
        options: &TxOptions,
    ) -> Result<TxReceipt, ContractError> {
        if cars_starts.len() != cars_ends.len() {
            return Err(ContractError::InvalidArguments(format!(
                "publishMatching: {} range starts but {} ends",
                cars_starts.len(),
                cars_ends.len()
            )));
        }
        let args = vec![
            ParamValue::from(matching_id),
            ParamValue::from(dataset_id),
            ids(cars_starts),
            ids(cars_ends),
            ParamValue::Bool(complete),
        ];
        self.binding.dispatcher.send("publishMatching", args, options).await
    }
}

impl_protocol_contract!(MatchingTargetContract);
