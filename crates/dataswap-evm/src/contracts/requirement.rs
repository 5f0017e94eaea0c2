//! DatasetRequirement contract: replica requirements per dataset.

use std::sync::Arc;

use dataswap_core::client::{ChainClient, TxOptions, TxReceipt};
use dataswap_core::error::{ConfigError, ContractError, DecodeError};
use dataswap_core::message::CorrelationRule;
use dataswap_core::result;
use dataswap_core::types::{ContractKind, DatasetRequirement};
use dataswap_core::value::ParamValue;

use super::{decoded, impl_protocol_contract, Binding, ContractSpec};

pub const ABI: &[&str] = &[
    "function getDatasetReplicasCount(uint64 datasetId) view returns (uint16)",
    "function getDatasetReplicaRequirement(uint64 datasetId, uint64 index) view returns (address[] dataPreparers, address[] storageProviders, uint16 regionCode, uint16 countryCode, uint32[] cityCodes)",
    "function getDatasetPreCollateralRequirements(uint64 datasetId) view returns (uint256)",
    "function submitDatasetReplicaRequirements(uint64 datasetId, address[][] dataPreparers, address[][] storageProviders, uint16[] regions, uint16[] countrys, uint32[][] citys)",
];

pub(crate) const SPEC: ContractSpec = ContractSpec {
    kind: ContractKind::DatasetRequirement,
    calls: &[
        "getDatasetReplicasCount",
        "getDatasetReplicaRequirement",
        "getDatasetPreCollateralRequirements",
    ],
    sends: &["submitDatasetReplicaRequirements"],
    rules: &[("submitDatasetReplicaRequirements", CorrelationRule::dataset("datasetId"))],
};

fn addresses(list: &[String]) -> ParamValue {
    ParamValue::Array(list.iter().cloned().map(ParamValue::Address).collect())
}

fn numbers(list: &[u64]) -> ParamValue {
    ParamValue::Array(list.iter().map(|v| ParamValue::from(*v)).collect())
}

fn column(replicas: &[DatasetRequirement], f: impl Fn(&DatasetRequirement) -> ParamValue) -> ParamValue {
    ParamValue::Array(replicas.iter().map(f).collect())
}

/// Column-wise arguments of `submitDatasetReplicaRequirements`, one entry
/// per replica in each column.
fn requirement_columns(replicas: &[DatasetRequirement]) -> [ParamValue; 5] {
    [
        column(replicas, |r| addresses(&r.data_preparers)),
        column(replicas, |r| addresses(&r.storage_providers)),
        column(replicas, |r| ParamValue::from(r.region_code)),
        column(replicas, |r| ParamValue::from(r.country_code)),
        column(replicas, |r| numbers(&r.city_codes)),
    ]
}

#[derive(Clone)]
pub struct DatasetRequirementContract {
    binding: Binding,
}

impl DatasetRequirementContract {
    pub fn new(address: &str, client: Arc<dyn ChainClient>) -> Result<Self, ConfigError> {
        Ok(Self {
            binding: Binding::new(&SPEC, address, client)?,
        })
    }

    /// Number of replicas the dataset asks for.
    pub async fn get_dataset_replicas_count(&self, dataset_id: u64) -> Result<u16, ContractError> {
        let raw = self
            .binding
            .dispatcher
            .call("getDatasetReplicasCount", vec![ParamValue::from(dataset_id)])
            .await?;
        let count = result::as_u64("replicasCount", &raw).and_then(|n| {
            u16::try_from(n).map_err(|_| DecodeError::TypeMismatch {
                field: "replicasCount".into(),
                expected: "uint16".into(),
                got: n.to_string(),
            })
        });
        decoded(SPEC.kind, "getDatasetReplicasCount", count)
    }

    /// Requirement of the replica at zero-based `index`.
    pub async fn get_dataset_replica_requirement(
        &self,
        dataset_id: u64,
        index: u64,
    ) -> Result<DatasetRequirement, ContractError> {
        let raw = self
            .binding
            .dispatcher
            .call(
                "getDatasetReplicaRequirement",
                vec![ParamValue::from(dataset_id), ParamValue::from(index)],
            )
            .await?;
        decoded(
            SPEC.kind,
            "getDatasetReplicaRequirement",
            result::decode_dataset_requirement(&raw),
        )
    }

    pub async fn get_dataset_pre_collateral_requirements(&self, dataset_id: u64) -> Result<u128, ContractError> {
        let raw = self
            .binding
            .dispatcher
            .call("getDatasetPreCollateralRequirements", vec![ParamValue::from(dataset_id)])
            .await?;
        decoded(
            SPEC.kind,
            "getDatasetPreCollateralRequirements",
            result::as_u128("preCollateral", &raw),
        )
    }

    pub async fn submit_dataset_replica_requirements(
        &self,
        dataset_id: u64,
        replicas: &[DatasetRequirement],
        options: &TxOptions,
    ) -> Result<TxReceipt, ContractError> {
        let mut args = vec![ParamValue::from(dataset_id)];
        args.extend(requirement_columns(replicas));
        self.binding
            .dispatcher
            .send("submitDatasetReplicaRequirements", args, options)
            .await
    }
}

impl_protocol_contract!(DatasetRequirementContract);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::testing::{tuple, uints, MockClient};
    use crate::contracts::ProtocolContract;
    use dataswap_core::message::RawMessage;

    const REQUIREMENT: &str = "0x2222222222222222222222222222222222222222";
    const SP: &str = "0x00000000000000000000000000000000000000aa";
    const DP: &str = "0x00000000000000000000000000000000000000bb";

    fn requirement() -> DatasetRequirement {
        DatasetRequirement {
            data_preparers: vec![DP.into()],
            storage_providers: vec![SP.into()],
            region_code: 1,
            country_code: 86,
            city_codes: vec![571, 572],
        }
    }

    #[tokio::test]
    async fn replica_requirement_decodes_named_tuple() {
        let client = MockClient::new();
        client.reply(
            "getDatasetReplicaRequirement",
            tuple(vec![
                ("dataPreparers", ParamValue::Array(vec![ParamValue::Address(DP.into())])),
                ("storageProviders", ParamValue::Array(vec![ParamValue::Address(SP.into())])),
                ("regionCode", ParamValue::Uint(1)),
                ("countryCode", ParamValue::Uint(86)),
                ("cityCodes", uints(&[571, 572])),
            ]),
        );
        let contract = DatasetRequirementContract::new(REQUIREMENT, client).unwrap();

        let got = contract.get_dataset_replica_requirement(9, 0).await.unwrap();
        assert_eq!(got, requirement());
    }

    #[tokio::test]
    async fn replicas_count_out_of_range_is_a_decode_error() {
        let client = MockClient::new();
        client.reply("getDatasetReplicasCount", ParamValue::Uint(70_000));
        let contract = DatasetRequirementContract::new(REQUIREMENT, client.clone()).unwrap();
        assert!(matches!(
            contract.get_dataset_replicas_count(9).await,
            Err(ContractError::Decode { .. })
        ));

        client.reply("getDatasetReplicasCount", ParamValue::Uint(3));
        assert_eq!(contract.get_dataset_replicas_count(9).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn submit_spreads_requirements_into_columns() {
        let client = MockClient::new();
        let contract = DatasetRequirementContract::new(REQUIREMENT, client.clone()).unwrap();
        let mut second = requirement();
        second.region_code = 2;
        second.city_codes.clear();

        contract
            .submit_dataset_replica_requirements(9, &[requirement(), second], &TxOptions::from_address(SP))
            .await
            .unwrap();

        let sent = client.last();
        assert_eq!(sent.args.len(), 6);
        assert_eq!(sent.args[0], ParamValue::Uint(9));
        assert_eq!(sent.args[3], uints(&[1, 2]));
        assert_eq!(sent.args[5], ParamValue::Array(vec![uints(&[571, 572]), uints(&[])]));
    }

    #[test]
    fn submit_message_carries_dataset_id() {
        let contract = DatasetRequirementContract::new(REQUIREMENT, MockClient::new()).unwrap();
        let msg = RawMessage::with_params("submitDatasetReplicaRequirements", [("datasetId", 9u64)]);
        let event = contract.decode_message(&msg).unwrap();
        assert_eq!(event.dataset_id(), Some(9));
        assert_eq!(event.matching_id(), None);
    }
}
