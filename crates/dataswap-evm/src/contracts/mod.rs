//! Typed facades over the four Dataswap contracts.
//!
//! A facade is a [`MethodDispatcher`] plus a [`MessageDecoder`], both built
//! from the same method table. Methods that need their raw result rebuilt
//! pass it through the result decoder before returning.

pub mod escrow;
pub mod matching_target;
pub mod proof;
pub mod requirement;

use std::sync::Arc;
use tracing::info;

use dataswap_core::client::ChainClient;
use dataswap_core::config::{ContractAddresses, SyncConfig};
use dataswap_core::dispatch::MethodDispatcher;
use dataswap_core::error::{ConfigError, ContractError, DecodeError};
use dataswap_core::message::{CorrelationRule, MessageDecoder, ProtocolEvent, RawMessage};
use dataswap_core::method::MethodTable;
use dataswap_core::types::ContractKind;

use crate::abi::ContractAbi;
use crate::client::EvmChainClient;
use crate::error::SyncError;
use crate::rpc::HttpTransport;

pub use escrow::EscrowContract;
pub use matching_target::MatchingTargetContract;
pub use proof::DatasetProofContract;
pub use requirement::DatasetRequirementContract;

/// Method lists and correlation rules of one contract.
pub(crate) struct ContractSpec {
    pub kind: ContractKind,
    pub calls: &'static [&'static str],
    pub sends: &'static [&'static str],
    pub rules: &'static [(&'static str, CorrelationRule)],
}

/// Dispatcher and decoder shared by every facade.
#[derive(Clone)]
pub(crate) struct Binding {
    pub dispatcher: MethodDispatcher,
    pub decoder: MessageDecoder,
}

impl Binding {
    pub fn new(spec: &ContractSpec, address: &str, client: Arc<dyn ChainClient>) -> Result<Self, ConfigError> {
        let table = MethodTable::new(spec.kind, spec.calls, spec.sends)?;
        let decoder = MessageDecoder::new(&table, spec.rules)?;
        Ok(Self {
            dispatcher: MethodDispatcher::new(address, table, client),
            decoder,
        })
    }
}

/// Map a result-decoder failure onto the facade method that produced it.
pub(crate) fn decoded<T>(kind: ContractKind, method: &str, r: Result<T, DecodeError>) -> Result<T, ContractError> {
    r.map_err(|e| ContractError::Decode {
        contract: kind,
        method: method.to_string(),
        reason: e.to_string(),
    })
}

/// What every facade exposes besides its typed methods.
pub trait ProtocolContract: Send + Sync {
    fn kind(&self) -> ContractKind;

    fn address(&self) -> &str;

    fn method_table(&self) -> &MethodTable;

    /// Classify a raw transaction sent to this contract.
    fn decode_message(&self, msg: &RawMessage) -> Result<ProtocolEvent, DecodeError>;
}

macro_rules! impl_protocol_contract {
    ($facade:ty) => {
        impl $crate::contracts::ProtocolContract for $facade {
            fn kind(&self) -> dataswap_core::types::ContractKind {
                self.binding.dispatcher.contract()
            }

            fn address(&self) -> &str {
                self.binding.dispatcher.address()
            }

            fn method_table(&self) -> &dataswap_core::method::MethodTable {
                self.binding.dispatcher.table()
            }

            fn decode_message(
                &self,
                msg: &dataswap_core::message::RawMessage,
            ) -> Result<dataswap_core::message::ProtocolEvent, dataswap_core::error::DecodeError> {
                self.binding.decoder.decode(msg)
            }
        }
    };
}
pub(crate) use impl_protocol_contract;

// ─── Bundle ──────────────────────────────────────────────────────────────────

/// All four facades, bound to their deployed addresses.
#[derive(Clone)]
pub struct DataswapContracts {
    pub escrow: EscrowContract,
    pub requirement: DatasetRequirementContract,
    pub proof: DatasetProofContract,
    pub matching_target: MatchingTargetContract,
}

impl DataswapContracts {
    pub fn new(addresses: &ContractAddresses, client: Arc<dyn ChainClient>) -> Result<Self, ConfigError> {
        Ok(Self {
            escrow: EscrowContract::new(&addresses.escrow, client.clone())?,
            requirement: DatasetRequirementContract::new(&addresses.dataset_requirement, client.clone())?,
            proof: DatasetProofContract::new(&addresses.dataset_proof, client.clone())?,
            matching_target: MatchingTargetContract::new(&addresses.matching_target, client)?,
        })
    }

    /// An [`EvmChainClient`] over HTTP with every built-in ABI registered.
    pub fn evm_client(config: &SyncConfig) -> Result<EvmChainClient, SyncError> {
        let transport = HttpTransport::from_config(&config.rpc)?;
        let c = &config.contracts;
        Ok(EvmChainClient::new(Arc::new(transport))
            .with_contract(&c.escrow, ContractAbi::for_contract(ContractKind::Escrow)?)
            .with_contract(&c.dataset_requirement, ContractAbi::for_contract(ContractKind::DatasetRequirement)?)
            .with_contract(&c.dataset_proof, ContractAbi::for_contract(ContractKind::DatasetProof)?)
            .with_contract(&c.matching_target, ContractAbi::for_contract(ContractKind::MatchingTarget)?))
    }

    /// Validate `config` and bind the facades to a JSON-RPC endpoint.
    pub fn connect(config: &SyncConfig) -> Result<Self, SyncError> {
        config.validate()?;
        let client = Arc::new(Self::evm_client(config)?);
        let contracts = Self::new(&config.contracts, client)?;
        info!(rpc = %config.rpc.url, "dataswap contracts bound");
        Ok(contracts)
    }

    pub fn all(&self) -> [&dyn ProtocolContract; 4] {
        [&self.escrow, &self.requirement, &self.proof, &self.matching_target]
    }

    /// The facade bound to `address` (case-insensitive).
    pub fn by_address(&self, address: &str) -> Option<&dyn ProtocolContract> {
        self.all()
            .into_iter()
            .find(|c| c.address().eq_ignore_ascii_case(address))
    }

    /// Route a raw transaction to the facade it was sent to and decode it.
    pub fn decode_message(&self, msg: &RawMessage) -> Result<ProtocolEvent, DecodeError> {
        let to = msg
            .to
            .as_deref()
            .ok_or_else(|| DecodeError::MissingField { field: "to".into() })?;
        self.by_address(to)
            .ok_or_else(|| DecodeError::UnknownContract { address: to.to_string() })?
            .decode_message(msg)
    }
}
