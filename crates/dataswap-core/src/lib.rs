//! dataswap-core: foundation for the Dataswap read-model sync layer.
//!
//! # Architecture
//!
//! ```text
//! Contract facade ──► MethodDispatcher ──► ChainClient (call | send)
//!        │                                      │
//!        │                               raw ParamValue
//!        ▼                                      ▼
//! MessageDecoder (RawMessage → ProtocolEvent)   result decoder (Fund, MatchingTarget, ...)
//!                                               │
//!                                               ▼
//!                                 convert (Car, CarReplica records)
//!                                               │
//!                                               ▼
//!                                 store::upsert_batch ──► RecordStore
//! ```

pub mod client;
pub mod config;
pub mod convert;
pub mod dispatch;
pub mod error;
pub mod message;
pub mod method;
pub mod result;
pub mod store;
pub mod telemetry;
pub mod types;
pub mod value;

pub use client::{ChainClient, TxOptions, TxReceipt};
pub use config::{ContractAddresses, RpcConfig, StorageBackend, StorageConfig, SyncConfig};
pub use convert::{matching_target_to_car_replicas, normalize_hash, proof_data_from_event, proof_data_to_cars};
pub use dispatch::{DispatchOutput, MethodDispatcher};
pub use error::{ConfigError, ContractError, DecodeError, ReconcileError, StoreError, TransportError};
pub use message::{Correlation, CorrelationRule, MessageDecoder, ProtocolEvent, RawMessage};
pub use method::{ContractMethodSpec, MethodKind, MethodTable};
pub use telemetry::{init_tracing, LogConfig};
pub use store::{upsert_batch, BatchReport, Record, RecordStore, UpsertOutcome};
pub use types::{
    Car, CarKey, CarReplica, CarReplicaKey, ContractKind, DataType, DatasetProofData,
    DatasetRequirement, EscrowType, Fund, MatchingTarget, ReplicaState,
};
pub use value::{ParamValue, Params};
