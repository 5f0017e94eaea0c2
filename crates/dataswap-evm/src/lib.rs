//! dataswap-evm: JSON-RPC client, contract facades and reconciliation for
//! the Dataswap contracts on an EVM chain.
//!
//! ```text
//! RpcTransport (HTTP) ──► EvmChainClient (ABI encode/decode) ──► DataswapContracts
//!                                                                   │
//!                                              ProtocolSync ◄───────┘
//!                                                   │
//!                                                   ▼
//!                                             RecordStore
//! ```

pub mod abi;
pub mod client;
pub mod contracts;
pub mod error;
pub mod rpc;
pub mod sync;

pub use abi::ContractAbi;
pub use client::EvmChainClient;
pub use contracts::{
    DataswapContracts, DatasetProofContract, DatasetRequirementContract, EscrowContract, MatchingTargetContract,
    ProtocolContract,
};
pub use error::SyncError;
pub use rpc::{HttpTransport, JsonRpcRequest, JsonRpcResponse, RpcTransport};
pub use sync::ProtocolSync;
