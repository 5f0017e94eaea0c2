//! Error types for the sync pipeline.

use thiserror::Error;

use crate::method::MethodKind;
use crate::types::ContractKind;

/// Facade or decoder tables that are inconsistent. Raised at construction
/// time and fatal to startup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{contract}: empty method name in {kind} list")]
    EmptyMethodName { contract: ContractKind, kind: MethodKind },

    #[error("{contract}: method '{method}' listed twice as {kind}")]
    DuplicateMethod {
        contract: ContractKind,
        method: String,
        kind: MethodKind,
    },

    #[error("{contract}: method '{method}' registered as both call and send")]
    ConflictingKind { contract: ContractKind, method: String },

    #[error("{contract}: send method '{method}' has no decode rule")]
    MissingDecodeRule { contract: ContractKind, method: String },

    #[error("{contract}: decode rule for '{method}' which is not a registered send method")]
    UnknownDecodeRule { contract: ContractKind, method: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Errors at the chain RPC boundary (call / send execution).
#[derive(Debug, Error)]
pub enum TransportError {
    /// HTTP request failed (connection refused, bad status, ...).
    #[error("HTTP error: {0}")]
    Http(String),

    /// JSON-RPC error returned by the node (e.g. execution reverted).
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// Request timed out.
    #[error("Request timed out after {ms}ms")]
    Timeout { ms: u64 },

    /// Arguments or return data could not be ABI encoded/decoded.
    #[error("ABI error: {0}")]
    Abi(String),

    /// No ABI registered for the target contract address.
    #[error("Unknown contract address: {address}")]
    UnknownContract { address: String },

    #[error("Deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Returns `true` if the request ran out of time.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns `true` if the node rejected the execution (revert etc.).
    pub fn is_execution_error(&self) -> bool {
        matches!(self, Self::Rpc { .. })
    }
}

/// Errors surfaced by contract facades and the method dispatcher.
#[derive(Debug, Error)]
pub enum ContractError {
    #[error("{contract}: method '{method}' is not supported")]
    UnsupportedMethod { contract: ContractKind, method: String },

    #[error("{contract}: method '{method}' is registered as {registered}, not {requested}")]
    KindMismatch {
        contract: ContractKind,
        method: String,
        registered: MethodKind,
        requested: MethodKind,
    },

    #[error("Invalid transaction options: {0}")]
    InvalidTxOptions(String),

    /// Arguments a facade rejected before building the invocation.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("{contract}.{method} failed: {source}")]
    Transport {
        contract: ContractKind,
        method: String,
        #[source]
        source: TransportError,
    },

    #[error("{contract}.{method} returned undecodable data: {reason}")]
    Decode {
        contract: ContractKind,
        method: String,
        reason: String,
    },
}

impl ContractError {
    /// Returns `true` if the method is outside the facade's allow-lists.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::UnsupportedMethod { .. })
    }
}

/// Errors from the message decoder and the result decoder.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The transaction's method is not part of the contract's decode table.
    #[error("{contract}: not supported method '{method}'")]
    UnsupportedMethod { contract: ContractKind, method: String },

    #[error("Missing field: {field}")]
    MissingField { field: String },

    #[error("Type mismatch for '{field}': expected {expected}, got {got}")]
    TypeMismatch {
        field: String,
        expected: String,
        got: String,
    },

    #[error("Invalid calldata: {reason}")]
    InvalidCalldata { reason: String },

    /// The message targets an address none of the facades is bound to.
    #[error("No contract bound to address {address}")]
    UnknownContract { address: String },
}

/// Errors from a record store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Backend(String),

    #[error("Invalid record {key}: {reason}")]
    InvalidRecord { key: String, reason: String },
}

/// A batch upsert stopped at the first failing record.
///
/// Records before `index` are committed; `index` and later were not applied.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("{collection} record #{index} ({key}) failed: {source}")]
    RecordFailed {
        collection: &'static str,
        /// Zero-based position of the failing record within the batch.
        index: usize,
        key: String,
        #[source]
        source: StoreError,
    },
}

impl ReconcileError {
    /// Zero-based position of the record that failed.
    pub fn index(&self) -> usize {
        match self {
            Self::RecordFailed { index, .. } => *index,
        }
    }
}
