//! Protocol value objects and store records.

use serde::{Deserialize, Serialize};
use std::fmt;

// ─── ContractKind ─────────────────────────────────────────────────────────────

/// The protocol contracts this layer has a facade for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContractKind {
    Escrow,
    DatasetRequirement,
    DatasetProof,
    MatchingTarget,
}

impl fmt::Display for ContractKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Escrow => write!(f, "Escrow"),
            Self::DatasetRequirement => write!(f, "DatasetRequirement"),
            Self::DatasetProof => write!(f, "DatasetProof"),
            Self::MatchingTarget => write!(f, "MatchingTarget"),
        }
    }
}

// ─── Enumerations ─────────────────────────────────────────────────────────────

/// Kind of data a proof or matching refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DataType {
    Source = 0,
    MappingFiles = 1,
}

impl DataType {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Source),
            1 => Some(Self::MappingFiles),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source => write!(f, "source"),
            Self::MappingFiles => write!(f, "mapping-files"),
        }
    }
}

/// Escrow account category for credited funds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EscrowType {
    TotalDataCap = 0,
    DatacapCollateral = 1,
    DatacapChunkCollateral = 2,
    ChallengeCommission = 3,
    DatacapChunkLandCollateral = 4,
    ProofAuditCollateral = 5,
    DisputeAuditCollateral = 6,
}

impl EscrowType {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Lifecycle state of a car replica.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReplicaState {
    None,
    Matched,
    Stored,
    Corrupted,
    Slashed,
    Expired,
}

impl ReplicaState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Matched => "matched",
            Self::Stored => "stored",
            Self::Corrupted => "corrupted",
            Self::Slashed => "slashed",
            Self::Expired => "expired",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "none" => Some(Self::None),
            "matched" => Some(Self::Matched),
            "stored" => Some(Self::Stored),
            "corrupted" => Some(Self::Corrupted),
            "slashed" => Some(Self::Slashed),
            "expired" => Some(Self::Expired),
            _ => None,
        }
    }
}

// ─── Value objects ────────────────────────────────────────────────────────────

/// Escrow balances of one owner/beneficiary account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fund {
    pub available: u128,
    pub collateral: u128,
    pub lock: u128,
}

/// Target of a matching, as stored by the MatchingTarget contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchingTarget {
    /// Not part of the contract's return value; injected by the facade.
    pub matching_id: u64,
    pub dataset_id: u64,
    /// Car ids covered by the matching, in contract order.
    pub cars: Vec<u64>,
    pub size: u64,
    pub data_type: DataType,
    pub associated_mapping_files_matching_id: u64,
}

/// One replica requirement of a dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetRequirement {
    pub data_preparers: Vec<String>,
    pub storage_providers: Vec<String>,
    pub region_code: u64,
    pub country_code: u64,
    pub city_codes: Vec<u64>,
}

/// A dataset proof aggregate: the leaves submitted for one data type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetProofData {
    pub dataset_id: u64,
    pub data_type: DataType,
    pub leaf_hashes: Vec<String>,
    /// Sizes aligned with `leaf_hashes`; may be empty when unknown.
    #[serde(default)]
    pub leaf_sizes: Vec<u64>,
    #[serde(default)]
    pub replicas_count: u16,
}

impl DatasetProofData {
    pub fn new(dataset_id: u64, data_type: DataType, leaf_hashes: Vec<String>) -> Self {
        Self {
            dataset_id,
            data_type,
            leaf_hashes,
            leaf_sizes: Vec::new(),
            replicas_count: 0,
        }
    }

    pub fn with_sizes(mut self, sizes: Vec<u64>) -> Self {
        self.leaf_sizes = sizes;
        self
    }

    pub fn with_replicas_count(mut self, count: u16) -> Self {
        self.replicas_count = count;
        self
    }
}

// ─── Store records ────────────────────────────────────────────────────────────

/// A content-addressed piece of a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Car {
    pub hash: String,
    pub dataset_id: u64,
    pub data_type: DataType,
    pub size: Option<u64>,
    pub replicas_count: u16,
}

/// Unique index of a [`Car`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CarKey {
    pub hash: String,
    pub dataset_id: u64,
    pub data_type: DataType,
}

impl fmt::Display for CarKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "car({}, dataset={}, {})", self.hash, self.dataset_id, self.data_type)
    }
}

/// A car assigned to a matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarReplica {
    pub car_id: u64,
    pub matching_id: u64,
    pub state: ReplicaState,
}

/// Unique index of a [`CarReplica`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CarReplicaKey {
    pub car_id: u64,
    pub matching_id: u64,
}

impl fmt::Display for CarReplicaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "replica(car={}, matching={})", self.car_id, self.matching_id)
    }
}
