//! Per-contract method allow-lists.
//!
//! Each facade declares the on-chain methods it exposes as two lists: read-only
//! calls and state-changing sends. The lists are validated once, when the
//! table is built, so a misconfigured facade never reaches the chain.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ConfigError;
use crate::types::ContractKind;

/// How a contract method is invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MethodKind {
    /// Read-only query (`eth_call`), no side effects.
    Call,
    /// State-changing transaction.
    Send,
}

impl fmt::Display for MethodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Call => write!(f, "call"),
            Self::Send => write!(f, "send"),
        }
    }
}

/// A single registered method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractMethodSpec {
    pub name: String,
    pub kind: MethodKind,
}

/// Immutable method-name → kind table for one contract.
#[derive(Debug, Clone)]
pub struct MethodTable {
    contract: ContractKind,
    methods: IndexMap<String, MethodKind>,
}

impl MethodTable {
    /// Build a table from the call-list and send-list.
    ///
    /// # Errors
    /// Returns `ConfigError` for empty names, a name listed twice in the same
    /// list, or a name present in both lists.
    pub fn new(contract: ContractKind, calls: &[&str], sends: &[&str]) -> Result<Self, ConfigError> {
        let mut methods = IndexMap::with_capacity(calls.len() + sends.len());

        for (kind, list) in [(MethodKind::Call, calls), (MethodKind::Send, sends)] {
            for name in list {
                if name.trim().is_empty() {
                    return Err(ConfigError::EmptyMethodName { contract, kind });
                }
                match methods.get(*name) {
                    Some(existing) if *existing == kind => {
                        return Err(ConfigError::DuplicateMethod {
                            contract,
                            method: name.to_string(),
                            kind,
                        });
                    }
                    Some(_) => {
                        return Err(ConfigError::ConflictingKind {
                            contract,
                            method: name.to_string(),
                        });
                    }
                    None => {
                        methods.insert(name.to_string(), kind);
                    }
                }
            }
        }

        Ok(Self { contract, methods })
    }

    pub fn contract(&self) -> ContractKind {
        self.contract
    }

    /// Resolve the invocation kind of a method, `None` if unregistered.
    pub fn kind_of(&self, method: &str) -> Option<MethodKind> {
        self.methods.get(method).copied()
    }

    pub fn contains(&self, method: &str) -> bool {
        self.methods.contains_key(method)
    }

    /// Registered method names of one kind, in declaration order.
    pub fn names(&self, kind: MethodKind) -> impl Iterator<Item = &str> {
        self.methods
            .iter()
            .filter(move |(_, k)| **k == kind)
            .map(|(n, _)| n.as_str())
    }

    /// All registered methods, in declaration order.
    pub fn specs(&self) -> Vec<ContractMethodSpec> {
        self.methods
            .iter()
            .map(|(name, kind)| ContractMethodSpec {
                name: name.clone(),
                kind: *kind,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}
