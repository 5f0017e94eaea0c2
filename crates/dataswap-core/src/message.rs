//! Message decoder: classifies raw transactions into protocol events.
//!
//! A raw message is either *decoded* into a [`ProtocolEvent`] or *rejected*
//! with [`DecodeError::UnsupportedMethod`]. Every send method of a contract
//! has a registered [`CorrelationRule`] describing which of its parameters
//! carry the dataset / matching ids surfaced on the event.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::error::{ConfigError, DecodeError};
use crate::method::{MethodKind, MethodTable};
use crate::types::ContractKind;
use crate::value::{ParamValue, Params};

// ─── RawMessage ───────────────────────────────────────────────────────────────

/// An already-parsed chain transaction: method name plus named parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMessage {
    pub method: String,
    pub params: Params,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
}

impl RawMessage {
    pub fn new(method: impl Into<String>, params: Params) -> Self {
        Self {
            method: method.into(),
            params,
            tx_hash: None,
            from: None,
            to: None,
            block_number: None,
        }
    }

    /// Build from `(name, value)` pairs, keeping their order.
    pub fn with_params<I, K, V>(method: impl Into<String>, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<ParamValue>,
    {
        let params = params
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self::new(method, params)
    }

    /// Attach transaction context.
    pub fn in_tx(
        mut self,
        tx_hash: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
        block_number: u64,
    ) -> Self {
        self.tx_hash = Some(tx_hash.into());
        self.from = Some(from.into());
        self.to = Some(to.into());
        self.block_number = Some(block_number);
        self
    }
}

// ─── ProtocolEvent ────────────────────────────────────────────────────────────

/// Protocol correlation ids lifted out of the parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Correlation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matching_id: Option<u64>,
}

impl Correlation {
    pub fn is_empty(&self) -> bool {
        self.dataset_id.is_none() && self.matching_id.is_none()
    }
}

/// A decoded, classified protocol message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolEvent {
    pub contract: ContractKind,
    pub method: String,
    pub params: Params,
    #[serde(flatten)]
    pub correlation: Correlation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
}

impl ProtocolEvent {
    pub fn dataset_id(&self) -> Option<u64> {
        self.correlation.dataset_id
    }

    pub fn matching_id(&self) -> Option<u64> {
        self.correlation.matching_id
    }

    pub fn param(&self, name: &str) -> Option<&ParamValue> {
        self.params.get(name)
    }
}

// ─── CorrelationRule ──────────────────────────────────────────────────────────

/// Which parameters of a method carry correlation ids.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CorrelationRule {
    dataset_param: Option<&'static str>,
    matching_param: Option<&'static str>,
}

impl CorrelationRule {
    /// The method concerns no specific dataset or matching.
    pub const NONE: Self = Self {
        dataset_param: None,
        matching_param: None,
    };

    pub const fn dataset(param: &'static str) -> Self {
        Self {
            dataset_param: Some(param),
            matching_param: None,
        }
    }

    pub const fn dataset_and_matching(dataset: &'static str, matching: &'static str) -> Self {
        Self {
            dataset_param: Some(dataset),
            matching_param: Some(matching),
        }
    }

    fn extract(&self, contract: ContractKind, method: &str, params: &Params) -> Correlation {
        Correlation {
            dataset_id: self
                .dataset_param
                .and_then(|name| id_param(contract, method, params, name)),
            matching_id: self
                .matching_param
                .and_then(|name| id_param(contract, method, params, name)),
        }
    }
}

fn id_param(contract: ContractKind, method: &str, params: &Params, name: &str) -> Option<u64> {
    match params.get(name) {
        Some(value) => {
            let id = value.as_u64();
            if id.is_none() {
                warn!(%contract, method, param = name, got = value.type_name(), "correlation id is not numeric");
            }
            id
        }
        None => {
            warn!(%contract, method, param = name, "correlation id parameter missing");
            None
        }
    }
}

// ─── MessageDecoder ───────────────────────────────────────────────────────────

/// Decode table for one contract.
#[derive(Debug, Clone)]
pub struct MessageDecoder {
    contract: ContractKind,
    rules: IndexMap<String, CorrelationRule>,
}

impl MessageDecoder {
    /// Build a decoder covering exactly the send-list of `table`.
    ///
    /// # Errors
    /// `ConfigError::MissingDecodeRule` if a send method has no rule,
    /// `ConfigError::UnknownDecodeRule` if a rule names anything else.
    pub fn new(table: &MethodTable, rules: &[(&str, CorrelationRule)]) -> Result<Self, ConfigError> {
        let contract = table.contract();
        let mut map = IndexMap::with_capacity(rules.len());

        for (method, rule) in rules {
            if table.kind_of(method) != Some(MethodKind::Send) || map.contains_key(*method) {
                return Err(ConfigError::UnknownDecodeRule {
                    contract,
                    method: method.to_string(),
                });
            }
            map.insert(method.to_string(), *rule);
        }

        if let Some(missing) = table.names(MethodKind::Send).find(|m| !map.contains_key(*m)) {
            return Err(ConfigError::MissingDecodeRule {
                contract,
                method: missing.to_string(),
            });
        }

        Ok(Self { contract, rules: map })
    }

    pub fn contract(&self) -> ContractKind {
        self.contract
    }

    /// Returns `true` if `method` is in this contract's decode table.
    pub fn supports(&self, method: &str) -> bool {
        self.rules.contains_key(method)
    }

    /// Decode a raw message into a protocol event.
    pub fn decode(&self, msg: &RawMessage) -> Result<ProtocolEvent, DecodeError> {
        let rule = self
            .rules
            .get(&msg.method)
            .ok_or_else(|| DecodeError::UnsupportedMethod {
                contract: self.contract,
                method: msg.method.clone(),
            })?;

        let correlation = rule.extract(self.contract, &msg.method, &msg.params);
        trace!(
            contract = %self.contract,
            method = %msg.method,
            dataset_id = ?correlation.dataset_id,
            matching_id = ?correlation.matching_id,
            "message decoded"
        );

        Ok(ProtocolEvent {
            contract: self.contract,
            method: msg.method.clone(),
            params: msg.params.clone(),
            correlation,
            tx_hash: msg.tx_hash.clone(),
            from: msg.from.clone(),
            to: msg.to.clone(),
            block_number: msg.block_number,
        })
    }
}
