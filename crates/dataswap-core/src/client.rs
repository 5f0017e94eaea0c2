//! The chain RPC boundary.
//!
//! `ChainClient` is the only place this layer touches the chain. How a call or
//! send is physically executed (JSON-RPC, signing, gas estimation) belongs to
//! the implementation; `dataswap-evm` provides one over JSON-RPC.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::TransportError;
use crate::value::ParamValue;

/// Options attached to a state-changing transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOptions {
    /// Sender address (`0x` + 40 hex chars).
    pub from: String,
    /// Native value to transfer with the transaction (wei / attoFIL).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<u128>,
    /// Upper bound on gas units.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_limit: Option<u64>,
    /// Upper bound on the gas price.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<u128>,
}

impl TxOptions {
    pub fn from_address(from: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            ..Default::default()
        }
    }

    pub fn value(mut self, value: u128) -> Self {
        self.value = Some(value);
        self
    }

    pub fn gas_limit(mut self, gas: u64) -> Self {
        self.gas_limit = Some(gas);
        self
    }

    pub fn gas_price(mut self, price: u128) -> Self {
        self.gas_price = Some(price);
        self
    }

    /// Check the options before anything is submitted.
    pub fn validate(&self) -> Result<(), String> {
        if !is_hex_address(&self.from) {
            return Err(format!("sender '{}' is not a 20-byte hex address", self.from));
        }
        if self.gas_limit == Some(0) {
            return Err("gas limit must be greater than zero".into());
        }
        if self.gas_price == Some(0) {
            return Err("gas price must be greater than zero".into());
        }
        Ok(())
    }
}

/// Returns `true` for a `0x`-prefixed, 40 hex digit address.
pub fn is_hex_address(s: &str) -> bool {
    s.strip_prefix("0x")
        .map(|h| h.len() == 40 && h.chars().all(|c| c.is_ascii_hexdigit()))
        .unwrap_or(false)
}

/// Result of a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub tx_hash: String,
}

/// Executes contract reads and writes.
///
/// Expected failures (revert, network error, timeout) are returned as
/// `TransportError`; implementations must not retry silently.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Read-only invocation of `method` on the contract at `address`.
    async fn call(
        &self,
        address: &str,
        method: &str,
        args: Vec<ParamValue>,
    ) -> Result<ParamValue, TransportError>;

    /// State-changing invocation of `method` on the contract at `address`.
    async fn send(
        &self,
        address: &str,
        method: &str,
        args: Vec<ParamValue>,
        options: &TxOptions,
    ) -> Result<TxReceipt, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    const SENDER: &str = "0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045";

    #[test]
    fn valid_options_pass() {
        let opts = TxOptions::from_address(SENDER).value(10).gas_limit(21_000);
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn malformed_sender_is_rejected() {
        assert!(TxOptions::from_address("0xA").validate().is_err());
        assert!(TxOptions::from_address("").validate().is_err());
        let no_prefix = SENDER.trim_start_matches("0x");
        assert!(TxOptions::from_address(no_prefix).validate().is_err());
    }

    #[test]
    fn zero_gas_bounds_are_rejected() {
        assert!(TxOptions::from_address(SENDER).gas_limit(0).validate().is_err());
        assert!(TxOptions::from_address(SENDER).gas_price(0).validate().is_err());
    }
}
