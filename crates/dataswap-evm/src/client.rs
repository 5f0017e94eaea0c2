//! `ChainClient` over JSON-RPC with ABI encoding.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

use dataswap_core::client::{ChainClient, TxOptions, TxReceipt};
use dataswap_core::error::{DecodeError, TransportError};
use dataswap_core::message::RawMessage;
use dataswap_core::value::ParamValue;

use crate::abi::ContractAbi;
use crate::error::SyncError;
use crate::rpc::{JsonRpcRequest, RpcTransport};

/// Executes contract calls as `eth_call` and sends as `eth_sendTransaction`.
///
/// Every contract address the client talks to must be registered with its
/// ABI. Signing is left to the node.
pub struct EvmChainClient {
    transport: Arc<dyn RpcTransport>,
    contracts: HashMap<String, ContractAbi>,
    next_id: AtomicU64,
}

impl EvmChainClient {
    pub fn new(transport: Arc<dyn RpcTransport>) -> Self {
        Self {
            transport,
            contracts: HashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register the ABI of the contract deployed at `address`.
    pub fn with_contract(mut self, address: &str, abi: ContractAbi) -> Self {
        self.contracts.insert(address.to_ascii_lowercase(), abi);
        self
    }

    pub fn abi_for(&self, address: &str) -> Result<&ContractAbi, TransportError> {
        self.contracts
            .get(&address.to_ascii_lowercase())
            .ok_or_else(|| TransportError::UnknownContract {
                address: address.to_string(),
            })
    }

    async fn request(&self, method: &str, params: Vec<Value>) -> Result<Value, TransportError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let resp = self.transport.send(JsonRpcRequest::new(id, method, params)).await?;
        resp.into_result()
    }

    /// Fetch a transaction and decode its calldata into a [`RawMessage`]
    /// carrying the transaction context.
    pub async fn fetch_message(&self, tx_hash: &str) -> Result<RawMessage, SyncError> {
        let tx = self
            .request("eth_getTransactionByHash", vec![Value::from(tx_hash)])
            .await?;
        if tx.is_null() {
            return Err(TransportError::Other(format!("transaction {tx_hash} not found")).into());
        }

        let to = tx["to"]
            .as_str()
            .ok_or_else(|| DecodeError::MissingField { field: "to".into() })?;
        let abi = self.abi_for(to).map_err(|_| DecodeError::UnknownContract {
            address: to.to_string(),
        })?;
        let input = tx["input"]
            .as_str()
            .ok_or_else(|| DecodeError::MissingField { field: "input".into() })?;
        let calldata = decode_hex(input).map_err(|reason| DecodeError::InvalidCalldata { reason })?;

        let mut msg = abi.decode_calldata(&calldata)?;
        msg.tx_hash = Some(tx_hash.to_string());
        msg.from = tx["from"].as_str().map(str::to_string);
        msg.to = Some(to.to_string());
        msg.block_number = tx["blockNumber"].as_str().and_then(parse_quantity);
        trace!(tx_hash, method = %msg.method, "transaction decoded");
        Ok(msg)
    }
}

fn decode_hex(s: &str) -> Result<Vec<u8>, String> {
    let h = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(h).map_err(|e| format!("invalid hex: {e}"))
}

fn parse_quantity(s: &str) -> Option<u64> {
    u64::from_str_radix(s.strip_prefix("0x")?, 16).ok()
}

fn quantity(v: u128) -> String {
    format!("0x{v:x}")
}

#[async_trait]
impl ChainClient for EvmChainClient {
    async fn call(&self, address: &str, method: &str, args: Vec<ParamValue>) -> Result<ParamValue, TransportError> {
        let abi = self.abi_for(address)?;
        let data = abi.encode_call(method, &args)?;
        debug!(to = address, method, "eth_call");

        let raw = self
            .request(
                "eth_call",
                vec![
                    json!({ "to": address, "data": format!("0x{}", hex::encode(&data)) }),
                    Value::from("latest"),
                ],
            )
            .await?;
        let hex_str: String = serde_json::from_value(raw)?;
        let bytes = decode_hex(&hex_str).map_err(TransportError::Abi)?;
        abi.decode_output(method, &bytes)
    }

    async fn send(
        &self,
        address: &str,
        method: &str,
        args: Vec<ParamValue>,
        options: &TxOptions,
    ) -> Result<TxReceipt, TransportError> {
        let abi = self.abi_for(address)?;
        let data = abi.encode_call(method, &args)?;

        let mut tx = json!({
            "from": options.from,
            "to": address,
            "data": format!("0x{}", hex::encode(&data)),
        });
        if let Some(value) = options.value {
            tx["value"] = Value::from(quantity(value));
        }
        if let Some(gas) = options.gas_limit {
            tx["gas"] = Value::from(quantity(gas.into()));
        }
        if let Some(price) = options.gas_price {
            tx["gasPrice"] = Value::from(quantity(price));
        }

        debug!(to = address, from = %options.from, method, "eth_sendTransaction");
        let raw = self.request("eth_sendTransaction", vec![tx]).await?;
        let tx_hash: String = serde_json::from_value(raw)?;
        Ok(TxReceipt { tx_hash })
    }
}
