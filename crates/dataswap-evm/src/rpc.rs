//! JSON-RPC 2.0 wire types and the HTTP transport.
//!
//! One attempt per request: a timeout or failed connection is returned as a
//! `TransportError`, retry policy belongs to whoever owns the transport.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use dataswap_core::config::RpcConfig;
use dataswap_core::error::TransportError;

// ─── Wire types ──────────────────────────────────────────────────────────────

/// A JSON-RPC 2.0 request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    pub params: Vec<Value>,
    pub id: u64,
}

impl JsonRpcRequest {
    pub fn new(id: u64, method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            method: method.into(),
            params,
            id,
        }
    }
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// A JSON-RPC 2.0 response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: u64, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id: Value::from(id),
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: u64, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id: Value::from(id),
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }

    /// The result value, or the node's error as `TransportError::Rpc`.
    ///
    /// Revert data attached to the error is appended to the message.
    pub fn into_result(self) -> Result<Value, TransportError> {
        match self.error {
            Some(err) => {
                let message = match err.data {
                    Some(Value::String(data)) => format!("{} ({data})", err.message),
                    _ => err.message,
                };
                Err(TransportError::Rpc {
                    code: err.code,
                    message,
                })
            }
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

// ─── Transport ───────────────────────────────────────────────────────────────

/// Sends JSON-RPC requests to a node.
#[async_trait]
pub trait RpcTransport: Send + Sync + 'static {
    async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError>;

    /// Identifier of the endpoint (URL or name).
    fn url(&self) -> &str;
}

/// HTTP JSON-RPC transport backed by `reqwest`.
pub struct HttpTransport {
    url: String,
    http: reqwest::Client,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Http(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            url: url.into(),
            http,
            timeout,
        })
    }

    pub fn from_config(config: &RpcConfig) -> Result<Self, TransportError> {
        Self::new(config.url.clone(), Duration::from_millis(config.request_timeout_ms))
    }

    fn map_reqwest(&self, e: reqwest::Error) -> TransportError {
        if e.is_timeout() {
            TransportError::Timeout {
                ms: self.timeout.as_millis() as u64,
            }
        } else {
            TransportError::Http(e.to_string())
        }
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
        debug!(url = %self.url, method = %req.method, id = req.id, "rpc request");

        let resp = self
            .http
            .post(&self.url)
            .json(&req)
            .send()
            .await
            .map_err(|e| self.map_reqwest(e))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            warn!(url = %self.url, method = %req.method, status, "rpc http error");
            return Err(TransportError::Http(format!("HTTP {status}: {body}")));
        }

        resp.json::<JsonRpcResponse>()
            .await
            .map_err(|e| self.map_reqwest(e))
    }

    fn url(&self) -> &str {
        &self.url
    }
}
