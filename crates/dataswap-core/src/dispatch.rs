//! Method dispatcher: routes a named method to `call` or `send`.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::client::{ChainClient, TxOptions, TxReceipt};
use crate::error::ContractError;
use crate::method::{MethodKind, MethodTable};
use crate::types::ContractKind;
use crate::value::ParamValue;

/// Output of a dispatched invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutput {
    /// Return value of a read-only call.
    Returned(ParamValue),
    /// Receipt of a submitted transaction.
    Submitted(TxReceipt),
}

/// Invocation plumbing for one deployed contract.
///
/// Holds the contract address, its method table and the chain client. No
/// business logic lives here.
#[derive(Clone)]
pub struct MethodDispatcher {
    address: String,
    table: MethodTable,
    client: Arc<dyn ChainClient>,
}

impl MethodDispatcher {
    pub fn new(address: impl Into<String>, table: MethodTable, client: Arc<dyn ChainClient>) -> Self {
        Self {
            address: address.into(),
            table,
            client,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn contract(&self) -> ContractKind {
        self.table.contract()
    }

    pub fn table(&self) -> &MethodTable {
        &self.table
    }

    /// Invoke `method`, choosing call or send from the method table.
    ///
    /// `options` is required (and validated) for send methods and ignored for
    /// calls.
    pub async fn dispatch(
        &self,
        method: &str,
        args: Vec<ParamValue>,
        options: Option<&TxOptions>,
    ) -> Result<DispatchOutput, ContractError> {
        let kind = self.resolve(method)?;
        self.invoke(kind, method, args, options).await
    }

    /// Invoke a registered read-only method.
    pub async fn call(&self, method: &str, args: Vec<ParamValue>) -> Result<ParamValue, ContractError> {
        self.expect_kind(method, MethodKind::Call)?;
        match self.invoke(MethodKind::Call, method, args, None).await? {
            DispatchOutput::Returned(value) => Ok(value),
            DispatchOutput::Submitted(_) => Err(self.mismatch(method, MethodKind::Send, MethodKind::Call)),
        }
    }

    /// Invoke a registered state-changing method.
    pub async fn send(
        &self,
        method: &str,
        args: Vec<ParamValue>,
        options: &TxOptions,
    ) -> Result<TxReceipt, ContractError> {
        self.expect_kind(method, MethodKind::Send)?;
        match self.invoke(MethodKind::Send, method, args, Some(options)).await? {
            DispatchOutput::Submitted(receipt) => Ok(receipt),
            DispatchOutput::Returned(_) => Err(self.mismatch(method, MethodKind::Call, MethodKind::Send)),
        }
    }

    fn resolve(&self, method: &str) -> Result<MethodKind, ContractError> {
        self.table
            .kind_of(method)
            .ok_or_else(|| ContractError::UnsupportedMethod {
                contract: self.contract(),
                method: method.to_string(),
            })
    }

    fn expect_kind(&self, method: &str, requested: MethodKind) -> Result<(), ContractError> {
        let registered = self.resolve(method)?;
        if registered != requested {
            return Err(self.mismatch(method, registered, requested));
        }
        Ok(())
    }

    fn mismatch(&self, method: &str, registered: MethodKind, requested: MethodKind) -> ContractError {
        ContractError::KindMismatch {
            contract: self.contract(),
            method: method.to_string(),
            registered,
            requested,
        }
    }

    async fn invoke(
        &self,
        kind: MethodKind,
        method: &str,
        args: Vec<ParamValue>,
        options: Option<&TxOptions>,
    ) -> Result<DispatchOutput, ContractError> {
        let contract = self.contract();
        debug!(%contract, method, %kind, args = args.len(), "dispatching");

        let transport_err = |source| ContractError::Transport {
            contract,
            method: method.to_string(),
            source,
        };

        match kind {
            MethodKind::Call => self
                .client
                .call(&self.address, method, args)
                .await
                .map(DispatchOutput::Returned)
                .map_err(transport_err),
            MethodKind::Send => {
                let options = options.ok_or_else(|| {
                    ContractError::InvalidTxOptions(format!("{contract}.{method} requires transaction options"))
                })?;
                options.validate().map_err(ContractError::InvalidTxOptions)?;

                let receipt = self
                    .client
                    .send(&self.address, method, args, options)
                    .await
                    .map_err(|e| {
                        warn!(%contract, method, error = %e, "transaction failed");
                        transport_err(e)
                    })?;
                debug!(%contract, method, tx = %receipt.tx_hash, "transaction submitted");
                Ok(DispatchOutput::Submitted(receipt))
            }
        }
    }
}
