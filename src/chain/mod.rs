//! Chain module - the collaborators the sender talks to
//!
//! This module provides:
//! - Traits for the wallet session, provider and bound contract
//! - The raw error envelope every collaborator failure is converted into
//! - ethers-rs backed implementations of those traits

pub mod contract;
pub mod provider;

pub use contract::EthersContract;
pub use provider::{EthersProvider, LocalWalletSession};

use async_trait::async_trait;
use ethers::abi::Token;
use ethers::providers::{JsonRpcError, MiddlewareError};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, TransactionReceipt, H256, U256};
use serde_json::{json, Value};
use std::fmt;

/// A failure as reported by a wallet, provider or node
///
/// Errors from the wire arrive in arbitrarily nested shapes (`{error: {error:
/// {...}}}`), so the payload is kept as JSON and interpreted by the
/// classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct RawError(pub Value);

impl RawError {
    /// Error with only a message
    pub fn message(message: impl Into<String>) -> Self {
        RawError(json!({ "message": message.into() }))
    }

    /// Convert a middleware error, keeping the JSON-RPC response when present
    pub fn from_middleware<E: MiddlewareError>(err: E) -> Self {
        match err.as_error_response() {
            Some(response) => Self::from(response),
            None => Self::message(err.to_string()),
        }
    }

    pub fn payload(&self) -> &Value {
        &self.0
    }
}

impl From<&JsonRpcError> for RawError {
    fn from(err: &JsonRpcError) -> Self {
        let mut payload = json!({
            "code": err.code,
            "message": err.message,
        });
        if let Some(data) = &err.data {
            payload["data"] = data.clone();
        }
        RawError(payload)
    }
}

impl From<Value> for RawError {
    fn from(value: Value) -> Self {
        RawError(value)
    }
}

impl fmt::Display for RawError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The connected wallet, if any
#[cfg_attr(test, mockall::automock)]
pub trait WalletSession: Send + Sync {
    /// Account that will sign, or `None` when no wallet is connected
    fn active_account(&self) -> Option<Address>;
}

/// Provider-level operations, signing included
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TransactionProvider: Send + Sync {
    async fn estimate_gas(&self, tx: &TypedTransaction) -> Result<U256, RawError>;

    /// Sign and broadcast, returning the transaction hash
    async fn send_transaction(&self, tx: TypedTransaction) -> Result<H256, RawError>;

    async fn get_transaction_receipt(
        &self,
        tx_hash: H256,
    ) -> Result<Option<TransactionReceipt>, RawError>;
}

/// A contract bound to an address and a signer
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BoundContract: Send + Sync {
    async fn estimate_gas(&self, method: &str, params: &[Token]) -> Result<U256, RawError>;

    /// Call `method` with an explicit gas limit, returning the transaction hash
    async fn call(&self, method: &str, params: &[Token], gas_limit: U256)
        -> Result<H256, RawError>;

    /// Name of the custom error encoded in `data`, if the ABI knows it
    fn decode_error(&self, data: &[u8]) -> Option<String>;
}

/// Whether a receipt reports failed execution
///
/// Pre-Byzantium receipts carry no status and are not treated as reverts.
pub fn receipt_reverted(receipt: &TransactionReceipt) -> bool {
    receipt.status == Some(0.into())
}
