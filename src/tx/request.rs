//! What the caller asks the sender to do

use super::classify::{ClassifiedError, ErrorStage};
use crate::chain::{BoundContract, RawError};

use ethers::abi::Token;
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{TransactionReceipt, U256};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// A metadata value attached to reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
    Record(Map<String, Value>),
    Records(Vec<Map<String, Value>>),
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        MetadataValue::Text(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        MetadataValue::Text(value)
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        MetadataValue::Bool(value)
    }
}

impl From<u64> for MetadataValue {
    fn from(value: u64) -> Self {
        MetadataValue::Number(value.into())
    }
}

pub type Metadata = BTreeMap<String, MetadataValue>;

/// One transaction to submit
pub enum TransactionRequest {
    /// A fully formed transaction sent through the provider
    Raw {
        tx: TypedTransaction,
        /// Only used to decode custom errors
        contract: Option<Arc<dyn BoundContract>>,
        metadata: Metadata,
    },
    /// A method call on a bound contract
    MethodCall {
        contract: Arc<dyn BoundContract>,
        method: String,
        params: Vec<Token>,
        /// Skips estimation and clamping when set
        gas_override: Option<U256>,
        metadata: Metadata,
    },
}

impl TransactionRequest {
    pub fn raw(tx: impl Into<TypedTransaction>) -> Self {
        TransactionRequest::Raw {
            tx: tx.into(),
            contract: None,
            metadata: Metadata::new(),
        }
    }

    pub fn method_call(
        contract: Arc<dyn BoundContract>,
        method: impl Into<String>,
        params: Vec<Token>,
    ) -> Self {
        TransactionRequest::MethodCall {
            contract,
            method: method.into(),
            params,
            gas_override: None,
            metadata: Metadata::new(),
        }
    }

    /// Attach a contract to a raw request for error decoding
    pub fn with_contract(mut self, bound: Arc<dyn BoundContract>) -> Self {
        match &mut self {
            TransactionRequest::Raw { contract, .. } => *contract = Some(bound),
            TransactionRequest::MethodCall { contract, .. } => *contract = bound,
        }
        self
    }

    /// Set an explicit gas limit on a method call
    ///
    /// For raw requests, set the gas on the transaction itself.
    pub fn with_gas_limit(mut self, gas_limit: U256) -> Self {
        match &mut self {
            TransactionRequest::Raw { tx, .. } => {
                tx.set_gas(gas_limit);
            }
            TransactionRequest::MethodCall { gas_override, .. } => *gas_override = Some(gas_limit),
        }
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.metadata_mut().insert(key.into(), value.into());
        self
    }

    pub fn contract(&self) -> Option<Arc<dyn BoundContract>> {
        match self {
            TransactionRequest::Raw { contract, .. } => contract.clone(),
            TransactionRequest::MethodCall { contract, .. } => Some(contract.clone()),
        }
    }

    pub fn metadata(&self) -> &Metadata {
        match self {
            TransactionRequest::Raw { metadata, .. }
            | TransactionRequest::MethodCall { metadata, .. } => metadata,
        }
    }

    fn metadata_mut(&mut self) -> &mut Metadata {
        match self {
            TransactionRequest::Raw { metadata, .. }
            | TransactionRequest::MethodCall { metadata, .. } => metadata,
        }
    }
}

impl fmt::Debug for TransactionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionRequest::Raw { tx, contract, .. } => f
                .debug_struct("Raw")
                .field("tx", tx)
                .field("has_contract", &contract.is_some())
                .finish(),
            TransactionRequest::MethodCall {
                method,
                params,
                gas_override,
                ..
            } => f
                .debug_struct("MethodCall")
                .field("method", method)
                .field("params", params)
                .field("gas_override", gas_override)
                .finish(),
        }
    }
}

/// Passed to the caller's error handler
#[derive(Debug, Clone)]
pub struct FailureEvent {
    pub error: ClassifiedError,
    pub stage: ErrorStage,
    pub raw: RawError,
    pub receipt: Option<TransactionReceipt>,
}

pub type CompletionCallback =
    Box<dyn FnOnce(TransactionReceipt) -> BoxFuture<'static, anyhow::Result<()>> + Send>;

pub type ErrorHandler = Box<dyn FnOnce(FailureEvent) + Send>;

/// Caller hooks for one submission
#[derive(Default)]
pub struct TransactionOptions {
    pub on_complete: Option<CompletionCallback>,
    pub on_error: Option<ErrorHandler>,
    pub metadata: Metadata,
}

impl TransactionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run after a successful receipt; its error is returned to the caller
    pub fn on_complete<F, Fut>(mut self, callback: F) -> Self
    where
        F: FnOnce(TransactionReceipt) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.on_complete = Some(Box::new(move |receipt| callback(receipt).boxed()));
        self
    }

    pub fn on_error<F>(mut self, handler: F) -> Self
    where
        F: FnOnce(FailureEvent) + Send + 'static,
    {
        self.on_error = Some(Box::new(handler));
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}
