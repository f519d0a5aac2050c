//! ABI-bound contract over the signing client

use super::provider::SigningClient;
use super::{BoundContract, RawError};
use crate::error::{TxError, TxResult};

use async_trait::async_trait;
use ethers::abi::{Abi, Token};
use ethers::prelude::*;
use ethers::types::transaction::eip2718::TypedTransaction;
use std::sync::Arc;
use tracing::debug;

/// Contract at a fixed address, calls signed by the client's wallet
pub struct EthersContract {
    address: Address,
    abi: Abi,
    client: Arc<SigningClient>,
}

impl EthersContract {
    pub fn new(address: Address, abi: Abi, client: Arc<SigningClient>) -> Self {
        Self { address, abi, client }
    }

    /// Parse a JSON ABI (either a bare array or a `{ "abi": [...] }` artifact)
    pub fn parse_abi(json: &str) -> TxResult<Abi> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| TxError::Abi(e.to_string()))?;
        let abi_value = match value.get("abi") {
            Some(inner) => inner.clone(),
            None => value,
        };
        serde_json::from_value(abi_value).map_err(|e| TxError::Abi(e.to_string()))
    }

    /// Build the call transaction for `method`
    fn build_call(&self, method: &str, params: &[Token]) -> Result<TypedTransaction, RawError> {
        let function = self
            .abi
            .function(method)
            .map_err(|e| RawError::message(format!("Unknown method {}: {}", method, e)))?;
        let data = function
            .encode_input(params)
            .map_err(|e| RawError::message(format!("Invalid params for {}: {}", method, e)))?;

        let tx = Eip1559TransactionRequest::new()
            .from(self.client.address())
            .to(self.address)
            .data(data);
        Ok(TypedTransaction::Eip1559(tx))
    }
}

#[async_trait]
impl BoundContract for EthersContract {
    async fn estimate_gas(&self, method: &str, params: &[Token]) -> Result<U256, RawError> {
        let tx = self.build_call(method, params)?;
        self.client
            .estimate_gas(&tx, None)
            .await
            .map_err(RawError::from_middleware)
    }

    async fn call(
        &self,
        method: &str,
        params: &[Token],
        gas_limit: U256,
    ) -> Result<H256, RawError> {
        let mut tx = self.build_call(method, params)?;
        tx.set_gas(gas_limit);

        let pending = self
            .client
            .send_transaction(tx, None)
            .await
            .map_err(RawError::from_middleware)?;
        debug!("Called {} on {:?}: {:?}", method, self.address, pending.tx_hash());
        Ok(pending.tx_hash())
    }

    fn decode_error(&self, data: &[u8]) -> Option<String> {
        decode_custom_error(&self.abi, data)
    }
}

/// Match the 4-byte selector in `data` against the ABI's custom errors
pub fn decode_custom_error(abi: &Abi, data: &[u8]) -> Option<String> {
    if data.len() < 4 {
        return None;
    }
    let (selector, args) = data.split_at(4);

    abi.errors()
        .find(|error| &error.signature().as_bytes()[..4] == selector)
        .filter(|error| error.decode(args).is_ok())
        .map(|error| error.name.clone())
}
