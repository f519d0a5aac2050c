//! Gas limit estimation bounded by per-network limits

use crate::chain::{BoundContract, RawError, TransactionProvider};
use crate::config::NetworkGasConfig;

use ethers::abi::Token;
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::U256;
use tracing::debug;

/// Fixed-point scale for the buffer multiplier
const BUFFER_SCALE: u64 = 10_000;

/// Gas estimator for one network
#[derive(Debug, Clone)]
pub struct GasEstimator {
    config: NetworkGasConfig,
}

impl GasEstimator {
    pub fn new(config: NetworkGasConfig) -> Self {
        Self { config }
    }

    /// Gas limit for a raw transaction
    ///
    /// A gas value already set on the transaction is used as-is.
    pub async fn estimate_raw(
        &self,
        provider: &dyn TransactionProvider,
        tx: &TypedTransaction,
    ) -> Result<U256, RawError> {
        if let Some(gas) = tx.gas() {
            debug!("Using gas limit set on transaction: {}", gas);
            return Ok(*gas);
        }

        let estimate = provider.estimate_gas(tx).await?;
        Ok(self.bounded(estimate))
    }

    /// Gas limit for a contract method call
    pub async fn estimate_call(
        &self,
        contract: &dyn BoundContract,
        method: &str,
        params: &[Token],
        gas_override: Option<U256>,
    ) -> Result<U256, RawError> {
        if let Some(gas) = gas_override {
            debug!("Using gas override for {}: {}", method, gas);
            return Ok(gas);
        }

        let estimate = contract.estimate_gas(method, params).await?;
        Ok(self.bounded(estimate))
    }

    /// Buffer then clamp an estimate
    pub fn bounded(&self, estimate: U256) -> U256 {
        let buffered = self.apply_buffer(estimate);
        let limit = self.clamp(buffered);
        debug!(
            "Gas estimate {} buffered to {}, limit {}",
            estimate, buffered, limit
        );
        limit
    }

    /// Scale by the buffer multiplier (never below 1) in integer arithmetic
    pub fn apply_buffer(&self, estimate: U256) -> U256 {
        let multiplier = self.config.gas_buffer_multiplier.max(1.0);
        let factor = (multiplier * BUFFER_SCALE as f64).round() as u64;
        estimate.saturating_mul(U256::from(factor)) / U256::from(BUFFER_SCALE)
    }

    pub fn clamp(&self, gas: U256) -> U256 {
        let (min, max) = (self.config.min(), self.config.max());
        if gas < min {
            min
        } else if gas > max {
            max
        } else {
            gas
        }
    }
}
