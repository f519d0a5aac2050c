//! ethers-rs backed provider and wallet session

use super::{RawError, TransactionProvider, WalletSession};
use crate::config::{NetworkConfig, WalletConfig};
use crate::error::{TxError, TxResult};

use async_trait::async_trait;
use ethers::middleware::SignerMiddleware;
use ethers::prelude::*;
use ethers::providers::{Http, Provider};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip2718::TypedTransaction;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Signing HTTP client used by both the provider and bound contracts
pub type SigningClient = SignerMiddleware<Provider<Http>, LocalWallet>;

/// Provider that signs with a local wallet
pub struct EthersProvider {
    client: Arc<SigningClient>,
    chain_id: u64,
}

impl EthersProvider {
    /// Connect to a network's RPC endpoint with the given wallet
    pub fn connect(network: &NetworkConfig, wallet: LocalWallet) -> TxResult<Self> {
        let provider = Provider::<Http>::try_from(network.rpc_url.as_str())
            .map_err(|e| TxError::Provider(format!("Invalid RPC URL {}: {}", network.rpc_url, e)))?
            .interval(Duration::from_millis(100));

        let wallet = wallet.with_chain_id(network.chain_id);
        info!(
            "Connected to {} (chain {}) as {:?}",
            network.display_name,
            network.chain_id,
            wallet.address()
        );

        Ok(Self {
            client: Arc::new(SignerMiddleware::new(provider, wallet)),
            chain_id: network.chain_id,
        })
    }

    /// Shared signing client, for binding contracts
    pub fn client(&self) -> Arc<SigningClient> {
        self.client.clone()
    }
}

#[async_trait]
impl TransactionProvider for EthersProvider {
    async fn estimate_gas(&self, tx: &TypedTransaction) -> Result<U256, RawError> {
        let mut tx = tx.clone();
        if tx.from().is_none() {
            tx.set_from(self.client.address());
        }
        self.client
            .estimate_gas(&tx, None)
            .await
            .map_err(RawError::from_middleware)
    }

    async fn send_transaction(&self, tx: TypedTransaction) -> Result<H256, RawError> {
        let pending = self
            .client
            .send_transaction(tx, None)
            .await
            .map_err(RawError::from_middleware)?;
        let tx_hash = pending.tx_hash();
        debug!("Broadcast {:?} on chain {}", tx_hash, self.chain_id);
        Ok(tx_hash)
    }

    async fn get_transaction_receipt(
        &self,
        tx_hash: H256,
    ) -> Result<Option<TransactionReceipt>, RawError> {
        self.client
            .get_transaction_receipt(tx_hash)
            .await
            .map_err(RawError::from_middleware)
    }
}

/// Wallet session backed by an optional local key
pub struct LocalWalletSession {
    wallet: Option<LocalWallet>,
}

impl LocalWalletSession {
    pub fn new(wallet: Option<LocalWallet>) -> Self {
        Self { wallet }
    }

    /// Load the signing key from the environment variable named in config
    pub fn from_env(config: &WalletConfig) -> TxResult<Self> {
        match std::env::var(&config.private_key_env) {
            Ok(key) => {
                let wallet = key
                    .trim()
                    .parse::<LocalWallet>()
                    .map_err(|e| TxError::Wallet(format!("Invalid private key: {}", e)))?;
                Ok(Self::new(Some(wallet)))
            }
            Err(_) => Ok(Self::new(None)),
        }
    }

    pub fn wallet(&self) -> Option<&LocalWallet> {
        self.wallet.as_ref()
    }
}

impl WalletSession for LocalWalletSession {
    fn active_account(&self) -> Option<Address> {
        self.wallet.as_ref().map(|w| w.address())
    }
}
