//! Receipt polling with a bounded attempt budget

use crate::chain::TransactionProvider;
use crate::config::PollerConfig;

use async_trait::async_trait;
use ethers::types::{TransactionReceipt, H256};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Source of delays between poll attempts
#[async_trait]
pub trait Clock: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Polls for a receipt until one appears or the attempts run out
#[derive(Clone)]
pub struct ReceiptPoller {
    interval: Duration,
    max_attempts: u32,
    clock: Arc<dyn Clock>,
}

impl ReceiptPoller {
    pub fn new(config: &PollerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            interval: config.interval(),
            max_attempts: config.max_attempts.max(1),
            clock,
        }
    }

    /// Longest time spent between attempts, saturating at `Duration::MAX`
    pub fn window(&self) -> Duration {
        self.interval.saturating_mul(self.max_attempts)
    }

    /// Returns `None` once every attempt has come back empty
    pub async fn wait_for_receipt(
        &self,
        provider: &dyn TransactionProvider,
        tx_hash: H256,
    ) -> Option<TransactionReceipt> {
        for attempt in 1..=self.max_attempts {
            match provider.get_transaction_receipt(tx_hash).await {
                Ok(Some(receipt)) => {
                    debug!("Receipt for {:?} found on attempt {}", tx_hash, attempt);
                    return Some(receipt);
                }
                Ok(None) => {}
                Err(e) => {
                    debug!("Receipt lookup for {:?} failed on attempt {}: {}", tx_hash, attempt, e);
                }
            }

            if attempt < self.max_attempts {
                self.clock.sleep(self.interval).await;
            }
        }

        warn!(
            "No receipt for {:?} after {} attempts",
            tx_hash, self.max_attempts
        );
        None
    }
}

impl Default for ReceiptPoller {
    fn default() -> Self {
        Self::new(&PollerConfig::default(), Arc::new(TokioClock))
    }
}
