//! Transaction sender: one submission from wallet prompt to receipt
//!
//! A submission moves through
//! `AwaitingSigner -> Estimating -> Submitting -> Polling` and ends in exactly
//! one of `Succeeded`, `Reverted`, `TimedOut`, `Denied` or `Failed`. Every
//! failure is classified and surfaced through the notification and report
//! sinks; only the caller's completion callback can make `submit_transaction`
//! return an error.

use super::classify::{classify, ErrorStage};
use super::gas::GasEstimator;
use super::poller::ReceiptPoller;
use super::request::{ErrorHandler, FailureEvent, Metadata, TransactionOptions, TransactionRequest};
use crate::chain::{receipt_reverted, BoundContract, RawError, TransactionProvider, WalletSession};
use crate::config::NetworkConfig;
use crate::error::{TxError, TxResult};
use crate::notify::{Notification, NotificationId, NotificationSink};
use crate::report::{ReportContext, ReportSink};

use chrono::Utc;
use ethers::types::{Address, TransactionReceipt, H256};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// How long success and error notifications stay up
const RESULT_DISPLAY: Duration = Duration::from_secs(8);

/// Terminal state of one submission
#[derive(Debug, Clone)]
pub enum Outcome {
    /// No wallet connected; nothing was attempted
    NoSigner,
    Succeeded(TransactionReceipt),
    /// Mined with a failed status
    Reverted(TransactionReceipt),
    /// Submitted but no receipt appeared before the poller gave up
    TimedOut(H256),
    /// Failed with no user-facing message and dismissed silently
    Denied(ErrorStage),
    /// Failed and reported
    Failed(ErrorStage),
}

impl Outcome {
    pub fn into_receipt(self) -> Option<TransactionReceipt> {
        match self {
            Outcome::Succeeded(receipt) => Some(receipt),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Succeeded(_))
    }
}

/// State carried through one invocation
struct Invocation {
    label: String,
    account: Address,
    notification: NotificationId,
    contract: Option<Arc<dyn BoundContract>>,
    metadata: Metadata,
    on_error: Option<ErrorHandler>,
    tx_hash: Option<H256>,
    started: Instant,
}

/// Drives single transactions through their lifecycle on one network
pub struct TransactionSender {
    network: NetworkConfig,
    wallet: Arc<dyn WalletSession>,
    provider: Arc<dyn TransactionProvider>,
    notifier: Arc<dyn NotificationSink>,
    reporter: Arc<dyn ReportSink>,
    poller: ReceiptPoller,
    gas_estimator: GasEstimator,
}

impl TransactionSender {
    /// Create a new transaction sender
    pub fn new(
        network: NetworkConfig,
        wallet: Arc<dyn WalletSession>,
        provider: Arc<dyn TransactionProvider>,
        notifier: Arc<dyn NotificationSink>,
        reporter: Arc<dyn ReportSink>,
        poller: ReceiptPoller,
    ) -> Self {
        let gas_estimator = GasEstimator::new(network.gas.clone());
        Self {
            network,
            wallet,
            provider,
            notifier,
            reporter,
            poller,
            gas_estimator,
        }
    }

    pub fn network(&self) -> &NetworkConfig {
        &self.network
    }

    /// Submit a transaction and wait for its receipt
    ///
    /// Returns the receipt on success and `None` for every other outcome.
    /// The only error is a failure of the caller's completion callback.
    pub async fn submit_transaction(
        &self,
        request: TransactionRequest,
        label: &str,
        options: TransactionOptions,
    ) -> TxResult<Option<TransactionReceipt>> {
        Ok(self.execute(request, label, options).await?.into_receipt())
    }

    /// Submit a transaction and report which terminal state it reached
    pub async fn execute(
        &self,
        request: TransactionRequest,
        label: &str,
        options: TransactionOptions,
    ) -> TxResult<Outcome> {
        let Some(account) = self.wallet.active_account() else {
            debug!("No active wallet, skipping {}", label);
            return Ok(Outcome::NoSigner);
        };

        let span = info_span!(
            "transaction",
            label = %label,
            network = %self.network.name,
            account = ?account
        );
        self.run(request, label, account, options)
            .instrument(span)
            .await
    }

    async fn run(
        &self,
        request: TransactionRequest,
        label: &str,
        account: Address,
        options: TransactionOptions,
    ) -> TxResult<Outcome> {
        let TransactionOptions {
            on_complete,
            on_error,
            metadata: extra_metadata,
        } = options;

        let mut metadata = request.metadata().clone();
        metadata.extend(extra_metadata);

        let notification = self
            .notifier
            .create(Notification::pending(format!("{}: confirm in your wallet", label)));

        let mut invocation = Invocation {
            label: label.to_string(),
            account,
            notification,
            contract: request.contract(),
            metadata,
            on_error,
            tx_hash: None,
            started: Instant::now(),
        };

        let tx_hash = match self.submit(request).await {
            Ok(tx_hash) => tx_hash,
            Err((stage, raw)) => {
                let reported = self.fail(&mut invocation, stage, raw, None).await;
                return Ok(if reported {
                    Outcome::Failed(stage)
                } else {
                    Outcome::Denied(stage)
                });
            }
        };

        invocation.tx_hash = Some(tx_hash);
        crate::metrics::record_tx_submitted(&self.network.name);
        info!("Transaction submitted: {:?}", tx_hash);

        let explorer_link = self.network.explorer_tx_url(tx_hash);
        self.notifier.update(
            invocation.notification,
            Notification::pending(format!("{}: transaction pending", label))
                .with_link(explorer_link.clone())
                .auto_close(self.network.base_timeout().saturating_add(self.poller.window())),
        );

        match self
            .poller
            .wait_for_receipt(self.provider.as_ref(), tx_hash)
            .await
        {
            Some(receipt) if receipt_reverted(&receipt) => {
                let raw = RawError::message("Transaction reverted");
                self.fail(&mut invocation, ErrorStage::Reverted, raw, Some(receipt.clone()))
                    .await;
                Ok(Outcome::Reverted(receipt))
            }
            Some(receipt) => {
                if let Some(callback) = on_complete {
                    callback(receipt.clone()).await.map_err(TxError::Callback)?;
                }

                let context = self.report_context(&invocation, None);
                if let Err(e) = self.reporter.report_success(&receipt, &context).await {
                    warn!("Failed to report success for {:?}: {}", tx_hash, e);
                }

                self.notifier.update(
                    invocation.notification,
                    Notification::success(format!("{}: transaction confirmed", label))
                        .with_link(explorer_link)
                        .auto_close(RESULT_DISPLAY),
                );

                let latency = invocation.started.elapsed().as_secs_f64();
                crate::metrics::record_tx_confirmed(&self.network.name, latency);
                info!("Transaction confirmed: {:?} ({:.1}s)", tx_hash, latency);
                Ok(Outcome::Succeeded(receipt))
            }
            None => {
                self.notifier.update(
                    invocation.notification,
                    Notification::warning(format!(
                        "{}: still waiting for confirmation, check the explorer",
                        label
                    ))
                    .with_link(explorer_link),
                );
                crate::metrics::record_tx_timed_out(&self.network.name);
                warn!("Gave up waiting for {:?}", tx_hash);
                Ok(Outcome::TimedOut(tx_hash))
            }
        }
    }

    /// Estimate gas and broadcast, tagging failures with their stage
    async fn submit(&self, request: TransactionRequest) -> Result<H256, (ErrorStage, RawError)> {
        match request {
            TransactionRequest::MethodCall {
                contract,
                method,
                params,
                gas_override,
                ..
            } => {
                let gas_limit = self
                    .gas_estimator
                    .estimate_call(contract.as_ref(), &method, &params, gas_override)
                    .await
                    .map_err(|raw| (ErrorStage::GasEstimate, raw))?;

                debug!("Calling {} with gas limit {}", method, gas_limit);
                contract
                    .call(&method, &params, gas_limit)
                    .await
                    .map_err(|raw| (ErrorStage::Wallet, raw))
            }
            TransactionRequest::Raw { mut tx, .. } => {
                let gas_limit = self
                    .gas_estimator
                    .estimate_raw(self.provider.as_ref(), &tx)
                    .await
                    .map_err(|raw| (ErrorStage::GasEstimate, raw))?;

                debug!("Sending raw transaction with gas limit {}", gas_limit);
                tx.set_gas(gas_limit);
                self.provider
                    .send_transaction(tx)
                    .await
                    .map_err(|raw| (ErrorStage::Wallet, raw))
            }
        }
    }

    /// Classify, report and notify a failure
    ///
    /// Returns `false` when the failure was dismissed without a message.
    async fn fail(
        &self,
        invocation: &mut Invocation,
        stage: ErrorStage,
        raw: RawError,
        receipt: Option<TransactionReceipt>,
    ) -> bool {
        let classified = classify(&raw, invocation.contract.as_deref());

        let reported = match classified.display_message(stage) {
            None => {
                debug!(
                    "Dismissing {} failure ({:?}) without a message",
                    stage, classified.reason
                );
                self.notifier.close(invocation.notification);
                crate::metrics::record_tx_denied(&self.network.name);
                false
            }
            Some(message) => {
                error!(
                    stage = %stage,
                    reason = ?classified.reason,
                    code = ?classified.code,
                    decoded = ?classified.decoded_error_name,
                    "{} failed: {}",
                    invocation.label,
                    raw
                );

                let context = self.report_context(invocation, Some(stage));
                if let Err(e) = self.reporter.report_error(&classified, &context).await {
                    warn!("Failed to report {} failure: {}", stage, e);
                }

                let mut notification = Notification::error(message).auto_close(RESULT_DISPLAY);
                if let Some(tx_hash) = invocation.tx_hash {
                    notification = notification.with_link(self.network.explorer_tx_url(tx_hash));
                }
                self.notifier.update(invocation.notification, notification);

                crate::metrics::record_tx_failed(&self.network.name, stage);
                true
            }
        };

        if let Some(handler) = invocation.on_error.take() {
            handler(FailureEvent {
                error: classified,
                stage,
                raw,
                receipt,
            });
        }

        reported
    }

    fn report_context(&self, invocation: &Invocation, stage: Option<ErrorStage>) -> ReportContext {
        ReportContext {
            report_id: Uuid::new_v4(),
            label: invocation.label.clone(),
            network: self.network.name.clone(),
            chain_id: self.network.chain_id,
            account: invocation.account,
            tx_hash: invocation.tx_hash,
            stage,
            metadata: invocation.metadata.clone(),
            timestamp: Utc::now(),
        }
    }
}
