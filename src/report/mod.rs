//! Analytics reporting of transaction outcomes

use crate::error::{TxError, TxResult};
use crate::tx::{ClassifiedError, ErrorStage, Metadata};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ethers::types::{Address, TransactionReceipt, H256};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

/// Everything known about the invocation being reported
#[derive(Debug, Clone, Serialize)]
pub struct ReportContext {
    pub report_id: Uuid,
    pub label: String,
    pub network: String,
    pub chain_id: u64,
    pub account: Address,
    pub tx_hash: Option<H256>,
    pub stage: Option<ErrorStage>,
    pub metadata: Metadata,
    pub timestamp: DateTime<Utc>,
}

/// Backend that records outcomes
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn report_success(
        &self,
        receipt: &TransactionReceipt,
        context: &ReportContext,
    ) -> TxResult<()>;

    async fn report_error(&self, error: &ClassifiedError, context: &ReportContext)
        -> TxResult<()>;
}

/// Writes reports as structured log events
#[derive(Debug, Default)]
pub struct LogReporter;

#[async_trait]
impl ReportSink for LogReporter {
    async fn report_success(
        &self,
        receipt: &TransactionReceipt,
        context: &ReportContext,
    ) -> TxResult<()> {
        info!(
            report_id = %context.report_id,
            label = %context.label,
            network = %context.network,
            tx_hash = ?receipt.transaction_hash,
            gas_used = ?receipt.gas_used,
            block = ?receipt.block_number,
            "Transaction succeeded"
        );
        Ok(())
    }

    async fn report_error(
        &self,
        error: &ClassifiedError,
        context: &ReportContext,
    ) -> TxResult<()> {
        let payload = serde_json::to_string(error).map_err(|e| TxError::Report(e.to_string()))?;
        info!(
            report_id = %context.report_id,
            label = %context.label,
            network = %context.network,
            stage = ?context.stage,
            reason = ?error.reason,
            tx_hash = ?context.tx_hash,
            error = %payload,
            "Transaction failed"
        );
        Ok(())
    }
}
