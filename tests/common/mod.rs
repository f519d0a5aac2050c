//! In-memory collaborators for driving the sender end to end.

#![allow(dead_code)]

use async_trait::async_trait;
use ethers::abi::Token;
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, TransactionReceipt, H256, U256};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use txflow::chain::{BoundContract, RawError, TransactionProvider, WalletSession};
use txflow::config::{NetworkConfig, NetworkGasConfig, NetworkKind, PollerConfig};
use txflow::notify::{Notification, NotificationId, NotificationSink};
use txflow::report::{ReportContext, ReportSink};
use txflow::tx::{ClassifiedError, Clock, ReceiptPoller};
use txflow::{TransactionSender, TxResult};

pub const MIN_GAS: u64 = 21_000;
pub const MAX_GAS: u64 = 1_000_000;

pub fn network() -> NetworkConfig {
    NetworkConfig {
        name: "arbitrum".to_string(),
        display_name: "Arbitrum One".to_string(),
        chain_id: 42161,
        kind: NetworkKind::Arbitrum,
        rpc_url: "http://localhost:8545".to_string(),
        explorer_url: "https://arbiscan.io".to_string(),
        gas: NetworkGasConfig {
            min_gas: MIN_GAS,
            max_gas: MAX_GAS,
            gas_buffer_multiplier: 1.5,
        },
    }
}

pub fn account() -> Address {
    Address::repeat_byte(0x11)
}

pub fn tx_hash() -> H256 {
    H256::repeat_byte(0xab)
}

pub fn receipt(status: u64) -> TransactionReceipt {
    TransactionReceipt {
        transaction_hash: tx_hash(),
        status: Some(status.into()),
        block_number: Some(100u64.into()),
        ..Default::default()
    }
}

pub struct FakeWallet(pub Option<Address>);

impl WalletSession for FakeWallet {
    fn active_account(&self) -> Option<Address> {
        self.0
    }
}

/// Provider with scripted results
pub struct FakeProvider {
    pub estimate: Mutex<Result<U256, RawError>>,
    pub send: Mutex<Result<H256, RawError>>,
    /// Popped one per receipt lookup; empty means "not mined yet"
    pub receipts: Mutex<VecDeque<Result<Option<TransactionReceipt>, RawError>>>,
    pub sent: Mutex<Vec<TypedTransaction>>,
    pub estimate_calls: Mutex<usize>,
    pub receipt_calls: Mutex<usize>,
}

impl Default for FakeProvider {
    fn default() -> Self {
        Self {
            estimate: Mutex::new(Ok(U256::from(100_000))),
            send: Mutex::new(Ok(tx_hash())),
            receipts: Mutex::new(VecDeque::new()),
            sent: Mutex::new(Vec::new()),
            estimate_calls: Mutex::new(0),
            receipt_calls: Mutex::new(0),
        }
    }
}

impl FakeProvider {
    pub fn with_receipts(
        receipts: impl IntoIterator<Item = Result<Option<TransactionReceipt>, RawError>>,
    ) -> Self {
        let provider = Self::default();
        provider.receipts.lock().unwrap().extend(receipts);
        provider
    }

    pub fn total_calls(&self) -> usize {
        *self.estimate_calls.lock().unwrap()
            + *self.receipt_calls.lock().unwrap()
            + self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl TransactionProvider for FakeProvider {
    async fn estimate_gas(&self, _tx: &TypedTransaction) -> Result<U256, RawError> {
        *self.estimate_calls.lock().unwrap() += 1;
        self.estimate.lock().unwrap().clone()
    }

    async fn send_transaction(&self, tx: TypedTransaction) -> Result<H256, RawError> {
        self.sent.lock().unwrap().push(tx);
        self.send.lock().unwrap().clone()
    }

    async fn get_transaction_receipt(
        &self,
        _tx_hash: H256,
    ) -> Result<Option<TransactionReceipt>, RawError> {
        *self.receipt_calls.lock().unwrap() += 1;
        self.receipts.lock().unwrap().pop_front().unwrap_or(Ok(None))
    }
}

/// Contract with scripted results
pub struct FakeContract {
    pub estimate: Mutex<Result<U256, RawError>>,
    pub call: Mutex<Result<H256, RawError>>,
    pub decoded: Option<String>,
    pub estimate_calls: Mutex<usize>,
    pub calls: Mutex<Vec<(String, Vec<Token>, U256)>>,
}

impl Default for FakeContract {
    fn default() -> Self {
        Self {
            estimate: Mutex::new(Ok(U256::from(100_000))),
            call: Mutex::new(Ok(tx_hash())),
            decoded: None,
            estimate_calls: Mutex::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl BoundContract for FakeContract {
    async fn estimate_gas(&self, _method: &str, _params: &[Token]) -> Result<U256, RawError> {
        *self.estimate_calls.lock().unwrap() += 1;
        self.estimate.lock().unwrap().clone()
    }

    async fn call(
        &self,
        method: &str,
        params: &[Token],
        gas_limit: U256,
    ) -> Result<H256, RawError> {
        self.calls
            .lock()
            .unwrap()
            .push((method.to_string(), params.to_vec(), gas_limit));
        self.call.lock().unwrap().clone()
    }

    fn decode_error(&self, _data: &[u8]) -> Option<String> {
        self.decoded.clone()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NotifyEvent {
    Create(NotificationId, Notification),
    Update(NotificationId, Notification),
    Close(NotificationId),
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub events: Mutex<Vec<NotifyEvent>>,
}

impl RecordingNotifier {
    pub fn events(&self) -> Vec<NotifyEvent> {
        self.events.lock().unwrap().clone()
    }

    /// The last state shown, if the notification was not closed
    pub fn last_shown(&self) -> Option<Notification> {
        match self.events().last()? {
            NotifyEvent::Create(_, n) | NotifyEvent::Update(_, n) => Some(n.clone()),
            NotifyEvent::Close(_) => None,
        }
    }

    pub fn creates(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, NotifyEvent::Create(..)))
            .count()
    }
}

impl NotificationSink for RecordingNotifier {
    fn create(&self, notification: Notification) -> NotificationId {
        let id = NotificationId::new();
        self.events
            .lock()
            .unwrap()
            .push(NotifyEvent::Create(id, notification));
        id
    }

    fn update(&self, id: NotificationId, notification: Notification) {
        self.events
            .lock()
            .unwrap()
            .push(NotifyEvent::Update(id, notification));
    }

    fn close(&self, id: NotificationId) {
        self.events.lock().unwrap().push(NotifyEvent::Close(id));
    }
}

#[derive(Default)]
pub struct RecordingReporter {
    pub successes: Mutex<Vec<(TransactionReceipt, ReportContext)>>,
    pub errors: Mutex<Vec<(ClassifiedError, ReportContext)>>,
}

impl RecordingReporter {
    pub fn success_count(&self) -> usize {
        self.successes.lock().unwrap().len()
    }

    pub fn error_count(&self) -> usize {
        self.errors.lock().unwrap().len()
    }
}

#[async_trait]
impl ReportSink for RecordingReporter {
    async fn report_success(
        &self,
        receipt: &TransactionReceipt,
        context: &ReportContext,
    ) -> TxResult<()> {
        self.successes
            .lock()
            .unwrap()
            .push((receipt.clone(), context.clone()));
        Ok(())
    }

    async fn report_error(
        &self,
        error: &ClassifiedError,
        context: &ReportContext,
    ) -> TxResult<()> {
        self.errors
            .lock()
            .unwrap()
            .push((error.clone(), context.clone()));
        Ok(())
    }
}

/// Returns immediately, remembering each requested delay
#[derive(Default)]
pub struct InstantClock {
    pub sleeps: Mutex<Vec<Duration>>,
}

#[async_trait]
impl Clock for InstantClock {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}

pub struct Harness {
    pub provider: Arc<FakeProvider>,
    pub notifier: Arc<RecordingNotifier>,
    pub reporter: Arc<RecordingReporter>,
    pub clock: Arc<InstantClock>,
    pub sender: TransactionSender,
}

impl Harness {
    pub fn new(provider: FakeProvider) -> Self {
        Self::build(provider, Some(account()))
    }

    pub fn without_signer(provider: FakeProvider) -> Self {
        Self::build(provider, None)
    }

    fn build(provider: FakeProvider, account: Option<Address>) -> Self {
        let provider = Arc::new(provider);
        let notifier = Arc::new(RecordingNotifier::default());
        let reporter = Arc::new(RecordingReporter::default());
        let clock = Arc::new(InstantClock::default());
        let poller = ReceiptPoller::new(&PollerConfig::default(), clock.clone());

        let sender = TransactionSender::new(
            network(),
            Arc::new(FakeWallet(account)),
            provider.clone(),
            notifier.clone(),
            reporter.clone(),
            poller,
        );

        Self {
            provider,
            notifier,
            reporter,
            clock,
            sender,
        }
    }
}
