//! txflow - submit EVM transactions from a wallet session
//!
//! Estimates and clamps gas, submits either a raw transaction or a contract
//! method call, polls for the receipt, and classifies failures into reasons a
//! user can act on. Outcomes go to a notification sink and a report sink.

pub mod chain;
pub mod config;
pub mod error;
pub mod metrics;
pub mod notify;
pub mod report;
pub mod tx;

pub use error::{TxError, TxResult};
pub use tx::{Outcome, TransactionOptions, TransactionRequest, TransactionSender};
