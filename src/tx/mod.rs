//! Transaction lifecycle: gas estimation, submission, receipt polling and
//! failure classification

mod classify;
mod gas;
mod poller;
mod request;
mod sender;

pub use classify::{classify, ClassifiedError, ErrorCode, ErrorStage, FailureReason};
pub use gas::GasEstimator;
pub use poller::{Clock, ReceiptPoller, TokioClock};
pub use request::{
    CompletionCallback, ErrorHandler, FailureEvent, Metadata, MetadataValue, TransactionOptions,
    TransactionRequest,
};
pub use sender::{Outcome, TransactionSender};
