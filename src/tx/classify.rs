//! Failure classification
//!
//! Wallets, providers and nodes report failures in many shapes. The
//! classifier digs the code, message and revert data out of the envelope and
//! matches them against a fixed, ordered table of known reasons.

use crate::chain::{BoundContract, RawError};

use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Phase of the lifecycle a failure happened in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorStage {
    GasEstimate,
    Wallet,
    Reverted,
}

impl ErrorStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorStage::GasEstimate => "gas_estimate",
            ErrorStage::Wallet => "wallet",
            ErrorStage::Reverted => "reverted",
        }
    }

    /// Copy shown when the failure has no known reason
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorStage::Reverted => "Transaction reverted",
            ErrorStage::GasEstimate | ErrorStage::Wallet => "Failed to send transaction",
        }
    }
}

impl fmt::Display for ErrorStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Known failure reasons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FailureReason {
    NotEnoughFunds,
    UserDenied,
    NetworkChanged,
    RpcError,
    TradeSlippage,
}

impl FailureReason {
    /// User-facing copy; `None` means the failure is dismissed silently
    pub fn display_message(&self) -> Option<&'static str> {
        match self {
            FailureReason::UserDenied => None,
            FailureReason::NotEnoughFunds => Some("Not enough funds to pay for gas"),
            FailureReason::NetworkChanged => Some("Network changed, please try again"),
            FailureReason::RpcError => Some("Network request failed, please try again"),
            FailureReason::TradeSlippage => Some("Price moved outside of your slippage bounds"),
        }
    }
}

/// Error code as reported by the wallet or node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ErrorCode {
    Number(i64),
    Text(String),
}

impl ErrorCode {
    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(ErrorCode::Number),
            Value::String(s) => Some(ErrorCode::Text(s.clone())),
            _ => None,
        }
    }
}

/// A failure after classification
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClassifiedError {
    pub code: Option<ErrorCode>,
    pub message: Option<String>,
    pub raw_error_data: Option<Value>,
    pub decoded_error_name: Option<String>,
    pub reason: Option<FailureReason>,
}

impl ClassifiedError {
    /// What to show the user, falling back to the stage default
    pub fn display_message(&self, stage: ErrorStage) -> Option<String> {
        match self.reason {
            Some(reason) => reason.display_message().map(str::to_string),
            None => Some(stage.default_message().to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum CodeMatch {
    Number(i64),
    Text(&'static str),
}

impl CodeMatch {
    fn matches(&self, code: &ErrorCode) -> bool {
        match (self, code) {
            (CodeMatch::Number(want), ErrorCode::Number(got)) => want == got,
            (CodeMatch::Text(want), ErrorCode::Text(got)) => *want == got.as_str(),
            _ => false,
        }
    }
}

/// One rule; matches when any of its set fields matches
#[derive(Debug, Clone, Copy)]
struct Pattern {
    code: Option<CodeMatch>,
    message: Option<&'static str>,
    decoded_name: Option<&'static str>,
}

impl Pattern {
    const fn code(code: i64) -> Self {
        Self {
            code: Some(CodeMatch::Number(code)),
            message: None,
            decoded_name: None,
        }
    }

    const fn code_text(code: &'static str) -> Self {
        Self {
            code: Some(CodeMatch::Text(code)),
            message: None,
            decoded_name: None,
        }
    }

    const fn message(needle: &'static str) -> Self {
        Self {
            code: None,
            message: Some(needle),
            decoded_name: None,
        }
    }

    const fn decoded_name(needle: &'static str) -> Self {
        Self {
            code: None,
            message: None,
            decoded_name: Some(needle),
        }
    }

    fn matches(&self, error: &ClassifiedError) -> bool {
        let code = match (&self.code, &error.code) {
            (Some(want), Some(got)) => want.matches(got),
            _ => false,
        };
        let message = match (self.message, &error.message) {
            (Some(needle), Some(message)) => contains_ignore_case(message, needle),
            _ => false,
        };
        let decoded = match (self.decoded_name, &error.decoded_error_name) {
            (Some(needle), Some(name)) => contains_ignore_case(name, needle),
            _ => false,
        };
        code || message || decoded
    }
}

/// Evaluated top to bottom; the first matching reason wins
const PATTERNS: &[(FailureReason, &[Pattern])] = &[
    (
        FailureReason::TradeSlippage,
        &[Pattern::decoded_name("TotalCostOutsideOfSpecifiedBounds")],
    ),
    (
        FailureReason::UserDenied,
        &[
            Pattern::message("user denied transaction signature"),
            Pattern::message("user rejected transaction"),
            Pattern::message("cannot set properties of undefined (setting 'loadingdefaults')"),
            Pattern::code_text("ACTION_REJECTED"),
            Pattern::code(4001),
        ],
    ),
    (
        FailureReason::NotEnoughFunds,
        &[
            Pattern::message("not enough funds for gas"),
            Pattern::message("failed to execute call with revert code insufficientgasfunds"),
        ],
    ),
    (
        FailureReason::NetworkChanged,
        &[Pattern::message("underlying network changed")],
    ),
    (
        FailureReason::RpcError,
        &[
            Pattern::code(-32005),
            Pattern::message("non-200 status code"),
            Pattern::message("request limit exceeded"),
            Pattern::message("internal json-rpc error"),
            Pattern::message("response has no error or result"),
            Pattern::message("we can't execute this request"),
            Pattern::message("couldn't connect to the network"),
        ],
    ),
];

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// First non-null of `value.<path>` for each candidate path
fn first_present<'a>(value: &'a Value, pointers: &[&str]) -> Option<&'a Value> {
    pointers
        .iter()
        .filter_map(|pointer| value.pointer(pointer))
        .find(|v| !v.is_null())
}

/// Best-effort decode of revert data into a custom error name
fn decode_custom_error(data: &Value, contract: &dyn BoundContract) -> Option<String> {
    let hex_data = data.as_str()?;
    let bytes = hex::decode(hex_data.trim_start_matches("0x")).ok()?;
    contract.decode_error(&bytes)
}

/// Classify a raw failure
pub fn classify(raw: &RawError, contract: Option<&dyn BoundContract>) -> ClassifiedError {
    let root = raw.payload();
    let error = first_present(root, &["/error/error", "/error"]).unwrap_or(root);

    let code = error.get("code").and_then(ErrorCode::from_json);
    let data = first_present(error, &["/data/data", "/data"]).cloned();

    let decoded_error_name = match (&data, contract) {
        (Some(data), Some(contract)) => decode_custom_error(data, contract),
        _ => None,
    };

    let message = match error {
        Value::String(message) => Some(message.clone()),
        _ => error
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string),
    };

    let mut classified = ClassifiedError {
        code,
        message,
        raw_error_data: data,
        decoded_error_name,
        reason: None,
    };

    classified.reason = PATTERNS
        .iter()
        .find(|(_, patterns)| patterns.iter().any(|p| p.matches(&classified)))
        .map(|(reason, _)| *reason);

    classified
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::MockBoundContract;
    use serde_json::json;

    fn classify_json(value: Value) -> ClassifiedError {
        classify(&RawError(value), None)
    }

    #[test]
    fn test_user_rejected_at_any_depth() {
        let inner = json!({"message": "User rejected transaction"});
        let shapes = vec![
            inner.clone(),
            json!({ "error": inner.clone() }),
            json!({ "error": { "error": inner.clone() } }),
        ];

        for shape in shapes {
            let classified = classify_json(shape.clone());
            assert_eq!(
                classified.reason,
                Some(FailureReason::UserDenied),
                "shape {}",
                shape
            );
        }
    }

    #[test]
    fn test_innermost_envelope_wins() {
        let classified = classify_json(json!({
            "message": "outer",
            "error": {
                "message": "middle",
                "error": { "message": "request limit exceeded", "code": -32000 }
            }
        }));
        assert_eq!(classified.message.as_deref(), Some("request limit exceeded"));
        assert_eq!(classified.code, Some(ErrorCode::Number(-32000)));
        assert_eq!(classified.reason, Some(FailureReason::RpcError));
    }

    #[test]
    fn test_codes_are_type_exact() {
        assert_eq!(
            classify_json(json!({"code": "ACTION_REJECTED", "message": "x"})).reason,
            Some(FailureReason::UserDenied)
        );
        assert_eq!(
            classify_json(json!({"code": 4001})).reason,
            Some(FailureReason::UserDenied)
        );
        assert_eq!(classify_json(json!({"code": "4001"})).reason, None);
        assert_eq!(
            classify_json(json!({"code": -32005})).reason,
            Some(FailureReason::RpcError)
        );
    }

    #[test]
    fn test_message_patterns() {
        let cases = [
            ("insufficient funds: not enough funds for gas", FailureReason::NotEnoughFunds),
            (
                "Failed to execute call with revert code InsufficientGasFunds",
                FailureReason::NotEnoughFunds,
            ),
            ("underlying network changed", FailureReason::NetworkChanged),
            ("Internal JSON-RPC error.", FailureReason::RpcError),
            ("We can't execute this request", FailureReason::RpcError),
            (
                "Cannot set properties of undefined (setting 'loadingDefaults')",
                FailureReason::UserDenied,
            ),
        ];
        for (message, reason) in cases {
            assert_eq!(
                classify_json(json!({ "message": message })).reason,
                Some(reason),
                "{}",
                message
            );
        }
    }

    #[test]
    fn test_unknown_failure_has_no_reason() {
        let classified = classify_json(json!({"message": "execution reverted", "code": 3}));
        assert_eq!(classified.reason, None);
        assert_eq!(
            classified.display_message(ErrorStage::Wallet).as_deref(),
            Some("Failed to send transaction")
        );
        assert_eq!(
            classified.display_message(ErrorStage::Reverted).as_deref(),
            Some("Transaction reverted")
        );
    }

    #[test]
    fn test_user_denied_has_no_display_message() {
        let classified = classify_json(json!({"code": 4001}));
        assert_eq!(classified.display_message(ErrorStage::GasEstimate), None);
    }

    #[test]
    fn test_slippage_beats_rpc_error() {
        let mut contract = MockBoundContract::new();
        contract
            .expect_decode_error()
            .returning(|_| Some("TotalCostOutsideOfSpecifiedBounds".to_string()));

        let raw = RawError(json!({
            "code": -32005,
            "message": "execution reverted",
            "data": "0xdeadbeef"
        }));
        let classified = classify(&raw, Some(&contract));
        assert_eq!(classified.reason, Some(FailureReason::TradeSlippage));
        assert_eq!(
            classified.decoded_error_name.as_deref(),
            Some("TotalCostOutsideOfSpecifiedBounds")
        );
    }

    #[test]
    fn test_nested_data_preferred() {
        let mut contract = MockBoundContract::new();
        contract
            .expect_decode_error()
            .withf(|data: &[u8]| data == &[0xca, 0xfe, 0xba, 0xbe][..])
            .times(1)
            .returning(|_| None);

        let raw = RawError(json!({
            "message": "reverted",
            "data": { "data": "0xcafebabe", "message": "ignored" }
        }));
        let classified = classify(&raw, Some(&contract));
        assert_eq!(classified.raw_error_data, Some(json!("0xcafebabe")));
        assert_eq!(classified.decoded_error_name, None);
    }

    #[test]
    fn test_undecodable_data_is_swallowed() {
        let mut contract = MockBoundContract::new();
        contract.expect_decode_error().never();

        let raw = RawError(json!({"message": "reverted", "data": "not hex"}));
        let classified = classify(&raw, Some(&contract));
        assert_eq!(classified.decoded_error_name, None);
        assert_eq!(classified.raw_error_data, Some(json!("not hex")));
        assert_eq!(classified.reason, None);
    }

    #[test]
    fn test_string_envelope_is_message() {
        let classified = classify_json(json!({"error": "Underlying network changed"}));
        assert_eq!(classified.reason, Some(FailureReason::NetworkChanged));
    }
}
