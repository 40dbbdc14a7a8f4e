//! Result/error classification
//!
//! Normalizes the heterogeneous failure sources of a submission (preflight
//! simulation rejection, on-chain revert, RPC transport failure, signer
//! mismatch) into [`EngineError`]. Program failures are recognized by
//! scanning execution logs for known substrings; the logs attached to the
//! error are filtered down to the lines that carry a failure marker.

use crate::errors::{EngineError, ProgramFailure};
use solana_client::client_error::{ClientError, ClientErrorKind};
use solana_client::rpc_request::{RpcError, RpcResponseErrorData};
use solana_sdk::signer::SignerError;

/// Substrings that mark a log line as relevant to a failure
const FAILURE_MARKERS: &[&str] = &[
    "failed",
    "error",
    "Error",
    "exceeded",
    "insufficient",
    "Insufficient",
];

const COMPUTE_BUDGET_MARKERS: &[&str] = &[
    "exceeded CUs meter",
    "Computational budget exceeded",
    "ComputationalBudgetExceeded",
];

// Program error codes 6002/6003 (TooMuchSolRequired/TooLittleSolReceived)
const SLIPPAGE_MARKERS: &[&str] = &[
    "TooMuchSolRequired",
    "TooLittleSolReceived",
    "custom program error: 0x1772",
    "custom program error: 0x1773",
    "Custom(6002)",
    "Custom(6003)",
];

// Program error code 6005
const CURVE_COMPLETE_MARKERS: &[&str] = &[
    "BondingCurveComplete",
    "custom program error: 0x1775",
    "Custom(6005)",
];

const INSUFFICIENT_FUNDS_MARKERS: &[&str] = &[
    "insufficient lamports",
    "insufficient funds",
    "InsufficientFunds",
    "InsufficientFundsForFee",
];

const BLOCKHASH_EXPIRED_MARKERS: &[&str] = &["BlockhashNotFound", "Blockhash not found"];

/// Lines of `logs` that contain a failure marker
pub fn failure_lines(logs: &[String]) -> Vec<String> {
    logs.iter()
        .filter(|line| FAILURE_MARKERS.iter().any(|m| line.contains(m)))
        .cloned()
        .collect()
}

fn mentions(haystack: &[&str], markers: &[&str]) -> bool {
    haystack
        .iter()
        .any(|text| markers.iter().any(|m| text.contains(m)))
}

/// Parse `custom program error: 0x1771` or `Custom(6001)`
fn custom_code(text: &str) -> Option<u32> {
    if let Some(idx) = text.find("custom program error: 0x") {
        let hex: String = text[idx + "custom program error: 0x".len()..]
            .chars()
            .take_while(|c| c.is_ascii_hexdigit())
            .collect();
        return u32::from_str_radix(&hex, 16).ok();
    }
    if let Some(idx) = text.find("Custom(") {
        let digits: String = text[idx + "Custom(".len()..]
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        return digits.parse().ok();
    }
    None
}

/// Revert reason from execution logs and the raw error text
pub fn classify_program_failure(logs: &[String], raw: &str) -> ProgramFailure {
    let mut haystack: Vec<&str> = logs.iter().map(String::as_str).collect();
    haystack.push(raw);

    if mentions(&haystack, COMPUTE_BUDGET_MARKERS) {
        ProgramFailure::ComputeBudgetExceeded
    } else if mentions(&haystack, SLIPPAGE_MARKERS) {
        ProgramFailure::SlippageExceeded
    } else if mentions(&haystack, CURVE_COMPLETE_MARKERS) {
        ProgramFailure::CurveCompleted
    } else if mentions(&haystack, INSUFFICIENT_FUNDS_MARKERS) {
        ProgramFailure::InsufficientFunds
    } else if let Some(code) = haystack.iter().find_map(|text| custom_code(text)) {
        ProgramFailure::Custom(code)
    } else {
        ProgramFailure::Reverted(raw.to_string())
    }
}

/// Classify a failed execution
///
/// An expired block reference is a network condition, not a revert.
pub fn classify_execution_failure(logs: &[String], raw: &str) -> EngineError {
    if BLOCKHASH_EXPIRED_MARKERS.iter().any(|m| raw.contains(m)) {
        return EngineError::expired(raw.to_string());
    }
    EngineError::Program {
        reason: classify_program_failure(logs, raw),
        logs: failure_lines(logs),
    }
}

/// Classify an RPC client error from submission or polling
pub fn classify_client_error(err: &ClientError) -> EngineError {
    match err.kind() {
        ClientErrorKind::RpcError(RpcError::RpcResponseError {
            message,
            data: RpcResponseErrorData::SendTransactionPreflightFailure(simulation),
            ..
        }) => {
            let logs = simulation.logs.clone().unwrap_or_default();
            let raw = simulation
                .err
                .as_ref()
                .map(|e| format!("{:?}", e))
                .unwrap_or_else(|| message.clone());
            classify_execution_failure(&logs, &raw)
        }
        ClientErrorKind::TransactionError(tx_err) => {
            classify_execution_failure(&[], &format!("{:?}", tx_err))
        }
        ClientErrorKind::Reqwest(e) if e.is_timeout() => EngineError::timeout(e.to_string()),
        ClientErrorKind::Reqwest(e) => EngineError::transport(e.to_string()),
        ClientErrorKind::Io(e) => EngineError::transport(e.to_string()),
        _ => {
            let message = err.to_string();
            if BLOCKHASH_EXPIRED_MARKERS.iter().any(|m| message.contains(m)) {
                EngineError::expired(message)
            } else {
                EngineError::External(message)
            }
        }
    }
}

/// A signer required by the message was not supplied, or refused to sign
pub fn classify_signer_error(err: &SignerError) -> EngineError {
    EngineError::Signing(err.to_string())
}
