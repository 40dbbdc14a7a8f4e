//! Error taxonomy for the engine
//!
//! Every public operation returns [`EngineError`] on failure. The taxonomy is
//! closed: each failure source (account decoding, pricing, relay, ledger,
//! program execution, caller input, metadata gateway) maps to exactly one
//! variant, and the variant carries a kind that callers can match on without
//! parsing messages.
//!
//! Errors are `Clone + PartialEq` so they can be stored inside a
//! [`TransactionOutcome`](crate::tx_builder::TransactionOutcome) and asserted
//! on directly in tests.

use thiserror::Error;

/// Reasons a raw account or event buffer could not be decoded
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeErrorKind {
    /// Discriminator mismatch, short buffer, or out-of-range field
    #[error("malformed account")]
    MalformedAccount,

    /// A `Program data:` payload that is not a known event
    #[error("malformed event")]
    MalformedEvent,
}

/// Operations rejected because of the market's on-chain state
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidStateKind {
    /// The bonding curve migrated; buy/sell are no longer valid
    #[error("bonding curve completed")]
    Completed,

    /// The requested account or subscription does not exist
    #[error("not found")]
    NotFound,
}

/// Checked arithmetic failures in the pricing engine
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticKind {
    #[error("underflow")]
    Underflow,

    #[error("overflow")]
    Overflow,

    /// Zero reserves on both sides of the curve
    #[error("division by zero")]
    DivisionByZero,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayErrorKind {
    /// The relay answered with a non-empty `error` field
    #[error("bundle rejected")]
    BundleRejected,

    /// The relay could not be reached or answered with garbage
    #[error("relay unreachable")]
    Unreachable,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkErrorKind {
    /// A bounded wait ran out before the ledger answered
    #[error("timeout")]
    Timeout,

    /// The block reference used for signing expired before confirmation
    #[error("block reference expired")]
    Expired,

    /// Connection-level failure talking to the ledger node
    #[error("transport")]
    Transport,
}

/// Failure modes of the metadata upload gateway
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayErrorKind {
    #[error("HTTP status {0}")]
    Status(u16),

    #[error("malformed JSON")]
    MalformedJson,

    #[error("empty body")]
    EmptyBody,

    #[error("transport")]
    Transport,
}

/// Program-level revert reason extracted from execution logs
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProgramFailure {
    #[error("compute budget exceeded")]
    ComputeBudgetExceeded,

    /// `TooMuchSolRequired` / `TooLittleSolReceived`
    #[error("slippage tolerance exceeded")]
    SlippageExceeded,

    #[error("insufficient funds")]
    InsufficientFunds,

    #[error("bonding curve complete")]
    CurveCompleted,

    #[error("custom program error {0}")]
    Custom(u32),

    /// Anything the log scan did not recognize
    #[error("reverted: {0}")]
    Reverted(String),
}

/// Comprehensive error type for all engine operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// On-chain bytes did not match the expected layout
    #[error("Decode error ({kind}): {detail}")]
    Decode { kind: DecodeErrorKind, detail: String },

    /// Market state forbids the operation
    #[error("Invalid state: {0}")]
    InvalidState(InvalidStateKind),

    /// Pricing math left the u64 domain
    #[error("Arithmetic error: {0}")]
    Arithmetic(ArithmeticKind),

    /// Relay refused or could not take the bundle
    ///
    /// A relay error always means zero on-chain effect for the bundle.
    #[error("Relay error ({kind}): {message}")]
    Relay { kind: RelayErrorKind, message: String },

    /// Ledger communication or confirmation failure
    #[error("Network error ({kind}): {message}")]
    Network { kind: NetworkErrorKind, message: String },

    /// The transaction executed and the program reverted
    ///
    /// `logs` holds only the lines containing failure markers.
    #[error("Program error: {reason}")]
    Program {
        reason: ProgramFailure,
        logs: Vec<String>,
    },

    /// Bad caller input, caught before any I/O
    #[error("Validation error: {0}")]
    Validation(String),

    /// Metadata gateway failure
    #[error("Gateway error ({kind}): {message}")]
    Gateway {
        kind: GatewayErrorKind,
        message: String,
    },

    /// A required signer was missing or signing failed
    #[error("Signing failed: {0}")]
    Signing(String),

    /// Unrecognized failure, original message preserved
    #[error("External error: {0}")]
    External(String),
}

impl EngineError {
    /// Check if this error is potentially retryable
    ///
    /// Nothing in the engine retries automatically. This only tells callers
    /// whether re-planning the same request with a fresh block reference
    /// could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network { .. } => true,
            Self::Relay { .. } => true,
            Self::Gateway { kind, .. } => matches!(
                kind,
                GatewayErrorKind::Transport | GatewayErrorKind::Status(500..=599)
            ),
            Self::Program { reason, .. } => {
                matches!(reason, ProgramFailure::ComputeBudgetExceeded | ProgramFailure::SlippageExceeded)
            }

            Self::Decode { .. } => false,
            Self::InvalidState(_) => false,
            Self::Arithmetic(_) => false,
            Self::Validation(_) => false,
            Self::Signing(_) => false,
            Self::External(_) => false,
        }
    }

    /// Get the error category for metrics and observability
    pub fn category(&self) -> &'static str {
        match self {
            Self::Decode { .. } => "decode",
            Self::InvalidState(_) => "invalid_state",
            Self::Arithmetic(_) => "arithmetic",
            Self::Relay { .. } => "relay",
            Self::Network { .. } => "network",
            Self::Program { .. } => "program",
            Self::Validation(_) => "validation",
            Self::Gateway { .. } => "gateway",
            Self::Signing(_) => "signing",
            Self::External(_) => "external",
        }
    }
}

// Convenience constructors for common error scenarios
impl EngineError {
    pub fn malformed_account(detail: impl Into<String>) -> Self {
        Self::Decode {
            kind: DecodeErrorKind::MalformedAccount,
            detail: detail.into(),
        }
    }

    pub fn malformed_event(detail: impl Into<String>) -> Self {
        Self::Decode {
            kind: DecodeErrorKind::MalformedEvent,
            detail: detail.into(),
        }
    }

    pub fn completed() -> Self {
        Self::InvalidState(InvalidStateKind::Completed)
    }

    pub fn not_found() -> Self {
        Self::InvalidState(InvalidStateKind::NotFound)
    }

    pub fn underflow() -> Self {
        Self::Arithmetic(ArithmeticKind::Underflow)
    }

    pub fn overflow() -> Self {
        Self::Arithmetic(ArithmeticKind::Overflow)
    }

    pub fn bundle_rejected(message: impl Into<String>) -> Self {
        Self::Relay {
            kind: RelayErrorKind::BundleRejected,
            message: message.into(),
        }
    }

    pub fn relay_unreachable(message: impl Into<String>) -> Self {
        Self::Relay {
            kind: RelayErrorKind::Unreachable,
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Network {
            kind: NetworkErrorKind::Timeout,
            message: message.into(),
        }
    }

    pub fn expired(message: impl Into<String>) -> Self {
        Self::Network {
            kind: NetworkErrorKind::Expired,
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Network {
            kind: NetworkErrorKind::Transport,
            message: message.into(),
        }
    }

    pub fn gateway(kind: GatewayErrorKind, message: impl Into<String>) -> Self {
        Self::Gateway {
            kind,
            message: message.into(),
        }
    }

    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation(reason.into())
    }
}
