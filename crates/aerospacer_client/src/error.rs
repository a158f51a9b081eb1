//! Error taxonomy for the client adapter
//!
//! - [`EncodeError`]: a payload disagrees with its own length law. Fatal, never
//!   retried.
//! - [`DecodeError`]: an on-chain record does not have the expected layout.
//! - [`FetchError`]: the ledger could not be read at all.
//! - [`ProgramRejection`]: the program refused a simulated or submitted
//!   transaction; [`RejectionKind`] decides whether a retry can help.

use solana_client::client_error::ClientError;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("{operation}: encoded {actual} bytes, expected {expected}")]
    LengthMismatch {
        operation: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("{field} length {len} does not fit a u32 prefix")]
    TooLong { field: &'static str, len: usize },

    #[error("{operation} does not take {trailing}")]
    UnexpectedTrailing {
        operation: &'static str,
        trailing: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("{record} data too short: {len} < {min}")]
    TooShort {
        record: &'static str,
        len: usize,
        min: usize,
    },

    #[error("{record} discriminator mismatch")]
    Discriminator { record: &'static str },

    #[error("{record} denom is not valid UTF-8")]
    InvalidDenom { record: &'static str },

    #[error("invalid token account: {0}")]
    TokenAccount(String),
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("RPC request failed: {0}")]
    Rpc(#[from] ClientError),

    #[error("account {address} not found")]
    AccountNotFound { address: String },

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// How a program rejection should be handled by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionKind {
    /// Neighbor hints no longer match the program's view of the order
    StaleProof,
    InsufficientLiquidity,
    BelowMinimum,
    RatioViolation,
    Other,
}

impl RejectionKind {
    /// Map a program error name to a kind
    pub fn from_code(code: &str) -> Self {
        match code {
            "InvalidList" => Self::StaleProof,
            "NotEnoughLiquidityForRedeem" => Self::InsufficientLiquidity,
            "CollateralBelowMinimum" | "LoanAmountBelowMinimum" => Self::BelowMinimum,
            "InvalidCollateralRatio" | "InsufficientCollateral" => Self::RatioViolation,
            _ => Self::Other,
        }
    }

    /// Only a stale proof can succeed on a second attempt with fresh data
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::StaleProof)
    }
}

impl fmt::Display for RejectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::StaleProof => "stale neighbor proof",
            Self::InsufficientLiquidity => "insufficient liquidity",
            Self::BelowMinimum => "below minimum",
            Self::RatioViolation => "collateral ratio violation",
            Self::Other => "program error",
        };
        f.write_str(s)
    }
}

/// A rejection reported by the protocol program, kept verbatim
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ProgramRejection {
    pub kind: RejectionKind,
    pub code: Option<String>,
    pub message: String,
}

impl ProgramRejection {
    /// Extract the first program error from transaction logs
    ///
    /// Recognises the log line the program framework emits on failure:
    /// `... Error Code: InvalidList. Error Number: 6003. Error Message: ...`
    pub fn from_logs(logs: &[String]) -> Option<Self> {
        logs.iter().find_map(|line| {
            let code_start = line.find("Error Code: ")? + "Error Code: ".len();
            let rest = &line[code_start..];
            let code_end = rest.find('.').unwrap_or(rest.len());
            let code = rest[..code_end].trim().to_string();

            let message = match line.find("Error Message: ") {
                Some(idx) => line[idx + "Error Message: ".len()..]
                    .trim()
                    .trim_end_matches('.')
                    .to_string(),
                None => code.clone(),
            };

            Some(Self {
                kind: RejectionKind::from_code(&code),
                code: Some(code),
                message,
            })
        })
    }

    /// Fallback when logs carry no program error line
    pub fn unclassified(message: impl Into<String>) -> Self {
        Self {
            kind: RejectionKind::Other,
            code: None,
            message: message.into(),
        }
    }
}
