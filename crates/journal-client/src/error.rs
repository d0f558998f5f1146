//! Error types for journal client operations

use anchor_lang::prelude::Pubkey;
use thiserror::Error;

use crate::query::MutationKey;

/// Main error type for the journal client.
///
/// Every remote failure is surfaced to the caller as one of these; nothing is retried. The
/// `is_*` helpers group variants into validation, not-found, authorization and transport.
#[derive(Error, Debug)]
pub enum JournalError {
    /// Input rejected before (or instead of) a remote call
    #[error("invalid {field}: {reason}")]
    Validation {
        /// Offending input
        field: &'static str,
        /// Why it was rejected
        reason: String,
    },

    #[error("journal entry {0} does not exist")]
    NotFound(Pubkey),

    #[error("journal entry {0} already exists")]
    AlreadyExists(Pubkey),

    #[error("{signer} is not allowed to modify journal entry {address}")]
    Unauthorized { address: Pubkey, signer: Pubkey },

    /// Any other program-side rejection (size limits, unknown instruction)
    #[error("program rejected the transaction: {0}")]
    Rejected(String),

    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("wallet not connected")]
    WalletDisconnected,

    #[error("{0} already in flight")]
    MutationInFlight(MutationKey),

    #[error("account {address} could not be decoded: {reason}")]
    Decode { address: Pubkey, reason: String },

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}

impl JournalError {
    pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation { field, reason: reason.into() }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_authorization(&self) -> bool {
        matches!(self, Self::Unauthorized { .. } | Self::WalletDisconnected)
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Rpc { .. } | Self::Http(_))
    }
}

/// Result type alias for journal client operations
pub type Result<T> = std::result::Result<T, JournalError>;
