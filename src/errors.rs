//! Error types for the storefront.
//!
//! Two families live here:
//! - [`StorefrontError`]: configuration mismatches detected before any network
//!   call (unknown group label, quantity over the allowed limit, ...)
//! - [`MintFailure`]: the fixed set of user-facing messages a failed mint
//!   transaction is mapped to
//!
//! Data-fetch failures are not represented: they are logged and replaced by
//! empty values where they occur.

use solana_client::client_error::ClientError;
use solana_sdk::instruction::InstructionError;
use solana_sdk::transaction::TransactionError;
use thiserror::Error;

/// Errors raised synchronously before a request reaches the chain.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorefrontError {
    /// No refresh has completed yet
    #[error("Candy Machine not loaded yet!")]
    NotLoaded,

    /// The requested group label is not defined on the candy guard
    #[error("Unknown guard group label: {0}")]
    UnknownGroup(String),

    /// A mint request for zero items
    #[error("Mint quantity must be at least 1")]
    ZeroQuantity,

    /// The request asks for more items than the group currently allows
    #[error("Requested {requested} mints but only {allowed} allowed for this group")]
    QuantityExceedsLimit {
        /// Quantity in the request
        requested: u32,
        /// Maximum quantity for the group right now
        allowed: u32,
    },

    /// Per-item mint arguments do not line up with the quantity
    #[error("Expected {expected} mint argument sets, got {actual}")]
    MintArgsMismatch { expected: usize, actual: usize },
}

/// User-facing classification of a failed mint transaction.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MintFailure {
    #[error("SOLD OUT!")]
    SoldOut,

    #[error("Insufficient funds to mint. Please fund your wallet.")]
    InsufficientFunds,

    #[error("Minting period hasn't started yet.")]
    NotStarted,

    #[error("Transaction Timeout! Please try again.")]
    Timeout,

    #[error("Minting failed! Please try again!")]
    Failed,
}

impl MintFailure {
    /// Candy machine custom error: not enough SOL/tokens for the mint.
    pub const INSUFFICIENT_FUNDS_CODE: u32 = 0x135;
    /// Candy machine custom error: no items left.
    pub const SOLD_OUT_CODE: u32 = 0x137;
    /// Candy machine custom error: mint not live yet.
    pub const NOT_STARTED_CODE: u32 = 0x138;

    /// Maps a custom program error code.
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            Self::SOLD_OUT_CODE => Some(Self::SoldOut),
            Self::NOT_STARTED_CODE => Some(Self::NotStarted),
            Self::INSUFFICIENT_FUNDS_CODE => Some(Self::InsufficientFunds),
            _ => None,
        }
    }

    /// Maps a raw error message, falling back to the generic retry message.
    pub fn from_message(message: &str) -> Self {
        let message = message.to_lowercase();

        if message.trim().is_empty() {
            return Self::Timeout;
        }

        let program_codes = [
            (Self::SOLD_OUT_CODE, Self::SoldOut),
            (Self::NOT_STARTED_CODE, Self::NotStarted),
            (Self::INSUFFICIENT_FUNDS_CODE, Self::InsufficientFunds),
        ];
        for (code, failure) in program_codes {
            if message.contains(&format!("{:#x}", code)) {
                return failure;
            }
        }

        if message.contains("sold out") {
            Self::SoldOut
        } else if message.contains("insufficient") {
            Self::InsufficientFunds
        } else if message.contains("timeout")
            || message.contains("timed out")
            || message.contains("block height exceeded")
        {
            Self::Timeout
        } else {
            Self::Failed
        }
    }

    /// Classifies an error returned by the submission path.
    ///
    /// A custom instruction error carried by an RPC client error wins over
    /// message matching.
    pub fn classify(error: &anyhow::Error) -> Self {
        for cause in error.chain() {
            if let Some(client_error) = cause.downcast_ref::<ClientError>() {
                if let Some(TransactionError::InstructionError(_, InstructionError::Custom(code))) =
                    client_error.get_transaction_error()
                {
                    if let Some(failure) = Self::from_code(code) {
                        return failure;
                    }
                }
            }
        }

        Self::from_message(&format!("{:#}", error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_program_codes() {
        assert_eq!(MintFailure::from_code(311), Some(MintFailure::SoldOut));
        assert_eq!(MintFailure::from_code(312), Some(MintFailure::NotStarted));
        assert_eq!(MintFailure::from_code(309), Some(MintFailure::InsufficientFunds));
        assert_eq!(MintFailure::from_code(6000), None);
    }

    #[test]
    fn test_message_classification() {
        let sold_out = anyhow!("Transaction simulation failed: custom program error: 0x137");
        assert_eq!(MintFailure::classify(&sold_out), MintFailure::SoldOut);

        let funds = anyhow!("custom program error: 0x135");
        assert_eq!(MintFailure::classify(&funds), MintFailure::InsufficientFunds);

        let not_live = anyhow!("custom program error: 0x138").context("Failed to send mint");
        assert_eq!(MintFailure::classify(&not_live), MintFailure::NotStarted);

        let timeout = anyhow!("unable to confirm transaction: block height exceeded");
        assert_eq!(MintFailure::classify(&timeout), MintFailure::Timeout);

        let other = anyhow!("custom program error: 0x1");
        assert_eq!(MintFailure::classify(&other), MintFailure::Failed);
    }

    #[test]
    fn test_user_messages() {
        assert_eq!(MintFailure::SoldOut.to_string(), "SOLD OUT!");
        assert_eq!(MintFailure::Failed.to_string(), "Minting failed! Please try again!");
        assert_eq!(
            StorefrontError::UnknownGroup("VIP".into()).to_string(),
            "Unknown guard group label: VIP"
        );
    }
}
