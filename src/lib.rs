//! candy-storefront - guard evaluation engine for a Solana candy machine
//! storefront.
//!
//! The crate reads a candy guard configuration, projects it onto a connected
//! wallet, and reports per-group mint eligibility, prices and limits. Mint
//! submission is delegated to SDK, wallet and RPC collaborators.

pub mod chain;
pub mod config;
pub mod errors;
pub mod guards;
pub mod sdk;
pub mod storefront;
pub mod types;

// Re-export main types for convenience
pub use config::{StorefrontBuilder, StorefrontConfig};
pub use errors::{MintFailure, StorefrontError};
pub use guards::{GuardGroup, GuardGroupStates, MintGroup};
pub use storefront::{MintOutcome, MintRequest, Storefront, StorefrontSnapshot};
pub use types::WalletSnapshot;
