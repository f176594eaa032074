//! Guard Evaluation Engine
//!
//! Turns the candy guard configuration into per-group eligibility:
//! - [`parser`]: raw [`GuardSet`] + wallet snapshot -> normalized [`GuardGroup`]
//! - [`evaluator`]: [`GuardGroup`] -> [`GuardGroupStates`]
//! - [`resolver`]: default guards + group overrides -> [`ResolvedGroups`]
//! - [`pricing`]: display prices and quantity limits of a [`MintGroup`]

pub mod evaluator;
pub mod parser;
pub mod pricing;
pub mod resolver;
pub mod types;

pub use evaluator::{evaluate, EvaluationContext};
pub use parser::{GuardParser, ParseContext};
pub use pricing::{
    estimated_total_cost, headline_price, max_mint_quantity, parse_prices, ParsedPrices,
    PaymentRequired, PriceKind, ACCOUNT_CREATION_FEE_SOL, DEFAULT_MAX_MINT_QUANTITY,
};
pub use resolver::{
    resolve_default, resolve_groups, shallow_merge, GroupInputs, GroupPhase, ResolvedGroups,
};
pub use types::{
    AssetRequirement, BlockingReason, CandyGuardConfig, GroupConfig, GuardGroup,
    GuardGroupStates, GuardKind, GuardSet, GuardSetting, MintGroup, MintLimitState,
    NftRequirement, PaymentRequirement, SolAmount, StartTime, TokenRequirement,
};
