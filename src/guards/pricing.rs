//! Display prices and mint quantity limits derived from a resolved group.

use serde::{Deserialize, Serialize};

use crate::guards::types::{AssetRequirement, MintGroup, PaymentRequirement, TokenRequirement};
use crate::types::{b58_option, Pubkey, SOL_DECIMALS};

/// Quantity cap applied by the storefront regardless of guards.
pub const DEFAULT_MAX_MINT_QUANTITY: u32 = 10;

/// Approximate SOL cost of the accounts created by each mint.
pub const ACCOUNT_CREATION_FEE_SOL: f64 = 0.012;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PriceKind {
    Free,
    Sol,
    Token,
    Nft,
}

/// One requirement expressed for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequired {
    /// "SOL", the token mint address, or "Nft"
    pub label: String,
    pub price: f64,
    #[serde(with = "b58_option", default)]
    pub mint: Option<Pubkey>,
    pub decimals: Option<u8>,
    pub kind: PriceKind,
}

impl PaymentRequired {
    pub fn free() -> Self {
        Self {
            label: String::new(),
            price: 0.0,
            mint: None,
            decimals: None,
            kind: PriceKind::Free,
        }
    }

    fn sol(lamports: u64) -> Self {
        Self {
            label: "SOL".to_string(),
            price: crate::types::to_ui_amount(lamports, SOL_DECIMALS),
            mint: None,
            decimals: Some(SOL_DECIMALS),
            kind: PriceKind::Sol,
        }
    }

    fn token(token: &TokenRequirement) -> Self {
        Self {
            label: token.mint.to_string(),
            price: token.ui_amount(),
            mint: Some(token.mint),
            decimals: Some(token.decimals),
            kind: PriceKind::Token,
        }
    }

    fn nft() -> Self {
        Self {
            label: "Nft".to_string(),
            price: 1.0,
            mint: None,
            decimals: None,
            kind: PriceKind::Nft,
        }
    }

    fn asset(asset: &AssetRequirement) -> Self {
        match asset {
            AssetRequirement::Token(token) => Self::token(token),
            AssetRequirement::Nfts(_) => Self::nft(),
        }
    }
}

/// Display form of a group's payment, burn and gate requirements.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedPrices {
    pub payment: Option<PaymentRequired>,
    pub burn: Option<PaymentRequired>,
    pub gate: Option<PaymentRequired>,
}

pub fn parse_prices(group: &MintGroup) -> ParsedPrices {
    let guards = &group.guards;
    ParsedPrices {
        payment: guards.payment.as_ref().map(|payment| match payment {
            PaymentRequirement::Sol(sol) => PaymentRequired::sol(sol.lamports),
            PaymentRequirement::Token(token) => PaymentRequired::token(token),
            PaymentRequirement::Nfts(_) => PaymentRequired::nft(),
        }),
        burn: guards.burn.as_ref().map(PaymentRequired::asset),
        gate: guards.gate.as_ref().map(PaymentRequired::asset),
    }
}

/// The single price shown on the mint button: the payment, or free.
pub fn headline_price(group: &MintGroup) -> PaymentRequired {
    parse_prices(group)
        .payment
        .unwrap_or_else(PaymentRequired::free)
}

/// Most items one mint request may ask for in `group` right now.
pub fn max_mint_quantity(group: &MintGroup, items_minted: u64, items_remaining: u64, cap: u32) -> u32 {
    let mut allowed = u64::from(cap).min(items_remaining);

    if let Some(limit) = &group.guards.mint_limit {
        allowed = allowed.min(u64::from(limit.remaining()));
    }
    if let Some(maximum) = group.guards.redeem_limit {
        allowed = allowed.min(maximum.saturating_sub(items_minted));
    }

    // Bounded by `cap`, which is a u32
    allowed as u32
}

/// Total shown before minting, rounded to three decimals.
pub fn estimated_total_cost(price: f64, quantity: u32, fee: f64) -> f64 {
    (f64::from(quantity) * (price + fee) * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::MintCounter;
    use crate::guards::types::{
        GuardGroup, GuardGroupStates, MintLimitState, NftRequirement, SolAmount,
    };

    fn group(guards: GuardGroup) -> MintGroup {
        MintGroup {
            label: Some("Public".to_string()),
            guards,
            states: GuardGroupStates::default(),
        }
    }

    #[test]
    fn test_sol_and_token_prices() {
        let sol = group(GuardGroup {
            payment: Some(PaymentRequirement::Sol(SolAmount { lamports: 1_500_000_000 })),
            ..Default::default()
        });
        let price = headline_price(&sol);
        assert_eq!(price.label, "SOL");
        assert_eq!(price.price, 1.5);

        let mint = Pubkey::new_unique();
        let token = group(GuardGroup {
            payment: Some(PaymentRequirement::Token(TokenRequirement {
                mint,
                amount: 2_500,
                decimals: 2,
            })),
            burn: Some(AssetRequirement::Nfts(NftRequirement {
                required_collection: Pubkey::new_unique(),
                matching: vec![],
            })),
            ..Default::default()
        });
        let prices = parse_prices(&token);
        let payment = prices.payment.unwrap();
        assert_eq!(payment.label, mint.to_string());
        assert_eq!(payment.price, 25.0);
        assert_eq!(prices.burn.unwrap().label, "Nft");
        assert!(prices.gate.is_none());
    }

    #[test]
    fn test_free_mint() {
        let price = headline_price(&group(GuardGroup::default()));
        assert_eq!(price.kind, PriceKind::Free);
        assert_eq!(price.price, 0.0);
        assert_eq!(price.label, "");
    }

    #[test]
    fn test_quantity_clamped_by_every_limit() {
        let limited = group(GuardGroup {
            mint_limit: Some(MintLimitState {
                id: 1,
                limit: 5,
                counter_address: Pubkey::new_unique(),
                counter: Some(MintCounter { count: 3 }),
            }),
            ..Default::default()
        });
        assert_eq!(max_mint_quantity(&limited, 0, 100, DEFAULT_MAX_MINT_QUANTITY), 2);
        assert_eq!(max_mint_quantity(&limited, 0, 1, DEFAULT_MAX_MINT_QUANTITY), 1);

        let redeemed = group(GuardGroup {
            redeem_limit: Some(50),
            ..Default::default()
        });
        assert_eq!(max_mint_quantity(&redeemed, 47, 100, DEFAULT_MAX_MINT_QUANTITY), 3);
        assert_eq!(max_mint_quantity(&redeemed, 60, 100, DEFAULT_MAX_MINT_QUANTITY), 0);

        let open = group(GuardGroup::default());
        assert_eq!(max_mint_quantity(&open, 0, 1_000, DEFAULT_MAX_MINT_QUANTITY), 10);
    }

    #[test]
    fn test_estimated_cost() {
        assert_eq!(estimated_total_cost(0.5, 3, ACCOUNT_CREATION_FEE_SOL), 1.536);
        assert_eq!(estimated_total_cost(0.1, 1, ACCOUNT_CREATION_FEE_SOL), 0.112);
    }
}
