//! State Evaluator - pure projection of a [`GuardGroup`] onto eligibility
//! flags.

use chrono::{DateTime, Utc};

use crate::guards::types::{GuardGroup, GuardGroupStates};
use crate::types::{Pubkey, WalletSnapshot};

/// Live values the guards are checked against.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationContext<'a> {
    pub snapshot: &'a WalletSnapshot,
    /// Total items minted from the candy machine
    pub items_minted: u64,
    pub wallet: &'a Pubkey,
    pub now: DateTime<Utc>,
}

/// Evaluates every guard independently. Absent guards leave their flag at the
/// permissive default.
pub fn evaluate(guards: &GuardGroup, ctx: &EvaluationContext<'_>) -> GuardGroupStates {
    let is_started = guards
        .start_time
        .map(|start| start.has_started(ctx.now))
        .unwrap_or(true);

    let is_ended = guards.end_time.map(|end| end <= ctx.now).unwrap_or(false);

    let is_payment_available = guards
        .payment
        .as_ref()
        .map_or(true, |p| p.is_satisfied(ctx.snapshot))
        && guards
            .burn
            .as_ref()
            .map_or(true, |b| b.is_satisfied(ctx.snapshot))
        && guards
            .gate
            .as_ref()
            .map_or(true, |g| g.is_satisfied(ctx.snapshot));

    let mint_limit_reached = guards
        .mint_limit
        .as_ref()
        .map(|limit| limit.is_reached())
        .unwrap_or(false);
    let redeem_limit_reached = guards
        .redeem_limit
        .map(|maximum| ctx.items_minted >= maximum)
        .unwrap_or(false);

    let is_wallet_whitelisted = guards
        .allowed
        .as_ref()
        .map(|allowed| allowed.contains(ctx.wallet))
        .unwrap_or(true);

    GuardGroupStates {
        is_started,
        is_ended,
        is_payment_available,
        is_limit_reached: mint_limit_reached || redeem_limit_reached,
        is_wallet_whitelisted,
        has_gatekeeper: guards.gatekeeper_network.is_some(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::MintCounter;
    use crate::guards::types::{
        AssetRequirement, MintLimitState, NftRequirement, PaymentRequirement, SolAmount,
        StartTime, TokenRequirement,
    };
    use crate::types::TokenHolding;
    use chrono::Duration;

    fn eval(guards: &GuardGroup, snapshot: &WalletSnapshot, items_minted: u64) -> GuardGroupStates {
        let wallet = Pubkey::new_unique();
        evaluate(
            guards,
            &EvaluationContext {
                snapshot,
                items_minted,
                wallet: &wallet,
                now: Utc::now(),
            },
        )
    }

    fn mint_limit(limit: u16, count: Option<u16>) -> MintLimitState {
        MintLimitState {
            id: 1,
            limit,
            counter_address: Pubkey::new_unique(),
            counter: count.map(|count| MintCounter { count }),
        }
    }

    #[test]
    fn test_empty_group_is_permissive() {
        let states = eval(&GuardGroup::default(), &WalletSnapshot::default(), 0);
        assert_eq!(states, GuardGroupStates::default());
    }

    #[test]
    fn test_time_window() {
        let snapshot = WalletSnapshot::default();
        let now = Utc::now();

        let future = GuardGroup {
            start_time: Some(StartTime::At(now + Duration::hours(1))),
            end_time: Some(now + Duration::hours(2)),
            ..Default::default()
        };
        let states = eval(&future, &snapshot, 0);
        assert!(!states.is_started);
        assert!(!states.is_ended);

        let past = GuardGroup {
            start_time: Some(StartTime::Started),
            end_time: Some(now - Duration::minutes(1)),
            ..Default::default()
        };
        let states = eval(&past, &snapshot, 0);
        assert!(states.is_started);
        assert!(states.is_ended);
    }

    #[test]
    fn test_mint_limit_threshold() {
        let snapshot = WalletSnapshot::default();

        let reached = GuardGroup {
            mint_limit: Some(mint_limit(3, Some(3))),
            ..Default::default()
        };
        assert!(eval(&reached, &snapshot, 0).is_limit_reached);

        let below = GuardGroup {
            mint_limit: Some(mint_limit(3, Some(2))),
            ..Default::default()
        };
        assert!(!eval(&below, &snapshot, 0).is_limit_reached);

        let no_counter = GuardGroup {
            mint_limit: Some(mint_limit(3, None)),
            ..Default::default()
        };
        assert!(!eval(&no_counter, &snapshot, 0).is_limit_reached);
    }

    #[test]
    fn test_limits_contribute_independently() {
        let snapshot = WalletSnapshot::default();
        let group = GuardGroup {
            mint_limit: Some(mint_limit(5, Some(1))),
            redeem_limit: Some(100),
            ..Default::default()
        };

        assert!(!eval(&group, &snapshot, 99).is_limit_reached);
        assert!(eval(&group, &snapshot, 100).is_limit_reached);
    }

    #[test]
    fn test_sol_payment_threshold() {
        let group = GuardGroup {
            payment: Some(PaymentRequirement::Sol(SolAmount { lamports: 100 })),
            ..Default::default()
        };

        let poor = WalletSnapshot::new(99, vec![], vec![]);
        assert!(!eval(&group, &poor, 0).is_payment_available);

        let exact = WalletSnapshot::new(100, vec![], vec![]);
        assert!(eval(&group, &exact, 0).is_payment_available);
    }

    #[test]
    fn test_payment_burn_and_gate_are_conjunctive() {
        let mint = Pubkey::new_unique();
        let group = GuardGroup {
            payment: Some(PaymentRequirement::Sol(SolAmount { lamports: 10 })),
            burn: Some(AssetRequirement::Token(TokenRequirement {
                mint,
                amount: 5,
                decimals: 0,
            })),
            gate: Some(AssetRequirement::Nfts(NftRequirement {
                required_collection: Pubkey::new_unique(),
                matching: vec![],
            })),
            ..Default::default()
        };
        let snapshot = WalletSnapshot::new(
            1_000,
            vec![TokenHolding { mint, raw_balance: 5, decimals: 0 }],
            vec![],
        );

        // SOL and burn satisfied, empty NFT gate is not
        assert!(!eval(&group, &snapshot, 0).is_payment_available);

        let without_gate = GuardGroup { gate: None, ..group };
        assert!(eval(&without_gate, &snapshot, 0).is_payment_available);
    }

    #[test]
    fn test_whitelist_and_gatekeeper() {
        let wallet = Pubkey::new_unique();
        let snapshot = WalletSnapshot::default();
        let group = GuardGroup {
            allowed: Some(vec![wallet]),
            gatekeeper_network: Some(Pubkey::new_unique()),
            ..Default::default()
        };
        let mut ctx = EvaluationContext {
            snapshot: &snapshot,
            items_minted: 0,
            wallet: &wallet,
            now: Utc::now(),
        };

        let states = evaluate(&group, &ctx);
        assert!(states.is_wallet_whitelisted);
        assert!(states.has_gatekeeper);
        assert!(states.can_mint());

        let stranger = Pubkey::new_unique();
        ctx.wallet = &stranger;
        assert!(!evaluate(&group, &ctx).is_wallet_whitelisted);
    }
}
