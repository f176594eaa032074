//! Immutable storefront snapshots and the values derived from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::StorefrontError;
use crate::guards::{
    evaluate, max_mint_quantity, parse_prices, EvaluationContext, GroupPhase, GuardGroup,
    GuardGroupStates, MintGroup, ParsedPrices, ResolvedGroups,
};
use crate::sdk::CandyMachine;
use crate::types::{Pubkey, WalletSnapshot};

/// Supply counters of the candy machine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemCounts {
    pub available: u64,
    pub remaining: u64,
    pub redeemed: u64,
}

impl ItemCounts {
    pub fn of(candy_machine: &CandyMachine) -> Self {
        Self {
            available: candy_machine.items_available,
            remaining: candy_machine.items_remaining(),
            redeemed: candy_machine.items_minted,
        }
    }
}

/// Everything the storefront knows after one refresh.
#[derive(Debug, Clone)]
pub struct StorefrontSnapshot {
    /// Refresh that produced this snapshot
    pub generation: u64,
    pub wallet: Pubkey,
    pub wallet_snapshot: WalletSnapshot,
    pub candy_machine: CandyMachine,
    pub items: ItemCounts,
    pub groups: ResolvedGroups,
    pub fetched_at: DateTime<Utc>,
}

impl StorefrontSnapshot {
    pub fn default_guards(&self) -> &GuardGroup {
        &self.groups.default_group().guards
    }

    pub fn default_states(&self) -> GuardGroupStates {
        self.groups.default_group().states
    }

    pub fn group(&self, label: Option<&str>) -> Result<&MintGroup, StorefrontError> {
        self.groups.find(label)
    }

    pub fn is_sold_out(&self) -> bool {
        self.items.remaining == 0
    }

    pub fn phase(&self, group: &MintGroup) -> GroupPhase {
        GroupPhase::of(group, self.items.remaining)
    }

    pub fn prices(&self, group: &MintGroup) -> ParsedPrices {
        parse_prices(group)
    }

    pub fn max_mint_quantity(&self, group: &MintGroup, cap: u32) -> u32 {
        max_mint_quantity(group, self.items.redeemed, self.items.remaining, cap)
    }

    /// Snapshot after `minted` successful mints from `group`, before the next
    /// refresh confirms them.
    ///
    /// Supply counters and every mint-limit sharing the group's counter are
    /// advanced, then all states are evaluated again.
    pub fn with_minted(&self, group: &MintGroup, minted: u32, now: DateTime<Utc>) -> Self {
        let counter = group
            .guards
            .mint_limit
            .as_ref()
            .map(|limit| limit.counter_address);
        let recorded = u16::try_from(minted).unwrap_or(u16::MAX);

        let mut candy_machine = self.candy_machine.clone();
        candy_machine.items_minted = candy_machine.items_minted.saturating_add(u64::from(minted));
        let items_minted = candy_machine.items_minted;

        let ctx = EvaluationContext {
            snapshot: &self.wallet_snapshot,
            items_minted,
            wallet: &self.wallet,
            now,
        };
        let groups = self.groups.clone().map(|mut resolved| {
            if let Some(limit) = resolved.guards.mint_limit.as_mut() {
                if Some(limit.counter_address) == counter {
                    limit.record_mints(recorded);
                }
            }
            resolved.states = evaluate(&resolved.guards, &ctx);
            resolved
        });

        Self {
            generation: self.generation,
            wallet: self.wallet,
            wallet_snapshot: self.wallet_snapshot.clone(),
            items: ItemCounts::of(&candy_machine),
            candy_machine,
            groups,
            fetched_at: self.fetched_at,
        }
    }
}
