//! Guard types: the raw candy guard configuration and its normalized,
//! wallet-specific projection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::chain::MintCounter;
use crate::types::{b58, to_ui_amount, NftHolding, Pubkey, WalletSnapshot, SOL_DECIMALS};

/// Discriminant of a [`GuardSetting`].
///
/// The declaration order is the order guards are applied in, so when a set
/// carries several payment kinds the last one (SOL, then token, then NFT) wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GuardKind {
    StartDate,
    EndDate,
    SolPayment,
    TokenPayment,
    NftPayment,
    TokenBurn,
    NftBurn,
    TokenGate,
    NftGate,
    MintLimit,
    RedeemedAmount,
    AddressGate,
    AllowList,
    Gatekeeper,
}

/// One guard as configured on the candy guard account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum GuardSetting {
    /// Unix timestamp (seconds) the mint opens at
    StartDate { date: i64 },
    /// Unix timestamp (seconds) the mint closes at
    EndDate { date: i64 },
    SolPayment {
        lamports: u64,
        #[serde(with = "b58")]
        destination: Pubkey,
    },
    TokenPayment {
        amount: u64,
        #[serde(with = "b58")]
        mint: Pubkey,
        #[serde(with = "b58")]
        destination_ata: Pubkey,
    },
    NftPayment {
        #[serde(with = "b58")]
        required_collection: Pubkey,
        #[serde(with = "b58")]
        destination: Pubkey,
    },
    TokenBurn {
        amount: u64,
        #[serde(with = "b58")]
        mint: Pubkey,
    },
    NftBurn {
        #[serde(with = "b58")]
        required_collection: Pubkey,
    },
    TokenGate {
        amount: u64,
        #[serde(with = "b58")]
        mint: Pubkey,
    },
    NftGate {
        #[serde(with = "b58")]
        required_collection: Pubkey,
    },
    /// Per-wallet cap tracked by the counter PDA of `id`
    MintLimit { id: u8, limit: u16 },
    /// Cap on the total number of items redeemed from the candy machine
    RedeemedAmount { maximum: u64 },
    AddressGate {
        #[serde(with = "b58")]
        address: Pubkey,
    },
    AllowList { merkle_root: [u8; 32] },
    Gatekeeper {
        #[serde(with = "b58")]
        network: Pubkey,
        expire_on_use: bool,
    },
}

impl GuardSetting {
    pub fn kind(&self) -> GuardKind {
        match self {
            Self::StartDate { .. } => GuardKind::StartDate,
            Self::EndDate { .. } => GuardKind::EndDate,
            Self::SolPayment { .. } => GuardKind::SolPayment,
            Self::TokenPayment { .. } => GuardKind::TokenPayment,
            Self::NftPayment { .. } => GuardKind::NftPayment,
            Self::TokenBurn { .. } => GuardKind::TokenBurn,
            Self::NftBurn { .. } => GuardKind::NftBurn,
            Self::TokenGate { .. } => GuardKind::TokenGate,
            Self::NftGate { .. } => GuardKind::NftGate,
            Self::MintLimit { .. } => GuardKind::MintLimit,
            Self::RedeemedAmount { .. } => GuardKind::RedeemedAmount,
            Self::AddressGate { .. } => GuardKind::AddressGate,
            Self::AllowList { .. } => GuardKind::AllowList,
            Self::Gatekeeper { .. } => GuardKind::Gatekeeper,
        }
    }
}

/// Sparse set of guards, at most one per kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<GuardSetting>", into = "Vec<GuardSetting>")]
pub struct GuardSet {
    settings: BTreeMap<GuardKind, GuardSetting>,
}

impl GuardSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a setting, returning the one it replaced.
    pub fn insert(&mut self, setting: GuardSetting) -> Option<GuardSetting> {
        self.settings.insert(setting.kind(), setting)
    }

    /// Builder-style [`GuardSet::insert`].
    pub fn with(mut self, setting: GuardSetting) -> Self {
        self.insert(setting);
        self
    }

    pub fn get(&self, kind: GuardKind) -> Option<&GuardSetting> {
        self.settings.get(&kind)
    }

    pub fn contains(&self, kind: GuardKind) -> bool {
        self.settings.contains_key(&kind)
    }

    /// Settings in application order.
    pub fn iter(&self) -> impl Iterator<Item = &GuardSetting> {
        self.settings.values()
    }

    pub fn len(&self) -> usize {
        self.settings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }
}

impl FromIterator<GuardSetting> for GuardSet {
    fn from_iter<I: IntoIterator<Item = GuardSetting>>(iter: I) -> Self {
        let mut set = Self::new();
        for setting in iter {
            set.insert(setting);
        }
        set
    }
}

impl From<Vec<GuardSetting>> for GuardSet {
    fn from(settings: Vec<GuardSetting>) -> Self {
        settings.into_iter().collect()
    }
}

impl From<GuardSet> for Vec<GuardSetting> {
    fn from(set: GuardSet) -> Self {
        set.settings.into_values().collect()
    }
}

/// A named guard group as configured on the candy guard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupConfig {
    pub label: String,
    #[serde(default)]
    pub guards: GuardSet,
}

/// Complete guard configuration of a candy guard account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandyGuardConfig {
    /// Guards that apply to every group unless overridden
    #[serde(default)]
    pub default_guards: GuardSet,
    /// Named groups in on-chain order
    #[serde(default)]
    pub groups: Vec<GroupConfig>,
}

impl CandyGuardConfig {
    pub fn group(&self, label: &str) -> Option<&GroupConfig> {
        self.groups.iter().find(|g| g.label == label)
    }
}

/// Resolved start-date guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartTime {
    /// The start date is configured and already passed
    Started,
    /// The mint opens at this instant
    At(DateTime<Utc>),
}

impl StartTime {
    pub fn has_started(&self, now: DateTime<Utc>) -> bool {
        match self {
            Self::Started => true,
            Self::At(start) => *start <= now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolAmount {
    pub lamports: u64,
}

impl SolAmount {
    pub fn ui_amount(&self) -> f64 {
        to_ui_amount(self.lamports, SOL_DECIMALS)
    }
}

/// Fungible token amount required by a payment, burn or gate guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenRequirement {
    pub mint: Pubkey,
    /// Amount in base units
    pub amount: u64,
    pub decimals: u8,
}

impl TokenRequirement {
    pub fn ui_amount(&self) -> f64 {
        to_ui_amount(self.amount, self.decimals)
    }
}

/// NFT-collection requirement, resolved against the wallet's holdings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NftRequirement {
    pub required_collection: Pubkey,
    /// Wallet NFTs of the required collection; empty means not eligible
    pub matching: Vec<NftHolding>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PaymentRequirement {
    Sol(SolAmount),
    Token(TokenRequirement),
    Nfts(NftRequirement),
}

impl PaymentRequirement {
    pub fn is_satisfied(&self, snapshot: &WalletSnapshot) -> bool {
        match self {
            Self::Sol(sol) => snapshot.sol_balance >= sol.lamports,
            Self::Token(token) => snapshot.token_balance(&token.mint) >= token.amount,
            Self::Nfts(nfts) => !nfts.matching.is_empty(),
        }
    }
}

/// Burn or gate requirement.
#[derive(Debug, Clone, PartialEq)]
pub enum AssetRequirement {
    Token(TokenRequirement),
    Nfts(NftRequirement),
}

impl AssetRequirement {
    pub fn is_satisfied(&self, snapshot: &WalletSnapshot) -> bool {
        match self {
            Self::Token(token) => snapshot.token_balance(&token.mint) >= token.amount,
            Self::Nfts(nfts) => !nfts.matching.is_empty(),
        }
    }
}

/// Mint-limit guard with the wallet's current counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintLimitState {
    pub id: u8,
    pub limit: u16,
    pub counter_address: Pubkey,
    /// `None` when the counter account does not exist yet
    pub counter: Option<MintCounter>,
}

impl MintLimitState {
    pub fn count(&self) -> u16 {
        self.counter.map(|c| c.count).unwrap_or(0)
    }

    pub fn remaining(&self) -> u16 {
        self.limit.saturating_sub(self.count())
    }

    pub fn is_reached(&self) -> bool {
        self.count() >= self.limit
    }

    /// Records `minted` additional mints locally.
    pub fn record_mints(&mut self, minted: u16) {
        let count = self.count().saturating_add(minted);
        self.counter = Some(MintCounter { count });
    }
}

/// Guards of one group, projected against a wallet.
///
/// Every field is `None` when the corresponding guard is not configured.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GuardGroup {
    pub start_time: Option<StartTime>,
    pub end_time: Option<DateTime<Utc>>,
    pub payment: Option<PaymentRequirement>,
    pub burn: Option<AssetRequirement>,
    pub gate: Option<AssetRequirement>,
    pub mint_limit: Option<MintLimitState>,
    /// Maximum total items redeemed
    pub redeem_limit: Option<u64>,
    /// Addresses allowed to mint; the wallet appears here only if it passes
    pub allowed: Option<Vec<Pubkey>>,
    pub allow_list_root: Option<[u8; 32]>,
    pub gatekeeper_network: Option<Pubkey>,
}

/// Eligibility flags of one group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardGroupStates {
    pub is_started: bool,
    pub is_ended: bool,
    pub is_payment_available: bool,
    pub is_limit_reached: bool,
    pub is_wallet_whitelisted: bool,
    pub has_gatekeeper: bool,
}

impl Default for GuardGroupStates {
    fn default() -> Self {
        Self {
            is_started: true,
            is_ended: false,
            is_payment_available: true,
            is_limit_reached: false,
            is_wallet_whitelisted: true,
            has_gatekeeper: false,
        }
    }
}

impl GuardGroupStates {
    /// Whether the group can be minted from right now.
    ///
    /// A gatekeeper does not block: the wallet is expected to obtain a gateway
    /// token before submitting.
    pub fn can_mint(&self) -> bool {
        self.is_started
            && !self.is_ended
            && self.is_payment_available
            && !self.is_limit_reached
            && self.is_wallet_whitelisted
    }

    pub fn blocking_reasons(&self) -> Vec<BlockingReason> {
        let mut reasons = Vec::new();
        if !self.is_started {
            reasons.push(BlockingReason::NotStarted);
        }
        if self.is_ended {
            reasons.push(BlockingReason::Ended);
        }
        if !self.is_payment_available {
            reasons.push(BlockingReason::InsufficientPayment);
        }
        if self.is_limit_reached {
            reasons.push(BlockingReason::LimitReached);
        }
        if !self.is_wallet_whitelisted {
            reasons.push(BlockingReason::NotWhitelisted);
        }
        reasons
    }
}

/// Why a group cannot be minted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BlockingReason {
    NotStarted,
    Ended,
    InsufficientPayment,
    LimitReached,
    NotWhitelisted,
}

impl fmt::Display for BlockingReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Self::NotStarted => "Minting has not started yet",
            Self::Ended => "Minting has ended",
            Self::InsufficientPayment => "Not enough funds or tokens to mint",
            Self::LimitReached => "Mint limit reached",
            Self::NotWhitelisted => "Wallet is not allowed to mint from this group",
        };
        f.write_str(message)
    }
}

/// A selectable mint group with its resolved guards and states.
#[derive(Debug, Clone, PartialEq)]
pub struct MintGroup {
    /// `None` for the default group
    pub label: Option<String>,
    pub guards: GuardGroup,
    pub states: GuardGroupStates,
}

impl MintGroup {
    pub fn is_default(&self) -> bool {
        self.label.is_none()
    }

    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or("default")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_set_replaces_same_kind() {
        let destination = Pubkey::new_unique();
        let mut set = GuardSet::new().with(GuardSetting::SolPayment { lamports: 1, destination });

        let replaced = set.insert(GuardSetting::SolPayment { lamports: 2, destination });

        assert_eq!(replaced, Some(GuardSetting::SolPayment { lamports: 1, destination }));
        assert_eq!(set.len(), 1);
        assert_eq!(
            set.get(GuardKind::SolPayment),
            Some(&GuardSetting::SolPayment { lamports: 2, destination })
        );
    }

    #[test]
    fn test_guard_config_json() {
        let collection = Pubkey::new_unique();
        let json = serde_json::json!({
            "defaultGuards": [
                { "kind": "startDate", "date": 1_700_000_000 },
                { "kind": "mintLimit", "id": 1, "limit": 3 }
            ],
            "groups": [
                {
                    "label": "OG",
                    "guards": [
                        { "kind": "nftGate", "requiredCollection": collection.to_string() }
                    ]
                }
            ]
        });

        let config: CandyGuardConfig = serde_json::from_value(json).unwrap();

        assert_eq!(config.default_guards.len(), 2);
        assert!(config.default_guards.contains(GuardKind::MintLimit));
        let og = config.group("OG").unwrap();
        assert_eq!(
            og.guards.get(GuardKind::NftGate),
            Some(&GuardSetting::NftGate { required_collection: collection })
        );
        assert!(config.group("Public").is_none());
    }

    #[test]
    fn test_default_states_are_permissive() {
        let states = GuardGroupStates::default();
        assert!(states.can_mint());
        assert!(states.blocking_reasons().is_empty());
    }

    #[test]
    fn test_gatekeeper_does_not_block() {
        let states = GuardGroupStates {
            has_gatekeeper: true,
            ..Default::default()
        };
        assert!(states.can_mint());
    }

    #[test]
    fn test_blocking_reasons() {
        let states = GuardGroupStates {
            is_started: false,
            is_limit_reached: true,
            ..Default::default()
        };

        assert!(!states.can_mint());
        assert_eq!(
            states.blocking_reasons(),
            vec![BlockingReason::NotStarted, BlockingReason::LimitReached]
        );
        assert_eq!(BlockingReason::LimitReached.to_string(), "Mint limit reached");
    }

    #[test]
    fn test_mint_limit_counter() {
        let mut limit = MintLimitState {
            id: 1,
            limit: 3,
            counter_address: Pubkey::new_unique(),
            counter: None,
        };
        assert_eq!(limit.count(), 0);
        assert_eq!(limit.remaining(), 3);

        limit.record_mints(3);
        assert!(limit.is_reached());
        assert_eq!(limit.remaining(), 0);
    }
}
