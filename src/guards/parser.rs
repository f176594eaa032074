//! Guard Parser - projects a raw [`GuardSet`] onto a wallet.
//!
//! Reads that fail (mint decimals, mint-limit counters) degrade to defaults
//! and a warning; parsing itself never fails.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::chain::{mint_limit_counter_address, ChainClient, MintCounter};
use crate::guards::types::{
    AssetRequirement, GuardGroup, GuardSet, GuardSetting, MintLimitState, NftRequirement,
    PaymentRequirement, SolAmount, StartTime, TokenRequirement,
};
use crate::sdk::{CandyMachine, MerkleVerifier};
use crate::types::{Pubkey, WalletSnapshot};

/// Inputs shared by every guard set parsed during one refresh.
#[derive(Debug, Clone, Copy)]
pub struct ParseContext<'a> {
    pub candy_machine: &'a CandyMachine,
    pub wallet: &'a Pubkey,
    pub snapshot: &'a WalletSnapshot,
    /// Allow-list addresses for the group being parsed, if configured
    pub allow_list: Option<&'a [Pubkey]>,
    pub now: DateTime<Utc>,
}

impl<'a> ParseContext<'a> {
    /// Same context with a different allow-list.
    pub fn with_allow_list(self, allow_list: Option<&'a [Pubkey]>) -> Self {
        Self { allow_list, ..self }
    }
}

pub struct GuardParser {
    chain: Arc<dyn ChainClient>,
    merkle: Arc<dyn MerkleVerifier>,
}

impl GuardParser {
    pub fn new(chain: Arc<dyn ChainClient>, merkle: Arc<dyn MerkleVerifier>) -> Self {
        Self { chain, merkle }
    }

    /// Normalizes `guards` for the wallet in `ctx`.
    #[instrument(skip_all, fields(guards = guards.len(), wallet = %ctx.wallet))]
    pub async fn parse(&self, guards: &GuardSet, ctx: &ParseContext<'_>) -> GuardGroup {
        let mut group = GuardGroup::default();

        for setting in guards.iter() {
            match setting {
                GuardSetting::StartDate { date } => {
                    let start = timestamp(*date);
                    group.start_time = Some(if start <= ctx.now {
                        StartTime::Started
                    } else {
                        StartTime::At(start)
                    });
                }
                GuardSetting::EndDate { date } => {
                    group.end_time = Some(timestamp(*date));
                }
                GuardSetting::SolPayment { lamports, .. } => {
                    group.payment = Some(PaymentRequirement::Sol(SolAmount {
                        lamports: *lamports,
                    }));
                }
                GuardSetting::TokenPayment { amount, mint, .. } => {
                    let token = self.token_requirement(mint, *amount, ctx).await;
                    group.payment = Some(PaymentRequirement::Token(token));
                }
                GuardSetting::NftPayment {
                    required_collection,
                    ..
                } => {
                    group.payment = Some(PaymentRequirement::Nfts(nft_requirement(
                        required_collection,
                        ctx.snapshot,
                    )));
                }
                GuardSetting::TokenBurn { amount, mint } => {
                    let token = self.token_requirement(mint, *amount, ctx).await;
                    group.burn = Some(AssetRequirement::Token(token));
                }
                GuardSetting::NftBurn {
                    required_collection,
                } => {
                    group.burn = Some(AssetRequirement::Nfts(nft_requirement(
                        required_collection,
                        ctx.snapshot,
                    )));
                }
                GuardSetting::TokenGate { amount, mint } => {
                    let token = self.token_requirement(mint, *amount, ctx).await;
                    group.gate = Some(AssetRequirement::Token(token));
                }
                GuardSetting::NftGate {
                    required_collection,
                } => {
                    group.gate = Some(AssetRequirement::Nfts(nft_requirement(
                        required_collection,
                        ctx.snapshot,
                    )));
                }
                GuardSetting::MintLimit { id, limit } => {
                    group.mint_limit = Some(self.mint_limit(*id, *limit, ctx).await);
                }
                GuardSetting::RedeemedAmount { maximum } => {
                    group.redeem_limit = Some(*maximum);
                }
                GuardSetting::AddressGate { address } => {
                    admit(group.allowed.get_or_insert_with(Vec::new), *address);
                }
                GuardSetting::AllowList { merkle_root } => {
                    group.allow_list_root = Some(*merkle_root);
                    let verified = self.verify_allow_list(merkle_root, ctx);
                    // Adds to any address-gate entries
                    let allowed = group.allowed.get_or_insert_with(Vec::new);
                    if verified {
                        admit(allowed, *ctx.wallet);
                    }
                }
                GuardSetting::Gatekeeper { network, .. } => {
                    group.gatekeeper_network = Some(*network);
                }
            }
        }

        group
    }

    async fn token_requirement(
        &self,
        mint: &Pubkey,
        amount: u64,
        ctx: &ParseContext<'_>,
    ) -> TokenRequirement {
        let decimals = match ctx.snapshot.token(mint) {
            Some(holding) => holding.decimals,
            None => match self.chain.get_mint_decimals(mint).await {
                Ok(decimals) => decimals,
                Err(e) => {
                    warn!("Failed to read decimals of {}, assuming 0: {}", mint, e);
                    0
                }
            },
        };

        TokenRequirement {
            mint: *mint,
            amount,
            decimals,
        }
    }

    async fn mint_limit(&self, id: u8, limit: u16, ctx: &ParseContext<'_>) -> MintLimitState {
        let counter_address = mint_limit_counter_address(
            id,
            ctx.wallet,
            &ctx.candy_machine.candy_guard,
            &ctx.candy_machine.address,
        );

        let counter = match self.chain.get_account_data(&counter_address).await {
            Ok(Some(data)) => match MintCounter::from_account_data(&data) {
                Ok(counter) => Some(counter),
                Err(e) => {
                    warn!("Invalid mint counter {}: {}", counter_address, e);
                    None
                }
            },
            Ok(None) => {
                debug!("No mint counter at {} yet", counter_address);
                None
            }
            Err(e) => {
                warn!("Failed to read mint counter {}: {}", counter_address, e);
                None
            }
        };

        MintLimitState {
            id,
            limit,
            counter_address,
            counter,
        }
    }

    fn verify_allow_list(&self, root: &[u8; 32], ctx: &ParseContext<'_>) -> bool {
        let Some(leaves) = ctx.allow_list else {
            debug!("Allow-list guard without a configured address list");
            return false;
        };
        if !leaves.contains(ctx.wallet) {
            return false;
        }
        match self.merkle.proof(leaves, ctx.wallet) {
            Some(proof) => self.merkle.verify(root, ctx.wallet, &proof),
            None => false,
        }
    }
}

fn admit(allowed: &mut Vec<Pubkey>, address: Pubkey) {
    if !allowed.contains(&address) {
        allowed.push(address);
    }
}

fn nft_requirement(collection: &Pubkey, snapshot: &WalletSnapshot) -> NftRequirement {
    NftRequirement {
        required_collection: *collection,
        matching: snapshot.nfts_in_collection(collection),
    }
}

fn timestamp(seconds: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(seconds, 0).unwrap_or_else(|| {
        warn!("Guard date {} out of range", seconds);
        DateTime::<Utc>::MAX_UTC
    })
}
