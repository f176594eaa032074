//! Mint submission.

use anyhow::{Context, Result};
use futures::future::{join_all, try_join_all};
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;
use std::sync::atomic::Ordering;
use tracing::{error, info, instrument, warn};

use crate::errors::{MintFailure, StorefrontError};
use crate::guards::MintGroup;
use crate::sdk::MintArgs;
use crate::storefront::Storefront;
use crate::types::Pubkey;

/// A request to mint `quantity` items from one group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MintRequest {
    pub quantity: u32,
    /// `None` uses the configured default group label, then the default group
    pub group_label: Option<String>,
    /// Per-item guard arguments, either empty or one per item
    pub args: Vec<MintArgs>,
}

impl MintRequest {
    pub fn new(quantity: u32) -> Self {
        Self {
            quantity,
            ..Default::default()
        }
    }

    pub fn in_group(mut self, label: impl Into<String>) -> Self {
        self.group_label = Some(label.into());
        self
    }

    pub fn with_args(mut self, args: Vec<MintArgs>) -> Self {
        self.args = args;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintedItem {
    pub nft_mint: Pubkey,
    pub signature: Signature,
}

/// Result of a mint request; some items may succeed while others fail.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MintOutcome {
    pub minted: Vec<MintedItem>,
    pub failures: Vec<MintFailure>,
}

impl MintOutcome {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn is_partial(&self) -> bool {
        !self.minted.is_empty() && !self.failures.is_empty()
    }
}

impl Storefront {
    /// Mints `request.quantity` items, one transaction each.
    ///
    /// Request errors ([`StorefrontError`]) are returned before any network
    /// call. Once transactions are submitted, each failure is classified into
    /// the outcome instead of failing the whole request.
    #[instrument(skip(self, request), fields(quantity = request.quantity, group = ?request.group_label))]
    pub async fn mint(&self, request: MintRequest) -> Result<MintOutcome> {
        if request.quantity == 0 {
            return Err(StorefrontError::ZeroQuantity.into());
        }
        let quantity = request.quantity as usize;
        if !request.args.is_empty() && request.args.len() != quantity {
            return Err(StorefrontError::MintArgsMismatch {
                expected: quantity,
                actual: request.args.len(),
            }
            .into());
        }

        let snapshot = self.snapshot().await.ok_or(StorefrontError::NotLoaded)?;
        let label = self.group_label(request.group_label.as_deref());
        let group = snapshot.group(label)?;

        let allowed = snapshot.max_mint_quantity(group, self.config.max_mint_quantity);
        if request.quantity > allowed {
            return Err(StorefrontError::QuantityExceedsLimit {
                requested: request.quantity,
                allowed,
            }
            .into());
        }
        if !group.states.can_mint() {
            warn!(
                "Minting from {} although it is blocked: {:?}",
                group.display_label(),
                group.states.blocking_reasons()
            );
        }

        let payer = self.wallet.pubkey();
        let args = self.item_args(&request, group, label, &payer);
        let prepared = try_join_all(args.iter().map(|item_args| {
            self.sdk
                .build_mint(&snapshot.candy_machine, &payer, label, item_args)
        }))
        .await
        .context("Failed to build mint transactions")?;

        let blockhash = self.chain.get_latest_blockhash().await?;
        let mut transactions = Vec::with_capacity(prepared.len());
        let mut nft_mints = Vec::with_capacity(prepared.len());
        for mint in prepared {
            let mut transaction = Transaction::new_with_payer(&mint.instructions, Some(&payer));
            transaction
                .try_partial_sign(&mint.signers, blockhash)
                .context("Failed to sign mint transaction")?;
            transactions.push(transaction);
            nft_mints.push(mint.nft_mint);
        }

        let signed = self
            .wallet
            .sign_all_transactions(transactions)
            .await
            .context("Wallet did not sign the mint transactions")?;

        let results = join_all(signed.iter().map(|tx| self.chain.send_and_confirm(tx))).await;
        let confirmed_at = self.generation.load(Ordering::SeqCst);

        let mut outcome = MintOutcome::default();
        for (nft_mint, result) in nft_mints.into_iter().zip(results) {
            match result {
                Ok(signature) => {
                    info!("Minted {} in {}", nft_mint, signature);
                    outcome.minted.push(MintedItem { nft_mint, signature });
                }
                Err(e) => {
                    let failure = MintFailure::classify(&e);
                    error!("Mint of {} failed: {:#}", nft_mint, e);
                    outcome.failures.push(failure);
                }
            }
        }

        if !outcome.minted.is_empty() {
            let minted = outcome.minted.len() as u32;
            self.publish_minted(label, minted, confirmed_at).await;
        }

        info!(
            "Mint finished: {} succeeded, {} failed",
            outcome.minted.len(),
            outcome.failures.len()
        );
        Ok(outcome)
    }

    /// Arguments of every item, with the allow-list proof filled in when the
    /// group needs one and the caller did not supply it.
    fn item_args(
        &self,
        request: &MintRequest,
        group: &MintGroup,
        label: Option<&str>,
        payer: &Pubkey,
    ) -> Vec<MintArgs> {
        let proof = group.guards.allow_list_root.and_then(|_| {
            self.allow_lists
                .for_group(label)
                .and_then(|leaves| self.merkle.proof(leaves, payer))
        });

        (0..request.quantity as usize)
            .map(|i| {
                let mut args = request.args.get(i).cloned().unwrap_or_default();
                if args.allow_list_proof.is_none() {
                    args.allow_list_proof = proof.clone();
                }
                args
            })
            .collect()
    }
}
