//! Storefront - the state container around the guard engine.
//!
//! A single [`Storefront::refresh`] entry point fetches the wallet and candy
//! machine, runs the parser, evaluator and resolver, and publishes a new
//! immutable [`StorefrontSnapshot`]. Refreshes are stamped with a generation
//! number so a slow refresh never overwrites a newer one.

pub mod mint;
pub mod state;

use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::chain::ChainClient;
use crate::config::{AllowLists, StorefrontConfig};
use crate::guards::{
    resolve_default, resolve_groups, EvaluationContext, GroupInputs, GuardParser, ParseContext,
};
use crate::sdk::{CandyMachineSdk, MerkleVerifier, WalletAdapter};
use crate::types::{Pubkey, WalletSnapshot};

pub use mint::{MintOutcome, MintRequest, MintedItem};
pub use state::{ItemCounts, StorefrontSnapshot};

/// External capabilities the storefront drives.
#[derive(Clone)]
pub struct Collaborators {
    pub chain: Arc<dyn ChainClient>,
    pub sdk: Arc<dyn CandyMachineSdk>,
    pub wallet: Arc<dyn WalletAdapter>,
    pub merkle: Arc<dyn MerkleVerifier>,
}

pub struct Storefront {
    config: StorefrontConfig,
    candy_machine_id: Pubkey,
    allow_lists: AllowLists,
    chain: Arc<dyn ChainClient>,
    sdk: Arc<dyn CandyMachineSdk>,
    wallet: Arc<dyn WalletAdapter>,
    merkle: Arc<dyn MerkleVerifier>,
    parser: GuardParser,
    /// Last generation handed out to a refresh
    generation: AtomicU64,
    published: RwLock<Option<Arc<StorefrontSnapshot>>>,
}

impl Storefront {
    pub fn new(
        config: StorefrontConfig,
        allow_lists: AllowLists,
        collaborators: Collaborators,
    ) -> Result<Self> {
        let candy_machine_id = config.candy_machine()?;
        let Collaborators {
            chain,
            sdk,
            wallet,
            merkle,
        } = collaborators;

        Ok(Self {
            parser: GuardParser::new(chain.clone(), merkle.clone()),
            config,
            candy_machine_id,
            allow_lists,
            chain,
            sdk,
            wallet,
            merkle,
            generation: AtomicU64::new(0),
            published: RwLock::new(None),
        })
    }

    pub fn config(&self) -> &StorefrontConfig {
        &self.config
    }

    pub fn candy_machine_id(&self) -> Pubkey {
        self.candy_machine_id
    }

    pub fn wallet(&self) -> Pubkey {
        self.wallet.pubkey()
    }

    /// Latest published snapshot, `None` before the first refresh completes.
    pub async fn snapshot(&self) -> Option<Arc<StorefrontSnapshot>> {
        self.published.read().await.clone()
    }

    /// Group label used when the caller does not name one.
    pub fn group_label<'a>(&'a self, requested: Option<&'a str>) -> Option<&'a str> {
        requested.or(self.config.default_group_label.as_deref())
    }

    /// Re-reads all state and publishes a new snapshot.
    ///
    /// Returns the snapshot that is current once this refresh is done, which
    /// is a newer one when a later refresh finished first.
    #[instrument(skip(self), fields(candy_machine = %self.candy_machine_id))]
    pub async fn refresh(&self) -> Result<Arc<StorefrontSnapshot>> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let wallet = self.wallet.pubkey();

        let (wallet_snapshot, candy_machine) = tokio::join!(
            self.fetch_wallet_snapshot(&wallet),
            self.sdk.fetch_candy_machine(&self.candy_machine_id)
        );
        let candy_machine = candy_machine.context("Failed to fetch candy machine")?;

        let now = Utc::now();
        let inputs = GroupInputs {
            config: &candy_machine.guard_config,
            allow_lists: &self.allow_lists,
            parse: ParseContext {
                candy_machine: &candy_machine,
                wallet: &wallet,
                snapshot: &wallet_snapshot,
                allow_list: None,
                now,
            },
            evaluation: EvaluationContext {
                snapshot: &wallet_snapshot,
                items_minted: candy_machine.items_minted,
                wallet: &wallet,
                now,
            },
        };
        let default_group = resolve_default(&self.parser, &inputs).await;
        let groups = resolve_groups(&self.parser, &inputs, default_group).await;

        info!(
            "Refresh {} resolved {} groups, {}/{} items remaining",
            generation,
            groups.len(),
            candy_machine.items_remaining(),
            candy_machine.items_available
        );

        let snapshot = StorefrontSnapshot {
            generation,
            wallet,
            wallet_snapshot,
            items: ItemCounts::of(&candy_machine),
            candy_machine,
            groups,
            fetched_at: now,
        };
        Ok(self.publish(snapshot).await)
    }

    /// Publishes `snapshot` unless a newer generation is already published.
    async fn publish(&self, snapshot: StorefrontSnapshot) -> Arc<StorefrontSnapshot> {
        let mut published = self.published.write().await;

        if let Some(current) = published.as_ref() {
            if current.generation > snapshot.generation {
                debug!(
                    "Discarding stale snapshot {} (published {})",
                    snapshot.generation, current.generation
                );
                return current.clone();
            }
        }

        let snapshot = Arc::new(snapshot);
        *published = Some(snapshot.clone());
        snapshot
    }

    /// Applies `minted` confirmed mints from the group `label` to whatever
    /// snapshot is published now, so concurrent mints accumulate.
    ///
    /// Snapshots of refreshes started after the mints were confirmed
    /// (`confirmed_at` is the last generation handed out at that point)
    /// already include them and are left unchanged.
    pub(crate) async fn publish_minted(&self, label: Option<&str>, minted: u32, confirmed_at: u64) {
        let mut published = self.published.write().await;
        let Some(current) = published.as_ref() else {
            return;
        };
        if current.generation > confirmed_at {
            debug!(
                "Snapshot {} already reflects mints confirmed at {}",
                current.generation, confirmed_at
            );
            return;
        }

        let updated = match current.group(label) {
            Ok(group) => current.with_minted(group, minted, Utc::now()),
            Err(e) => {
                warn!("Cannot record {} mints: {}", minted, e);
                return;
            }
        };
        debug!(
            "Recorded {} optimistic mints on snapshot {}",
            minted, updated.generation
        );
        *published = Some(Arc::new(updated));
    }

    /// Reads balance, tokens and NFTs concurrently. Failed reads are logged
    /// and count as empty.
    async fn fetch_wallet_snapshot(&self, wallet: &Pubkey) -> WalletSnapshot {
        let (balance, (tokens, nfts)) = tokio::join!(
            self.chain.get_balance(wallet),
            self.chain.get_holdings(wallet)
        );

        let sol_balance = balance.unwrap_or_else(|e| {
            warn!("Failed to fetch SOL balance of {}: {:#}", wallet, e);
            0
        });
        let tokens = tokens.unwrap_or_else(|e| {
            warn!("Failed to fetch token holdings of {}: {:#}", wallet, e);
            Vec::new()
        });
        let nfts = nfts.unwrap_or_else(|e| {
            warn!("Failed to fetch NFT holdings of {}: {:#}", wallet, e);
            Vec::new()
        });

        WalletSnapshot::new(sol_balance, tokens, nfts)
    }
}
