//! [`ChainClient`] over the Solana JSON-RPC API.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use moka::future::Cache;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_request::TokenAccountsFilter;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::chain::accounts::{
    decode_metadata, metadata_address, mint_decimals, parse_token_account, ParsedTokenAccount,
    SPL_TOKEN_PROGRAM_ID,
};
use crate::chain::ChainClient;
use crate::config::StorefrontConfig;
use crate::types::{NftHolding, TokenHolding};

/// Maximum accounts per `getMultipleAccounts` request.
const MULTIPLE_ACCOUNTS_BATCH: usize = 100;
const MAX_CACHED_MINTS: u64 = 1_024;

/// RPC-backed chain client with request throttling.
pub struct RpcChainClient {
    rpc: Arc<RpcClient>,
    rate_limiter: DefaultDirectRateLimiter,
    /// Decimals per mint, kept across refreshes
    decimals_cache: Cache<Pubkey, u8>,
}

impl RpcChainClient {
    /// Create a client for the configured RPC endpoint.
    pub fn new(config: &StorefrontConfig) -> Self {
        let rpc = Arc::new(RpcClient::new_with_timeout_and_commitment(
            config.rpc_url(),
            Duration::from_secs(config.rpc_timeout_seconds),
            CommitmentConfig::confirmed(),
        ));
        Self::with_client(
            rpc,
            config.rate_limit_requests_per_second,
            config.decimals_cache_ttl_seconds,
        )
    }

    /// Wrap an existing RPC client.
    pub fn with_client(
        rpc: Arc<RpcClient>,
        requests_per_second: u32,
        cache_ttl_seconds: u64,
    ) -> Self {
        let quota = Quota::per_second(NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN));
        let decimals_cache = Cache::builder()
            .max_capacity(MAX_CACHED_MINTS)
            .time_to_live(Duration::from_secs(cache_ttl_seconds))
            .build();

        Self {
            rpc,
            rate_limiter: RateLimiter::direct(quota),
            decimals_cache,
        }
    }

    async fn read_mint_decimals(&self, mint: &Pubkey) -> Result<u8> {
        let data = self
            .get_account_data(mint)
            .await?
            .ok_or_else(|| anyhow!("Mint account {} not found", mint))?;
        mint_decimals(&data)
    }

    /// Resolves the collection of every NFT among `accounts`.
    async fn nft_holdings(&self, accounts: &[ParsedTokenAccount]) -> Result<Vec<NftHolding>> {
        let mints: Vec<Pubkey> = accounts
            .iter()
            .filter(|account| account.is_nft())
            .map(|account| account.mint)
            .collect();

        let mut holdings = Vec::with_capacity(mints.len());
        for batch in mints.chunks(MULTIPLE_ACCOUNTS_BATCH) {
            let addresses: Vec<Pubkey> = batch.iter().map(metadata_address).collect();

            self.throttle().await;
            let accounts = self
                .rpc
                .get_multiple_accounts(&addresses)
                .await
                .context("Failed to fetch NFT metadata accounts")?;

            for (mint, account) in batch.iter().zip(accounts) {
                let Some(account) = account else {
                    debug!("No metadata for zero-decimals mint {}", mint);
                    continue;
                };
                match decode_metadata(&account.data) {
                    Ok(summary) => holdings.push(NftHolding {
                        mint: *mint,
                        collection: summary.collection,
                    }),
                    Err(e) => warn!("Failed to decode metadata of {}: {}", mint, e),
                }
            }
        }

        debug!("Fetched {} NFT holdings", holdings.len());
        Ok(holdings)
    }

    async fn throttle(&self) {
        self.rate_limiter.until_ready().await;
    }

    async fn token_accounts(&self, owner: &Pubkey) -> Result<Vec<ParsedTokenAccount>> {
        self.throttle().await;
        let accounts = self
            .rpc
            .get_token_accounts_by_owner(owner, TokenAccountsFilter::ProgramId(SPL_TOKEN_PROGRAM_ID))
            .await
            .context("Failed to fetch token accounts")?;

        let parsed = accounts
            .into_iter()
            .filter_map(|keyed| {
                let data = serde_json::to_value(&keyed.account.data).ok()?;
                match parse_token_account(&data) {
                    Ok(account) => Some(account),
                    Err(e) => {
                        debug!("Skipping token account {}: {}", keyed.pubkey, e);
                        None
                    }
                }
            })
            .collect();

        Ok(parsed)
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    #[instrument(skip(self), fields(owner = %owner))]
    async fn get_balance(&self, owner: &Pubkey) -> Result<u64> {
        self.throttle().await;
        self.rpc
            .get_balance(owner)
            .await
            .context("Failed to fetch wallet balance")
    }

    #[instrument(skip(self), fields(owner = %owner))]
    async fn get_token_holdings(&self, owner: &Pubkey) -> Result<Vec<TokenHolding>> {
        let accounts = self.token_accounts(owner).await?;
        Ok(token_holdings(&accounts))
    }

    #[instrument(skip(self), fields(owner = %owner))]
    async fn get_nft_holdings(&self, owner: &Pubkey) -> Result<Vec<NftHolding>> {
        let accounts = self.token_accounts(owner).await?;
        self.nft_holdings(&accounts).await
    }

    #[instrument(skip(self), fields(owner = %owner))]
    async fn get_holdings(
        &self,
        owner: &Pubkey,
    ) -> (Result<Vec<TokenHolding>>, Result<Vec<NftHolding>>) {
        let accounts = match self.token_accounts(owner).await {
            Ok(accounts) => accounts,
            Err(e) => {
                let nft_error = anyhow!("{:#}", e);
                return (Err(e), Err(nft_error));
            }
        };

        let nfts = self.nft_holdings(&accounts).await;
        (Ok(token_holdings(&accounts)), nfts)
    }

    #[instrument(skip(self), fields(address = %address))]
    async fn get_account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>> {
        self.throttle().await;
        let response = self
            .rpc
            .get_account_with_commitment(address, self.rpc.commitment())
            .await
            .context("Failed to fetch account info")?;

        Ok(response.value.map(|account| account.data))
    }

    #[instrument(skip(self), fields(mint = %mint))]
    async fn get_mint_decimals(&self, mint: &Pubkey) -> Result<u8> {
        self.decimals_cache
            .try_get_with(*mint, self.read_mint_decimals(mint))
            .await
            .map_err(|e| anyhow!("Failed to resolve decimals of {}: {}", mint, e))
    }

    async fn get_latest_blockhash(&self) -> Result<Hash> {
        self.throttle().await;
        self.rpc
            .get_latest_blockhash()
            .await
            .context("Failed to fetch latest blockhash")
    }

    #[instrument(skip(self, transaction))]
    async fn send_and_confirm(&self, transaction: &Transaction) -> Result<Signature> {
        self.throttle().await;
        let signature = self
            .rpc
            .send_and_confirm_transaction(transaction)
            .await
            .context("Failed to send mint transaction")?;

        debug!("Confirmed transaction {}", signature);
        Ok(signature)
    }
}

fn token_holdings(accounts: &[ParsedTokenAccount]) -> Vec<TokenHolding> {
    let holdings: Vec<TokenHolding> = accounts
        .iter()
        .filter(|account| account.amount > 0)
        .map(|account| TokenHolding {
            mint: account.mint,
            raw_balance: account.amount,
            decimals: account.decimals,
        })
        .collect();

    debug!("Fetched {} token holdings", holdings.len());
    holdings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_holdings_skip_empty_accounts() {
        let fungible = Pubkey::new_unique();
        let nft = Pubkey::new_unique();
        let accounts = vec![
            ParsedTokenAccount { mint: fungible, amount: 2_500, decimals: 3 },
            ParsedTokenAccount { mint: Pubkey::new_unique(), amount: 0, decimals: 6 },
            ParsedTokenAccount { mint: nft, amount: 1, decimals: 0 },
        ];

        let holdings = token_holdings(&accounts);

        assert_eq!(holdings.len(), 2);
        assert_eq!(holdings[0].mint, fungible);
        assert_eq!(holdings[0].raw_balance, 2_500);
        assert_eq!(holdings[1].mint, nft);
        assert_eq!(accounts.iter().filter(|a| a.is_nft()).count(), 1);
    }
}
