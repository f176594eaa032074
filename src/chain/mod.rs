//! Chain module - the RPC collaborator of the storefront.
//!
//! The guard layer only consumes typed results from this module. Everything
//! that touches the network goes through [`ChainClient`] so the engine can be
//! exercised against in-memory fakes.

pub mod accounts;
pub mod rpc;

use anyhow::Result;
use async_trait::async_trait;
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;

use crate::types::{NftHolding, TokenHolding};

pub use accounts::{
    decode_metadata, metadata_address, mint_limit_counter_address, MetadataSummary,
    MintCounter, ParsedTokenAccount, CANDY_GUARD_PROGRAM_ID, SPL_TOKEN_PROGRAM_ID,
    TOKEN_METADATA_PROGRAM_ID,
};
pub use rpc::RpcChainClient;

/// Account and transaction access needed by the storefront.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// SOL balance of `owner` in lamports.
    async fn get_balance(&self, owner: &Pubkey) -> Result<u64>;

    /// Every SPL token account of `owner` with a non-zero balance.
    async fn get_token_holdings(&self, owner: &Pubkey) -> Result<Vec<TokenHolding>>;

    /// NFTs owned by `owner`, with the collection recorded in their metadata.
    async fn get_nft_holdings(&self, owner: &Pubkey) -> Result<Vec<NftHolding>>;

    /// Token and NFT holdings of `owner`, each read failing on its own.
    ///
    /// Clients that list both from the same token accounts override this to
    /// read them once.
    async fn get_holdings(
        &self,
        owner: &Pubkey,
    ) -> (Result<Vec<TokenHolding>>, Result<Vec<NftHolding>>) {
        tokio::join!(self.get_token_holdings(owner), self.get_nft_holdings(owner))
    }

    /// Raw data of an account, `None` when the account does not exist.
    async fn get_account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>>;

    /// Decimals of an SPL mint.
    async fn get_mint_decimals(&self, mint: &Pubkey) -> Result<u8>;

    async fn get_latest_blockhash(&self) -> Result<Hash>;

    /// Submits a fully signed transaction and waits for confirmation.
    async fn send_and_confirm(&self, transaction: &Transaction) -> Result<Signature>;
}
