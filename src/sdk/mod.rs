//! SDK collaborators: candy machine access, the connected wallet and Merkle
//! allow-list proofs.
//!
//! The storefront treats all three as opaque capabilities. Transaction
//! construction belongs to the candy machine SDK, signing to the wallet.

pub mod file_source;
pub mod wallet;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use solana_sdk::instruction::Instruction;
use solana_sdk::signature::Keypair;
use solana_sdk::transaction::Transaction;

use crate::guards::CandyGuardConfig;
use crate::types::{b58, Pubkey};

pub use file_source::FileCandyMachineSource;
pub use wallet::{KeypairWallet, ReadOnlyWallet};

/// Sibling hashes from a leaf up to the allow-list root.
pub type MerkleProof = Vec<[u8; 32]>;

/// Candy machine state with its guard configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandyMachine {
    #[serde(with = "b58")]
    pub address: Pubkey,
    /// Candy guard account wrapping the machine
    #[serde(with = "b58")]
    pub candy_guard: Pubkey,
    #[serde(with = "b58")]
    pub authority: Pubkey,
    pub items_available: u64,
    pub items_minted: u64,
    #[serde(default)]
    pub guard_config: CandyGuardConfig,
}

impl CandyMachine {
    pub fn items_remaining(&self) -> u64 {
        self.items_available.saturating_sub(self.items_minted)
    }

    pub fn is_sold_out(&self) -> bool {
        self.items_remaining() == 0
    }
}

/// Per-item arguments for guards that need caller-supplied data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MintArgs {
    pub allow_list_proof: Option<MerkleProof>,
}

/// Instructions for one mint, with the extra signers they require.
#[derive(Debug)]
pub struct PreparedMint {
    pub instructions: Vec<Instruction>,
    /// Signers other than the wallet, typically the new NFT mint keypair
    pub signers: Vec<Keypair>,
    pub nft_mint: Pubkey,
}

/// Candy machine program client.
#[async_trait]
pub trait CandyMachineSdk: Send + Sync {
    async fn fetch_candy_machine(&self, address: &Pubkey) -> Result<CandyMachine>;

    /// Builds the instructions minting one item from `group` (`None` for the
    /// default group) with `payer` as minter.
    async fn build_mint(
        &self,
        candy_machine: &CandyMachine,
        payer: &Pubkey,
        group: Option<&str>,
        args: &MintArgs,
    ) -> Result<PreparedMint>;
}

/// Connected wallet.
#[async_trait]
pub trait WalletAdapter: Send + Sync {
    fn pubkey(&self) -> Pubkey;

    async fn sign_transaction(&self, transaction: Transaction) -> Result<Transaction>;

    async fn sign_all_transactions(
        &self,
        transactions: Vec<Transaction>,
    ) -> Result<Vec<Transaction>> {
        let mut signed = Vec::with_capacity(transactions.len());
        for transaction in transactions {
            signed.push(self.sign_transaction(transaction).await?);
        }
        Ok(signed)
    }
}

/// Merkle allow-list library.
pub trait MerkleVerifier: Send + Sync {
    /// Proof of `wallet` against the tree built from `leaves`, `None` when the
    /// wallet is not a leaf.
    fn proof(&self, leaves: &[Pubkey], wallet: &Pubkey) -> Option<MerkleProof>;

    fn verify(&self, root: &[u8; 32], wallet: &Pubkey, proof: &MerkleProof) -> bool;
}

/// Verifier for deployments without allow-list support: nobody passes.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProofVerifier;

impl MerkleVerifier for NoProofVerifier {
    fn proof(&self, _leaves: &[Pubkey], _wallet: &Pubkey) -> Option<MerkleProof> {
        None
    }

    fn verify(&self, _root: &[u8; 32], _wallet: &Pubkey, _proof: &MerkleProof) -> bool {
        false
    }
}
