//! Wallet adapters backed by a local keypair or a bare address.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use solana_sdk::signature::{read_keypair_file, Keypair, Signer};
use solana_sdk::transaction::Transaction;
use std::path::Path;

use crate::sdk::WalletAdapter;
use crate::types::Pubkey;

/// Signs with a keypair held in memory.
pub struct KeypairWallet {
    keypair: Keypair,
}

impl KeypairWallet {
    pub fn new(keypair: Keypair) -> Self {
        Self { keypair }
    }

    /// Loads a Solana CLI keypair file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let keypair = read_keypair_file(path)
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("Failed to read keypair from {}", path.display()))?;
        Ok(Self::new(keypair))
    }
}

#[async_trait]
impl WalletAdapter for KeypairWallet {
    fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    async fn sign_transaction(&self, mut transaction: Transaction) -> Result<Transaction> {
        let blockhash = transaction.message.recent_blockhash;
        transaction
            .try_partial_sign(&[&self.keypair], blockhash)
            .context("Wallet failed to sign transaction")?;
        Ok(transaction)
    }
}

/// A watched address that cannot sign. Enough to evaluate eligibility.
#[derive(Debug, Clone, Copy)]
pub struct ReadOnlyWallet {
    address: Pubkey,
}

impl ReadOnlyWallet {
    pub fn new(address: Pubkey) -> Self {
        Self { address }
    }
}

#[async_trait]
impl WalletAdapter for ReadOnlyWallet {
    fn pubkey(&self) -> Pubkey {
        self.address
    }

    async fn sign_transaction(&self, _transaction: Transaction) -> Result<Transaction> {
        bail!("Wallet {} is read-only and cannot sign", self.address)
    }
}
