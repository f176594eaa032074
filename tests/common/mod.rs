//! In-memory collaborators shared by the integration tests.

#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use candy_storefront::chain::{ChainClient, SPL_TOKEN_PROGRAM_ID};
use candy_storefront::config::{AllowLists, StorefrontBuilder};
use candy_storefront::guards::CandyGuardConfig;
use candy_storefront::sdk::{
    CandyMachine, CandyMachineSdk, KeypairWallet, MerkleProof, MerkleVerifier, MintArgs,
    PreparedMint,
};
use candy_storefront::types::{NftHolding, Pubkey, TokenHolding};
use candy_storefront::Storefront;
use solana_sdk::hash::Hash;
use solana_sdk::signature::{Keypair, Signature, Signer};
use solana_sdk::system_instruction;
use solana_sdk::transaction::Transaction;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Root accepted by [`FakeMerkle`].
pub const ALLOW_LIST_ROOT: [u8; 32] = [42u8; 32];

#[derive(Default)]
pub struct FakeChain {
    pub balance: u64,
    pub tokens: Vec<TokenHolding>,
    pub nfts: Vec<NftHolding>,
    pub accounts: HashMap<Pubkey, Vec<u8>>,
    pub decimals: HashMap<Pubkey, u8>,
    pub fail_wallet_reads: bool,
    /// Outcome of successive sends, `Some(message)` fails; missing entries succeed
    pub send_results: Mutex<VecDeque<Option<String>>>,
    pub sent: AtomicUsize,
    /// Time each send takes before it confirms
    pub send_delay: Duration,
    pub holdings_reads: AtomicUsize,
}

impl FakeChain {
    pub fn with_balance(balance: u64) -> Self {
        Self {
            balance,
            ..Default::default()
        }
    }

    pub fn failing_sends(self, results: Vec<Option<&str>>) -> Self {
        *self.send_results.lock().unwrap() =
            results.into_iter().map(|r| r.map(str::to_string)).collect();
        self
    }

    pub fn slow_sends(mut self, delay: Duration) -> Self {
        self.send_delay = delay;
        self
    }

    pub fn sent(&self) -> usize {
        self.sent.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainClient for FakeChain {
    async fn get_balance(&self, _owner: &Pubkey) -> Result<u64> {
        if self.fail_wallet_reads {
            return Err(anyhow!("connection refused"));
        }
        Ok(self.balance)
    }

    async fn get_token_holdings(&self, _owner: &Pubkey) -> Result<Vec<TokenHolding>> {
        if self.fail_wallet_reads {
            return Err(anyhow!("connection refused"));
        }
        Ok(self.tokens.clone())
    }

    async fn get_nft_holdings(&self, _owner: &Pubkey) -> Result<Vec<NftHolding>> {
        if self.fail_wallet_reads {
            return Err(anyhow!("connection refused"));
        }
        Ok(self.nfts.clone())
    }

    async fn get_holdings(
        &self,
        owner: &Pubkey,
    ) -> (Result<Vec<TokenHolding>>, Result<Vec<NftHolding>>) {
        self.holdings_reads.fetch_add(1, Ordering::SeqCst);
        (
            self.get_token_holdings(owner).await,
            self.get_nft_holdings(owner).await,
        )
    }

    async fn get_account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>> {
        Ok(self.accounts.get(address).cloned())
    }

    async fn get_mint_decimals(&self, mint: &Pubkey) -> Result<u8> {
        self.decimals
            .get(mint)
            .copied()
            .ok_or_else(|| anyhow!("mint {} not found", mint))
    }

    async fn get_latest_blockhash(&self) -> Result<Hash> {
        Ok(Hash::new_unique())
    }

    async fn send_and_confirm(&self, transaction: &Transaction) -> Result<Signature> {
        assert!(transaction.is_signed(), "transaction submitted without all signatures");
        if !self.send_delay.is_zero() {
            tokio::time::sleep(self.send_delay).await;
        }
        self.sent.fetch_add(1, Ordering::SeqCst);
        match self.send_results.lock().unwrap().pop_front().flatten() {
            Some(message) => Err(anyhow!(message)),
            None => Ok(Signature::new_unique()),
        }
    }
}

pub struct FakeSdk {
    pub candy_machine: CandyMachine,
    /// Delay applied to successive candy machine fetches
    pub fetch_delays: Mutex<VecDeque<Duration>>,
    /// `(group, args)` of every built mint
    pub builds: Mutex<Vec<(Option<String>, MintArgs)>>,
}

impl FakeSdk {
    pub fn new(candy_machine: CandyMachine) -> Self {
        Self {
            candy_machine,
            fetch_delays: Mutex::new(VecDeque::new()),
            builds: Mutex::new(Vec::new()),
        }
    }

    pub fn builds(&self) -> Vec<(Option<String>, MintArgs)> {
        self.builds.lock().unwrap().clone()
    }
}

#[async_trait]
impl CandyMachineSdk for FakeSdk {
    async fn fetch_candy_machine(&self, address: &Pubkey) -> Result<CandyMachine> {
        if *address != self.candy_machine.address {
            return Err(anyhow!("account {} not found", address));
        }
        let delay = self.fetch_delays.lock().unwrap().pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.candy_machine.clone())
    }

    async fn build_mint(
        &self,
        _candy_machine: &CandyMachine,
        payer: &Pubkey,
        group: Option<&str>,
        args: &MintArgs,
    ) -> Result<PreparedMint> {
        self.builds
            .lock()
            .unwrap()
            .push((group.map(str::to_string), args.clone()));

        let mint = Keypair::new();
        let instruction =
            system_instruction::create_account(payer, &mint.pubkey(), 1, 82, &SPL_TOKEN_PROGRAM_ID);
        Ok(PreparedMint {
            instructions: vec![instruction],
            nft_mint: mint.pubkey(),
            signers: vec![mint],
        })
    }
}

/// Proves membership for any leaf and accepts [`ALLOW_LIST_ROOT`] only.
pub struct FakeMerkle;

impl MerkleVerifier for FakeMerkle {
    fn proof(&self, leaves: &[Pubkey], wallet: &Pubkey) -> Option<MerkleProof> {
        leaves.contains(wallet).then(|| vec![wallet.to_bytes()])
    }

    fn verify(&self, root: &[u8; 32], wallet: &Pubkey, proof: &MerkleProof) -> bool {
        *root == ALLOW_LIST_ROOT && proof.first() == Some(&wallet.to_bytes())
    }
}

pub fn candy_machine(items_available: u64, items_minted: u64, guards: CandyGuardConfig) -> CandyMachine {
    CandyMachine {
        address: Pubkey::new_unique(),
        candy_guard: Pubkey::new_unique(),
        authority: Pubkey::new_unique(),
        items_available,
        items_minted,
        guard_config: guards,
    }
}

pub struct Harness {
    pub storefront: Storefront,
    pub chain: Arc<FakeChain>,
    pub sdk: Arc<FakeSdk>,
    pub wallet: Pubkey,
}

pub fn harness(
    keypair: Keypair,
    candy_machine: CandyMachine,
    chain: FakeChain,
    allow_lists: AllowLists,
) -> Harness {
    let wallet = keypair.pubkey();
    let chain = Arc::new(chain);
    let sdk = Arc::new(FakeSdk::new(candy_machine));

    let storefront = StorefrontBuilder::new()
        .with_candy_machine(sdk.candy_machine.address.to_string())
        .with_allow_lists(allow_lists)
        .build(
            chain.clone(),
            sdk.clone(),
            Arc::new(KeypairWallet::new(keypair)),
            Arc::new(FakeMerkle),
        )
        .expect("storefront");

    Harness {
        storefront,
        chain,
        sdk,
        wallet,
    }
}
