//! Candy machine description loaded from a JSON file.
//!
//! Used by the CLI to evaluate guards without decoding candy machine accounts.
//! It cannot build mint transactions.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::path::Path;
use tracing::info;

use crate::sdk::{CandyMachine, CandyMachineSdk, MintArgs, PreparedMint};
use crate::types::Pubkey;

pub struct FileCandyMachineSource {
    candy_machine: CandyMachine,
}

impl FileCandyMachineSource {
    pub fn new(candy_machine: CandyMachine) -> Self {
        Self { candy_machine }
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read candy machine file {}", path.display()))?;
        let candy_machine: CandyMachine = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid candy machine JSON in {}", path.display()))?;

        info!(
            "Loaded candy machine {} with {} groups from {}",
            candy_machine.address,
            candy_machine.guard_config.groups.len(),
            path.display()
        );
        Ok(Self::new(candy_machine))
    }

    pub fn candy_machine(&self) -> &CandyMachine {
        &self.candy_machine
    }
}

#[async_trait]
impl CandyMachineSdk for FileCandyMachineSource {
    async fn fetch_candy_machine(&self, address: &Pubkey) -> Result<CandyMachine> {
        if *address != self.candy_machine.address {
            bail!(
                "Candy machine {} not found, file describes {}",
                address,
                self.candy_machine.address
            );
        }
        Ok(self.candy_machine.clone())
    }

    async fn build_mint(
        &self,
        candy_machine: &CandyMachine,
        _payer: &Pubkey,
        _group: Option<&str>,
        _args: &MintArgs,
    ) -> Result<PreparedMint> {
        bail!(
            "Candy machine {} is loaded from a file and cannot build mint transactions",
            candy_machine.address
        )
    }
}
