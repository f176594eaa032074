//! Storefront configuration.
//!
//! Deployment settings come from the environment (or CLI flags), allow-lists
//! and group display metadata from JSON files or URLs.

use anyhow::{anyhow, Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};

use crate::chain::ChainClient;
use crate::guards::{ACCOUNT_CREATION_FEE_SOL, DEFAULT_MAX_MINT_QUANTITY};
use crate::sdk::{CandyMachineSdk, MerkleVerifier, WalletAdapter};
use crate::storefront::{Collaborators, Storefront};
use crate::types::{b58_vec, Pubkey};

/// Candy machine used when none is configured.
pub const DEFAULT_CANDY_MACHINE_ID: &str = "3zwFR3spiwbSSMtvVKG2bRT6ttqFoC3MHCafGP8ZrdLz";

/// Solana cluster the storefront talks to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Network {
    #[default]
    Devnet,
    Testnet,
    MainnetBeta,
}

impl Network {
    /// Public RPC endpoint of the cluster.
    pub fn cluster_url(&self) -> &'static str {
        match self {
            Self::Devnet => "https://api.devnet.solana.com",
            Self::Testnet => "https://api.testnet.solana.com",
            Self::MainnetBeta => "https://api.mainnet-beta.solana.com",
        }
    }
}

impl FromStr for Network {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "devnet" => Ok(Self::Devnet),
            "testnet" => Ok(Self::Testnet),
            "mainnet-beta" | "mainnet" => Ok(Self::MainnetBeta),
            other => Err(anyhow!("Unknown Solana network: {}", other)),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Devnet => "devnet",
            Self::Testnet => "testnet",
            Self::MainnetBeta => "mainnet-beta",
        };
        f.write_str(name)
    }
}

/// Settings of one storefront deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorefrontConfig {
    /// Candy machine address (base58)
    pub candy_machine_id: String,
    pub network: Network,
    /// Custom RPC endpoint, overrides the cluster URL
    pub rpc_host: Option<String>,
    /// Group selected when the caller does not name one
    pub default_group_label: Option<String>,
    /// Allow-list JSON, file path or http(s) URL
    pub allow_lists_source: Option<String>,
    /// Group display metadata JSON, file path or http(s) URL
    pub group_metadata_source: Option<String>,
    pub rpc_timeout_seconds: u64,
    pub rate_limit_requests_per_second: u32,
    pub decimals_cache_ttl_seconds: u64,
    /// Upper bound of one mint request
    pub max_mint_quantity: u32,
    /// SOL added per item to the estimated cost
    pub account_creation_fee_sol: f64,
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            candy_machine_id: DEFAULT_CANDY_MACHINE_ID.to_string(),
            network: Network::default(),
            rpc_host: None,
            default_group_label: None,
            allow_lists_source: None,
            group_metadata_source: None,
            rpc_timeout_seconds: 30,
            rate_limit_requests_per_second: 10,
            decimals_cache_ttl_seconds: 3600,
            max_mint_quantity: DEFAULT_MAX_MINT_QUANTITY,
            account_creation_fee_sol: ACCOUNT_CREATION_FEE_SOL,
        }
    }
}

impl StorefrontConfig {
    /// Defaults overridden by `SOLANA_NETWORK`, `RPC_HOST`, `CANDY_MACHINE_ID`,
    /// `DEFAULT_GROUP_LABEL`, `ALLOW_LISTS` and `GROUP_METADATA`.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(network) = non_empty_var("SOLANA_NETWORK") {
            config.network = network.parse()?;
        }
        if let Some(id) = non_empty_var("CANDY_MACHINE_ID") {
            config.candy_machine_id = id;
        }
        config.rpc_host = non_empty_var("RPC_HOST");
        config.default_group_label = non_empty_var("DEFAULT_GROUP_LABEL");
        config.allow_lists_source = non_empty_var("ALLOW_LISTS");
        config.group_metadata_source = non_empty_var("GROUP_METADATA");

        debug!("Loaded storefront config from environment: {:?}", config);
        Ok(config)
    }

    pub fn rpc_url(&self) -> String {
        self.rpc_host
            .clone()
            .unwrap_or_else(|| self.network.cluster_url().to_string())
    }

    pub fn candy_machine(&self) -> Result<Pubkey> {
        Pubkey::from_str(&self.candy_machine_id)
            .with_context(|| format!("Invalid candy machine id: {}", self.candy_machine_id))
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Allow-list addresses of one group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllowListEntry {
    /// `None` for the default group
    #[serde(default)]
    pub group_label: Option<String>,
    #[serde(with = "b58_vec")]
    pub list: Vec<Pubkey>,
}

/// Allow-list membership data for the Merkle-rooted allow-list guard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AllowLists(Vec<AllowListEntry>);

impl AllowLists {
    pub fn new(entries: Vec<AllowListEntry>) -> Self {
        Self(entries)
    }

    /// Addresses for `label`. A named group without its own list uses the
    /// default group's list, matching an inherited allow-list guard.
    pub fn for_group(&self, label: Option<&str>) -> Option<&[Pubkey]> {
        let find = |label: Option<&str>| {
            self.0
                .iter()
                .find(|entry| entry.group_label.as_deref() == label)
                .map(|entry| entry.list.as_slice())
        };
        find(label).or_else(|| label.and_then(|_| find(None)))
    }

    pub async fn load(source: &str) -> Result<Self> {
        let lists: Self = load_json(source).await?;
        info!("Loaded {} allow-lists from {}", lists.0.len(), source);
        Ok(lists)
    }
}

/// Presentation details of one mint group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDisplay {
    pub label: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

/// Per-deployment display metadata of the mint groups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupDisplayMetadata(Vec<GroupDisplay>);

impl GroupDisplayMetadata {
    pub fn new(groups: Vec<GroupDisplay>) -> Self {
        Self(groups)
    }

    pub fn for_group(&self, label: &str) -> Option<&GroupDisplay> {
        self.0.iter().find(|g| g.label == label)
    }

    /// Title for `label`, falling back to the label itself.
    pub fn title<'a>(&'a self, label: &'a str) -> &'a str {
        self.for_group(label)
            .and_then(|g| g.title.as_deref())
            .unwrap_or(label)
    }

    pub async fn load(source: &str) -> Result<Self> {
        load_json(source).await
    }
}

/// Reads JSON from an http(s) URL or a local file.
async fn load_json<T: DeserializeOwned>(source: &str) -> Result<T> {
    if source.starts_with("http://") || source.starts_with("https://") {
        let value = reqwest::get(source)
            .await
            .with_context(|| format!("Failed to fetch {}", source))?
            .error_for_status()?
            .json::<T>()
            .await
            .with_context(|| format!("Invalid JSON at {}", source))?;
        Ok(value)
    } else {
        let raw = tokio::fs::read_to_string(source)
            .await
            .with_context(|| format!("Failed to read {}", source))?;
        serde_json::from_str(&raw).with_context(|| format!("Invalid JSON in {}", source))
    }
}

/// Storefront builder with defaults for everything but the collaborators.
pub struct StorefrontBuilder {
    config: StorefrontConfig,
    allow_lists: AllowLists,
}

impl StorefrontBuilder {
    pub fn new() -> Self {
        Self {
            config: StorefrontConfig::default(),
            allow_lists: AllowLists::default(),
        }
    }

    /// Start from an existing configuration.
    pub fn from_config(config: StorefrontConfig) -> Self {
        Self {
            config,
            allow_lists: AllowLists::default(),
        }
    }

    pub fn with_candy_machine(mut self, candy_machine_id: impl Into<String>) -> Self {
        self.config.candy_machine_id = candy_machine_id.into();
        self
    }

    pub fn with_network(mut self, network: Network) -> Self {
        self.config.network = network;
        self
    }

    pub fn with_rpc_host(mut self, rpc_host: impl Into<String>) -> Self {
        self.config.rpc_host = Some(rpc_host.into());
        self
    }

    pub fn with_default_group(mut self, label: impl Into<String>) -> Self {
        self.config.default_group_label = Some(label.into());
        self
    }

    /// Set rate limiting.
    pub fn with_rate_limit(mut self, requests_per_second: u32) -> Self {
        self.config.rate_limit_requests_per_second = requests_per_second;
        self
    }

    pub fn with_max_mint_quantity(mut self, max: u32) -> Self {
        self.config.max_mint_quantity = max;
        self
    }

    pub fn with_allow_lists(mut self, allow_lists: AllowLists) -> Self {
        self.allow_lists = allow_lists;
        self
    }

    pub fn build_config(self) -> StorefrontConfig {
        self.config
    }

    /// Build the storefront around its collaborators.
    pub fn build(
        self,
        chain: Arc<dyn ChainClient>,
        sdk: Arc<dyn CandyMachineSdk>,
        wallet: Arc<dyn WalletAdapter>,
        merkle: Arc<dyn MerkleVerifier>,
    ) -> Result<Storefront> {
        Storefront::new(
            self.config,
            self.allow_lists,
            Collaborators {
                chain,
                sdk,
                wallet,
                merkle,
            },
        )
    }
}

impl Default for StorefrontBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storefront_builder() {
        let config = StorefrontBuilder::new()
            .with_network(Network::MainnetBeta)
            .with_default_group("Public")
            .with_rate_limit(50)
            .with_max_mint_quantity(3)
            .build_config();

        assert_eq!(config.network, Network::MainnetBeta);
        assert_eq!(config.default_group_label.as_deref(), Some("Public"));
        assert_eq!(config.rate_limit_requests_per_second, 50);
        assert_eq!(config.max_mint_quantity, 3);
        assert_eq!(config.rpc_url(), "https://api.mainnet-beta.solana.com");
    }

    #[test]
    fn test_config_defaults() {
        let config = StorefrontConfig::default();

        assert_eq!(config.network, Network::Devnet);
        assert_eq!(config.max_mint_quantity, 10);
        assert_eq!(config.account_creation_fee_sol, 0.012);
        assert_eq!(config.candy_machine().unwrap().to_string(), DEFAULT_CANDY_MACHINE_ID);
    }

    #[test]
    fn test_rpc_host_overrides_cluster() {
        let config = StorefrontBuilder::new()
            .with_rpc_host("http://localhost:8899")
            .build_config();
        assert_eq!(config.rpc_url(), "http://localhost:8899");
    }

    #[test]
    fn test_network_parsing() {
        assert_eq!("devnet".parse::<Network>().unwrap(), Network::Devnet);
        assert_eq!("Mainnet-Beta".parse::<Network>().unwrap(), Network::MainnetBeta);
        assert!("localnet".parse::<Network>().is_err());
        assert_eq!(Network::MainnetBeta.to_string(), "mainnet-beta");
    }

    #[test]
    fn test_allow_lists_by_group() {
        let default_member = Pubkey::new_unique();
        let wl_member = Pubkey::new_unique();
        let json = serde_json::json!([
            { "list": [default_member.to_string()] },
            { "groupLabel": "WL", "list": [wl_member.to_string()] }
        ]);

        let lists: AllowLists = serde_json::from_value(json).unwrap();

        assert_eq!(lists.for_group(None), Some(&[default_member][..]));
        assert_eq!(lists.for_group(Some("WL")), Some(&[wl_member][..]));
        assert_eq!(lists.for_group(Some("Public")), Some(&[default_member][..]));
        assert_eq!(AllowLists::default().for_group(Some("WL")), None);
    }

    #[tokio::test]
    async fn test_load_allow_lists_from_file() {
        let member = Pubkey::new_unique();
        let path = std::env::temp_dir().join(format!("allow-lists-{}.json", member));
        let json = serde_json::json!([{ "groupLabel": "OG", "list": [member.to_string()] }]);
        tokio::fs::write(&path, json.to_string()).await.unwrap();

        let lists = AllowLists::load(path.to_str().unwrap()).await.unwrap();
        assert_eq!(lists.for_group(Some("OG")), Some(&[member][..]));

        let _ = tokio::fs::remove_file(&path).await;
        assert!(AllowLists::load(path.to_str().unwrap()).await.is_err());
    }

    #[test]
    fn test_group_titles() {
        let metadata = GroupDisplayMetadata::new(vec![GroupDisplay {
            label: "OG".to_string(),
            title: Some("OG Holders".to_string()),
            description: None,
            image: None,
        }]);

        assert_eq!(metadata.title("OG"), "OG Holders");
        assert_eq!(metadata.title("Public"), "Public");
    }
}
