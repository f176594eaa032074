//! Core types shared across the storefront: wallet snapshots and holdings.

use serde::{Deserialize, Serialize};

pub use solana_sdk::pubkey::Pubkey;

/// Number of lamports in one SOL.
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Decimals used when displaying SOL amounts.
pub const SOL_DECIMALS: u8 = 9;

/// Converts a raw on-chain amount to its display value.
pub fn to_ui_amount(raw: u64, decimals: u8) -> f64 {
    raw as f64 / 10f64.powi(decimals as i32)
}

/// A fungible token held by the connected wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenHolding {
    /// Mint of the token
    #[serde(with = "b58")]
    pub mint: Pubkey,
    /// Balance in base units
    pub raw_balance: u64,
    /// Decimals declared by the mint
    pub decimals: u8,
}

impl TokenHolding {
    pub fn ui_balance(&self) -> f64 {
        to_ui_amount(self.raw_balance, self.decimals)
    }
}

/// Collection reference stored in an NFT's metadata account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NftCollection {
    #[serde(with = "b58")]
    pub key: Pubkey,
    pub verified: bool,
}

/// An NFT held by the connected wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NftHolding {
    /// Mint address of the NFT
    #[serde(with = "b58")]
    pub mint: Pubkey,
    /// Collection the NFT claims membership of, if any
    #[serde(default)]
    pub collection: Option<NftCollection>,
}

impl NftHolding {
    /// Only verified collection membership counts.
    pub fn belongs_to(&self, collection: &Pubkey) -> bool {
        self.collection
            .map(|c| c.verified && c.key == *collection)
            .unwrap_or(false)
    }
}

/// Balances and holdings of one wallet, captured once per refresh.
///
/// Immutable within one evaluation pass; a new snapshot is fetched on every
/// refresh.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletSnapshot {
    /// SOL balance in lamports
    pub sol_balance: u64,
    /// Fungible token holdings (NFT mints excluded)
    pub token_holdings: Vec<TokenHolding>,
    /// NFT holdings with their collection
    pub nft_holdings: Vec<NftHolding>,
}

impl WalletSnapshot {
    /// Builds a snapshot, dropping empty token accounts and any token account
    /// whose mint is one of the NFTs.
    pub fn new(
        sol_balance: u64,
        token_holdings: Vec<TokenHolding>,
        nft_holdings: Vec<NftHolding>,
    ) -> Self {
        let token_holdings = token_holdings
            .into_iter()
            .filter(|t| t.raw_balance > 0)
            .filter(|t| !nft_holdings.iter().any(|n| n.mint == t.mint))
            .collect();

        Self {
            sol_balance,
            token_holdings,
            nft_holdings,
        }
    }

    /// Returns the holding for `mint`, if the wallet has one.
    pub fn token(&self, mint: &Pubkey) -> Option<&TokenHolding> {
        self.token_holdings.iter().find(|t| t.mint == *mint)
    }

    /// Raw balance of `mint`, zero when the wallet does not hold it.
    pub fn token_balance(&self, mint: &Pubkey) -> u64 {
        self.token(mint).map(|t| t.raw_balance).unwrap_or(0)
    }

    /// NFTs that belong to the verified `collection`.
    pub fn nfts_in_collection(&self, collection: &Pubkey) -> Vec<NftHolding> {
        self.nft_holdings
            .iter()
            .filter(|n| n.belongs_to(collection))
            .cloned()
            .collect()
    }

    pub fn sol_balance_ui(&self) -> f64 {
        to_ui_amount(self.sol_balance, SOL_DECIMALS)
    }
}

/// Serde helpers writing public keys as base58 strings.
pub mod b58 {
    use super::Pubkey;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use std::str::FromStr;

    pub fn serialize<S: Serializer>(key: &Pubkey, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(key)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Pubkey, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Pubkey::from_str(&raw).map_err(D::Error::custom)
    }
}

/// Same as [`b58`] for optional keys.
pub mod b58_option {
    use super::Pubkey;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use std::str::FromStr;

    pub fn serialize<S: Serializer>(
        key: &Option<Pubkey>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match key {
            Some(key) => serializer.serialize_some(&key.to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Pubkey>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|raw| Pubkey::from_str(&raw).map_err(D::Error::custom))
            .transpose()
    }
}

/// Same as [`b58`] for lists of keys.
pub mod b58_vec {
    use super::Pubkey;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use std::str::FromStr;

    #[allow(clippy::ptr_arg)]
    pub fn serialize<S: Serializer>(keys: &Vec<Pubkey>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(keys.iter().map(|k| k.to_string()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<Pubkey>, D::Error> {
        Vec::<String>::deserialize(deserializer)?
            .iter()
            .map(|raw| Pubkey::from_str(raw).map_err(D::Error::custom))
            .collect()
    }
}
