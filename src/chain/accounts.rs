//! Program ids, PDA derivations and account decoders used by the storefront.
//!
//! Only the fields the guard layer needs are decoded: the mint counter of the
//! mint-limit guard, the decimals of an SPL mint and the collection of a token
//! metadata account.

use anyhow::{bail, Context, Result};
use borsh::BorshDeserialize;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use solana_sdk::pubkey;
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;

use crate::types::NftCollection;

/// Candy guard program (mint-limit counters live under it).
pub const CANDY_GUARD_PROGRAM_ID: Pubkey = pubkey!("Guard1JwRhJkVH6XZhzoYxeBVQe872VH6QggF4BWmS9g");
/// Token metadata program.
pub const TOKEN_METADATA_PROGRAM_ID: Pubkey = pubkey!("metaqbxxUerdq28cj1RbAWkYQm3ybzjb6a8bt518x1s");
/// SPL token program.
pub const SPL_TOKEN_PROGRAM_ID: Pubkey = pubkey!("TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA");

const MINT_LIMIT_SEED: &[u8] = b"mint_limit";
const METADATA_SEED: &[u8] = b"metadata";

/// Anchor account discriminator length.
const DISCRIMINATOR_LEN: usize = 8;
/// SPL mint account length and the offset of its `decimals` field.
const SPL_MINT_LEN: usize = 82;
const SPL_MINT_DECIMALS_OFFSET: usize = 44;
/// `Key::MetadataV1` discriminant of the token metadata program.
const METADATA_V1_KEY: u8 = 4;

/// Address of the per-wallet counter of a mint-limit guard.
pub fn mint_limit_counter_address(
    id: u8,
    user: &Pubkey,
    candy_guard: &Pubkey,
    candy_machine: &Pubkey,
) -> Pubkey {
    let (address, _) = Pubkey::find_program_address(
        &[
            MINT_LIMIT_SEED,
            &[id],
            user.as_ref(),
            candy_guard.as_ref(),
            candy_machine.as_ref(),
        ],
        &CANDY_GUARD_PROGRAM_ID,
    );
    address
}

/// Address of the metadata account of `mint`.
pub fn metadata_address(mint: &Pubkey) -> Pubkey {
    let (address, _) = Pubkey::find_program_address(
        &[
            METADATA_SEED,
            TOKEN_METADATA_PROGRAM_ID.as_ref(),
            mint.as_ref(),
        ],
        &TOKEN_METADATA_PROGRAM_ID,
    );
    address
}

/// Number of mints a wallet performed under one mint-limit guard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintCounter {
    pub count: u16,
}

/// On-chain layout of the mint counter: anchor discriminator then the count.
#[derive(BorshDeserialize)]
struct MintCounterAccount {
    _discriminator: [u8; DISCRIMINATOR_LEN],
    count: u16,
}

impl MintCounter {
    pub fn from_account_data(data: &[u8]) -> Result<Self> {
        let account = MintCounterAccount::deserialize(&mut &data[..])
            .with_context(|| format!("Invalid mint counter account ({} bytes)", data.len()))?;

        Ok(Self {
            count: account.count,
        })
    }
}

/// Reads the `decimals` field of an SPL mint account.
pub fn mint_decimals(data: &[u8]) -> Result<u8> {
    if data.len() < SPL_MINT_LEN {
        bail!("Not an SPL mint account: {} bytes", data.len());
    }
    Ok(data[SPL_MINT_DECIMALS_OFFSET])
}

/// The part of a token metadata account the storefront cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataSummary {
    pub mint: Pubkey,
    pub collection: Option<NftCollection>,
}

#[derive(BorshDeserialize)]
struct Creator {
    _address: [u8; 32],
    _verified: bool,
    _share: u8,
}

#[derive(BorshDeserialize)]
struct MetadataData {
    _name: String,
    _symbol: String,
    _uri: String,
    _seller_fee_basis_points: u16,
    _creators: Option<Vec<Creator>>,
}

/// Leading fields of a `MetadataV1` account, present in every version.
#[derive(BorshDeserialize)]
struct MetadataHeader {
    key: u8,
    _update_authority: [u8; 32],
    mint: [u8; 32],
    _data: MetadataData,
    _primary_sale_happened: bool,
    _is_mutable: bool,
}

#[derive(BorshDeserialize)]
struct Collection {
    verified: bool,
    key: [u8; 32],
}

/// Fields appended after the header by later metadata versions.
#[derive(BorshDeserialize)]
struct MetadataExtension {
    _edition_nonce: Option<u8>,
    _token_standard: Option<u8>,
    collection: Option<Collection>,
}

/// Decodes a token metadata account up to its `collection` field.
///
/// Accounts written before the collection field existed end early or are
/// zero-padded; both decode to no collection.
pub fn decode_metadata(data: &[u8]) -> Result<MetadataSummary> {
    let mut cursor = data;
    let header =
        MetadataHeader::deserialize(&mut cursor).context("Invalid token metadata account")?;
    if header.key != METADATA_V1_KEY {
        bail!("Unexpected metadata key {}", header.key);
    }

    let collection = MetadataExtension::deserialize(&mut cursor)
        .ok()
        .and_then(|extension| extension.collection)
        .map(|collection| NftCollection {
            key: Pubkey::new_from_array(collection.key),
            verified: collection.verified,
        });

    Ok(MetadataSummary {
        mint: Pubkey::new_from_array(header.mint),
        collection,
    })
}

/// A parsed SPL token account as returned by `jsonParsed` RPC encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTokenAccount {
    pub mint: Pubkey,
    pub amount: u64,
    pub decimals: u8,
}

impl ParsedTokenAccount {
    /// An NFT is a token account holding exactly one unit of a zero-decimals mint.
    pub fn is_nft(&self) -> bool {
        self.decimals == 0 && self.amount == 1
    }
}

/// Extracts mint, amount and decimals from the JSON of a parsed token account.
pub fn parse_token_account(data: &Value) -> Result<ParsedTokenAccount> {
    let info = &data["parsed"]["info"];
    let mint = info["mint"]
        .as_str()
        .context("Token account without mint")?;
    let token_amount = &info["tokenAmount"];
    let amount = token_amount["amount"]
        .as_str()
        .context("Token account without amount")?
        .parse::<u64>()
        .context("Invalid token amount")?;
    let decimals = token_amount["decimals"]
        .as_u64()
        .context("Token account without decimals")?;

    Ok(ParsedTokenAccount {
        mint: Pubkey::from_str(mint).context("Invalid mint address")?,
        amount,
        decimals: u8::try_from(decimals).context("Invalid decimals")?,
    })
}
