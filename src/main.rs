//! candy-storefront CLI
//!
//! Refreshes the storefront for one wallet and prints the eligibility, price
//! and quantity limit of every mint group.

use anyhow::Result;
use candy_storefront::chain::RpcChainClient;
use candy_storefront::config::{
    AllowLists, GroupDisplayMetadata, Network, StorefrontBuilder, StorefrontConfig,
};
use candy_storefront::guards::{estimated_total_cost, headline_price, PriceKind};
use candy_storefront::sdk::{
    FileCandyMachineSource, KeypairWallet, NoProofVerifier, ReadOnlyWallet, WalletAdapter,
};
use candy_storefront::types::Pubkey;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn, Level};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Candy machine description (JSON)
    #[arg(long, env = "CANDY_MACHINE_FILE")]
    candy_machine_file: PathBuf,

    /// Wallet address to evaluate
    #[arg(long, env = "WALLET", conflicts_with = "keypair")]
    wallet: Option<Pubkey>,

    /// Keypair file of the wallet to evaluate
    #[arg(long, env = "KEYPAIR")]
    keypair: Option<PathBuf>,

    /// Solana cluster (devnet, testnet, mainnet-beta)
    #[arg(long)]
    network: Option<Network>,

    /// Custom RPC endpoint
    #[arg(long)]
    rpc_host: Option<String>,

    /// Only report this group
    #[arg(long)]
    group: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .init();

    info!("Starting candy-storefront {}", env!("CARGO_PKG_VERSION"));

    let mut config = StorefrontConfig::from_env()?;
    if let Some(network) = args.network {
        config.network = network;
    }
    if let Some(rpc_host) = args.rpc_host.clone() {
        config.rpc_host = Some(rpc_host);
    }

    let source = FileCandyMachineSource::load(&args.candy_machine_file).await?;
    config.candy_machine_id = source.candy_machine().address.to_string();

    let wallet: Arc<dyn WalletAdapter> = match (&args.keypair, args.wallet) {
        (Some(path), _) => Arc::new(KeypairWallet::from_file(path)?),
        (None, Some(address)) => Arc::new(ReadOnlyWallet::new(address)),
        (None, None) => anyhow::bail!("Either --wallet or --keypair is required"),
    };

    let allow_lists = match &config.allow_lists_source {
        Some(location) => AllowLists::load(location).await?,
        None => AllowLists::default(),
    };
    let group_display = match &config.group_metadata_source {
        Some(location) => GroupDisplayMetadata::load(location).await.unwrap_or_else(|e| {
            warn!("Ignoring group metadata: {:#}", e);
            GroupDisplayMetadata::default()
        }),
        None => GroupDisplayMetadata::default(),
    };

    info!("Using RPC endpoint {} ({})", config.rpc_url(), config.network);
    let chain = Arc::new(RpcChainClient::new(&config));
    let storefront = StorefrontBuilder::from_config(config)
        .with_allow_lists(allow_lists)
        .build(chain, Arc::new(source), wallet, Arc::new(NoProofVerifier))?;

    let snapshot = storefront.refresh().await?;
    info!(
        "Candy machine {}: {}/{} items remaining, wallet {} holds {:.4} SOL",
        snapshot.candy_machine.address,
        snapshot.items.remaining,
        snapshot.items.available,
        snapshot.wallet,
        snapshot.wallet_snapshot.sol_balance_ui()
    );

    let groups: Vec<_> = match &args.group {
        Some(label) => vec![snapshot.group(Some(label.as_str()))?],
        None => snapshot.groups.iter().collect(),
    };

    let config = storefront.config();
    for group in groups {
        let label = group.display_label();
        let title = group_display.title(label);
        let price = headline_price(group);
        let max = snapshot.max_mint_quantity(group, config.max_mint_quantity);
        let price_text = match price.kind {
            PriceKind::Free => "free".to_string(),
            _ => format!("{} {}", price.price, price.label),
        };

        info!(
            "[{}] {} - phase: {}, price: {}, can mint: {}, max quantity: {}",
            label,
            title,
            snapshot.phase(group),
            price_text,
            group.states.can_mint(),
            max
        );
        if price.kind == PriceKind::Sol && max > 0 {
            info!(
                "[{}] estimated cost for {}: {} SOL",
                label,
                max,
                estimated_total_cost(price.price, max, config.account_creation_fee_sol)
            );
        }
        if group.states.has_gatekeeper {
            info!("[{}] requires a gateway token", label);
        }
        for reason in group.states.blocking_reasons() {
            warn!("[{}] {}", label, reason);
        }
    }

    Ok(())
}
