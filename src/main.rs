//! omnilend - dispatch lending actions to the omnichain lending pool
//!
//! Connects a local signer to one registered chain and routes the action
//! directly (settlement chain) or through that chain's gateway.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use omnilend_dispatch::chain::{registry, ChainDescriptor, ChainProvider, VmKind};
use omnilend_dispatch::config::Settings;
use omnilend_dispatch::identity::canonicalize_address;
use omnilend_dispatch::metrics;
use omnilend_dispatch::settlement::SettlementClient;
use omnilend_dispatch::tx::{EvmWallet, WalletProvider};
use omnilend_dispatch::{
    encode_payload, ActionKind, ActionRequest, ConnectedWallet, ExecutionRouter, UniversalIdentity,
};

use alloy_primitives::Address;

#[derive(Parser)]
#[command(name = "omnilend")]
#[command(about = "Cross-chain action dispatch for the omnichain lending pool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON logs and output
    #[arg(long, global = true)]
    json: bool,

    /// Print Prometheus metrics after the command
    #[arg(long, global = true)]
    metrics: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Supply collateral
    Supply(ActionArgs),
    /// Borrow against collateral
    Borrow(ActionArgs),
    /// Withdraw supplied collateral
    Withdraw(ActionArgs),
    /// Repay debt
    Repay(ActionArgs),

    /// Print the universal user id of an address
    UserId {
        #[arg(long)]
        chain: String,
        #[arg(long)]
        address: String,
    },

    /// Print the gateway payload of an action
    Encode {
        action: ActionKind,
        #[command(flatten)]
        args: ActionArgs,
    },

    /// Read a position from the settlement chain
    Position {
        #[arg(long)]
        address: String,
        /// Chain the address belongs to
        #[arg(long)]
        chain: String,
        #[arg(long)]
        asset: String,
    },

    /// List registered chains and tokens
    Chains,
}

#[derive(Args, Clone)]
struct ActionArgs {
    /// Chain the wallet is connected to
    #[arg(long)]
    chain: String,

    /// Token symbol on that chain
    #[arg(long)]
    asset: String,

    /// Human decimal amount, e.g. 0.1
    #[arg(long)]
    amount: String,

    /// Vault on the settlement chain, by token symbol (defaults to the
    /// vault --asset maps to)
    #[arg(long)]
    vault: Option<String>,

    /// Account credited with the action (defaults to the signer)
    #[arg(long)]
    beneficiary: Option<String>,

    /// Chain of the beneficiary (defaults to --receive-chain, then --chain)
    #[arg(long)]
    beneficiary_chain: Option<String>,

    /// Chain that receives borrowed or withdrawn funds
    #[arg(long, requires = "receive_token")]
    receive_chain: Option<String>,

    /// Token received on --receive-chain
    #[arg(long, requires = "receive_chain")]
    receive_token: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.json);

    let result = run(&cli).await;

    if cli.metrics {
        println!("{}", metrics::render());
    }
    result
}

async fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Supply(args) => dispatch(ActionKind::Supply, args, cli.json).await,
        Commands::Borrow(args) => dispatch(ActionKind::Borrow, args, cli.json).await,
        Commands::Withdraw(args) => dispatch(ActionKind::Withdraw, args, cli.json).await,
        Commands::Repay(args) => dispatch(ActionKind::Repay, args, cli.json).await,

        Commands::UserId { chain, address } => {
            let chain = registry().get(chain)?;
            let identity = UniversalIdentity::parse(chain.chain_id, address)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&identity)?);
            } else {
                println!("{}", identity.user_id());
            }
            Ok(())
        }

        Commands::Encode { action, args } => {
            let beneficiary = args
                .beneficiary
                .as_deref()
                .context("--beneficiary is required for encode")?;
            let request = build_request(*action, args, beneficiary)?;
            let payload = encode_payload(&request.relay_payload());
            println!("0x{}", hex::encode(&payload));
            Ok(())
        }

        Commands::Position {
            address,
            chain,
            asset,
        } => {
            let chain = registry().get(chain)?;
            let identity = UniversalIdentity::parse(chain.chain_id, address)?;
            let asset = lookup_token(chain, asset)?.settlement_asset;

            let settings = Settings::load().context("Failed to load configuration")?;
            let settlement = registry().get(&settings.dispatcher.settlement_chain)?;
            let wallet = connect_evm(&settings, settlement)?;
            let client = SettlementClient::new(settlement.chain_id, settings.lending_pool()?);

            let position = client.position(&wallet, &identity, asset).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&position)?);
            } else {
                println!("user id:          {}", position.user_id);
                println!("asset:            {}", position.asset);
                println!("health factor:    {}", position.health_factor);
                println!("collateral (USD): {}", position.total_collateral_usd);
                println!("debt (USD):       {}", position.total_debt_usd);
                println!("shares:           {}", position.shares);
                println!("balance:          {}", position.underlying_balance);
            }
            Ok(())
        }

        Commands::Chains => {
            let chains: Vec<&ChainDescriptor> = registry().chains().collect();
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&chains)?);
            } else {
                for chain in chains {
                    println!("{} ({}, {}): {}", chain.key, chain.chain_id, chain.vm_kind, chain.label);
                    for token in &chain.tokens {
                        println!(
                            "    {:<5} {:>2} decimals -> {}",
                            token.symbol, token.decimals, token.settlement_asset
                        );
                    }
                }
            }
            Ok(())
        }
    }
}

async fn dispatch(kind: ActionKind, args: &ActionArgs, json: bool) -> Result<()> {
    let settings = Settings::load().context("Failed to load configuration")?;
    let origin = registry().get(&args.chain)?;

    let wallet = match origin.vm_kind {
        VmKind::Evm => ConnectedWallet::Evm(Arc::new(connect_evm(&settings, origin)?)),
        VmKind::Svm => ConnectedWallet::Svm {
            chain_id: origin.chain_id,
            address: args
                .beneficiary
                .clone()
                .context("--beneficiary is required for Solana wallets")?,
        },
    };

    let beneficiary = match (&args.beneficiary, &wallet) {
        (Some(address), _) => address.clone(),
        (None, ConnectedWallet::Evm(signer)) => signer.address().to_string(),
        (None, ConnectedWallet::Svm { address, .. }) => address.clone(),
    };
    let request = build_request(kind, args, &beneficiary)?;

    let router = ExecutionRouter::new(
        registry(),
        SettlementClient::new(settings.settlement_chain_id()?, settings.lending_pool()?),
        settings.revert_policy(),
    )
    .with_confirmations(
        settings.dispatcher.direct_confirmations,
        settings.dispatcher.relayed_confirmations,
    );

    let outcome = match router.dispatch(&wallet, request).await {
        Ok(outcome) => outcome,
        Err(e) => bail!("{} (suggested remedy: {:?})", e, e.remedy()),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        println!("dispatch {}: {} via {} path", outcome.dispatch_id, outcome.action, outcome.path);
        if let Some(approval) = &outcome.approval {
            println!("  approval:   {} (block {})", approval.tx_hash, approval.block_number);
        }
        println!(
            "  settlement: {} on chain {} (block {}, {} confirmations)",
            outcome.settlement.tx_hash,
            outcome.settlement.chain_id,
            outcome.settlement.block_number,
            outcome.settlement.confirmations
        );
    }
    Ok(())
}

fn connect_evm(settings: &Settings, chain: &ChainDescriptor) -> Result<EvmWallet> {
    let endpoint = settings.chain(chain.key)?;
    let provider = Arc::new(ChainProvider::new(chain.chain_id, endpoint.clone())?);
    let private_key = settings.private_key()?;
    let wallet = EvmWallet::new(
        provider,
        &private_key,
        Duration::from_millis(settings.dispatcher.confirmation_poll_ms),
    )?;
    info!("Signer {} connected to {}", wallet.address(), chain.label);
    Ok(wallet)
}

fn lookup_token<'a>(
    chain: &'a ChainDescriptor,
    symbol: &str,
) -> Result<&'a omnilend_dispatch::chain::TokenDescriptor> {
    chain
        .token(symbol)
        .with_context(|| format!("Token {} is not registered on {}", symbol, chain.label))
}

fn build_request(kind: ActionKind, args: &ActionArgs, beneficiary: &str) -> Result<ActionRequest> {
    let origin = registry().get(&args.chain)?;
    let token = lookup_token(origin, &args.asset)?;
    let amount = token.parse_amount(&args.amount)?;

    let beneficiary_chain = match (&args.beneficiary_chain, &args.receive_chain) {
        (Some(key), _) | (None, Some(key)) => registry().get(key)?,
        (None, None) => origin,
    };
    let address = canonicalize_address(beneficiary)?;

    let settlement_asset = match &args.vault {
        Some(symbol) => lookup_token(registry().settlement_chain()?, symbol)?.settlement_asset,
        None => token.settlement_asset,
    };

    let counter_asset = match (&args.receive_chain, &args.receive_token) {
        (Some(chain), Some(symbol)) => {
            lookup_token(registry().get(chain)?, symbol)?.settlement_asset
        }
        _ if kind.pulls_value() => Address::ZERO,
        _ => settlement_asset,
    };

    Ok(ActionRequest {
        kind,
        beneficiary: UniversalIdentity::new(beneficiary_chain.chain_id, address),
        settlement_asset,
        counter_asset,
        amount,
    })
}

fn init_logging(json: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("info,omnilend_dispatch=debug,omnilend=debug,hyper=warn")
    });

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_target(true).with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}
