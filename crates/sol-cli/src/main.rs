//! solkit - Solana transaction toolkit
//!
//! Reads balances, requests airdrops, transfers SOL and creates token mints
//! against a chosen cluster.

mod wallet;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use sol_client::{Client, ClientConfig, Cluster, Commitment, Connection, DEFAULT_AIRDROP_LAMPORTS};
use sol_tx::{lamports_to_sol, sol_to_lamports, Address, Keypair, DEFAULT_MINT_DECIMALS};
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Token-2022 program, the account the tutorial inspects first.
const TUTORIAL_ACCOUNT: &str = "TokenzQdBNbLqP5VEhdkAS6EPFLC1PHnBqCXEpPxuEb";

#[derive(Parser, Debug)]
#[command(author, version, about = "Solana transaction toolkit", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Cluster preset (localnet, devnet, testnet, mainnet-beta)
    #[arg(long, env = "SOLKIT_CLUSTER", default_value = "localnet", global = true)]
    cluster: Cluster,

    /// RPC URL; overrides the cluster preset
    #[arg(short, long, env = "SOLKIT_RPC_URL", global = true)]
    url: Option<String>,

    /// WebSocket URL; derived from the RPC URL when omitted
    #[arg(long, env = "SOLKIT_WS_URL", global = true)]
    ws_url: Option<String>,

    /// TOML config file; flags take precedence over it
    #[arg(short, long, env = "SOLKIT_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Keypair file paying for transactions
    #[arg(short, long, env = "SOLKIT_KEYPAIR", global = true)]
    keypair: Option<PathBuf>,

    /// Commitment to wait for (processed, confirmed, finalized)
    #[arg(long, global = true)]
    commitment: Option<Commitment>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the balance of an account
    Balance {
        address: Address,
    },

    /// Request SOL from the cluster faucet
    Airdrop {
        /// Amount in SOL
        sol: f64,

        /// Recipient; defaults to the keypair's address
        #[arg(long)]
        to: Option<Address>,
    },

    /// Send SOL from the wallet
    Transfer {
        to: Address,

        /// Amount in SOL
        sol: f64,
    },

    /// Create a token mint with the wallet as mint authority
    CreateMint {
        #[arg(long, default_value_t = DEFAULT_MINT_DECIMALS)]
        decimals: u8,

        /// Create the mint without a freeze authority
        #[arg(long)]
        no_freeze_authority: bool,
    },

    /// Connect, read a balance, fund a new wallet and read it back
    Tutorial,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose)?;

    let config = build_config(&args)?;
    info!(endpoint = %config.rpc_url, commitment = %config.commitment, "using cluster");
    let connection = Connection::new(&config).context("failed to configure connection")?;

    match &args.command {
        Commands::Balance { address } => {
            let lamports = connection.balance(address, connection.commitment()).await?;
            print_balance("Balance", lamports);
        }
        Commands::Airdrop { sol, to } => {
            ensure_faucet(&args)?;
            let recipient = match (to, &args.keypair) {
                (Some(to), _) => *to,
                (None, Some(path)) => wallet::load_keypair(path)?.address(),
                (None, None) => bail!("airdrop needs --to or --keypair"),
            };
            let lamports = sol_to_lamports(*sol)?;
            let signature = connection
                .request_airdrop(&recipient, lamports, connection.commitment())
                .await
                .context("airdrop failed")?;
            println!("Airdropped {sol} SOL to {recipient}");
            println!("Signature: {signature}");
        }
        Commands::Transfer { to, sol } => {
            let lamports = sol_to_lamports(*sol)?;
            let client = client(&args, connection).await?;
            let confirmed = client.send_sol(to, lamports).await.context("transfer failed")?;
            println!("Sent {sol} SOL from {} to {to}", client.address());
            println!("Signature: {} ({})", confirmed.signature, confirmed.commitment);
        }
        Commands::CreateMint {
            decimals,
            no_freeze_authority,
        } => {
            let client = client(&args, connection).await?;
            let created = client
                .create_mint(Some(*decimals), !no_freeze_authority)
                .await
                .context("mint creation failed")?;
            println!("Mint: {}", created.address());
            println!("Signature: {}", created.confirmed.signature);
        }
        Commands::Tutorial => tutorial(connection).await?,
    }

    Ok(())
}

fn init_logging(verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        "solkit=debug,sol_client=debug,info"
    } else {
        "solkit=info,sol_client=info,warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init()
        .context("failed to initialise logging")?;

    Ok(())
}

fn build_config(args: &Args) -> Result<ClientConfig> {
    let mut config = match &args.config {
        Some(path) => ClientConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => ClientConfig::for_cluster(args.cluster),
    };
    if let Some(url) = &args.url {
        config.rpc_url = url.clone();
        config.ws_url = None;
    }
    if let Some(ws_url) = &args.ws_url {
        config.ws_url = Some(ws_url.clone());
    }
    if let Some(commitment) = args.commitment {
        config.commitment = commitment;
    }
    config.validate()?;
    Ok(config)
}

/// Fails early for presets without a faucet. An explicit `--url` or
/// `--config` endpoint is left to the node to refuse.
fn ensure_faucet(args: &Args) -> Result<()> {
    if args.url.is_none() && args.config.is_none() && !args.cluster.has_faucet() {
        bail!("{} has no faucet; pass --keypair with a funded wallet", args.cluster);
    }
    Ok(())
}

/// Wallet from `--keypair`, or a throwaway wallet funded by the faucet.
async fn client(args: &Args, connection: Connection) -> Result<Client> {
    match &args.keypair {
        Some(path) => Ok(Client::new(connection, wallet::load_keypair(path)?)),
        None => {
            ensure_faucet(args)?;
            warn!("no keypair given, funding a throwaway wallet from the faucet");
            let client = Client::with_funded_wallet(connection)
                .await
                .context("failed to fund a throwaway wallet")?;
            info!(wallet = %client.address(), "funded throwaway wallet");
            Ok(client)
        }
    }
}

async fn tutorial(connection: Connection) -> Result<()> {
    let account: Address = TUTORIAL_ACCOUNT.parse()?;
    let balance = connection.balance(&account, connection.commitment()).await?;
    print_balance("Balance", balance);

    let wallet = Keypair::generate();
    println!("\nWallet 2 Address: {}", wallet.address());

    connection
        .request_airdrop(&wallet.address(), DEFAULT_AIRDROP_LAMPORTS, Commitment::Confirmed)
        .await
        .context("airdrop failed")?;

    let balance = connection.balance(&wallet.address(), connection.commitment()).await?;
    print_balance("Wallet 2 Balance", balance);
    Ok(())
}

fn print_balance(label: &str, lamports: u64) {
    println!("{label}: {lamports} lamports.");
    println!("{label}: {} SOL", lamports_to_sol(lamports));
}
