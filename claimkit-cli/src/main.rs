//! `claimkit`: developer CLI for an encrypted claim wallet file.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use claimkit_core::{Claim, DidNetwork, Wallet};
use clap::{Parser, Subcommand};
use eyre::{bail, eyre, WrapErr};
use secrecy::SecretString;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod store;

/// Manage DIDs and claims in an encrypted wallet file.
#[derive(Parser, Debug)]
#[command(name = "claimkit", version, about, long_about = None)]
struct Cli {
    /// Path to the wallet file [default: <data dir>/claimkit/wallet.json]
    #[arg(long, env = "CLAIMKIT_WALLET", global = true)]
    wallet: Option<PathBuf>,

    /// Passphrase that seals the wallet
    #[arg(long, env = "CLAIMKIT_PASSPHRASE", hide_env_values = true, global = true)]
    passphrase: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create an empty wallet file
    Init {
        /// Wallet name
        name: String,
    },

    /// Generate a key pair and register a new DID
    CreateDid {
        /// DID network, e.g. main, test, priv
        network: String,

        /// Label for the new account
        #[arg(long)]
        label: Option<String>,

        /// Mark the new account as the wallet default
        #[arg(long)]
        default: bool,
    },

    /// List registered DIDs
    ListDids,

    /// Store a claim from a JSON file in its owner's account
    AddClaim {
        /// Path to the claim JSON
        path: PathBuf,
    },

    /// Print every claim held by a DID
    Claims {
        /// Owner DID
        did: String,
    },

    /// Print a single claim
    Show {
        /// Claim id
        id: String,
    },
}

fn init_tracing(verbose: bool) -> eyre::Result<()> {
    tracing_log::LogTracer::init().wrap_err("failed to bridge log records")?;

    let filter = if verbose {
        EnvFilter::new("claimkit=debug,claimkit_core=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init()
        .wrap_err("failed to install tracing subscriber")?;
    Ok(())
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;
    run(cli).await
}

async fn run(cli: Cli) -> eyre::Result<()> {
    let path = match cli.wallet {
        Some(path) => path,
        None => store::default_wallet_path()?,
    };
    let passphrase = cli
        .passphrase
        .map(SecretString::from)
        .ok_or_else(|| eyre!("a passphrase is required; pass --passphrase or set CLAIMKIT_PASSPHRASE"))?;

    match cli.command {
        Commands::Init { name } => cmd_init(&path, &passphrase, name).await,
        Commands::CreateDid {
            network,
            label,
            default,
        } => cmd_create_did(&path, &passphrase, &network, label, default).await,
        Commands::ListDids => cmd_list_dids(&path, &passphrase).await,
        Commands::AddClaim { path: claim_path } => {
            cmd_add_claim(&path, &passphrase, &claim_path).await
        }
        Commands::Claims { did } => cmd_claims(&path, &passphrase, &did).await,
        Commands::Show { id } => cmd_show(&path, &passphrase, &id).await,
    }
}

async fn cmd_init(path: &Path, passphrase: &SecretString, name: String) -> eyre::Result<()> {
    if path.exists() {
        bail!("wallet file {} already exists", path.display());
    }
    let mut wallet: Wallet = Wallet::new(name);
    store::seal(path, &mut wallet, passphrase, None).await?;
    tracing::info!("created wallet {} at {}", wallet.name(), path.display());
    Ok(())
}

async fn cmd_create_did(
    path: &Path,
    passphrase: &SecretString,
    network: &str,
    label: Option<String>,
    default: bool,
) -> eyre::Result<()> {
    let network = DidNetwork::parse(network).ok_or_else(|| eyre!("network name must not be empty"))?;
    let mut wallet = store::open(path, passphrase).await?;

    let did = wallet.create_did(network);
    if let Some(account) = wallet.account_by_did_mut(&did) {
        account.set_label(label);
    }
    if default {
        wallet.set_default_account(&did)?;
    }

    store::seal(path, &mut wallet, passphrase, None).await?;
    println!("{did}");
    Ok(())
}

async fn cmd_list_dids(path: &Path, passphrase: &SecretString) -> eyre::Result<()> {
    let wallet = store::open(path, passphrase).await?;
    let default_did = wallet.default_account().map(claimkit_core::Account::did);
    for did in wallet.get_all_dids() {
        let label = wallet
            .get_account_by_did(&did)
            .and_then(|account| account.label())
            .unwrap_or_default();
        let marker = if default_did.as_deref() == Some(did.as_str()) { "*" } else { " " };
        println!("{marker} {did}\t{label}");
    }
    Ok(())
}

async fn cmd_add_claim(path: &Path, passphrase: &SecretString, claim_path: &Path) -> eyre::Result<()> {
    let json = fs::read_to_string(claim_path)
        .wrap_err_with(|| format!("failed to read claim file {}", claim_path.display()))?;
    let claim: Claim = serde_json::from_str(&json)
        .wrap_err_with(|| format!("{} is not a valid claim", claim_path.display()))?;
    if !claim.has_valid_window() {
        tracing::warn!("claim {} ends before it starts", claim.id());
    }

    let mut wallet = store::open(path, passphrase).await?;
    let id = claim.id().to_string();
    wallet.add_claim(claim)?;
    store::seal(path, &mut wallet, passphrase, None).await?;
    tracing::info!("stored claim {id}");
    Ok(())
}

async fn cmd_claims(path: &Path, passphrase: &SecretString, did: &str) -> eyre::Result<()> {
    let wallet = store::open(path, passphrase).await?;
    if wallet.get_account_by_did(did).is_none() {
        tracing::warn!("{did} is not part of this wallet");
    }
    for claim in wallet.get_all_claims(did)? {
        println!("{}", serde_json::to_string_pretty(claim)?);
    }
    Ok(())
}

async fn cmd_show(path: &Path, passphrase: &SecretString, id: &str) -> eyre::Result<()> {
    let wallet = store::open(path, passphrase).await?;
    let claim = wallet
        .get_claim(id)
        .ok_or_else(|| eyre!("no claim with id `{id}`"))?;
    println!("{}", serde_json::to_string_pretty(claim)?);
    if !claim.is_valid_at(Utc::now()) {
        tracing::warn!("claim {id} is outside its validity window");
    }
    Ok(())
}
