mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{config::ConfigSubcommand, dong::DongSubcommand};
use realfi_core::network::Network;
use realfi_core::{ErrorKind, RealfiError};
use std::path::PathBuf;

fn parse_network(s: &str) -> Result<Network, String> {
    s.parse::<Network>().map_err(|e| e.to_string())
}

#[derive(Parser)]
#[command(
    name = "realfi",
    about = "RealFi admin tool: deploy neighborhood vaults and operate them on Mantle",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from realfi.yaml, deployed-addresses.json or .git/)
    #[arg(long, global = true, env = "REALFI_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Target network: sepolia or mainnet
    #[arg(
        long,
        short = 'n',
        global = true,
        env = "REALFI_NETWORK",
        default_value = "sepolia",
        value_parser = parse_network
    )]
    network: Network,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy the factory system with every configured neighborhood
    Deploy,

    /// Deploy USDT0 on its own
    DeployToken,

    /// Deploy a standalone DongVaultFactory against existing contracts
    DeployVault {
        /// USDT0 address
        #[arg(long)]
        usdt0: Option<String>,
        /// KYCRegistry address
        #[arg(long)]
        kyc: Option<String>,
    },

    /// Manage neighborhood (dong) vaults
    Dong {
        #[command(subcommand)]
        subcommand: DongSubcommand,
    },

    /// Add or remove an address from the KYC whitelist
    Whitelist {
        /// add or remove
        #[arg(long)]
        action: String,
        /// Account address
        #[arg(long)]
        address: String,
    },

    /// Pause a vault (deposits and withdrawals disabled)
    Pause {
        /// Neighborhood name; required for factory deployments
        #[arg(long)]
        dong: Option<String>,
    },

    /// Unpause a vault
    Unpause {
        /// Neighborhood name; required for factory deployments
        #[arg(long)]
        dong: Option<String>,
    },

    /// Mint USDT0 test tokens
    MintTestTokens {
        /// Recipient address
        #[arg(long)]
        to: String,
        /// Amount in whole tokens (decimals allowed)
        #[arg(long)]
        amount: String,
    },

    /// Show deployed addresses and on-chain vault state
    Status,

    /// Create, show and validate realfi.yaml
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Deploy
        | Commands::DeployToken
        | Commands::DeployVault { .. }
        | Commands::Dong {
            subcommand: DongSubcommand::Create { .. } | DongSubcommand::Seed,
        } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .init();

    let root = root::resolve_root(cli.root.as_deref());
    let network = cli.network;

    let result = match cli.command {
        Commands::Deploy => cmd::deploy::run_factory(&root, network, None, cli.json),
        Commands::DeployToken => cmd::deploy::run_token(&root, network, cli.json),
        Commands::DeployVault { usdt0, kyc } => {
            cmd::deploy::run_vault(&root, network, usdt0.as_deref(), kyc.as_deref(), cli.json)
        }
        Commands::Dong { subcommand } => cmd::dong::run(&root, network, subcommand, cli.json),
        Commands::Whitelist { action, address } => {
            cmd::whitelist::run(&root, network, &action, &address, cli.json)
        }
        Commands::Pause { dong } => cmd::pause::run(&root, network, dong.as_deref(), true, cli.json),
        Commands::Unpause { dong } => {
            cmd::pause::run(&root, network, dong.as_deref(), false, cli.json)
        }
        Commands::MintTestTokens { to, amount } => {
            cmd::mint::run(&root, network, &to, &amount, cli.json)
        }
        Commands::Status => cmd::status::run(&root, network, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        if let Some(note) = error_note(&e) {
            eprintln!("note: {note}");
        }
        std::process::exit(1);
    }
}

fn error_note(e: &anyhow::Error) -> Option<&'static str> {
    let err = e.chain().find_map(|c| c.downcast_ref::<RealfiError>())?;
    match err.kind() {
        ErrorKind::Precondition | ErrorKind::Compilation => Some("no transaction was sent"),
        ErrorKind::PartialDeployment => {
            Some("transactions already mined were not rolled back; see the partial record")
        }
        ErrorKind::Chain | ErrorKind::Persistence => None,
    }
}
