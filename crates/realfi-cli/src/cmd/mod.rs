pub mod config;
pub mod deploy;
pub mod dong;
pub mod mint;
pub mod pause;
pub mod status;
pub mod whitelist;

use anyhow::Context;
use realfi_core::addresses::{AddressMap, AddressStore};
use realfi_core::chain::{ChainClient, TxReceipt};
use realfi_core::compiler::SolcCompiler;
use realfi_core::config::Config;
use realfi_core::deploy::Deployer;
use realfi_core::network::Network;
use realfi_core::orchestrator::Orchestrator;
use realfi_core::paths;
use realfi_core::rpc::{load_private_key, RpcChain};
use realfi_core::RealfiError;
use std::path::Path;

pub const PRIVATE_KEY_VAR: &str = "REALFI_DEPLOYER_PRIVATE_KEY";
pub const RPC_URL_VAR: &str = "REALFI_RPC_URL";

// ---------------------------------------------------------------------------
// Shared loading
// ---------------------------------------------------------------------------

pub fn load_config(root: &Path) -> anyhow::Result<Config> {
    Config::load(root).context("failed to load realfi.yaml")
}

pub fn address_store(root: &Path, config: &Config) -> AddressStore {
    AddressStore::new(config.addresses_path(root))
}

/// The address record; commands that act on deployed contracts need one.
pub fn load_record(root: &Path, config: &Config, network: Network) -> anyhow::Result<AddressMap> {
    let store = address_store(root, config);
    let record = store
        .load()
        .with_context(|| format!("failed to read {}", store.path().display()))?
        .ok_or(RealfiError::NotDeployed)?;
    if record.network() != network {
        anyhow::bail!(
            "{} holds a {} deployment; pass --network {}",
            store.path().display(),
            record.network(),
            record.network()
        );
    }
    Ok(record)
}

pub fn compiler(root: &Path, config: &Config) -> anyhow::Result<SolcCompiler> {
    let solc = SolcCompiler::locate(config.solc.as_deref(), config.contracts_dir(root))?;
    Ok(solc.with_abi_dir(config.abi_dir(root)))
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// A connected signer on one network.
pub struct Session {
    pub config: Config,
    pub network: Network,
    pub chain: RpcChain,
}

impl Session {
    /// Load `.env.local`, read the deployer key and connect to the RPC.
    pub fn open(root: &Path, network: Network, config: Config) -> anyhow::Result<Self> {
        // variables already set in the environment take precedence
        let env_file = paths::env_path(root);
        match dotenvy::from_path(&env_file) {
            Ok(()) => {}
            Err(e) if e.not_found() => {}
            Err(e) => {
                return Err(e).with_context(|| format!("failed to load {}", env_file.display()))
            }
        }

        let key = std::env::var(PRIVATE_KEY_VAR).ok();
        let signer = load_private_key(key.as_deref())?;

        let explicit = std::env::var(RPC_URL_VAR).ok();
        let rpc_url = config.rpc_url(network, explicit.as_deref());
        let chain = RpcChain::connect(&rpc_url, signer, network, config.rpc_timeout())
            .with_context(|| format!("failed to connect to {rpc_url}"))?;
        tracing::debug!(
            signer = %chain.signer(),
            network = %network,
            chain_id = chain.chain_id(),
            "session open"
        );

        Ok(Self {
            config,
            network,
            chain,
        })
    }

    pub fn deployer(&self) -> Deployer<'_, RpcChain> {
        Deployer::new(&self.chain, self.config.receipt.policy())
    }

    pub fn orchestrator(&self) -> Orchestrator<'_, RpcChain> {
        Orchestrator::new(&self.chain, self.config.receipt.policy(), self.network)
    }

    pub fn print_tx(&self, receipt: &TxReceipt) {
        println!("Transaction: {}", self.network.tx_url(receipt.tx_hash));
    }
}
