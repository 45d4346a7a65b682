use crate::cmd::{address_store, compiler, load_config, Session};
use crate::output::{print_fields, print_json, print_table};
use anyhow::Context;
use realfi_core::chain::ChainClient;
use realfi_core::contracts::{self, DONG_VAULT_FACTORY, USDT0};
use realfi_core::deploy::DeploymentRecord;
use realfi_core::neighborhood::Neighborhood;
use realfi_core::network::Network;
use realfi_core::nonce::NonceSequencer;
use realfi_core::orchestrator::FactoryDeployment;
use realfi_core::paths::parse_address;
use realfi_core::RealfiError;
use std::path::Path;

// ---------------------------------------------------------------------------
// Full factory deployment
// ---------------------------------------------------------------------------

/// Deploy the factory system. `neighborhoods` defaults to the configured set.
pub fn run_factory(
    root: &Path,
    network: Network,
    neighborhoods: Option<Vec<Neighborhood>>,
    json: bool,
) -> anyhow::Result<()> {
    let config = load_config(root)?;
    let neighborhoods = neighborhoods.unwrap_or_else(|| config.neighborhoods.clone());
    let store = address_store(root, &config);
    let session = Session::open(root, network, config)?;
    let solc = compiler(root, &session.config)?;

    if !json {
        println!("Deploying DongVault factory system");
        print_fields(&[
            ("Deployer", session.chain.signer().to_string()),
            (
                "Network",
                format!("{} (chain {})", network.display_name(), network.chain_id()),
            ),
            ("Neighborhoods", neighborhoods.len().to_string()),
        ]);
        println!();
    }

    let orchestrator = session.orchestrator();
    let mut nonces = NonceSequencer::new(&session.chain);
    let outcome = match orchestrator.deploy_factory_system(&solc, &store, &mut nonces, &neighborhoods)
    {
        Ok(outcome) => outcome,
        Err(e @ RealfiError::PartialDeployment { .. }) => {
            eprintln!(
                "Completed neighborhoods were written to {}",
                store.partial_path().display()
            );
            return Err(e.into());
        }
        Err(e) => return Err(e).context("factory deployment failed"),
    };

    if json {
        return print_json(&outcome);
    }
    print_factory_summary(network, &outcome);
    println!("\nAddresses saved to {}", store.path().display());
    Ok(())
}

fn print_factory_summary(network: Network, outcome: &FactoryDeployment) {
    let record = &outcome.addresses;
    println!("Core contracts:");
    print_fields(&[
        ("USDT0", record.stable_token.to_string()),
        ("KYCRegistry", record.kyc_registry.to_string()),
        ("DongVaultFactory", record.vault_factory.to_string()),
    ]);

    println!("\nNeighborhood vaults:");
    let rows: Vec<Vec<String>> = record
        .neighborhoods
        .iter()
        .map(|(name, entry)| {
            vec![
                name.clone(),
                entry.gu.clone(),
                entry.vault.to_string(),
                entry.share_token.to_string(),
            ]
        })
        .collect();
    print_table(&["NAME", "GU", "VAULT", "VTOKEN"], rows);

    println!(
        "\n{} transactions sent. Explorer: {}",
        outcome.nonces_issued,
        network.explorer_url()
    );
}

// ---------------------------------------------------------------------------
// Single contracts
// ---------------------------------------------------------------------------

pub fn run_token(root: &Path, network: Network, json: bool) -> anyhow::Result<()> {
    let config = load_config(root)?;
    let session = Session::open(root, network, config)?;
    let solc = compiler(root, &session.config)?;

    let record = session
        .orchestrator()
        .deploy_single(&solc, USDT0, &[])
        .context("USDT0 deployment failed")?;
    report_single(network, &record, json)
}

pub fn run_vault(
    root: &Path,
    network: Network,
    usdt0: Option<&str>,
    kyc: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let usdt0 = parse_address(usdt0.ok_or_else(|| RealfiError::MissingArgument("--usdt0".into()))?)?;
    let kyc = parse_address(kyc.ok_or_else(|| RealfiError::MissingArgument("--kyc".into()))?)?;

    let config = load_config(root)?;
    let session = Session::open(root, network, config)?;
    let solc = compiler(root, &session.config)?;

    let record = session
        .orchestrator()
        .deploy_single(
            &solc,
            DONG_VAULT_FACTORY,
            &contracts::factory_constructor_args(usdt0, kyc),
        )
        .context("DongVaultFactory deployment failed")?;
    report_single(network, &record, json)
}

fn report_single(network: Network, record: &DeploymentRecord, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(record);
    }
    println!("{} deployed", record.contract);
    print_fields(&[
        ("Address", record.address.to_string()),
        ("Transaction", network.tx_url(record.tx_hash)),
        ("Explorer", network.address_url(record.address)),
    ]);
    println!("\nNot recorded in the address file.");
    Ok(())
}
