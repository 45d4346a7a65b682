use crate::cmd::{address_store, compiler, load_config, load_record, Session};
use crate::output::{print_fields, print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use realfi_core::addresses::{AddressMap, VaultEntry};
use realfi_core::admin;
use realfi_core::neighborhood::{self, Neighborhood};
use realfi_core::network::Network;
use realfi_core::nonce::NonceSequencer;
use realfi_core::RealfiError;
use serde::Serialize;
use std::path::Path;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum DongSubcommand {
    /// List configured neighborhoods and their vaults
    List {
        /// Only neighborhoods in this district (구)
        #[arg(long)]
        gu: Option<String>,
    },

    /// Add a neighborhood vault to an existing factory deployment
    Create {
        /// Neighborhood name (동)
        #[arg(long)]
        name: String,
        /// District name (구)
        #[arg(long)]
        gu: String,
    },

    /// Show one neighborhood's vault state
    Status {
        #[arg(long)]
        name: String,
    },

    /// Deploy the factory system with the live neighborhood set
    Seed,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(root: &Path, network: Network, subcmd: DongSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        DongSubcommand::List { gu } => list(root, gu.as_deref(), json),
        DongSubcommand::Create { name, gu } => create(root, network, &name, &gu, json),
        DongSubcommand::Status { name } => status(root, network, &name, json),
        DongSubcommand::Seed => {
            let live = neighborhood::live_neighborhoods();
            if !json {
                println!("Seeding {} live neighborhoods:", live.len());
                for n in &live {
                    println!("  {} ({})", n.name, n.gu);
                }
                println!();
            }
            crate::cmd::deploy::run_factory(root, network, Some(live), json)
        }
    }
}

// ---------------------------------------------------------------------------
// list
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ListedNeighborhood<'a> {
    #[serde(flatten)]
    neighborhood: &'a Neighborhood,
    vault: Option<&'a VaultEntry>,
}

fn list(root: &Path, gu: Option<&str>, json: bool) -> anyhow::Result<()> {
    let config = load_config(root)?;
    let selected: Vec<&Neighborhood> = match gu {
        Some(gu) => neighborhood::filter_by_gu(&config.neighborhoods, gu),
        None => config.neighborhoods.iter().collect(),
    };
    // the record is optional here; list works before any deployment
    let record = address_store(root, &config)
        .load()
        .context("failed to read address record")?;
    let vaults = match &record {
        Some(AddressMap::Factory(f)) => Some(&f.neighborhoods),
        _ => None,
    };

    let listed: Vec<ListedNeighborhood> = selected
        .into_iter()
        .map(|n| ListedNeighborhood {
            neighborhood: n,
            vault: vaults.and_then(|v| v.get(&n.name)),
        })
        .collect();

    if json {
        return print_json(&listed);
    }
    if listed.is_empty() {
        println!("No neighborhoods found.");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = listed
        .iter()
        .map(|l| {
            let n = l.neighborhood;
            vec![
                n.name.clone(),
                n.gu.clone(),
                match (n.lat, n.lon) {
                    (Some(lat), Some(lon)) => format!("{lat:.6}, {lon:.6}"),
                    _ => "-".to_string(),
                },
                l.vault
                    .map(|v| v.vault.to_string())
                    .unwrap_or_else(|| "(not deployed)".to_string()),
            ]
        })
        .collect();
    print_table(&["NAME", "GU", "COORDINATES", "VAULT"], rows);
    Ok(())
}

// ---------------------------------------------------------------------------
// create
// ---------------------------------------------------------------------------

fn create(root: &Path, network: Network, name: &str, gu: &str, json: bool) -> anyhow::Result<()> {
    let candidate = Neighborhood::new(name.trim(), gu.trim());
    if candidate.name.is_empty() {
        return Err(RealfiError::MissingArgument("--name".into()).into());
    }

    let config = load_config(root)?;
    let store = address_store(root, &config);
    // fail on a missing or legacy record before asking for the key
    store.load_factory()?;

    let session = Session::open(root, network, config)?;
    let solc = compiler(root, &session.config)?;
    let mut nonces = NonceSequencer::new(&session.chain);
    let entry = session
        .orchestrator()
        .add_neighborhood(&solc, &store, &mut nonces, &candidate)
        .with_context(|| format!("failed to create vault for {name}"))?;

    if json {
        return print_json(&serde_json::json!({ "name": candidate.name, "vault": entry }));
    }
    println!("Vault created for {} ({})", candidate.name, candidate.gu);
    print_fields(&[
        ("DongVault", entry.vault.to_string()),
        ("VToken", entry.share_token.to_string()),
    ]);
    Ok(())
}

// ---------------------------------------------------------------------------
// status
// ---------------------------------------------------------------------------

fn status(root: &Path, network: Network, name: &str, json: bool) -> anyhow::Result<()> {
    let config = load_config(root)?;
    let configured = neighborhood::find_by_name(&config.neighborhoods, name).cloned();

    let record = match load_record(root, &config, network) {
        Ok(AddressMap::Factory(f)) => Some(f),
        Ok(AddressMap::Legacy(_)) => None,
        Err(e) if matches!(e.downcast_ref::<RealfiError>(), Some(RealfiError::NotDeployed)) => None,
        Err(e) => return Err(e),
    };
    let entry = record.as_ref().and_then(|r| r.neighborhoods.get(name)).cloned();

    let Some(entry) = entry else {
        let Some(n) = configured else {
            return Err(RealfiError::NeighborhoodNotFound(name.to_string()).into());
        };
        if json {
            return print_json(&serde_json::json!({ "neighborhood": n, "deployed": false }));
        }
        println!("{} ({})", n.name, n.gu);
        if let Some(project) = &n.project {
            println!("  Project: {project}");
        }
        println!("  Vault not deployed. Run 'realfi dong create --name {} --gu {}'.", n.name, n.gu);
        return Ok(());
    };

    let session = Session::open(root, network, config)?;
    let stats = admin::vault_stats(&session.chain, name, &entry)
        .with_context(|| format!("failed to read {name} vault"))?;

    if json {
        return print_json(&stats);
    }
    let gu = if entry.gu.is_empty() {
        configured.as_ref().map(|n| n.gu.clone()).unwrap_or_default()
    } else {
        entry.gu.clone()
    };
    println!("{name} ({gu})");
    print_fields(&[
        ("Status", if stats.paused { "PAUSED" } else { "ACTIVE" }.to_string()),
        ("TVL", format!("{} USDT0", admin::format_token_amount(stats.total_deposited))),
        ("Participants", stats.participants.to_string()),
        ("Vault", network.address_url(stats.vault)),
        ("VToken", network.address_url(stats.share_token)),
    ]);
    Ok(())
}
