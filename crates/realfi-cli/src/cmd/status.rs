use crate::cmd::{load_config, load_record, Session};
use crate::output::{print_fields, print_json, print_table};
use realfi_core::addresses::{AddressMap, FactoryAddresses, LegacyAddresses};
use realfi_core::admin::{self, format_token_amount, LegacyVaultStats, VaultStats};
use realfi_core::config::Config;
use realfi_core::network::Network;
use realfi_core::RealfiError;
use serde::Serialize;
use std::path::Path;

pub fn run(root: &Path, network: Network, json: bool) -> anyhow::Result<()> {
    let config = load_config(root)?;
    let record = match load_record(root, &config, network) {
        Ok(record) => record,
        Err(e) if matches!(e.downcast_ref::<RealfiError>(), Some(RealfiError::NotDeployed)) => {
            return undeployed(&config, json);
        }
        Err(e) => return Err(e),
    };

    let session = Session::open(root, network, config)?;
    let kind = record.kind();
    match record {
        AddressMap::Factory(f) => factory_status(&session, &f, kind, json),
        AddressMap::Legacy(l) => legacy_status(&session, &l, kind, json),
    }
}

// ---------------------------------------------------------------------------
// No record yet
// ---------------------------------------------------------------------------

fn undeployed(config: &Config, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(&serde_json::json!({
            "deployed": false,
            "neighborhoods": config.neighborhoods,
        }));
    }
    println!("No deployed contracts found. Run 'realfi deploy' first.");
    if config.neighborhoods.is_empty() {
        return Ok(());
    }
    println!("\nConfigured neighborhoods:");
    let rows: Vec<Vec<String>> = config
        .neighborhoods
        .iter()
        .map(|n| {
            vec![
                n.name.clone(),
                n.gu.clone(),
                n.project.clone().unwrap_or_else(|| "-".to_string()),
                "(not deployed)".to_string(),
            ]
        })
        .collect();
    print_table(&["NAME", "GU", "PROJECT", "VAULT"], rows);
    Ok(())
}

// ---------------------------------------------------------------------------
// Factory record
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct VaultReport {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    stats: Option<VaultStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn factory_status(
    session: &Session,
    record: &FactoryAddresses,
    kind: &str,
    json: bool,
) -> anyhow::Result<()> {
    let chain = &session.chain;
    let supply = admin::total_supply(chain, record.stable_token)?;

    // one unreachable vault does not hide the others
    let reports: Vec<VaultReport> = record
        .neighborhoods
        .iter()
        .map(|(name, entry)| match admin::vault_stats(chain, name, entry) {
            Ok(stats) => VaultReport {
                name: name.clone(),
                stats: Some(stats),
                error: None,
            },
            Err(e) => {
                tracing::warn!(neighborhood = %name, error = %e, "vault read failed");
                VaultReport {
                    name: name.clone(),
                    stats: None,
                    error: Some(e.to_string()),
                }
            }
        })
        .collect();

    if json {
        return print_json(&serde_json::json!({
            "deployed": true,
            "kind": kind,
            "record": record,
            "usdt0_total_supply": supply,
            "vaults": reports,
        }));
    }

    let network = session.network;
    println!("RealFi status on {}", network.display_name());
    print_fields(&[
        ("Record", kind.to_string()),
        ("USDT0", record.stable_token.to_string()),
        ("KYCRegistry", record.kyc_registry.to_string()),
        ("DongVaultFactory", record.vault_factory.to_string()),
        ("USDT0 supply", format!("{} USDT0", format_token_amount(supply))),
        ("Deployed at", record.deployed_at.to_rfc3339()),
        ("Explorer", network.address_url(record.vault_factory)),
    ]);

    if reports.is_empty() {
        println!("\nNo neighborhood vaults deployed.");
        return Ok(());
    }
    println!("\nNeighborhood vaults:");
    let rows: Vec<Vec<String>> = reports
        .iter()
        .map(|r| match (&r.stats, &r.error) {
            (Some(s), _) => vec![
                r.name.clone(),
                if s.paused { "PAUSED" } else { "ACTIVE" }.to_string(),
                format!("{} USDT0", format_token_amount(s.total_deposited)),
                s.participants.to_string(),
                s.vault.to_string(),
            ],
            (None, error) => vec![
                r.name.clone(),
                "ERROR".to_string(),
                error.clone().unwrap_or_default(),
                "-".to_string(),
                record
                    .neighborhoods
                    .get(&r.name)
                    .map(|e| e.vault.to_string())
                    .unwrap_or_default(),
            ],
        })
        .collect();
    print_table(&["NAME", "STATUS", "TVL", "PARTICIPANTS", "VAULT"], rows);
    Ok(())
}

// ---------------------------------------------------------------------------
// Legacy record
// ---------------------------------------------------------------------------

fn legacy_status(
    session: &Session,
    record: &LegacyAddresses,
    kind: &str,
    json: bool,
) -> anyhow::Result<()> {
    let stats: LegacyVaultStats = admin::legacy_vault_stats(&session.chain, record)?;

    if json {
        return print_json(&serde_json::json!({
            "deployed": true,
            "kind": kind,
            "record": record,
            "vault": stats,
        }));
    }

    let network = session.network;
    println!("RealFi status on {} (single-vault deployment)", network.display_name());
    print_fields(&[
        ("Record", kind.to_string()),
        ("USDT0", record.stable_token.to_string()),
        ("RealFiToken", record.token.to_string()),
        ("KYCRegistry", record.kyc_registry.to_string()),
        ("RealFiVault", record.vault.to_string()),
        ("Deployed at", record.deployed_at.to_rfc3339()),
    ]);
    println!();
    let active = if stats.active_project_id.is_zero() {
        "none".to_string()
    } else {
        stats.active_project_id.to_string()
    };
    print_fields(&[
        ("Status", if stats.paused { "PAUSED" } else { "ACTIVE" }.to_string()),
        ("Projects", stats.project_count.to_string()),
        ("Active project", active),
        ("Token supply", format_token_amount(stats.token_supply)),
        ("Vault balance", format!("{} USDT0", format_token_amount(stats.vault_balance))),
        ("Explorer", network.address_url(record.vault)),
    ]);
    Ok(())
}
