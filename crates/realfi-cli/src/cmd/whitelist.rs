use crate::cmd::{load_config, load_record, Session};
use crate::output::{print_fields, print_json};
use anyhow::Context;
use realfi_core::admin::{self, WhitelistAction};
use realfi_core::network::Network;
use realfi_core::paths::parse_address;
use std::path::Path;

fn parse_action(s: &str) -> anyhow::Result<WhitelistAction> {
    match s.trim().to_ascii_lowercase().as_str() {
        "add" => Ok(WhitelistAction::Add),
        "remove" => Ok(WhitelistAction::Remove),
        other => anyhow::bail!("unknown action '{other}': expected 'add' or 'remove'"),
    }
}

pub fn run(
    root: &Path,
    network: Network,
    action: &str,
    address: &str,
    json: bool,
) -> anyhow::Result<()> {
    let action = parse_action(action)?;
    let account = parse_address(address)?;
    let config = load_config(root)?;
    let record = load_record(root, &config, network)?;

    let session = Session::open(root, network, config)?;
    let registry = record.kyc_registry();
    let before = admin::kyc_verified(&session.chain, registry, account)
        .context("failed to read KYC status")?;
    if !json {
        print_fields(&[
            ("Address", account.to_string()),
            (
                "Current status",
                if before { "Verified" } else { "Not verified" }.to_string(),
            ),
        ]);
    }

    let receipt = admin::set_kyc(&session.deployer(), registry, account, action)
        .context("failed to update whitelist")?;

    if json {
        return print_json(&serde_json::json!({
            "address": account,
            "action": match action { WhitelistAction::Add => "add", WhitelistAction::Remove => "remove" },
            "was_verified": before,
            "receipt": receipt,
        }));
    }
    session.print_tx(&receipt);
    match action {
        WhitelistAction::Add => println!("{account} has been verified"),
        WhitelistAction::Remove => println!("{account} has been revoked"),
    }
    Ok(())
}
