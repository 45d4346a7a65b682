use crate::cmd::{load_config, load_record, Session};
use crate::output::{print_fields, print_json};
use anyhow::Context;
use realfi_core::admin::{self, format_token_amount, parse_token_amount};
use realfi_core::network::Network;
use realfi_core::paths::parse_address;
use std::path::Path;

pub fn run(root: &Path, network: Network, to: &str, amount: &str, json: bool) -> anyhow::Result<()> {
    let recipient = parse_address(to)?;
    let amount = parse_token_amount(amount)?;
    let config = load_config(root)?;
    let record = load_record(root, &config, network)?;

    let session = Session::open(root, network, config)?;
    let token = record.stable_token();
    let before = admin::token_balance(&session.chain, token, recipient)
        .context("failed to read balance")?;
    if !json {
        print_fields(&[
            ("Recipient", recipient.to_string()),
            ("Current balance", format!("{} USDT0", format_token_amount(before))),
            ("Minting", format!("{} USDT0", format_token_amount(amount))),
        ]);
    }

    let receipt = admin::mint(&session.deployer(), token, recipient, amount).context("mint failed")?;
    let after = admin::token_balance(&session.chain, token, recipient)
        .context("failed to read balance")?;

    if json {
        return print_json(&serde_json::json!({
            "recipient": recipient,
            "amount": amount,
            "balance_before": before,
            "balance_after": after,
            "receipt": receipt,
        }));
    }
    session.print_tx(&receipt);
    println!("New balance: {} USDT0", format_token_amount(after));
    Ok(())
}
