use crate::cmd::{load_config, load_record, Session};
use crate::output::print_json;
use anyhow::Context;
use realfi_core::admin::{self, PauseOutcome};
use realfi_core::network::Network;
use std::path::Path;

/// Pause (`pause = true`) or unpause the vault selected by `dong`.
pub fn run(
    root: &Path,
    network: Network,
    dong: Option<&str>,
    pause: bool,
    json: bool,
) -> anyhow::Result<()> {
    let config = load_config(root)?;
    let record = load_record(root, &config, network)?;
    let target = admin::resolve_vault(&record, dong)?;

    let session = Session::open(root, network, config)?;
    let outcome = admin::set_paused(&session.deployer(), target.address, pause)
        .with_context(|| format!("failed to {} {}", if pause { "pause" } else { "unpause" }, target.label))?;

    let state = if pause { "paused" } else { "active" };
    if json {
        let receipt = match &outcome {
            PauseOutcome::Changed(r) => Some(r),
            PauseOutcome::AlreadyInState => None,
        };
        return print_json(&serde_json::json!({
            "vault": target.label,
            "address": target.address,
            "state": state,
            "changed": receipt.is_some(),
            "receipt": receipt,
        }));
    }

    match outcome {
        PauseOutcome::AlreadyInState => {
            tracing::warn!(vault = %target.label, "already {state}; no transaction sent");
            eprintln!("warning: {} vault is already {state}", target.label);
        }
        PauseOutcome::Changed(receipt) => {
            session.print_tx(&receipt);
            if pause {
                println!("{} vault is now PAUSED. Deposits and withdrawals are disabled.", target.label);
            } else {
                println!("{} vault is now ACTIVE. Deposits and withdrawals are enabled.", target.label);
            }
        }
    }
    Ok(())
}
