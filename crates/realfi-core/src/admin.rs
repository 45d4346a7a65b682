//! Post-deployment administration: KYC whitelist, pausing, test-token
//! minting and on-chain status.

use crate::addresses::{AddressMap, LegacyAddresses, VaultEntry};
use crate::chain::{ChainClient, TxReceipt};
use crate::contracts::{
    decode_return, IDongVault, IKYCRegistry, IPausable, IRealFiVault, IStableToken,
    REALFI_VAULT, STABLE_DECIMALS,
};
use crate::deploy::Deployer;
use crate::error::{RealfiError, Result};
use alloy::primitives::utils::{format_units, parse_units, ParseUnits};
use alloy::primitives::{Address, U256};
use alloy::sol_types::SolCall;
use serde::Serialize;
use tracing::info;

fn view<C: ChainClient + ?Sized, F: SolCall>(chain: &C, to: Address, call: F) -> Result<F::Return> {
    let raw = chain.call(to, call.abi_encode().into())?;
    decode_return::<F>(&raw)
}

// ---------------------------------------------------------------------------
// KYC
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhitelistAction {
    Add,
    Remove,
}

pub fn kyc_verified<C: ChainClient + ?Sized>(
    chain: &C,
    registry: Address,
    account: Address,
) -> Result<bool> {
    Ok(view(chain, registry, IKYCRegistry::isVerifiedCall { user: account })?._0)
}

pub fn set_kyc<C: ChainClient + ?Sized>(
    deployer: &Deployer<'_, C>,
    registry: Address,
    account: Address,
    action: WhitelistAction,
) -> Result<TxReceipt> {
    let (input, label) = match action {
        WhitelistAction::Add => (IKYCRegistry::verifyKYCCall { user: account }.abi_encode(), "verifyKYC"),
        WhitelistAction::Remove => (IKYCRegistry::revokeKYCCall { user: account }.abi_encode(), "revokeKYC"),
    };
    let receipt = deployer.send(registry, input, None, label)?;
    info!(%account, ?action, "whitelist updated");
    Ok(receipt)
}

// ---------------------------------------------------------------------------
// Pause
// ---------------------------------------------------------------------------

/// The vault an admin command acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultTarget {
    /// Neighborhood name, or `RealFiVault` for a legacy deployment.
    pub label: String,
    pub address: Address,
}

/// Pick the vault: factory records need a neighborhood, legacy records have
/// exactly one vault.
pub fn resolve_vault(map: &AddressMap, neighborhood: Option<&str>) -> Result<VaultTarget> {
    match map {
        AddressMap::Legacy(legacy) => Ok(VaultTarget {
            label: REALFI_VAULT.to_string(),
            address: legacy.vault,
        }),
        AddressMap::Factory(factory) => {
            let Some(name) = neighborhood else {
                return Err(RealfiError::NeighborhoodRequired {
                    available: factory.neighborhoods.keys().cloned().collect(),
                });
            };
            let entry = factory
                .neighborhoods
                .get(name)
                .ok_or_else(|| RealfiError::NeighborhoodNotFound(name.to_string()))?;
            Ok(VaultTarget {
                label: name.to_string(),
                address: entry.vault,
            })
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PauseOutcome {
    Changed(TxReceipt),
    /// Already in the requested state; no transaction was sent.
    AlreadyInState,
}

pub fn is_paused<C: ChainClient + ?Sized>(chain: &C, vault: Address) -> Result<bool> {
    Ok(view(chain, vault, IPausable::pausedCall {})?._0)
}

pub fn set_paused<C: ChainClient + ?Sized>(
    deployer: &Deployer<'_, C>,
    vault: Address,
    paused: bool,
) -> Result<PauseOutcome> {
    if is_paused(deployer.chain(), vault)? == paused {
        return Ok(PauseOutcome::AlreadyInState);
    }
    let receipt = if paused {
        deployer.send(vault, IPausable::pauseCall {}.abi_encode(), None, "pause")?
    } else {
        deployer.send(vault, IPausable::unpauseCall {}.abi_encode(), None, "unpause")?
    };
    Ok(PauseOutcome::Changed(receipt))
}

// ---------------------------------------------------------------------------
// Stable token
// ---------------------------------------------------------------------------

/// Parse a human amount like `1000` or `2.5` into 6-decimal base units.
pub fn parse_token_amount(s: &str) -> Result<U256> {
    let invalid = || RealfiError::InvalidAmount(s.to_string());
    let amount = match parse_units(s.trim(), STABLE_DECIMALS).map_err(|_| invalid())? {
        ParseUnits::U256(v) => v,
        ParseUnits::I256(_) => return Err(invalid()),
    };
    if amount.is_zero() {
        return Err(invalid());
    }
    Ok(amount)
}

/// Base units to a decimal string without trailing zeros.
pub fn format_token_amount(amount: U256) -> String {
    match format_units(amount, STABLE_DECIMALS) {
        Ok(s) if s.contains('.') => s.trim_end_matches('0').trim_end_matches('.').to_string(),
        Ok(s) => s,
        Err(_) => amount.to_string(),
    }
}

pub fn total_supply<C: ChainClient + ?Sized>(chain: &C, token: Address) -> Result<U256> {
    Ok(view(chain, token, IStableToken::totalSupplyCall {})?._0)
}

pub fn token_balance<C: ChainClient + ?Sized>(
    chain: &C,
    token: Address,
    account: Address,
) -> Result<U256> {
    Ok(view(chain, token, IStableToken::balanceOfCall { account })?._0)
}

pub fn mint<C: ChainClient + ?Sized>(
    deployer: &Deployer<'_, C>,
    token: Address,
    to: Address,
    amount: U256,
) -> Result<TxReceipt> {
    let input = IStableToken::mintCall { to, amount }.abi_encode();
    deployer.send(token, input, None, "mint")
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VaultStats {
    pub neighborhood: String,
    /// Name the vault reports for itself.
    pub on_chain_name: String,
    pub paused: bool,
    pub total_deposited: U256,
    pub participants: U256,
    pub vault: Address,
    pub share_token: Address,
}

pub fn vault_stats<C: ChainClient + ?Sized>(
    chain: &C,
    neighborhood: &str,
    entry: &VaultEntry,
) -> Result<VaultStats> {
    let vault = entry.vault;
    Ok(VaultStats {
        neighborhood: neighborhood.to_string(),
        on_chain_name: view(chain, vault, IDongVault::dongNameCall {})?._0,
        paused: is_paused(chain, vault)?,
        total_deposited: view(chain, vault, IDongVault::totalDepositedCall {})?._0,
        participants: view(chain, vault, IDongVault::participantCountCall {})?._0,
        vault,
        share_token: entry.share_token,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LegacyVaultStats {
    pub paused: bool,
    pub project_count: U256,
    /// Zero when no project is active.
    pub active_project_id: U256,
    pub token_supply: U256,
    pub vault_balance: U256,
}

pub fn legacy_vault_stats<C: ChainClient + ?Sized>(
    chain: &C,
    addresses: &LegacyAddresses,
) -> Result<LegacyVaultStats> {
    let vault = addresses.vault;
    Ok(LegacyVaultStats {
        paused: is_paused(chain, vault)?,
        project_count: view(chain, vault, IRealFiVault::projectCountCall {})?._0,
        active_project_id: view(chain, vault, IRealFiVault::activeProjectIdCall {})?._0,
        token_supply: total_supply(chain, addresses.token)?,
        vault_balance: token_balance(chain, addresses.stable_token, vault)?,
    })
}
