use crate::error::{RealfiError, Result};
use alloy::primitives::Address;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// File and directory constants
// ---------------------------------------------------------------------------

pub const CONFIG_FILE: &str = "realfi.yaml";
pub const ENV_FILE: &str = ".env.local";
pub const ADDRESSES_FILE: &str = "deployed-addresses.json";
pub const CONTRACTS_DIR: &str = "contracts";
pub const ABI_DIR: &str = "cli/abis";

/// Suffix for the sidecar written when a full deployment aborts midway.
pub const PARTIAL_SUFFIX: &str = "partial.json";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn env_path(root: &Path) -> PathBuf {
    root.join(ENV_FILE)
}

/// Resolve a configured path against the project root unless it is absolute.
pub fn resolve(root: &Path, configured: &Path) -> PathBuf {
    if configured.is_absolute() {
        configured.to_path_buf()
    } else {
        root.join(configured)
    }
}

/// `deployed-addresses.json` → `deployed-addresses.partial.json`
pub fn partial_path(record: &Path) -> PathBuf {
    let stem = record
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "deployed-addresses".to_string());
    record.with_file_name(format!("{stem}.{PARTIAL_SUFFIX}"))
}

pub fn source_path(contracts_dir: &Path, contract: &str) -> PathBuf {
    contracts_dir.join(format!("{contract}.sol"))
}

pub fn abi_path(abi_dir: &Path, contract: &str) -> PathBuf {
    abi_dir.join(format!("{contract}.json"))
}

// ---------------------------------------------------------------------------
// Address validation
// ---------------------------------------------------------------------------

static ADDRESS_RE: OnceLock<Regex> = OnceLock::new();

fn address_re() -> &'static Regex {
    ADDRESS_RE.get_or_init(|| Regex::new(r"^0x[0-9a-fA-F]{40}$").unwrap())
}

/// Parse a `0x`-prefixed, 40-hex-digit account address.
pub fn parse_address(s: &str) -> Result<Address> {
    let s = s.trim();
    if !address_re().is_match(s) {
        return Err(RealfiError::InvalidAddress(s.to_string()));
    }
    s.parse::<Address>()
        .map_err(|_| RealfiError::InvalidAddress(s.to_string()))
}
