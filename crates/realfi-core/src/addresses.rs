//! The deployed-address record (`deployed-addresses.json`).
//!
//! Two shapes exist: the single-vault `legacy` layout and the `factory`
//! layout with one vault per neighborhood. The file carries a `schemaKind`
//! tag; files written before the tag existed are classified on load by the
//! presence of a `DongVaultFactory` key and re-tagged on the next save.

use crate::error::{RealfiError, Result};
use crate::io::{atomic_write, read_optional};
use crate::network::Network;
use crate::paths;
use alloy::primitives::Address;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// Record types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "schemaKind", rename_all = "lowercase")]
pub enum AddressMap {
    Legacy(LegacyAddresses),
    Factory(FactoryAddresses),
}

impl AddressMap {
    pub fn network(&self) -> Network {
        match self {
            AddressMap::Legacy(l) => l.network,
            AddressMap::Factory(f) => f.network,
        }
    }

    pub fn stable_token(&self) -> Address {
        match self {
            AddressMap::Legacy(l) => l.stable_token,
            AddressMap::Factory(f) => f.stable_token,
        }
    }

    pub fn kyc_registry(&self) -> Address {
        match self {
            AddressMap::Legacy(l) => l.kyc_registry,
            AddressMap::Factory(f) => f.kyc_registry,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AddressMap::Legacy(_) => "legacy",
            AddressMap::Factory(_) => "factory",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactoryAddresses {
    pub network: Network,
    #[serde(rename = "USDT0")]
    pub stable_token: Address,
    #[serde(rename = "KYCRegistry")]
    pub kyc_registry: Address,
    #[serde(rename = "DongVaultFactory")]
    pub vault_factory: Address,
    #[serde(rename = "dongVaults", default)]
    pub neighborhoods: BTreeMap<String, VaultEntry>,
    #[serde(rename = "deployedAt")]
    pub deployed_at: DateTime<Utc>,
}

impl FactoryAddresses {
    pub fn new(
        network: Network,
        stable_token: Address,
        kyc_registry: Address,
        vault_factory: Address,
    ) -> Self {
        Self {
            network,
            stable_token,
            kyc_registry,
            vault_factory,
            neighborhoods: BTreeMap::new(),
            deployed_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultEntry {
    #[serde(rename = "vaultAddress")]
    pub vault: Address,
    #[serde(rename = "vTokenAddress")]
    pub share_token: Address,
    #[serde(default)]
    pub gu: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyAddresses {
    pub network: Network,
    #[serde(rename = "USDT0")]
    pub stable_token: Address,
    #[serde(rename = "RealFiToken")]
    pub token: Address,
    #[serde(rename = "KYCRegistry")]
    pub kyc_registry: Address,
    #[serde(rename = "RealFiVault")]
    pub vault: Address,
    #[serde(rename = "deployedAt")]
    pub deployed_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

pub struct AddressStore {
    path: PathBuf,
}

impl AddressStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn partial_path(&self) -> PathBuf {
        paths::partial_path(&self.path)
    }

    /// `None` when no record has been written yet.
    pub fn load(&self) -> Result<Option<AddressMap>> {
        let Some(data) = read_optional(&self.path)? else {
            return Ok(None);
        };
        let mut value: serde_json::Value = serde_json::from_str(&data)?;
        if let Some(obj) = value.as_object_mut() {
            if !obj.contains_key("schemaKind") {
                let kind = if obj.contains_key("DongVaultFactory") {
                    "factory"
                } else {
                    "legacy"
                };
                warn!(
                    path = %self.path.display(),
                    kind,
                    "address record has no schemaKind; treating as {kind}"
                );
                obj.insert("schemaKind".to_string(), serde_json::Value::from(kind));
            }
        }
        Ok(Some(serde_json::from_value(value)?))
    }

    /// The record, required to be the factory kind.
    pub fn load_factory(&self) -> Result<FactoryAddresses> {
        match self.load()? {
            None => Err(RealfiError::NotDeployed),
            Some(AddressMap::Legacy(_)) => Err(RealfiError::FactoryNotDeployed),
            Some(AddressMap::Factory(f)) => Ok(f),
        }
    }

    /// Replace the whole record.
    pub fn save(&self, map: &AddressMap) -> Result<()> {
        let data = serde_json::to_string_pretty(map)?;
        atomic_write(&self.path, data.as_bytes())?;
        info!(path = %self.path.display(), "address record saved");
        Ok(())
    }

    /// Write the completed prefix of an aborted run next to the record.
    pub fn save_partial(&self, completed: &FactoryAddresses) -> Result<PathBuf> {
        let path = self.partial_path();
        let data = serde_json::to_string_pretty(&AddressMap::Factory(completed.clone()))?;
        atomic_write(&path, data.as_bytes())?;
        warn!(path = %path.display(), "partial deployment recorded");
        Ok(path)
    }

    /// Remove the sidecar of an earlier aborted run. Returns true if one existed.
    pub fn clear_partial(&self) -> Result<bool> {
        match std::fs::remove_file(self.partial_path()) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Merge one neighborhood into an existing factory record.
    pub fn add_neighborhood(&self, name: &str, entry: VaultEntry) -> Result<FactoryAddresses> {
        let mut record = self.load_factory()?;
        if record.neighborhoods.contains_key(name) {
            return Err(RealfiError::NeighborhoodExists(name.to_string()));
        }
        record.neighborhoods.insert(name.to_string(), entry);
        self.save(&AddressMap::Factory(record.clone()))?;
        Ok(record)
    }
}
