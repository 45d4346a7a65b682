use crate::error::Result;
use crate::neighborhood::{self, Neighborhood};
use crate::network::Network;
use crate::paths;
use crate::receipt::ReceiptPolicy;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// ReceiptConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_max_poll_interval_ms")]
    pub max_poll_interval_ms: u64,
    /// Consecutive failed receipt lookups tolerated before giving up.
    #[serde(default = "default_max_query_retries")]
    pub max_query_retries: u32,
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_max_poll_interval_ms() -> u64 {
    8_000
}

fn default_max_query_retries() -> u32 {
    3
}

impl Default for ReceiptConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            max_poll_interval_ms: default_max_poll_interval_ms(),
            max_query_retries: default_max_query_retries(),
        }
    }
}

impl ReceiptConfig {
    pub fn policy(&self) -> ReceiptPolicy {
        ReceiptPolicy {
            timeout: Duration::from_secs(self.timeout_secs),
            initial_interval: Duration::from_millis(self.poll_interval_ms),
            max_interval: Duration::from_millis(self.max_poll_interval_ms),
            max_query_retries: self.max_query_retries,
        }
    }
}

// ---------------------------------------------------------------------------
// NetworkConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpc_url: Option<String>,
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default = "default_contracts_dir")]
    pub contracts_dir: PathBuf,
    #[serde(default = "default_abi_dir")]
    pub abi_dir: PathBuf,
    #[serde(default = "default_addresses_file")]
    pub addresses_file: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solc: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub networks: HashMap<Network, NetworkConfig>,
    #[serde(default)]
    pub receipt: ReceiptConfig,
    /// Upper bound on any single RPC request.
    #[serde(default = "default_rpc_timeout_secs")]
    pub rpc_timeout_secs: u64,
    #[serde(default = "neighborhood::live_neighborhoods")]
    pub neighborhoods: Vec<Neighborhood>,
}

fn default_version() -> u32 {
    1
}

fn default_contracts_dir() -> PathBuf {
    PathBuf::from(paths::CONTRACTS_DIR)
}

fn default_abi_dir() -> PathBuf {
    PathBuf::from(paths::ABI_DIR)
}

fn default_rpc_timeout_secs() -> u64 {
    30
}

fn default_addresses_file() -> PathBuf {
    PathBuf::from(paths::ADDRESSES_FILE)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            contracts_dir: default_contracts_dir(),
            abi_dir: default_abi_dir(),
            addresses_file: default_addresses_file(),
            solc: None,
            networks: HashMap::new(),
            receipt: ReceiptConfig::default(),
            rpc_timeout_secs: default_rpc_timeout_secs(),
            neighborhoods: neighborhood::live_neighborhoods(),
        }
    }
}

impl Config {
    /// Load `realfi.yaml`; a project without one runs on defaults.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        match crate::io::read_optional(&path)? {
            Some(data) => Ok(serde_yaml::from_str(&data)?),
            None => Ok(Self::default()),
        }
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&paths::config_path(root), data.as_bytes())
    }

    pub fn contracts_dir(&self, root: &Path) -> PathBuf {
        paths::resolve(root, &self.contracts_dir)
    }

    pub fn abi_dir(&self, root: &Path) -> PathBuf {
        paths::resolve(root, &self.abi_dir)
    }

    pub fn addresses_path(&self, root: &Path) -> PathBuf {
        paths::resolve(root, &self.addresses_file)
    }

    /// RPC endpoint for `network`: explicit override, then config, then the
    /// network's public endpoint.
    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }

    pub fn rpc_url(&self, network: Network, explicit: Option<&str>) -> String {
        explicit
            .map(str::to_string)
            .or_else(|| self.networks.get(&network).and_then(|n| n.rpc_url.clone()))
            .unwrap_or_else(|| network.default_rpc_url().to_string())
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        let mut seen = HashSet::new();
        for n in &self.neighborhoods {
            if n.name.trim().is_empty() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: "neighborhood with an empty name".to_string(),
                });
            } else if !seen.insert(n.name.as_str()) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("neighborhood '{}' is listed more than once", n.name),
                });
            }
            if n.gu.trim().is_empty() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!("neighborhood '{}' has no gu", n.name),
                });
            }
        }

        if self.neighborhoods.is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "no neighborhoods configured; deploy will create no vaults".to_string(),
            });
        }

        if self.receipt.timeout_secs == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "receipt.timeout_secs is 0; every receipt wait would time out".to_string(),
            });
        }

        if self.rpc_timeout_secs == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "rpc_timeout_secs is 0; every RPC request would time out".to_string(),
            });
        }

        if self.receipt.poll_interval_ms > self.receipt.max_poll_interval_ms {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "receipt.poll_interval_ms ({}) exceeds max_poll_interval_ms ({})",
                    self.receipt.poll_interval_ms, self.receipt.max_poll_interval_ms
                ),
            });
        }

        for (network, cfg) in &self.networks {
            if let Some(url) = &cfg.rpc_url {
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    warnings.push(ConfigWarning {
                        level: WarnLevel::Error,
                        message: format!("networks.{network}.rpc_url must be an http(s) URL"),
                    });
                }
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
