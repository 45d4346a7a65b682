use crate::error::{RealfiError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Target chains the admin tool knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[serde(alias = "mantle-sepolia")]
    Sepolia,
    #[serde(alias = "mantle")]
    Mainnet,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Sepolia => "sepolia",
            Network::Mainnet => "mainnet",
        }
    }

    pub fn chain_id(&self) -> u64 {
        match self {
            Network::Sepolia => 5003,
            Network::Mainnet => 5000,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Network::Sepolia => "Mantle Sepolia Testnet",
            Network::Mainnet => "Mantle",
        }
    }

    pub fn default_rpc_url(&self) -> &'static str {
        match self {
            Network::Sepolia => "https://rpc.sepolia.mantle.xyz",
            Network::Mainnet => "https://rpc.mantle.xyz",
        }
    }

    pub fn explorer_url(&self) -> &'static str {
        match self {
            Network::Sepolia => "https://sepolia.mantlescan.xyz",
            Network::Mainnet => "https://explorer.mantle.xyz",
        }
    }

    pub fn tx_url(&self, tx_hash: impl fmt::Display) -> String {
        format!("{}/tx/{tx_hash}", self.explorer_url())
    }

    pub fn address_url(&self, address: impl fmt::Display) -> String {
        format!("{}/address/{address}", self.explorer_url())
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = RealfiError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sepolia" | "mantle-sepolia" | "testnet" => Ok(Network::Sepolia),
            "mainnet" | "mantle" => Ok(Network::Mainnet),
            other => Err(RealfiError::InvalidNetwork(other.to_string())),
        }
    }
}
