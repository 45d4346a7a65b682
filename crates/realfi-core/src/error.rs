use crate::addresses::FactoryAddresses;
use alloy::primitives::{TxHash, U256};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RealfiError {
    // -- preconditions -------------------------------------------------------
    #[error("insufficient balance: need at least {required} wei, have {available} wei")]
    InsufficientFunds { required: U256, available: U256 },

    #[error("missing required argument: {0}")]
    MissingArgument(String),

    #[error("invalid address format: '{0}'")]
    InvalidAddress(String),

    #[error("unknown network '{0}': expected 'sepolia' or 'mainnet'")]
    InvalidNetwork(String),

    #[error("invalid amount '{0}'")]
    InvalidAmount(String),

    #[error("neighborhood '{0}' is listed more than once")]
    DuplicateNeighborhood(String),

    #[error("neighborhood not found: {0}")]
    NeighborhoodNotFound(String),

    #[error("neighborhood already deployed: {0}")]
    NeighborhoodExists(String),

    #[error(
        "factory deployment detected: specify --dong (available: {})",
        .available.join(", ")
    )]
    NeighborhoodRequired { available: Vec<String> },

    #[error("no deployed addresses found: run 'realfi deploy' first")]
    NotDeployed,

    #[error("DongVaultFactory not deployed: run 'realfi deploy' first")]
    FactoryNotDeployed,

    #[error("REALFI_DEPLOYER_PRIVATE_KEY not set (environment or .env.local)")]
    MissingPrivateKey,

    #[error("invalid deployer private key: {0}")]
    InvalidPrivateKey(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    // -- compilation ---------------------------------------------------------
    #[error("contract source not found: {}", .0.display())]
    ContractNotFound(PathBuf),

    #[error("solc not found: install solc, set REALFI_SOLC, or set 'solc' in realfi.yaml")]
    SolcNotFound,

    #[error("compilation failed for {contract}:\n{message}")]
    CompilationFailed { contract: String, message: String },

    #[error("artifact not compiled: {0}")]
    ArtifactMissing(String),

    // -- chain ---------------------------------------------------------------
    #[error("chain query failed: {0}")]
    ChainQuery(String),

    #[error("deployment of {contract} failed: no contract address in receipt for {tx_hash}")]
    DeploymentFailed { contract: String, tx_hash: TxHash },

    #[error("transaction {tx_hash} ({label}) reverted")]
    TransactionReverted { tx_hash: TxHash, label: String },

    #[error("no receipt for {tx_hash} after {waited_secs}s; the transaction may still be pending")]
    ReceiptTimeout { tx_hash: TxHash, waited_secs: u64 },

    #[error("abi error: {0}")]
    Abi(String),

    // -- partial deployment --------------------------------------------------
    #[error(
        "deployment aborted after {} neighborhood(s) were wired; partial record kept for recovery",
        .completed.neighborhoods.len()
    )]
    PartialDeployment {
        completed: Box<FactoryAddresses>,
        #[source]
        source: Box<RealfiError>,
    },

    // -- persistence ---------------------------------------------------------
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Coarse error classes an operator can act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Detected before any transaction was submitted.
    Precondition,
    Compilation,
    Chain,
    PartialDeployment,
    Persistence,
}

impl RealfiError {
    pub fn kind(&self) -> ErrorKind {
        use RealfiError::*;
        match self {
            InsufficientFunds { .. }
            | MissingArgument(_)
            | InvalidAddress(_)
            | InvalidNetwork(_)
            | InvalidAmount(_)
            | DuplicateNeighborhood(_)
            | NeighborhoodNotFound(_)
            | NeighborhoodExists(_)
            | NeighborhoodRequired { .. }
            | NotDeployed
            | FactoryNotDeployed
            | MissingPrivateKey
            | InvalidPrivateKey(_)
            | Config(_) => ErrorKind::Precondition,
            ContractNotFound(_) | SolcNotFound | CompilationFailed { .. } | ArtifactMissing(_) => {
                ErrorKind::Compilation
            }
            ChainQuery(_)
            | DeploymentFailed { .. }
            | TransactionReverted { .. }
            | ReceiptTimeout { .. }
            | Abi(_) => ErrorKind::Chain,
            PartialDeployment { .. } => ErrorKind::PartialDeployment,
            Io(_) | Yaml(_) | Json(_) => ErrorKind::Persistence,
        }
    }
}

pub type Result<T> = std::result::Result<T, RealfiError>;
