//! Solidity compilation via `solc --standard-json`.
//!
//! Sources are read from the contracts directory and handed to solc inline;
//! imports resolve against the same directory through `--base-path`. Any
//! diagnostic with severity `error` fails the contract, warnings are logged.
//! The ABI of every successful compile is written to the ABI directory so the
//! front end and later admin commands can pick it up.

use crate::artifact::{ArtifactSet, CompiledArtifact};
use crate::error::{RealfiError, Result};
use crate::paths;
use alloy::primitives::{hex, Bytes};
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{info, warn};

pub trait Compiler {
    fn compile(&self, contract: &str) -> Result<CompiledArtifact>;
}

/// Compile every contract in `names`, stopping at the first failure.
pub fn compile_all<C: Compiler + ?Sized>(compiler: &C, names: &[&str]) -> Result<ArtifactSet> {
    let mut set = ArtifactSet::default();
    for name in names {
        set.insert(compiler.compile(name)?);
    }
    Ok(set)
}

// ---------------------------------------------------------------------------
// solc subprocess
// ---------------------------------------------------------------------------

pub struct SolcCompiler {
    solc: PathBuf,
    contracts_dir: PathBuf,
    abi_dir: Option<PathBuf>,
    optimizer_runs: u32,
}

impl SolcCompiler {
    /// Locate solc: explicit path, then `REALFI_SOLC`, then `$PATH`.
    pub fn locate(explicit: Option<&Path>, contracts_dir: impl Into<PathBuf>) -> Result<Self> {
        let solc = match explicit {
            Some(p) => p.to_path_buf(),
            None => match std::env::var_os("REALFI_SOLC") {
                Some(p) => PathBuf::from(p),
                None => which::which("solc").map_err(|_| RealfiError::SolcNotFound)?,
            },
        };
        Ok(Self {
            solc,
            contracts_dir: contracts_dir.into(),
            abi_dir: None,
            optimizer_runs: 200,
        })
    }

    pub fn with_abi_dir(mut self, abi_dir: impl Into<PathBuf>) -> Self {
        self.abi_dir = Some(abi_dir.into());
        self
    }

    fn standard_input(&self, contract: &str, source: &str) -> serde_json::Value {
        serde_json::json!({
            "language": "Solidity",
            "sources": {
                format!("{contract}.sol"): { "content": source }
            },
            "settings": {
                "optimizer": { "enabled": true, "runs": self.optimizer_runs },
                "outputSelection": {
                    "*": { "*": ["abi", "evm.bytecode.object"] }
                }
            }
        })
    }

    fn run_solc(&self, contract: &str, input: &str) -> Result<String> {
        let mut child = Command::new(&self.solc)
            .arg("--standard-json")
            .arg("--base-path")
            .arg(&self.contracts_dir)
            .arg("--allow-paths")
            .arg(&self.contracts_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => RealfiError::SolcNotFound,
                _ => RealfiError::Io(e),
            })?;

        if let Some(stdin) = child.stdin.as_mut() {
            stdin.write_all(input.as_bytes())?;
        }
        let output = child.wait_with_output()?;
        // solc reports compile errors inside the JSON with a zero exit; a
        // non-zero exit means the invocation itself was rejected.
        if !output.status.success() {
            return Err(RealfiError::CompilationFailed {
                contract: contract.to_string(),
                message: format!("solc exited with {}", output.status),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Compiler for SolcCompiler {
    fn compile(&self, contract: &str) -> Result<CompiledArtifact> {
        let path = paths::source_path(&self.contracts_dir, contract);
        if !path.exists() {
            return Err(RealfiError::ContractNotFound(path));
        }
        let source = std::fs::read_to_string(&path)?;

        info!(contract, "compiling");
        let input = self.standard_input(contract, &source);
        let stdout = self.run_solc(contract, &serde_json::to_string(&input)?)?;
        let artifact = parse_output(contract, &stdout)?;

        if let Some(dir) = &self.abi_dir {
            write_abi(dir, &artifact)?;
        }
        info!(contract, bytes = artifact.bytecode.len(), "compiled");
        Ok(artifact)
    }
}

// ---------------------------------------------------------------------------
// Standard-JSON output
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SolcOutput {
    #[serde(default)]
    errors: Vec<SolcDiagnostic>,
    #[serde(default)]
    contracts: HashMap<String, HashMap<String, SolcContract>>,
}

#[derive(Debug, Deserialize)]
struct SolcDiagnostic {
    severity: String,
    #[serde(default)]
    message: String,
    #[serde(default, rename = "formattedMessage")]
    formatted_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SolcContract {
    abi: serde_json::Value,
    evm: SolcEvm,
}

#[derive(Debug, Deserialize)]
struct SolcEvm {
    bytecode: SolcBytecode,
}

#[derive(Debug, Deserialize)]
struct SolcBytecode {
    object: String,
}

/// Extract `contract` from solc's standard-JSON output.
pub fn parse_output(contract: &str, stdout: &str) -> Result<CompiledArtifact> {
    let output: SolcOutput = serde_json::from_str(stdout)?;

    let errors: Vec<&str> = output
        .errors
        .iter()
        .filter(|d| d.severity == "error")
        .map(|d| d.formatted_message.as_deref().unwrap_or(&d.message))
        .collect();
    if !errors.is_empty() {
        return Err(RealfiError::CompilationFailed {
            contract: contract.to_string(),
            message: errors.join("\n"),
        });
    }
    for w in output.errors.iter().filter(|d| d.severity == "warning") {
        warn!(contract, "solc: {}", w.message);
    }

    let compiled = output
        .contracts
        .get(&format!("{contract}.sol"))
        .and_then(|unit| unit.get(contract))
        .ok_or_else(|| RealfiError::CompilationFailed {
            contract: contract.to_string(),
            message: format!("{contract} not found in compilation output"),
        })?;

    let bytecode = hex::decode(compiled.evm.bytecode.object.trim_start_matches("0x")).map_err(
        |e| RealfiError::CompilationFailed {
            contract: contract.to_string(),
            message: format!("invalid bytecode: {e}"),
        },
    )?;
    if bytecode.is_empty() {
        // interfaces and abstract contracts compile to nothing deployable
        return Err(RealfiError::CompilationFailed {
            contract: contract.to_string(),
            message: "empty bytecode (abstract contract or interface?)".to_string(),
        });
    }

    Ok(CompiledArtifact {
        name: contract.to_string(),
        abi: compiled.abi.clone(),
        bytecode: Bytes::from(bytecode),
    })
}

pub fn write_abi(abi_dir: &Path, artifact: &CompiledArtifact) -> Result<()> {
    let data = serde_json::to_string_pretty(&artifact.abi)?;
    crate::io::atomic_write(&paths::abi_path(abi_dir, &artifact.name), data.as_bytes())
}
