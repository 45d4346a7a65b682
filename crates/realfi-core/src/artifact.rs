use crate::error::{RealfiError, Result};
use alloy::primitives::Bytes;
use std::collections::HashMap;

/// ABI and creation bytecode for one contract, as emitted by the compiler.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledArtifact {
    pub name: String,
    pub abi: serde_json::Value,
    pub bytecode: Bytes,
}

impl CompiledArtifact {
    /// Creation code followed by ABI-encoded constructor arguments.
    pub fn init_code(&self, constructor_args: &[u8]) -> Bytes {
        let mut code = Vec::with_capacity(self.bytecode.len() + constructor_args.len());
        code.extend_from_slice(&self.bytecode);
        code.extend_from_slice(constructor_args);
        Bytes::from(code)
    }
}

/// Artifacts keyed by contract name.
#[derive(Debug, Clone, Default)]
pub struct ArtifactSet {
    artifacts: HashMap<String, CompiledArtifact>,
}

impl ArtifactSet {
    pub fn insert(&mut self, artifact: CompiledArtifact) {
        self.artifacts.insert(artifact.name.clone(), artifact);
    }

    pub fn get(&self, name: &str) -> Result<&CompiledArtifact> {
        self.artifacts
            .get(name)
            .ok_or_else(|| RealfiError::ArtifactMissing(name.to_string()))
    }
}
