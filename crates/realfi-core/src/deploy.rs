use crate::artifact::CompiledArtifact;
use crate::chain::{ChainClient, TxReceipt, TxRequest};
use crate::error::{RealfiError, Result};
use crate::receipt::{wait_for_receipt, ReceiptPolicy};
use alloy::primitives::{Address, Bytes, TxHash};
use serde::Serialize;
use tracing::info;

/// A contract confirmed on chain by its creation receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentRecord {
    pub contract: String,
    pub address: Address,
    pub constructor_args: Bytes,
    pub tx_hash: TxHash,
}

/// Submits transactions and blocks on each receipt.
pub struct Deployer<'c, C: ChainClient + ?Sized> {
    chain: &'c C,
    policy: ReceiptPolicy,
}

impl<'c, C: ChainClient + ?Sized> Deployer<'c, C> {
    pub fn new(chain: &'c C, policy: ReceiptPolicy) -> Self {
        Self { chain, policy }
    }

    pub fn chain(&self) -> &'c C {
        self.chain
    }

    /// Deploy `artifact` with ABI-encoded `constructor_args`.
    ///
    /// An explicit `nonce` is passed through verbatim; `None` leaves the
    /// choice to the signing layer.
    pub fn deploy(
        &self,
        artifact: &CompiledArtifact,
        constructor_args: &[u8],
        nonce: Option<u64>,
    ) -> Result<DeploymentRecord> {
        let tx = TxRequest::deploy(artifact.init_code(constructor_args), nonce);
        let tx_hash = self.chain.submit(tx)?;
        info!(contract = %artifact.name, ?nonce, %tx_hash, "deployment submitted");

        let receipt = wait_for_receipt(self.chain, tx_hash, &self.policy)?;
        let address = match receipt.contract_address {
            Some(address) if receipt.success => address,
            _ => {
                return Err(RealfiError::DeploymentFailed {
                    contract: artifact.name.clone(),
                    tx_hash,
                })
            }
        };
        info!(contract = %artifact.name, %address, "deployed");

        Ok(DeploymentRecord {
            contract: artifact.name.clone(),
            address,
            constructor_args: Bytes::copy_from_slice(constructor_args),
            tx_hash,
        })
    }

    /// Send a state-changing call and wait for it to be mined successfully.
    pub fn send(
        &self,
        to: Address,
        input: impl Into<Bytes>,
        nonce: Option<u64>,
        label: &str,
    ) -> Result<TxReceipt> {
        let tx_hash = self.chain.submit(TxRequest::call(to, input, nonce))?;
        info!(label, %to, ?nonce, %tx_hash, "transaction submitted");

        let receipt = wait_for_receipt(self.chain, tx_hash, &self.policy)?;
        if !receipt.success {
            return Err(RealfiError::TransactionReverted {
                tx_hash,
                label: label.to_string(),
            });
        }
        Ok(receipt)
    }

    pub fn read(&self, to: Address, input: impl Into<Bytes>) -> Result<Bytes> {
        self.chain.call(to, input.into())
    }
}
