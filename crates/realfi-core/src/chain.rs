//! The chain boundary.
//!
//! Everything above this module talks to the chain through [`ChainClient`], a
//! blocking interface with exactly the operations deployment needs. The
//! production implementation lives in [`crate::rpc`]; tests substitute an
//! in-process mock.

use crate::error::Result;
use alloy::primitives::{Address, Bytes, TxHash, U256};
use serde::Serialize;

/// A transaction to be signed by the client's account and submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRequest {
    /// `None` creates a contract from `input`.
    pub to: Option<Address>,
    pub input: Bytes,
    /// `None` lets the client pick the account's next pending nonce.
    pub nonce: Option<u64>,
}

impl TxRequest {
    pub fn deploy(init_code: Bytes, nonce: Option<u64>) -> Self {
        Self {
            to: None,
            input: init_code,
            nonce,
        }
    }

    pub fn call(to: Address, input: impl Into<Bytes>, nonce: Option<u64>) -> Self {
        Self {
            to: Some(to),
            input: input.into(),
            nonce,
        }
    }

    pub fn is_deploy(&self) -> bool {
        self.to.is_none()
    }
}

/// The subset of a mined receipt this tool inspects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TxReceipt {
    pub tx_hash: TxHash,
    /// `false` when execution reverted.
    pub success: bool,
    pub contract_address: Option<Address>,
    pub block_number: Option<u64>,
}

pub trait ChainClient {
    /// Account that signs every submitted transaction.
    fn signer(&self) -> Address;

    fn balance(&self, address: Address) -> Result<U256>;

    /// Number of transactions mined from `address`, i.e. its next nonce.
    fn transaction_count(&self, address: Address) -> Result<u64>;

    /// Read-only `eth_call` against the latest block.
    fn call(&self, to: Address, input: Bytes) -> Result<Bytes>;

    /// Sign and broadcast; returns once the node accepted the transaction.
    fn submit(&self, tx: TxRequest) -> Result<TxHash>;

    /// Single receipt lookup; `None` while the transaction is pending.
    fn receipt(&self, tx_hash: TxHash) -> Result<Option<TxReceipt>>;
}

impl<C: ChainClient + ?Sized> ChainClient for &C {
    fn signer(&self) -> Address {
        (**self).signer()
    }

    fn balance(&self, address: Address) -> Result<U256> {
        (**self).balance(address)
    }

    fn transaction_count(&self, address: Address) -> Result<u64> {
        (**self).transaction_count(address)
    }

    fn call(&self, to: Address, input: Bytes) -> Result<Bytes> {
        (**self).call(to, input)
    }

    fn submit(&self, tx: TxRequest) -> Result<TxHash> {
        (**self).submit(tx)
    }

    fn receipt(&self, tx_hash: TxHash) -> Result<Option<TxReceipt>> {
        (**self).receipt(tx_hash)
    }
}
