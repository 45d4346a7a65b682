use crate::chain::ChainClient;
use crate::error::Result;
use alloy::primitives::Address;
use tracing::debug;

/// Hands out gap-free nonces for one signer within one orchestration run.
///
/// The chain is consulted once, on the first [`next`](Self::next) after
/// construction or [`reset`](Self::reset); after that the counter is purely
/// local so that transactions which are sent but not yet mined are never
/// double-counted. `&mut self` keeps use sequential.
pub struct NonceSequencer<'c, C: ChainClient + ?Sized> {
    chain: &'c C,
    account: Address,
    next: Option<u64>,
    issued: u64,
}

impl<'c, C: ChainClient + ?Sized> NonceSequencer<'c, C> {
    pub fn new(chain: &'c C) -> Self {
        Self {
            account: chain.signer(),
            chain,
            next: None,
            issued: 0,
        }
    }

    pub fn next(&mut self) -> Result<u64> {
        let nonce = match self.next {
            Some(n) => n,
            None => {
                let n = self.chain.transaction_count(self.account)?;
                debug!(account = %self.account, start = n, "nonce sequence initialised");
                n
            }
        };
        self.next = Some(nonce + 1);
        self.issued += 1;
        Ok(nonce)
    }

    /// Forget the cached counter; the next call re-reads the chain.
    pub fn reset(&mut self) {
        self.next = None;
        self.issued = 0;
    }

    /// Nonces handed out since construction or the last reset.
    pub fn issued(&self) -> u64 {
        self.issued
    }

    /// The nonce the next call will return, if already known.
    pub fn peek(&self) -> Option<u64> {
        self.next
    }
}
