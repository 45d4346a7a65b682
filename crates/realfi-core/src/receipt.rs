use crate::chain::{ChainClient, TxReceipt};
use crate::error::{RealfiError, Result};
use alloy::primitives::TxHash;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// How long and how often to poll for a mined receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiptPolicy {
    pub timeout: Duration,
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub max_query_retries: u32,
}

impl Default for ReceiptPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(120),
            initial_interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(8),
            max_query_retries: 3,
        }
    }
}

pub struct ExponentialBackoff {
    initial: Duration,
    max: Duration,
    multiplier: f64,
    current_attempt: u32,
}

impl ExponentialBackoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            multiplier: 2.0,
            current_attempt: 0,
        }
    }

    pub fn next_delay(&mut self) -> Duration {
        let delay = if self.current_attempt == 0 {
            self.initial.min(self.max)
        } else {
            let factor = self.multiplier.powi(self.current_attempt as i32);
            let ms = (self.initial.as_millis() as f64 * factor).min(self.max.as_millis() as f64);
            Duration::from_millis(ms as u64)
        };
        self.current_attempt = self.current_attempt.saturating_add(1);
        delay
    }

    pub fn current_attempt(&self) -> u32 {
        self.current_attempt
    }
}

/// Poll until `tx_hash` is mined or `policy.timeout` elapses.
///
/// A pending transaction past the deadline is [`RealfiError::ReceiptTimeout`],
/// never a revert. Lookup errors are tolerated up to `max_query_retries` in a
/// row; the next one is returned as-is unless the deadline has already passed,
/// in which case the wait ends as a timeout.
pub fn wait_for_receipt<C: ChainClient + ?Sized>(
    chain: &C,
    tx_hash: TxHash,
    policy: &ReceiptPolicy,
) -> Result<TxReceipt> {
    let started = Instant::now();
    let mut backoff = ExponentialBackoff::new(policy.initial_interval, policy.max_interval);
    let mut failures = 0u32;

    let timed_out = |elapsed: Duration| RealfiError::ReceiptTimeout {
        tx_hash,
        waited_secs: elapsed.as_secs(),
    };

    loop {
        match chain.receipt(tx_hash) {
            Ok(Some(receipt)) => return Ok(receipt),
            Ok(None) => failures = 0,
            Err(e) => {
                failures += 1;
                let elapsed = started.elapsed();
                if elapsed >= policy.timeout {
                    warn!(%tx_hash, "receipt lookup failed at the deadline: {e}");
                    return Err(timed_out(elapsed));
                }
                if failures > policy.max_query_retries {
                    return Err(e);
                }
                warn!(%tx_hash, attempt = failures, "receipt lookup failed: {e}");
            }
        }

        let elapsed = started.elapsed();
        if elapsed >= policy.timeout {
            return Err(timed_out(elapsed));
        }
        let delay = backoff.next_delay().min(policy.timeout - elapsed);
        debug!(%tx_hash, attempt = backoff.current_attempt(), ?delay, "receipt pending");
        std::thread::sleep(delay);
    }
}
