//! In-process doubles for the chain and the compiler.

use crate::artifact::CompiledArtifact;
use crate::chain::{ChainClient, TxReceipt, TxRequest};
use crate::compiler::Compiler;
use crate::contracts::{
    IDongVault, IDongVaultFactory, IKYCRegistry, IPausable, IRealFiVault, IStableToken,
};
use crate::error::{RealfiError, Result};
use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::sol_types::SolCall;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::time::Duration;

struct Pending {
    polls_left: u32,
    receipt: TxReceipt,
}

/// A deterministic chain: contract and vault addresses are handed out from a
/// single counter as `0x00..01`, `0x00..02`, ... in submission order.
pub struct MockChain {
    signer: Address,
    balance: Cell<U256>,
    tx_count: Cell<u64>,
    tx_count_calls: Cell<u32>,
    fail_tx_count: Cell<bool>,

    receipt_delay: Cell<u32>,
    receipt_failures: Cell<u32>,
    receipt_stall: Cell<Option<Duration>>,
    receipt_calls: Cell<u32>,

    failing_tx: Cell<Option<usize>>,
    addressless_tx: Cell<Option<usize>>,

    next_address: Cell<u8>,
    sent: RefCell<Vec<TxRequest>>,
    pending: RefCell<HashMap<TxHash, Pending>>,

    vaults: RefCell<HashMap<String, Address>>,
    skip_registration: Cell<bool>,
    paused: RefCell<HashSet<Address>>,
    verified: RefCell<HashSet<Address>>,
    token_balances: RefCell<HashMap<Address, U256>>,
}

impl MockChain {
    pub fn new(tx_count: u64) -> Self {
        Self {
            signer: Address::repeat_byte(0xd0),
            balance: Cell::new(U256::from(10u64).pow(U256::from(18u64))),
            tx_count: Cell::new(tx_count),
            tx_count_calls: Cell::new(0),
            fail_tx_count: Cell::new(false),
            receipt_delay: Cell::new(0),
            receipt_failures: Cell::new(0),
            receipt_stall: Cell::new(None),
            receipt_calls: Cell::new(0),
            failing_tx: Cell::new(None),
            addressless_tx: Cell::new(None),
            next_address: Cell::new(1),
            sent: RefCell::new(Vec::new()),
            pending: RefCell::new(HashMap::new()),
            vaults: RefCell::new(HashMap::new()),
            skip_registration: Cell::new(false),
            paused: RefCell::new(HashSet::new()),
            verified: RefCell::new(HashSet::new()),
            token_balances: RefCell::new(HashMap::new()),
        }
    }

    // -- knobs ---------------------------------------------------------------

    pub fn set_transaction_count(&self, n: u64) {
        self.tx_count.set(n);
    }

    pub fn fail_transaction_count(&self, fail: bool) {
        self.fail_tx_count.set(fail);
    }

    pub fn set_balance(&self, wei: U256) {
        self.balance.set(wei);
    }

    /// Receipts of transactions submitted from now on stay pending for `polls`
    /// lookups.
    pub fn set_receipt_delay(&self, polls: u32) {
        self.receipt_delay.set(polls);
    }

    /// The next `n` receipt lookups fail with a query error.
    pub fn fail_receipt_lookups(&self, n: u32) {
        self.receipt_failures.set(n);
    }

    /// The transaction submitted at zero-based position `index` reverts.
    /// Every receipt lookup takes `delay` and then fails, like a node that
    /// accepts requests but never answers them.
    pub fn stall_receipt_lookups(&self, delay: Duration) {
        self.receipt_stall.set(Some(delay));
    }

    pub fn revert_tx(&self, index: usize) {
        self.failing_tx.set(Some(index));
    }

    /// The deployment submitted at position `index` succeeds without
    /// reporting a contract address.
    pub fn omit_contract_address(&self, index: usize) {
        self.addressless_tx.set(Some(index));
    }

    pub fn set_paused(&self, vault: Address, paused: bool) {
        if paused {
            self.paused.borrow_mut().insert(vault);
        } else {
            self.paused.borrow_mut().remove(&vault);
        }
    }

    /// `createVault` succeeds but the factory keeps no record of the vault.
    pub fn skip_vault_registration(&self) {
        self.skip_registration.set(true);
    }

    pub fn register_vault(&self, name: &str, vault: Address) {
        self.vaults.borrow_mut().insert(name.to_string(), vault);
    }

    // -- inspection ----------------------------------------------------------

    pub fn transaction_count_calls(&self) -> u32 {
        self.tx_count_calls.get()
    }

    pub fn receipt_calls(&self) -> u32 {
        self.receipt_calls.get()
    }

    pub fn sent(&self) -> Vec<TxRequest> {
        self.sent.borrow().clone()
    }

    pub fn sent_nonces(&self) -> Vec<Option<u64>> {
        self.sent.borrow().iter().map(|tx| tx.nonce).collect()
    }

    pub fn is_verified(&self, account: Address) -> bool {
        self.verified.borrow().contains(&account)
    }

    pub fn submit_raw_deploy(&self) -> TxHash {
        match self.submit(TxRequest::deploy(Bytes::from_static(&[0x60, 0x80]), None)) {
            Ok(hash) => hash,
            Err(e) => panic!("mock submit failed: {e}"),
        }
    }

    // -- internals -----------------------------------------------------------

    fn allocate_address(&self) -> Address {
        let n = self.next_address.get();
        self.next_address.set(n + 1);
        Address::with_last_byte(n)
    }

    fn apply_call(&self, to: Address, input: &[u8]) {
        if input.len() < 4 {
            return;
        }
        let selector: [u8; 4] = [input[0], input[1], input[2], input[3]];
        if selector == IDongVaultFactory::createVaultCall::SELECTOR {
            if self.skip_registration.get() {
                return;
            }
            if let Ok(call) = IDongVaultFactory::createVaultCall::abi_decode(input, true) {
                let vault = self.allocate_address();
                self.vaults.borrow_mut().insert(call.dongName, vault);
            }
        } else if selector == IPausable::pauseCall::SELECTOR {
            self.paused.borrow_mut().insert(to);
        } else if selector == IPausable::unpauseCall::SELECTOR {
            self.paused.borrow_mut().remove(&to);
        } else if selector == IKYCRegistry::verifyKYCCall::SELECTOR {
            if let Ok(call) = IKYCRegistry::verifyKYCCall::abi_decode(input, true) {
                self.verified.borrow_mut().insert(call.user);
            }
        } else if selector == IKYCRegistry::revokeKYCCall::SELECTOR {
            if let Ok(call) = IKYCRegistry::revokeKYCCall::abi_decode(input, true) {
                self.verified.borrow_mut().remove(&call.user);
            }
        } else if selector == IStableToken::mintCall::SELECTOR {
            if let Ok(call) = IStableToken::mintCall::abi_decode(input, true) {
                *self.token_balances.borrow_mut().entry(call.to).or_default() += call.amount;
            }
        }
        // setVault and anything else: accepted, no observable state
    }
}

impl ChainClient for MockChain {
    fn signer(&self) -> Address {
        self.signer
    }

    fn balance(&self, _address: Address) -> Result<U256> {
        Ok(self.balance.get())
    }

    fn transaction_count(&self, _address: Address) -> Result<u64> {
        self.tx_count_calls.set(self.tx_count_calls.get() + 1);
        if self.fail_tx_count.get() {
            return Err(RealfiError::ChainQuery("connection refused".into()));
        }
        Ok(self.tx_count.get())
    }

    fn call(&self, to: Address, input: Bytes) -> Result<Bytes> {
        let input = input.as_ref();
        if input.len() < 4 {
            return Err(RealfiError::ChainQuery("empty calldata".into()));
        }
        let selector: [u8; 4] = [input[0], input[1], input[2], input[3]];

        let out = if selector == IDongVaultFactory::getVaultCall::SELECTOR {
            let call = IDongVaultFactory::getVaultCall::abi_decode(input, true)
                .map_err(|e| RealfiError::Abi(e.to_string()))?;
            let vault = self
                .vaults
                .borrow()
                .get(&call.dongName)
                .copied()
                .unwrap_or(Address::ZERO);
            IDongVaultFactory::getVaultCall::abi_encode_returns(&(vault,))
        } else if selector == IPausable::pausedCall::SELECTOR {
            IPausable::pausedCall::abi_encode_returns(&(self.paused.borrow().contains(&to),))
        } else if selector == IKYCRegistry::isVerifiedCall::SELECTOR {
            let call = IKYCRegistry::isVerifiedCall::abi_decode(input, true)
                .map_err(|e| RealfiError::Abi(e.to_string()))?;
            IKYCRegistry::isVerifiedCall::abi_encode_returns(&(self.is_verified(call.user),))
        } else if selector == IStableToken::balanceOfCall::SELECTOR {
            let call = IStableToken::balanceOfCall::abi_decode(input, true)
                .map_err(|e| RealfiError::Abi(e.to_string()))?;
            let balance = self
                .token_balances
                .borrow()
                .get(&call.account)
                .copied()
                .unwrap_or_default();
            IStableToken::balanceOfCall::abi_encode_returns(&(balance,))
        } else if selector == IStableToken::totalSupplyCall::SELECTOR {
            let supply = self
                .token_balances
                .borrow()
                .values()
                .fold(U256::ZERO, |acc, v| acc + *v);
            IStableToken::totalSupplyCall::abi_encode_returns(&(supply,))
        } else if selector == IDongVault::dongNameCall::SELECTOR {
            let name = self
                .vaults
                .borrow()
                .iter()
                .find(|(_, addr)| **addr == to)
                .map(|(name, _)| name.clone())
                .unwrap_or_default();
            IDongVault::dongNameCall::abi_encode_returns(&(name,))
        } else if selector == IDongVault::totalDepositedCall::SELECTOR {
            IDongVault::totalDepositedCall::abi_encode_returns(&(U256::from(1_500_000u64),))
        } else if selector == IDongVault::participantCountCall::SELECTOR {
            IDongVault::participantCountCall::abi_encode_returns(&(U256::from(3u64),))
        } else if selector == IRealFiVault::projectCountCall::SELECTOR {
            IRealFiVault::projectCountCall::abi_encode_returns(&(U256::from(2u64),))
        } else if selector == IRealFiVault::activeProjectIdCall::SELECTOR {
            IRealFiVault::activeProjectIdCall::abi_encode_returns(&(U256::from(1u64),))
        } else {
            return Err(RealfiError::ChainQuery("execution reverted".into()));
        };
        Ok(Bytes::from(out))
    }

    fn submit(&self, tx: TxRequest) -> Result<TxHash> {
        let index = self.sent.borrow().len();
        let hash = TxHash::from(U256::from(index as u64 + 1).to_be_bytes::<32>());

        let reverted = self.failing_tx.get() == Some(index);
        let mut contract_address = None;
        if !reverted {
            match tx.to {
                None => {
                    let addr = self.allocate_address();
                    if self.addressless_tx.get() != Some(index) {
                        contract_address = Some(addr);
                    }
                }
                Some(to) => self.apply_call(to, &tx.input),
            }
        }

        self.tx_count.set(self.tx_count.get() + 1);
        self.sent.borrow_mut().push(tx);
        self.pending.borrow_mut().insert(
            hash,
            Pending {
                polls_left: self.receipt_delay.get(),
                receipt: TxReceipt {
                    tx_hash: hash,
                    success: !reverted,
                    contract_address,
                    block_number: Some(index as u64 + 1),
                },
            },
        );
        Ok(hash)
    }

    fn receipt(&self, tx_hash: TxHash) -> Result<Option<TxReceipt>> {
        self.receipt_calls.set(self.receipt_calls.get() + 1);
        if let Some(delay) = self.receipt_stall.get() {
            std::thread::sleep(delay);
            return Err(RealfiError::ChainQuery(format!(
                "eth_getTransactionReceipt: no response within {}ms",
                delay.as_millis()
            )));
        }
        let failures = self.receipt_failures.get();
        if failures > 0 {
            self.receipt_failures.set(failures - 1);
            return Err(RealfiError::ChainQuery("receipt lookup timed out".into()));
        }
        let mut pending = self.pending.borrow_mut();
        match pending.get_mut(&tx_hash) {
            Some(p) if p.polls_left > 0 => {
                p.polls_left -= 1;
                Ok(None)
            }
            Some(p) => Ok(Some(p.receipt.clone())),
            None => Ok(None),
        }
    }
}

/// Deterministic compiler: bytecode is the contract name's bytes.
#[derive(Default)]
pub struct FixtureCompiler {
    failing: Option<String>,
    compiled: RefCell<Vec<String>>,
}

impl FixtureCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(contract: &str) -> Self {
        Self {
            failing: Some(contract.to_string()),
            compiled: RefCell::new(Vec::new()),
        }
    }

    pub fn compiled(&self) -> Vec<String> {
        self.compiled.borrow().clone()
    }
}

impl Compiler for FixtureCompiler {
    fn compile(&self, contract: &str) -> Result<CompiledArtifact> {
        if self.failing.as_deref() == Some(contract) {
            return Err(RealfiError::CompilationFailed {
                contract: contract.to_string(),
                message: format!("{contract}.sol:1:1: ParserError: Expected pragma"),
            });
        }
        self.compiled.borrow_mut().push(contract.to_string());
        Ok(CompiledArtifact {
            name: contract.to_string(),
            abi: serde_json::json!([]),
            bytecode: Bytes::from(contract.as_bytes().to_vec()),
        })
    }
}
