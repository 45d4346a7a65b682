//! JSON-RPC implementation of [`ChainClient`] over alloy.
//!
//! Transactions are signed locally with the deployer key and broadcast raw.
//! Mantle accepts legacy pricing, so every transaction carries the node's gas
//! price and an estimated limit with 20% headroom. The provider is async; a
//! private current-thread runtime drives each call to completion so that the
//! rest of the crate stays blocking. Every request is bounded by the call
//! timeout; a node that stops answering surfaces as [`RealfiError::ChainQuery`].

use crate::chain::{ChainClient, TxReceipt, TxRequest};
use crate::error::{RealfiError, Result};
use crate::network::Network;
use alloy::eips::eip2718::Encodable2718;
use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::providers::{Provider, ProviderBuilder, RootProvider};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::http::reqwest::Url;
use alloy::transports::http::{Client, Http};
use std::future::IntoFuture;
use std::str::FromStr;
use std::time::Duration;
use tokio::runtime::Runtime;
use tracing::debug;

const GAS_HEADROOM_PERCENT: u64 = 20;

pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

pub struct RpcChain {
    runtime: Runtime,
    provider: RootProvider<Http<Client>>,
    wallet: EthereumWallet,
    signer: Address,
    chain_id: u64,
    call_timeout: Duration,
}

/// Parse a hex private key, with or without `0x`.
pub fn load_private_key(raw: Option<&str>) -> Result<PrivateKeySigner> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty());
    let Some(raw) = raw else {
        return Err(RealfiError::MissingPrivateKey);
    };
    let hex = raw.strip_prefix("0x").unwrap_or(raw);
    // never echo the key back
    PrivateKeySigner::from_str(hex)
        .map_err(|_| RealfiError::InvalidPrivateKey("expected 32 bytes of hex".to_string()))
}

fn query_err(what: &str) -> impl FnOnce(alloy::transports::TransportError) -> RealfiError + '_ {
    move |e| RealfiError::ChainQuery(format!("{what}: {e}"))
}

fn bounded<F: IntoFuture>(
    runtime: &Runtime,
    limit: Duration,
    what: &str,
    fut: F,
) -> Result<F::Output> {
    runtime
        .block_on(tokio::time::timeout(limit, fut.into_future()))
        .map_err(|_| {
            RealfiError::ChainQuery(format!("{what}: no response within {}ms", limit.as_millis()))
        })
}

impl RpcChain {
    /// Connect to `rpc_url` and check that it serves `network`. No single
    /// request may take longer than `call_timeout`.
    pub fn connect(
        rpc_url: &str,
        signer: PrivateKeySigner,
        network: Network,
        call_timeout: Duration,
    ) -> Result<Self> {
        let url: Url = rpc_url
            .parse()
            .map_err(|e| RealfiError::Config(format!("invalid RPC URL '{rpc_url}': {e}")))?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let provider = ProviderBuilder::new().on_http(url);

        let chain_id = bounded(&runtime, call_timeout, "eth_chainId", provider.get_chain_id())?
            .map_err(query_err("eth_chainId"))?;
        if chain_id != network.chain_id() {
            return Err(RealfiError::Config(format!(
                "RPC at {rpc_url} serves chain {chain_id}, but {} is chain {}",
                network.display_name(),
                network.chain_id()
            )));
        }
        debug!(rpc_url, chain_id, "connected");

        let address = signer.address();
        Ok(Self {
            runtime,
            provider,
            wallet: EthereumWallet::from(signer),
            signer: address,
            chain_id,
            call_timeout,
        })
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    fn block_on<F: IntoFuture>(&self, what: &str, fut: F) -> Result<F::Output> {
        bounded(&self.runtime, self.call_timeout, what, fut)
    }

    async fn build_raw(&self, tx: TxRequest) -> Result<Bytes> {
        let nonce = match tx.nonce {
            Some(n) => n,
            None => self
                .provider
                .get_transaction_count(self.signer)
                .pending()
                .await
                .map_err(query_err("eth_getTransactionCount"))?,
        };

        let mut request = TransactionRequest::default()
            .with_from(self.signer)
            .with_chain_id(self.chain_id)
            .with_nonce(nonce);
        request = match tx.to {
            Some(to) => request.with_to(to).with_input(tx.input),
            None => request.with_deploy_code(tx.input),
        };

        let gas_price = self
            .provider
            .get_gas_price()
            .await
            .map_err(query_err("eth_gasPrice"))?;
        let estimate = self
            .provider
            .estimate_gas(&request)
            .await
            .map_err(query_err("eth_estimateGas"))?;
        let gas_limit = estimate + estimate * GAS_HEADROOM_PERCENT / 100;
        request = request.with_gas_price(gas_price).with_gas_limit(gas_limit);

        let signed = request
            .build(&self.wallet)
            .await
            .map_err(|e| RealfiError::ChainQuery(format!("signing failed: {e}")))?;
        debug!(nonce, gas_limit, gas_price, "signed transaction");
        Ok(Bytes::from(signed.encoded_2718()))
    }
}

impl ChainClient for RpcChain {
    fn signer(&self) -> Address {
        self.signer
    }

    fn balance(&self, address: Address) -> Result<U256> {
        self.block_on("eth_getBalance", self.provider.get_balance(address))?
            .map_err(query_err("eth_getBalance"))
    }

    fn transaction_count(&self, address: Address) -> Result<u64> {
        self.block_on(
            "eth_getTransactionCount",
            self.provider.get_transaction_count(address),
        )?
        .map_err(query_err("eth_getTransactionCount"))
    }

    fn call(&self, to: Address, input: Bytes) -> Result<Bytes> {
        let request = TransactionRequest::default().with_to(to).with_input(input);
        self.block_on("eth_call", self.provider.call(&request))?
            .map_err(query_err("eth_call"))
    }

    fn submit(&self, tx: TxRequest) -> Result<TxHash> {
        self.block_on("eth_sendRawTransaction", async {
            let raw = self.build_raw(tx).await?;
            let pending = self
                .provider
                .send_raw_transaction(&raw)
                .await
                .map_err(query_err("eth_sendRawTransaction"))?;
            Ok::<_, RealfiError>(*pending.tx_hash())
        })?
    }

    fn receipt(&self, tx_hash: TxHash) -> Result<Option<TxReceipt>> {
        let receipt = self
            .block_on(
                "eth_getTransactionReceipt",
                self.provider.get_transaction_receipt(tx_hash),
            )?
            .map_err(query_err("eth_getTransactionReceipt"))?;
        Ok(receipt.map(|r| TxReceipt {
            tx_hash: r.transaction_hash,
            success: r.status(),
            contract_address: r.contract_address,
            block_number: r.block_number,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::receipt::{wait_for_receipt, ReceiptPolicy};
    use alloy::consensus::{Transaction, TxEnvelope};
    use alloy::eips::eip2718::Decodable2718;
    use alloy::primitives::hex;
    use mockito::{Matcher, Server, ServerGuard};
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::sync::{Arc, Mutex};
    use std::time::Instant;

    // Hardhat's first well-known dev key.
    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn rpc_result(server: &mut ServerGuard, method: &str, result: serde_json::Value) -> mockito::Mock {
        server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(serde_json::json!({ "method": method })))
            .with_header("content-type", "application/json")
            .with_body_from_request(move |req| {
                let id = req
                    .body()
                    .ok()
                    .and_then(|b| serde_json::from_slice::<serde_json::Value>(b).ok())
                    .map(|v| v["id"].clone())
                    .unwrap_or(serde_json::Value::from(0));
                serde_json::json!({ "jsonrpc": "2.0", "id": id, "result": result.clone() })
                    .to_string()
                    .into_bytes()
            })
            .create()
    }

    #[test]
    fn private_key_prefix_is_optional() {
        let with = load_private_key(Some(DEV_KEY)).unwrap();
        let without = load_private_key(Some(DEV_KEY.trim_start_matches("0x"))).unwrap();
        assert_eq!(with.address(), without.address());
        assert_eq!(
            with.address(),
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266".parse::<Address>().unwrap()
        );
    }

    #[test]
    fn missing_and_malformed_keys() {
        assert!(matches!(load_private_key(None), Err(RealfiError::MissingPrivateKey)));
        assert!(matches!(load_private_key(Some("  ")), Err(RealfiError::MissingPrivateKey)));
        match load_private_key(Some("0xdeadbeef")) {
            Err(RealfiError::InvalidPrivateKey(msg)) => assert!(!msg.contains("deadbeef")),
            other => panic!("expected invalid key, got {other:?}"),
        }
    }

    #[test]
    fn reads_count_and_balance_over_http() {
        let mut server = Server::new();
        let _chain = rpc_result(&mut server, "eth_chainId", serde_json::json!("0x138b"));
        let _count = rpc_result(&mut server, "eth_getTransactionCount", serde_json::json!("0x7"));
        let _balance = rpc_result(
            &mut server,
            "eth_getBalance",
            serde_json::json!("0xde0b6b3a7640000"),
        );

        let signer = load_private_key(Some(DEV_KEY)).unwrap();
        let chain = RpcChain::connect(&server.url(), signer, Network::Sepolia, DEFAULT_CALL_TIMEOUT).unwrap();
        assert_eq!(chain.chain_id(), 5003);
        assert_eq!(chain.transaction_count(chain.signer()).unwrap(), 7);
        assert_eq!(
            chain.balance(chain.signer()).unwrap(),
            U256::from(1_000_000_000_000_000_000u64)
        );
    }

    #[test]
    fn wrong_chain_is_rejected() {
        let mut server = Server::new();
        let _chain = rpc_result(&mut server, "eth_chainId", serde_json::json!("0x1388"));
        let signer = load_private_key(Some(DEV_KEY)).unwrap();
        match RpcChain::connect(&server.url(), signer, Network::Sepolia, DEFAULT_CALL_TIMEOUT) {
            Err(RealfiError::Config(msg)) => assert!(msg.contains("5000")),
            Err(other) => panic!("expected chain mismatch, got {other}"),
            Ok(_) => panic!("expected chain mismatch"),
        }
    }

    fn connected(server: &ServerGuard) -> RpcChain {
        let signer = load_private_key(Some(DEV_KEY)).unwrap();
        RpcChain::connect(&server.url(), signer, Network::Sepolia, DEFAULT_CALL_TIMEOUT).unwrap()
    }

    #[test]
    fn explicit_nonce_is_signed_verbatim() {
        let mut server = Server::new();
        let _chain = rpc_result(&mut server, "eth_chainId", serde_json::json!("0x138b"));
        let count = server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(
                serde_json::json!({ "method": "eth_getTransactionCount" }),
            ))
            .expect(0)
            .create();
        let _price = rpc_result(&mut server, "eth_gasPrice", serde_json::json!("0x3b9aca00"));
        let _estimate = rpc_result(&mut server, "eth_estimateGas", serde_json::json!("0x5208"));

        let raw_seen = Arc::new(Mutex::new(None::<String>));
        let sink = Arc::clone(&raw_seen);
        let hash = format!("0x{}", "11".repeat(32));
        let reply_hash = hash.clone();
        let _send = server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(
                serde_json::json!({ "method": "eth_sendRawTransaction" }),
            ))
            .with_header("content-type", "application/json")
            .with_body_from_request(move |req| {
                let body: serde_json::Value =
                    serde_json::from_slice(req.body().unwrap()).unwrap();
                *sink.lock().unwrap() = body["params"][0].as_str().map(str::to_string);
                serde_json::json!({ "jsonrpc": "2.0", "id": body["id"], "result": reply_hash })
                    .to_string()
                    .into_bytes()
            })
            .create();

        let chain = connected(&server);
        let target = Address::with_last_byte(3);
        let input = Bytes::from_static(&[0xde, 0xad, 0xbe, 0xef]);
        let sent = chain
            .submit(TxRequest::call(target, input.clone(), Some(42)))
            .unwrap();
        assert_eq!(sent, hash.parse::<TxHash>().unwrap());
        count.assert();

        let raw = raw_seen.lock().unwrap().clone().unwrap();
        let bytes = hex::decode(raw.trim_start_matches("0x")).unwrap();
        let envelope = TxEnvelope::decode_2718(&mut bytes.as_slice()).unwrap();
        assert!(envelope.is_legacy());
        assert_eq!(envelope.nonce(), 42);
        assert_eq!(envelope.chain_id(), Some(5003));
        // 21000 estimated plus 20%
        assert_eq!(envelope.gas_limit(), 25_200);
        assert_eq!(envelope.gas_price(), Some(1_000_000_000));
        assert_eq!(envelope.input(), &input);
    }

    fn receipt_json(status: &str, contract: Option<&str>) -> serde_json::Value {
        serde_json::json!({
            "transactionHash": format!("0x{}", "22".repeat(32)),
            "transactionIndex": "0x0",
            "blockHash": format!("0x{}", "33".repeat(32)),
            "blockNumber": "0x10",
            "from": "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266",
            "to": if contract.is_some() { serde_json::Value::Null } else { serde_json::json!("0x0000000000000000000000000000000000000003") },
            "cumulativeGasUsed": "0x5208",
            "gasUsed": "0x5208",
            "effectiveGasPrice": "0x3b9aca00",
            "contractAddress": contract,
            "logs": [],
            "logsBloom": format!("0x{}", "00".repeat(256)),
            "status": status,
            "type": "0x0"
        })
    }

    #[test]
    fn deploy_receipt_carries_contract_address() {
        let mut server = Server::new();
        let _chain = rpc_result(&mut server, "eth_chainId", serde_json::json!("0x138b"));
        let _receipt = rpc_result(
            &mut server,
            "eth_getTransactionReceipt",
            receipt_json("0x1", Some("0x0000000000000000000000000000000000000005")),
        );

        let chain = connected(&server);
        let receipt = chain.receipt(TxHash::repeat_byte(0x22)).unwrap().unwrap();
        assert!(receipt.success);
        assert_eq!(receipt.tx_hash, TxHash::repeat_byte(0x22));
        assert_eq!(receipt.contract_address, Some(Address::with_last_byte(5)));
        assert_eq!(receipt.block_number, Some(16));
    }

    #[test]
    fn failed_call_receipt_has_no_contract_address() {
        let mut server = Server::new();
        let _chain = rpc_result(&mut server, "eth_chainId", serde_json::json!("0x138b"));
        let _receipt = rpc_result(
            &mut server,
            "eth_getTransactionReceipt",
            receipt_json("0x0", None),
        );

        let chain = connected(&server);
        let receipt = chain.receipt(TxHash::repeat_byte(0x22)).unwrap().unwrap();
        assert!(!receipt.success);
        assert_eq!(receipt.contract_address, None);
    }

    #[test]
    fn pending_receipt_is_none() {
        let mut server = Server::new();
        let _chain = rpc_result(&mut server, "eth_chainId", serde_json::json!("0x138b"));
        let _receipt = rpc_result(
            &mut server,
            "eth_getTransactionReceipt",
            serde_json::Value::Null,
        );
        let chain = connected(&server);
        assert_eq!(chain.receipt(TxHash::repeat_byte(0x22)).unwrap(), None);
    }

    // -- a node that answers eth_chainId and then goes silent ----------------

    fn read_body(stream: &mut TcpStream) -> Option<String> {
        let mut data = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = stream.read(&mut buf).ok()?;
            if n == 0 {
                return None;
            }
            data.extend_from_slice(&buf[..n]);
            let Some(end) = data.windows(4).position(|w| w == b"\r\n\r\n") else {
                continue;
            };
            let headers = String::from_utf8_lossy(&data[..end]).to_ascii_lowercase();
            let len = headers
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if data.len() >= end + 4 + len {
                return Some(String::from_utf8_lossy(&data[end + 4..end + 4 + len]).into_owned());
            }
        }
    }

    fn silent_node() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        std::thread::spawn(move || {
            let mut held = Vec::new();
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { continue };
                let Some(body) = read_body(&mut stream) else { continue };
                let request: serde_json::Value = serde_json::from_str(&body).unwrap_or_default();
                if request["method"] == "eth_chainId" {
                    let reply = serde_json::json!({
                        "jsonrpc": "2.0",
                        "id": request["id"],
                        "result": "0x138b"
                    })
                    .to_string();
                    let _ = write!(
                        stream,
                        "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{reply}",
                        reply.len()
                    );
                } else {
                    // accepted, never answered
                    held.push(stream);
                }
            }
        });
        url
    }

    #[test]
    fn silent_node_is_bounded_by_call_timeout() {
        let url = silent_node();
        let signer = load_private_key(Some(DEV_KEY)).unwrap();
        let chain =
            RpcChain::connect(&url, signer, Network::Sepolia, Duration::from_millis(200)).unwrap();

        match chain.receipt(TxHash::ZERO) {
            Err(RealfiError::ChainQuery(msg)) => assert!(msg.contains("no response within 200ms")),
            other => panic!("expected a bounded lookup, got {other:?}"),
        }

        let policy = ReceiptPolicy {
            timeout: Duration::from_secs(1),
            initial_interval: Duration::from_millis(50),
            max_interval: Duration::from_millis(100),
            max_query_retries: 100,
        };
        let started = Instant::now();
        match wait_for_receipt(&chain, TxHash::ZERO, &policy) {
            Err(RealfiError::ReceiptTimeout { .. }) => {}
            other => panic!("expected receipt timeout, got {other:?}"),
        }
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
