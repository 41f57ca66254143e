//! Shared utilities for integration testing.

#![allow(dead_code)]

use alloy::consensus::{Transaction, TxEnvelope};
use alloy::eips::eip2718::Decodable2718;
use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::sol_types::{SolCall, SolInterface};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Mutex;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use storage_driver::blockchain::{
    BlockchainError, BlockchainResult, CallRequest, ChainClient, ChainId, Receipt, ReceiptStatus,
    Wallet,
};
use storage_driver::contract::SimpleStorage::{self, SimpleStorageCalls};

/// Anvil's first development key.
pub const TEST_PRIVATE_KEY: &str =
    "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

pub const CHAIN_ID: u64 = 31337;
pub const ESTIMATE: u64 = 26_000;

pub fn wallet() -> Wallet {
    Wallet::from_private_key(TEST_PRIVATE_KEY).unwrap()
}

pub fn contract_address() -> Address {
    Address::repeat_byte(0x5f)
}

/// How the mock answers `estimate_gas`.
#[derive(Debug, Clone, Copy)]
pub enum EstimateMode {
    Ok(u64),
    RpcError,
    Reverted,
}

/// A transaction the mock accepted.
#[derive(Debug, Clone)]
pub struct SentTx {
    pub op: &'static str,
    pub nonce: u64,
    pub gas_limit: u64,
    pub chain_id: Option<u64>,
    pub tx_hash: TxHash,
}

#[derive(Default)]
struct MockState {
    value: U256,
    block: u64,
    sent: Vec<SentTx>,
    receipts: HashMap<TxHash, Receipt>,
    pending: HashMap<TxHash, u32>,
    log: Vec<String>,
}

/// In-memory chain holding one storage contract.
///
/// The pending nonce is the number of accepted transactions, so a write
/// signed with a stale nonce is rejected the way a node would.
pub struct MockChain {
    state: Mutex<MockState>,
    estimate: EstimateMode,
    chain_id_fails: bool,
    revert_on: Option<&'static str>,
    pending_polls: u32,
    never_mine: bool,
}

impl MockChain {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
            estimate: EstimateMode::Ok(ESTIMATE),
            chain_id_fails: false,
            revert_on: None,
            pending_polls: 0,
            never_mine: false,
        }
    }

    pub fn with_estimate(mut self, mode: EstimateMode) -> Self {
        self.estimate = mode;
        self
    }

    pub fn failing_chain_id(mut self) -> Self {
        self.chain_id_fails = true;
        self
    }

    /// Mine `op` writes with a reverted status.
    pub fn reverting(mut self, op: &'static str) -> Self {
        self.revert_on = Some(op);
        self
    }

    /// Report each receipt as missing this many times first.
    pub fn with_pending_polls(mut self, polls: u32) -> Self {
        self.pending_polls = polls;
        self
    }

    pub fn never_mining(mut self) -> Self {
        self.never_mine = true;
        self
    }

    pub fn value(&self) -> U256 {
        self.state.lock().unwrap().value
    }

    pub fn sent(&self) -> Vec<SentTx> {
        self.state.lock().unwrap().sent.clone()
    }

    /// Every call the mock served, in order.
    pub fn log(&self) -> Vec<String> {
        self.state.lock().unwrap().log.clone()
    }

    fn record(&self, entry: impl Into<String>) {
        self.state.lock().unwrap().log.push(entry.into());
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn pending_nonce(&self, _address: Address) -> BlockchainResult<u64> {
        let mut state = self.state.lock().unwrap();
        state.log.push("nonce".into());
        Ok(state.sent.len() as u64)
    }

    async fn chain_id(&self) -> BlockchainResult<ChainId> {
        self.record("chain_id");
        if self.chain_id_fails {
            return Err(BlockchainError::Rpc("eth_chainId failed: connection reset".into()));
        }
        Ok(ChainId(CHAIN_ID))
    }

    async fn estimate_gas(&self, call: &CallRequest) -> BlockchainResult<u64> {
        self.record("estimate");
        assert!(call.from.is_some(), "estimation must name the sender");
        match self.estimate {
            EstimateMode::Ok(gas) => Ok(gas),
            EstimateMode::RpcError => {
                Err(BlockchainError::Rpc("eth_estimateGas failed: method not found".into()))
            }
            EstimateMode::Reverted => {
                Err(BlockchainError::EstimationReverted("execution reverted".into()))
            }
        }
    }

    async fn gas_price(&self) -> BlockchainResult<u128> {
        Ok(1_000_000_000)
    }

    async fn call(&self, call: &CallRequest) -> BlockchainResult<Bytes> {
        let mut state = self.state.lock().unwrap();
        state.log.push("call".into());
        assert_eq!(&call.data[..4], &SimpleStorage::getCall::SELECTOR[..]);
        Ok(Bytes::from(state.value.to_be_bytes::<32>().to_vec()))
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> BlockchainResult<TxHash> {
        let envelope = TxEnvelope::decode_2718(&mut raw.as_ref())
            .map_err(|e| BlockchainError::Submission(format!("undecodable transaction: {}", e)))?;

        let mut state = self.state.lock().unwrap();
        let expected_nonce = state.sent.len() as u64;
        if envelope.nonce() != expected_nonce {
            return Err(BlockchainError::Submission(format!(
                "nonce {} does not match {}",
                envelope.nonce(),
                expected_nonce
            )));
        }
        if envelope.chain_id() != Some(CHAIN_ID) {
            return Err(BlockchainError::Submission("invalid chain id".into()));
        }

        let call = SimpleStorageCalls::abi_decode(envelope.input())
            .map_err(|e| BlockchainError::Submission(format!("unknown call: {}", e)))?;
        let (op, next) = match call {
            SimpleStorageCalls::set(c) => ("set", c.value),
            SimpleStorageCalls::add(c) => ("add", state.value + c.value),
            SimpleStorageCalls::get(_) => ("get", state.value),
        };

        let tx_hash = *envelope.tx_hash();
        state.block += 1;
        let status = if self.revert_on == Some(op) {
            ReceiptStatus::Reverted
        } else {
            state.value = next;
            ReceiptStatus::Succeeded
        };
        let receipt = Receipt {
            tx_hash,
            block_number: state.block,
            gas_used: ESTIMATE,
            status,
        };

        state.log.push(format!("send:{}", op));
        state.sent.push(SentTx {
            op,
            nonce: envelope.nonce(),
            gas_limit: envelope.gas_limit(),
            chain_id: envelope.chain_id(),
            tx_hash,
        });
        state.receipts.insert(tx_hash, receipt);
        state.pending.insert(tx_hash, self.pending_polls);
        Ok(tx_hash)
    }

    async fn get_receipt(&self, tx_hash: TxHash) -> BlockchainResult<Option<Receipt>> {
        let mut state = self.state.lock().unwrap();
        if self.never_mine {
            return Ok(None);
        }
        if let Some(remaining) = state.pending.get_mut(&tx_hash) {
            if *remaining > 0 {
                *remaining -= 1;
                return Ok(None);
            }
        }
        let receipt = state.receipts.get(&tx_hash).cloned();
        if receipt.is_some() {
            state.log.push("receipt".into());
        }
        Ok(receipt)
    }
}

/// Reply of the mock JSON-RPC node.
#[derive(Debug, Clone)]
pub enum RpcReply {
    Result(Value),
    Error { code: i64, message: String },
    Delayed(Duration, Box<RpcReply>),
}

impl RpcReply {
    pub fn result(value: Value) -> Self {
        RpcReply::Result(value)
    }

    pub fn error(code: i64, message: &str) -> Self {
        RpcReply::Error {
            code,
            message: message.to_string(),
        }
    }
}

/// Start a JSON-RPC node on an ephemeral port.
///
/// `handler` sees the method and params of every request. `eth_blockNumber`
/// is answered for the startup probe unless the handler overrides it.
pub async fn start_rpc_node<F>(handler: F) -> SocketAddr
where
    F: Fn(&str, &Value) -> Option<RpcReply> + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handler = std::sync::Arc::new(handler);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let handler = handler.clone();
                    tokio::spawn(async move {
                        let Some(request) = read_request(&mut socket).await else {
                            return;
                        };
                        let method = request["method"].as_str().unwrap_or_default().to_string();
                        let params = request["params"].clone();

                        let reply = match handler(&method, &params) {
                            Some(reply) => reply,
                            None if method == "eth_blockNumber" => RpcReply::result(json!("0x10")),
                            None => RpcReply::error(-32601, "method not found"),
                        };
                        let body = render(request["id"].clone(), reply).await.to_string();

                        let response = format!(
                            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// A port nothing listens on.
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

async fn render(id: Value, mut reply: RpcReply) -> Value {
    loop {
        match reply {
            RpcReply::Delayed(delay, inner) => {
                tokio::time::sleep(delay).await;
                reply = *inner;
            }
            RpcReply::Result(result) => {
                return json!({ "jsonrpc": "2.0", "id": id, "result": result })
            }
            RpcReply::Error { code, message } => {
                return json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "error": { "code": code, "message": message }
                })
            }
        }
    }
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> Option<Value> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let headers = String::from_utf8_lossy(&buf[..header_end]).to_lowercase();
    let content_length = headers
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    serde_json::from_slice(&buf[header_end..header_end + content_length]).ok()
}
