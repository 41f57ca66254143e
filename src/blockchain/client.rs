//! Blockchain RPC client with timeout and cancellation handling.
//!
//! # Responsibilities
//! - Connect to the JSON-RPC endpoint and probe it once
//! - Query chain state (nonce, chain ID, gas, receipts)
//! - Broadcast signed transactions
//! - Bound every call with a timeout and the shutdown signal

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, TxHash};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::{TransactionReceipt, TransactionRequest};
use alloy::transports::TransportError;
use async_trait::async_trait;
use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, timeout, MissedTickBehavior};

use crate::blockchain::types::{
    BlockchainError, BlockchainResult, CallRequest, ChainConfig, ChainId, ConfirmationPolicy,
    Receipt, ReceiptStatus,
};
use crate::lifecycle::ShutdownSignal;

/// Node primitives the driver depends on.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Transaction count of `address` in the pending state.
    async fn pending_nonce(&self, address: Address) -> BlockchainResult<u64>;

    /// Identifier of the network the node serves.
    async fn chain_id(&self) -> BlockchainResult<ChainId>;

    /// Estimated gas for `call`. Expected to fail sometimes.
    async fn estimate_gas(&self, call: &CallRequest) -> BlockchainResult<u64>;

    /// Current legacy gas price in wei.
    async fn gas_price(&self) -> BlockchainResult<u128>;

    /// Execute a read-only call against the latest state.
    async fn call(&self, call: &CallRequest) -> BlockchainResult<Bytes>;

    /// Broadcast an EIP-2718 encoded signed transaction.
    async fn send_raw_transaction(&self, raw: Bytes) -> BlockchainResult<TxHash>;

    /// Receipt of `tx_hash`, if it has been included.
    async fn get_receipt(&self, tx_hash: TxHash) -> BlockchainResult<Option<Receipt>>;

    /// Block until `tx_hash` has a receipt, the policy timeout elapses or
    /// `shutdown` fires.
    ///
    /// Lookup failures while waiting are reported as `Confirmation` errors:
    /// the transaction may or may not have been included.
    async fn wait_for_receipt(
        &self,
        tx_hash: TxHash,
        policy: &ConfirmationPolicy,
        shutdown: &ShutdownSignal,
    ) -> BlockchainResult<Receipt> {
        let poll = async {
            let mut ticker = interval(policy.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                match self.get_receipt(tx_hash).await {
                    Ok(Some(receipt)) => return Ok(receipt),
                    Ok(None) => {
                        tracing::debug!(tx_hash = %tx_hash, "Transaction pending");
                    }
                    Err(BlockchainError::Cancelled) => return Err(BlockchainError::Cancelled),
                    Err(e) => return Err(BlockchainError::Confirmation(e.to_string())),
                }
            }
        };

        tokio::select! {
            biased;
            _ = shutdown.cancelled() => Err(BlockchainError::Cancelled),
            result = timeout(policy.timeout, poll) => match result {
                Ok(outcome) => outcome,
                Err(_) => Err(BlockchainError::ConfirmationTimeout(policy.timeout)),
            },
        }
    }
}

/// JSON-RPC client over an HTTP provider.
pub struct RpcChainClient {
    provider: Arc<dyn Provider + Send + Sync>,
    rpc_url: String,
    timeout_duration: Duration,
    shutdown: ShutdownSignal,
}

impl RpcChainClient {
    /// Connect to the configured endpoint.
    ///
    /// The HTTP transport is lazy, so the endpoint is probed with
    /// `eth_blockNumber`; an unreachable node is a `Connection` error.
    pub async fn connect(config: &ChainConfig, shutdown: ShutdownSignal) -> BlockchainResult<Self> {
        let url: url::Url = config.rpc_url.parse().map_err(|e| {
            BlockchainError::Connection(format!("Invalid RPC URL '{}': {}", config.rpc_url, e))
        })?;

        let client = Self {
            provider: Arc::new(ProviderBuilder::new().connect_http(url)),
            rpc_url: config.rpc_url.clone(),
            timeout_duration: Duration::from_secs(config.rpc_timeout_secs),
            shutdown,
        };

        let block = client
            .guarded("eth_blockNumber", client.provider.get_block_number(), |e| {
                BlockchainError::Connection(e.to_string())
            })
            .await
            .map_err(|e| match e {
                BlockchainError::Timeout(secs) => BlockchainError::Connection(format!(
                    "{} did not answer within {} seconds",
                    config.rpc_url, secs
                )),
                other => other,
            })?;

        tracing::info!(rpc_url = %config.rpc_url, block = block, "Connected to chain endpoint");
        Ok(client)
    }

    /// Release the endpoint.
    pub fn close(self) {
        tracing::debug!(rpc_url = %self.rpc_url, "Closing chain endpoint");
    }

    /// Run one RPC future under the timeout and the shutdown signal.
    async fn guarded<T, F, E>(&self, method: &'static str, fut: F, on_error: E) -> BlockchainResult<T>
    where
        T: Send,
        F: IntoFuture<Output = Result<T, TransportError>>,
        F::IntoFuture: Send,
        E: FnOnce(TransportError) -> BlockchainError + Send,
    {
        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => Err(BlockchainError::Cancelled),
            result = timeout(self.timeout_duration, fut) => match result {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(e)) => {
                    tracing::warn!(method = method, error = %e, "RPC error");
                    Err(on_error(e))
                }
                Err(_) => {
                    tracing::warn!(method = method, "RPC timeout");
                    Err(BlockchainError::Timeout(self.timeout_duration.as_secs()))
                }
            },
        }
    }
}

fn rpc_error(method: &'static str) -> impl FnOnce(TransportError) -> BlockchainError {
    move |e| BlockchainError::Rpc(format!("{} failed: {}", method, e))
}

/// Separate "the call would revert" from every other estimation failure.
fn classify_estimate_error(e: TransportError) -> BlockchainError {
    if let Some(payload) = e.as_error_resp() {
        if payload.code == 3 || payload.message.to_lowercase().contains("revert") {
            return BlockchainError::EstimationReverted(payload.message.to_string());
        }
    }
    BlockchainError::Rpc(format!("eth_estimateGas failed: {}", e))
}

fn to_request(call: &CallRequest) -> TransactionRequest {
    let request = TransactionRequest::default()
        .with_to(call.to)
        .with_input(call.data.clone())
        .with_value(call.value);
    match call.from {
        Some(from) => request.with_from(from),
        None => request,
    }
}

impl TryFrom<TransactionReceipt> for Receipt {
    type Error = BlockchainError;

    /// A receipt without a block number is not an inclusion record.
    fn try_from(receipt: TransactionReceipt) -> Result<Self, Self::Error> {
        let block_number = receipt.block_number.ok_or_else(|| {
            BlockchainError::Confirmation(format!(
                "receipt for {} has no block number",
                receipt.transaction_hash
            ))
        })?;
        let status = if receipt.status() {
            ReceiptStatus::Succeeded
        } else {
            ReceiptStatus::Reverted
        };
        Ok(Self {
            tx_hash: receipt.transaction_hash,
            block_number,
            gas_used: receipt.gas_used,
            status,
        })
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    async fn pending_nonce(&self, address: Address) -> BlockchainResult<u64> {
        let fut = self.provider.get_transaction_count(address).pending();
        self.guarded("eth_getTransactionCount", fut, rpc_error("eth_getTransactionCount"))
            .await
    }

    async fn chain_id(&self) -> BlockchainResult<ChainId> {
        let fut = self.provider.get_chain_id();
        self.guarded("eth_chainId", fut, rpc_error("eth_chainId"))
            .await
            .map(ChainId)
    }

    async fn estimate_gas(&self, call: &CallRequest) -> BlockchainResult<u64> {
        let fut = self.provider.estimate_gas(to_request(call));
        self.guarded("eth_estimateGas", fut, classify_estimate_error).await
    }

    async fn gas_price(&self) -> BlockchainResult<u128> {
        let fut = self.provider.get_gas_price();
        self.guarded("eth_gasPrice", fut, rpc_error("eth_gasPrice")).await
    }

    async fn call(&self, call: &CallRequest) -> BlockchainResult<Bytes> {
        let fut = self.provider.call(to_request(call));
        self.guarded("eth_call", fut, rpc_error("eth_call")).await
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> BlockchainResult<TxHash> {
        let fut = self.provider.send_raw_transaction(&raw);
        let pending = self
            .guarded("eth_sendRawTransaction", fut, |e| {
                BlockchainError::Submission(e.to_string())
            })
            .await?;
        Ok(*pending.tx_hash())
    }

    async fn get_receipt(&self, tx_hash: TxHash) -> BlockchainResult<Option<Receipt>> {
        let fut = self.provider.get_transaction_receipt(tx_hash);
        self.guarded("eth_getTransactionReceipt", fut, rpc_error("eth_getTransactionReceipt"))
            .await?
            .map(Receipt::try_from)
            .transpose()
    }
}

impl std::fmt::Debug for RpcChainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcChainClient")
            .field("rpc_url", &self.rpc_url)
            .field("timeout_secs", &self.timeout_duration.as_secs())
            .finish()
    }
}
