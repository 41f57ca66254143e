//! Chain-specific types and error definitions.

use alloy::primitives::{Address, Bytes, TxHash, U256};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

// Re-export ChainConfig from config module to avoid duplication
pub use crate::config::schema::{ChainConfig, ConfirmationConfig, GasConfig};

/// Chain ID type for strong typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChainId(pub u64);

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<ChainId> for u64 {
    fn from(id: ChainId) -> Self {
        id.0
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors that can occur during blockchain operations.
#[derive(Debug, Error)]
pub enum BlockchainError {
    /// The node could not be reached at startup.
    #[error("Connection error: {0}")]
    Connection(String),

    /// RPC connection or request failed.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// RPC request timed out.
    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// Invalid private key format or derivation error.
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Pending nonce could not be fetched.
    #[error("Nonce lookup failed: {0}")]
    NonceLookup(String),

    /// Chain identifier could not be fetched or is unusable.
    #[error("Chain ID lookup failed: {0}")]
    ChainIdLookup(String),

    /// Chain configuration mismatch.
    #[error("Chain ID mismatch: expected {expected}, got {actual}")]
    ChainMismatch { expected: u64, actual: u64 },

    /// Gas estimation simulated the call and it reverted.
    #[error("Gas estimation reverted: {0}")]
    EstimationReverted(String),

    /// Signing or broadcast was rejected.
    #[error("Submission failed: {0}")]
    Submission(String),

    /// The network failed while waiting for a receipt; outcome unknown.
    #[error("Confirmation failed: {0}")]
    Confirmation(String),

    /// Transaction was not confirmed within expected time.
    #[error("Transaction not confirmed after {0:?}")]
    ConfirmationTimeout(Duration),

    /// Transaction was mined but reverted on-chain.
    #[error("Transaction {tx_hash} reverted in block {block_number}")]
    Reverted { tx_hash: TxHash, block_number: u64 },

    /// Call result could not be decoded against the contract interface.
    #[error("Decode error: {0}")]
    Decode(String),

    /// The run was cancelled before the operation completed.
    #[error("Operation cancelled")]
    Cancelled,
}

/// Result type for blockchain operations.
pub type BlockchainResult<T> = Result<T, BlockchainError>;

/// A message call, used both for `eth_call` and `eth_estimateGas`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    pub from: Option<Address>,
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
}

/// Outcome recorded in a receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptStatus {
    Succeeded,
    Reverted,
}

impl ReceiptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReceiptStatus::Succeeded => "succeeded",
            ReceiptStatus::Reverted => "reverted",
        }
    }
}

/// Confirmation record of an included transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub tx_hash: TxHash,
    pub block_number: u64,
    pub gas_used: u64,
    pub status: ReceiptStatus,
}

impl Receipt {
    pub fn succeeded(&self) -> bool {
        self.status == ReceiptStatus::Succeeded
    }
}

/// How long and how often to wait for a receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationPolicy {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl From<&ConfirmationConfig> for ConfirmationPolicy {
    fn from(config: &ConfirmationConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.timeout_secs),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
        }
    }
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        Self::from(&ConfirmationConfig::default())
    }
}
