//! Blockchain integration subsystem.
//!
//! # Data Flow
//! ```text
//! PRIVATE_KEY
//!     → wallet.rs (key loading, signing for one chain ID)
//! RPC_URL
//!     → client.rs (RPC connection with timeouts and cancellation)
//! pending call payload
//!     → transaction.rs (nonce, chain ID, gas limit → Authorization)
//! ```
//!
//! # Security Constraints
//! - Private keys ONLY from environment variables
//! - Never log private keys or sensitive data
//! - All RPC calls have configurable timeouts

pub mod client;
pub mod transaction;
pub mod types;
pub mod wallet;

pub use client::{ChainClient, RpcChainClient};
pub use transaction::{Authorization, AuthorizationDescriptor, GasDecision, GasPolicy, TxAuthorizer};
pub use types::{
    BlockchainError, BlockchainResult, CallRequest, ChainId, ConfirmationPolicy, Receipt,
    ReceiptStatus,
};
pub use wallet::{KeyCustodian, Wallet};
