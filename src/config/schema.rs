//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the driver.
//! All types derive Serde traits for deserialization from config files.
//! The signing key is deliberately absent: it is read from the environment
//! by the wallet and never stored in configuration.

use serde::{Deserialize, Serialize};

/// Root configuration for the storage driver.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct DriverConfig {
    /// Node endpoint and target contract.
    pub chain: ChainConfig,

    /// Receipt wait settings.
    pub confirmation: ConfirmationConfig,

    /// Gas limit selection.
    pub gas: GasConfig,

    /// Literal arguments of the interaction sequence.
    pub sequence: SequenceConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Chain endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ChainConfig {
    /// JSON-RPC endpoint URL (`RPC_URL`).
    pub rpc_url: String,

    /// Hex-encoded address of the deployed contract (`CONTRACT_ADDRESS`).
    pub contract_address: String,

    /// If set, the node must report this chain ID or writes are refused.
    pub expected_chain_id: Option<u64>,

    /// RPC request timeout in seconds.
    pub rpc_timeout_secs: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: String::new(),
            contract_address: String::new(),
            expected_chain_id: None,
            rpc_timeout_secs: 10,
        }
    }
}

/// Receipt wait configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ConfirmationConfig {
    /// Maximum time to wait for a receipt, in seconds.
    pub timeout_secs: u64,

    /// Delay between receipt polls, in milliseconds.
    pub poll_interval_ms: u64,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 120,
            poll_interval_ms: 1000,
        }
    }
}

/// Gas limit selection.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct GasConfig {
    /// Units added on top of a successful estimate.
    pub safety_margin: u64,

    /// Limit used when estimation fails.
    pub fallback_limit: u64,

    /// Abort instead of falling back when estimation reports a revert.
    pub abort_on_simulated_revert: bool,
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            safety_margin: 20_000,
            fallback_limit: 500_000,
            abort_on_simulated_revert: false,
        }
    }
}

/// Arguments used by the `run` sequence.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SequenceConfig {
    /// Argument of the `set` call.
    pub set_value: u64,

    /// Argument of the `add` call.
    pub add_value: u64,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            set_value: 150,
            add_value: 10,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Serve counters in Prometheus format while the run lasts.
    pub metrics_enabled: bool,

    /// Metrics listen address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
