//! Binding for the deployed storage contract.

use alloy::eips::eip2718::Encodable2718;
use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::sol;
use alloy::sol_types::SolCall;
use std::fmt;

use crate::blockchain::client::ChainClient;
use crate::blockchain::transaction::Authorization;
use crate::blockchain::types::{BlockchainError, BlockchainResult, CallRequest};
use crate::observability::metrics;

sol! {
    /// Single-slot storage contract.
    #[sol(all_derives)]
    interface SimpleStorage {
        function get() external view returns (uint256);
        function set(uint256 value) external;
        function add(uint256 value) external;
    }
}

/// A state-changing call on the storage contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageCall {
    Set(U256),
    Add(U256),
}

impl StorageCall {
    /// Build a call from a function name of the interface.
    pub fn from_name(name: &str, value: U256) -> Option<Self> {
        match name {
            "set" => Some(StorageCall::Set(value)),
            "add" => Some(StorageCall::Add(value)),
            _ => None,
        }
    }

    /// Function name in the interface.
    pub fn name(&self) -> &'static str {
        match self {
            StorageCall::Set(_) => "set",
            StorageCall::Add(_) => "add",
        }
    }

    pub fn argument(&self) -> U256 {
        match self {
            StorageCall::Set(value) | StorageCall::Add(value) => *value,
        }
    }

    /// Selector followed by the packed argument.
    pub fn encode(&self) -> Bytes {
        match *self {
            StorageCall::Set(value) => SimpleStorage::setCall { value }.abi_encode().into(),
            StorageCall::Add(value) => SimpleStorage::addCall { value }.abi_encode().into(),
        }
    }
}

impl fmt::Display for StorageCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.argument())
    }
}

/// Typed access to one deployed storage contract.
pub struct StorageContract<'a, C: ChainClient + ?Sized> {
    address: Address,
    client: &'a C,
}

impl<'a, C: ChainClient + ?Sized> StorageContract<'a, C> {
    pub fn new(address: Address, client: &'a C) -> Self {
        Self { address, client }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Read the stored value. Needs no authorization.
    pub async fn read(&self) -> BlockchainResult<U256> {
        let call = CallRequest {
            from: None,
            to: self.address,
            data: SimpleStorage::getCall {}.abi_encode().into(),
            value: U256::ZERO,
        };
        let output = self.client.call(&call).await?;

        SimpleStorage::getCall::abi_decode_returns(&output)
            .map_err(|e| BlockchainError::Decode(format!("get() returned {}: {}", output, e)))
    }

    /// Sign and broadcast `call` under `authorization`.
    ///
    /// The authorization must have been issued for this contract and for
    /// exactly this call's payload.
    pub async fn write(
        &self,
        call: &StorageCall,
        authorization: &Authorization<'_>,
    ) -> BlockchainResult<TxHash> {
        if authorization.to() != self.address {
            return Err(BlockchainError::Submission(format!(
                "authorization was issued for {}, not {}",
                authorization.to(),
                self.address
            )));
        }
        if authorization.payload() != &call.encode() {
            return Err(BlockchainError::Submission(format!(
                "authorization was issued for a different payload than {}",
                call
            )));
        }

        let gas_price = self.client.gas_price().await.map_err(|e| match e {
            BlockchainError::Cancelled => BlockchainError::Cancelled,
            other => BlockchainError::Submission(format!("gas price lookup failed: {}", other)),
        })?;

        let envelope = authorization.sign(gas_price).await?;
        let expected_hash = *envelope.tx_hash();
        let raw: Bytes = envelope.encoded_2718().into();

        let tx_hash = self.client.send_raw_transaction(raw).await?;
        if tx_hash != expected_hash {
            tracing::warn!(
                expected = %expected_hash,
                reported = %tx_hash,
                "Node reported a different transaction hash"
            );
        }

        metrics::record_transaction_submitted(call.name());
        tracing::info!(
            operation = call.name(),
            tx_hash = %tx_hash,
            nonce = authorization.descriptor().nonce,
            gas_limit = authorization.descriptor().gas_limit,
            "Transaction submitted"
        );
        Ok(tx_hash)
    }
}
