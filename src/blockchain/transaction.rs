//! Transaction authorization.
//!
//! # Responsibilities
//! - Resolve signer, pending nonce and chain ID for one write
//! - Choose a gas limit from an estimate, or a fixed fallback
//! - Sign the populated transaction through the key custodian
//!
//! Nothing is cached between authorizations: two authorizations issued for
//! the same signer without an intervening receipt would share a nonce.

use alloy::consensus::TxEnvelope;
use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, U256};
use alloy::rpc::types::TransactionRequest;

use crate::blockchain::client::ChainClient;
use crate::blockchain::types::{
    BlockchainError, BlockchainResult, CallRequest, ChainId, GasConfig,
};
use crate::blockchain::wallet::KeyCustodian;
use crate::observability::metrics;

/// Everything needed to sign one transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthorizationDescriptor {
    pub signer: Address,
    pub nonce: u64,
    pub value: U256,
    pub gas_limit: u64,
    pub chain_id: ChainId,
}

/// How the gas limit was chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GasDecision {
    /// Node estimate plus the safety margin.
    Estimated { estimate: u64 },
    /// Estimation failed; the fallback limit was used.
    Fallback { reason: String },
}

/// Gas limit selection rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasPolicy {
    pub safety_margin: u64,
    pub fallback_limit: u64,
    pub abort_on_simulated_revert: bool,
}

impl GasPolicy {
    /// Limit used for a successful estimate.
    pub fn padded(&self, estimate: u64) -> u64 {
        estimate.saturating_add(self.safety_margin)
    }

    /// Turn an estimation outcome into a limit, or abort.
    pub fn decide(&self, estimate: BlockchainResult<u64>) -> BlockchainResult<(u64, GasDecision)> {
        match estimate {
            Ok(estimate) => Ok((self.padded(estimate), GasDecision::Estimated { estimate })),
            Err(BlockchainError::Cancelled) => Err(BlockchainError::Cancelled),
            Err(BlockchainError::EstimationReverted(reason)) => {
                if self.abort_on_simulated_revert {
                    return Err(BlockchainError::EstimationReverted(reason));
                }
                tracing::warn!(
                    reason = %reason,
                    fallback_limit = self.fallback_limit,
                    "Gas estimation reports the call would revert, using fallback gas limit"
                );
                metrics::record_gas_fallback("simulated_revert");
                Ok((self.fallback_limit, GasDecision::Fallback { reason }))
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    fallback_limit = self.fallback_limit,
                    "Error estimating gas, using fallback gas limit"
                );
                metrics::record_gas_fallback("estimation_error");
                Ok((
                    self.fallback_limit,
                    GasDecision::Fallback {
                        reason: e.to_string(),
                    },
                ))
            }
        }
    }
}

impl From<&GasConfig> for GasPolicy {
    fn from(config: &GasConfig) -> Self {
        Self {
            safety_margin: config.safety_margin,
            fallback_limit: config.fallback_limit,
            abort_on_simulated_revert: config.abort_on_simulated_revert,
        }
    }
}

impl Default for GasPolicy {
    fn default() -> Self {
        Self::from(&GasConfig::default())
    }
}

/// A populated descriptor bound to the custodian that signs it.
pub struct Authorization<'a> {
    descriptor: AuthorizationDescriptor,
    gas: GasDecision,
    to: Address,
    payload: Bytes,
    custodian: &'a dyn KeyCustodian,
}

impl<'a> Authorization<'a> {
    pub fn descriptor(&self) -> &AuthorizationDescriptor {
        &self.descriptor
    }

    pub fn gas(&self) -> &GasDecision {
        &self.gas
    }

    /// Contract this authorization was issued for.
    pub fn to(&self) -> Address {
        self.to
    }

    /// Call payload this authorization was issued for.
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Sign the authorized call as a legacy EIP-155 transaction.
    pub async fn sign(&self, gas_price: u128) -> BlockchainResult<TxEnvelope> {
        let d = &self.descriptor;
        let request = TransactionRequest::default()
            .with_from(d.signer)
            .with_to(self.to)
            .with_input(self.payload.clone())
            .with_value(d.value)
            .with_nonce(d.nonce)
            .with_gas_limit(d.gas_limit)
            .with_gas_price(gas_price)
            .with_chain_id(d.chain_id.0);

        self.custodian.sign_transaction(request, d.chain_id).await
    }
}

impl std::fmt::Debug for Authorization<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authorization")
            .field("descriptor", &self.descriptor)
            .field("gas", &self.gas)
            .field("to", &self.to)
            .finish()
    }
}

/// Produces authorizations for writes against one chain.
pub struct TxAuthorizer<'a, C: ChainClient + ?Sized> {
    client: &'a C,
    custodian: &'a dyn KeyCustodian,
    gas: GasPolicy,
    expected_chain_id: Option<u64>,
}

impl<'a, C: ChainClient + ?Sized> TxAuthorizer<'a, C> {
    /// Create a new authorizer.
    pub fn new(client: &'a C, custodian: &'a dyn KeyCustodian, gas: GasPolicy) -> Self {
        Self {
            client,
            custodian,
            gas,
            expected_chain_id: None,
        }
    }

    /// Refuse to authorize unless the node reports `chain_id`.
    pub fn with_expected_chain_id(mut self, chain_id: Option<u64>) -> Self {
        self.expected_chain_id = chain_id;
        self
    }

    /// Address that signs every authorization.
    pub fn signer(&self) -> Address {
        self.custodian.address()
    }

    /// Authorize sending `payload` to `contract`.
    ///
    /// Nonce and chain ID lookups are mandatory; gas estimation is best
    /// effort.
    pub async fn authorize(
        &self,
        contract: Address,
        payload: Bytes,
    ) -> BlockchainResult<Authorization<'a>> {
        let signer = self.custodian.address();

        let nonce = self
            .client
            .pending_nonce(signer)
            .await
            .map_err(|e| lookup_failure(e, BlockchainError::NonceLookup))?;

        let chain_id = self
            .client
            .chain_id()
            .await
            .map_err(|e| lookup_failure(e, BlockchainError::ChainIdLookup))?;
        self.check_chain_id(chain_id)?;

        let value = U256::ZERO;
        let estimate = self
            .client
            .estimate_gas(&CallRequest {
                from: Some(signer),
                to: contract,
                data: payload.clone(),
                value,
            })
            .await;
        let (gas_limit, gas) = self.gas.decide(estimate)?;

        tracing::debug!(
            signer = %signer,
            nonce = nonce,
            chain_id = chain_id.0,
            gas_limit = gas_limit,
            "Transaction authorized"
        );

        Ok(Authorization {
            descriptor: AuthorizationDescriptor {
                signer,
                nonce,
                value,
                gas_limit,
                chain_id,
            },
            gas,
            to: contract,
            payload,
            custodian: self.custodian,
        })
    }

    fn check_chain_id(&self, chain_id: ChainId) -> BlockchainResult<()> {
        if chain_id.0 == 0 {
            return Err(BlockchainError::ChainIdLookup(
                "node reported chain ID 0".to_string(),
            ));
        }
        match self.expected_chain_id {
            Some(expected) if expected != chain_id.0 => Err(BlockchainError::ChainMismatch {
                expected,
                actual: chain_id.0,
            }),
            _ => Ok(()),
        }
    }
}

/// Mandatory lookups have no fallback; keep cancellation distinguishable.
fn lookup_failure(e: BlockchainError, wrap: fn(String) -> BlockchainError) -> BlockchainError {
    match e {
        BlockchainError::Cancelled => BlockchainError::Cancelled,
        other => wrap(other.to_string()),
    }
}
