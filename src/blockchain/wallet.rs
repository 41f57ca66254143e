//! Key custody and transaction signing.
//!
//! # Security
//! - Private keys are loaded ONLY from environment variables
//! - Keys are never logged or serialized
//! - Every signature binds the chain ID (EIP-155)

use alloy::consensus::TxEnvelope;
use alloy::network::{Ethereum, EthereumWallet, TransactionBuilder};
use alloy::primitives::Address;
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer;
use async_trait::async_trait;

use crate::blockchain::types::{BlockchainError, BlockchainResult, ChainId};

/// Environment variable name for the private key.
pub const PRIVATE_KEY_ENV_VAR: &str = "PRIVATE_KEY";

/// Something that can sign transactions for a single identity.
///
/// Local keys, hardware wallets and remote signers all fit behind this
/// trait; the authorizer only needs the address and a signature.
#[async_trait]
pub trait KeyCustodian: Send + Sync {
    /// Address of the signing identity.
    fn address(&self) -> Address;

    /// Sign a fully populated request for `chain_id`.
    ///
    /// Must refuse a request whose chain ID differs from `chain_id`.
    async fn sign_transaction(
        &self,
        request: TransactionRequest,
        chain_id: ChainId,
    ) -> BlockchainResult<TxEnvelope>;
}

/// Custodian backed by an in-process secp256k1 key.
#[derive(Debug, Clone)]
pub struct Wallet {
    signer: PrivateKeySigner,
}

impl Wallet {
    /// Create a wallet from a hex-encoded private key string.
    ///
    /// # Arguments
    /// * `private_key_hex` - Hex string (with or without 0x prefix)
    ///
    /// # Security
    /// The private key is parsed and stored securely. It is never logged.
    pub fn from_private_key(private_key_hex: &str) -> BlockchainResult<Self> {
        let trimmed = private_key_hex.trim();
        let key_hex = trimmed.strip_prefix("0x").unwrap_or(trimmed);

        let signer: PrivateKeySigner = key_hex
            .parse()
            .map_err(|e| BlockchainError::InvalidKey(format!("Invalid private key format: {}", e)))?;

        tracing::info!(address = %signer.address(), "Wallet initialized");

        Ok(Self { signer })
    }

    /// Load wallet from environment variable.
    ///
    /// Reads `PRIVATE_KEY` from environment.
    pub fn from_env() -> BlockchainResult<Self> {
        let private_key = std::env::var(PRIVATE_KEY_ENV_VAR).map_err(|_| {
            BlockchainError::InvalidKey(format!(
                "Environment variable {} not set",
                PRIVATE_KEY_ENV_VAR
            ))
        })?;

        Self::from_private_key(&private_key)
    }

    /// Get the wallet's address.
    pub fn address(&self) -> Address {
        self.signer.address()
    }
}

#[async_trait]
impl KeyCustodian for Wallet {
    fn address(&self) -> Address {
        self.signer.address()
    }

    async fn sign_transaction(
        &self,
        request: TransactionRequest,
        chain_id: ChainId,
    ) -> BlockchainResult<TxEnvelope> {
        if let Some(requested) = request.chain_id {
            if requested != chain_id.0 {
                return Err(BlockchainError::ChainMismatch {
                    expected: chain_id.0,
                    actual: requested,
                });
            }
        }

        let signer = self.signer.clone().with_chain_id(Some(chain_id.0));
        let wallet = EthereumWallet::from(signer);

        <TransactionRequest as TransactionBuilder<Ethereum>>::build(request, &wallet)
            .await
            .map_err(|e| BlockchainError::Submission(format!("Signing failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::consensus::Transaction;
    use alloy::primitives::{Bytes, U256};

    // Well-known test private key (Anvil's first account)
    const TEST_PRIVATE_KEY: &str =
        "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn request(chain_id: u64) -> TransactionRequest {
        TransactionRequest::default()
            .with_from(Wallet::from_private_key(TEST_PRIVATE_KEY).unwrap().address())
            .with_to(Address::repeat_byte(0x42))
            .with_input(Bytes::from(vec![0x60, 0xfe, 0x47, 0xb1]))
            .with_value(U256::ZERO)
            .with_nonce(7)
            .with_gas_limit(46_000)
            .with_gas_price(1_000_000_000)
            .with_chain_id(chain_id)
    }

    #[test]
    fn test_wallet_from_private_key() {
        let wallet = Wallet::from_private_key(TEST_PRIVATE_KEY).unwrap();
        // This is the corresponding address for the test key
        assert_eq!(
            wallet.address().to_string().to_lowercase(),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
    }

    #[test]
    fn test_wallet_with_0x_prefix() {
        let wallet = Wallet::from_private_key(&format!("0x{}", TEST_PRIVATE_KEY)).unwrap();
        assert_eq!(
            wallet.address().to_string().to_lowercase(),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
    }

    #[test]
    fn test_invalid_private_key() {
        let result = Wallet::from_private_key("invalid_key");
        assert!(matches!(result, Err(BlockchainError::InvalidKey(_))));
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Invalid private key"));
    }

    #[tokio::test]
    async fn test_sign_transaction_binds_fields() {
        let wallet = Wallet::from_private_key(TEST_PRIVATE_KEY).unwrap();
        let envelope = wallet
            .sign_transaction(request(31337), ChainId(31337))
            .await
            .unwrap();

        assert_eq!(envelope.chain_id(), Some(31337));
        assert_eq!(envelope.nonce(), 7);
        assert_eq!(envelope.gas_limit(), 46_000);
        assert_eq!(envelope.to(), Some(Address::repeat_byte(0x42)));
        assert_eq!(envelope.value(), U256::ZERO);
    }

    #[tokio::test]
    async fn test_sign_transaction_rejects_other_chain() {
        let wallet = Wallet::from_private_key(TEST_PRIVATE_KEY).unwrap();
        let err = wallet
            .sign_transaction(request(1), ChainId(31337))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BlockchainError::ChainMismatch {
                expected: 31337,
                actual: 1
            }
        ));
    }
}
