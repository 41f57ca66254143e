//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check required values are present (endpoint, contract address)
//! - Validate value ranges (timeouts > 0, fallback gas > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: DriverConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use alloy::primitives::Address;
use thiserror::Error;

use crate::config::schema::DriverConfig;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} is required (set {env} or configure it)")]
    Missing {
        field: &'static str,
        env: &'static str,
    },

    #[error("{field} is invalid: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Parse the configured contract address.
pub fn parse_contract_address(raw: &str) -> Result<Address, ValidationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ValidationError::Missing {
            field: "chain.contract_address",
            env: "CONTRACT_ADDRESS",
        });
    }
    raw.parse::<Address>()
        .map_err(|e| ValidationError::Invalid {
            field: "chain.contract_address",
            reason: e.to_string(),
        })
}

/// Validate a fully merged configuration.
pub fn validate_config(config: &DriverConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let chain = &config.chain;
    if chain.rpc_url.trim().is_empty() {
        errors.push(ValidationError::Missing {
            field: "chain.rpc_url",
            env: "RPC_URL",
        });
    } else {
        match url::Url::parse(&chain.rpc_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => errors.push(ValidationError::Invalid {
                field: "chain.rpc_url",
                reason: format!("unsupported scheme '{}'", url.scheme()),
            }),
            Err(e) => errors.push(ValidationError::Invalid {
                field: "chain.rpc_url",
                reason: e.to_string(),
            }),
        }
    }

    if let Err(e) = parse_contract_address(&chain.contract_address) {
        errors.push(e);
    }

    if chain.expected_chain_id == Some(0) {
        errors.push(ValidationError::Invalid {
            field: "chain.expected_chain_id",
            reason: "must be non-zero".to_string(),
        });
    }

    if chain.rpc_timeout_secs == 0 {
        errors.push(ValidationError::Invalid {
            field: "chain.rpc_timeout_secs",
            reason: "must be greater than zero".to_string(),
        });
    }

    if config.confirmation.timeout_secs == 0 {
        errors.push(ValidationError::Invalid {
            field: "confirmation.timeout_secs",
            reason: "must be greater than zero".to_string(),
        });
    }

    if config.confirmation.poll_interval_ms == 0 {
        errors.push(ValidationError::Invalid {
            field: "confirmation.poll_interval_ms",
            reason: "must be greater than zero".to_string(),
        });
    }

    if config.gas.fallback_limit == 0 {
        errors.push(ValidationError::Invalid {
            field: "gas.fallback_limit",
            reason: "must be greater than zero".to_string(),
        });
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<std::net::SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::Invalid {
            field: "observability.metrics_address",
            reason: format!("'{}' is not a socket address", config.observability.metrics_address),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> DriverConfig {
        let mut config = DriverConfig::default();
        config.chain.rpc_url = "http://localhost:8545".to_string();
        config.chain.contract_address = "0x5FbDB2315678afecb367f032d93F642f64180aa3".to_string();
        config
    }

    #[test]
    fn test_valid_config() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_missing_values_reported_together() {
        let errors = validate_config(&DriverConfig::default()).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].to_string().contains("RPC_URL"));
        assert!(errors[1].to_string().contains("CONTRACT_ADDRESS"));
    }

    #[test]
    fn test_invalid_address() {
        let mut config = valid_config();
        config.chain.contract_address = "0x1234".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(
            errors[0],
            ValidationError::Invalid { field: "chain.contract_address", .. }
        ));
    }

    #[test]
    fn test_parse_contract_address() {
        let address = parse_contract_address(" 0x5FbDB2315678afecb367f032d93F642f64180aa3 ").unwrap();
        assert_eq!(
            address,
            "0x5FbDB2315678afecb367f032d93F642f64180aa3".parse::<Address>().unwrap()
        );
        assert!(matches!(
            parse_contract_address(""),
            Err(ValidationError::Missing { env: "CONTRACT_ADDRESS", .. })
        ));
    }

    #[test]
    fn test_invalid_url_scheme() {
        let mut config = valid_config();
        config.chain.rpc_url = "ftp://node.local".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors[0].to_string().contains("unsupported scheme"));
    }

    #[test]
    fn test_metrics_address_checked_only_when_enabled() {
        let mut config = valid_config();
        config.observability.metrics_address = "not-an-address".to_string();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(
            errors[0],
            ValidationError::Invalid { field: "observability.metrics_address", .. }
        ));
    }

    #[test]
    fn test_zero_values_rejected() {
        let mut config = valid_config();
        config.chain.rpc_timeout_secs = 0;
        config.confirmation.poll_interval_ms = 0;
        config.gas.fallback_limit = 0;
        config.chain.expected_chain_id = Some(0);
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
    }
}
