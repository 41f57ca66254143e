//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! defaults (schema.rs)
//!     → optional TOML file (loader.rs)
//!     → RPC_URL / CONTRACT_ADDRESS environment overlay
//!     → command line overlay
//!     → validation.rs (semantic checks)
//!     → DriverConfig (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - The private key never passes through configuration

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError, ConfigOverrides};
pub use schema::DriverConfig;
pub use validation::{parse_contract_address, ValidationError};
pub use schema::{ChainConfig, ConfirmationConfig, GasConfig, ObservabilityConfig, SequenceConfig};
