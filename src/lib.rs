//! Storage contract driver library.

pub mod blockchain;
pub mod config;
pub mod contract;
pub mod lifecycle;
pub mod observability;
pub mod sequence;

pub use config::schema::DriverConfig;
pub use lifecycle::Shutdown;
pub use sequence::Sequencer;
