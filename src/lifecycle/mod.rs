//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Ctrl+C (signals.rs)
//!     → Shutdown::trigger (shutdown.rs)
//!     → every ShutdownSignal observes it
//!     → RPC calls and receipt waits abort with Cancelled
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Cancellation never marks a transaction as confirmed

pub mod shutdown;
pub mod signals;

pub use shutdown::{Shutdown, ShutdownSignal};
