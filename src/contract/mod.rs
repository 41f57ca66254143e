//! Contract bindings.
//!
//! The storage contract exposes `get() -> uint256`, `set(uint256)` and
//! `add(uint256)`. Reads go straight to `eth_call`; writes need an
//! [`Authorization`](crate::blockchain::Authorization).

pub mod storage;

pub use storage::{SimpleStorage, StorageCall, StorageContract};
