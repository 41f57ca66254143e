//! Progress reporting for a run.

use alloy::primitives::{Address, TxHash, U256};
use std::sync::Mutex;

use crate::contract::StorageCall;

/// Something observable happened during the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequenceEvent {
    /// Value read before any write.
    InitialValue(U256),
    /// A write is about to be authorized.
    WriteStarted(StorageCall),
    /// Authorization resolved for `signer` with `nonce`.
    Authorized {
        call: StorageCall,
        signer: Address,
        nonce: u64,
        gas_limit: u64,
    },
    /// The node produced a gas estimate for the call.
    GasEstimated { call: StorageCall, estimate: u64 },
    /// The transaction was broadcast.
    Submitted { call: StorageCall, tx_hash: TxHash },
    /// A successful receipt was observed.
    Mined {
        call: StorageCall,
        tx_hash: TxHash,
        block_number: u64,
    },
    /// Value read after a confirmed write.
    ValueAfter { call: StorageCall, value: U256 },
}

/// Receives [`SequenceEvent`]s as they happen.
pub trait ProgressSink: Send + Sync {
    fn report(&self, event: &SequenceEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentProgress;

impl ProgressSink for SilentProgress {
    fn report(&self, _event: &SequenceEvent) {}
}

/// Keeps every event in order.
#[derive(Debug, Default)]
pub struct RecordedProgress {
    events: Mutex<Vec<SequenceEvent>>,
}

impl RecordedProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SequenceEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl ProgressSink for RecordedProgress {
    fn report(&self, event: &SequenceEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

/// Human-readable lines on stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleProgress;

impl ConsoleProgress {
    /// Line printed for `event`, if any.
    pub fn render(event: &SequenceEvent) -> Option<String> {
        let line = match event {
            SequenceEvent::InitialValue(value) => format!("Initial value: {}", value),
            SequenceEvent::WriteStarted(StorageCall::Set(value)) => {
                format!("Setting a new value: {}", value)
            }
            SequenceEvent::WriteStarted(StorageCall::Add(value)) => {
                format!("Adding {} to value", value)
            }
            SequenceEvent::Authorized { .. } => return None,
            SequenceEvent::GasEstimated { estimate, .. } => format!("Estimated gas: {}", estimate),
            SequenceEvent::Submitted { call, tx_hash } => {
                format!("{} transaction hash: {}", capitalize(call.name()), tx_hash)
            }
            SequenceEvent::Mined { block_number, .. } => {
                format!("Transaction mined in block {}", block_number)
            }
            SequenceEvent::ValueAfter {
                call: StorageCall::Set(_),
                value,
            } => format!("Updated value: {}", value),
            SequenceEvent::ValueAfter {
                call: StorageCall::Add(_),
                value,
            } => format!("New value after add: {}", value),
        };
        Some(line)
    }
}

impl ProgressSink for ConsoleProgress {
    fn report(&self, event: &SequenceEvent) {
        if let Some(line) = Self::render(event) {
            println!("{}", line);
        }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
