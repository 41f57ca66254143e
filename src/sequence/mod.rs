//! Interaction sequencing.
//!
//! # Data Flow
//! ```text
//! read ─▶ set: authorize ─▶ submit ─▶ wait receipt ─▶ verify ─▶ read
//!       ─▶ add: authorize ─▶ submit ─▶ wait receipt ─▶ verify ─▶ read
//! ```
//! Any failure aborts the run with the step that failed.

pub mod progress;
pub mod sequencer;

pub use progress::{ConsoleProgress, ProgressSink, RecordedProgress, SequenceEvent, SilentProgress};
pub use sequencer::{
    connect, default_plan, CycleOutcome, SequenceError, SequenceReport, Sequencer, Step, WriteOutcome,
};
