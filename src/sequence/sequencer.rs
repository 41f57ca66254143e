//! Ordered read/write interaction with the storage contract.
//!
//! # Responsibilities
//! - Read the current value
//! - For each planned call: authorize, submit, wait for the receipt,
//!   verify its status, read the value back
//! - Stop at the first failure, naming the step that failed
//!
//! # Design Decisions
//! - One write in flight per signer: the lane mutex is held from
//!   authorization until the receipt is verified, so the next
//!   authorization always sees the previous transaction's nonce consumed
//! - No step is retried; a retried write would need a fresh authorization

use alloy::primitives::{Address, TxHash, U256};
use std::fmt;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::blockchain::client::{ChainClient, RpcChainClient};
use crate::blockchain::transaction::{AuthorizationDescriptor, GasDecision, TxAuthorizer};
use crate::blockchain::types::{BlockchainError, ConfirmationPolicy, Receipt};
use crate::config::{ChainConfig, SequenceConfig};
use crate::contract::{StorageCall, StorageContract};
use crate::lifecycle::ShutdownSignal;
use crate::observability::metrics;
use crate::sequence::progress::{ProgressSink, SequenceEvent};

/// Where in the run a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Connect,
    InitialRead,
    Authorize(&'static str),
    Submit(&'static str),
    Confirm(&'static str),
    Verify(&'static str),
    ReadBack(&'static str),
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Connect => write!(f, "connect"),
            Step::InitialRead => write!(f, "initial read"),
            Step::Authorize(op) => write!(f, "authorize {}", op),
            Step::Submit(op) => write!(f, "submit {}", op),
            Step::Confirm(op) => write!(f, "confirm {}", op),
            Step::Verify(op) => write!(f, "verify {}", op),
            Step::ReadBack(op) => write!(f, "read after {}", op),
        }
    }
}

/// A fatal failure of the run.
#[derive(Debug, Error)]
#[error("{step} failed: {source}")]
pub struct SequenceError {
    pub step: Step,
    pub source: BlockchainError,
}

impl SequenceError {
    fn at(step: Step) -> impl FnOnce(BlockchainError) -> SequenceError {
        move |source| SequenceError { step, source }
    }
}

/// A confirmed, successful write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    pub call: StorageCall,
    pub descriptor: AuthorizationDescriptor,
    pub gas: GasDecision,
    pub tx_hash: TxHash,
    pub receipt: Receipt,
}

/// A write followed by a read of the resulting value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleOutcome {
    pub write: WriteOutcome,
    pub value_after: U256,
}

/// Everything a completed run observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceReport {
    pub initial_value: U256,
    pub cycles: Vec<CycleOutcome>,
}

impl SequenceReport {
    pub fn final_value(&self) -> U256 {
        self.cycles
            .last()
            .map(|cycle| cycle.value_after)
            .unwrap_or(self.initial_value)
    }
}

/// The `set` then `add` plan.
pub fn default_plan(config: &SequenceConfig) -> Vec<StorageCall> {
    vec![
        StorageCall::Set(U256::from(config.set_value)),
        StorageCall::Add(U256::from(config.add_value)),
    ]
}

/// Open the endpoint every later step runs against.
pub async fn connect(
    config: &ChainConfig,
    shutdown: ShutdownSignal,
) -> Result<RpcChainClient, SequenceError> {
    RpcChainClient::connect(config, shutdown)
        .await
        .map_err(SequenceError::at(Step::Connect))
}

/// Drives reads and writes against one contract.
pub struct Sequencer<'a, C: ChainClient + ?Sized> {
    client: &'a C,
    contract: StorageContract<'a, C>,
    authorizer: TxAuthorizer<'a, C>,
    confirmation: ConfirmationPolicy,
    shutdown: ShutdownSignal,
    progress: &'a dyn ProgressSink,
    lane: Mutex<()>,
}

impl<'a, C: ChainClient + ?Sized> Sequencer<'a, C> {
    pub fn new(
        client: &'a C,
        contract: Address,
        authorizer: TxAuthorizer<'a, C>,
        confirmation: ConfirmationPolicy,
        shutdown: ShutdownSignal,
        progress: &'a dyn ProgressSink,
    ) -> Self {
        Self {
            client,
            contract: StorageContract::new(contract, client),
            authorizer,
            confirmation,
            shutdown,
            progress,
            lane: Mutex::new(()),
        }
    }

    /// Read, then run every call in `plan` as a full write cycle.
    pub async fn run(&self, plan: &[StorageCall]) -> Result<SequenceReport, SequenceError> {
        tracing::info!(
            contract = %self.contract.address(),
            signer = %self.authorizer.signer(),
            writes = plan.len(),
            "Starting interaction sequence"
        );

        let initial_value = self.read(Step::InitialRead).await?;
        self.progress.report(&SequenceEvent::InitialValue(initial_value));

        let mut cycles = Vec::with_capacity(plan.len());
        for call in plan {
            cycles.push(self.cycle(*call).await?);
        }

        let report = SequenceReport {
            initial_value,
            cycles,
        };
        tracing::info!(
            initial = %report.initial_value,
            final_value = %report.final_value(),
            "Interaction sequence complete"
        );
        Ok(report)
    }

    /// Write `call`, then read the value it produced.
    pub async fn cycle(&self, call: StorageCall) -> Result<CycleOutcome, SequenceError> {
        let write = self.execute(call).await?;
        let value_after = self.read(Step::ReadBack(call.name())).await?;
        self.progress
            .report(&SequenceEvent::ValueAfter { call, value: value_after });
        Ok(CycleOutcome { write, value_after })
    }

    /// Authorize, submit and confirm `call`.
    ///
    /// Holds the write lane for the whole span; concurrent callers are
    /// served one after another.
    pub async fn execute(&self, call: StorageCall) -> Result<WriteOutcome, SequenceError> {
        let op = call.name();
        let _lane = self.lane.lock().await;

        self.ensure_running(Step::Authorize(op))?;
        self.progress.report(&SequenceEvent::WriteStarted(call));

        let authorization = self
            .authorizer
            .authorize(self.contract.address(), call.encode())
            .await
            .map_err(SequenceError::at(Step::Authorize(op)))?;

        let descriptor = *authorization.descriptor();
        self.progress.report(&SequenceEvent::Authorized {
            call,
            signer: descriptor.signer,
            nonce: descriptor.nonce,
            gas_limit: descriptor.gas_limit,
        });
        if let GasDecision::Estimated { estimate } = authorization.gas() {
            self.progress.report(&SequenceEvent::GasEstimated {
                call,
                estimate: *estimate,
            });
        }

        self.ensure_running(Step::Submit(op))?;
        let tx_hash = self
            .contract
            .write(&call, &authorization)
            .await
            .map_err(SequenceError::at(Step::Submit(op)))?;
        self.progress.report(&SequenceEvent::Submitted { call, tx_hash });

        let receipt = self
            .client
            .wait_for_receipt(tx_hash, &self.confirmation, &self.shutdown)
            .await
            .map_err(SequenceError::at(Step::Confirm(op)))?;
        metrics::record_receipt(receipt.status.as_str());

        if !receipt.succeeded() {
            tracing::error!(
                operation = op,
                tx_hash = %tx_hash,
                block_number = receipt.block_number,
                "Transaction reverted"
            );
            return Err(SequenceError {
                step: Step::Verify(op),
                source: BlockchainError::Reverted {
                    tx_hash,
                    block_number: receipt.block_number,
                },
            });
        }

        tracing::info!(
            operation = op,
            tx_hash = %tx_hash,
            block_number = receipt.block_number,
            gas_used = receipt.gas_used,
            "Transaction confirmed"
        );
        self.progress.report(&SequenceEvent::Mined {
            call,
            tx_hash,
            block_number: receipt.block_number,
        });

        Ok(WriteOutcome {
            call,
            descriptor,
            gas: authorization.gas().clone(),
            tx_hash,
            receipt,
        })
    }

    async fn read(&self, step: Step) -> Result<U256, SequenceError> {
        self.ensure_running(step)?;
        self.contract.read().await.map_err(SequenceError::at(step))
    }

    fn ensure_running(&self, step: Step) -> Result<(), SequenceError> {
        if self.shutdown.is_cancelled() {
            return Err(SequenceError {
                step,
                source: BlockchainError::Cancelled,
            });
        }
        Ok(())
    }
}
