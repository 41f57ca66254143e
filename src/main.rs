//! Storage contract driver.
//!
//! # Architecture Overview
//!
//! ```text
//!   RPC_URL, CONTRACT_ADDRESS ──▶ config ──▶ RpcChainClient (owned here)
//!   PRIVATE_KEY ─────────────────▶ Wallet (KeyCustodian)
//!                                        │
//!                                        ▼
//!                   Sequencer ──▶ TxAuthorizer ──▶ StorageContract
//!                       │                               │
//!                       └──── wait_for_receipt ◀────────┘
//! ```
//!
//! Every fatal error prints one line naming the failed step and exits
//! with a failure code.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use alloy::primitives::{Address, U256};
use storage_driver::blockchain::{ConfirmationPolicy, GasPolicy, RpcChainClient, TxAuthorizer, Wallet};
use storage_driver::config::{load_config, parse_contract_address, ConfigOverrides, DriverConfig};
use storage_driver::contract::{StorageCall, StorageContract};
use storage_driver::lifecycle::{signals, Shutdown};
use storage_driver::observability::{logging, metrics};
use storage_driver::sequence::{
    connect, default_plan, ConsoleProgress, SequenceError, Sequencer, Step,
};

#[derive(Parser)]
#[command(name = "storage-driver")]
#[command(about = "Read and write a deployed storage contract", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// JSON-RPC endpoint (overrides RPC_URL).
    #[arg(long)]
    rpc_url: Option<String>,

    /// Contract address (overrides CONTRACT_ADDRESS).
    #[arg(long)]
    contract: Option<String>,

    /// Log level (overrides the configured level; RUST_LOG wins).
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Clone, Copy)]
enum Commands {
    /// Read, set, add, reading back after each write (default)
    Run,
    /// Read the stored value
    Get,
    /// Store VALUE
    Set { value: u64 },
    /// Add VALUE to the stored value
    Add { value: u64 },
}

impl Commands {
    /// The single write a `set`/`add` command stands for.
    fn write_call(self) -> Option<StorageCall> {
        match self {
            Commands::Set { value } => StorageCall::from_name("set", U256::from(value)),
            Commands::Add { value } => StorageCall::from_name("add", U256::from(value)),
            Commands::Run | Commands::Get => None,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is fine; the environment may already be set.
    let _ = dotenv::dotenv();

    let cli = Cli::parse();
    let overrides = ConfigOverrides {
        rpc_url: cli.rpc_url.clone(),
        contract_address: cli.contract.clone(),
        log_level: cli.log_level.clone(),
    };

    let config = match load_config(cli.config.as_deref(), &overrides) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration failed: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let contract_address = match parse_contract_address(&config.chain.contract_address) {
        Ok(address) => address,
        Err(e) => {
            eprintln!("configuration failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    logging::init(&config.observability.log_level);
    tracing::info!("storage-driver v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Metrics exporter unavailable");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let command = cli.command.unwrap_or(Commands::Run);
    match execute(command, contract_address, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Run aborted");
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn execute(
    command: Commands,
    contract_address: Address,
    config: &DriverConfig,
) -> Result<(), SequenceError> {
    let shutdown = Arc::new(Shutdown::new());
    let interrupt = signals::cancel_on_interrupt(shutdown.clone());

    let client = connect(&config.chain, shutdown.signal()).await?;
    println!("Contract Address: {}", contract_address);

    let result = match command {
        Commands::Get => read_only(&client, contract_address).await,
        other => {
            write_plan(&client, contract_address, config, &shutdown, other.write_call()).await
        }
    };

    interrupt.abort();
    client.close();
    result
}

async fn read_only(client: &RpcChainClient, contract_address: Address) -> Result<(), SequenceError> {
    let value = StorageContract::new(contract_address, client)
        .read()
        .await
        .map_err(|source| SequenceError {
            step: Step::InitialRead,
            source,
        })?;
    println!("Current value: {}", value);
    Ok(())
}

async fn write_plan(
    client: &RpcChainClient,
    contract_address: Address,
    config: &DriverConfig,
    shutdown: &Shutdown,
    single: Option<StorageCall>,
) -> Result<(), SequenceError> {
    let plan = match single {
        Some(call) => vec![call],
        None => default_plan(&config.sequence),
    };
    let first = plan.first().map(StorageCall::name).unwrap_or("write");

    // The key is only needed from the first write on.
    let wallet = Wallet::from_env().map_err(|source| SequenceError {
        step: Step::Authorize(first),
        source,
    })?;
    println!("Signer Address: {}", wallet.address());

    let authorizer = TxAuthorizer::new(client, &wallet, GasPolicy::from(&config.gas))
        .with_expected_chain_id(config.chain.expected_chain_id);
    let progress = ConsoleProgress;
    let sequencer = Sequencer::new(
        client,
        contract_address,
        authorizer,
        ConfirmationPolicy::from(&config.confirmation),
        shutdown.signal(),
        &progress,
    );

    sequencer.run(&plan).await.map(|_| ())
}
