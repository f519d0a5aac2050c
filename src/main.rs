//! txflow CLI - submit one transaction against a configured network

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ethers::abi::token::{LenientTokenizer, Tokenizer};
use ethers::abi::Token;
use ethers::types::{Address, Bytes, Eip1559TransactionRequest, U256};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use txflow::chain::{EthersContract, EthersProvider, LocalWalletSession};
use txflow::config::Settings;
use txflow::notify::LogNotifier;
use txflow::report::LogReporter;
use txflow::tx::{ReceiptPoller, TokioClock};
use txflow::{Outcome, TransactionOptions, TransactionRequest, TransactionSender};

#[derive(Parser)]
#[command(name = "txflow")]
#[command(about = "Submit a transaction and follow it to a receipt", long_about = None)]
struct Cli {
    /// Config file (defaults to $TXFLOW_CONFIG or config/default.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Network key from the config file
    #[arg(short, long)]
    network: String,

    /// Label shown in notifications and reports
    #[arg(short, long, default_value = "Transaction")]
    label: String,

    /// Print Prometheus metrics after the run
    #[arg(long)]
    print_metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a raw transaction
    Send {
        #[arg(long)]
        to: Address,
        /// Value in wei
        #[arg(long, default_value = "0")]
        value: String,
        /// Hex calldata
        #[arg(long)]
        data: Option<Bytes>,
        #[arg(long)]
        gas_limit: Option<u64>,
    },
    /// Call a contract method
    Call {
        #[arg(long)]
        contract: Address,
        /// JSON ABI or build artifact
        #[arg(long)]
        abi: PathBuf,
        #[arg(long)]
        method: String,
        /// Method arguments, in order
        #[arg(long = "arg")]
        args: Vec<String>,
        #[arg(long)]
        gas_limit: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    init_logging();

    let cli = Cli::parse();

    // Load configuration
    let settings = match &cli.config {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load()?,
    };
    let network = settings.network(&cli.network)?.clone();
    info!(
        "Using network {} (chain {})",
        network.display_name, network.chain_id
    );

    let session = LocalWalletSession::from_env(&settings.wallet)?;
    let wallet = session.wallet().cloned().with_context(|| {
        format!(
            "No wallet configured. Set {} to a private key",
            settings.wallet.private_key_env
        )
    })?;

    let provider = Arc::new(EthersProvider::connect(&network, wallet)?);
    let poller = ReceiptPoller::new(&settings.poller, Arc::new(TokioClock));

    let request = match cli.command {
        Commands::Send {
            to,
            value,
            data,
            gas_limit,
        } => {
            let value = U256::from_dec_str(&value).context("Invalid --value")?;
            let mut tx = Eip1559TransactionRequest::new().to(to).value(value);
            if let Some(data) = data {
                tx = tx.data(data);
            }
            if let Some(gas) = gas_limit {
                tx = tx.gas(gas);
            }
            TransactionRequest::raw(tx)
        }
        Commands::Call {
            contract,
            abi,
            method,
            args,
            gas_limit,
        } => {
            let abi_json = std::fs::read_to_string(&abi)
                .with_context(|| format!("Failed to read ABI: {:?}", abi))?;
            let abi = EthersContract::parse_abi(&abi_json)?;
            let params = tokenize_args(&abi, &method, &args)?;
            let bound = Arc::new(EthersContract::new(contract, abi, provider.client()));

            let mut request = TransactionRequest::method_call(bound, method, params);
            if let Some(gas) = gas_limit {
                request = request.with_gas_limit(gas.into());
            }
            request
        }
    };

    let sender = TransactionSender::new(
        network,
        Arc::new(session),
        provider,
        Arc::new(LogNotifier),
        Arc::new(LogReporter),
        poller,
    );

    let options = TransactionOptions::new()
        .with_metadata("source", "cli")
        .on_error(|event| {
            error!(
                "{} failure: {:?}",
                event.stage,
                event.error.reason
            );
        });

    let outcome = sender.execute(request, &cli.label, options).await?;
    match &outcome {
        Outcome::Succeeded(receipt) => info!(
            "Confirmed {:?} in block {:?}",
            receipt.transaction_hash, receipt.block_number
        ),
        other => info!("Finished without a successful receipt: {:?}", other),
    }

    if cli.print_metrics {
        println!("{}", txflow::metrics::gather_text());
    }

    if outcome.is_success() {
        Ok(())
    } else {
        std::process::exit(1);
    }
}

/// Parse CLI strings into tokens using the method's ABI types
fn tokenize_args(abi: &ethers::abi::Abi, method: &str, args: &[String]) -> Result<Vec<Token>> {
    let function = abi
        .function(method)
        .with_context(|| format!("Method {} not found in ABI", method))?;

    if function.inputs.len() != args.len() {
        anyhow::bail!(
            "{} takes {} arguments, got {}",
            method,
            function.inputs.len(),
            args.len()
        );
    }

    function
        .inputs
        .iter()
        .zip(args)
        .map(|(param, arg)| {
            LenientTokenizer::tokenize(&param.kind, arg)
                .with_context(|| format!("Invalid value for {}: {}", param.name, arg))
        })
        .collect()
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,txflow=debug,hyper=warn,reqwest=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .init();
}
