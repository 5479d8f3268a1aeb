//! DFINANCE CLI - command-line interface for the dfinance client library
//!
//! Encodes VM script arguments, builds and broadcasts signed transactions,
//! and searches transactions with normalized event logs.

use anyhow::{anyhow, Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use log::info;
use serde_json::Value;
use std::path::{Path, PathBuf};

use dfinance::config::ClientConfig;
use dfinance::script_args::{encode, ArgInput, ScriptArg, TypeTag, VectorInput};
use dfinance::tracker::{format_tx, normalize, parse_search_result, RawLog, RawTx, TxQuery};
use dfinance::tx::{AccountState, BroadcastMode, SignedEnvelope, TxBuilder, TxParams};
use dfinance::{Api, Signer, Tracker, Wallet};

/// Environment variable holding the wallet mnemonic
const MNEMONIC_ENV: &str = "DFI_MNEMONIC";

/// Main CLI arguments
#[derive(Parser)]
#[command(name = "dfinance")]
#[command(about = "DFINANCE - VM script arguments, signed transactions and event tracking")]
#[command(version = "0.1.0")]
struct Args {
    /// Node REST URL (overrides config and DFI_REST_URL)
    #[arg(long)]
    rest_url: Option<String>,

    /// Chain id (overrides config and DFI_CHAIN_ID)
    #[arg(long)]
    chain_id: Option<String>,

    /// Config file path
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// File holding the wallet mnemonic (falls back to DFI_MNEMONIC)
    #[arg(long)]
    mnemonic_file: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Command to execute
    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Encode one script argument
    Arg {
        /// Type name: bool, u8, u64, u128, vector, address
        type_name: String,
        /// Value to encode
        value: String,
        /// Treat a vector value as text even if it looks like hex
        #[arg(long)]
        ascii: bool,
    },
    /// Show the wallet address
    Address,
    /// Account number, sequence and balance
    Account {
        /// Address to look up (defaults to the wallet address)
        address: Option<String>,
    },
    /// Transaction operations
    Tx {
        #[command(subcommand)]
        command: TxCommands,
    },
    /// Normalize transaction logs from a JSON file
    Logs {
        /// File with a transaction, a search result or a list of logs
        file: PathBuf,
    },
    /// Search transactions
    Track {
        /// Query as JSON, e.g. '{"action":"execute_script","vm":{"module":"0x1::Account"}}'
        query: String,
    },
    /// Multisig issue status by unique id
    Issue {
        unique_id: String,
    },
    /// List currency destroys
    Destroys {
        #[arg(long, default_value_t = 1)]
        page: u64,
        #[arg(long, default_value_t = 100)]
        limit: u64,
    },
    /// Compile Move source on the node
    Compile {
        /// Source file
        file: PathBuf,
        /// Account address (defaults to the wallet address)
        #[arg(long)]
        address: Option<String>,
    },
}

/// Transaction subcommands
#[derive(Subcommand)]
enum TxCommands {
    /// Execute compiled scripts, each with its own arguments
    ExecuteScript {
        /// Hex-encoded compiled script
        #[arg(long)]
        script: String,
        /// Script arguments as type:value, e.g. u64:100 or address:wallet1...
        #[arg(long = "arg")]
        args: Vec<String>,
        /// Extra compiled modules to publish in the same transaction
        #[arg(long = "module")]
        modules: Vec<String>,
        #[command(flatten)]
        options: TxOptions,
    },
    /// Publish compiled modules
    PublishModule {
        /// Hex-encoded compiled module, repeat for several
        #[arg(long = "module", required = true)]
        modules: Vec<String>,
        #[command(flatten)]
        options: TxOptions,
    },
    /// Look up a transaction by hash
    Show {
        hash: String,
    },
}

/// Options shared by transaction builders
#[derive(ClapArgs)]
struct TxOptions {
    /// Gas limit
    #[arg(long)]
    gas: Option<String>,
    /// Memo
    #[arg(long)]
    memo: Option<String>,
    /// Account number (fetched from the node when omitted)
    #[arg(long, requires = "sequence")]
    account_number: Option<u64>,
    /// Sequence (fetched from the node when omitted)
    #[arg(long, requires = "account_number")]
    sequence: Option<u64>,
    /// Broadcast instead of printing the signed transaction
    #[arg(long)]
    broadcast: bool,
    /// Broadcast mode: async, sync or block
    #[arg(long, default_value = "block")]
    mode: BroadcastMode,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&args.log_level))
        .init();

    let mut config = ClientConfig::load(args.config.as_deref())?;
    if let Some(url) = &args.rest_url {
        config.rest_url = url.clone();
    }
    if let Some(chain_id) = &args.chain_id {
        config.chain_id = chain_id.clone();
    }

    match args.command {
        Commands::Arg { type_name, value, ascii } => {
            let tag: TypeTag = type_name.parse()?;
            let input = if ascii && tag == TypeTag::Vector {
                ArgInput::Vector(VectorInput::Ascii(value))
            } else {
                ArgInput::Text(value)
            };
            print_json(&encode(tag, input)?)
        }
        Commands::Address => {
            let wallet = load_wallet(&args.mnemonic_file, &config)?;
            println!("{}", wallet.address());
            Ok(())
        }
        Commands::Account { address } => {
            let address = match address {
                Some(address) => address,
                None => load_wallet(&args.mnemonic_file, &config)?.address().to_string(),
            };
            let api = Api::new(&config.rest_url)?;
            match api.get_account(&address).await? {
                Some(account) => print_json(&account),
                None => Err(anyhow!("Account {} not found", address)),
            }
        }
        Commands::Tx { command } => handle_tx_command(command, &args.mnemonic_file, &config).await,
        Commands::Logs { file } => {
            let contents = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let value: Value = serde_json::from_str(&contents).context("Invalid JSON")?;
            print_json(&normalize_document(value)?)
        }
        Commands::Track { query } => {
            let query: TxQuery = serde_json::from_str(&query).context("Invalid query JSON")?;
            let tracker = Tracker::new(Api::new(&config.rest_url)?);
            print_json(&tracker.track(&query).await?)
        }
        Commands::Issue { unique_id } => {
            let api = Api::new(&config.rest_url)?;
            print_json(&api.get_issue_status(&unique_id).await?)
        }
        Commands::Destroys { page, limit } => {
            let api = Api::new(&config.rest_url)?;
            print_json(&api.get_destroys(page, limit).await?)
        }
        Commands::Compile { file, address } => {
            let code = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let address = match address {
                Some(address) => address,
                None => load_wallet(&args.mnemonic_file, &config)?.address().to_string(),
            };
            let api = Api::new(&config.rest_url)?;
            print_json(&api.compile(&address, &code).await?)
        }
    }
}

async fn handle_tx_command(
    command: TxCommands,
    mnemonic_file: &Option<PathBuf>,
    config: &ClientConfig,
) -> Result<()> {
    let api = Api::new(&config.rest_url)?;

    let (requests, options) = match command {
        TxCommands::Show { hash } => {
            let tx = api.get_transaction_by_hash(&hash).await?;
            return match serde_json::from_value::<RawTx>(tx.clone()) {
                Ok(raw) => print_json(&format_tx(raw)),
                Err(_) => print_json(&tx),
            };
        }
        TxCommands::ExecuteScript {
            script,
            args,
            modules,
            options,
        } => {
            let args = args
                .iter()
                .map(|spec| parse_arg_spec(spec))
                .collect::<Result<Vec<_>>>()?;
            let args = if args.is_empty() { None } else { Some(args) };
            let mut requests = vec![Request::Script(script, args)];
            requests.extend(modules.into_iter().map(Request::Module));
            (requests, options)
        }
        TxCommands::PublishModule { modules, options } => {
            (modules.into_iter().map(Request::Module).collect(), options)
        }
    };

    let wallet = load_wallet(mnemonic_file, config)?;
    let account = match (options.account_number, options.sequence) {
        (Some(account_number), Some(sequence)) => AccountState {
            account_number,
            sequence,
        },
        _ => {
            api.get_account(wallet.address())
                .await?
                .ok_or_else(|| anyhow!("Account {} not found on chain", wallet.address()))?
                .state
        }
    };

    let mut params = TxParams::new()
        .with_account(account)
        .with_wallet(&wallet)
        .with_gas(options.gas.clone().unwrap_or_else(|| config.gas.clone()))
        .with_chain_id(config.chain_id.clone());
    if let Some(memo) = &options.memo {
        params = params.with_memo(memo.clone());
    }

    let mut builder = TxBuilder::new(params).multi();
    for request in requests {
        builder = match request {
            Request::Script(script, args) => builder.execute_script(&script, args)?,
            Request::Module(module) => builder.publish_module(&module)?,
        };
    }
    let tx: SignedEnvelope = builder.combine()?;

    if options.broadcast {
        info!("Broadcasting {} message(s) in {:?} mode", tx.msg.len(), options.mode);
        print_json(&api.broadcast_tx(&tx, options.mode).await?)
    } else {
        print_json(&tx)
    }
}

enum Request {
    Script(String, Option<Vec<ScriptArg>>),
    Module(String),
}

/// Parse `type:value` into an encoded argument
fn parse_arg_spec(spec: &str) -> Result<ScriptArg> {
    let (type_name, value) = spec
        .split_once(':')
        .ok_or_else(|| anyhow!("Argument '{}' must look like type:value", spec))?;
    let tag: TypeTag = type_name.parse()?;
    Ok(encode(tag, ArgInput::Text(value.to_string()))?)
}

/// Normalize a search result, a single transaction or a bare list of logs
fn normalize_document(value: Value) -> Result<Value> {
    if value.get("txs").is_some() {
        let txs: Vec<_> = parse_search_result(value)?.into_iter().map(format_tx).collect();
        return Ok(serde_json::to_value(txs)?);
    }
    if value.get("txhash").is_some() {
        let raw: RawTx = serde_json::from_value(value).context("Invalid transaction")?;
        return Ok(serde_json::to_value(format_tx(raw))?);
    }
    let logs: Vec<RawLog> = serde_json::from_value(value).context("Expected a list of logs")?;
    Ok(serde_json::to_value(normalize(&logs))?)
}

fn load_wallet(mnemonic_file: &Option<PathBuf>, config: &ClientConfig) -> Result<Wallet> {
    let mnemonic = match mnemonic_file {
        Some(path) => read_mnemonic(path)?,
        None => std::env::var(MNEMONIC_ENV)
            .map_err(|_| anyhow!("No mnemonic: pass --mnemonic-file or set {}", MNEMONIC_ENV))?,
    };
    Wallet::from_mnemonic_with_path(mnemonic.trim(), &config.derivation_path, &config.address_prefix)
}

fn read_mnemonic(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read mnemonic file {}", path.display()))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
