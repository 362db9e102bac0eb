//! swapvm CLI - quote, swap and (dis)assemble pricing programs
//!
//! # Examples
//!
//! ```bash
//! # Assemble a program from a JSON instruction list
//! echo '[{"op":"static_balances","token_a":"aa..","amount_a":"0x3e8",
//!         "token_b":"bb..","amount_b":"0x3e8"},{"op":"xyc_swap"}]' | swapvm asm
//!
//! # Quote 100 units in
//! swapvm quote --program 0x04680a.. --token-in aa.. --token-out bb.. --amount 100
//!
//! # Swap against a fresh in-memory ledger; protocol fees are paid by the maker
//! swapvm swap --program 0x.. --token-in aa.. --token-out bb.. --amount 100 \
//!     --fund aa..:<maker>:1000
//! ```

use std::io::{self, Read};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use swapvm::{Address, Hash, Instruction, MemoryLedger, ProgramBuilder, SwapVm, TradeQuery, U256};
use tracing::info;

mod config;
mod parse;

use config::CliConfig;
use parse::Funding;

#[derive(Parser, Debug)]
#[command(name = "swapvm")]
#[command(about = "bytecode pricing interpreter", long_about = None, version)]
struct Cli {
    /// TOML config with [limits] and timestamp
    #[arg(long, global = true, env = "SWAPVM_CONFIG")]
    config: Option<PathBuf>,

    /// Override limits.max_steps
    #[arg(long, global = true)]
    max_steps: Option<usize>,

    /// Override limits.max_depth
    #[arg(long, global = true)]
    max_depth: Option<usize>,

    /// Ledger clock in unix seconds (defaults to now)
    #[arg(long, global = true)]
    timestamp: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct TradeArgs {
    /// Program as hex, read from stdin when omitted
    #[arg(long)]
    program: Option<String>,

    /// Token the taker gives
    #[arg(long, value_parser = parse::address)]
    token_in: Address,

    /// Token the taker receives
    #[arg(long, value_parser = parse::address)]
    token_out: Address,

    /// Fixed amount (decimal or 0x hex); amount_in unless --exact-out
    #[arg(long, value_parser = parse::amount)]
    amount: U256,

    /// Fix amount_out and solve amount_in
    #[arg(long)]
    exact_out: bool,

    #[arg(long, value_parser = parse::address, default_value = "0000000000000000000000000000000000000001")]
    maker: Address,

    #[arg(long, value_parser = parse::address, default_value = "0000000000000000000000000000000000000002")]
    taker: Address,

    /// Defaults to sha256(maker || program)
    #[arg(long, value_parser = parse::hash)]
    order_hash: Option<Hash>,

    /// Extra taker-supplied bytes as hex
    #[arg(long)]
    taker_data: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Price a trade without side effects
    Quote(TradeArgs),

    /// Price a trade and commit its effects to an in-memory ledger
    Swap {
        #[command(flatten)]
        trade: TradeArgs,

        /// Credit TOKEN:HOLDER:AMOUNT before swapping (repeatable)
        #[arg(long = "fund", value_parser = parse::funding)]
        funds: Vec<Funding>,
    },

    /// List the instructions of a program
    Disasm {
        /// Program as hex, read from stdin when omitted
        program: Option<String>,
    },

    /// Assemble a JSON instruction list into program hex
    Asm {
        /// JSON file, read from stdin when omitted
        file: Option<PathBuf>,
    },
}

fn read_stdin() -> Result<String> {
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf).context("failed to read stdin")?;
    Ok(buf)
}

fn read_program(arg: Option<&str>) -> Result<Vec<u8>> {
    match arg {
        Some(hex) => parse::bytes(hex),
        None => parse::bytes(&read_stdin()?),
    }
    .context("failed to decode program")
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

struct Trade {
    program: Vec<u8>,
    query: TradeQuery,
    amount: U256,
    taker_data: Vec<u8>,
}

impl TryFrom<TradeArgs> for Trade {
    type Error = anyhow::Error;

    fn try_from(args: TradeArgs) -> Result<Self> {
        let program = read_program(args.program.as_deref())?;
        let taker_data = match args.taker_data.as_deref() {
            Some(hex) => parse::bytes(hex).context("failed to decode taker data")?,
            None => Vec::new(),
        };
        let query = TradeQuery {
            token_in: args.token_in,
            token_out: args.token_out,
            is_exact_in: !args.exact_out,
            maker: args.maker,
            taker: args.taker,
            order_hash: args
                .order_hash
                .unwrap_or_else(|| swapvm::order_hash(&args.maker, &program)),
        };
        Ok(Self {
            program,
            query,
            amount: args.amount,
            taker_data,
        })
    }
}

fn quote_command(vm: &SwapVm, timestamp: u64, args: TradeArgs) -> Result<()> {
    let trade = Trade::try_from(args)?;
    let ledger = MemoryLedger::new(timestamp);
    let quote = vm
        .quote(&trade.program, &trade.query, trade.amount, &trade.taker_data, &ledger)
        .context("quote failed")?;

    let out = json!({
        "amount_in": quote.amount_in.to_string(),
        "amount_out": quote.amount_out.to_string(),
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn swap_command(vm: &SwapVm, timestamp: u64, args: TradeArgs, funds: Vec<Funding>) -> Result<()> {
    let trade = Trade::try_from(args)?;
    let mut ledger = MemoryLedger::new(timestamp);
    for fund in funds {
        ledger.fund(fund.token, fund.holder, fund.amount);
    }

    let receipt = vm
        .swap(&trade.program, &trade.query, trade.amount, &trade.taker_data, &mut ledger)
        .context("swap failed")?;

    let out = json!({
        "amount_in": receipt.quote.amount_in.to_string(),
        "amount_out": receipt.quote.amount_out.to_string(),
        "effects": receipt.effects,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn disasm_command(program: Option<String>) -> Result<()> {
    let program = read_program(program.as_deref())?;
    print!("{}", swapvm::disassemble(&program).context("disassembly failed")?);
    Ok(())
}

fn asm_command(file: Option<PathBuf>) -> Result<()> {
    let source = match &file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => read_stdin()?,
    };
    let instructions: Vec<Instruction> = serde_json::from_str(&source).context("invalid instruction list")?;
    let program = instructions
        .into_iter()
        .collect::<ProgramBuilder>()
        .build()
        .context("assembly failed")?;
    println!("0x{}", hex::encode(program));
    Ok(())
}

fn main() -> Result<()> {
    // logs go to stderr, results to stdout
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "swapvm=info".into()),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => CliConfig::load(path)?,
        None => CliConfig::default(),
    }
    .with_overrides(cli.max_steps, cli.max_depth, cli.timestamp);
    let timestamp = config.timestamp.unwrap_or_else(now);
    let vm = SwapVm::new(config.limits);
    info!(max_steps = config.limits.max_steps, max_depth = config.limits.max_depth, timestamp, "swapvm");

    match cli.command {
        Commands::Quote(args) => quote_command(&vm, timestamp, args),
        Commands::Swap { trade, funds } => swap_command(&vm, timestamp, trade, funds),
        Commands::Disasm { program } => disasm_command(program),
        Commands::Asm { file } => asm_command(file),
    }
}
