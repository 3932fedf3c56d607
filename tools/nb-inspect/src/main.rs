//! NB-Inspect: Nock bridge operator CLI
//!
//! Offline checks for destination encoding, payloads, the bridge lock and fees.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use nb_bridge::BridgeConfig;
use nb_inspect::{decode_payload, deposits_report, encode_address, fee_report, lock_report};
use nb_telemetry::{init_telemetry, TelemetryConfig};

/// NB-Inspect: Nock bridge operator CLI
#[derive(Parser, Debug)]
#[command(name = "nb-inspect")]
#[command(about = "Inspect Nock bridge payloads, locks and fees")]
struct Args {
    /// JSON bridge configuration (defaults to NB_* environment variables)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Encode a destination address into belts and a jam'd payload
    Encode {
        /// 0x-prefixed 20-byte address
        address: String,
    },
    /// Decode a hex payload back to its destination
    Decode {
        /// Jam'd payload as hex
        payload: String,
    },
    /// Print the bridge multisig lock root
    LockRoot,
    /// Estimate fees for a transaction shape
    EstimateFee {
        /// Number of input notes
        #[arg(short, long, default_value = "1")]
        inputs: usize,
        /// Number of outputs (default: inputs + 1)
        #[arg(short, long)]
        seeds: Option<usize>,
        /// Payload bytes (default: largest payload)
        #[arg(short, long)]
        metadata_bytes: Option<usize>,
    },
    /// Decode deposits from a JSON dump of notes at the bridge lock
    Deposits {
        /// JSON file holding an array of notes
        file: PathBuf,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<BridgeConfig> {
    match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            Ok(BridgeConfig::from_json(&raw)?)
        }
        None => Ok(BridgeConfig::from_env()?),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut telemetry = TelemetryConfig::for_tool("inspect");
    if args.verbose {
        telemetry = telemetry.with_log_level("debug");
    }
    let _guard = init_telemetry(telemetry)?;

    let config = load_config(args.config.as_ref())?;
    tracing::debug!("[nb-inspect] Chain tag {}, minimum {}", config.chain_tag, config.minimum_amount);

    match args.command {
        Command::Encode { address } => print_json(&encode_address(&address, &config)?),
        Command::Decode { payload } => print_json(&decode_payload(&payload, &config)?),
        Command::LockRoot => print_json(&lock_report(&config)?),
        Command::EstimateFee {
            inputs,
            seeds,
            metadata_bytes,
        } => print_json(&fee_report(&config, inputs, seeds, metadata_bytes)?),
        Command::Deposits { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            print_json(&deposits_report(&raw, &config).await?)
        }
    }
}
