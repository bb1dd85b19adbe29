use std::fs;
use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use restiming::{
    add_contribution, compress_resource_timing, decompress_resource_timing, CompressedPayload,
    RestimingError, Session, TimingRecord,
};

/// Compress and decompress resource timing payloads.
#[derive(Parser)]
#[command(version)]
struct Args {
    /// Output file, stdout if omitted
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,
    /// Pretty-print the JSON output
    #[arg(short, long, global = true)]
    pretty: bool,
    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compress a JSON array of timing records into a wire payload
    Compress {
        /// Input JSON file
        input: PathBuf,
    },
    /// Decompress a wire payload back into timing records
    Decompress {
        /// Input JSON file
        input: PathBuf,
        /// Score each resource's share of total load time
        #[arg(long)]
        contribution: bool,
    },
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(e) = run(&args) {
        eprintln!("{e}");
        let code = match e {
            RestimingError::Json(_) => 2,
            _ => 1,
        };
        std::process::exit(code);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: &Args) -> Result<(), RestimingError> {
    let mut session = Session::new();

    let json = match &args.command {
        Command::Compress { input } => {
            let raw = fs::read_to_string(input)?;
            let records: Vec<TimingRecord> = serde_json::from_str(&raw)?;
            let payload = compress_resource_timing(&mut session, &records, None)?;
            to_json(&payload, args.pretty)?
        }
        Command::Decompress {
            input,
            contribution,
        } => {
            let raw = fs::read_to_string(input)?;
            let payload: CompressedPayload = serde_json::from_str(&raw)?;
            let mut records = decompress_resource_timing(&session, &payload);
            if *contribution {
                add_contribution(&mut records);
            }
            to_json(&records, args.pretty)?
        }
    };

    match &args.output {
        Some(path) => fs::write(path, json + "\n")?,
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{json}")?;
        }
    }
    Ok(())
}

fn to_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<String, RestimingError> {
    Ok(if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    })
}
