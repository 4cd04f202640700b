//! qmap Command-Line Interface
//!
//! Unrolls OpenQASM 2.0 circuits and maps them onto devices with
//! restricted qubit connectivity.
//!
//! ```text
//! qmap unroll bell.qasm --basis u1,u2,u3,cx --format json
//! qmap map ghz.qasm --device device.yaml --seed 7 -o mapped.qasm
//! qmap coupling linear:5
//! ```

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use clap::{Parser, Subcommand};
use console::style;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::common::{DEFAULT_BASIS, OutputFormat};
use commands::{coupling, map, unroll, version};

/// qmap - OpenQASM 2.0 unrolling and qubit mapping
#[derive(Parser)]
#[command(name = "qmap")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Unroll a circuit into a gate basis
    Unroll {
        /// Input file (OpenQASM 2.0)
        input: String,

        /// Gates kept whole; everything else expands to U and CX
        #[arg(short, long, value_delimiter = ',', default_value = DEFAULT_BASIS)]
        basis: Vec<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Qasm)]
        format: OutputFormat,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Map a circuit onto a device
    Map {
        /// Input file (OpenQASM 2.0)
        input: String,

        /// Device file (YAML or JSON), or linear:N, star:N, full:N
        #[arg(short, long)]
        device: String,

        /// Randomized trials per layer
        #[arg(short, long, default_value = "20", env = "QMAP_TRIALS")]
        trials: usize,

        /// Seed for reproducible mapping
        #[arg(short, long, env = "QMAP_SEED")]
        seed: Option<u64>,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Show a device coupling graph and its distances
    Coupling {
        /// Device file (YAML or JSON), or linear:N, star:N, full:N
        device: String,
    },

    /// Show version information
    Version,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Unroll {
            input,
            basis,
            format,
            output,
        } => unroll::execute(&input, &basis, format, output.as_deref()),

        Commands::Map {
            input,
            device,
            trials,
            seed,
            output,
        } => map::execute(&input, &device, trials, seed, output.as_deref()),

        Commands::Coupling { device } => coupling::execute(&device),

        Commands::Version => {
            version::execute();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}
