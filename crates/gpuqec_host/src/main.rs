mod binding;
mod generator;
mod stats;
mod throughput;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gpuqec", about = "GPU decoder binding tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a binding manifest and list what it binds.
    Check { manifest: String },
    /// Print the call id derived from each function name.
    CallId {
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Pack a 0/1 string into a transport word.
    Pack { bits: String },
    /// Unpack a transport word into `size` bits.
    Unpack { word: String, size: usize },
    /// Pack every shot of a .b8 file.
    Encode {
        #[arg(short, long)]
        b8: String,
        #[arg(short, long)]
        size: usize,
        #[arg(long)]
        print_words: bool,
    },
    /// Write random syndrome shots.
    Gen {
        #[arg(long, default_value = "bench.b8")]
        b8: String,
        #[arg(long, default_value_t = 21)]
        size: usize,
        #[arg(long, default_value_t = 100_000)]
        shots: usize,
        #[arg(long, default_value_t = 0.005)]
        p: f64,
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gpuqec=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Check { manifest } => {
            binding::check_manifest(&manifest)?;
        }
        Commands::CallId { names } => binding::print_call_ids(&names),
        Commands::Pack { bits } => {
            binding::pack(&bits)?;
        }
        Commands::Unpack { word, size } => {
            binding::unpack(&word, size)?;
        }
        Commands::Encode {
            b8,
            size,
            print_words,
        } => {
            throughput::run_encode(&b8, size, print_words)?;
        }
        Commands::Gen {
            b8,
            size,
            shots,
            p,
            seed,
        } => {
            generator::generate_syndromes(&b8, size, shots, p, seed)?;
        }
    }
    Ok(())
}
