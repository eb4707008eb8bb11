//! Leapjoin CLI
//!
//! Performance harness for the leapfrog join engine:
//! - `bench`: generate a random edge relation and time a query shape over it
//! - `plan`: print the depth/leg layout of a query shape

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use tracing::Level;

mod bench;
mod synthetic;

use bench::{BenchArgs, Shape};

#[derive(Parser)]
#[command(name = "leapjoin")]
#[command(author, version, about = "Leapfrog multi-way joins over sorted relations")]
struct Cli {
    /// Log verbosity (`-v` debug, `-vv` trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Time a query shape over a synthetic edge relation.
    Bench(BenchArgs),

    /// Print the depth/leg layout of a query shape.
    Plan {
        #[arg(long, value_enum, default_value_t = Shape::Path)]
        shape: Shape,

        /// Print the layout as JSON.
        #[arg(long)]
        json: bool,
    },
}

fn log_level(verbose: u8) -> Level {
    match verbose {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(log_level(cli.verbose))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Bench(args) => {
            bench::cmd_bench(&args)?;
        }
        Commands::Plan { shape, json } => {
            bench::cmd_plan(shape, json)?;
        }
    }
    Ok(())
}
