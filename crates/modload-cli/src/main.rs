//! Modload CLI
//!
//! Loads a module reference from the command line and prints what it
//! exposes, or prints where a reference resolves to.

mod commands;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "modload")]
#[command(about = "Load CommonJS-style modules and print their exports", long_about = None)]
#[command(version)]
struct Cli {
    /// Log loader activity at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command that builds a loader
#[derive(Args, Debug, Clone, Default)]
pub struct LoaderArgs {
    /// Directory references are resolved against
    #[arg(short, long)]
    pub base: Option<PathBuf>,

    /// Manifest file (defaults to modload.toml in the base directory)
    #[arg(short, long)]
    pub manifest: Option<PathBuf>,

    /// Suffix to probe, in order; repeat to list several
    #[arg(short, long = "ext", value_name = "SUFFIX")]
    pub extensions: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a module and print its exports as JSON
    Run {
        /// Module reference (defaults to the manifest's package.main)
        reference: Option<String>,

        #[command(flatten)]
        loader: LoaderArgs,
    },

    /// Print the file a reference resolves to
    Resolve {
        /// Module reference
        reference: String,

        #[command(flatten)]
        loader: LoaderArgs,
    },
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("MODLOAD_LOG")
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run { reference, loader } => commands::run::execute(reference, &loader),
        Commands::Resolve { reference, loader } => commands::resolve::execute(&reference, &loader),
    }
}
