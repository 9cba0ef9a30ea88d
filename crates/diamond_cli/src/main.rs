//! Diamond CLI
//!
//! Command-line tools for the diamond dispatch registry.
//!
//! # Commands
//!
//! - `inspect` - Build a diamond from a JSON plan and show its loupe views
//! - `blobs` - Summarize a blob log file
//! - `bench` - Measure cached vs live loupe cost over a grid
//! - `report` - Render benchmark CSV as a Markdown report

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Diamond command-line tools.
#[derive(Parser)]
#[command(name = "diamond")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a diamond from a plan and show its facets
    Inspect {
        /// Path to the JSON plan
        plan: PathBuf,

        /// Write shard blobs to this log instead of memory
        #[arg(short, long)]
        blobs: Option<PathBuf>,

        /// Also list the facets of this category
        #[arg(short, long)]
        category: Option<String>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Summarize a blob log file
    Blobs {
        /// Path to the blob log
        path: PathBuf,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Measure loupe read cost, cached vs live
    Bench {
        /// Selector counts (comma-separated)
        #[arg(short, long, value_delimiter = ',', default_value = "10,50,100,500")]
        selectors: Vec<usize>,

        /// Facet counts (comma-separated)
        #[arg(short, long, value_delimiter = ',', default_value = "1,5,10,50")]
        facets: Vec<usize>,

        /// Write CSV here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Render benchmark CSV as Markdown
    Report {
        /// Benchmark CSV
        #[arg(default_value = "benchmark.csv")]
        input: PathBuf,

        /// Write Markdown here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Inspect {
            plan,
            blobs,
            category,
            format,
        } => {
            commands::inspect::run(&plan, blobs.as_deref(), category.as_deref(), &format)?;
        }
        Commands::Blobs { path, format } => {
            commands::blobs::run(&path, &format)?;
        }
        Commands::Bench {
            selectors,
            facets,
            output,
        } => {
            commands::bench::run(&selectors, &facets, output.as_deref())?;
        }
        Commands::Report { input, output } => {
            commands::report::run(&input, output.as_deref())?;
        }
        Commands::Version => {
            println!("Diamond CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("Diamond Core v{}", diamond_core::VERSION);
        }
    }

    Ok(())
}
