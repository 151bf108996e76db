use std::path::PathBuf;

use clap::{Parser, Subcommand};
use env_logger::{Builder, Env};
use log::LevelFilter;

use visreg_cli::TreeArgs;

mod commands;

use commands::{cmd_compare, cmd_diff, cmd_pending, cmd_summary};

#[derive(Parser)]
#[command(name = "visreg")]
#[command(version, about = "Visual regression comparator for rendered test runs", long_about = None)]
struct Cli {
    /// Show debug output (overrides RUST_LOG)
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only show warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare every unprocessed test run against the reference images
    Compare {
        #[command(flatten)]
        tree: TreeArgs,
    },

    /// List test runs that have not been compared yet
    Pending {
        #[command(flatten)]
        tree: TreeArgs,
    },

    /// Compare a single reference/candidate pair
    Diff {
        /// Reference image
        #[arg(value_name = "REFERENCE")]
        reference: PathBuf,

        /// Candidate image
        #[arg(value_name = "CANDIDATE")]
        candidate: PathBuf,

        /// Write the diff images into this directory
        #[arg(short, long, value_name = "DIR")]
        out: Option<PathBuf>,
    },

    /// Show per-case counters of the accumulated report
    Summary {
        #[command(flatten)]
        tree: TreeArgs,
    },
}

fn init_logging(verbose: bool, quiet: bool) {
    let mut builder = Builder::from_env(Env::default().default_filter_or("info"));
    if verbose {
        builder.filter_level(LevelFilter::Debug);
    } else if quiet {
        builder.filter_level(LevelFilter::Warn);
    }
    builder.format_timestamp(None).format_target(false);
    drop(builder.try_init());
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Compare { tree } => cmd_compare(tree),
        Commands::Pending { tree } => cmd_pending(tree),
        Commands::Diff {
            reference,
            candidate,
            out,
        } => cmd_diff(reference, candidate, out),
        Commands::Summary { tree } => cmd_summary(tree),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
