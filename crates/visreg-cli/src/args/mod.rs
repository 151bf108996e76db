//! Argument structs shared between subcommands.

use std::path::PathBuf;

use clap::Args;

/// Location of the regression tree and how to process it
#[derive(Args, Clone, Debug, Default)]
pub struct TreeArgs {
    /// Root of the regression tree (reference/, testruns/, results/, failed/)
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Report file (default: <root>/result.xml, resolved against the tree
    /// root rather than the working directory; see layout.report_file)
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Config file (default: search visreg.yml)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Number of parallel comparison threads
    #[arg(short = 'j', long, value_name = "N")]
    pub jobs: Option<usize>,
}
