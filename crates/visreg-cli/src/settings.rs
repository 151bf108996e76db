//! Resolve command line arguments against the loaded configuration.

use std::path::PathBuf;

use visreg_core::config::{load_config, log_config_usage, VisregConfig};
use visreg_core::pipeline::PipelineSettings;
use visreg_core::Layout;

use crate::args::TreeArgs;

/// Everything a subcommand needs to work on a tree
#[derive(Debug, Clone)]
pub struct ResolvedTree {
    pub layout: Layout,
    pub settings: PipelineSettings,
    pub config_source: Option<PathBuf>,
}

/// Load the config (honouring `--config`) and apply CLI overrides
pub fn resolve_tree(args: &TreeArgs) -> ResolvedTree {
    let handle = load_config(args.config.as_deref());
    log_config_usage(&handle);

    let (layout, settings) = apply_overrides(&handle.config, args);
    ResolvedTree {
        layout,
        settings,
        config_source: handle.source,
    }
}

/// Flags win over config values; `-j 0` means "use the default"
pub fn apply_overrides(config: &VisregConfig, args: &TreeArgs) -> (Layout, PipelineSettings) {
    let mut layout_defaults = config.layout.clone();
    if let Some(root) = &args.root {
        layout_defaults.root = root.to_string_lossy().into_owned();
    }

    let mut layout = Layout::from_defaults(&layout_defaults);
    if let Some(report) = &args.report {
        layout = layout.with_report(report.clone());
    }

    let mut settings = PipelineSettings::from_config(&config.comparison);
    if let Some(jobs) = args.jobs {
        settings.jobs = (jobs > 0).then_some(jobs);
    }

    (layout, settings)
}
