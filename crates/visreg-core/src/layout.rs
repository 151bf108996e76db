//! Paths of a visual regression tree.

use std::path::{Path, PathBuf};

use crate::config::LayoutDefaults;
use crate::discovery::RunId;

/// Resolved directories of one tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub root: PathBuf,
    pub reference: PathBuf,
    pub testruns: PathBuf,
    pub results: PathBuf,
    pub failed: PathBuf,
    pub report: PathBuf,
}

impl Layout {
    /// Standard layout under `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let mut defaults = LayoutDefaults::default();
        let root = root.into();
        defaults.root = root.to_string_lossy().into_owned();
        Self::from_defaults(&defaults)
    }

    /// Resolve configured names against the configured root
    pub fn from_defaults(defaults: &LayoutDefaults) -> Self {
        let root = PathBuf::from(&defaults.root);
        Self {
            reference: root.join(&defaults.reference_dir),
            testruns: root.join(&defaults.testruns_dir),
            results: root.join(&defaults.results_dir),
            failed: root.join(&defaults.failed_dir),
            report: root.join(&defaults.report_file),
            root,
        }
    }

    pub fn with_report(mut self, report: impl Into<PathBuf>) -> Self {
        self.report = report.into();
        self
    }

    pub fn reference_image(&self, case: &str, file: &str) -> PathBuf {
        self.reference.join(case).join(file)
    }

    pub fn candidate_image(&self, run: RunId, case: &str, file: &str) -> PathBuf {
        self.testruns.join(run.to_string()).join(case).join(file)
    }

    pub fn results_run_dir(&self, run: RunId) -> PathBuf {
        self.results.join(run.to_string())
    }

    pub fn diff_image(&self, run: RunId, case: &str, file: &str) -> PathBuf {
        self.results_run_dir(run).join(case).join(file)
    }

    pub fn alpha_diff_image(&self, run: RunId, case: &str, file: &str) -> PathBuf {
        alpha_sibling(&self.diff_image(run, case, file))
    }
}

/// `<dir>/<stem>_alpha.<ext>` next to `path`
pub fn alpha_sibling(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{}_alpha.{}", stem, ext.to_string_lossy()),
        None => format!("{}_alpha", stem),
    };
    path.with_file_name(name)
}
