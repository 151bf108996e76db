//! Default layout and comparison settings and their sanitization.

use serde::Deserialize;

use crate::decoders::SUPPORTED_EXTENSIONS;

/// Directory layout of a visual regression tree
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LayoutDefaults {
    /// Root of the tree; everything else is relative to it
    pub root: String,
    pub reference_dir: String,
    pub testruns_dir: String,
    pub results_dir: String,
    /// Failure archive
    pub failed_dir: String,
    /// Report document, relative to `root` unless absolute
    pub report_file: String,
}

impl Default for LayoutDefaults {
    fn default() -> Self {
        Self {
            root: "visregtests".to_string(),
            reference_dir: "reference".to_string(),
            testruns_dir: "testruns".to_string(),
            results_dir: "results".to_string(),
            failed_dir: "failed".to_string(),
            report_file: "result.xml".to_string(),
        }
    }
}

impl LayoutDefaults {
    pub(crate) fn sanitize(&mut self) {
        let defaults = Self::default();
        restore_if_blank(&mut self.root, &defaults.root);
        restore_if_blank(&mut self.reference_dir, &defaults.reference_dir);
        restore_if_blank(&mut self.testruns_dir, &defaults.testruns_dir);
        restore_if_blank(&mut self.results_dir, &defaults.results_dir);
        restore_if_blank(&mut self.failed_dir, &defaults.failed_dir);
        restore_if_blank(&mut self.report_file, &defaults.report_file);
    }
}

/// Comparison behaviour
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ComparisonDefaults {
    /// Accepted image extensions, without the leading dot
    pub extensions: Vec<String>,
    /// Worker threads for per-case comparison (None = rayon default)
    pub jobs: Option<usize>,
    /// `name` attribute of the report root
    pub report_name: String,
}

impl Default for ComparisonDefaults {
    fn default() -> Self {
        Self {
            extensions: SUPPORTED_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            jobs: None,
            report_name: "visreg".to_string(),
        }
    }
}

impl ComparisonDefaults {
    pub(crate) fn sanitize(&mut self) {
        let mut extensions: Vec<String> = self
            .extensions
            .iter()
            .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        extensions.dedup();
        if extensions.is_empty() {
            extensions = Self::default().extensions;
        }
        self.extensions = extensions;

        if self.jobs == Some(0) {
            self.jobs = None;
        }

        restore_if_blank(&mut self.report_name, "visreg");
    }
}

fn restore_if_blank(value: &mut String, default: &str) {
    if value.trim().is_empty() {
        *value = default.to_string();
    }
}
