//! Failure archive
//!
//! Copies the inputs and outputs of failing comparisons into the failure
//! root, grouped by role: `reference/<case>/<file>`,
//! `testruns/<run>/<case>/<file>` and `results/<run>/<case>/<file>`.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::discovery::RunId;
use crate::layout::alpha_sibling;

/// Archive subdirectory of reference images
pub const REFERENCE_ROLE: &str = "reference";
/// Archive subdirectory of candidate images
pub const CANDIDATE_ROLE: &str = "testruns";
/// Archive subdirectory of diff images
pub const RESULT_ROLE: &str = "results";

/// Files belonging to one failing comparison
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSet {
    pub run: RunId,
    pub case: String,
    pub file: String,
    pub reference: PathBuf,
    pub candidate: PathBuf,
    pub diff: Option<PathBuf>,
    pub alpha_diff: Option<PathBuf>,
}

impl ArtifactSet {
    /// Source path and archive path (relative to the failure root) of every file
    pub fn entries(&self) -> Vec<(&Path, PathBuf)> {
        let run = self.run.to_string();
        let reference = Path::new(REFERENCE_ROLE).join(&self.case).join(&self.file);
        let candidate = Path::new(CANDIDATE_ROLE).join(&run).join(&self.case).join(&self.file);
        let result = Path::new(RESULT_ROLE).join(&run).join(&self.case).join(&self.file);

        let mut entries = vec![
            (self.reference.as_path(), reference),
            (self.candidate.as_path(), candidate),
        ];
        if let Some(alpha) = &self.alpha_diff {
            entries.push((alpha.as_path(), alpha_sibling(&result)));
        }
        if let Some(diff) = &self.diff {
            entries.push((diff.as_path(), result));
        }
        entries
    }
}

/// What an archive call managed to copy
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveOutcome {
    pub copied: Vec<PathBuf>,
    pub errors: Vec<String>,
}

impl ArchiveOutcome {
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Copies artifact sets into `failed_root`
#[derive(Debug, Clone)]
pub struct Archiver {
    failed_root: PathBuf,
}

impl Archiver {
    pub fn new(failed_root: impl Into<PathBuf>) -> Self {
        Self {
            failed_root: failed_root.into(),
        }
    }

    /// Copy every present file of `artifacts`. Failures are collected, not raised.
    pub fn archive(&self, artifacts: &ArtifactSet) -> ArchiveOutcome {
        let mut outcome = ArchiveOutcome::default();

        for (source, relative) in artifacts.entries() {
            let destination = self.failed_root.join(relative);
            match copy_file(source, &destination) {
                Ok(()) => {
                    debug!("Archived {} -> {}", source.display(), destination.display());
                    outcome.copied.push(destination);
                }
                Err(err) => {
                    warn!("{}", err);
                    outcome.errors.push(err);
                }
            }
        }

        outcome
    }
}

fn copy_file(source: &Path, destination: &Path) -> Result<(), String> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create directory {}: {}", parent.display(), e))?;
    }
    fs::copy(source, destination).map_err(|e| {
        format!(
            "Failed to archive {} to {}: {}",
            source.display(),
            destination.display(),
            e
        )
    })?;
    Ok(())
}
