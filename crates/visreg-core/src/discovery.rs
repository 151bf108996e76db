//! Run and reference discovery
//!
//! Works out which test runs still need comparing, and which reference images
//! exist per case.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;

use log::debug;

use crate::decoders::has_extension;

/// Identifier of one test run, assigned by the harness as an increasing integer
pub type RunId = u64;

/// Inconsistency between the test-run and results trees
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryError {
    /// More results entries than test runs
    ResultsAhead { test_runs: usize, results: usize },
    /// A results entry with no matching test run at the same position
    UnknownResult { run: RunId },
}

impl fmt::Display for DiscoveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscoveryError::ResultsAhead { test_runs, results } => write!(
                f,
                "results root has {} runs but test-run root only has {}; refusing to guess which runs were processed",
                results, test_runs
            ),
            DiscoveryError::UnknownResult { run } => write!(
                f,
                "results entry for run {} has no matching test run",
                run
            ),
        }
    }
}

impl std::error::Error for DiscoveryError {}

/// List run identifiers found as subdirectories of `dir`, ascending.
///
/// A missing directory yields an empty list. Entries whose names are not
/// integers are skipped.
pub fn list_runs(dir: &Path) -> Result<Vec<RunId>, String> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let entries = std::fs::read_dir(dir)
        .map_err(|e| format!("Failed to read directory {}: {}", dir.display(), e))?;

    let mut runs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| format!("Error reading directory entry: {}", e))?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let name = entry.file_name();
        match name.to_str().and_then(|n| n.parse::<RunId>().ok()) {
            Some(run) => runs.push(run),
            None => debug!("Ignoring non-run directory {}", path.display()),
        }
    }

    runs.sort_unstable();
    Ok(runs)
}

/// Runs present under the test-run root but not yet under the results root.
///
/// Both lists are scanned in lock-step; the first index where they diverge
/// marks the start of the unprocessed suffix. Results that run ahead of, or
/// disagree with, the test runs are an error.
pub fn pending_runs(test_runs: &[RunId], results: &[RunId]) -> Result<Vec<RunId>, DiscoveryError> {
    if results.len() > test_runs.len() {
        return Err(DiscoveryError::ResultsAhead {
            test_runs: test_runs.len(),
            results: results.len(),
        });
    }

    let diverge = test_runs
        .iter()
        .zip(results)
        .position(|(t, r)| t != r)
        .unwrap_or(results.len());

    if diverge < results.len() {
        return Err(DiscoveryError::UnknownResult {
            run: results[diverge],
        });
    }

    Ok(test_runs[diverge..].to_vec())
}

/// Pending runs, preferring the recorded ledger over list inference.
///
/// With a ledger, every test run above `last_recorded` is pending. Results
/// entries are still checked so a stale or foreign results tree fails fast.
///
/// Without a ledger the lock-step scan applies, except that a results entry
/// only counts as processed when `recorded_runs` holds it. A results
/// directory left by an invocation whose report never got written is
/// pending again.
pub fn pending_runs_with_ledger(
    test_runs: &[RunId],
    results: &[RunId],
    last_recorded: Option<RunId>,
    recorded_runs: &BTreeSet<RunId>,
) -> Result<Vec<RunId>, DiscoveryError> {
    let Some(last) = last_recorded else {
        let mut pending = pending_runs(test_runs, results)?;
        pending.extend(results.iter().copied().filter(|run| !recorded_runs.contains(run)));
        pending.sort_unstable();
        pending.dedup();
        return Ok(pending);
    };

    if results.len() > test_runs.len() {
        return Err(DiscoveryError::ResultsAhead {
            test_runs: test_runs.len(),
            results: results.len(),
        });
    }
    if let Some(&run) = results.iter().find(|r| test_runs.binary_search(r).is_err()) {
        return Err(DiscoveryError::UnknownResult { run });
    }

    Ok(test_runs.iter().copied().filter(|&run| run > last).collect())
}

/// Reference images per case, both sorted by name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceSet {
    cases: BTreeMap<String, Vec<String>>,
}

impl ReferenceSet {
    /// Scan `reference/<case>/<file>`, keeping files with an accepted extension
    pub fn scan<S: AsRef<str>>(root: &Path, extensions: &[S]) -> Result<Self, String> {
        if !root.is_dir() {
            return Err(format!("Reference directory not found: {}", root.display()));
        }

        let entries = std::fs::read_dir(root)
            .map_err(|e| format!("Failed to read directory {}: {}", root.display(), e))?;

        let mut cases = BTreeMap::new();
        for entry in entries {
            let entry = entry.map_err(|e| format!("Error reading directory entry: {}", e))?;
            let case_dir = entry.path();
            if !case_dir.is_dir() {
                continue;
            }
            let Some(case) = entry.file_name().to_str().map(str::to_string) else {
                debug!("Skipping non UTF-8 case directory {}", case_dir.display());
                continue;
            };

            let files = collect_images(&case_dir, extensions)?;
            cases.insert(case, files);
        }

        Ok(Self { cases })
    }

    /// Cases in sorted order with their sorted file names
    pub fn cases(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.cases.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn case_count(&self) -> usize {
        self.cases.len()
    }

    pub fn image_count(&self) -> usize {
        self.cases.values().map(Vec::len).sum()
    }
}

fn collect_images<S: AsRef<str>>(dir: &Path, extensions: &[S]) -> Result<Vec<String>, String> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| format!("Failed to read directory {}: {}", dir.display(), e))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| format!("Error reading directory entry: {}", e))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if !has_extension(&path, extensions) {
            debug!("Ignoring unsupported reference file {}", path.display());
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            files.push(name.to_string());
        }
    }

    files.sort();
    Ok(files)
}
