//! Comparison pipeline
//!
//! Ties discovery, comparison, reporting and archiving together: every
//! pending run is compared case by case against the reference set, recorded
//! in the report, and the report is persisted after each run.

#[cfg(test)]
mod tests;

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::archive::{ArtifactSet, Archiver};
use crate::compare::{compare_images, Comparison};
use crate::config::ComparisonDefaults;
use crate::decoders::{decode_image, ImageArray};
use crate::discovery::{list_runs, pending_runs_with_ledger, ReferenceSet, RunId};
use crate::exporters::export_image;
use crate::layout::Layout;
use crate::report::{Counters, FileStore, Report, ReportStore};

/// Tunables of one pipeline invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    pub extensions: Vec<String>,
    /// Worker threads for per-case comparison (None = rayon default)
    pub jobs: Option<usize>,
    pub report_name: String,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from_config(&ComparisonDefaults::default())
    }
}

impl PipelineSettings {
    pub fn from_config(comparison: &ComparisonDefaults) -> Self {
        Self {
            extensions: comparison.extensions.clone(),
            jobs: comparison.jobs,
            report_name: comparison.report_name.clone(),
        }
    }
}

/// Outcome counts of one processed run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub run: RunId,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    /// Reference images with no candidate in this run
    pub skipped: usize,
    /// Files that could not be archived
    pub archive_errors: usize,
}

impl RunSummary {
    pub fn compared(&self) -> usize {
        self.passed + self.failed
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineSummary {
    pub runs: Vec<RunSummary>,
    /// Report totals after this invocation
    pub totals: Counters,
    pub report: String,
}

impl PipelineSummary {
    pub fn failed(&self) -> usize {
        self.runs.iter().map(|r| r.failed).sum()
    }
}

/// Run the pipeline against the report file of `layout`
pub fn run_pipeline(layout: &Layout, settings: &PipelineSettings) -> Result<PipelineSummary, String> {
    let store = FileStore::new(&layout.report);
    run_pipeline_with_store(layout, settings, &store)
}

/// Run identifiers that the next pipeline invocation would process
pub fn pending(
    layout: &Layout,
    settings: &PipelineSettings,
    store: &dyn ReportStore,
) -> Result<Vec<RunId>, String> {
    let report = Report::load(store, &settings.report_name)?;
    find_pending(layout, &report)
}

fn find_pending(layout: &Layout, report: &Report) -> Result<Vec<RunId>, String> {
    let test_runs = list_runs(&layout.testruns)?;
    let results = list_runs(&layout.results)?;
    pending_runs_with_ledger(
        &test_runs,
        &results,
        report.last_run(),
        &report.recorded_runs(),
    )
    .map_err(|e| e.to_string())
}

/// Run the pipeline, persisting the report through `store`.
///
/// Everything that can fail fatally (corrupt report, inconsistent run trees,
/// missing reference root) is checked before any file is written.
pub fn run_pipeline_with_store(
    layout: &Layout,
    settings: &PipelineSettings,
    store: &dyn ReportStore,
) -> Result<PipelineSummary, String> {
    let mut report = Report::load(store, &settings.report_name)?;
    let runs = find_pending(layout, &report)?;
    let references = ReferenceSet::scan(&layout.reference, &settings.extensions)?;

    info!(
        "{} reference images in {} cases; {} pending runs",
        references.image_count(),
        references.case_count(),
        runs.len()
    );

    let pool = match settings.jobs {
        Some(threads) => Some(
            rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .map_err(|e| format!("Failed to configure thread pool: {}", e))?,
        ),
        None => None,
    };

    let archiver = Archiver::new(&layout.failed);
    let mut summary = PipelineSummary {
        report: store.describe(),
        ..PipelineSummary::default()
    };

    for run in runs {
        let run_summary = process_run(
            layout,
            &references,
            &archiver,
            pool.as_ref(),
            &mut report,
            run,
        )?;
        report.set_last_run(run);
        report.finalize(store)?;
        info!(
            "Run {}: {} passed, {} failed, {} errors",
            run, run_summary.passed, run_summary.failed, run_summary.errors
        );
        summary.runs.push(run_summary);
    }

    if summary.runs.is_empty() {
        info!("No pending runs");
        report.finalize(store)?;
    }

    summary.totals = report.counters;
    Ok(summary)
}

/// Paths of one reference/candidate pair
struct ImageJob {
    case: String,
    file: String,
    reference: PathBuf,
    candidate: PathBuf,
    diff: PathBuf,
    alpha_diff: PathBuf,
}

enum ImageOutcome {
    Compared {
        comparison: Box<Comparison>,
        diff: Option<PathBuf>,
        alpha_diff: Option<PathBuf>,
    },
    Undecodable(String),
}

fn process_run(
    layout: &Layout,
    references: &ReferenceSet,
    archiver: &Archiver,
    pool: Option<&rayon::ThreadPool>,
    report: &mut Report,
    run: RunId,
) -> Result<RunSummary, String> {
    info!("Processing run {}", run);

    let results_dir = layout.results_run_dir(run);
    fs::create_dir_all(&results_dir)
        .map_err(|e| format!("Failed to create directory {}: {}", results_dir.display(), e))?;

    let mut summary = RunSummary {
        run,
        ..RunSummary::default()
    };

    for (case, files) in references.cases() {
        let case_dir = layout.testruns.join(run.to_string()).join(case);
        if !case_dir.is_dir() {
            debug!("Run {} has no case {}; skipping", run, case);
            summary.skipped += files.len();
            continue;
        }

        let mut jobs = Vec::with_capacity(files.len());
        for file in files {
            let candidate = layout.candidate_image(run, case, file);
            if !candidate.is_file() {
                debug!("Run {} has no {}/{}; skipping", run, case, file);
                summary.skipped += 1;
                continue;
            }
            if report.contains(run, case, file) {
                debug!("Run {} {}/{} already recorded", run, case, file);
                continue;
            }
            jobs.push(ImageJob {
                case: case.to_string(),
                file: file.clone(),
                reference: layout.reference_image(case, file),
                candidate,
                diff: layout.diff_image(run, case, file),
                alpha_diff: layout.alpha_diff_image(run, case, file),
            });
        }

        let work = || -> Vec<ImageOutcome> { jobs.par_iter().map(process_image).collect() };
        let outcomes = match pool {
            Some(pool) => pool.install(work),
            None => work(),
        };

        for (job, outcome) in jobs.iter().zip(outcomes) {
            record_outcome(report, archiver, &mut summary, run, job, outcome);
        }
    }

    Ok(summary)
}

fn record_outcome(
    report: &mut Report,
    archiver: &Archiver,
    summary: &mut RunSummary,
    run: RunId,
    job: &ImageJob,
    outcome: ImageOutcome,
) {
    match outcome {
        ImageOutcome::Undecodable(message) => {
            warn!("Run {} {}/{}: {}", run, job.case, job.file, message);
            report.record_error(&job.case, &job.file, run, &message);
            summary.errors += 1;
        }
        ImageOutcome::Compared {
            comparison,
            diff,
            alpha_diff,
        } => {
            report.record(&job.case, &job.file, run, &comparison);
            if comparison.passed() {
                summary.passed += 1;
                return;
            }

            summary.failed += 1;
            info!(
                "Run {} {}/{} failed: {}",
                run,
                job.case,
                job.file,
                comparison.summary()
            );
            let archived = archiver.archive(&ArtifactSet {
                run,
                case: job.case.clone(),
                file: job.file.clone(),
                reference: job.reference.clone(),
                candidate: job.candidate.clone(),
                diff,
                alpha_diff,
            });
            summary.archive_errors += archived.errors.len();
        }
    }
}

/// Decode, compare and write diff images for one pair
fn process_image(job: &ImageJob) -> ImageOutcome {
    let reference = match decode_image(&job.reference) {
        Ok(image) => image,
        Err(e) => return ImageOutcome::Undecodable(format!("reference: {}", e)),
    };
    let candidate = match decode_image(&job.candidate) {
        Ok(image) => image,
        Err(e) => return ImageOutcome::Undecodable(format!("candidate: {}", e)),
    };

    let comparison = compare_images(&reference, &candidate);

    let diff = write_diff(&comparison.diff_composite(), &job.diff);
    let alpha_diff = comparison
        .alpha_difference()
        .and_then(|alpha| write_diff(&alpha, &job.alpha_diff));

    ImageOutcome::Compared {
        comparison: Box::new(comparison),
        diff,
        alpha_diff,
    }
}

fn write_diff(image: &ImageArray, path: &Path) -> Option<PathBuf> {
    let written = path
        .parent()
        .map_or(Ok(()), fs::create_dir_all)
        .map_err(|e| format!("Failed to create directory for {}: {}", path.display(), e))
        .and_then(|()| export_image(image, path));

    match written {
        Ok(()) => Some(path.to_path_buf()),
        Err(e) => {
            warn!("Failed to write diff image {}: {}", path.display(), e);
            None
        }
    }
}
