//! Pipeline scenario tests over real image trees

use super::*;
use crate::config::LayoutDefaults;
use crate::report::{CaseStatus, MemoryStore};
use std::path::Path;
use tempfile::tempdir;

fn write_image(path: &Path, image: &ImageArray) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    export_image(image, path).unwrap();
}

fn black(channels: u8) -> ImageArray {
    let mut image = ImageArray::filled(10, 10, channels, 255.0, 0.0);
    if channels == 4 {
        for px in image.data.chunks_exact_mut(4) {
            px[3] = 255.0;
        }
    }
    image
}

fn tree() -> (tempfile::TempDir, Layout) {
    let dir = tempdir().unwrap();
    let layout = Layout::new(dir.path());
    fs::create_dir_all(&layout.reference).unwrap();
    (dir, layout)
}

/// Store that can be read but never written
struct FailingStore;

impl ReportStore for FailingStore {
    fn read(&self) -> Result<Option<String>, String> {
        Ok(None)
    }

    fn write(&self, _contents: &str) -> Result<(), String> {
        Err("disk full".to_string())
    }

    fn describe(&self) -> String {
        "failing store".to_string()
    }
}

fn gradient(channels: u8, max_value: f32) -> ImageArray {
    let data = (0..10 * 10 * channels as usize)
        .map(|i| (i as f32 * 97.0) % max_value)
        .collect();
    ImageArray::new(10, 10, channels, max_value, data).unwrap()
}

fn count_files(dir: &Path) -> usize {
    if !dir.exists() {
        return 0;
    }
    fs::read_dir(dir)
        .unwrap()
        .map(|entry| {
            let path = entry.unwrap().path();
            if path.is_dir() {
                count_files(&path)
            } else {
                1
            }
        })
        .sum()
}

// ========================================================================
// Scenarios
// ========================================================================

#[test]
fn test_identical_black_image_passes_without_archive() {
    let (_dir, layout) = tree();
    write_image(&layout.reference_image("caseA", "a.png"), &black(3));
    write_image(&layout.candidate_image(1, "caseA", "a.png"), &black(3));

    let summary = run_pipeline(&layout, &PipelineSettings::default()).unwrap();

    assert_eq!(summary.runs.len(), 1);
    assert_eq!(summary.runs[0].passed, 1);
    assert_eq!(summary.totals.tests, 1);
    assert_eq!(summary.totals.failures, 0);
    assert_eq!(count_files(&layout.failed), 0);
    assert!(layout.diff_image(1, "caseA", "a.png").is_file());

    let report = Report::load(&FileStore::new(&layout.report), "visreg").unwrap();
    let suite = report.suite("caseA").unwrap();
    assert_eq!(suite.cases.len(), 1);
    assert_eq!(suite.cases[0].status, CaseStatus::Passed);
    assert_eq!(report.last_run(), Some(1));
}

#[test]
fn test_channel_mismatch_fails_and_archives() {
    let (_dir, layout) = tree();
    write_image(&layout.reference_image("caseA", "a.png"), &black(3));
    write_image(&layout.candidate_image(1, "caseA", "a.png"), &black(4));

    let summary = run_pipeline(&layout, &PipelineSettings::default()).unwrap();

    assert_eq!(summary.failed(), 1);
    assert_eq!(summary.runs[0].archive_errors, 0);
    assert_eq!(count_files(&layout.failed), 3);
    assert!(layout.failed.join("reference/caseA/a.png").is_file());
    assert!(layout.failed.join("testruns/1/caseA/a.png").is_file());

    // Shape mismatch: the diff is the reference itself
    let archived_diff = decode_image(layout.failed.join("results/1/caseA/a.png")).unwrap();
    let rgb: Vec<f32> = archived_diff
        .data
        .chunks_exact(4)
        .flat_map(|px| px[..3].to_vec())
        .collect();
    assert_eq!(rgb, black(3).data);

    let report = Report::load(&FileStore::new(&layout.report), "visreg").unwrap();
    let entry = &report.suite("caseA").unwrap().cases[0];
    assert_eq!(entry.status, CaseStatus::Failed);
    assert!(entry
        .finding
        .as_ref()
        .unwrap()
        .message
        .starts_with("shape mismatch"));
}

#[test]
fn test_alpha_only_failure_writes_and_archives_alpha_diff() {
    let (_dir, layout) = tree();
    let reference = black(4);
    let mut candidate = reference.clone();
    candidate.data[3] = 0.0;
    write_image(&layout.reference_image("caseA", "a.png"), &reference);
    write_image(&layout.candidate_image(1, "caseA", "a.png"), &candidate);

    run_pipeline(&layout, &PipelineSettings::default()).unwrap();

    let alpha = decode_image(layout.alpha_diff_image(1, "caseA", "a.png")).unwrap();
    assert_eq!(alpha.data[0], 255.0);
    assert_eq!(count_files(&layout.failed), 4);
    assert!(layout.failed.join("results/1/caseA/a_alpha.png").is_file());
}

#[test]
fn test_roots_outside_tree_archive_by_role() {
    let tree_dir = tempdir().unwrap();
    let inputs = tempdir().unwrap();
    let defaults = LayoutDefaults {
        root: tree_dir.path().to_string_lossy().into_owned(),
        reference_dir: inputs.path().join("refs").to_string_lossy().into_owned(),
        testruns_dir: inputs.path().join("runs").to_string_lossy().into_owned(),
        ..LayoutDefaults::default()
    };
    let layout = Layout::from_defaults(&defaults);
    write_image(&layout.reference_image("caseA", "a.png"), &black(3));
    write_image(&layout.candidate_image(1, "caseA", "a.png"), &black(4));

    let summary = run_pipeline(&layout, &PipelineSettings::default()).unwrap();

    assert_eq!(summary.failed(), 1);
    assert_eq!(count_files(&layout.failed), 3);
    let reference = decode_image(layout.failed.join("reference/caseA/a.png")).unwrap();
    let candidate = decode_image(layout.failed.join("testruns/1/caseA/a.png")).unwrap();
    assert_eq!(reference.shape(), (10, 10, 3));
    assert_eq!(candidate.shape(), (10, 10, 4));
    assert!(layout.failed.join("results/1/caseA/a.png").is_file());
}

// ========================================================================
// Other formats
// ========================================================================

#[test]
fn test_sixteen_bit_tiff_diff_keeps_format_and_depth() {
    let (_dir, layout) = tree();
    let reference = gradient(3, 65535.0);
    let mut candidate = reference.clone();
    candidate.data[0] = reference.data[0] + 1000.0;
    write_image(&layout.reference_image("caseA", "a.tif"), &reference);
    write_image(&layout.candidate_image(1, "caseA", "a.tif"), &candidate);

    let summary = run_pipeline(&layout, &PipelineSettings::default()).unwrap();

    assert_eq!(summary.failed(), 1);
    let diff = decode_image(layout.diff_image(1, "caseA", "a.tif")).unwrap();
    assert_eq!(diff.max_value, 65535.0);
    assert_eq!(diff.shape(), (10, 10, 4));
    assert_eq!(&diff.data[..4], &[1000.0, 0.0, 0.0, 65535.0]);
    assert_eq!(count_files(&layout.failed), 3);
    assert!(layout.failed.join("results/1/caseA/a.tif").is_file());

    let report = Report::load(&FileStore::new(&layout.report), "visreg").unwrap();
    let finding = report.suite("caseA").unwrap().cases[0].finding.clone().unwrap();
    assert_eq!(finding.kind, "rgb-only");
}

#[test]
fn test_identical_jpeg_pair_passes() {
    let (_dir, layout) = tree();
    let reference = layout.reference_image("caseA", "a.jpg");
    write_image(&reference, &gradient(3, 255.0));
    let candidate = layout.candidate_image(1, "caseA", "a.jpg");
    fs::create_dir_all(candidate.parent().unwrap()).unwrap();
    fs::copy(&reference, &candidate).unwrap();

    let summary = run_pipeline(&layout, &PipelineSettings::default()).unwrap();

    assert_eq!(summary.runs[0].passed, 1);
    assert!(layout.diff_image(1, "caseA", "a.jpg").is_file());
    assert_eq!(count_files(&layout.failed), 0);
}

#[test]
fn test_jpeg_diff_drops_alpha_and_archives() {
    let (_dir, layout) = tree();
    write_image(&layout.reference_image("caseA", "a.jpg"), &black(3));
    write_image(
        &layout.candidate_image(1, "caseA", "a.jpg"),
        &ImageArray::filled(10, 10, 3, 255.0, 255.0),
    );

    let summary = run_pipeline(&layout, &PipelineSettings::default()).unwrap();

    assert_eq!(summary.failed(), 1);
    let diff = decode_image(layout.diff_image(1, "caseA", "a.jpg")).unwrap();
    assert_eq!(diff.channels, 3);
    assert!(!layout.alpha_diff_image(1, "caseA", "a.jpg").exists());
    assert_eq!(count_files(&layout.failed), 3);
    assert!(layout.failed.join("testruns/1/caseA/a.jpg").is_file());
}

#[test]
fn test_second_invocation_only_processes_new_run() {
    let (_dir, layout) = tree();
    let store = MemoryStore::new();
    write_image(&layout.reference_image("caseA", "a.png"), &black(3));
    write_image(&layout.candidate_image(1, "caseA", "a.png"), &black(3));
    run_pipeline_with_store(&layout, &PipelineSettings::default(), &store).unwrap();

    write_image(&layout.candidate_image(2, "caseA", "a.png"), &black(3));
    let summary = run_pipeline_with_store(&layout, &PipelineSettings::default(), &store).unwrap();

    assert_eq!(summary.runs.len(), 1);
    assert_eq!(summary.runs[0].run, 2);
    assert_eq!(summary.totals.tests, 2);
    let report = Report::load(&store, "visreg").unwrap();
    let runs: Vec<RunId> = report.suite("caseA").unwrap().cases.iter().map(|c| c.run).collect();
    assert_eq!(runs, vec![1, 2]);
}

#[test]
fn test_rerun_over_unchanged_tree_is_byte_identical() {
    let (_dir, layout) = tree();
    write_image(&layout.reference_image("caseA", "a.png"), &black(3));
    write_image(&layout.reference_image("caseB", "b.png"), &black(3));
    write_image(&layout.candidate_image(1, "caseA", "a.png"), &black(3));
    write_image(&layout.candidate_image(1, "caseB", "b.png"), &black(4));
    run_pipeline(&layout, &PipelineSettings::default()).unwrap();
    let first = fs::read(&layout.report).unwrap();

    let summary = run_pipeline(&layout, &PipelineSettings::default()).unwrap();

    assert!(summary.runs.is_empty());
    assert_eq!(summary.totals.tests, 2);
    assert_eq!(fs::read(&layout.report).unwrap(), first);
}

#[test]
fn test_results_ahead_is_fatal_and_leaves_report_untouched() {
    let (_dir, layout) = tree();
    let store = MemoryStore::with_contents(Report::new("visreg").to_xml().unwrap());
    write_image(&layout.reference_image("caseA", "a.png"), &black(3));
    write_image(&layout.candidate_image(1, "caseA", "a.png"), &black(3));
    fs::create_dir_all(layout.results_run_dir(1)).unwrap();
    fs::create_dir_all(layout.results_run_dir(2)).unwrap();

    let result = run_pipeline_with_store(&layout, &PipelineSettings::default(), &store);

    assert!(result.unwrap_err().contains("results root has 2 runs"));
    assert_eq!(store.writes(), 0);
}

#[test]
fn test_missing_reference_root_is_fatal() {
    let dir = tempdir().unwrap();
    let layout = Layout::new(dir.path());
    let store = MemoryStore::new();

    let result = run_pipeline_with_store(&layout, &PipelineSettings::default(), &store);

    assert!(result.unwrap_err().contains("Reference directory not found"));
    assert_eq!(store.writes(), 0);
}

// ========================================================================
// Per-image faults
// ========================================================================

#[test]
fn test_missing_candidates_are_skipped() {
    let (_dir, layout) = tree();
    let store = MemoryStore::new();
    write_image(&layout.reference_image("caseA", "a.png"), &black(3));
    write_image(&layout.reference_image("caseA", "b.png"), &black(3));
    write_image(&layout.reference_image("caseB", "c.png"), &black(3));
    write_image(&layout.candidate_image(1, "caseA", "a.png"), &black(3));

    let summary = run_pipeline_with_store(&layout, &PipelineSettings::default(), &store).unwrap();

    assert_eq!(summary.runs[0].compared(), 1);
    assert_eq!(summary.runs[0].skipped, 2);
    assert_eq!(summary.totals.tests, 1);
    assert!(layout.results_run_dir(1).is_dir());
}

#[test]
fn test_undecodable_candidate_is_recorded_as_error() {
    let (_dir, layout) = tree();
    let store = MemoryStore::new();
    write_image(&layout.reference_image("caseA", "a.png"), &black(3));
    let candidate = layout.candidate_image(1, "caseA", "a.png");
    fs::create_dir_all(candidate.parent().unwrap()).unwrap();
    fs::write(&candidate, b"not a png").unwrap();

    let summary = run_pipeline_with_store(&layout, &PipelineSettings::default(), &store).unwrap();

    assert_eq!(summary.runs[0].errors, 1);
    assert_eq!(summary.totals.errors, 1);
    assert_eq!(count_files(&layout.failed), 0);
    let report = Report::load(&store, "visreg").unwrap();
    let finding = report.suite("caseA").unwrap().cases[0].finding.clone().unwrap();
    assert!(finding.message.starts_with("candidate:"));
}

#[test]
fn test_unsupported_reference_files_are_ignored() {
    let (_dir, layout) = tree();
    let store = MemoryStore::new();
    write_image(&layout.reference_image("caseA", "a.png"), &black(3));
    fs::write(layout.reference_image("caseA", "notes.txt"), b"hello").unwrap();
    write_image(&layout.candidate_image(1, "caseA", "a.png"), &black(3));
    fs::write(layout.candidate_image(1, "caseA", "notes.txt"), b"hello").unwrap();

    let summary = run_pipeline_with_store(&layout, &PipelineSettings::default(), &store).unwrap();

    assert_eq!(summary.totals.tests, 1);
}

// ========================================================================
// Scheduling
// ========================================================================

#[test]
fn test_explicit_job_count_matches_default_order() {
    let (_dir, layout) = tree();
    let store = MemoryStore::new();
    for name in ["d.png", "a.png", "c.png", "b.png"] {
        write_image(&layout.reference_image("caseA", name), &black(3));
        write_image(&layout.candidate_image(1, "caseA", name), &black(3));
    }
    let settings = PipelineSettings {
        jobs: Some(2),
        ..PipelineSettings::default()
    };

    run_pipeline_with_store(&layout, &settings, &store).unwrap();

    let report = Report::load(&store, "visreg").unwrap();
    let files: Vec<&str> = report.suite("caseA").unwrap().cases.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(files, vec!["a.png", "b.png", "c.png", "d.png"]);
}

#[test]
fn test_pending_lists_unprocessed_runs_without_writing() {
    let (_dir, layout) = tree();
    for run in [1, 2, 3] {
        fs::create_dir_all(layout.testruns.join(run.to_string())).unwrap();
    }
    fs::create_dir_all(layout.results_run_dir(1)).unwrap();
    let mut report = Report::new("visreg");
    report.record_error("caseA", "a.png", 1, "candidate: truncated");
    let store = MemoryStore::with_contents(report.to_xml().unwrap());

    let runs = pending(&layout, &PipelineSettings::default(), &store).unwrap();

    assert_eq!(runs, vec![2, 3]);
    assert_eq!(store.writes(), 0);
}

#[test]
fn test_failed_report_write_leaves_run_pending() {
    let (_dir, layout) = tree();
    write_image(&layout.reference_image("caseA", "a.png"), &black(3));
    write_image(&layout.candidate_image(1, "caseA", "a.png"), &black(3));

    let result = run_pipeline_with_store(&layout, &PipelineSettings::default(), &FailingStore);
    assert_eq!(result.unwrap_err(), "disk full");
    assert!(layout.results_run_dir(1).is_dir());

    let store = MemoryStore::new();
    let summary = run_pipeline_with_store(&layout, &PipelineSettings::default(), &store).unwrap();

    assert_eq!(summary.runs.len(), 1);
    assert_eq!(summary.runs[0].run, 1);
    assert_eq!(summary.totals.tests, 1);
    assert_eq!(Report::load(&store, "visreg").unwrap().last_run(), Some(1));
}

#[test]
fn test_ledger_reprocesses_interrupted_run() {
    let (_dir, layout) = tree();
    let mut ledger = Report::new("visreg");
    ledger.set_last_run(1);
    let store = MemoryStore::with_contents(ledger.to_xml().unwrap());
    write_image(&layout.reference_image("caseA", "a.png"), &black(3));
    for run in [1, 2] {
        write_image(&layout.candidate_image(run, "caseA", "a.png"), &black(3));
        fs::create_dir_all(layout.results_run_dir(run)).unwrap();
    }

    let summary = run_pipeline_with_store(&layout, &PipelineSettings::default(), &store).unwrap();

    assert_eq!(summary.runs.len(), 1);
    assert_eq!(summary.runs[0].run, 2);
    assert_eq!(Report::load(&store, "visreg").unwrap().last_run(), Some(2));
}
