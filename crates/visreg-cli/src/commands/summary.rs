use visreg_core::{FileStore, Report};

use visreg_cli::{resolve_tree, TreeArgs};

/// Print per-suite counters of the persisted report
pub fn cmd_summary(tree: TreeArgs) -> Result<(), String> {
    let resolved = resolve_tree(&tree);
    let report_path = &resolved.layout.report;
    if !report_path.exists() {
        return Err(format!("No report found at {}", report_path.display()));
    }

    let store = FileStore::new(report_path);
    let report = Report::load(&store, &resolved.settings.report_name)?;

    println!("Report: {}", report_path.display());
    if let Some(last_run) = report.last_run() {
        println!("Last recorded run: {}", last_run);
    }
    println!();
    println!(
        "{:<32} {:>8} {:>8} {:>8} {:>8}",
        "SUITE", "TESTS", "PASSED", "FAILED", "ERRORS"
    );
    for suite in report.suites() {
        println!(
            "{:<32} {:>8} {:>8} {:>8} {:>8}",
            suite.name,
            suite.counters.tests,
            suite.counters.passed(),
            suite.counters.failures,
            suite.counters.errors
        );
    }
    println!(
        "{:<32} {:>8} {:>8} {:>8} {:>8}",
        "TOTAL",
        report.counters.tests,
        report.counters.passed(),
        report.counters.failures,
        report.counters.errors
    );

    Ok(())
}
