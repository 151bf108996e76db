use std::time::Instant;

use visreg_core::pipeline::run_pipeline;

use visreg_cli::{resolve_tree, TreeArgs};

pub fn cmd_compare(tree: TreeArgs) -> Result<(), String> {
    let start = Instant::now();
    let resolved = resolve_tree(&tree);

    let summary = run_pipeline(&resolved.layout, &resolved.settings)?;

    if summary.runs.is_empty() {
        println!("No pending test runs under {}", resolved.layout.testruns.display());
    }
    for run in &summary.runs {
        println!(
            "Run {}: {} passed, {} failed, {} errors, {} skipped",
            run.run, run.passed, run.failed, run.errors, run.skipped
        );
        if run.archive_errors > 0 {
            println!("  {} files could not be archived", run.archive_errors);
        }
    }

    println!("\n========================================");
    println!("VISUAL REGRESSION SUMMARY");
    println!("========================================");
    println!("  Runs processed: {}", summary.runs.len());
    println!("  Tests:          {}", summary.totals.tests);
    println!("  Passed:         {}", summary.totals.passed());
    println!("  Failures:       {}", summary.totals.failures);
    println!("  Errors:         {}", summary.totals.errors);
    println!("  Report:         {}", summary.report);
    if summary.failed() > 0 {
        println!("  Archive:        {}", resolved.layout.failed.display());
    }
    println!("  Total time:     {:.2}s", start.elapsed().as_secs_f64());

    Ok(())
}
