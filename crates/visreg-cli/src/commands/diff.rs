use std::path::{Path, PathBuf};

use visreg_core::compare_images;
use visreg_core::decoders::decode_image;
use visreg_core::exporters::export_image;
use visreg_core::layout::alpha_sibling;

/// Compare a single reference/candidate pair and print its metrics.
///
/// With `out`, the diff composite is written as `<out>/<candidate name>` and
/// the alpha difference next to it.
pub fn cmd_diff(
    reference: PathBuf,
    candidate: PathBuf,
    out: Option<PathBuf>,
) -> Result<(), String> {
    let reference_image = decode_image(&reference)?;
    let candidate_image = decode_image(&candidate)?;

    let comparison = compare_images(&reference_image, &candidate_image);

    println!(
        "Reference: {} ({})",
        reference.display(),
        reference_image.shape_label()
    );
    println!(
        "Candidate: {} ({})",
        candidate.display(),
        candidate_image.shape_label()
    );
    if comparison.passed() {
        println!("Result:    passed");
    } else {
        println!("Result:    failed, {}", comparison.summary());
    }
    println!();
    println!("{}", comparison.failure_details());

    if let Some(out_dir) = out {
        std::fs::create_dir_all(&out_dir)
            .map_err(|e| format!("Failed to create output directory: {}", e))?;
        let diff_path = diff_output_path(&out_dir, &candidate)?;

        export_image(&comparison.diff_composite(), &diff_path)?;
        println!("\nDiff written to {}", diff_path.display());

        if let Some(alpha) = comparison.alpha_difference() {
            let alpha_path = alpha_sibling(&diff_path);
            export_image(&alpha, &alpha_path)?;
            println!("Alpha diff written to {}", alpha_path.display());
        }
    }

    Ok(())
}

fn diff_output_path(out_dir: &Path, candidate: &Path) -> Result<PathBuf, String> {
    let name = candidate
        .file_name()
        .ok_or_else(|| format!("Invalid candidate path: {}", candidate.display()))?;
    Ok(out_dir.join(name))
}
