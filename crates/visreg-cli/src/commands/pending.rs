use visreg_core::pipeline::pending;
use visreg_core::FileStore;

use visreg_cli::{resolve_tree, TreeArgs};

/// Print unprocessed run identifiers, one per line
pub fn cmd_pending(tree: TreeArgs) -> Result<(), String> {
    let resolved = resolve_tree(&tree);
    let store = FileStore::new(&resolved.layout.report);

    let runs = pending(&resolved.layout, &resolved.settings, &store)?;

    if runs.is_empty() {
        log::info!("No pending test runs");
    }
    for run in runs {
        println!("{}", run);
    }
    Ok(())
}
