//! Command implementations for the visreg CLI.

mod compare;
mod diff;
mod pending;
mod summary;

// Re-export all command functions
pub use compare::cmd_compare;
pub use diff::cmd_diff;
pub use pending::cmd_pending;
pub use summary::cmd_summary;
