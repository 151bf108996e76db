//! Shared pieces of the visreg command line tool
//!
//! Argument structs and the resolution of flags against the loaded
//! configuration, kept out of `main.rs` so they can be tested.

pub mod args;
pub mod settings;

pub use args::TreeArgs;
pub use settings::{apply_overrides, resolve_tree, ResolvedTree};
