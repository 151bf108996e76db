//! Visreg Core Library
//!
//! Visual regression comparison: discovers unprocessed test runs, compares
//! their images against reference images, accumulates a JUnit-style report
//! and archives the artifacts of failing comparisons.

pub mod archive;
pub mod compare;
pub mod config;
pub mod decoders;
pub mod discovery;
pub mod exporters;
pub mod layout;
pub mod pipeline;
pub mod report;

// Re-export commonly used types
pub use compare::{compare_images, ChannelFailure, Comparison};
pub use config::{load_config, ConfigHandle, VisregConfig};
pub use decoders::{decode_image, ImageArray};
pub use discovery::{DiscoveryError, ReferenceSet, RunId};
pub use layout::Layout;
pub use pipeline::{run_pipeline, run_pipeline_with_store, PipelineSettings, PipelineSummary};
pub use report::{FileStore, MemoryStore, Report, ReportStore};
