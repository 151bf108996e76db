//! Configuration management.
//!
//! Loads the YAML configuration describing the directory layout and the
//! comparison settings, searching a fixed list of candidate locations.

mod defaults;

pub use defaults::{ComparisonDefaults, LayoutDefaults};

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde::Deserialize;

/// Environment variable pointing at a config file
pub const CONFIG_ENV_VAR: &str = "VISREG_CONFIG";

/// Candidate config file names searched in the working directory.
const CONFIG_FILENAMES: &[&str] = &["visreg.yml", "visreg.yaml"];

/// Loaded configuration together with its source path and load warnings.
pub struct ConfigHandle {
    pub config: VisregConfig,
    pub source: Option<PathBuf>,
    pub warnings: Vec<String>,
}

impl ConfigHandle {
    fn with_config(config: VisregConfig, source: Option<PathBuf>, warnings: Vec<String>) -> Self {
        Self {
            config,
            source,
            warnings,
        }
    }
}

/// Complete configuration file structure.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct VisregConfig {
    pub layout: LayoutDefaults,
    pub comparison: ComparisonDefaults,
}

impl VisregConfig {
    pub fn sanitize(mut self) -> Self {
        self.layout.sanitize();
        self.comparison.sanitize();
        self
    }

    /// Parse and sanitize a YAML document
    pub fn from_yaml(contents: &str) -> Result<Self, String> {
        serde_yaml::from_str::<VisregConfig>(contents)
            .map(VisregConfig::sanitize)
            .map_err(|e| format!("Failed to parse config: {}", e))
    }
}

/// Load configuration from disk, optionally forcing a specific path.
///
/// The first candidate that parses wins. A missing config is not an error;
/// the built-in defaults are used and a warning is recorded.
pub fn load_config(custom_path: Option<&Path>) -> ConfigHandle {
    load_from_candidates(get_config_candidates(custom_path))
}

fn load_from_candidates(candidates: Vec<PathBuf>) -> ConfigHandle {
    let mut warnings = Vec::new();

    for candidate in candidates {
        if !candidate.is_file() {
            continue;
        }

        match fs::read_to_string(&candidate) {
            Ok(contents) => match VisregConfig::from_yaml(&contents) {
                Ok(config) => {
                    let source = fs::canonicalize(&candidate).unwrap_or(candidate);
                    return ConfigHandle::with_config(config, Some(source), warnings);
                }
                Err(err) => warnings.push(format!("{} ({})", err, candidate.display())),
            },
            Err(err) => warnings.push(format!(
                "Failed to read config {}: {}",
                candidate.display(),
                err
            )),
        }
    }

    warnings.push("No config found; using built-in defaults.".to_string());
    ConfigHandle::with_config(VisregConfig::default(), None, warnings)
}

/// Get list of config file candidates to try
fn get_config_candidates(custom_path: Option<&Path>) -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if let Some(path) = custom_path {
        candidates.push(path.to_path_buf());
    }

    if let Ok(env_path) = std::env::var(CONFIG_ENV_VAR) {
        if !env_path.is_empty() {
            candidates.push(PathBuf::from(env_path));
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        for name in CONFIG_FILENAMES {
            candidates.push(cwd.join("config").join(name));
            candidates.push(cwd.join(name));
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        candidates.push(config_dir.join("visreg").join(CONFIG_FILENAMES[0]));
    }

    candidates
}

/// Log where the configuration came from, and any warnings collected on the way.
pub fn log_config_usage(handle: &ConfigHandle) {
    match &handle.source {
        Some(source) => info!("Loaded config from {}", source.display()),
        None => debug!("Using built-in config defaults"),
    }

    for warning in &handle.warnings {
        if handle.source.is_none() && warning.starts_with("No config found") {
            debug!("{}", warning);
        } else {
            warn!("Config warning: {}", warning);
        }
    }
}
