//! Report persistence backends.

use std::cell::{Cell, RefCell};
use std::fs;
use std::path::{Path, PathBuf};

/// Where a report document lives
pub trait ReportStore {
    /// Current document, or `None` when nothing has been written yet
    fn read(&self) -> Result<Option<String>, String>;

    /// Replace the document
    fn write(&self, contents: &str) -> Result<(), String>;

    /// Human-readable location for log messages
    fn describe(&self) -> String;
}

/// Report stored in a file, replaced atomically through a sibling temp file
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl ReportStore for FileStore {
    fn read(&self) -> Result<Option<String>, String> {
        if !self.path.exists() {
            return Ok(None);
        }
        fs::read_to_string(&self.path)
            .map(Some)
            .map_err(|e| format!("Failed to read report {}: {}", self.path.display(), e))
    }

    fn write(&self, contents: &str) -> Result<(), String> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    format!("Failed to create directory {}: {}", parent.display(), e)
                })?;
            }
        }

        let temp = self.temp_path();
        fs::write(&temp, contents)
            .map_err(|e| format!("Failed to write report {}: {}", temp.display(), e))?;
        fs::rename(&temp, &self.path).map_err(|e| {
            let _ = fs::remove_file(&temp);
            format!("Failed to replace report {}: {}", self.path.display(), e)
        })
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-memory report, for tests and dry runs
#[derive(Debug, Default)]
pub struct MemoryStore {
    contents: RefCell<Option<String>>,
    writes: Cell<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contents(contents: impl Into<String>) -> Self {
        Self {
            contents: RefCell::new(Some(contents.into())),
            writes: Cell::new(0),
        }
    }

    pub fn contents(&self) -> Option<String> {
        self.contents.borrow().clone()
    }

    /// Number of writes so far
    pub fn writes(&self) -> usize {
        self.writes.get()
    }
}

impl ReportStore for MemoryStore {
    fn read(&self) -> Result<Option<String>, String> {
        Ok(self.contents.borrow().clone())
    }

    fn write(&self, contents: &str) -> Result<(), String> {
        *self.contents.borrow_mut() = Some(contents.to_string());
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }

    fn describe(&self) -> String {
        "<memory>".to_string()
    }
}
