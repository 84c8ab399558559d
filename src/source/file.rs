//! File-based fetcher.
//!
//! Polls a JSON document written by an external exporter.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{anyhow, Result};
use serde::de::DeserializeOwned;

use super::Fetch;

/// A fetcher that reads one value from a JSON file.
///
/// The fetcher tracks the file's modification time and only re-parses the
/// file when it has been updated; otherwise the cached value is returned.
pub struct JsonFile<T> {
    path: PathBuf,
    description: String,
    last_modified: Option<SystemTime>,
    cached: Option<T>,
}

impl<T> JsonFile<T> {
    /// Create a new fetcher for the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let description = format!("file: {}", path.display());
        Self {
            path,
            description,
            last_modified: None,
            cached: None,
        }
    }

    /// Returns the path being polled.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the file's modification time.
    fn get_modified_time(&self) -> Option<SystemTime> {
        fs::metadata(&self.path).ok()?.modified().ok()
    }
}

impl<T: DeserializeOwned> JsonFile<T> {
    /// Read and parse the file.
    fn read_file(&self) -> Result<T> {
        let content =
            fs::read_to_string(&self.path).map_err(|e| anyhow!("Read error: {}", e))?;
        serde_json::from_str(&content).map_err(|e| anyhow!("Parse error: {}", e))
    }
}

impl<T> Fetch<T> for JsonFile<T>
where
    T: DeserializeOwned + Clone + Send,
{
    fn fetch(&mut self) -> Result<T> {
        let current_modified = self.get_modified_time();

        let unchanged = matches!(
            (&self.last_modified, &current_modified, &self.cached),
            (Some(last), Some(current), Some(_)) if current <= last
        );

        if unchanged {
            if let Some(ref cached) = self.cached {
                return Ok(cached.clone());
            }
        }

        let value = self.read_file()?;
        self.last_modified = current_modified;
        self.cached = Some(value.clone());
        Ok(value)
    }

    fn description(&self) -> &str {
        &self.description
    }
}

impl<T> fmt::Debug for JsonFile<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonFile")
            .field("path", &self.path)
            .field("last_modified", &self.last_modified)
            .finish()
    }
}
