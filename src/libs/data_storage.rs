//! Platform data directory resolution.
//!
//! Everything dwellsync writes to disk (config, SQLite store) lives under one
//! per-user directory:
//!
//! - **Windows**: `%LOCALAPPDATA%\dwellsync\dwellsync`
//! - **macOS**: `~/Library/Application Support/dwellsync/dwellsync`
//! - **Linux**: `~/.local/share/dwellsync/dwellsync`

use anyhow::Result;
use std::env::consts::OS;
use std::env::var;
use std::fs;
use std::path::{Path, PathBuf};

pub const VENDOR_NAME: &str = "dwellsync";
pub const APP_NAME: &str = "dwellsync";

#[derive(Debug, Clone)]
pub struct DataStorage {
    base_path: PathBuf,
}

impl Default for DataStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl DataStorage {
    pub fn new() -> Self {
        let base_path = match OS {
            "windows" => var("LOCALAPPDATA").unwrap_or_else(|_| ".".into()),
            "macos" => var("HOME").unwrap_or_else(|_| ".".into()) + "/Library/Application Support",
            _ => var("HOME").unwrap_or_else(|_| ".".into()) + "/.local/share",
        };
        let base_path = Path::new(&base_path).join(VENDOR_NAME).join(APP_NAME);

        Self { base_path }
    }

    /// Storage rooted at an explicit directory instead of the platform default.
    pub fn at(base_path: impl Into<PathBuf>) -> Self {
        Self { base_path: base_path.into() }
    }

    /// Resolves `file_name` inside the data directory, creating the directory on first use.
    pub fn get_path(&self, file_name: &str) -> Result<PathBuf> {
        if !self.base_path.exists() {
            fs::create_dir_all(&self.base_path)?;
        }
        Ok(self.base_path.join(file_name))
    }
}
