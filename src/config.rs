// Store configuration
//
// Where the database lives and which directory holds the media files.
// Passed explicitly to CorpusStore; nothing here is read from globals.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const APP_DIR_NAME: &str = "fieldwork-corpus";
const DATABASE_FILE_NAME: &str = "corpus.db";
const MEDIA_DIR_NAME: &str = "media";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreConfig {
    /// SQLite database file
    pub database_path: PathBuf,
    /// Root directory for stored transcription and audio files
    pub media_root: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        let base = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR_NAME);
        Self::in_dir(base)
    }
}

impl StoreConfig {
    /// Database and media root side by side under `root`
    pub fn in_dir(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            database_path: root.join(DATABASE_FILE_NAME),
            media_root: root.join(MEDIA_DIR_NAME),
        }
    }

    /// Load a configuration from a JSON file.
    ///
    /// Relative paths in the file are resolved against the file's directory.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let mut config: StoreConfig = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        if let Some(base) = path.parent() {
            if config.database_path.is_relative() {
                config.database_path = base.join(&config.database_path);
            }
            if config.media_root.is_relative() {
                config.media_root = base.join(&config.media_root);
            }
        }

        Ok(config)
    }
}
