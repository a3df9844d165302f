// Storage - File references held by records
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use super::OverwriteStorage;

/// A file attached to a record, stored as a name relative to the media root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileRef {
    name: String,
}

impl FileRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Stored name, relative to the media root
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Directory part and file name part of the stored name
    pub fn split(&self) -> (&str, &str) {
        match self.name.rfind('/') {
            Some(idx) => (&self.name[..idx], &self.name[idx + 1..]),
            None => ("", &self.name),
        }
    }

    pub fn file_name(&self) -> &str {
        self.split().1
    }

    /// Everything after the first `.` of the file name.
    ///
    /// `rec.2023.eaf` has extension `2023.eaf`.
    pub fn extension(&self) -> Option<&str> {
        let file_name = self.file_name();
        file_name.find('.').map(|idx| &file_name[idx + 1..])
    }

    /// Same directory, new base name, extension kept
    pub fn with_base_name(&self, base_name: &str) -> Result<FileRef> {
        if base_name.is_empty() || base_name.contains(['/', '\\']) {
            bail!("Invalid base name: {:?}", base_name);
        }

        let extension = match self.extension() {
            Some(ext) => ext,
            None => bail!("File has no extension: {}", self.name),
        };

        let file_name = format!("{}.{}", base_name, extension);
        let name = match self.split().0 {
            "" => file_name,
            dir => format!("{}/{}", dir, file_name),
        };

        Ok(FileRef::new(name))
    }

    /// Absolute path of the file in `storage`
    pub fn path(&self, storage: &OverwriteStorage) -> Result<PathBuf> {
        storage.path(&self.name)
    }

    /// Whether the file is present in `storage`
    pub fn exists(&self, storage: &OverwriteStorage) -> bool {
        storage.exists(&self.name)
    }
}

impl fmt::Display for FileRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
