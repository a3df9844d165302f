// Storage - Overwrite-on-collision file system storage
use anyhow::{bail, Context, Result};
use std::path::{Component, Path, PathBuf};

use super::FileRef;

/// Sanitize a file name to be safe for filesystem use
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// File storage rooted at a media directory.
///
/// Saving under a name that already exists deletes the old file first, so a
/// stored name always refers to the latest upload rather than getting a
/// suffixed sibling.
#[derive(Debug, Clone)]
pub struct OverwriteStorage {
    root: PathBuf,
}

impl OverwriteStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a stored name under the media root.
    ///
    /// Names are relative, `/`-separated and may not climb out of the root.
    pub fn path(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty() {
            bail!("Stored file name is empty");
        }

        let relative = Path::new(name);
        for component in relative.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                _ => bail!("Stored file name must stay inside the media root: {}", name),
            }
        }

        Ok(self.root.join(relative))
    }

    /// Whether a file is stored under `name`
    pub fn exists(&self, name: &str) -> bool {
        self.path(name).map(|p| p.is_file()).unwrap_or(false)
    }

    /// Name to write a new file under.
    ///
    /// Deletes whatever is currently stored as `name` and hands the same name
    /// back. Deletion failures propagate.
    pub fn get_available_name(&self, name: &str) -> Result<String> {
        let path = self.path(name)?;
        if path.exists() {
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to remove existing file: {}", path.display()))?;
            log::info!("Overwriting stored file: {}", name);
        }
        Ok(name.to_string())
    }

    /// Store `contents` under `name`, replacing any existing file
    pub fn save(&self, name: &str, contents: &[u8]) -> Result<FileRef> {
        let name = self.get_available_name(name)?;
        let path = self.path(&name)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create media directory: {}", parent.display()))?;
        }

        std::fs::write(&path, contents)
            .with_context(|| format!("Failed to write file: {}", path.display()))?;

        log::debug!("Stored {} bytes as {}", contents.len(), name);

        Ok(FileRef::new(name))
    }

    /// Delete a stored file; a missing file is not an error
    pub fn delete(&self, name: &str) -> Result<()> {
        let path = self.path(name)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to delete file: {}", path.display())),
        }
    }

    /// Move a stored file to a new name
    pub fn rename(&self, from: &str, to: &str) -> Result<()> {
        let from_path = self.path(from)?;
        let to_path = self.path(to)?;

        if let Some(parent) = to_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create media directory: {}", parent.display()))?;
        }

        std::fs::rename(&from_path, &to_path).with_context(|| {
            format!("Failed to rename {} to {}", from_path.display(), to_path.display())
        })?;

        Ok(())
    }
}
