// Database module for the fieldwork corpus
// Provides SQLite persistence for languages, lexicon, recordings, people and corpora

pub mod manager;
pub mod migrations;
pub mod models;
pub mod languages_repo;
pub mod lexicon_repo;
pub mod people_repo;
pub mod recordings_repo;
pub mod corpora_repo;

pub use manager::DatabaseManager;
pub use recordings_repo::RecordingFileKind;
pub use models::*;

use uuid::Uuid;

/// Generate a prefixed row id, e.g. `rec_3f2a9c0d1e4b4a5c8d7e6f5a4b3c2d1e`
pub(crate) fn new_id(prefix: &str) -> String {
    format!("{}_{}", prefix, Uuid::new_v4().simple())
}

/// LIKE pattern matching values that start with `prefix`; use with `ESCAPE '\'`
pub(crate) fn like_prefix(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::DatabaseManager;
    use tempfile::{tempdir, TempDir};

    /// Fresh database in a temp dir; keep the dir alive for the test's duration
    pub fn create_test_db() -> (TempDir, DatabaseManager) {
        let dir = tempdir().unwrap();
        let db = DatabaseManager::new(dir.path().join("test.db")).unwrap();
        (dir, db)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_id_keeps_full_uuid() {
        let id = new_id("rec");
        let (prefix, hex) = id.split_once('_').unwrap();
        assert_eq!(prefix, "rec");
        assert_eq!(hex.len(), 32);
        assert!(Uuid::parse_str(hex).is_ok());
        assert_ne!(new_id("rec"), id);
    }

    #[test]
    fn test_like_prefix_escapes_wildcards() {
        assert_eq!(like_prefix("2016-07-13_a"), "2016-07-13\\_a%");
        assert_eq!(like_prefix("50%"), "50\\%%");
    }
}
