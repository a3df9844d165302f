// Database migrations for the fieldwork corpus
// Creates and updates the database schema

use anyhow::{Context, Result};
use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 2;

/// Run all necessary migrations to bring the database up to date
pub fn run_migrations(conn: &Connection) -> Result<()> {
    let current_version = get_schema_version(conn)?;

    if current_version < 1 {
        migrate_v1(conn)?;
    }

    if current_version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> Result<i32> {
    // Check if schema_version table exists
    let table_exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='schema_version'",
        [],
        |row| row.get(0),
    ).unwrap_or(false);

    if !table_exists {
        return Ok(0);
    }

    let version: i32 = conn.query_row(
        "SELECT MAX(version) FROM schema_version",
        [],
        |row| row.get(0),
    ).unwrap_or(0);

    Ok(version)
}

/// Initial schema creation (version 1)
fn migrate_v1(conn: &Connection) -> Result<()> {
    log::info!("Running database migration v1");

    conn.execute_batch(r#"
        -- Schema version tracking
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS languages (
            id TEXT PRIMARY KEY NOT NULL,
            name TEXT NOT NULL,
            abbreviation TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS dialects (
            id TEXT PRIMARY KEY NOT NULL,
            name TEXT NOT NULL,
            abbreviation TEXT NOT NULL,
            language_id TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            FOREIGN KEY (language_id) REFERENCES languages(id) ON DELETE CASCADE
        );

        -- Lexicon: lemma -> form, token composed of ordered forms
        CREATE TABLE IF NOT EXISTS lemmata (
            id TEXT PRIMARY KEY NOT NULL,
            value TEXT NOT NULL,
            pos TEXT NOT NULL,
            language_id TEXT NOT NULL,
            FOREIGN KEY (language_id) REFERENCES languages(id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS forms (
            id TEXT PRIMARY KEY NOT NULL,
            value TEXT NOT NULL,
            lemma_id TEXT NOT NULL,
            annotation TEXT NOT NULL DEFAULT '',
            FOREIGN KEY (lemma_id) REFERENCES lemmata(id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS tokens (
            id TEXT PRIMARY KEY NOT NULL,
            transcription TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS token_forms (
            token_id TEXT NOT NULL,
            form_id TEXT NOT NULL,
            order_id INTEGER NOT NULL,
            PRIMARY KEY (token_id, order_id),
            FOREIGN KEY (token_id) REFERENCES tokens(id) ON DELETE CASCADE,
            FOREIGN KEY (form_id) REFERENCES forms(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_lemmata_language ON lemmata(language_id);
        CREATE INDEX IF NOT EXISTS idx_forms_lemma ON forms(lemma_id);
        CREATE INDEX IF NOT EXISTS idx_token_forms_form ON token_forms(form_id);

        -- Places and people referenced by recordings
        CREATE TABLE IF NOT EXISTS locations (
            id TEXT PRIMARY KEY NOT NULL,
            name TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS speakers (
            id TEXT PRIMARY KEY NOT NULL,
            code TEXT NOT NULL,
            name TEXT NOT NULL DEFAULT ''
        );

        CREATE TABLE IF NOT EXISTS interviewers (
            id TEXT PRIMARY KEY NOT NULL,
            name TEXT NOT NULL
        );

        -- Recordings: one fieldwork session each
        CREATE TABLE IF NOT EXISTS recordings (
            id TEXT PRIMARY KEY NOT NULL,
            string_id TEXT NOT NULL UNIQUE,
            recording_date TEXT NOT NULL DEFAULT (date('now')),
            recording_time TEXT,
            recording_place_id TEXT,
            transcription_file TEXT,
            audio_file TEXT,
            metacomment1 TEXT NOT NULL DEFAULT '',
            metacomment2 TEXT NOT NULL DEFAULT '',
            metacomment3 TEXT NOT NULL DEFAULT '',
            title TEXT NOT NULL DEFAULT '',
            topics TEXT NOT NULL DEFAULT '',
            comments TEXT NOT NULL DEFAULT '',
            participants_field TEXT NOT NULL DEFAULT '',
            informant TEXT NOT NULL DEFAULT '',
            location TEXT NOT NULL DEFAULT '',
            recording_device TEXT NOT NULL DEFAULT '',
            dialect_id TEXT,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            FOREIGN KEY (recording_place_id) REFERENCES locations(id) ON DELETE SET NULL,
            FOREIGN KEY (dialect_id) REFERENCES dialects(id) ON DELETE SET NULL
        );

        CREATE TABLE IF NOT EXISTS recording_speakers (
            recording_id TEXT NOT NULL,
            speaker_id TEXT NOT NULL,
            PRIMARY KEY (recording_id, speaker_id),
            FOREIGN KEY (recording_id) REFERENCES recordings(id) ON DELETE CASCADE,
            FOREIGN KEY (speaker_id) REFERENCES speakers(id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS recording_interviewers (
            recording_id TEXT NOT NULL,
            interviewer_id TEXT NOT NULL,
            PRIMARY KEY (recording_id, interviewer_id),
            FOREIGN KEY (recording_id) REFERENCES recordings(id) ON DELETE CASCADE,
            FOREIGN KEY (interviewer_id) REFERENCES interviewers(id) ON DELETE CASCADE
        );

        -- Corpora group recordings
        CREATE TABLE IF NOT EXISTS corpora (
            id TEXT PRIMARY KEY NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS corpus_recordings (
            corpus_id TEXT NOT NULL,
            recording_id TEXT NOT NULL,
            PRIMARY KEY (corpus_id, recording_id),
            FOREIGN KEY (corpus_id) REFERENCES corpora(id) ON DELETE CASCADE,
            FOREIGN KEY (recording_id) REFERENCES recordings(id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS normalization_models (
            id TEXT PRIMARY KEY NOT NULL,
            dialect_id TEXT NOT NULL,
            additional_language_id TEXT,
            examples TEXT NOT NULL DEFAULT '',
            exceptions TEXT NOT NULL DEFAULT '',
            FOREIGN KEY (dialect_id) REFERENCES dialects(id) ON DELETE CASCADE,
            FOREIGN KEY (additional_language_id) REFERENCES languages(id) ON DELETE SET NULL
        );

        -- Record migration
        INSERT INTO schema_version (version) VALUES (1);
    "#).context("Failed to run migration v1")?;

    log::info!("Migration v1 completed successfully");
    Ok(())
}

/// Corpus names and recording lookup indexes (version 2)
fn migrate_v2(conn: &Connection) -> Result<()> {
    log::info!("Running database migration v2 - Corpus names");

    conn.execute_batch(r#"
        ALTER TABLE corpora ADD COLUMN name TEXT NOT NULL DEFAULT '';

        -- Unnamed corpora from v1 may share the empty name
        CREATE UNIQUE INDEX IF NOT EXISTS idx_corpora_name
        ON corpora(name) WHERE name != '';

        CREATE INDEX IF NOT EXISTS idx_recordings_dialect ON recordings(dialect_id);
        CREATE INDEX IF NOT EXISTS idx_recordings_date ON recordings(recording_date);

        -- Record migration
        INSERT INTO schema_version (version) VALUES (2);
    "#).context("Failed to run migration v2")?;

    log::info!("Migration v2 completed successfully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_reach_current_version() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let rows: i32 = conn.query_row(
            "SELECT COUNT(*) FROM schema_version",
            [],
            |row| row.get(0),
        ).unwrap();
        assert_eq!(rows, SCHEMA_VERSION);
    }

    #[test]
    fn test_v1_database_upgrades() {
        let conn = Connection::open_in_memory().unwrap();
        migrate_v1(&conn).unwrap();
        conn.execute("INSERT INTO corpora (id) VALUES ('corp_old')", []).unwrap();

        run_migrations(&conn).unwrap();

        let name: String = conn.query_row(
            "SELECT name FROM corpora WHERE id = 'corp_old'",
            [],
            |row| row.get(0),
        ).unwrap();
        assert_eq!(name, "");
    }
}
