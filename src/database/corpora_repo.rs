// Corpora repository for the fieldwork corpus
// Handles corpora (named recording groups) and dialect normalization models

use anyhow::{Context, Result};
use rusqlite::{Connection, Row, params};

use super::models::{
    Corpus, Recording, NormalizationModel, CreateNormalizationModel, UpdateNormalizationModel,
};
use super::recordings_repo::get_corpus_recordings_impl;
use super::{new_id, DatabaseManager};
use crate::validation;

impl DatabaseManager {
    // ============ Corpora ============

    /// Create a new, empty corpus
    pub fn create_corpus(&self, name: &str) -> Result<String> {
        self.with_connection(|conn| {
            validation::required("name", name, 100)?;
            let id = new_id("corp");
            conn.execute(
                "INSERT INTO corpora (id, name) VALUES (?1, ?2)",
                params![id, name],
            ).with_context(|| format!("Failed to create corpus {}", name))?;
            Ok(id)
        })
    }

    /// Get a corpus by ID
    pub fn get_corpus(&self, id: &str) -> Result<Option<Corpus>> {
        self.with_connection(|conn| {
            get_corpus_where(conn, "id = ?", id)
        })
    }

    /// Get a corpus by name
    pub fn get_corpus_by_name(&self, name: &str) -> Result<Option<Corpus>> {
        self.with_connection(|conn| {
            get_corpus_where(conn, "name = ?", name)
        })
    }

    /// Get all corpora ordered by name
    pub fn get_all_corpora(&self) -> Result<Vec<Corpus>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, created_at FROM corpora ORDER BY name ASC"
            ).context("Failed to prepare get_all_corpora query")?;

            let corpora = stmt.query_map([], corpus_from_row)
                .context("Failed to query corpora")?;

            corpora.collect::<std::result::Result<Vec<_>, _>>()
                .context("Failed to collect corpora")
        })
    }

    /// Rename a corpus
    pub fn rename_corpus(&self, id: &str, name: &str) -> Result<()> {
        self.with_connection(|conn| {
            validation::required("name", name, 100)?;
            conn.execute(
                "UPDATE corpora SET name = ? WHERE id = ?",
                params![name, id],
            ).context("Failed to rename corpus")?;
            Ok(())
        })
    }

    /// Delete a corpus; its recordings are kept
    pub fn delete_corpus(&self, id: &str) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute("DELETE FROM corpora WHERE id = ?", params![id])
                .context("Failed to delete corpus")?;
            Ok(())
        })
    }

    /// Add a recording to a corpus
    pub fn add_recording_to_corpus(&self, corpus_id: &str, recording_id: &str) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO corpus_recordings (corpus_id, recording_id) VALUES (?1, ?2)",
                params![corpus_id, recording_id],
            ).context("Failed to add recording to corpus")?;
            Ok(())
        })
    }

    /// Remove a recording from a corpus
    pub fn remove_recording_from_corpus(&self, corpus_id: &str, recording_id: &str) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute(
                "DELETE FROM corpus_recordings WHERE corpus_id = ? AND recording_id = ?",
                params![corpus_id, recording_id],
            ).context("Failed to remove recording from corpus")?;
            Ok(())
        })
    }

    /// Get the recordings of a corpus ordered by string_id
    pub fn get_corpus_recordings(&self, corpus_id: &str) -> Result<Vec<Recording>> {
        self.with_connection(|conn| {
            get_corpus_recordings_impl(conn, corpus_id)
        })
    }

    /// Get the corpora a recording belongs to
    pub fn get_recording_corpora(&self, recording_id: &str) -> Result<Vec<Corpus>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(
                r#"
                SELECT c.id, c.name, c.created_at
                FROM corpora c
                JOIN corpus_recordings cr ON c.id = cr.corpus_id
                WHERE cr.recording_id = ?
                ORDER BY c.name ASC
                "#
            ).context("Failed to prepare get_recording_corpora query")?;

            let corpora = stmt.query_map(params![recording_id], corpus_from_row)
                .context("Failed to query recording corpora")?;

            corpora.collect::<std::result::Result<Vec<_>, _>>()
                .context("Failed to collect recording corpora")
        })
    }

    // ============ Normalization Models ============

    /// Create a normalization model for a dialect
    pub fn create_normalization_model(&self, input: &CreateNormalizationModel) -> Result<String> {
        self.with_connection(|conn| {
            let id = new_id("norm");
            conn.execute(
                r#"
                INSERT INTO normalization_models (id, dialect_id, additional_language_id, examples, exceptions)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![
                    id,
                    input.dialect_id,
                    input.additional_language_id,
                    input.examples,
                    input.exceptions,
                ],
            ).context("Failed to create normalization model")?;
            Ok(id)
        })
    }

    /// Get a normalization model by ID
    pub fn get_normalization_model(&self, id: &str) -> Result<Option<NormalizationModel>> {
        self.with_connection(|conn| {
            let result = conn.query_row(
                r#"
                SELECT id, dialect_id, additional_language_id, examples, exceptions
                FROM normalization_models WHERE id = ?
                "#,
                params![id],
                normalization_model_from_row,
            );

            match result {
                Ok(model) => Ok(Some(model)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e).context("Failed to get normalization model"),
            }
        })
    }

    /// List normalization models, optionally only those of one dialect
    pub fn list_normalization_models(&self, dialect_id: Option<&str>) -> Result<Vec<NormalizationModel>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(
                r#"
                SELECT id, dialect_id, additional_language_id, examples, exceptions
                FROM normalization_models
                WHERE ?1 IS NULL OR dialect_id = ?1
                ORDER BY rowid ASC
                "#
            ).context("Failed to prepare list_normalization_models query")?;

            let models = stmt.query_map(params![dialect_id], normalization_model_from_row)
                .context("Failed to query normalization models")?;

            models.collect::<std::result::Result<Vec<_>, _>>()
                .context("Failed to collect normalization models")
        })
    }

    /// Update a normalization model
    pub fn update_normalization_model(&self, id: &str, updates: &UpdateNormalizationModel) -> Result<()> {
        self.with_connection(|conn| {
            update_normalization_model_impl(conn, id, updates)
        })
    }

    /// Delete a normalization model
    pub fn delete_normalization_model(&self, id: &str) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute("DELETE FROM normalization_models WHERE id = ?", params![id])
                .context("Failed to delete normalization model")?;
            Ok(())
        })
    }
}

fn corpus_from_row(row: &Row) -> rusqlite::Result<Corpus> {
    Ok(Corpus {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: row.get(2)?,
    })
}

fn get_corpus_where(conn: &Connection, condition: &str, value: &str) -> Result<Option<Corpus>> {
    let query = format!("SELECT id, name, created_at FROM corpora WHERE {}", condition);
    let result = conn.query_row(&query, params![value], corpus_from_row);

    match result {
        Ok(corpus) => Ok(Some(corpus)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e).context("Failed to get corpus"),
    }
}

fn normalization_model_from_row(row: &Row) -> rusqlite::Result<NormalizationModel> {
    Ok(NormalizationModel {
        id: row.get(0)?,
        dialect_id: row.get(1)?,
        additional_language_id: row.get(2)?,
        examples: row.get(3)?,
        exceptions: row.get(4)?,
    })
}

fn update_normalization_model_impl(
    conn: &Connection,
    id: &str,
    updates: &UpdateNormalizationModel,
) -> Result<()> {
    let mut set_clauses = Vec::new();
    let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if let Some(ref dialect_id) = updates.dialect_id {
        set_clauses.push("dialect_id = ?");
        params_vec.push(Box::new(dialect_id.clone()));
    }
    if let Some(ref language_id) = updates.additional_language_id {
        set_clauses.push("additional_language_id = ?");
        // Empty string means "clear the field" (set to NULL)
        if language_id.is_empty() {
            params_vec.push(Box::new(None::<String>));
        } else {
            params_vec.push(Box::new(language_id.clone()));
        }
    }
    if let Some(ref examples) = updates.examples {
        set_clauses.push("examples = ?");
        params_vec.push(Box::new(examples.clone()));
    }
    if let Some(ref exceptions) = updates.exceptions {
        set_clauses.push("exceptions = ?");
        params_vec.push(Box::new(exceptions.clone()));
    }

    if set_clauses.is_empty() {
        return Ok(());
    }

    params_vec.push(Box::new(id.to_string()));

    let query = format!(
        "UPDATE normalization_models SET {} WHERE id = ?",
        set_clauses.join(", ")
    );

    let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|b| b.as_ref()).collect();

    conn.execute(&query, params_refs.as_slice())
        .context("Failed to update normalization model")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::CreateDialect;
    use crate::database::test_support::create_test_db;

    fn seed_dialect(db: &DatabaseManager) -> (String, String) {
        let language = db.create_language("Udmurt", "udm").unwrap();
        let dialect = db.create_dialect(&CreateDialect {
            name: "Beserman".to_string(),
            abbreviation: "bes".to_string(),
            language_id: language.clone(),
            description: String::new(),
        }).unwrap();
        (language, dialect)
    }

    #[test]
    fn test_corpus_membership() {
        let (_dir, db) = create_test_db();
        let corpus = db.create_corpus("Beserman 2016").unwrap();

        let b = Recording::new("2016-07-13_b");
        let a = Recording::new("2016-07-13_a");
        db.create_recording(&b).unwrap();
        db.create_recording(&a).unwrap();

        db.add_recording_to_corpus(&corpus, &b.id).unwrap();
        db.add_recording_to_corpus(&corpus, &a.id).unwrap();
        db.add_recording_to_corpus(&corpus, &a.id).unwrap();

        let recordings = db.get_corpus_recordings(&corpus).unwrap();
        let ids: Vec<_> = recordings.iter().map(|r| r.string_id.as_str()).collect();
        assert_eq!(ids, vec!["2016-07-13_a", "2016-07-13_b"]);

        let corpora = db.get_recording_corpora(&a.id).unwrap();
        assert_eq!(corpora.len(), 1);
        assert_eq!(corpora[0].to_string(), "Beserman 2016");

        db.remove_recording_from_corpus(&corpus, &b.id).unwrap();
        assert_eq!(db.get_corpus_recordings(&corpus).unwrap().len(), 1);

        db.delete_corpus(&corpus).unwrap();
        assert!(db.get_recording(&a.id).unwrap().is_some());
        assert!(db.get_recording_corpora(&a.id).unwrap().is_empty());
    }

    #[test]
    fn test_corpus_names_are_unique() {
        let (_dir, db) = create_test_db();
        let id = db.create_corpus("Main").unwrap();
        assert!(db.create_corpus("Main").is_err());

        assert_eq!(db.get_corpus_by_name("Main").unwrap().unwrap().id, id);

        db.rename_corpus(&id, "Archive").unwrap();
        assert!(db.get_corpus_by_name("Main").unwrap().is_none());
        assert_eq!(db.get_corpus(&id).unwrap().unwrap().name, "Archive");
        assert_eq!(db.get_all_corpora().unwrap().len(), 1);
    }

    #[test]
    fn test_deleting_recording_removes_it_from_corpus() {
        let (_dir, db) = create_test_db();
        let corpus = db.create_corpus("Main").unwrap();
        let recording = Recording::new("2016-07-13_a");
        db.create_recording(&recording).unwrap();
        db.add_recording_to_corpus(&corpus, &recording.id).unwrap();

        db.delete_recording(&recording.id).unwrap();
        assert!(db.get_corpus_recordings(&corpus).unwrap().is_empty());
    }

    #[test]
    fn test_normalization_model_crud() {
        let (_dir, db) = create_test_db();
        let (language, dialect) = seed_dialect(&db);
        let russian = db.create_language("Russian", "rus").unwrap();

        let id = db.create_normalization_model(&CreateNormalizationModel {
            dialect_id: dialect.clone(),
            additional_language_id: Some(russian.clone()),
            examples: "ǯ -> dž".to_string(),
            exceptions: String::new(),
        }).unwrap();

        let model = db.get_normalization_model(&id).unwrap().unwrap();
        assert_eq!(model.additional_language_id, Some(russian.clone()));

        db.update_normalization_model(&id, &UpdateNormalizationModel {
            exceptions: Some("vaj".to_string()),
            additional_language_id: Some(String::new()),
            ..Default::default()
        }).unwrap();

        let model = db.get_normalization_model(&id).unwrap().unwrap();
        assert_eq!(model.exceptions, "vaj");
        assert_eq!(model.additional_language_id, None);

        assert_eq!(db.list_normalization_models(Some(&dialect)).unwrap().len(), 1);
        assert!(db.list_normalization_models(Some("dia_other")).unwrap().is_empty());

        // Dropping the language drops the dialect, which drops the model
        db.delete_language(&language).unwrap();
        assert!(db.get_normalization_model(&id).unwrap().is_none());
    }

    #[test]
    fn test_deleting_additional_language_keeps_model() {
        let (_dir, db) = create_test_db();
        let (_, dialect) = seed_dialect(&db);
        let russian = db.create_language("Russian", "rus").unwrap();

        let id = db.create_normalization_model(&CreateNormalizationModel {
            dialect_id: dialect,
            additional_language_id: Some(russian.clone()),
            examples: String::new(),
            exceptions: String::new(),
        }).unwrap();

        db.delete_language(&russian).unwrap();
        let model = db.get_normalization_model(&id).unwrap().unwrap();
        assert_eq!(model.additional_language_id, None);

        db.delete_normalization_model(&id).unwrap();
        assert!(db.get_normalization_model(&id).unwrap().is_none());
    }
}
