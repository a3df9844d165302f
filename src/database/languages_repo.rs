// Languages repository for the fieldwork corpus
// Handles CRUD operations for languages and their dialects

use anyhow::{Context, Result};
use rusqlite::{Connection, Row, params};

use super::models::{Language, UpdateLanguage, Dialect, CreateDialect, UpdateDialect};
use super::{new_id, DatabaseManager};
use crate::validation;

const NAME_MAX: usize = 50;
const ABBREVIATION_MAX: usize = 5;

impl DatabaseManager {
    // ============ Languages ============

    /// Create a new language
    pub fn create_language(&self, name: &str, abbreviation: &str) -> Result<String> {
        self.with_connection(|conn| {
            create_language_impl(conn, name, abbreviation)
        })
    }

    /// Get a language by ID
    pub fn get_language(&self, id: &str) -> Result<Option<Language>> {
        self.with_connection(|conn| {
            get_language_impl(conn, id)
        })
    }

    /// Get the first language with the given abbreviation
    pub fn get_language_by_abbreviation(&self, abbreviation: &str) -> Result<Option<Language>> {
        self.with_connection(|conn| {
            get_language_by_abbreviation_impl(conn, abbreviation)
        })
    }

    /// Get all languages ordered by name
    pub fn get_all_languages(&self) -> Result<Vec<Language>> {
        self.with_connection(|conn| {
            get_all_languages_impl(conn)
        })
    }

    /// Update a language
    pub fn update_language(&self, id: &str, updates: &UpdateLanguage) -> Result<()> {
        self.with_connection(|conn| {
            update_language_impl(conn, id, updates)
        })
    }

    /// Delete a language together with its dialects and lemmata
    pub fn delete_language(&self, id: &str) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute("DELETE FROM languages WHERE id = ?", params![id])
                .context("Failed to delete language")?;
            Ok(())
        })
    }

    // ============ Dialects ============

    /// Create a new dialect
    pub fn create_dialect(&self, input: &CreateDialect) -> Result<String> {
        self.with_connection(|conn| {
            create_dialect_impl(conn, input)
        })
    }

    /// Get a dialect by ID
    pub fn get_dialect(&self, id: &str) -> Result<Option<Dialect>> {
        self.with_connection(|conn| {
            get_dialect_impl(conn, id)
        })
    }

    /// Get dialects, optionally only those of one language
    pub fn list_dialects(&self, language_id: Option<&str>) -> Result<Vec<Dialect>> {
        self.with_connection(|conn| {
            list_dialects_impl(conn, language_id)
        })
    }

    /// Update a dialect
    pub fn update_dialect(&self, id: &str, updates: &UpdateDialect) -> Result<()> {
        self.with_connection(|conn| {
            update_dialect_impl(conn, id, updates)
        })
    }

    /// Delete a dialect; recordings keep existing without a dialect
    pub fn delete_dialect(&self, id: &str) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute("DELETE FROM dialects WHERE id = ?", params![id])
                .context("Failed to delete dialect")?;
            Ok(())
        })
    }
}

// ============ Language Implementations ============

fn language_from_row(row: &Row) -> rusqlite::Result<Language> {
    Ok(Language {
        id: row.get(0)?,
        name: row.get(1)?,
        abbreviation: row.get(2)?,
    })
}

fn create_language_impl(conn: &Connection, name: &str, abbreviation: &str) -> Result<String> {
    validation::required("name", name, NAME_MAX)?;
    // Abbreviation is what a language displays as
    validation::required("abbreviation", abbreviation, ABBREVIATION_MAX)?;

    let id = new_id("lang");

    conn.execute(
        "INSERT INTO languages (id, name, abbreviation) VALUES (?1, ?2, ?3)",
        params![id, name, abbreviation],
    ).context("Failed to create language")?;

    Ok(id)
}

fn get_language_impl(conn: &Connection, id: &str) -> Result<Option<Language>> {
    let result = conn.query_row(
        "SELECT id, name, abbreviation FROM languages WHERE id = ?",
        params![id],
        language_from_row,
    );

    match result {
        Ok(language) => Ok(Some(language)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e).context("Failed to get language"),
    }
}

fn get_language_by_abbreviation_impl(conn: &Connection, abbreviation: &str) -> Result<Option<Language>> {
    let result = conn.query_row(
        "SELECT id, name, abbreviation FROM languages WHERE abbreviation = ? ORDER BY name LIMIT 1",
        params![abbreviation],
        language_from_row,
    );

    match result {
        Ok(language) => Ok(Some(language)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e).context("Failed to get language by abbreviation"),
    }
}

fn get_all_languages_impl(conn: &Connection) -> Result<Vec<Language>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, abbreviation FROM languages ORDER BY name ASC"
    ).context("Failed to prepare get_all_languages query")?;

    let languages = stmt.query_map([], language_from_row)
        .context("Failed to query languages")?;

    languages.collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to collect languages")
}

fn update_language_impl(conn: &Connection, id: &str, updates: &UpdateLanguage) -> Result<()> {
    let mut set_clauses = Vec::new();
    let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if let Some(ref name) = updates.name {
        validation::required("name", name, NAME_MAX)?;
        set_clauses.push("name = ?");
        params_vec.push(Box::new(name.clone()));
    }
    if let Some(ref abbreviation) = updates.abbreviation {
        validation::required("abbreviation", abbreviation, ABBREVIATION_MAX)?;
        set_clauses.push("abbreviation = ?");
        params_vec.push(Box::new(abbreviation.clone()));
    }

    if set_clauses.is_empty() {
        return Ok(());
    }

    params_vec.push(Box::new(id.to_string()));

    let query = format!(
        "UPDATE languages SET {} WHERE id = ?",
        set_clauses.join(", ")
    );

    let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|b| b.as_ref()).collect();

    conn.execute(&query, params_refs.as_slice())
        .context("Failed to update language")?;

    Ok(())
}

// ============ Dialect Implementations ============

fn dialect_from_row(row: &Row) -> rusqlite::Result<Dialect> {
    Ok(Dialect {
        id: row.get(0)?,
        name: row.get(1)?,
        abbreviation: row.get(2)?,
        language_id: row.get(3)?,
        description: row.get(4)?,
    })
}

fn create_dialect_impl(conn: &Connection, input: &CreateDialect) -> Result<String> {
    validation::required("name", &input.name, NAME_MAX)?;
    validation::max_len("abbreviation", &input.abbreviation, ABBREVIATION_MAX)?;

    let id = new_id("dia");

    conn.execute(
        r#"
        INSERT INTO dialects (id, name, abbreviation, language_id, description)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
        params![id, input.name, input.abbreviation, input.language_id, input.description],
    ).context("Failed to create dialect")?;

    Ok(id)
}

fn get_dialect_impl(conn: &Connection, id: &str) -> Result<Option<Dialect>> {
    let result = conn.query_row(
        "SELECT id, name, abbreviation, language_id, description FROM dialects WHERE id = ?",
        params![id],
        dialect_from_row,
    );

    match result {
        Ok(dialect) => Ok(Some(dialect)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e).context("Failed to get dialect"),
    }
}

fn list_dialects_impl(conn: &Connection, language_id: Option<&str>) -> Result<Vec<Dialect>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT id, name, abbreviation, language_id, description
        FROM dialects
        WHERE ?1 IS NULL OR language_id = ?1
        ORDER BY name ASC
        "#
    ).context("Failed to prepare list_dialects query")?;

    let dialects = stmt.query_map(params![language_id], dialect_from_row)
        .context("Failed to query dialects")?;

    dialects.collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to collect dialects")
}

fn update_dialect_impl(conn: &Connection, id: &str, updates: &UpdateDialect) -> Result<()> {
    let mut set_clauses = Vec::new();
    let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if let Some(ref name) = updates.name {
        validation::required("name", name, NAME_MAX)?;
        set_clauses.push("name = ?");
        params_vec.push(Box::new(name.clone()));
    }
    if let Some(ref abbreviation) = updates.abbreviation {
        validation::max_len("abbreviation", abbreviation, ABBREVIATION_MAX)?;
        set_clauses.push("abbreviation = ?");
        params_vec.push(Box::new(abbreviation.clone()));
    }
    if let Some(ref language_id) = updates.language_id {
        set_clauses.push("language_id = ?");
        params_vec.push(Box::new(language_id.clone()));
    }
    if let Some(ref description) = updates.description {
        set_clauses.push("description = ?");
        params_vec.push(Box::new(description.clone()));
    }

    if set_clauses.is_empty() {
        return Ok(());
    }

    params_vec.push(Box::new(id.to_string()));

    let query = format!(
        "UPDATE dialects SET {} WHERE id = ?",
        set_clauses.join(", ")
    );

    let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|b| b.as_ref()).collect();

    conn.execute(&query, params_refs.as_slice())
        .context("Failed to update dialect")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_support::create_test_db;

    fn dialect_input(language_id: &str, name: &str, abbreviation: &str) -> CreateDialect {
        CreateDialect {
            name: name.to_string(),
            abbreviation: abbreviation.to_string(),
            language_id: language_id.to_string(),
            description: String::new(),
        }
    }

    #[test]
    fn test_create_and_get_language() {
        let (_dir, db) = create_test_db();

        let id = db.create_language("Udmurt", "udm").unwrap();
        let language = db.get_language(&id).unwrap().unwrap();
        assert_eq!(language.name, "Udmurt");
        assert_eq!(language.to_string(), "udm");

        let by_abbr = db.get_language_by_abbreviation("udm").unwrap().unwrap();
        assert_eq!(by_abbr.id, id);
        assert!(db.get_language_by_abbreviation("kpv").unwrap().is_none());
    }

    #[test]
    fn test_language_abbreviation_limits() {
        let (_dir, db) = create_test_db();

        assert!(db.create_language("Komi", "").is_err());
        assert!(db.create_language("Komi", "komizy").is_err());
        assert!(db.create_language("Komi", "kpv").is_ok());
    }

    #[test]
    fn test_update_language() {
        let (_dir, db) = create_test_db();
        let id = db.create_language("Udmurt", "udm").unwrap();

        db.update_language(&id, &UpdateLanguage {
            name: Some("Udmurt (Votyak)".to_string()),
            ..Default::default()
        }).unwrap();

        let language = db.get_language(&id).unwrap().unwrap();
        assert_eq!(language.name, "Udmurt (Votyak)");
        assert_eq!(language.abbreviation, "udm");

        let err = db.update_language(&id, &UpdateLanguage {
            abbreviation: Some(String::new()),
            ..Default::default()
        });
        assert!(err.is_err());
    }

    #[test]
    fn test_dialects_by_language() {
        let (_dir, db) = create_test_db();
        let udm = db.create_language("Udmurt", "udm").unwrap();
        let kpv = db.create_language("Komi-Zyrian", "kpv").unwrap();

        let north = db.create_dialect(&dialect_input(&udm, "Northern Udmurt", "nudm")).unwrap();
        db.create_dialect(&dialect_input(&udm, "Southern Udmurt", "sudm")).unwrap();
        db.create_dialect(&dialect_input(&kpv, "Izhma", "izh")).unwrap();

        assert_eq!(db.list_dialects(None).unwrap().len(), 3);
        let udmurt_dialects = db.list_dialects(Some(&udm)).unwrap();
        assert_eq!(udmurt_dialects.len(), 2);
        assert_eq!(udmurt_dialects[0].id, north);
        assert_eq!(udmurt_dialects[0].to_string(), "nudm");
    }

    #[test]
    fn test_dialect_requires_existing_language() {
        let (_dir, db) = create_test_db();
        assert!(db.create_dialect(&dialect_input("lang_missing", "Ghost", "gh")).is_err());
    }

    #[test]
    fn test_delete_language_cascades_to_dialects() {
        let (_dir, db) = create_test_db();
        let udm = db.create_language("Udmurt", "udm").unwrap();
        let dialect = db.create_dialect(&dialect_input(&udm, "Beserman", "bes")).unwrap();

        db.delete_language(&udm).unwrap();
        assert!(db.get_dialect(&dialect).unwrap().is_none());
    }

    #[test]
    fn test_update_dialect_description() {
        let (_dir, db) = create_test_db();
        let udm = db.create_language("Udmurt", "udm").unwrap();
        let dialect = db.create_dialect(&dialect_input(&udm, "Beserman", "bes")).unwrap();

        db.update_dialect(&dialect, &UpdateDialect {
            description: Some("Spoken in the north-west of Udmurtia".to_string()),
            ..Default::default()
        }).unwrap();

        let stored = db.get_dialect(&dialect).unwrap().unwrap();
        assert_eq!(stored.description, "Spoken in the north-west of Udmurtia");
    }
}
