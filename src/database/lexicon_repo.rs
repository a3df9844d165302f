// Lexicon repository for the fieldwork corpus
// Handles lemmata, their forms, and tokens composed of ordered forms

use anyhow::{Context, Result};
use rusqlite::{Connection, Row, params};

use super::models::{
    Lemma, CreateLemma, UpdateLemma, LemmaFilters,
    Form, CreateForm, UpdateForm,
    Token, TokenToForm, TokenWithForms,
};
use super::{like_prefix, new_id, DatabaseManager};
use crate::validation;

const LEMMA_VALUE_MAX: usize = 30;
const POS_MAX: usize = 10;
const FORM_VALUE_MAX: usize = 30;
const ANNOTATION_MAX: usize = 30;
const TRANSCRIPTION_MAX: usize = 50;

impl DatabaseManager {
    // ============ Lemmata ============

    /// Create a new lemma
    pub fn create_lemma(&self, input: &CreateLemma) -> Result<String> {
        self.with_connection(|conn| {
            create_lemma_impl(conn, input)
        })
    }

    /// Get a lemma by ID
    pub fn get_lemma(&self, id: &str) -> Result<Option<Lemma>> {
        self.with_connection(|conn| {
            get_lemma_impl(conn, id)
        })
    }

    /// List lemmata matching the filters, ordered by value
    pub fn list_lemmata(&self, filters: &LemmaFilters) -> Result<Vec<Lemma>> {
        self.with_connection(|conn| {
            list_lemmata_impl(conn, filters)
        })
    }

    /// Update a lemma
    pub fn update_lemma(&self, id: &str, updates: &UpdateLemma) -> Result<()> {
        self.with_connection(|conn| {
            update_lemma_impl(conn, id, updates)
        })
    }

    /// Delete a lemma and its forms
    pub fn delete_lemma(&self, id: &str) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute("DELETE FROM lemmata WHERE id = ?", params![id])
                .context("Failed to delete lemma")?;
            Ok(())
        })
    }

    // ============ Forms ============

    /// Create a new form of a lemma
    pub fn create_form(&self, input: &CreateForm) -> Result<String> {
        self.with_connection(|conn| {
            create_form_impl(conn, input)
        })
    }

    /// Get a form by ID
    pub fn get_form(&self, id: &str) -> Result<Option<Form>> {
        self.with_connection(|conn| {
            get_form_impl(conn, id)
        })
    }

    /// List forms, optionally only those of one lemma
    pub fn list_forms(&self, lemma_id: Option<&str>) -> Result<Vec<Form>> {
        self.with_connection(|conn| {
            list_forms_impl(conn, lemma_id)
        })
    }

    /// Update a form
    pub fn update_form(&self, id: &str, updates: &UpdateForm) -> Result<()> {
        self.with_connection(|conn| {
            update_form_impl(conn, id, updates)
        })
    }

    /// Delete a form; it disappears from every token composed of it
    pub fn delete_form(&self, id: &str) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute("DELETE FROM forms WHERE id = ?", params![id])
                .context("Failed to delete form")?;
            Ok(())
        })
    }

    // ============ Tokens ============

    /// Create a token composed of the given forms, in order
    pub fn create_token(&self, transcription: &str, form_ids: &[String]) -> Result<String> {
        self.with_connection(|conn| {
            create_token_impl(conn, transcription, form_ids)
        })
    }

    /// Get a token by ID
    pub fn get_token(&self, id: &str) -> Result<Option<Token>> {
        self.with_connection(|conn| {
            get_token_impl(conn, id)
        })
    }

    /// Get a token with its forms in composition order
    pub fn get_token_with_forms(&self, id: &str) -> Result<Option<TokenWithForms>> {
        self.with_connection(|conn| {
            let token = match get_token_impl(conn, id)? {
                Some(t) => t,
                None => return Ok(None),
            };
            let forms = get_token_forms_impl(conn, id)?;
            Ok(Some(TokenWithForms { token, forms }))
        })
    }

    /// Get the raw composition links of a token, ordered by order_id
    pub fn get_token_links(&self, token_id: &str) -> Result<Vec<TokenToForm>> {
        self.with_connection(|conn| {
            get_token_links_impl(conn, token_id)
        })
    }

    /// Link a form into a token at an explicit position.
    ///
    /// Fails if the token already has a form at `order_id`.
    pub fn add_token_form(&self, token_id: &str, form_id: &str, order_id: i64) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO token_forms (token_id, form_id, order_id) VALUES (?1, ?2, ?3)",
                params![token_id, form_id, order_id],
            ).context("Failed to add form to token")?;
            Ok(())
        })
    }

    /// Replace the whole composition of a token
    pub fn set_token_forms(&self, token_id: &str, form_ids: &[String]) -> Result<()> {
        self.with_connection(|conn| {
            set_token_forms_impl(conn, token_id, form_ids)
        })
    }

    /// Change a token's transcription
    pub fn update_token_transcription(&self, id: &str, transcription: &str) -> Result<()> {
        self.with_connection(|conn| {
            validation::required("transcription", transcription, TRANSCRIPTION_MAX)?;
            conn.execute(
                "UPDATE tokens SET transcription = ? WHERE id = ?",
                params![transcription, id],
            ).context("Failed to update token")?;
            Ok(())
        })
    }

    /// Delete a token and its composition links
    pub fn delete_token(&self, id: &str) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute("DELETE FROM tokens WHERE id = ?", params![id])
                .context("Failed to delete token")?;
            Ok(())
        })
    }

    /// List tokens ordered by transcription, optionally by transcription prefix
    pub fn list_tokens(&self, transcription_prefix: Option<&str>) -> Result<Vec<Token>> {
        self.with_connection(|conn| {
            list_tokens_impl(conn, transcription_prefix)
        })
    }

    /// Get all tokens that contain a form
    pub fn list_tokens_with_form(&self, form_id: &str) -> Result<Vec<Token>> {
        self.with_connection(|conn| {
            list_tokens_with_form_impl(conn, form_id)
        })
    }
}

// ============ Lemma Implementations ============

fn lemma_from_row(row: &Row) -> rusqlite::Result<Lemma> {
    Ok(Lemma {
        id: row.get(0)?,
        value: row.get(1)?,
        pos: row.get(2)?,
        language_id: row.get(3)?,
    })
}

fn create_lemma_impl(conn: &Connection, input: &CreateLemma) -> Result<String> {
    validation::required("value", &input.value, LEMMA_VALUE_MAX)?;
    validation::max_len("POS", &input.pos, POS_MAX)?;

    let id = new_id("lem");

    conn.execute(
        "INSERT INTO lemmata (id, value, pos, language_id) VALUES (?1, ?2, ?3, ?4)",
        params![id, input.value, input.pos, input.language_id],
    ).context("Failed to create lemma")?;

    Ok(id)
}

fn get_lemma_impl(conn: &Connection, id: &str) -> Result<Option<Lemma>> {
    let result = conn.query_row(
        "SELECT id, value, pos, language_id FROM lemmata WHERE id = ?",
        params![id],
        lemma_from_row,
    );

    match result {
        Ok(lemma) => Ok(Some(lemma)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e).context("Failed to get lemma"),
    }
}

fn list_lemmata_impl(conn: &Connection, filters: &LemmaFilters) -> Result<Vec<Lemma>> {
    let mut sql = String::from("SELECT id, value, pos, language_id FROM lemmata WHERE 1 = 1");
    let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if let Some(ref language_id) = filters.language_id {
        sql.push_str(" AND language_id = ?");
        params_vec.push(Box::new(language_id.clone()));
    }
    if let Some(ref pos) = filters.pos {
        sql.push_str(" AND pos = ?");
        params_vec.push(Box::new(pos.clone()));
    }
    if let Some(ref prefix) = filters.value_prefix {
        sql.push_str(" AND value LIKE ? ESCAPE '\\'");
        params_vec.push(Box::new(like_prefix(prefix)));
    }
    sql.push_str(" ORDER BY value ASC");

    let mut stmt = conn.prepare(&sql).context("Failed to prepare list_lemmata query")?;
    let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|b| b.as_ref()).collect();

    let lemmata = stmt.query_map(params_refs.as_slice(), lemma_from_row)
        .context("Failed to query lemmata")?;

    lemmata.collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to collect lemmata")
}

fn update_lemma_impl(conn: &Connection, id: &str, updates: &UpdateLemma) -> Result<()> {
    let mut set_clauses = Vec::new();
    let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if let Some(ref value) = updates.value {
        validation::required("value", value, LEMMA_VALUE_MAX)?;
        set_clauses.push("value = ?");
        params_vec.push(Box::new(value.clone()));
    }
    if let Some(ref pos) = updates.pos {
        validation::max_len("POS", pos, POS_MAX)?;
        set_clauses.push("pos = ?");
        params_vec.push(Box::new(pos.clone()));
    }
    if let Some(ref language_id) = updates.language_id {
        set_clauses.push("language_id = ?");
        params_vec.push(Box::new(language_id.clone()));
    }

    if set_clauses.is_empty() {
        return Ok(());
    }

    params_vec.push(Box::new(id.to_string()));

    let query = format!("UPDATE lemmata SET {} WHERE id = ?", set_clauses.join(", "));
    let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|b| b.as_ref()).collect();

    conn.execute(&query, params_refs.as_slice())
        .context("Failed to update lemma")?;

    Ok(())
}

// ============ Form Implementations ============

fn form_from_row(row: &Row) -> rusqlite::Result<Form> {
    Ok(Form {
        id: row.get(0)?,
        value: row.get(1)?,
        lemma_id: row.get(2)?,
        annotation: row.get(3)?,
    })
}

fn create_form_impl(conn: &Connection, input: &CreateForm) -> Result<String> {
    validation::required("value", &input.value, FORM_VALUE_MAX)?;
    validation::max_len("annotation", &input.annotation, ANNOTATION_MAX)?;

    let id = new_id("form");

    conn.execute(
        "INSERT INTO forms (id, value, lemma_id, annotation) VALUES (?1, ?2, ?3, ?4)",
        params![id, input.value, input.lemma_id, input.annotation],
    ).context("Failed to create form")?;

    Ok(id)
}

fn get_form_impl(conn: &Connection, id: &str) -> Result<Option<Form>> {
    let result = conn.query_row(
        "SELECT id, value, lemma_id, annotation FROM forms WHERE id = ?",
        params![id],
        form_from_row,
    );

    match result {
        Ok(form) => Ok(Some(form)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e).context("Failed to get form"),
    }
}

fn list_forms_impl(conn: &Connection, lemma_id: Option<&str>) -> Result<Vec<Form>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT id, value, lemma_id, annotation
        FROM forms
        WHERE ?1 IS NULL OR lemma_id = ?1
        ORDER BY value ASC
        "#
    ).context("Failed to prepare list_forms query")?;

    let forms = stmt.query_map(params![lemma_id], form_from_row)
        .context("Failed to query forms")?;

    forms.collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to collect forms")
}

fn update_form_impl(conn: &Connection, id: &str, updates: &UpdateForm) -> Result<()> {
    let mut set_clauses = Vec::new();
    let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if let Some(ref value) = updates.value {
        validation::required("value", value, FORM_VALUE_MAX)?;
        set_clauses.push("value = ?");
        params_vec.push(Box::new(value.clone()));
    }
    if let Some(ref lemma_id) = updates.lemma_id {
        set_clauses.push("lemma_id = ?");
        params_vec.push(Box::new(lemma_id.clone()));
    }
    if let Some(ref annotation) = updates.annotation {
        validation::max_len("annotation", annotation, ANNOTATION_MAX)?;
        set_clauses.push("annotation = ?");
        params_vec.push(Box::new(annotation.clone()));
    }

    if set_clauses.is_empty() {
        return Ok(());
    }

    params_vec.push(Box::new(id.to_string()));

    let query = format!("UPDATE forms SET {} WHERE id = ?", set_clauses.join(", "));
    let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|b| b.as_ref()).collect();

    conn.execute(&query, params_refs.as_slice())
        .context("Failed to update form")?;

    Ok(())
}

// ============ Token Implementations ============

fn create_token_impl(conn: &Connection, transcription: &str, form_ids: &[String]) -> Result<String> {
    validation::required("transcription", transcription, TRANSCRIPTION_MAX)?;

    let id = new_id("tok");
    let tx = conn.unchecked_transaction()
        .context("Failed to start transaction")?;

    tx.execute(
        "INSERT INTO tokens (id, transcription) VALUES (?1, ?2)",
        params![id, transcription],
    ).context("Failed to create token")?;

    insert_token_forms(&tx, &id, form_ids)?;

    tx.commit().context("Failed to commit token")?;

    Ok(id)
}

/// order_id is the position in `form_ids`
fn insert_token_forms(conn: &Connection, token_id: &str, form_ids: &[String]) -> Result<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO token_forms (token_id, form_id, order_id) VALUES (?1, ?2, ?3)"
    ).context("Failed to prepare token_forms insert")?;

    for (order_id, form_id) in form_ids.iter().enumerate() {
        stmt.execute(params![token_id, form_id, order_id as i64])
            .with_context(|| format!("Failed to link form {} to token", form_id))?;
    }

    Ok(())
}

fn get_token_impl(conn: &Connection, id: &str) -> Result<Option<Token>> {
    let result = conn.query_row(
        "SELECT id, transcription FROM tokens WHERE id = ?",
        params![id],
        |row| {
            Ok(Token {
                id: row.get(0)?,
                transcription: row.get(1)?,
            })
        },
    );

    match result {
        Ok(token) => Ok(Some(token)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e).context("Failed to get token"),
    }
}

fn get_token_forms_impl(conn: &Connection, token_id: &str) -> Result<Vec<Form>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT f.id, f.value, f.lemma_id, f.annotation
        FROM forms f
        JOIN token_forms tf ON f.id = tf.form_id
        WHERE tf.token_id = ?
        ORDER BY tf.order_id ASC
        "#
    ).context("Failed to prepare get_token_forms query")?;

    let forms = stmt.query_map(params![token_id], form_from_row)
        .context("Failed to query token forms")?;

    forms.collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to collect token forms")
}

fn get_token_links_impl(conn: &Connection, token_id: &str) -> Result<Vec<TokenToForm>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT token_id, form_id, order_id
        FROM token_forms
        WHERE token_id = ?
        ORDER BY order_id ASC
        "#
    ).context("Failed to prepare get_token_links query")?;

    let links = stmt.query_map(params![token_id], |row| {
        Ok(TokenToForm {
            token_id: row.get(0)?,
            form_id: row.get(1)?,
            order_id: row.get(2)?,
        })
    }).context("Failed to query token links")?;

    links.collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to collect token links")
}

fn set_token_forms_impl(conn: &Connection, token_id: &str, form_ids: &[String]) -> Result<()> {
    let tx = conn.unchecked_transaction()
        .context("Failed to start transaction")?;

    tx.execute("DELETE FROM token_forms WHERE token_id = ?", params![token_id])
        .context("Failed to clear token forms")?;

    insert_token_forms(&tx, token_id, form_ids)?;

    tx.commit().context("Failed to commit token forms")?;

    Ok(())
}

fn list_tokens_impl(conn: &Connection, transcription_prefix: Option<&str>) -> Result<Vec<Token>> {
    let pattern = transcription_prefix.map(like_prefix);

    let mut stmt = conn.prepare(
        r#"
        SELECT id, transcription
        FROM tokens
        WHERE ?1 IS NULL OR transcription LIKE ?1 ESCAPE '\'
        ORDER BY transcription ASC, id ASC
        "#
    ).context("Failed to prepare list_tokens query")?;

    let tokens = stmt.query_map(params![pattern], |row| {
        Ok(Token {
            id: row.get(0)?,
            transcription: row.get(1)?,
        })
    }).context("Failed to query tokens")?;

    tokens.collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to collect tokens")
}

fn list_tokens_with_form_impl(conn: &Connection, form_id: &str) -> Result<Vec<Token>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT DISTINCT t.id, t.transcription
        FROM tokens t
        JOIN token_forms tf ON t.id = tf.token_id
        WHERE tf.form_id = ?
        ORDER BY t.transcription ASC
        "#
    ).context("Failed to prepare list_tokens_with_form query")?;

    let tokens = stmt.query_map(params![form_id], |row| {
        Ok(Token {
            id: row.get(0)?,
            transcription: row.get(1)?,
        })
    }).context("Failed to query tokens")?;

    tokens.collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to collect tokens")
}
