// Recordings repository for the fieldwork corpus
// Handles CRUD operations for recordings and their file references

use anyhow::{bail, Context, Result};
use rusqlite::{Connection, Row, params};

use super::models::{Recording, RecordingUpdate, RecordingFilters, RecordingWithPeople};
use super::people_repo::{get_recording_interviewers, get_recording_speakers};
use super::{like_prefix, DatabaseManager};
use crate::storage::FileRef;
use crate::validation;

const STRING_ID_MAX: usize = 30;
const SHORT_TEXT_MAX: usize = 100;
const RECORDING_DEVICE_MAX: usize = 60;

const RECORDING_COLUMNS: &str = r#"
    r.id, r.string_id, r.recording_date, r.recording_time, r.recording_place_id,
    r.transcription_file, r.audio_file, r.metacomment1, r.metacomment2, r.metacomment3,
    r.title, r.topics, r.comments, r.participants_field, r.informant,
    r.location, r.recording_device, r.dialect_id
"#;

/// Which of a recording's two file references to change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingFileKind {
    Transcription,
    Audio,
}

impl RecordingFileKind {
    fn column(self) -> &'static str {
        match self {
            RecordingFileKind::Transcription => "transcription_file",
            RecordingFileKind::Audio => "audio_file",
        }
    }

    /// Media subdirectory new uploads go to
    pub fn upload_dir(self) -> &'static str {
        match self {
            RecordingFileKind::Transcription => "transcriptions",
            RecordingFileKind::Audio => "audio",
        }
    }

    pub fn file_of(self, recording: &Recording) -> Option<&FileRef> {
        match self {
            RecordingFileKind::Transcription => recording.transcription_file.as_ref(),
            RecordingFileKind::Audio => recording.audio_file.as_ref(),
        }
    }
}

impl DatabaseManager {
    /// Create a new recording; fails if the string_id is already taken
    pub fn create_recording(&self, recording: &Recording) -> Result<String> {
        self.with_connection(|conn| {
            create_recording_impl(conn, recording)
        })
    }

    /// Get a recording by ID
    pub fn get_recording(&self, id: &str) -> Result<Option<Recording>> {
        self.with_connection(|conn| {
            get_recording_where(conn, "r.id = ?", id)
        })
    }

    /// Get a recording by its unique string_id
    pub fn get_recording_by_string_id(&self, string_id: &str) -> Result<Option<Recording>> {
        self.with_connection(|conn| {
            get_recording_where(conn, "r.string_id = ?", string_id)
        })
    }

    /// Get a recording with its speakers and interviewers
    pub fn get_recording_with_people(&self, id: &str) -> Result<Option<RecordingWithPeople>> {
        self.with_connection(|conn| {
            let recording = match get_recording_where(conn, "r.id = ?", id)? {
                Some(r) => r,
                None => return Ok(None),
            };

            let speakers = get_recording_speakers(conn, id)?;
            let interviewers = get_recording_interviewers(conn, id)?;

            Ok(Some(RecordingWithPeople {
                recording,
                speakers,
                interviewers,
            }))
        })
    }

    /// List recordings matching the filters (most recent first)
    pub fn list_recordings(&self, filters: &RecordingFilters) -> Result<Vec<Recording>> {
        self.with_connection(|conn| {
            list_recordings_impl(conn, filters)
        })
    }

    /// Other recordings whose string_id starts with the same date and letter
    pub fn find_recordings_by_date_and_letter(
        &self,
        date_and_letter: &str,
        exclude_id: Option<&str>,
    ) -> Result<Vec<Recording>> {
        self.with_connection(|conn| {
            find_by_date_and_letter_impl(conn, date_and_letter, exclude_id)
        })
    }

    /// Update a recording
    pub fn update_recording(&self, id: &str, updates: &RecordingUpdate) -> Result<()> {
        self.with_connection(|conn| {
            update_recording_impl(conn, id, updates)
        })
    }

    /// Point one of the recording's file references at a stored file, or clear it
    pub fn set_recording_file(
        &self,
        id: &str,
        kind: RecordingFileKind,
        file: Option<&FileRef>,
    ) -> Result<()> {
        self.with_connection(|conn| {
            set_recording_file_impl(conn, id, kind, file)
        })
    }

    /// Delete a recording together with its speaker, interviewer and corpus links
    pub fn delete_recording(&self, id: &str) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute("DELETE FROM recordings WHERE id = ?", params![id])
                .context("Failed to delete recording")?;
            Ok(())
        })
    }
}

fn recording_from_row(row: &Row) -> rusqlite::Result<Recording> {
    Ok(Recording {
        id: row.get(0)?,
        string_id: row.get(1)?,
        recording_date: row.get(2)?,
        recording_time: row.get(3)?,
        recording_place_id: row.get(4)?,
        transcription_file: row.get::<_, Option<String>>(5)?.map(FileRef::new),
        audio_file: row.get::<_, Option<String>>(6)?.map(FileRef::new),
        metacomment1: row.get(7)?,
        metacomment2: row.get(8)?,
        metacomment3: row.get(9)?,
        title: row.get(10)?,
        topics: row.get(11)?,
        comments: row.get(12)?,
        participants_field: row.get(13)?,
        informant: row.get(14)?,
        location: row.get(15)?,
        recording_device: row.get(16)?,
        dialect_id: row.get(17)?,
    })
}

fn validate_recording(recording: &Recording) -> Result<()> {
    validation::required("string_id", &recording.string_id, STRING_ID_MAX)?;
    validation::max_len("metacomment1", &recording.metacomment1, SHORT_TEXT_MAX)?;
    validation::max_len("metacomment2", &recording.metacomment2, SHORT_TEXT_MAX)?;
    validation::max_len("metacomment3", &recording.metacomment3, SHORT_TEXT_MAX)?;
    validation::max_len("title", &recording.title, SHORT_TEXT_MAX)?;
    validation::max_len("recording_device", &recording.recording_device, RECORDING_DEVICE_MAX)?;
    Ok(())
}

fn create_recording_impl(conn: &Connection, recording: &Recording) -> Result<String> {
    validate_recording(recording)?;

    conn.execute(
        r#"
        INSERT INTO recordings (
            id, string_id, recording_date, recording_time, recording_place_id,
            transcription_file, audio_file, metacomment1, metacomment2, metacomment3,
            title, topics, comments, participants_field, informant,
            location, recording_device, dialect_id
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)
        "#,
        params![
            recording.id,
            recording.string_id,
            recording.recording_date,
            recording.recording_time,
            recording.recording_place_id,
            recording.transcription_file.as_ref().map(FileRef::name),
            recording.audio_file.as_ref().map(FileRef::name),
            recording.metacomment1,
            recording.metacomment2,
            recording.metacomment3,
            recording.title,
            recording.topics,
            recording.comments,
            recording.participants_field,
            recording.informant,
            recording.location,
            recording.recording_device,
            recording.dialect_id,
        ],
    ).with_context(|| format!("Failed to create recording {}", recording.string_id))?;

    log::debug!("Created recording {} ({})", recording.string_id, recording.id);

    Ok(recording.id.clone())
}

fn get_recording_where(conn: &Connection, condition: &str, value: &str) -> Result<Option<Recording>> {
    let query = format!("SELECT {} FROM recordings r WHERE {}", RECORDING_COLUMNS, condition);
    let mut stmt = conn.prepare(&query)
        .context("Failed to prepare get_recording query")?;

    let result = stmt.query_row(params![value], recording_from_row);

    match result {
        Ok(recording) => Ok(Some(recording)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e).context("Failed to get recording"),
    }
}

fn list_recordings_impl(conn: &Connection, filters: &RecordingFilters) -> Result<Vec<Recording>> {
    let mut sql = format!("SELECT DISTINCT {} FROM recordings r", RECORDING_COLUMNS);
    let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if let Some(ref speaker_id) = filters.speaker_id {
        sql.push_str(" JOIN recording_speakers rs ON r.id = rs.recording_id AND rs.speaker_id = ?");
        params_vec.push(Box::new(speaker_id.clone()));
    }

    sql.push_str(" WHERE 1 = 1");

    if let Some(ref dialect_id) = filters.dialect_id {
        sql.push_str(" AND r.dialect_id = ?");
        params_vec.push(Box::new(dialect_id.clone()));
    }
    if let Some(date_from) = filters.date_from {
        sql.push_str(" AND r.recording_date >= ?");
        params_vec.push(Box::new(date_from));
    }
    if let Some(date_to) = filters.date_to {
        sql.push_str(" AND r.recording_date <= ?");
        params_vec.push(Box::new(date_to));
    }
    if let Some(ref prefix) = filters.string_id_prefix {
        sql.push_str(" AND r.string_id LIKE ? ESCAPE '\\'");
        params_vec.push(Box::new(like_prefix(prefix)));
    }

    sql.push_str(" ORDER BY r.recording_date DESC, r.string_id ASC");

    let mut stmt = conn.prepare(&sql).context("Failed to prepare list_recordings query")?;
    let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|b| b.as_ref()).collect();

    let recordings = stmt.query_map(params_refs.as_slice(), recording_from_row)
        .context("Failed to query recordings")?;

    recordings.collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to collect recordings")
}

fn find_by_date_and_letter_impl(
    conn: &Connection,
    date_and_letter: &str,
    exclude_id: Option<&str>,
) -> Result<Vec<Recording>> {
    let query = format!(
        r#"
        SELECT {} FROM recordings r
        WHERE (r.string_id = ?1 OR r.string_id LIKE ?2 ESCAPE '\')
          AND (?3 IS NULL OR r.id != ?3)
        ORDER BY r.string_id ASC
        "#,
        RECORDING_COLUMNS
    );

    let mut stmt = conn.prepare(&query)
        .context("Failed to prepare find_recordings_by_date_and_letter query")?;

    let pattern = like_prefix(&format!("{}_", date_and_letter));
    let recordings = stmt.query_map(params![date_and_letter, pattern, exclude_id], recording_from_row)
        .context("Failed to query recordings by date and letter")?;

    recordings.collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to collect recordings by date and letter")
}

pub(crate) fn get_corpus_recordings_impl(conn: &Connection, corpus_id: &str) -> Result<Vec<Recording>> {
    let query = format!(
        r#"
        SELECT {} FROM recordings r
        JOIN corpus_recordings cr ON r.id = cr.recording_id
        WHERE cr.corpus_id = ?
        ORDER BY r.string_id ASC
        "#,
        RECORDING_COLUMNS
    );

    let mut stmt = conn.prepare(&query)
        .context("Failed to prepare get_corpus_recordings query")?;

    let recordings = stmt.query_map(params![corpus_id], recording_from_row)
        .context("Failed to query corpus recordings")?;

    recordings.collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to collect corpus recordings")
}

fn update_recording_impl(conn: &Connection, id: &str, updates: &RecordingUpdate) -> Result<()> {
    let mut set_clauses = Vec::new();
    let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if let Some(ref string_id) = updates.string_id {
        validation::required("string_id", string_id, STRING_ID_MAX)?;
        set_clauses.push("string_id = ?");
        params_vec.push(Box::new(string_id.clone()));
    }
    if let Some(date) = updates.recording_date {
        set_clauses.push("recording_date = ?");
        params_vec.push(Box::new(date));
    }
    if let Some(time) = updates.recording_time {
        set_clauses.push("recording_time = ?");
        params_vec.push(Box::new(time));
    }
    if let Some(ref place_id) = updates.recording_place_id {
        set_clauses.push("recording_place_id = ?");
        // Empty string means "clear the field" (set to NULL)
        if place_id.is_empty() {
            params_vec.push(Box::new(None::<String>));
        } else {
            params_vec.push(Box::new(place_id.clone()));
        }
    }

    // Length-limited text columns
    let short_texts = [
        ("metacomment1", "metacomment1 = ?", &updates.metacomment1, SHORT_TEXT_MAX),
        ("metacomment2", "metacomment2 = ?", &updates.metacomment2, SHORT_TEXT_MAX),
        ("metacomment3", "metacomment3 = ?", &updates.metacomment3, SHORT_TEXT_MAX),
        ("title", "title = ?", &updates.title, SHORT_TEXT_MAX),
        ("recording_device", "recording_device = ?", &updates.recording_device, RECORDING_DEVICE_MAX),
    ];
    for (field, clause, value, max) in short_texts {
        if let Some(value) = value {
            validation::max_len(field, value, max)?;
            set_clauses.push(clause);
            params_vec.push(Box::new(value.clone()));
        }
    }

    if let Some(ref topics) = updates.topics {
        set_clauses.push("topics = ?");
        params_vec.push(Box::new(topics.clone()));
    }
    if let Some(ref comments) = updates.comments {
        set_clauses.push("comments = ?");
        params_vec.push(Box::new(comments.clone()));
    }
    if let Some(ref participants_field) = updates.participants_field {
        set_clauses.push("participants_field = ?");
        params_vec.push(Box::new(participants_field.clone()));
    }
    if let Some(ref informant) = updates.informant {
        set_clauses.push("informant = ?");
        params_vec.push(Box::new(informant.clone()));
    }
    if let Some(ref location) = updates.location {
        set_clauses.push("location = ?");
        params_vec.push(Box::new(location.clone()));
    }
    if let Some(ref dialect_id) = updates.dialect_id {
        set_clauses.push("dialect_id = ?");
        // Empty string means "clear the field" (set to NULL)
        if dialect_id.is_empty() {
            params_vec.push(Box::new(None::<String>));
        } else {
            params_vec.push(Box::new(dialect_id.clone()));
        }
    }

    if set_clauses.is_empty() {
        return Ok(());
    }

    set_clauses.push("updated_at = datetime('now')");
    params_vec.push(Box::new(id.to_string()));

    let query = format!(
        "UPDATE recordings SET {} WHERE id = ?",
        set_clauses.join(", ")
    );

    let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|b| b.as_ref()).collect();

    conn.execute(&query, params_refs.as_slice())
        .context("Failed to update recording")?;

    Ok(())
}

fn set_recording_file_impl(
    conn: &Connection,
    id: &str,
    kind: RecordingFileKind,
    file: Option<&FileRef>,
) -> Result<()> {
    let query = format!(
        "UPDATE recordings SET {} = ?, updated_at = datetime('now') WHERE id = ?",
        kind.column()
    );

    let changed = conn.execute(&query, params![file.map(FileRef::name), id])
        .with_context(|| format!("Failed to update {} of recording {}", kind.column(), id))?;

    if changed == 0 {
        bail!("Recording not found: {}", id);
    }

    Ok(())
}
