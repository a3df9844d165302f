// People repository for the fieldwork corpus
// Handles locations, speakers and interviewers, and their links to recordings

use anyhow::{bail, Context, Result};
use rusqlite::{Connection, params};

use super::models::{Location, Speaker, Interviewer};
use super::{new_id, DatabaseManager};
use crate::validation;

impl DatabaseManager {
    // ============ Locations ============

    /// Create a new location
    pub fn create_location(&self, name: &str) -> Result<String> {
        self.with_connection(|conn| {
            validation::required("name", name, 100)?;
            let id = new_id("loc");
            conn.execute(
                "INSERT INTO locations (id, name) VALUES (?1, ?2)",
                params![id, name],
            ).context("Failed to create location")?;
            Ok(id)
        })
    }

    /// Get a location by ID
    pub fn get_location(&self, id: &str) -> Result<Option<Location>> {
        self.with_connection(|conn| {
            let result = conn.query_row(
                "SELECT id, name FROM locations WHERE id = ?",
                params![id],
                |row| Ok(Location { id: row.get(0)?, name: row.get(1)? }),
            );

            match result {
                Ok(location) => Ok(Some(location)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e).context("Failed to get location"),
            }
        })
    }

    /// Get all locations ordered by name
    pub fn get_all_locations(&self) -> Result<Vec<Location>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare("SELECT id, name FROM locations ORDER BY name ASC")
                .context("Failed to prepare get_all_locations query")?;

            let locations = stmt.query_map([], |row| {
                Ok(Location { id: row.get(0)?, name: row.get(1)? })
            }).context("Failed to query locations")?;

            locations.collect::<std::result::Result<Vec<_>, _>>()
                .context("Failed to collect locations")
        })
    }

    /// Rename a location
    pub fn update_location(&self, id: &str, name: &str) -> Result<()> {
        self.with_connection(|conn| {
            validation::required("name", name, 100)?;
            let changed = conn.execute(
                "UPDATE locations SET name = ?1 WHERE id = ?2",
                params![name, id],
            ).context("Failed to update location")?;
            ensure_changed(changed, "Location", id)
        })
    }

    /// Delete a location; recordings made there lose the reference
    pub fn delete_location(&self, id: &str) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute("DELETE FROM locations WHERE id = ?", params![id])
                .context("Failed to delete location")?;
            Ok(())
        })
    }

    // ============ Speakers ============

    /// Create a new speaker
    pub fn create_speaker(&self, code: &str, name: &str) -> Result<String> {
        self.with_connection(|conn| {
            validation::required("code", code, 30)?;
            let id = new_id("spk");
            conn.execute(
                "INSERT INTO speakers (id, code, name) VALUES (?1, ?2, ?3)",
                params![id, code, name],
            ).context("Failed to create speaker")?;
            Ok(id)
        })
    }

    /// Get a speaker by ID
    pub fn get_speaker(&self, id: &str) -> Result<Option<Speaker>> {
        self.with_connection(|conn| {
            let result = conn.query_row(
                "SELECT id, code, name FROM speakers WHERE id = ?",
                params![id],
                |row| Ok(Speaker { id: row.get(0)?, code: row.get(1)?, name: row.get(2)? }),
            );

            match result {
                Ok(speaker) => Ok(Some(speaker)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e).context("Failed to get speaker"),
            }
        })
    }

    /// Get all speakers ordered by code
    pub fn get_all_speakers(&self) -> Result<Vec<Speaker>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare("SELECT id, code, name FROM speakers ORDER BY code ASC")
                .context("Failed to prepare get_all_speakers query")?;

            let speakers = stmt.query_map([], |row| {
                Ok(Speaker { id: row.get(0)?, code: row.get(1)?, name: row.get(2)? })
            }).context("Failed to query speakers")?;

            speakers.collect::<std::result::Result<Vec<_>, _>>()
                .context("Failed to collect speakers")
        })
    }

    /// Change a speaker's code and name
    pub fn update_speaker(&self, id: &str, code: &str, name: &str) -> Result<()> {
        self.with_connection(|conn| {
            validation::required("code", code, 30)?;
            let changed = conn.execute(
                "UPDATE speakers SET code = ?1, name = ?2 WHERE id = ?3",
                params![code, name, id],
            ).context("Failed to update speaker")?;
            ensure_changed(changed, "Speaker", id)
        })
    }

    /// Delete a speaker
    pub fn delete_speaker(&self, id: &str) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute("DELETE FROM speakers WHERE id = ?", params![id])
                .context("Failed to delete speaker")?;
            Ok(())
        })
    }

    /// Assign a speaker to a recording
    pub fn assign_speaker(&self, recording_id: &str, speaker_id: &str) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO recording_speakers (recording_id, speaker_id) VALUES (?1, ?2)",
                params![recording_id, speaker_id],
            ).context("Failed to assign speaker")?;
            Ok(())
        })
    }

    /// Remove a speaker from a recording
    pub fn remove_speaker(&self, recording_id: &str, speaker_id: &str) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute(
                "DELETE FROM recording_speakers WHERE recording_id = ? AND speaker_id = ?",
                params![recording_id, speaker_id],
            ).context("Failed to remove speaker")?;
            Ok(())
        })
    }

    /// Get the speakers of a recording
    pub fn get_recording_speakers(&self, recording_id: &str) -> Result<Vec<Speaker>> {
        self.with_connection(|conn| {
            get_recording_speakers(conn, recording_id)
        })
    }

    // ============ Interviewers ============

    /// Create a new interviewer
    pub fn create_interviewer(&self, name: &str) -> Result<String> {
        self.with_connection(|conn| {
            validation::required("name", name, 100)?;
            let id = new_id("int");
            conn.execute(
                "INSERT INTO interviewers (id, name) VALUES (?1, ?2)",
                params![id, name],
            ).context("Failed to create interviewer")?;
            Ok(id)
        })
    }

    /// Get an interviewer by ID
    pub fn get_interviewer(&self, id: &str) -> Result<Option<Interviewer>> {
        self.with_connection(|conn| {
            let result = conn.query_row(
                "SELECT id, name FROM interviewers WHERE id = ?",
                params![id],
                |row| Ok(Interviewer { id: row.get(0)?, name: row.get(1)? }),
            );

            match result {
                Ok(interviewer) => Ok(Some(interviewer)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e).context("Failed to get interviewer"),
            }
        })
    }

    /// Get all interviewers ordered by name
    pub fn get_all_interviewers(&self) -> Result<Vec<Interviewer>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare("SELECT id, name FROM interviewers ORDER BY name ASC")
                .context("Failed to prepare get_all_interviewers query")?;

            let interviewers = stmt.query_map([], |row| {
                Ok(Interviewer { id: row.get(0)?, name: row.get(1)? })
            }).context("Failed to query interviewers")?;

            interviewers.collect::<std::result::Result<Vec<_>, _>>()
                .context("Failed to collect interviewers")
        })
    }

    /// Rename an interviewer
    pub fn update_interviewer(&self, id: &str, name: &str) -> Result<()> {
        self.with_connection(|conn| {
            validation::required("name", name, 100)?;
            let changed = conn.execute(
                "UPDATE interviewers SET name = ?1 WHERE id = ?2",
                params![name, id],
            ).context("Failed to update interviewer")?;
            ensure_changed(changed, "Interviewer", id)
        })
    }

    /// Delete an interviewer
    pub fn delete_interviewer(&self, id: &str) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute("DELETE FROM interviewers WHERE id = ?", params![id])
                .context("Failed to delete interviewer")?;
            Ok(())
        })
    }

    /// Assign an interviewer to a recording
    pub fn assign_interviewer(&self, recording_id: &str, interviewer_id: &str) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO recording_interviewers (recording_id, interviewer_id) VALUES (?1, ?2)",
                params![recording_id, interviewer_id],
            ).context("Failed to assign interviewer")?;
            Ok(())
        })
    }

    /// Remove an interviewer from a recording
    pub fn remove_interviewer(&self, recording_id: &str, interviewer_id: &str) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute(
                "DELETE FROM recording_interviewers WHERE recording_id = ? AND interviewer_id = ?",
                params![recording_id, interviewer_id],
            ).context("Failed to remove interviewer")?;
            Ok(())
        })
    }

    /// Get the interviewers of a recording
    pub fn get_recording_interviewers(&self, recording_id: &str) -> Result<Vec<Interviewer>> {
        self.with_connection(|conn| {
            get_recording_interviewers(conn, recording_id)
        })
    }
}

fn ensure_changed(changed: usize, entity: &str, id: &str) -> Result<()> {
    if changed == 0 {
        bail!("{} not found: {}", entity, id);
    }
    Ok(())
}

pub(crate) fn get_recording_speakers(conn: &Connection, recording_id: &str) -> Result<Vec<Speaker>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT s.id, s.code, s.name
        FROM speakers s
        JOIN recording_speakers rs ON s.id = rs.speaker_id
        WHERE rs.recording_id = ?
        ORDER BY s.code ASC
        "#
    ).context("Failed to prepare get_recording_speakers query")?;

    let speakers = stmt.query_map(params![recording_id], |row| {
        Ok(Speaker {
            id: row.get(0)?,
            code: row.get(1)?,
            name: row.get(2)?,
        })
    }).context("Failed to query recording speakers")?;

    speakers.collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to collect recording speakers")
}

pub(crate) fn get_recording_interviewers(conn: &Connection, recording_id: &str) -> Result<Vec<Interviewer>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT i.id, i.name
        FROM interviewers i
        JOIN recording_interviewers ri ON i.id = ri.interviewer_id
        WHERE ri.recording_id = ?
        ORDER BY i.name ASC
        "#
    ).context("Failed to prepare get_recording_interviewers query")?;

    let interviewers = stmt.query_map(params![recording_id], |row| {
        Ok(Interviewer {
            id: row.get(0)?,
            name: row.get(1)?,
        })
    }).context("Failed to query recording interviewers")?;

    interviewers.collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to collect recording interviewers")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::Recording;
    use crate::database::test_support::create_test_db;

    #[test]
    fn test_locations() {
        let (_dir, db) = create_test_db();
        let id = db.create_location("Kazan").unwrap();
        db.create_location("Izhevsk").unwrap();

        assert_eq!(db.get_location(&id).unwrap().unwrap().name, "Kazan");
        let names: Vec<_> = db.get_all_locations().unwrap().into_iter().map(|l| l.name).collect();
        assert_eq!(names, vec!["Izhevsk", "Kazan"]);

        db.delete_location(&id).unwrap();
        assert!(db.get_location(&id).unwrap().is_none());
    }

    #[test]
    fn test_assign_and_remove_speakers() {
        let (_dir, db) = create_test_db();
        let recording = Recording::new("2016-07-13_a");
        db.create_recording(&recording).unwrap();

        let inf1 = db.create_speaker("INF1", "Anna").unwrap();
        let inf2 = db.create_speaker("INF2", "Pyotr").unwrap();

        db.assign_speaker(&recording.id, &inf2).unwrap();
        db.assign_speaker(&recording.id, &inf1).unwrap();
        // assigning twice is a no-op
        db.assign_speaker(&recording.id, &inf1).unwrap();

        let speakers = db.get_recording_speakers(&recording.id).unwrap();
        let codes: Vec<_> = speakers.iter().map(|s| s.to_string()).collect();
        assert_eq!(codes, vec!["INF1", "INF2"]);

        db.remove_speaker(&recording.id, &inf1).unwrap();
        assert_eq!(db.get_recording_speakers(&recording.id).unwrap().len(), 1);

        db.delete_speaker(&inf2).unwrap();
        assert!(db.get_recording_speakers(&recording.id).unwrap().is_empty());
        assert!(db.get_speaker(&inf1).unwrap().is_some());
    }

    #[test]
    fn test_assign_interviewers() {
        let (_dir, db) = create_test_db();
        let recording = Recording::new("2016-07-13_b");
        db.create_recording(&recording).unwrap();

        let interviewer = db.create_interviewer("M. Usacheva").unwrap();
        db.assign_interviewer(&recording.id, &interviewer).unwrap();
        assert_eq!(db.get_recording_interviewers(&recording.id).unwrap().len(), 1);

        db.remove_interviewer(&recording.id, &interviewer).unwrap();
        assert!(db.get_recording_interviewers(&recording.id).unwrap().is_empty());
        assert_eq!(db.get_all_interviewers().unwrap().len(), 1);

        db.delete_interviewer(&interviewer).unwrap();
        assert!(db.get_all_interviewers().unwrap().is_empty());
    }

    #[test]
    fn test_assign_unknown_speaker_fails() {
        let (_dir, db) = create_test_db();
        let recording = Recording::new("2016-07-13_c");
        db.create_recording(&recording).unwrap();

        assert!(db.assign_speaker(&recording.id, "spk_missing").is_err());
    }

    #[test]
    fn test_update_people() {
        let (_dir, db) = create_test_db();

        let place = db.create_location("Kazan").unwrap();
        db.update_location(&place, "Kazan, Tatarstan").unwrap();
        assert_eq!(db.get_location(&place).unwrap().unwrap().name, "Kazan, Tatarstan");
        assert!(db.update_location(&place, "").is_err());

        let speaker = db.create_speaker("INF1", "Anna").unwrap();
        db.update_speaker(&speaker, "AB", "Anna B.").unwrap();
        let stored = db.get_speaker(&speaker).unwrap().unwrap();
        assert_eq!((stored.code.as_str(), stored.name.as_str()), ("AB", "Anna B."));

        let interviewer = db.create_interviewer("M. Usacheva").unwrap();
        db.update_interviewer(&interviewer, "Maria Usacheva").unwrap();
        assert_eq!(db.get_interviewer(&interviewer).unwrap().unwrap().name, "Maria Usacheva");
        assert!(db.get_interviewer("int_missing").unwrap().is_none());
    }

    #[test]
    fn test_update_unknown_people_fails() {
        let (_dir, db) = create_test_db();
        assert!(db.update_location("loc_missing", "Kazan").is_err());
        assert!(db.update_speaker("spk_missing", "AB", "").is_err());
        assert!(db.update_interviewer("int_missing", "Someone").is_err());
    }
}
