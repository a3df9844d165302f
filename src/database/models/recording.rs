// Database models - Recording
use chrono::{Local, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use super::{Interviewer, Speaker};
use crate::database::new_id;
use crate::storage::FileRef;
use crate::string_id::StringId;

/// A single fieldwork session with its optional transcription and audio
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recording {
    pub id: String,
    /// Unique external identifier, normally the source file name without extension
    pub string_id: String,
    pub recording_date: NaiveDate,
    pub recording_time: Option<NaiveTime>,
    pub recording_place_id: Option<String>,
    /// ELAN transcription, relative to the media root
    pub transcription_file: Option<FileRef>,
    pub audio_file: Option<FileRef>,
    // Free-text columns carried over from spreadsheet imports
    pub metacomment1: String,
    pub metacomment2: String,
    pub metacomment3: String,
    pub title: String,
    pub topics: String,
    pub comments: String,
    pub participants_field: String,
    pub informant: String,
    pub location: String,
    pub recording_device: String,
    pub dialect_id: Option<String>,
}

impl Recording {
    /// New recording dated today
    pub fn new(string_id: impl Into<String>) -> Self {
        Self {
            id: new_id("rec"),
            string_id: string_id.into(),
            recording_date: Local::now().date_naive(),
            recording_time: None,
            recording_place_id: None,
            transcription_file: None,
            audio_file: None,
            metacomment1: String::new(),
            metacomment2: String::new(),
            metacomment3: String::new(),
            title: String::new(),
            topics: String::new(),
            comments: String::new(),
            participants_field: String::new(),
            informant: String::new(),
            location: String::new(),
            recording_device: String::new(),
            dialect_id: None,
        }
    }

    /// Build a recording from a source file name such as `2016-07-13_a_kazan.wav`.
    ///
    /// The string_id is the file stem; the recording date comes from the
    /// date segment when it parses and defaults to today otherwise.
    pub fn from_file_name(file_name: &str) -> Self {
        let stem = Path::new(file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(file_name);

        let mut recording = Self::new(stem);
        if let Some(date) = StringId::parse(stem).and_then(|id| id.date) {
            recording.recording_date = date;
        }
        recording
    }

    pub fn parsed_string_id(&self) -> Option<StringId> {
        StringId::parse(&self.string_id)
    }
}

impl fmt::Display for Recording {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.string_id)
    }
}

/// Updates that can be applied to a recording.
///
/// File references are changed through the dedicated file operations, not here.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RecordingUpdate {
    pub string_id: Option<String>,
    pub recording_date: Option<NaiveDate>,
    /// `Some(None)` clears the time
    pub recording_time: Option<Option<NaiveTime>>,
    /// Empty string clears the place
    pub recording_place_id: Option<String>,
    pub metacomment1: Option<String>,
    pub metacomment2: Option<String>,
    pub metacomment3: Option<String>,
    pub title: Option<String>,
    pub topics: Option<String>,
    pub comments: Option<String>,
    pub participants_field: Option<String>,
    pub informant: Option<String>,
    pub location: Option<String>,
    pub recording_device: Option<String>,
    /// Empty string clears the dialect
    pub dialect_id: Option<String>,
}

/// Recording list filters
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RecordingFilters {
    pub dialect_id: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub string_id_prefix: Option<String>,
    pub speaker_id: Option<String>,
}

/// A recording with its speakers and interviewers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingWithPeople {
    pub recording: Recording,
    pub speakers: Vec<Speaker>,
    pub interviewers: Vec<Interviewer>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_file_name_uses_stem_and_date() {
        let recording = Recording::from_file_name("2016-07-13_a_kazan.wav");
        assert_eq!(recording.string_id, "2016-07-13_a_kazan");
        assert_eq!(recording.recording_date, NaiveDate::from_ymd_opt(2016, 7, 13).unwrap());
        assert!(recording.id.starts_with("rec_"));
    }

    #[test]
    fn test_from_file_name_without_date_defaults_to_today() {
        let recording = Recording::from_file_name("interview.mp3");
        assert_eq!(recording.string_id, "interview");
        assert_eq!(recording.recording_date, Local::now().date_naive());
    }

    #[test]
    fn test_display_is_string_id() {
        let recording = Recording::new("20160713_b");
        assert_eq!(recording.to_string(), "20160713_b");
    }
}
