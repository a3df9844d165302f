// Database models - Places and people attached to recordings
use serde::{Deserialize, Serialize};
use std::fmt;

/// A place where recordings were made
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Location {
    pub id: String,
    pub name: String,
}

/// A recorded speaker (informant)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Speaker {
    pub id: String,
    /// Short code used in transcriptions, e.g. "INF1"
    pub code: String,
    pub name: String,
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Interviewer {
    pub id: String,
    pub name: String,
}
