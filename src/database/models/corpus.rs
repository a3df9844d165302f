// Database models - Corpus and NormalizationModel
use serde::{Deserialize, Serialize};
use std::fmt;

/// A named grouping of recordings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Corpus {
    pub id: String,
    pub name: String,
    pub created_at: String,
}

impl fmt::Display for Corpus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Spelling normalization rules for one dialect
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NormalizationModel {
    pub id: String,
    pub dialect_id: String,
    pub additional_language_id: Option<String>,
    pub examples: String,
    pub exceptions: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateNormalizationModel {
    pub dialect_id: String,
    pub additional_language_id: Option<String>,
    #[serde(default)]
    pub examples: String,
    #[serde(default)]
    pub exceptions: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateNormalizationModel {
    pub dialect_id: Option<String>,
    /// Empty string clears the additional language
    pub additional_language_id: Option<String>,
    pub examples: Option<String>,
    pub exceptions: Option<String>,
}
