// Database models - Language and Dialect
use serde::{Deserialize, Serialize};
use std::fmt;

/// A language studied in the corpus
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Language {
    pub id: String,
    pub name: String,
    pub abbreviation: String,
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.abbreviation)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateLanguage {
    pub name: Option<String>,
    pub abbreviation: Option<String>,
}

/// A named variety of a language
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Dialect {
    pub id: String,
    pub name: String,
    pub abbreviation: String,
    pub language_id: String,
    pub description: String,
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.abbreviation)
    }
}

/// Input for creating a dialect
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDialect {
    pub name: String,
    pub abbreviation: String,
    pub language_id: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateDialect {
    pub name: Option<String>,
    pub abbreviation: Option<String>,
    pub language_id: Option<String>,
    pub description: Option<String>,
}
