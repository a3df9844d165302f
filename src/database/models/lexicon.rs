// Database models - Lexicon (lemmata, forms, tokens)
use serde::{Deserialize, Serialize};
use std::fmt;

/// A dictionary headword
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Lemma {
    pub id: String,
    pub value: String,
    /// Part-of-speech tag
    pub pos: String,
    pub language_id: String,
}

impl fmt::Display for Lemma {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLemma {
    pub value: String,
    pub pos: String,
    pub language_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateLemma {
    pub value: Option<String>,
    pub pos: Option<String>,
    pub language_id: Option<String>,
}

/// Lemma list filters
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LemmaFilters {
    pub language_id: Option<String>,
    pub pos: Option<String>,
    pub value_prefix: Option<String>,
}

/// One realised variant of a lemma
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Form {
    pub id: String,
    pub value: String,
    pub lemma_id: String,
    pub annotation: String,
}

impl fmt::Display for Form {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateForm {
    pub value: String,
    pub lemma_id: String,
    #[serde(default)]
    pub annotation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateForm {
    pub value: Option<String>,
    pub lemma_id: Option<String>,
    pub annotation: Option<String>,
}

/// A word instance in transcribed speech
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Token {
    pub id: String,
    pub transcription: String,
}

/// Position of a form inside a token's composition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenToForm {
    pub token_id: String,
    pub form_id: String,
    pub order_id: i64,
}

/// A token with its forms in composition order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenWithForms {
    pub token: Token,
    pub forms: Vec<Form>,
}
