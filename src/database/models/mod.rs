// Database models - Re-exports all domain-specific models
//
// This module is split into focused files by domain:
// - language.rs: Languages and dialects
// - lexicon.rs: Lemmata, forms and tokens
// - people.rs: Locations, speakers and interviewers
// - recording.rs: Fieldwork recordings
// - corpus.rs: Corpora and normalization models

mod language;
mod lexicon;
mod people;
mod recording;
mod corpus;

pub use language::{Language, UpdateLanguage, Dialect, CreateDialect, UpdateDialect};
pub use lexicon::{
    Lemma, CreateLemma, UpdateLemma, LemmaFilters,
    Form, CreateForm, UpdateForm,
    Token, TokenToForm, TokenWithForms,
};
pub use people::{Location, Speaker, Interviewer};
pub use recording::{Recording, RecordingUpdate, RecordingFilters, RecordingWithPeople};
pub use corpus::{Corpus, NormalizationModel, CreateNormalizationModel, UpdateNormalizationModel};
