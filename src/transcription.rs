// Transcription file readers
//
// ELAN (.eaf) files are XML; each annotation tier may name the speaker it
// belongs to in a PARTICIPANT attribute:
//
//   <TIER LINGUISTIC_TYPE_REF="words" PARTICIPANT="AB" TIER_ID="AB_words">
//
// Only the tier start tags are needed, so the reader scans them instead of
// building a document tree.

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

static COMMENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<!--.*?-->").expect("Invalid regex")
});

// Quoted attribute values may contain a literal `>`
static TIER_TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<TIER\b(?:[^>"']|"[^"]*"|'[^']*')*>"#).expect("Invalid regex")
});

static ATTRIBUTE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([A-Za-z_:][-\w.:]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("Invalid regex")
});

static ENTITY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&(?:#([0-9]+)|#[xX]([0-9a-fA-F]+)|(lt|gt|quot|apos|amp));").expect("Invalid regex")
});

/// Reads speaker information out of a transcription file
pub trait TranscriptionReader {
    /// Participant identifiers in first-seen order, without duplicates.
    ///
    /// A missing file is reported as an error whose source is an
    /// `std::io::Error` of kind `NotFound`.
    fn participants(&self, path: &Path) -> Result<Vec<String>>;
}

/// Reader for ELAN annotation files
#[derive(Debug, Default, Clone, Copy)]
pub struct ElanReader;

impl ElanReader {
    pub fn new() -> Self {
        Self
    }

    /// Participants listed on the tiers of an in-memory document
    pub fn participants_from_str(&self, document: &str) -> Vec<String> {
        let mut participants: Vec<String> = Vec::new();

        let document = COMMENT_RE.replace_all(document, "");

        for tag in TIER_TAG_RE.find_iter(&document) {
            let Some(raw) = attribute(tag.as_str(), "PARTICIPANT") else {
                continue;
            };
            let value = unescape_xml(raw).trim().to_string();

            if !value.is_empty() && !participants.contains(&value) {
                participants.push(value);
            }
        }

        participants
    }
}

impl TranscriptionReader for ElanReader {
    fn participants(&self, path: &Path) -> Result<Vec<String>> {
        let document = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read transcription: {}", path.display()))?;

        let participants = self.participants_from_str(&document);
        log::debug!("{} participants in {}", participants.len(), path.display());

        Ok(participants)
    }
}

/// Raw value of attribute `name` in a start tag
fn attribute<'a>(tag: &'a str, name: &str) -> Option<&'a str> {
    ATTRIBUTE_RE
        .captures_iter(tag)
        .find(|caps| &caps[1] == name)
        .and_then(|caps| caps.get(2).or_else(|| caps.get(3)))
        .map(|m| m.as_str())
}

fn unescape_xml(value: &str) -> String {
    if !value.contains('&') {
        return value.to_string();
    }
    ENTITY_RE
        .replace_all(value, |caps: &regex::Captures| {
            let code = match (caps.get(1), caps.get(2)) {
                (Some(dec), _) => dec.as_str().parse::<u32>().ok(),
                (None, Some(hex)) => u32::from_str_radix(hex.as_str(), 16).ok(),
                (None, None) => {
                    return match &caps[3] {
                        "lt" => "<",
                        "gt" => ">",
                        "quot" => "\"",
                        "apos" => "'",
                        _ => "&",
                    }
                    .to_string();
                }
            };
            // Unknown code points are left as written
            match code.and_then(char::from_u32) {
                Some(c) => c.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}
