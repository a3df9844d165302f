// Recording identifiers
//
// A recording's string_id is its source file name without the extension,
// e.g. `2016-07-13_a_kazan`. The first segment is the session date and the
// second is a sequence letter telling apart recordings made the same day.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

static DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:(?P<y1>\d{4})-(?P<m1>\d{2})-(?P<d1>\d{2})|(?P<y2>\d{4})(?P<m2>\d{2})(?P<d2>\d{2})|(?P<d3>\d{2})\.(?P<m3>\d{2})\.(?P<y3>\d{4}))$",
    )
    .expect("Invalid regex")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringId {
    pub raw: String,
    /// Parsed from the first segment when it is a date
    pub date: Option<NaiveDate>,
    /// Second segment when it is alphabetic
    pub letter: Option<String>,
}

impl StringId {
    /// Split a string_id into its parts. Returns `None` for a blank id.
    pub fn parse(raw: &str) -> Option<StringId> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        let mut segments = raw.split('_');
        let date = segments.next().and_then(parse_date);
        let letter = segments
            .next()
            .filter(|s| !s.is_empty() && s.chars().all(char::is_alphabetic))
            .map(str::to_string);

        Some(StringId {
            raw: raw.to_string(),
            date,
            letter,
        })
    }

    /// First two `_`-separated segments, the key shared by same-session recordings
    pub fn date_and_letter(&self) -> Option<String> {
        let mut segments = self.raw.splitn(3, '_');
        match (segments.next(), segments.next()) {
            (Some(first), Some(second)) => Some(format!("{}_{}", first, second)),
            _ => None,
        }
    }
}

impl fmt::Display for StringId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// `YYYY-MM-DD`, `YYYYMMDD` or `DD.MM.YYYY`
fn parse_date(segment: &str) -> Option<NaiveDate> {
    let caps = DATE_RE.captures(segment)?;
    let part = |names: [&str; 3]| names.iter().find_map(|n| caps.name(n)).map(|m| m.as_str());

    let year = part(["y1", "y2", "y3"])?.parse().ok()?;
    let month = part(["m1", "m2", "m3"])?.parse().ok()?;
    let day = part(["d1", "d2", "d3"])?.parse().ok()?;

    NaiveDate::from_ymd_opt(year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_iso_date_and_letter() {
        let id = StringId::parse("2016-07-13_a_kazan").unwrap();
        assert_eq!(id.date, NaiveDate::from_ymd_opt(2016, 7, 13));
        assert_eq!(id.letter.as_deref(), Some("a"));
        assert_eq!(id.date_and_letter().as_deref(), Some("2016-07-13_a"));
    }

    #[test]
    fn test_parse_other_date_formats() {
        let compact = StringId::parse("20160713_b").unwrap();
        assert_eq!(compact.date, NaiveDate::from_ymd_opt(2016, 7, 13));

        let dotted = StringId::parse("13.07.2016_c_interview").unwrap();
        assert_eq!(dotted.date, NaiveDate::from_ymd_opt(2016, 7, 13));
        assert_eq!(dotted.letter.as_deref(), Some("c"));
    }

    #[test]
    fn test_parse_without_date() {
        let id = StringId::parse("kazan_song").unwrap();
        assert!(id.date.is_none());
        assert_eq!(id.letter.as_deref(), Some("song"));

        // Month 13 does not exist
        assert!(StringId::parse("2016-13-01_a").unwrap().date.is_none());
        assert!(StringId::parse("2016-07-13_12").unwrap().letter.is_none());
    }

    #[test]
    fn test_single_segment_has_no_key() {
        let id = StringId::parse("2016-07-13").unwrap();
        assert!(id.date.is_some());
        assert!(id.letter.is_none());
        assert!(id.date_and_letter().is_none());
    }

    #[test]
    fn test_blank_is_none() {
        assert!(StringId::parse("").is_none());
        assert!(StringId::parse("   ").is_none());
    }
}
