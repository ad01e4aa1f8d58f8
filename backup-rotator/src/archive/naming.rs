//! Deterministic archive naming.
//!
//! Archives are named `{source}_{YYYYMMDD}_{HHMMSS}.tar.gz`, with an optional
//! `-{n}` counter before the suffix when two backups of the same source land
//! in the same second. Because the filename is the only persisted metadata,
//! [`parse_name`] must recover exactly what [`build_name`] encoded.
//!
//! A destination root may contain files the engine does not own; anything
//! that does not match the pattern parses to `None` and is never touched.

use crate::utils::errors::{Result, RotatorError};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

/// Extension shared by every archive the engine owns.
pub const ARCHIVE_SUFFIX: &str = ".tar.gz";

const DATE_FORMAT: &str = "%Y%m%d";
const TIME_FORMAT: &str = "%H%M%S";

/// Filename fields recovered by [`parse_name`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedName {
    pub source_name: String,
    pub created_at: DateTime<Utc>,
    /// Collision counter, if the name carries one (`-1`, `-2`, ...).
    pub sequence: Option<u32>,
}

/// Make a source name safe as a filename component.
///
/// Path separators become `_`. An empty result is rejected before any I/O
/// is attempted.
pub fn sanitize_source_name(raw: &str) -> Result<String> {
    let sanitized: String = raw
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();

    if sanitized.is_empty() {
        return Err(RotatorError::InvalidSourceName(format!(
            "source name {raw:?} is empty after sanitizing"
        )));
    }

    Ok(sanitized)
}

/// Build the archive filename for a source at a point in time.
///
/// Subsecond precision is dropped; the name carries second resolution.
pub fn build_name(source_name: &str, created_at: DateTime<Utc>) -> Result<String> {
    let source = sanitize_source_name(source_name)?;
    Ok(format!(
        "{}_{}_{}{}",
        source,
        created_at.format(DATE_FORMAT),
        created_at.format(TIME_FORMAT),
        ARCHIVE_SUFFIX
    ))
}

/// Re-stamp a filename with a collision counter:
/// `docs_20260807_101530.tar.gz` becomes `docs_20260807_101530-1.tar.gz`.
pub fn with_sequence(filename: &str, sequence: u32) -> String {
    match filename.strip_suffix(ARCHIVE_SUFFIX) {
        Some(stem) => format!("{stem}-{sequence}{ARCHIVE_SUFFIX}"),
        None => format!("{filename}-{sequence}"),
    }
}

/// Parse an archive filename back into its fields.
///
/// Returns `None` for anything that is not
/// `{source}_{8 digits}_{6 digits}[-{n}].tar.gz`; unrelated files in the
/// destination root are ignored, not errors. The date and time segments are
/// fixed width, so source names containing `_` or digit runs parse
/// unambiguously.
pub fn parse_name(filename: &str) -> Option<ParsedName> {
    let stem = filename.strip_suffix(ARCHIVE_SUFFIX)?;

    let (rest, time_part) = stem.rsplit_once('_')?;
    let (source, date_part) = rest.rsplit_once('_')?;
    if source.is_empty() {
        return None;
    }

    let (time_digits, sequence) = match time_part.split_once('-') {
        Some((digits, counter)) => (digits, Some(counter.parse::<u32>().ok()?)),
        None => (time_part, None),
    };

    if date_part.len() != 8 || !date_part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if time_digits.len() != 6 || !time_digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let date = NaiveDate::parse_from_str(date_part, DATE_FORMAT).ok()?;
    let time = NaiveTime::parse_from_str(time_digits, TIME_FORMAT).ok()?;

    Some(ParsedName {
        source_name: source.to_string(),
        created_at: date.and_time(time).and_utc(),
        sequence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn stamp() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 7, 10, 15, 30).unwrap()
    }

    #[test]
    fn build_name_formats_source_and_timestamp() {
        let name = build_name("docs", stamp()).unwrap();
        assert_eq!(name, "docs_20260807_101530.tar.gz");
    }

    #[test]
    fn round_trip_recovers_source_and_timestamp() {
        let name = build_name("docs", stamp()).unwrap();
        let parsed = parse_name(&name).unwrap();
        assert_eq!(parsed.source_name, "docs");
        assert_eq!(parsed.created_at, stamp());
        assert_eq!(parsed.sequence, None);
    }

    #[test]
    fn round_trip_with_underscores_and_digits_in_source() {
        for source in ["my_docs", "db_2024", "a_20260807", "photos_2024_q3"] {
            let name = build_name(source, stamp()).unwrap();
            let parsed = parse_name(&name).unwrap();
            assert_eq!(parsed.source_name, source);
            assert_eq!(parsed.created_at, stamp());
        }
    }

    #[test]
    fn sanitize_replaces_path_separators() {
        assert_eq!(sanitize_source_name("var/www").unwrap(), "var_www");
        assert_eq!(sanitize_source_name("c\\data").unwrap(), "c_data");
    }

    #[test]
    fn sanitize_rejects_empty_source() {
        assert!(matches!(
            sanitize_source_name(""),
            Err(RotatorError::InvalidSourceName(_))
        ));
    }

    #[test]
    fn parse_accepts_collision_counter() {
        let parsed = parse_name("docs_20260807_101530-2.tar.gz").unwrap();
        assert_eq!(parsed.source_name, "docs");
        assert_eq!(parsed.created_at, stamp());
        assert_eq!(parsed.sequence, Some(2));
    }

    #[test]
    fn with_sequence_inserts_counter_before_suffix() {
        assert_eq!(
            with_sequence("docs_20260807_101530.tar.gz", 1),
            "docs_20260807_101530-1.tar.gz"
        );
    }

    #[test]
    fn parse_ignores_unrelated_files() {
        for name in [
            "notes.txt",
            "readme.md",
            "docs.tar.gz",
            "docs_2026_101530.tar.gz",
            "docs_20260807_1015.tar.gz",
            "docs_20260807_101530.zip",
            "_20260807_101530.tar.gz",
            "docs_20260807_101530-x.tar.gz",
        ] {
            assert_eq!(parse_name(name), None, "should not parse {name:?}");
        }
    }

    #[test]
    fn parse_rejects_impossible_dates() {
        assert_eq!(parse_name("docs_20261307_101530.tar.gz"), None);
        assert_eq!(parse_name("docs_20260807_256161.tar.gz"), None);
    }
}
