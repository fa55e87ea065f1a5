//! # Metadata Module
//!
//! Capture metadata supplied to the scanner for each file.
//!
//! ## Extracted Fields
//! - Capture time (DateTimeOriginal, falling back to DateTime)
//! - Camera make
//! - Camera model
//!
//! The scanner only consumes these values. Anything that cannot be read is
//! simply absent; enrichment never fails a file.

use chrono::{DateTime, NaiveDateTime, Utc};
use exif::{In, Reader, Tag, Value};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Optional capture metadata for one file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureMetadata {
    /// Original capture date/time
    pub taken_at: Option<DateTime<Utc>>,
    /// Camera make (e.g., "Apple", "Canon")
    pub camera_make: Option<String>,
    /// Camera model (e.g., "iPhone 15 Pro")
    pub camera_model: Option<String>,
}

impl CaptureMetadata {
    /// Check if any metadata was extracted
    pub fn has_data(&self) -> bool {
        self.taken_at.is_some() || self.camera_make.is_some() || self.camera_model.is_some()
    }
}

/// Supplies capture metadata for a file.
///
/// Implement this trait to plug in a different extractor (or none, for tests).
pub trait MetadataEnricher: Send + Sync {
    fn enrich(&self, path: &Path) -> CaptureMetadata;
}

/// EXIF-backed enricher
#[derive(Debug, Clone, Copy, Default)]
pub struct ExifEnricher;

impl MetadataEnricher for ExifEnricher {
    fn enrich(&self, path: &Path) -> CaptureMetadata {
        extract_metadata(path)
    }
}

/// Enricher that never reports metadata
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMetadata;

impl MetadataEnricher for NoMetadata {
    fn enrich(&self, _path: &Path) -> CaptureMetadata {
        CaptureMetadata::default()
    }
}

/// Extract EXIF capture metadata from a file
pub fn extract_metadata(path: &Path) -> CaptureMetadata {
    let mut metadata = CaptureMetadata::default();

    let file = match File::open(path) {
        Ok(f) => f,
        Err(_) => return metadata,
    };

    let mut bufreader = BufReader::new(&file);
    let exif_reader = match Reader::new().read_from_container(&mut bufreader) {
        Ok(r) => r,
        Err(_) => return metadata,
    };

    metadata.taken_at = [Tag::DateTimeOriginal, Tag::DateTime]
        .iter()
        .filter_map(|tag| exif_reader.get_field(*tag, In::PRIMARY))
        .find_map(|field| get_string_value(&field.value).and_then(|s| parse_exif_datetime(&s)));

    if let Some(field) = exif_reader.get_field(Tag::Make, In::PRIMARY) {
        metadata.camera_make = get_string_value(&field.value);
    }

    if let Some(field) = exif_reader.get_field(Tag::Model, In::PRIMARY) {
        metadata.camera_model = get_string_value(&field.value);
    }

    metadata
}

/// Parse "YYYY:MM:DD HH:MM:SS" (or the dashed variant some writers emit)
fn parse_exif_datetime(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim_matches('"').trim();
    ["%Y:%m:%d %H:%M:%S", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
}

/// Helper to extract string from EXIF ASCII value
fn get_string_value(value: &Value) -> Option<String> {
    if let Value::Ascii(ref vec) = value {
        if let Some(bytes) = vec.first() {
            if let Ok(s) = std::str::from_utf8(bytes) {
                let trimmed = s.trim_end_matches('\0').trim();
                if !trimmed.is_empty() {
                    return Some(trimmed.to_string());
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn metadata_default_has_no_data() {
        assert!(!CaptureMetadata::default().has_data());
    }

    #[test]
    fn parses_colon_separated_exif_date() {
        let dt = parse_exif_datetime("2024:01:15 14:30:00").unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day()), (2024, 1, 15));
        assert_eq!(dt.hour(), 14);
    }

    #[test]
    fn parses_dashed_and_quoted_date() {
        let dt = parse_exif_datetime("\"2023-12-31 23:59:59\"").unwrap();
        assert_eq!(dt.year(), 2023);
    }

    #[test]
    fn rejects_blank_exif_date() {
        assert!(parse_exif_datetime("0000:00:00 00:00:00").is_none());
    }

    #[test]
    fn string_value_trims_nul_padding() {
        let value = Value::Ascii(vec![b"Canon\0\0".to_vec()]);
        assert_eq!(get_string_value(&value), Some("Canon".to_string()));

        let blank = Value::Ascii(vec![b"   \0".to_vec()]);
        assert_eq!(get_string_value(&blank), None);
    }

    #[test]
    fn extract_from_nonexistent_returns_default() {
        let meta = extract_metadata(Path::new("/nonexistent/file.jpg"));
        assert!(!meta.has_data());
    }

    #[test]
    fn no_metadata_enricher_is_empty() {
        assert_eq!(NoMetadata.enrich(Path::new("/a.jpg")), CaptureMetadata::default());
    }
}
