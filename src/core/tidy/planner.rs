//! Target path generation.
//!
//! A pattern such as `{Date}/{OriginalName}` is rendered against a fixed set
//! of fields, sanitised segment by segment, joined under the target base and
//! then checked to still live under that base before any directory is made.

use crate::core::store::MediaFile;
use crate::error::PlanError;
use regex::Regex;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

/// Attempts at `name-N.ext` before giving up on one file
const MAX_UNIQUE_ATTEMPTS: usize = 999;

/// Characters never allowed in a generated segment
const ILLEGAL_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// `{Field}` or the older `{{.Field}}` form
fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"\{\{\s*\.(\w+)\s*\}\}|\{(\w+)\}").expect("placeholder regex is valid")
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(String),
    Field(String),
}

/// A parsed naming pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamePattern {
    tokens: Vec<Token>,
}

impl NamePattern {
    /// Split a pattern into literal text and placeholders.
    ///
    /// Field names are checked at render time so that a bad pattern fails
    /// each item rather than the whole run.
    pub fn parse(pattern: &str) -> Self {
        let mut tokens = Vec::new();
        let mut last = 0;

        for caps in placeholder_regex().captures_iter(pattern) {
            let Some(whole) = caps.get(0) else { continue };
            if whole.start() > last {
                tokens.push(Token::Literal(pattern[last..whole.start()].to_string()));
            }
            if let Some(name) = caps.get(1).or_else(|| caps.get(2)) {
                tokens.push(Token::Field(name.as_str().to_string()));
            }
            last = whole.end();
        }

        if last < pattern.len() {
            tokens.push(Token::Literal(pattern[last..].to_string()));
        }

        Self { tokens }
    }

    /// Substitute every placeholder
    pub fn render(&self, fields: &PatternFields) -> Result<String, PlanError> {
        let mut out = String::new();
        for token in &self.tokens {
            match token {
                Token::Literal(text) => out.push_str(text),
                Token::Field(name) => {
                    let value = fields.get(name).ok_or_else(|| PlanError::UnknownField {
                        field: name.clone(),
                    })?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }
}

/// Values a pattern can reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternFields {
    /// YYYY-MM-DD of the capture time, or the modification time
    pub date: String,
    pub year: String,
    pub month: String,
    pub day: String,
    pub hash: String,
    pub original_name: String,
    /// Lower-cased, dot-prefixed; empty when the file has none
    pub ext: String,
}

impl PatternFields {
    pub fn from_media(file: &MediaFile) -> Self {
        let when = file.effective_date();
        let original_name = file
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ext = file
            .path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
            .unwrap_or_default();

        Self {
            date: when.format("%Y-%m-%d").to_string(),
            year: when.format("%Y").to_string(),
            month: when.format("%m").to_string(),
            day: when.format("%d").to_string(),
            hash: file.content_hash.clone(),
            original_name,
            ext,
        }
    }

    fn get(&self, name: &str) -> Option<&str> {
        let value = match name {
            "Date" => &self.date,
            "Year" => &self.year,
            "Month" => &self.month,
            "Day" => &self.day,
            "Hash" => &self.hash,
            "OriginalName" => &self.original_name,
            "Ext" => &self.ext,
            _ => return None,
        };
        Some(value)
    }
}

/// Computes where a media file should live under the target base
#[derive(Debug, Clone)]
pub struct PathPlanner {
    base: PathBuf,
    pattern: NamePattern,
    create_dirs: bool,
}

impl PathPlanner {
    pub fn new(base: &Path, pattern: &str) -> Self {
        Self {
            base: normalize(&absolutize(base)),
            pattern: NamePattern::parse(pattern),
            create_dirs: true,
        }
    }

    /// Whether `plan` may create the destination directory (off for dry runs)
    pub fn create_directories(mut self, enabled: bool) -> Self {
        self.create_dirs = enabled;
        self
    }

    /// Normalised absolute base every target must stay under
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Produce the target path for `file`.
    ///
    /// `claimed` holds targets already handed out in this run so that two
    /// files rendering to the same name stay distinct even when nothing has
    /// been written yet. The file's own location never counts as taken.
    pub fn plan(&self, file: &MediaFile, claimed: &HashSet<PathBuf>) -> Result<PathBuf, PlanError> {
        let fields = PatternFields::from_media(file);
        let rendered = self.pattern.render(&fields)?;

        if has_parent_segment(&rendered) {
            return Err(PlanError::PathEscape {
                path: self.base.join(&rendered),
            });
        }

        let mut relative = sanitize_relative(&rendered);
        if relative.as_os_str().is_empty() {
            relative = PathBuf::from(sanitize_segment(&fields.original_name));
        }
        if relative.as_os_str().is_empty() {
            relative = PathBuf::from(format!("{}{}", fields.hash, fields.ext));
        }

        let target = normalize(&self.base.join(relative));
        if target == self.base || !target.starts_with(&self.base) {
            return Err(PlanError::PathEscape { path: target });
        }

        if self.create_dirs {
            if let Some(dir) = target.parent() {
                fs::create_dir_all(dir).map_err(|e| PlanError::CreateDirectory {
                    path: dir.to_path_buf(),
                    source: e,
                })?;
            }
        }

        ensure_unique(&target, &file.path, claimed)
    }
}

/// Find a free name by appending `-1`, `-2`, ... before the extension
fn ensure_unique(
    path: &Path,
    current: &Path,
    claimed: &HashSet<PathBuf>,
) -> Result<PathBuf, PlanError> {
    if !is_taken(path, current, claimed)? {
        return Ok(path.to_path_buf());
    }

    let dir = path.parent().unwrap_or_else(|| Path::new(""));
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    for i in 1..=MAX_UNIQUE_ATTEMPTS {
        let candidate = dir.join(format!("{stem}-{i}{ext}"));
        if !is_taken(&candidate, current, claimed)? {
            return Ok(candidate);
        }
    }

    Err(PlanError::UniqueNameExhausted {
        path: path.to_path_buf(),
    })
}

fn is_taken(path: &Path, current: &Path, claimed: &HashSet<PathBuf>) -> Result<bool, PlanError> {
    if path == current {
        return Ok(false);
    }
    if claimed.contains(path) {
        return Ok(true);
    }
    match fs::symlink_metadata(path) {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(PlanError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

fn has_parent_segment(rendered: &str) -> bool {
    rendered.split(['/', '\\']).any(|s| s.trim() == "..")
}

/// Clean every segment of a rendered pattern and rejoin the non-empty ones
pub fn sanitize_relative(rendered: &str) -> PathBuf {
    rendered
        .split(['/', '\\'])
        .map(sanitize_segment)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Trim whitespace and dots, then drop characters illegal in file names
pub fn sanitize_segment(segment: &str) -> String {
    let trimmed = segment.trim().trim_matches('.');
    let cleaned: String = trimmed.chars().filter(|c| !ILLEGAL_CHARS.contains(c)).collect();
    cleaned.trim().to_string()
}

fn absolutize(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path.to_path_buf(),
    }
}

/// Lexically resolve `.` and `..` without touching the filesystem
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn media(path: &Path) -> MediaFile {
        MediaFile {
            id: 1,
            path: path.to_path_buf(),
            content_hash: "0123456789abcdef0123456789abcdef".to_string(),
            size_bytes: 10,
            mod_time: Utc.with_ymd_and_hms(2023, 5, 6, 7, 8, 9).unwrap(),
            taken_at: Some(Utc.with_ymd_and_hms(2024, 1, 15, 14, 30, 0).unwrap()),
            camera_make: None,
            camera_model: None,
            mime_type: None,
        }
    }

    fn plan(base: &Path, pattern: &str, file: &MediaFile) -> Result<PathBuf, PlanError> {
        PathPlanner::new(base, pattern).plan(file, &HashSet::new())
    }

    #[test]
    fn default_pattern_uses_capture_date() {
        let base = TempDir::new().unwrap();
        let file = media(Path::new("/photos/IMG_0001.JPG"));

        let target = plan(base.path(), "{Date}/{OriginalName}", &file).unwrap();
        assert_eq!(target, base.path().join("2024-01-15").join("IMG_0001.JPG"));
        assert!(base.path().join("2024-01-15").is_dir());
    }

    #[test]
    fn falls_back_to_modification_time() {
        let base = TempDir::new().unwrap();
        let mut file = media(Path::new("/photos/a.jpg"));
        file.taken_at = None;

        let target = plan(base.path(), "{Year}/{Month}/{Day}/{OriginalName}", &file).unwrap();
        assert_eq!(target, base.path().join("2023/05/06/a.jpg"));
    }

    #[test]
    fn renders_hash_and_lowercase_ext() {
        let fields = PatternFields::from_media(&media(Path::new("/photos/Clip.MOV")));
        let rendered = NamePattern::parse("{Hash}{Ext}").render(&fields).unwrap();
        assert_eq!(rendered, "0123456789abcdef0123456789abcdef.mov");
    }

    #[test]
    fn accepts_legacy_placeholder_syntax() {
        let fields = PatternFields::from_media(&media(Path::new("/photos/a.jpg")));
        let rendered = NamePattern::parse("{{.Year}}/{{ .OriginalName }}")
            .render(&fields)
            .unwrap();
        assert_eq!(rendered, "2024/a.jpg");
    }

    #[test]
    fn unknown_field_fails() {
        let fields = PatternFields::from_media(&media(Path::new("/photos/a.jpg")));
        let err = NamePattern::parse("{Camera}/{OriginalName}")
            .render(&fields)
            .unwrap_err();
        assert!(matches!(err, PlanError::UnknownField { field } if field == "Camera"));
    }

    #[test]
    fn parent_segments_are_rejected() {
        let base = TempDir::new().unwrap();
        let file = media(Path::new("/photos/a.jpg"));

        for pattern in ["../{OriginalName}", "{Date}/../../{OriginalName}", "..\\{OriginalName}"] {
            let err = plan(base.path(), pattern, &file).unwrap_err();
            assert!(matches!(err, PlanError::PathEscape { .. }), "{pattern}");
        }
    }

    #[test]
    fn absolute_pattern_stays_under_base() {
        let base = TempDir::new().unwrap();
        let file = media(Path::new("/photos/a.jpg"));

        let target = plan(base.path(), "/etc/{OriginalName}", &file).unwrap();
        assert!(target.starts_with(base.path()));
        assert_eq!(target, base.path().join("etc/a.jpg"));
    }

    #[test]
    fn sanitize_strips_illegal_characters() {
        assert_eq!(sanitize_segment("  what?<is>:this*  "), "whatisthis");
        assert_eq!(sanitize_segment("...hidden."), "hidden");
        assert_eq!(sanitize_segment(" . "), "");
    }

    #[test]
    fn sanitize_relative_drops_empty_segments() {
        assert_eq!(sanitize_relative("a//b\\ c /"), PathBuf::from("a/b/c"));
        assert_eq!(sanitize_relative("/ / "), PathBuf::new());
    }

    #[test]
    fn empty_render_falls_back_to_original_name() {
        let base = TempDir::new().unwrap();
        let file = media(Path::new("/photos/a.jpg"));

        let target = plan(base.path(), "  /  ", &file).unwrap();
        assert_eq!(target, base.path().join("a.jpg"));
    }

    #[test]
    fn existing_target_gets_numeric_suffix() {
        let base = TempDir::new().unwrap();
        fs::write(base.path().join("a.jpg"), b"x").unwrap();
        fs::write(base.path().join("a-1.jpg"), b"x").unwrap();
        let file = media(Path::new("/photos/a.jpg"));

        let target = plan(base.path(), "{OriginalName}", &file).unwrap();
        assert_eq!(target, base.path().join("a-2.jpg"));
    }

    #[test]
    fn claimed_targets_count_as_taken() {
        let base = TempDir::new().unwrap();
        let file = media(Path::new("/photos/a.jpg"));
        let planner = PathPlanner::new(base.path(), "{OriginalName}").create_directories(false);

        let mut claimed = HashSet::new();
        let first = planner.plan(&file, &claimed).unwrap();
        claimed.insert(first.clone());
        let second = planner.plan(&file, &claimed).unwrap();

        assert_eq!(first, base.path().join("a.jpg"));
        assert_eq!(second, base.path().join("a-1.jpg"));
    }

    #[test]
    fn file_already_in_place_keeps_its_path() {
        let base = TempDir::new().unwrap();
        let current = base.path().join("2024-01-15").join("a.jpg");
        fs::create_dir_all(current.parent().unwrap()).unwrap();
        fs::write(&current, b"x").unwrap();

        let target = plan(base.path(), "{Date}/{OriginalName}", &media(&current)).unwrap();
        assert_eq!(target, current);
    }

    #[test]
    fn suffix_search_is_bounded() {
        let file = media(Path::new("/photos/a.jpg"));
        let base = PathBuf::from("/library");
        let mut claimed: HashSet<PathBuf> = (1..=MAX_UNIQUE_ATTEMPTS)
            .map(|i| base.join(format!("a-{i}.jpg")))
            .collect();
        claimed.insert(base.join("a.jpg"));

        let err = PathPlanner::new(&base, "{OriginalName}")
            .create_directories(false)
            .plan(&file, &claimed)
            .unwrap_err();
        assert!(matches!(err, PlanError::UniqueNameExhausted { .. }));
    }

    #[test]
    fn dry_planner_creates_nothing() {
        let base = TempDir::new().unwrap();
        let file = media(Path::new("/photos/a.jpg"));

        PathPlanner::new(base.path(), "{Date}/{OriginalName}")
            .create_directories(false)
            .plan(&file, &HashSet::new())
            .unwrap();
        assert!(!base.path().join("2024-01-15").exists());
    }

    #[test]
    fn normalize_resolves_dots() {
        assert_eq!(normalize(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
    }
}
