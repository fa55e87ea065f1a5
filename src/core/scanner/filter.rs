//! Extension allow-list for the scanner.

use std::collections::HashSet;
use std::path::Path;

/// Accepts files whose lower-cased extension is on the allow-list.
///
/// An empty list accepts every file.
#[derive(Debug, Clone, Default)]
pub struct ExtensionFilter {
    extensions: HashSet<String>,
}

impl ExtensionFilter {
    /// Build a filter from raw entries such as `"JPG"`, `".heic"` or `" png "`
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .filter_map(|e| normalize_extension(e.as_ref()))
                .collect(),
        }
    }

    /// Filter that accepts everything
    pub fn accept_all() -> Self {
        Self::default()
    }

    pub fn accepts_all(&self) -> bool {
        self.extensions.is_empty()
    }

    /// Check if a file should be included
    pub fn should_include(&self, path: &Path) -> bool {
        if self.accepts_all() {
            return true;
        }
        self.extensions.contains(&dotted_extension(path))
    }
}

/// Lower-case, dot-prefixed form of an allow-list entry; blank entries are dropped
pub fn normalize_extension(raw: &str) -> Option<String> {
    let ext = raw.trim().to_lowercase();
    if ext.is_empty() || ext == "." {
        return None;
    }
    if ext.starts_with('.') {
        Some(ext)
    } else {
        Some(format!(".{ext}"))
    }
}

/// `".jpg"` for `IMG.JPG`, empty for files without an extension
pub fn dotted_extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_entries() {
        assert_eq!(normalize_extension("JPG"), Some(".jpg".to_string()));
        assert_eq!(normalize_extension(" .HeIc "), Some(".heic".to_string()));
        assert_eq!(normalize_extension("   "), None);
        assert_eq!(normalize_extension("."), None);
    }

    #[test]
    fn filter_matches_case_insensitively() {
        let filter = ExtensionFilter::new(["jpg", ".mp4"]);
        assert!(filter.should_include(Path::new("/photos/image.JPG")));
        assert!(filter.should_include(Path::new("/photos/clip.Mp4")));
        assert!(!filter.should_include(Path::new("/photos/document.pdf")));
    }

    #[test]
    fn filter_rejects_missing_extension_when_restricted() {
        let filter = ExtensionFilter::new(["jpg"]);
        assert!(!filter.should_include(Path::new("/photos/no_extension")));
    }

    #[test]
    fn empty_filter_accepts_everything() {
        let filter = ExtensionFilter::new(Vec::<String>::new());
        assert!(filter.accepts_all());
        assert!(filter.should_include(Path::new("/photos/document.pdf")));
        assert!(filter.should_include(Path::new("/photos/no_extension")));
    }

    #[test]
    fn blank_entries_do_not_restrict() {
        let filter = ExtensionFilter::new(["", "  "]);
        assert!(filter.accepts_all());
    }
}
