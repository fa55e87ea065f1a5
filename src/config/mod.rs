//! # Config Module
//!
//! `settings.toml` loading.
//!
//! ```toml
//! [database]
//! baseFolder = "db"
//! fileName = "media.db"
//!
//! [scan]
//! sourceFolders = ["~/Pictures/Import"]
//! includeExtensions = [".jpg", "heic"]
//! followSymlinks = false
//!
//! [target]
//! baseFolder = "~/Pictures/Library"
//! pattern = "{Year}/{Date}/{OriginalName}"
//! ```

use crate::core::scanner::normalize_extension;
use crate::core::tidy::DEFAULT_PATTERN;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_DB_FOLDER: &str = "db";
const DEFAULT_DB_FILE: &str = "media.db";
const DEFAULT_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".heic", ".mp4", ".mov"];

/// Application settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub database: DatabaseConfig,
    pub history: HistoryConfig,
    pub scan: ScanConfig,
    pub target: TargetConfig,
}

/// Where the SQLite file lives
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DatabaseConfig {
    /// Resolved against the settings file's directory when relative
    pub base_folder: String,
    pub file_name: String,
}

/// Previous selections, used when no source folders are configured
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HistoryConfig {
    pub last_source_folder: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScanConfig {
    pub source_folders: Vec<String>,
    pub include_extensions: Vec<String>,
    pub follow_symlinks: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TargetConfig {
    pub base_folder: String,
    pub pattern: String,
}

impl Settings {
    /// Read, default and validate a settings file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;

        let root = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_toml(&content, root)
    }

    /// Parse settings text; relative database folders resolve against `root`
    pub fn from_toml(content: &str, root: &Path) -> Result<Self, ConfigError> {
        let mut settings: Settings = toml::from_str(content)?;
        settings.apply_defaults(root);
        settings.validate()?;
        Ok(settings)
    }

    /// `<config dir>/photo-tidy/settings.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("photo-tidy").join("settings.toml"))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.base_folder.trim().is_empty() {
            return Err(ConfigError::Invalid("database baseFolder is required".into()));
        }
        if self.database.file_name.trim().is_empty() {
            return Err(ConfigError::Invalid("database fileName is required".into()));
        }
        if self.scan.source_folders.is_empty() && self.history.last_source_folder.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one source folder must be configured".into(),
            ));
        }
        Ok(())
    }

    /// Full path of the SQLite file
    pub fn database_path(&self) -> PathBuf {
        Path::new(&self.database.base_folder).join(&self.database.file_name)
    }

    /// Folders to scan: configured sources, else the remembered ones
    pub fn effective_sources(&self) -> Vec<PathBuf> {
        let folders = if self.scan.source_folders.is_empty() {
            &self.history.last_source_folder
        } else {
            &self.scan.source_folders
        };
        folders.iter().map(PathBuf::from).collect()
    }

    /// Lower-case, dot-prefixed extensions; the defaults when none remain
    pub fn normalised_extensions(&self) -> Vec<String> {
        let extensions: Vec<String> = self
            .scan
            .include_extensions
            .iter()
            .filter_map(|ext| normalize_extension(ext))
            .collect();

        if extensions.is_empty() {
            default_extensions()
        } else {
            extensions
        }
    }

    /// Target base folder, `None` when unset
    pub fn target_base(&self) -> Option<PathBuf> {
        let base = self.target.base_folder.trim();
        (!base.is_empty()).then(|| PathBuf::from(base))
    }

    fn apply_defaults(&mut self, root: &Path) {
        if self.database.base_folder.trim().is_empty() {
            self.database.base_folder = DEFAULT_DB_FOLDER.to_string();
        }
        if self.database.file_name.trim().is_empty() {
            self.database.file_name = DEFAULT_DB_FILE.to_string();
        }
        if self.scan.include_extensions.is_empty() {
            self.scan.include_extensions = default_extensions();
        }
        if self.target.pattern.trim().is_empty() {
            self.target.pattern = DEFAULT_PATTERN.to_string();
        }

        let db_base = expand_path(&self.database.base_folder);
        self.database.base_folder = if Path::new(&db_base).is_absolute() {
            db_base
        } else {
            root.join(db_base).to_string_lossy().into_owned()
        };
        self.target.base_folder = expand_path(&self.target.base_folder);
        self.scan.source_folders = expand_paths(&self.scan.source_folders);
        self.history.last_source_folder = expand_paths(&self.history.last_source_folder);
    }
}

fn default_extensions() -> Vec<String> {
    DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect()
}

fn expand_paths(items: &[String]) -> Vec<String> {
    items
        .iter()
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .map(expand_path)
        .collect()
}

/// Replace a leading `~` with the home directory
pub fn expand_path(path: &str) -> String {
    let path = path.trim();
    let Some(rest) = path.strip_prefix('~') else {
        return path.to_string();
    };
    match dirs::home_dir() {
        Some(home) => home
            .join(rest.trim_start_matches(['/', '\\']))
            .to_string_lossy()
            .into_owned(),
        None => path.to_string(),
    }
}
