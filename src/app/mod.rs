//! # App Module
//!
//! Application context shared by front-ends.
//!
//! An [`AppContext`] owns the loaded settings and the open store as one
//! session. Front-ends construct it once and pass it by reference; `reload`
//! swaps in a freshly built session without disturbing runs that already
//! hold the old one.

use crate::config::Settings;
use crate::core::scanner::{ScanOptions, Scanner};
use crate::core::store::{DuplicateGroup, FileAction, Store};
use crate::core::tidy::{MoveRequest, TidyExecutor, TidyOptions};
use crate::error::{PhotoTidyError, Result, TidyError};
use crate::events::{CancellationToken, EventSender, ScanSummary, TidySummary};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tracing::info;

/// Settings and the store they point at
#[derive(Debug)]
pub struct Session {
    pub settings: Settings,
    pub store: Arc<Store>,
}

impl Session {
    fn load(settings_path: &Path) -> Result<Self> {
        let settings = Settings::load(settings_path)?;
        let store = Store::open(&settings.database_path())?;
        Ok(Self {
            settings,
            store: Arc::new(store),
        })
    }

    /// Scan inputs derived from the settings
    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            sources: self.settings.effective_sources(),
            extensions: self.settings.normalised_extensions(),
            follow_symlinks: self.settings.scan.follow_symlinks,
        }
    }

    /// Tidy inputs derived from the settings
    pub fn tidy_options(&self, dry_run: bool) -> std::result::Result<TidyOptions, TidyError> {
        let base = self
            .settings
            .target_base()
            .ok_or(TidyError::TargetBaseNotSet)?;
        Ok(TidyOptions::new(base)
            .with_pattern(self.settings.target.pattern.clone())
            .dry_run(dry_run))
    }
}

/// Clears the running flag when a scan or tidy run ends
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Long-lived application state
#[derive(Debug)]
pub struct AppContext {
    settings_path: PathBuf,
    session: RwLock<Arc<Session>>,
    running: AtomicBool,
}

impl AppContext {
    /// Load settings and open the store they name
    pub fn open(settings_path: impl Into<PathBuf>) -> Result<Self> {
        let settings_path = settings_path.into();
        let session = Session::load(&settings_path)?;
        info!(
            settings = %settings_path.display(),
            database = %session.store.path().display(),
            "context opened"
        );

        Ok(Self {
            settings_path,
            session: RwLock::new(Arc::new(session)),
            running: AtomicBool::new(false),
        })
    }

    pub fn settings_path(&self) -> &Path {
        &self.settings_path
    }

    /// Current session; runs keep theirs alive across a reload
    pub fn session(&self) -> Arc<Session> {
        let guard = self.session.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    pub fn settings(&self) -> Settings {
        self.session().settings.clone()
    }

    /// Re-read the settings file and reopen the store.
    ///
    /// The new session is built completely before it replaces the old one,
    /// so a failed reload leaves the previous settings in effect.
    pub fn reload(&self) -> Result<Settings> {
        let fresh = Arc::new(Session::load(&self.settings_path)?);
        let settings = fresh.settings.clone();

        let mut guard = self.session.write().unwrap_or_else(|e| e.into_inner());
        *guard = fresh;
        info!(settings = %self.settings_path.display(), "settings reloaded");

        Ok(settings)
    }

    /// Whether a scan or tidy run is in progress
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Scan the configured sources
    pub fn run_scan(
        &self,
        cancel: &CancellationToken,
        events: &EventSender,
    ) -> Result<ScanSummary> {
        let _guard = self.begin_run()?;
        let session = self.session();

        let scanner = Scanner::new(Arc::clone(&session.store));
        Ok(scanner.scan(&session.scan_options(), cancel, events))
    }

    /// Tidy the given media files into the configured target layout
    pub fn execute_tidy(
        &self,
        requests: &[MoveRequest],
        dry_run: bool,
        cancel: &CancellationToken,
        events: &EventSender,
    ) -> Result<TidySummary> {
        let _guard = self.begin_run()?;
        let session = self.session();

        let options = session.tidy_options(dry_run)?;
        let executor = TidyExecutor::new(Arc::clone(&session.store));
        Ok(executor.execute(&options, requests, cancel, events)?)
    }

    pub fn list_duplicate_groups(&self) -> Result<Vec<DuplicateGroup>> {
        Ok(self.session().store.list_duplicate_groups()?)
    }

    /// Ledger rows left pending by an interrupted run
    pub fn pending_actions(&self) -> Result<Vec<FileAction>> {
        Ok(self.session().store.list_pending_actions()?)
    }

    /// Most recent ledger rows, newest first
    pub fn recent_actions(&self, limit: usize) -> Result<Vec<FileAction>> {
        Ok(self.session().store.list_recent_actions(limit)?)
    }

    fn begin_run(&self) -> Result<RunGuard<'_>> {
        self.running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| PhotoTidyError::Busy)?;
        Ok(RunGuard(&self.running))
    }
}
