//! # CLI Module
//!
//! Command-line interface for photo-tidy.
//!
//! ## Usage
//! ```bash
//! # Scan the configured source folders
//! photo-tidy scan
//!
//! # List duplicate groups as JSON
//! photo-tidy duplicates --output json
//!
//! # Preview, then move two files into the library
//! photo-tidy tidy 12 15 --dry-run
//! photo-tidy tidy 12 15
//!
//! # Show moves left pending by an interrupted run
//! photo-tidy pending
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use photo_tidy::config::Settings;
use photo_tidy::core::store::{DuplicateGroup, FileAction};
use photo_tidy::core::tidy::MoveRequest;
use photo_tidy::error::{ConfigError, Result};
use photo_tidy::events::{
    CancellationToken, Event, EventChannel, EventReceiver, ScanEvent, ScanSummary, TidyEvent,
    TidyStatus, TidySummary,
};
use photo_tidy::AppContext;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Photo Tidy - find duplicates and file photos by date
#[derive(Parser, Debug)]
#[command(name = "photo-tidy")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Settings file (defaults to the user config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan the configured source folders into the library database
    Scan {
        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,
    },

    /// List groups of files with identical content
    Duplicates {
        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,
    },

    /// Move media files into the target layout
    Tidy {
        /// Media ids to move (see `duplicates`)
        #[arg(required = true)]
        ids: Vec<i64>,

        /// Plan only; touch neither files nor the ledger
        #[arg(long)]
        dry_run: bool,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,
    },

    /// List moves that were recorded but never finished
    Pending {
        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
}

impl OutputFormat {
    fn is_pretty(self) -> bool {
        matches!(self, OutputFormat::Pretty)
    }
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let settings_path = match cli.config {
        Some(path) => path,
        None => Settings::default_path().ok_or_else(|| {
            ConfigError::Invalid("could not determine the user config directory".into())
        })?,
    };
    let ctx = AppContext::open(settings_path)?;

    match cli.command {
        Commands::Scan { output } => run_scan(&ctx, output),
        Commands::Duplicates { output } => run_duplicates(&ctx, output),
        Commands::Tidy {
            ids,
            dry_run,
            output,
        } => run_tidy(&ctx, ids, dry_run, output),
        Commands::Pending { output } => run_pending(&ctx, output),
    }
}

fn run_scan(ctx: &AppContext, output: OutputFormat) -> Result<()> {
    let term = Term::stderr();
    if output.is_pretty() {
        print_header(&term);
    }

    let (sender, receiver) = EventChannel::new();
    let progress = output.is_pretty().then(spinner);
    let event_thread = spawn_scan_listener(receiver, progress.clone());

    let summary = ctx.run_scan(&CancellationToken::new(), &sender);

    // Drop sender to signal event thread to finish
    drop(sender);
    event_thread.join().ok();
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    let summary = summary?;
    match output {
        OutputFormat::Pretty => print_scan_summary(&term, &summary),
        OutputFormat::Json => print_json(&summary),
    }
    Ok(())
}

fn spawn_scan_listener(receiver: EventReceiver, progress: Option<ProgressBar>) -> JoinHandle<()> {
    thread::spawn(move || {
        for event in receiver.iter() {
            let Some(pb) = progress.as_ref() else { continue };
            match event {
                Event::Scan(ScanEvent::Progress(p)) => {
                    pb.set_position(p.files_persisted as u64);
                    pb.set_message(file_name(&p.path));
                }
                Event::Scan(ScanEvent::Error { message, .. }) => {
                    pb.println(format!("  {} {}", style("!").yellow(), message));
                }
                _ => {}
            }
        }
    })
}

fn run_duplicates(ctx: &AppContext, output: OutputFormat) -> Result<()> {
    let groups = ctx.list_duplicate_groups()?;
    match output {
        OutputFormat::Pretty => print_groups(&Term::stdout(), &groups),
        OutputFormat::Json => print_json(&groups),
    }
    Ok(())
}

fn run_tidy(ctx: &AppContext, ids: Vec<i64>, dry_run: bool, output: OutputFormat) -> Result<()> {
    let term = Term::stderr();
    if output.is_pretty() {
        print_header(&term);
    }

    let requests: Vec<MoveRequest> = ids.into_iter().map(MoveRequest::from).collect();
    let (sender, receiver) = EventChannel::new();
    let progress = output.is_pretty().then(|| bar(requests.len() as u64));
    let event_thread = spawn_tidy_listener(receiver, progress.clone());

    let summary = ctx.execute_tidy(&requests, dry_run, &CancellationToken::new(), &sender);

    drop(sender);
    event_thread.join().ok();
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    let summary = summary?;
    match output {
        OutputFormat::Pretty => print_tidy_summary(&term, &summary),
        OutputFormat::Json => print_json(&summary),
    }
    Ok(())
}

fn spawn_tidy_listener(receiver: EventReceiver, progress: Option<ProgressBar>) -> JoinHandle<()> {
    thread::spawn(move || {
        for event in receiver.iter() {
            let Event::Tidy(TidyEvent::Progress(p)) = event else {
                continue;
            };
            let Some(pb) = progress.as_ref() else { continue };

            pb.set_position(p.completed as u64);
            let marker = match p.status {
                TidyStatus::Moved | TidyStatus::Planned => style("→").green(),
                TidyStatus::Skipped => style("=").dim(),
                TidyStatus::Missing | TidyStatus::Failed => style("✗").red(),
            };
            let from = p
                .source
                .as_deref()
                .map(display_path)
                .unwrap_or_else(|| format!("#{}", p.media_id));
            let line = match (&p.target, &p.error) {
                (_, Some(error)) => format!("  {} {} {}", marker, from, style(error).red()),
                (Some(target), None) => {
                    format!("  {} {} {}", marker, from, style(display_path(target)).dim())
                }
                (None, None) => format!("  {} {}", marker, from),
            };
            pb.println(line);
        }
    })
}

fn run_pending(ctx: &AppContext, output: OutputFormat) -> Result<()> {
    let actions = ctx.pending_actions()?;
    match output {
        OutputFormat::Pretty => print_pending(&Term::stdout(), &actions),
        OutputFormat::Json => print_json(&actions),
    }
    Ok(())
}

fn print_header(term: &Term) {
    term.write_line(&format!(
        "{} {}",
        style("Photo Tidy").bold().cyan(),
        style(concat!("v", env!("CARGO_PKG_VERSION"))).dim()
    ))
    .ok();
    term.write_line("").ok();
}

fn spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {pos} files {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░"),
    );
    pb
}

fn print_scan_summary(term: &Term, summary: &ScanSummary) {
    term.write_line("").ok();
    let headline = if summary.cancelled {
        format!("{} Scan Cancelled", style("!").yellow().bold())
    } else {
        format!("{} Scan Complete", style("✓").green().bold())
    };
    term.write_line(&headline).ok();
    term.write_line("").ok();

    term.write_line(&format!(
        "  {} files found, {} recorded in {:.1}s",
        style(summary.files_discovered).cyan(),
        style(summary.files_persisted).cyan(),
        summary.duration_ms as f64 / 1000.0
    ))
    .ok();
    term.write_line(&format!(
        "  {} files skipped",
        style(summary.files_skipped).dim()
    ))
    .ok();
    term.write_line(&format!(
        "  {} duplicate groups",
        style(summary.duplicate_groups).yellow()
    ))
    .ok();

    if !summary.errors.is_empty() {
        term.write_line(&format!(
            "  {} errors",
            style(summary.errors.len()).red()
        ))
        .ok();
    }
}

fn print_groups(term: &Term, groups: &[DuplicateGroup]) {
    if groups.is_empty() {
        term.write_line(&format!("  {} No duplicates found", style("✓").green()))
            .ok();
        return;
    }

    let savings: u64 = groups.iter().map(|g| g.redundant_bytes()).sum();
    term.write_line(&format!(
        "{} duplicate groups, {} reclaimable",
        style(groups.len()).cyan(),
        style(format_bytes(savings)).yellow()
    ))
    .ok();
    term.write_line("").ok();

    for (i, group) in groups.iter().enumerate() {
        term.write_line(&format!(
            "  {} {} ({} files, {})",
            style(format!("Group {}:", i + 1)).bold(),
            style(&group.hash[..group.hash.len().min(12)]).dim(),
            group.files.len(),
            format_bytes(group.redundant_bytes())
        ))
        .ok();

        for (idx, file) in group.files.iter().enumerate() {
            let marker = if idx == 0 {
                style("★").green().to_string()
            } else {
                style("○").dim().to_string()
            };
            term.write_line(&format!(
                "    {} {:>6}  {}",
                marker,
                file.id,
                display_path(&file.path)
            ))
            .ok();
        }
        term.write_line("").ok();
    }

    term.write_line(&format!(
        "{}",
        style("Nothing was moved or deleted. Pass ids to `tidy` to file them away.").dim()
    ))
    .ok();
}

fn print_tidy_summary(term: &Term, summary: &TidySummary) {
    term.write_line("").ok();
    let headline = match (summary.cancelled, summary.dry_run) {
        (true, _) => format!("{} Tidy Cancelled", style("!").yellow().bold()),
        (false, true) => format!("{} Dry Run Complete", style("✓").green().bold()),
        (false, false) => format!("{} Tidy Complete", style("✓").green().bold()),
    };
    term.write_line(&headline).ok();
    term.write_line("").ok();

    let verb = if summary.dry_run { "planned" } else { "moved" };
    term.write_line(&format!(
        "  {} {} into {}",
        style(summary.moved).cyan(),
        verb,
        display_path(&summary.target_base)
    ))
    .ok();
    term.write_line(&format!("  {} skipped", style(summary.skipped).dim()))
        .ok();
    term.write_line(&format!("  {} failed", style(summary.failed).red()))
        .ok();
    term.write_line(&format!(
        "  run {} in {:.1}s",
        style(&summary.run_id).dim(),
        summary.duration_ms as f64 / 1000.0
    ))
    .ok();
}

fn print_pending(term: &Term, actions: &[FileAction]) {
    if actions.is_empty() {
        term.write_line(&format!("  {} No interrupted moves", style("✓").green()))
            .ok();
        return;
    }

    term.write_line(&format!(
        "{} moves were recorded but never finished:",
        style(actions.len()).yellow()
    ))
    .ok();
    for action in actions {
        term.write_line(&format!(
            "  {:>6}  {}  {} → {}",
            action.id,
            style(action.created_at.format("%Y-%m-%d %H:%M:%S")).dim(),
            display_path(&action.source_path),
            display_path(&action.target_path)
        ))
        .ok();
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("failed to encode JSON: {}", e),
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .into_owned()
}

/// Shorten paths under the home directory to `~/...`
fn display_path(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(rest) = path.strip_prefix(&home) {
            return format!("~/{}", rest.display());
        }
    }
    path.display().to_string()
}

fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
