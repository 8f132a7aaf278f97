use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::info;
use std::fmt;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::types::{SkipReason, SwapStrategy};

/// Pipeline phases reported as they start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Scanning,
    Staging,
    Recording,
    Swapping,
    Complete,
}

/// Something the user should see a line about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// The pipeline entered a new phase
    Phase(Phase),
    /// Source directory being ingested
    SourceDir(PathBuf),
    /// Leftover staging or backup directory removed before use
    StaleRemoved(PathBuf),
    /// No regular files under the source directory
    NoFiles(PathBuf),
    /// Staging is about to copy `total` scanned files
    StagingStarted { total: usize },
    /// One scanned file was handled by staging
    FileStaged,
    /// A file was left out
    Skipped { name: String, reason: SkipReason },
    /// A staged file replaced an earlier one with the same base name
    Overwriting { name: String },
    /// Nothing eligible; the source directory will end up empty
    NoImages,
    /// Existing records are being dropped
    Clearing { collection: String },
    /// Records are appended to what is already there
    Appending { collection: String },
    /// Records were written
    Inserted { count: usize, collection: String },
    /// Strategy chosen for the directory swap
    SwapStrategy(SwapStrategy),
    /// Rename swap fell back to moving contents
    ContentCopyFallback,
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Phase(Phase::Scanning) => write!(f, "Scanning source directory..."),
            Self::Phase(Phase::Staging) => write!(f, "Staging image files..."),
            Self::Phase(Phase::Recording) => write!(f, "Recording photo metadata..."),
            Self::Phase(Phase::Swapping) => write!(f, "Replacing source directory..."),
            Self::Phase(Phase::Complete) => write!(f, "Ingest complete."),
            Self::SourceDir(path) => write!(f, "PHOTOS_DIR: {}", path.display()),
            Self::StaleRemoved(path) => {
                write!(f, "Cleaning existing directory: {}", path.display())
            }
            Self::NoFiles(path) => write!(f, "No files found in {}", path.display()),
            Self::StagingStarted { total } => write!(f, "Staging {} files", total),
            Self::FileStaged => write!(f, "Staged file"),
            Self::Skipped { name, reason } => write!(f, "Skipping {}: {}", reason, name),
            Self::Overwriting { name } => write!(f, "Overwriting existing file: {}", name),
            Self::NoImages => write!(
                f,
                "No image files found; PHOTOS_DIR will be replaced with an empty folder."
            ),
            Self::Clearing { collection } => write!(f, "Dropping collection: {}", collection),
            Self::Appending { collection } => write!(f, "Appending to collection: {}", collection),
            Self::Inserted { count, collection } => {
                write!(f, "Inserted {} photos into {}.", count, collection)
            }
            Self::SwapStrategy(strategy) => write!(f, "Swapping directories ({})", strategy),
            Self::ContentCopyFallback => {
                write!(f, "Rename not possible here; moving files into place instead")
            }
        }
    }
}

/// Receives pipeline progress
pub trait ProgressReporter {
    fn report(&self, event: ProgressEvent);
}

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Keeps every event, for inspecting a run after the fact.
///
/// A test double for [`ProgressReporter`]; callers embedding the pipeline
/// can also use it to collect a run's messages instead of printing them.
#[derive(Debug, Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events reported so far
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl ProgressReporter for RecordingProgress {
    fn report(&self, event: ProgressEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

/// Prints one line per event and shows a bar while files are staged
pub struct ConsoleProgress {
    bar: Mutex<Option<ProgressBar>>,
    draw_bar: bool,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
            draw_bar: true,
        }
    }

    /// Plain lines only, for non-terminal output
    pub fn without_bar() -> Self {
        Self {
            bar: Mutex::new(None),
            draw_bar: false,
        }
    }

    fn start_bar(&self, total: usize) {
        let bar = ProgressBar::new(total as u64);
        if self.draw_bar {
            if let Ok(style) = ProgressStyle::default_bar()
                .template("{wide_bar} {pos}/{len} ({percent}%) | {msg}")
            {
                bar.set_style(style.progress_chars("█▓▒░ "));
            }
            bar.set_message("Copying...");
        } else {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        }
        if let Ok(mut slot) = self.bar.lock() {
            *slot = Some(bar);
        }
    }

    fn finish_bar(&self) {
        if let Ok(mut slot) = self.bar.lock() {
            if let Some(bar) = slot.take() {
                bar.finish_and_clear();
            }
        }
    }

    fn line(&self, text: String) {
        info!("{}", text);
        match self.bar.lock().ok().as_ref().and_then(|slot| slot.as_ref()) {
            Some(bar) if self.draw_bar => bar.println(text),
            _ => println!("{}", text),
        }
    }
}

impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for ConsoleProgress {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::StagingStarted { total } => self.start_bar(total),
            ProgressEvent::FileStaged => {
                if let Some(bar) = self.bar.lock().ok().as_ref().and_then(|slot| slot.as_ref()) {
                    bar.inc(1);
                }
            }
            ProgressEvent::Phase(Phase::Recording) => {
                self.finish_bar();
                self.line(event.to_string());
            }
            other => self.line(other.to_string()),
        }
    }
}
