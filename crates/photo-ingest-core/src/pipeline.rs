use log::{info, warn};
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::decision::ClearDecision;
use crate::discovery::FileScanner;
use crate::error::{Error, Result};
use crate::fs_ops::{FileSystem, OsFileSystem};
use crate::logging::log_file_error;
use crate::progress::{Phase, ProgressEvent, ProgressReporter};
use crate::staging::StagingBuilder;
use crate::store::RecordStore;
use crate::swap::DirectorySwapper;
use crate::types::{IngestReport, SourceEntry};

/// Scan, stage, record, then swap the staged files into the source directory.
///
/// Nothing in the source directory changes until the swap begins. A failure
/// while scanning, staging or writing records removes staging and returns the
/// error with the source untouched. The records are written before the swap,
/// so a swap failure after a successful insert leaves records that do not
/// match the directory.
pub struct IngestPipeline<'a, S, D, F = OsFileSystem>
where
    S: RecordStore,
    D: ClearDecision,
    F: FileSystem,
{
    source_dir: PathBuf,
    store: S,
    decision: D,
    progress: &'a dyn ProgressReporter,
    fs: F,
}

impl<'a, S, D> IngestPipeline<'a, S, D, OsFileSystem>
where
    S: RecordStore,
    D: ClearDecision,
{
    /// Build a pipeline for the source directory named in `config`
    pub fn new(config: &Config, store: S, decision: D, progress: &'a dyn ProgressReporter) -> Self {
        Self {
            source_dir: config.source_dir.clone(),
            store,
            decision,
            progress,
            fs: OsFileSystem,
        }
    }
}

impl<'a, S, D, F> IngestPipeline<'a, S, D, F>
where
    S: RecordStore,
    D: ClearDecision,
    F: FileSystem,
{
    /// Swap through a different filesystem implementation
    pub fn with_fs<G: FileSystem>(self, fs: G) -> IngestPipeline<'a, S, D, G> {
        IngestPipeline {
            source_dir: self.source_dir,
            store: self.store,
            decision: self.decision,
            progress: self.progress,
            fs,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Run the full ingest
    pub fn run(&mut self) -> Result<IngestReport> {
        let Self {
            source_dir,
            store,
            decision,
            progress,
            fs,
        } = self;
        let progress: &dyn ProgressReporter = *progress;

        if !source_dir.is_dir() {
            return Err(Error::FileNotFound(source_dir.clone()));
        }
        let mut swapper = DirectorySwapper::with_fs(source_dir, &*fs)?;
        let source = swapper.plan().source.clone();
        progress.report(ProgressEvent::SourceDir(source.clone()));

        if swapper.remove_stale_staging()? {
            progress.report(ProgressEvent::StaleRemoved(swapper.plan().staging.clone()));
        }

        progress.report(ProgressEvent::Phase(Phase::Scanning));
        let entries = FileScanner::new(&source)?.collect()?;
        let mut report = IngestReport {
            files_scanned: entries.len(),
            ..Default::default()
        };
        info!("Found {} files in {}", entries.len(), source.display());

        if entries.is_empty() {
            progress.report(ProgressEvent::NoFiles(source));
            progress.report(ProgressEvent::Phase(Phase::Complete));
            return Ok(report);
        }

        let staging = swapper.create_staging()?;
        let staged = stage_and_record(
            &source, &staging, entries, store, decision, progress, &mut report,
        );
        if let Err(e) = staged {
            warn!("Ingest aborted before swap: {}", e);
            if let Err(cleanup) = swapper.discard_staging() {
                log_file_error(&staging, "discard staging", &cleanup);
            }
            return Err(e);
        }

        progress.report(ProgressEvent::Phase(Phase::Swapping));
        progress.report(ProgressEvent::SwapStrategy(swapper.plan().strategy));
        let outcome = swapper.commit()?;
        if outcome.removed_stale_backup {
            progress.report(ProgressEvent::StaleRemoved(swapper.plan().backup.clone()));
        }
        if outcome.used_content_copy {
            progress.report(ProgressEvent::ContentCopyFallback);
        }
        report.strategy = Some(outcome.strategy);
        report.used_content_copy = outcome.used_content_copy;

        progress.report(ProgressEvent::Phase(Phase::Complete));
        info!("Ingest complete: {:?}", report);
        Ok(report)
    }
}

fn stage_and_record<S: RecordStore, D: ClearDecision>(
    source: &Path,
    staging: &Path,
    entries: Vec<SourceEntry>,
    store: &mut S,
    decision: &mut D,
    progress: &dyn ProgressReporter,
    report: &mut IngestReport,
) -> Result<()> {
    progress.report(ProgressEvent::Phase(Phase::Staging));
    progress.report(ProgressEvent::StagingStarted {
        total: entries.len(),
    });
    let staged = StagingBuilder::new(source, staging, progress)?
        .build(entries.into_iter().map(Ok))?;
    report.files_skipped = staged.skipped;
    report.names_overwritten = staged.overwritten;

    if staged.records.is_empty() {
        progress.report(ProgressEvent::NoImages);
    }

    progress.report(ProgressEvent::Phase(Phase::Recording));
    let clear = decision.should_clear()?;
    let collection = store.collection().to_string();
    if clear {
        progress.report(ProgressEvent::Clearing {
            collection: collection.clone(),
        });
        store.clear()?;
    } else {
        progress.report(ProgressEvent::Appending {
            collection: collection.clone(),
        });
    }
    report.cleared_existing = clear;

    if !staged.records.is_empty() {
        let count = store.insert_all(&staged.records)?;
        progress.report(ProgressEvent::Inserted { count, collection });
        report.records_inserted = count;
    }
    Ok(())
}
