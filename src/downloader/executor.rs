//! Export driver: the pagination state machine
//!
//! `START -> PAGING -> (COOLDOWN -> PAGING)* -> DONE`, or `FAILED` from any
//! step. After each page the sink is flushed and synced before the cursor is
//! saved, so a saved cursor never points past rows that are not on disk.

use chrono::Utc;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, error, info, info_span, Instrument};

use crate::dedup::DedupIndex;
use crate::downloader::job::{ExportPhase, ExportProgress, ExportSummary};
use crate::downloader::pacing::BatchCooldown;
use crate::downloader::progress::ProgressTracker;
use crate::downloader::{ExportConfig, ExportError};
use crate::fetcher::UserFetcher;
use crate::metrics::{self, ExportMetrics};
use crate::output::{CsvUsersWriter, OutputWriter, UsersWriter};
use crate::resume::state::{checkpoint_cursor, complete_pass};
use crate::resume::{RunState, StateStore, Watermark};
use crate::Page;

/// Orchestrates one export invocation
pub struct ExportDriver<F, S> {
    fetcher: F,
    store: S,
    config: ExportConfig,
    progress_tracker: ProgressTracker,
}

impl<F: UserFetcher, S: StateStore> ExportDriver<F, S> {
    /// Create a driver
    pub fn new(fetcher: F, store: S, config: ExportConfig) -> Self {
        Self {
            fetcher,
            store,
            config,
            progress_tracker: ProgressTracker::default(),
        }
    }

    /// Override the progress line cadence
    pub fn with_progress_tracker(mut self, tracker: ProgressTracker) -> Self {
        self.progress_tracker = tracker;
        self
    }

    /// State store in use
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Driver configuration
    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Run one export into `output_path`, stamping a completed incremental
    /// pass with the current time.
    pub async fn execute(&self, output_path: &Path) -> Result<ExportSummary, ExportError> {
        self.execute_at(output_path, Utc::now().timestamp()).await
    }

    /// Run one export; `started_at` (Unix seconds) becomes the watermark when
    /// an incremental pass completes.
    pub async fn execute_at(
        &self,
        output_path: &Path,
        started_at: i64,
    ) -> Result<ExportSummary, ExportError> {
        self.config.validate().map_err(ExportError::InvalidConfig)?;

        let run_state = RunState::load(&self.store, self.config.incremental)?;
        let span = info_span!(
            "export",
            mode = %run_state.mode(),
            output = %output_path.display(),
            started_at
        );
        let export_metrics = ExportMetrics::start(run_state.mode().to_string());

        let result = self
            .run(output_path, started_at, run_state)
            .instrument(span)
            .await;

        match &result {
            Ok(summary) => export_metrics.record_success(summary.new_records),
            Err(e) => {
                export_metrics.record_failure(&e.to_string());
                error!(phase = %ExportPhase::Failed, error = %e, "{}", e.resume_hint());
            }
        }
        result
    }

    async fn run(
        &self,
        output_path: &Path,
        started_at: i64,
        run_state: RunState,
    ) -> Result<ExportSummary, ExportError> {
        let run_start = Instant::now();
        debug!(phase = %ExportPhase::Start, "Opening sink and building dedup index");

        // Opening first drops any partial row left by a crash before the scan.
        let mut sink = CsvUsersWriter::open(output_path)?;
        let mut dedup = DedupIndex::from_sink(output_path)?;
        let previously_exported = dedup.len();

        let since = run_state.since();
        let mut cursor = run_state.cursor().cloned();
        let mut progress = ExportProgress::default();
        let mut cooldown = BatchCooldown::new(self.config.batch_size, self.config.batch_cooldown);
        let mut progress_state = self.progress_tracker.create_state();

        info!(
            cursor = cursor.as_ref().map(|c| c.as_str()),
            since = since.map(Watermark::unix_seconds),
            previously_exported,
            "Starting export"
        );

        loop {
            debug!(phase = %ExportPhase::Paging, cursor = cursor.as_ref().map(|c| c.as_str()), "Fetching page");
            let page = self.fetcher.fetch_page(cursor.as_ref(), since).await?;

            let (new_records, duplicates) = write_new_records(&page, &mut dedup, &mut sink)?;
            sink.flush()?;
            checkpoint_cursor(&self.store, page.next_cursor.as_ref())?;

            progress.record_page(new_records, duplicates);
            metrics::record_page(new_records, duplicates);
            cooldown.record(new_records);
            debug!(
                page = progress.pages,
                new_records,
                duplicates,
                next_cursor = page.next_cursor.as_ref().map(|c| c.as_str()),
                "Page checkpointed"
            );

            progress_state.update(&progress);
            if progress_state.should_emit_update(&progress) {
                info!("{}", progress_state.format_progress(&progress));
                progress_state.mark_emitted(&progress);
            }

            cursor = page.next_cursor;
            if cursor.is_none() {
                break;
            }

            if cooldown.is_due() {
                debug!(phase = %ExportPhase::Cooldown, "Batch cooldown");
                cooldown.cool_down_if_due().await;
            }
        }

        sink.close()?;
        let watermark = self
            .config
            .incremental
            .then(|| Watermark::from_unix_seconds(started_at));
        complete_pass(&self.store, watermark)?;

        info!(
            phase = %ExportPhase::Done,
            pages = progress.pages,
            new_records = progress.new_records,
            duplicates = progress.duplicates,
            cooldowns = cooldown.cooldowns(),
            "Export complete"
        );

        Ok(ExportSummary::from_progress(
            run_state.mode(),
            output_path.to_path_buf(),
            &progress,
            previously_exported,
            watermark.map(Watermark::unix_seconds),
            run_start.elapsed().as_millis() as u64,
        ))
    }
}

/// Append records of `page` that are not yet exported. Returns
/// `(new, duplicates)`.
fn write_new_records<W: UsersWriter>(
    page: &Page,
    dedup: &mut DedupIndex,
    sink: &mut W,
) -> Result<(u64, u64), ExportError> {
    let mut new_records = 0;
    let mut duplicates = 0;
    for record in &page.records {
        if dedup.contains(&record.id) {
            duplicates += 1;
            continue;
        }
        sink.write_user(record)?;
        dedup.add(record.id.as_str());
        new_records += 1;
    }
    Ok((new_records, duplicates))
}
