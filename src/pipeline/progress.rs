// file: src/pipeline/progress.rs
// description: progress tracking and statistics reporting for migration runs
// reference: uses indicatif for progress spinners and tracks processing metrics

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableStats {
    pub rows_read: usize,
    pub rows_skipped: usize,
    pub records_upserted: usize,
    pub batches_flushed: usize,
}

impl TableStats {
    pub fn record_flush(&mut self, records: usize) {
        self.batches_flushed += 1;
        self.records_upserted += records;
    }
}

#[derive(Debug, Clone, Default)]
pub struct MigrationStats {
    pub tables_processed: usize,
    pub tables_skipped: usize,
    pub rows_read: usize,
    pub rows_skipped: usize,
    pub records_upserted: usize,
    pub batches_flushed: usize,
    pub duration_secs: u64,
}

impl MigrationStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_table(&mut self, table: &TableStats) {
        self.tables_processed += 1;
        self.rows_read += table.rows_read;
        self.rows_skipped += table.rows_skipped;
        self.records_upserted += table.records_upserted;
        self.batches_flushed += table.batches_flushed;
    }

    pub fn records_per_second(&self) -> f64 {
        if self.duration_secs == 0 {
            return 0.0;
        }
        self.records_upserted as f64 / self.duration_secs as f64
    }

    /// Share of read rows that produced embeddable text.
    pub fn embed_rate(&self) -> f64 {
        if self.rows_read == 0 {
            return 0.0;
        }
        ((self.rows_read - self.rows_skipped) as f64 / self.rows_read as f64) * 100.0
    }
}

/// One spinner per table under a shared multi-bar.
pub struct ProgressTracker {
    multi_progress: MultiProgress,
    start_time: Instant,
}

impl ProgressTracker {
    pub fn new(visible: bool) -> Self {
        let target = if visible {
            ProgressDrawTarget::stderr()
        } else {
            ProgressDrawTarget::hidden()
        };

        Self {
            multi_progress: MultiProgress::with_draw_target(target),
            start_time: Instant::now(),
        }
    }

    pub fn hidden() -> Self {
        Self::new(false)
    }

    pub fn table(&self, table_name: &str) -> TableProgress {
        let bar = self.multi_progress.add(ProgressBar::new_spinner());
        if let Ok(style) = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {prefix:.cyan.bold} {msg}")
        {
            bar.set_style(style);
        }
        bar.set_prefix(table_name.to_string());
        bar.enable_steady_tick(Duration::from_millis(120));
        TableProgress { bar }
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

pub struct TableProgress {
    bar: ProgressBar,
}

impl TableProgress {
    pub fn update(&self, stats: &TableStats) {
        self.bar.set_message(format!(
            "rows: {} | skipped: {} | upserted: {} | batches: {}",
            stats.rows_read, stats.rows_skipped, stats.records_upserted, stats.batches_flushed
        ));
    }

    pub fn finish(&self, stats: &TableStats) {
        self.update(stats);
        self.bar.finish();
    }
}

impl Drop for TableProgress {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.abandon();
        }
    }
}
