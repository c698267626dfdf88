use crate::domains::export::types::MassPropertySummary;
use std::path::Path;

/// Interval between advisory progress observations.
pub const PROGRESS_INTERVAL: usize = 1000;

/// Receives advisory progress observations from an export.
pub trait ProgressObserver: Send + Sync {
    fn rows_processed(&self, count: usize);

    fn mass_properties_progress(&self, count: usize, summary: &MassPropertySummary);

    fn file_written(&self, rows: usize, path: &Path);
}

/// Reports progress through the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressObserver for LogProgress {
    fn rows_processed(&self, count: usize) {
        log::info!("{} rows processed so far", count);
    }

    fn mass_properties_progress(&self, count: usize, summary: &MassPropertySummary) {
        log::info!("Calculated {} mass properties: \n{}", count, summary);
    }

    fn file_written(&self, rows: usize, path: &Path) {
        log::info!("Written {} rows to file: {}", rows, path.display());
    }
}
