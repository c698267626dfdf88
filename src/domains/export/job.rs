use crate::domains::export::service::DataExporter;
use crate::domains::export::types::{ExportStats, QueryJob};
use crate::errors::{ExportResult, ExporterError};
use std::path::Path;

impl QueryJob {
    /// Read a job description from a JSON file.
    pub fn load(path: &Path) -> ExportResult<Self> {
        if !path.is_file() {
            return Err(ExporterError::JobNotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> ExportResult<Self> {
        serde_json::from_str(content).map_err(|e| ExporterError::InvalidJob(e.to_string()))
    }
}

/// Run every query of `job` into `<output_root>/<job.folder>`.
///
/// Queries run in document order; the first failure stops the job and
/// files written before it are left in place.
pub async fn run_job(exporter: &mut DataExporter, job: &QueryJob) -> ExportResult<Vec<(String, ExportStats)>> {
    exporter.set_folder(&job.folder);

    let mut results = Vec::with_capacity(job.queries.len());
    for (key, spec) in &job.queries {
        log::info!("Executing query for {}", key);
        let file_name = spec.output_file_name(key);
        let stats = exporter
            .write_query_results_to_csv(&spec.query, &file_name, spec.options.as_ref())
            .await?;
        log::debug!(
            "Query {} wrote {} rows ({} bytes) in {} ms",
            key,
            stats.rows_written,
            stats.bytes_written,
            stats.duration_ms
        );
        results.push((key.clone(), stats));
    }

    Ok(results)
}
