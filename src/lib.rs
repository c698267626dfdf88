// Public modules
pub mod config;
pub mod domains;
pub mod errors;
pub mod logging;

pub use config::ExporterConfig;
pub use errors::{ErrorCode, ExportResult, ExporterError};
pub use logging::LogSettings;

use domains::export::{run_job, DataExporter, LogProgress, QueryJob};
use domains::imodel::SqliteImodelDb;
use std::sync::Arc;

/// Run `job` against an opened iModel and close it afterwards.
///
/// The handle is closed whether or not the job succeeded.
pub async fn export_imodel(db: SqliteImodelDb, job: &QueryJob, config: &ExporterConfig) -> ExportResult<()> {
    let db = Arc::new(db.with_mass_properties_table(&config.mass_properties_table));
    let mut exporter = DataExporter::new(db.clone(), db.clone(), &config.output_root, Arc::new(LogProgress));

    let result = run_job(&mut exporter, job).await;
    drop(exporter);
    db.close().await;

    result.map(|_| ())
}
