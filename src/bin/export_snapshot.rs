//! Export query results from a local snapshot iModel.

use clap::Parser;
use imodel_exporter::domains::export::QueryJob;
use imodel_exporter::domains::imodel::SqliteImodelDb;
use imodel_exporter::{export_imodel, ExportResult, ExporterConfig, ExporterError};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "export_snapshot")]
#[command(version, about = "Export iModel query results to ';'-delimited files")]
struct Args {
    /// Snapshot iModel file
    imodel: PathBuf,

    /// Job description (JSON)
    #[arg(default_value = "queries/example.json")]
    job: PathBuf,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = run(args).await {
        eprintln!("Error: {}: {}", e.kind(), e);
        std::process::exit(e.error_number());
    }
}

async fn run(args: Args) -> ExportResult<()> {
    let config = ExporterConfig::from_env()?;
    config.log.init();

    if !args.imodel.exists() {
        return Err(ExporterError::ImodelNotFound(args.imodel.display().to_string()));
    }

    let job = QueryJob::load(&args.job)?;
    let db = SqliteImodelDb::open_snapshot(&args.imodel).await?;
    export_imodel(db, &job, &config).await
}
