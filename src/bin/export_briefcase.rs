//! Download the iModel addressed by a job's URL and export query results from it.

use clap::Parser;
use imodel_exporter::domains::briefcase::{
    print_download_progress, BriefcaseLocator, CheckpointRequest, CheckpointService, HttpCheckpointService,
};
use imodel_exporter::domains::export::QueryJob;
use imodel_exporter::domains::imodel::SqliteImodelDb;
use imodel_exporter::{export_imodel, ExportResult, ExporterConfig, ExporterError};
use std::error::Error as _;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "export_briefcase")]
#[command(version, about = "Download an iModel checkpoint and export query results")]
struct Args {
    /// Job description (JSON) with a `url` naming the project and iModel
    #[arg(default_value = "queries/example.json")]
    job: PathBuf,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = run(args).await {
        eprintln!("Error: {}: {}", e.kind(), e);
        let mut source = e.source();
        while let Some(cause) = source {
            eprintln!("  caused by: {}", cause);
            source = cause.source();
        }
        std::process::exit(e.error_number());
    }
}

async fn run(args: Args) -> ExportResult<()> {
    let config = ExporterConfig::from_env()?;
    config.log.init();

    let job = QueryJob::load(&args.job)?;
    let url = job
        .url
        .as_deref()
        .ok_or_else(|| ExporterError::InvalidJob("job has no url".to_string()))?;
    let locator = BriefcaseLocator::from_url(url)?;

    let service = HttpCheckpointService::new(
        config.require_checkpoint_url()?,
        config.access_token.clone(),
        &config.briefcase_dir,
    );

    println!(
        "Started opening iModel (projectId={}, iModelId={}, changeSetId={})",
        locator.project_id, locator.imodel_id, locator.changeset_id
    );
    let request = CheckpointRequest::from(&locator);
    let mut progress = print_download_progress;
    let props = service.download_checkpoint(&request, &mut progress).await?;

    let db = SqliteImodelDb::open_briefcase(&props.file_name).await?;
    println!("\nFinished opening iModel");

    export_imodel(db, &job, &config).await
}
