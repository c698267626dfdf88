use crate::domains::briefcase::locator::{BriefcaseLocator, ImodelVersion};
use crate::errors::{ExportResult, ExporterError};
use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;

/// Download progress callback: `(loaded, total)` bytes, non-zero aborts.
pub type DownloadProgress<'a> = &'a mut (dyn FnMut(u64, u64) -> i32 + Send);

/// Checkpoint to materialize as a local briefcase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointRequest {
    pub project_id: String,
    pub imodel_id: String,
    pub version: ImodelVersion,
    pub briefcase_id: u32,
}

impl From<&BriefcaseLocator> for CheckpointRequest {
    fn from(locator: &BriefcaseLocator) -> Self {
        Self {
            project_id: locator.project_id.clone(),
            imodel_id: locator.imodel_id.clone(),
            version: locator.version(),
            briefcase_id: 0,
        }
    }
}

/// Local briefcase produced by a checkpoint download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BriefcaseProps {
    pub file_name: PathBuf,
    pub briefcase_id: u32,
    pub imodel_id: String,
    pub project_id: String,
    pub changeset_id: String,
    pub file_size: u64,
}

/// Local path of a briefcase: `<briefcase_dir>/<imodelId>/<briefcaseId>.bim`.
pub fn briefcase_file_name(briefcase_dir: &Path, imodel_id: &str, briefcase_id: u32) -> PathBuf {
    briefcase_dir.join(imodel_id).join(format!("{}.bim", briefcase_id))
}

/// Source of iModel checkpoints.
#[async_trait]
pub trait CheckpointService: Send + Sync {
    /// Materialize the checkpoint of `request` into a local briefcase file.
    async fn download_checkpoint(
        &self,
        request: &CheckpointRequest,
        progress: DownloadProgress<'_>,
    ) -> ExportResult<BriefcaseProps>;
}

/// Downloads checkpoints over HTTP from a URL template.
///
/// The template may contain `{projectId}`, `{iModelId}` and `{changesetId}`.
pub struct HttpCheckpointService {
    client: Client,
    url_template: String,
    access_token: Option<String>,
    briefcase_dir: PathBuf,
}

impl HttpCheckpointService {
    pub fn new(url_template: &str, access_token: Option<String>, briefcase_dir: impl Into<PathBuf>) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        Self {
            client,
            url_template: url_template.to_string(),
            access_token,
            briefcase_dir: briefcase_dir.into(),
        }
    }

    /// Checkpoint URL for `request`.
    pub fn checkpoint_url(&self, request: &CheckpointRequest) -> String {
        self.url_template
            .replace("{projectId}", &request.project_id)
            .replace("{iModelId}", &request.imodel_id)
            .replace("{changesetId}", request.version.changeset_id())
    }
}

#[async_trait]
impl CheckpointService for HttpCheckpointService {
    async fn download_checkpoint(
        &self,
        request: &CheckpointRequest,
        progress: DownloadProgress<'_>,
    ) -> ExportResult<BriefcaseProps> {
        let url = self.checkpoint_url(request);
        let file_name = briefcase_file_name(&self.briefcase_dir, &request.imodel_id, request.briefcase_id);
        debug!("Downloading checkpoint {} to {}", url, file_name.display());

        let mut builder = self.client.get(&url);
        if let Some(token) = &self.access_token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        let mut response = builder.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to get error details".to_string());
            return Err(ExporterError::Download(format!(
                "Server returned error {}: {}",
                status, error_text
            )));
        }

        if let Some(parent) = file_name.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::File::create(&file_name).await?;

        let total = response.content_length().unwrap_or(0);
        let mut loaded = 0u64;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            loaded += chunk.len() as u64;
            if progress(loaded, total.max(loaded)) != 0 {
                drop(file);
                // Drop the partial briefcase
                let _ = tokio::fs::remove_file(&file_name).await;
                return Err(ExporterError::DownloadAborted);
            }
        }
        file.flush().await?;

        let file_size = tokio::fs::metadata(&file_name).await?.len();
        info!("Downloaded checkpoint of iModel {} ({} bytes)", request.imodel_id, file_size);

        Ok(BriefcaseProps {
            file_name,
            briefcase_id: request.briefcase_id,
            imodel_id: request.imodel_id.clone(),
            project_id: request.project_id.clone(),
            changeset_id: request.version.changeset_id().to_string(),
            file_size,
        })
    }
}

/// Print download progress in place on stdout. Never aborts.
pub fn print_download_progress(loaded: u64, total: u64) -> i32 {
    let mut stdout = std::io::stdout();
    let _ = write!(stdout, "\r{}", download_progress_line(loaded, total));
    let _ = stdout.flush();
    0
}

fn download_progress_line(loaded: u64, total: u64) -> String {
    let percent = if total == 0 {
        0.0
    } else {
        loaded as f64 / total as f64 * 100.0
    };
    format!("Downloaded: {:.2} %", percent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Serves a fixed payload in chunks, driving the progress callback like a real download.
    struct FakeCheckpointService {
        payload: Vec<u8>,
        chunk_size: usize,
        briefcase_dir: PathBuf,
        requests: Mutex<Vec<CheckpointRequest>>,
    }

    #[async_trait]
    impl CheckpointService for FakeCheckpointService {
        async fn download_checkpoint(
            &self,
            request: &CheckpointRequest,
            progress: DownloadProgress<'_>,
        ) -> ExportResult<BriefcaseProps> {
            self.requests.lock().unwrap().push(request.clone());
            let file_name = briefcase_file_name(&self.briefcase_dir, &request.imodel_id, request.briefcase_id);
            std::fs::create_dir_all(file_name.parent().unwrap())?;

            let total = self.payload.len() as u64;
            let mut written = Vec::new();
            for chunk in self.payload.chunks(self.chunk_size) {
                written.extend_from_slice(chunk);
                if progress(written.len() as u64, total) != 0 {
                    return Err(ExporterError::DownloadAborted);
                }
            }
            std::fs::write(&file_name, &written)?;

            Ok(BriefcaseProps {
                file_name,
                briefcase_id: request.briefcase_id,
                imodel_id: request.imodel_id.clone(),
                project_id: request.project_id.clone(),
                changeset_id: request.version.changeset_id().to_string(),
                file_size: total,
            })
        }
    }

    fn sample_request(version: ImodelVersion) -> CheckpointRequest {
        CheckpointRequest {
            project_id: "6f3a1b2c-0d4e-4f5a-8b9c-0123456789ab".to_string(),
            imodel_id: "a1b2c3d4-e5f6-4711-8899-aabbccddeeff".to_string(),
            version,
            briefcase_id: 0,
        }
    }

    #[test]
    fn test_checkpoint_url_template() {
        let service = HttpCheckpointService::new(
            "https://hub.example.com/projects/{projectId}/imodels/{iModelId}/checkpoints/{changesetId}",
            None,
            "briefcases",
        );

        let url = service.checkpoint_url(&sample_request(ImodelVersion::Latest));
        assert_eq!(
            url,
            "https://hub.example.com/projects/6f3a1b2c-0d4e-4f5a-8b9c-0123456789ab/imodels/a1b2c3d4-e5f6-4711-8899-aabbccddeeff/checkpoints/latest"
        );

        let url = service.checkpoint_url(&sample_request(ImodelVersion::AsOfChangeset("cs42".into())));
        assert!(url.ends_with("/checkpoints/cs42"));
    }

    #[test]
    fn test_request_from_locator() {
        let locator = BriefcaseLocator {
            project_id: "p".into(),
            imodel_id: "m".into(),
            changeset_id: "c1".into(),
        };
        let request = CheckpointRequest::from(&locator);
        assert_eq!(request.briefcase_id, 0);
        assert_eq!(request.version, ImodelVersion::AsOfChangeset("c1".into()));
    }

    #[test]
    fn test_briefcase_file_name() {
        let path = briefcase_file_name(Path::new("briefcases"), "abc", 0);
        assert_eq!(path, Path::new("briefcases").join("abc").join("0.bim"));
    }

    #[test]
    fn test_progress_line() {
        assert_eq!(download_progress_line(1, 3), "Downloaded: 33.33 %");
        assert_eq!(download_progress_line(10, 10), "Downloaded: 100.00 %");
        assert_eq!(download_progress_line(0, 0), "Downloaded: 0.00 %");
        assert_eq!(print_download_progress(5, 10), 0);
    }

    #[tokio::test]
    async fn test_download_reports_progress() {
        let dir = TempDir::new().unwrap();
        let service = FakeCheckpointService {
            payload: vec![7u8; 10],
            chunk_size: 4,
            briefcase_dir: dir.path().to_path_buf(),
            requests: Mutex::new(Vec::new()),
        };

        let mut seen = Vec::new();
        let mut progress = |loaded: u64, total: u64| {
            seen.push((loaded, total));
            0
        };
        let props = service
            .download_checkpoint(&sample_request(ImodelVersion::Latest), &mut progress)
            .await
            .unwrap();

        assert_eq!(seen, vec![(4, 10), (8, 10), (10, 10)]);
        assert_eq!(props.file_size, 10);
        assert_eq!(props.changeset_id, "latest");
        assert!(props.file_name.ends_with("a1b2c3d4-e5f6-4711-8899-aabbccddeeff/0.bim"));
        assert_eq!(std::fs::read(&props.file_name).unwrap().len(), 10);
        assert_eq!(service.requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_non_zero_progress_aborts() {
        let dir = TempDir::new().unwrap();
        let service = FakeCheckpointService {
            payload: vec![1u8; 10],
            chunk_size: 4,
            briefcase_dir: dir.path().to_path_buf(),
            requests: Mutex::new(Vec::new()),
        };

        let mut calls = 0;
        let mut progress = |_: u64, _: u64| {
            calls += 1;
            1
        };
        let result = service
            .download_checkpoint(&sample_request(ImodelVersion::Latest), &mut progress)
            .await;

        assert!(matches!(result, Err(ExporterError::DownloadAborted)));
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_http_download_of_unreachable_host_fails() {
        let dir = TempDir::new().unwrap();
        let service = HttpCheckpointService::new("http://127.0.0.1:9/{iModelId}", Some("token".into()), dir.path());

        let mut progress = |_: u64, _: u64| 0;
        let result = service
            .download_checkpoint(&sample_request(ImodelVersion::Latest), &mut progress)
            .await;
        assert!(matches!(result, Err(ExporterError::Download(_))));
    }
}
