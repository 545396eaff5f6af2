use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

use super::{CloudStorage, RemoteFile, SourceId};
use crate::config::StorageConfig;
use crate::utils::{byte_bar, format_file_size};
use crate::{PipelineError, StageResult};

/// Yandex Disk REST API client
pub struct YandexDiskClient {
    client: Client,
    api_base: String,
    token: String,
    show_progress: bool,
}

#[derive(Debug, Deserialize)]
struct DiskInfo {
    total_space: Option<u64>,
    used_space: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ResourceMeta {
    name: String,
    #[serde(rename = "type")]
    resource_type: String,
    size: Option<u64>,
    mime_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Link {
    href: String,
}

/// Error code Yandex returns with 409 when `overwrite=false` hits an existing file
const RESOURCE_EXISTS: &str = "DiskResourceAlreadyExistsError";

#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
    description: Option<String>,
}

impl ApiErrorBody {
    fn detail(&self) -> Option<&str> {
        self.message
            .as_deref()
            .or(self.description.as_deref())
            .or(self.error.as_deref())
    }
}

/// API call a failed response belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Lookup,
    DownloadLink,
    Download,
    UploadLink,
    Upload,
}

impl Operation {
    fn describe(self) -> &'static str {
        match self {
            Operation::Lookup => "Failed to look up",
            Operation::DownloadLink => "Failed to get download link for",
            Operation::Download => "Failed to download",
            Operation::UploadLink => "Failed to get upload link for",
            Operation::Upload => "Failed to upload",
        }
    }
}

impl YandexDiskClient {
    pub fn new(token: impl Into<String>, config: &StorageConfig) -> crate::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token: token.into(),
            show_progress: true,
        })
    }

    /// Enable or disable the download progress bar
    pub fn with_progress(mut self, visible: bool) -> Self {
        self.show_progress = visible;
        self
    }

    fn get(&self, endpoint: &str) -> RequestBuilder {
        self.client
            .get(format!("{}{}", self.api_base, endpoint))
            .header(AUTHORIZATION, format!("OAuth {}", self.token))
    }

    /// Request against `resources` or `public/resources` depending on the source kind
    fn resource_request(&self, source: &SourceId, suffix: &str) -> RequestBuilder {
        match source {
            SourceId::RemotePath(path) => self
                .get(&format!("/resources{}", suffix))
                .query(&[("path", path.as_str())]),
            SourceId::PublicUrl(url) => self
                .get(&format!("/public/resources{}", suffix))
                .query(&[("public_key", url.as_str())]),
        }
    }

    async fn download_href(&self, source: &SourceId) -> StageResult<String> {
        let response = self
            .resource_request(source, "/download")
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(api_error(response, Operation::DownloadLink, &source.to_string()).await);
        }

        let link: Link = response.json().await.map_err(transport_error)?;
        Ok(link.href)
    }
}

#[async_trait]
impl CloudStorage for YandexDiskClient {
    async fn check_token(&self) -> StageResult<bool> {
        let response = self.get("/").send().await.map_err(transport_error)?;

        match token_accepted(response.status()) {
            Some(true) => {
                if let Ok(info) = response.json::<DiskInfo>().await {
                    tracing::debug!(
                        "Disk usage: {} of {}",
                        format_file_size(info.used_space.unwrap_or(0)),
                        format_file_size(info.total_space.unwrap_or(0))
                    );
                }
                Ok(true)
            }
            Some(false) => Ok(false),
            None => Err(api_error(response, Operation::Lookup, "disk info").await),
        }
    }

    async fn exists(&self, source: &SourceId) -> StageResult<bool> {
        let response = self
            .resource_request(source, "")
            .query(&[("fields", "name")])
            .send()
            .await
            .map_err(transport_error)?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(api_error(response, Operation::Lookup, &source.to_string()).await),
        }
    }

    async fn metadata(&self, source: &SourceId) -> StageResult<RemoteFile> {
        let response = self
            .resource_request(source, "")
            .query(&[("fields", "name,type,size,mime_type")])
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(api_error(response, Operation::Lookup, &source.to_string()).await);
        }

        let meta: ResourceMeta = response.json().await.map_err(transport_error)?;

        if meta.resource_type != "file" {
            return Err(PipelineError::NotFound(format!(
                "{} is a {}, not a file",
                source, meta.resource_type
            )));
        }

        Ok(RemoteFile {
            name: meta.name,
            size: meta.size.unwrap_or(0),
            mime_type: meta.mime_type,
        })
    }

    async fn download(&self, source: &SourceId, local_path: &Path) -> StageResult<()> {
        let href = self.download_href(source).await?;
        tracing::debug!("Download link resolved for {}", source);

        let response = self
            .client
            .get(&href)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(api_error(response, Operation::Download, &source.to_string()).await);
        }

        let progress = byte_bar(response.content_length().unwrap_or(0), self.show_progress);
        progress.set_message("Downloading video...");

        let mut file = tokio::fs::File::create(local_path).await.map_err(|e| {
            PipelineError::Write(format!("{}: {}", local_path.display(), e))
        })?;

        let mut downloaded = 0u64;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(transport_error)?;
            file.write_all(&chunk).await.map_err(|e| {
                PipelineError::Write(format!("{}: {}", local_path.display(), e))
            })?;
            downloaded += chunk.len() as u64;
            progress.set_position(downloaded);
        }

        file.flush()
            .await
            .map_err(|e| PipelineError::Write(format!("{}: {}", local_path.display(), e)))?;

        progress.finish_with_message("Download complete");
        Ok(())
    }

    async fn upload_text(&self, remote_path: &str, content: &str) -> StageResult<()> {
        let response = self
            .get("/resources/upload")
            .query(&[("path", remote_path), ("overwrite", "false")])
            .send()
            .await
            .map_err(|e| PipelineError::Upload(e.to_string()))?;

        if !response.status().is_success() {
            return Err(api_error(response, Operation::UploadLink, remote_path).await);
        }

        let link: Link = response
            .json()
            .await
            .map_err(|e| PipelineError::Upload(e.to_string()))?;

        let response = self
            .client
            .put(&link.href)
            .body(content.as_bytes().to_vec())
            .send()
            .await
            .map_err(|e| PipelineError::Upload(e.to_string()))?;

        if !response.status().is_success() {
            return Err(api_error(response, Operation::Upload, remote_path).await);
        }

        Ok(())
    }
}

fn transport_error(error: reqwest::Error) -> PipelineError {
    PipelineError::AuthOrTransport(error.to_string())
}

/// `Some(accepted)` for the statuses that answer the token question, `None` otherwise
fn token_accepted(status: StatusCode) -> Option<bool> {
    match status {
        StatusCode::OK => Some(true),
        StatusCode::UNAUTHORIZED => Some(false),
        _ => None,
    }
}

/// Read the error body of a failed response and classify it
async fn api_error(response: Response, operation: Operation, target: &str) -> PipelineError {
    let status = response.status();
    let body = response.json::<ApiErrorBody>().await.ok();
    classify(status, body, operation, target)
}

/// Map a failed API response to the pipeline error taxonomy
fn classify(
    status: StatusCode,
    body: Option<ApiErrorBody>,
    operation: Operation,
    target: &str,
) -> PipelineError {
    let code = body.as_ref().and_then(|body| body.error.as_deref());
    let detail = body
        .as_ref()
        .and_then(ApiErrorBody::detail)
        .map(str::to_string)
        .unwrap_or_else(|| status.to_string());
    let message = format!(
        "{} {} (HTTP {}): {}",
        operation.describe(),
        target,
        status.as_u16(),
        detail
    );

    match operation {
        // 409 on the upload link means the parent folder is missing, unless the file itself exists
        Operation::UploadLink if status == StatusCode::CONFLICT && code != Some(RESOURCE_EXISTS) => {
            PipelineError::Path(message)
        }
        Operation::UploadLink | Operation::Upload => PipelineError::Upload(message),
        _ if status == StatusCode::NOT_FOUND => PipelineError::NotFound(message),
        _ => PipelineError::AuthOrTransport(message),
    }
}
