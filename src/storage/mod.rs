use async_trait::async_trait;
use std::fmt;
use std::path::Path;
use url::Url;

pub mod oauth;
pub mod yandex;

use crate::{PipelineError, StageResult};

/// Identifier of the video to transcribe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceId {
    /// Path inside the account, e.g. `/clips/demo.mov` or `disk:/clips/demo.mov`
    RemotePath(String),

    /// Public share link
    PublicUrl(Url),
}

impl SourceId {
    /// Parse user input into a source identifier
    pub fn parse(input: &str) -> StageResult<Self> {
        let input = input.trim();

        if input.is_empty() {
            return Err(PipelineError::Path("source identifier is empty".to_string()));
        }

        if input.starts_with("http://") || input.starts_with("https://") {
            let url = Url::parse(input)
                .map_err(|e| PipelineError::Path(format!("invalid URL {}: {}", input, e)))?;
            return Ok(SourceId::PublicUrl(url));
        }

        Ok(SourceId::RemotePath(input.to_string()))
    }

    /// Last component of the identifier, if it has one
    pub fn leaf_name(&self) -> Option<String> {
        match self {
            SourceId::RemotePath(path) => path
                .rsplit('/')
                .next()
                .map(|leaf| leaf.trim_start_matches("disk:"))
                .filter(|leaf| !leaf.is_empty())
                .map(str::to_string),
            SourceId::PublicUrl(url) => url
                .path_segments()
                .and_then(|mut segments| segments.next_back())
                .filter(|leaf| !leaf.is_empty())
                .map(str::to_string),
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceId::RemotePath(path) => write!(f, "{}", path),
            SourceId::PublicUrl(url) => write!(f, "{}", url),
        }
    }
}

/// Metadata of a remote file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub name: String,
    pub size: u64,
    pub mime_type: Option<String>,
}

/// Remote storage the videos are fetched from and transcripts are published to
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CloudStorage: Send + Sync {
    /// Whether the configured credentials are accepted by the service
    async fn check_token(&self) -> StageResult<bool>;

    /// Whether the source resolves to an existing resource
    async fn exists(&self, source: &SourceId) -> StageResult<bool>;

    /// Fetch name, size and MIME type of the source
    async fn metadata(&self, source: &SourceId) -> StageResult<RemoteFile>;

    /// Download the source into `local_path`
    async fn download(&self, source: &SourceId, local_path: &Path) -> StageResult<()>;

    /// Upload UTF-8 text to `remote_path`
    async fn upload_text(&self, remote_path: &str, content: &str) -> StageResult<()>;
}
