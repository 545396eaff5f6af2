use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub mod ffmpeg;

use crate::StageResult;

/// Audio stream inside a video container
#[derive(Debug, Clone, PartialEq)]
pub struct AudioTrack {
    /// Stream index within the container
    pub index: u32,

    /// Codec name as reported by the demuxer
    pub codec: Option<String>,
}

/// An opened video container
#[derive(Debug, Clone, PartialEq)]
pub struct VideoClip {
    pub path: PathBuf,

    /// Container duration in seconds, if known
    pub duration: Option<f64>,

    /// First audio track, `None` when the container has no audio
    pub audio: Option<AudioTrack>,
}

/// Decoder/encoder used by the extract stage
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaToolkit: Send + Sync {
    /// Open a video container and describe its streams
    async fn open_video(&self, path: &Path) -> StageResult<VideoClip>;

    /// Encode `track` of `clip` into `output`
    async fn write_audio(&self, clip: &VideoClip, track: &AudioTrack, output: &Path) -> StageResult<()>;
}
