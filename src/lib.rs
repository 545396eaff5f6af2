//! Yandex Disk Transcriber - A Rust CLI tool for transcribing videos stored on Yandex Disk
//!
//! This library downloads a video from Yandex Disk, extracts its audio track with ffmpeg,
//! transcribes it with a Whisper model and optionally uploads the transcript back to Disk.
//! Scratch files are removed on every exit path.

use std::fmt;
use std::path::PathBuf;

pub mod cli;
pub mod config;
pub mod media;
pub mod pipeline;
pub mod recognizer;
pub mod storage;
pub mod utils;

pub use cli::{Cli, Commands};
pub use config::Config;
pub use media::{AudioTrack, MediaToolkit, VideoClip};
pub use pipeline::{
    Destination, RunFailure, RunReport, ScratchAudioFile, ScratchVideoFile, TranscriptionPipeline,
    TranscriptionResult,
};
pub use recognizer::SpeechRecognizer;
pub use storage::{CloudStorage, RemoteFile, SourceId};

/// Result type used by the glue code (configuration, CLI, token flow)
pub type Result<T> = anyhow::Result<T>;

/// Result type returned by pipeline stages and their collaborators
pub type StageResult<T> = std::result::Result<T, PipelineError>;

/// Errors that abort a pipeline run
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("Source not found: {0}")]
    NotFound(String),

    #[error("Authentication or transport failure: {0}")]
    AuthOrTransport(String),

    #[error("Downloaded file is corrupt: {0}")]
    CorruptDownload(String),

    #[error("Failed to decode video: {0}")]
    Decode(String),

    #[error("Video has no audio track: {}", .0.display())]
    NoAudioTrack(PathBuf),

    #[error("Failed to write file: {0}")]
    Write(String),

    #[error("Speech recognition model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Cannot resolve destination path: {0}")]
    Path(String),

    #[error("Upload failed: {0}")]
    Upload(String),
}

impl PipelineError {
    /// Stable name of the error kind, used in reports and logs
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::NotFound(_) => "NotFound",
            PipelineError::AuthOrTransport(_) => "AuthOrTransportError",
            PipelineError::CorruptDownload(_) => "CorruptDownload",
            PipelineError::Decode(_) => "DecodeError",
            PipelineError::NoAudioTrack(_) => "NoAudioTrack",
            PipelineError::Write(_) => "WriteError",
            PipelineError::ModelUnavailable(_) => "ModelUnavailable",
            PipelineError::Transcription(_) => "TranscriptionError",
            PipelineError::Path(_) => "PathError",
            PipelineError::Upload(_) => "UploadError",
        }
    }
}

/// Non-fatal problem found while removing a scratch file
#[derive(thiserror::Error, Debug, Clone)]
#[error("Failed to remove {}: {message}", path.display())]
pub struct CleanupWarning {
    pub path: PathBuf,
    pub message: String,
}

/// Ordered steps of a pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Acquire,
    Extract,
    Transcribe,
    Publish,
    Cleanup,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Acquire => write!(f, "acquire"),
            Stage::Extract => write!(f, "extract"),
            Stage::Transcribe => write!(f, "transcribe"),
            Stage::Publish => write!(f, "publish"),
            Stage::Cleanup => write!(f, "cleanup"),
        }
    }
}
