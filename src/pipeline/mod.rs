use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

pub mod acquire;
pub mod cleanup;
pub mod context;
pub mod extract;
pub mod publish;
pub mod transcribe;

pub use cleanup::CleanupReport;
pub use context::{RunContext, ScratchFiles};

use crate::media::MediaToolkit;
use crate::recognizer::SpeechRecognizer;
use crate::storage::{CloudStorage, SourceId};
use crate::{PipelineError, Stage, StageResult};

/// Local copy of the source video
#[derive(Debug, Clone)]
pub struct ScratchVideoFile {
    pub path: PathBuf,
    pub source: SourceId,
    pub size_bytes: u64,
}

/// Audio track extracted from the scratch video
#[derive(Debug, Clone)]
pub struct ScratchAudioFile {
    pub path: PathBuf,

    /// Duration inherited from the source video (informational)
    pub duration_seconds: Option<f64>,
}

/// Transcript produced by the recognizer
#[derive(Debug, Clone)]
pub struct TranscriptionResult {
    /// The transcribed text, exactly as reported by the model
    pub text: String,

    pub source: SourceId,
}

/// Where the transcript is published
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Same remote folder as the source video
    BesideSource,

    /// Explicit remote folder
    Folder(String),
}

/// Settings the orchestrator needs besides its collaborators
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Directory scratch files are written to (created if absent)
    pub scratch_dir: PathBuf,

    /// Publish folder for sources without a containing folder (public links)
    pub publish_folder: Option<String>,
}

/// Outcome of a successful run
#[derive(Debug)]
pub struct RunReport {
    pub transcript: TranscriptionResult,
    pub video: ScratchVideoFile,
    pub audio: ScratchAudioFile,
    pub published_to: Option<String>,
    pub cleanup: CleanupReport,
    pub elapsed: Duration,
}

/// Outcome of a failed run.
///
/// `error` is the stage error exactly as it was raised.
#[derive(Debug)]
pub struct RunFailure {
    pub stage: Stage,
    pub error: PipelineError,

    /// Set when the failure happened after transcription (publish)
    pub transcript: Option<TranscriptionResult>,

    pub cleanup: CleanupReport,
}

impl fmt::Display for RunFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} stage failed: {}", self.stage, self.error)
    }
}

impl std::error::Error for RunFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

struct CompletedStages {
    video: ScratchVideoFile,
    audio: ScratchAudioFile,
    transcript: TranscriptionResult,
    published_to: Option<String>,
}

/// Main transcription pipeline
pub struct TranscriptionPipeline {
    storage: Box<dyn CloudStorage>,
    media: Box<dyn MediaToolkit>,
    recognizer: Box<dyn SpeechRecognizer>,
    settings: PipelineSettings,
}

impl TranscriptionPipeline {
    pub fn new(
        storage: Box<dyn CloudStorage>,
        media: Box<dyn MediaToolkit>,
        recognizer: Box<dyn SpeechRecognizer>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            storage,
            media,
            recognizer,
            settings,
        }
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.settings.scratch_dir
    }

    /// Run all stages for `source`, publishing when `destination` is set.
    ///
    /// Scratch files are removed before this returns, whatever the outcome.
    pub async fn run(
        &self,
        source: &SourceId,
        destination: Option<&Destination>,
    ) -> Result<RunReport, RunFailure> {
        let started = Instant::now();
        let mut ctx = RunContext::new(source.clone());

        let outcome = self.run_stages(&mut ctx, destination).await;

        tracing::debug!("Entering {} stage", Stage::Cleanup);
        let cleanup = ctx.scratch.release();

        match outcome {
            Ok(completed) => Ok(RunReport {
                transcript: completed.transcript,
                video: completed.video,
                audio: completed.audio,
                published_to: completed.published_to,
                cleanup,
                elapsed: started.elapsed(),
            }),
            Err(error) => {
                tracing::error!("{} stage failed ({}): {}", ctx.stage, error.kind(), error);
                Err(RunFailure {
                    stage: ctx.stage,
                    error,
                    transcript: ctx.transcript.take(),
                    cleanup,
                })
            }
        }
    }

    async fn run_stages(
        &self,
        ctx: &mut RunContext,
        destination: Option<&Destination>,
    ) -> StageResult<CompletedStages> {
        ctx.stage = Stage::Acquire;
        self.ensure_scratch_dir()?;
        let video = acquire::acquire(self.storage.as_ref(), ctx, self.scratch_dir()).await?;

        ctx.stage = Stage::Extract;
        let audio = extract::extract(self.media.as_ref(), ctx, &video, self.scratch_dir()).await?;

        ctx.stage = Stage::Transcribe;
        let transcript =
            transcribe::transcribe(self.recognizer.as_ref(), &ctx.source, &audio).await?;
        ctx.transcript = Some(transcript.clone());

        let published_to = match destination {
            Some(destination) => {
                ctx.stage = Stage::Publish;
                let remote_path = publish::publish(
                    self.storage.as_ref(),
                    &transcript,
                    destination,
                    self.settings.publish_folder.as_deref(),
                )
                .await?;
                Some(remote_path)
            }
            None => {
                tracing::info!("Skipping transcript upload");
                None
            }
        };

        Ok(CompletedStages {
            video,
            audio,
            transcript,
            published_to,
        })
    }

    fn ensure_scratch_dir(&self) -> StageResult<()> {
        tracing::info!("Ensuring temporary directory exists: {}", self.scratch_dir().display());
        fs_err::create_dir_all(self.scratch_dir())
            .map_err(|e| PipelineError::Write(format!("cannot create scratch directory: {}", e)))
    }
}
