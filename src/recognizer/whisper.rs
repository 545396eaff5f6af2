//! whisper.cpp command line backend.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use super::{SpeechRecognizer, MODEL_SIZE};
use crate::utils::spinner;
use crate::{PipelineError, StageResult};

/// stderr markers whisper.cpp prints when the model file cannot be loaded
const MODEL_LOAD_FAILURES: &[&str] = &["failed to load model", "failed to initialize whisper context"];

pub struct WhisperCli {
    binary: String,
    models_dir: PathBuf,
    show_progress: bool,
}

impl WhisperCli {
    pub fn new(binary: impl Into<String>, models_dir: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            models_dir: models_dir.into(),
            show_progress: true,
        }
    }

    pub fn with_progress(mut self, visible: bool) -> Self {
        self.show_progress = visible;
        self
    }

    /// Path of the ggml model file for [`MODEL_SIZE`]
    pub fn model_path(&self) -> PathBuf {
        self.models_dir.join(format!("ggml-{}.bin", MODEL_SIZE))
    }
}

#[async_trait]
impl SpeechRecognizer for WhisperCli {
    async fn transcribe(&self, audio_path: &Path) -> StageResult<String> {
        let model_path = self.model_path();
        if !model_path.is_file() {
            return Err(PipelineError::ModelUnavailable(format!(
                "model file not found: {}",
                model_path.display()
            )));
        }

        tracing::info!("Loading Whisper model ({})...", MODEL_SIZE);
        tracing::info!("This may take a moment on first run...");
        let progress = spinner("Transcribing audio...", self.show_progress);

        // -nt drops timestamps, -np drops progress chatter, -l auto enables language detection
        let output = Command::new(&self.binary)
            .arg("-m")
            .arg(&model_path)
            .arg("-f")
            .arg(audio_path)
            .args(["-l", "auto", "-nt", "-np"])
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await;

        progress.finish_and_clear();

        let output = output.map_err(|e| match e.kind() {
            ErrorKind::NotFound | ErrorKind::PermissionDenied => PipelineError::ModelUnavailable(
                format!("cannot start {}: {}", self.binary, e),
            ),
            _ => PipelineError::Transcription(format!("failed to run {}: {}", self.binary, e)),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(run_failure(&self.binary, &output.status.to_string(), &stderr));
        }

        let text = String::from_utf8(output.stdout).map_err(|e| {
            PipelineError::Transcription(format!("model produced invalid UTF-8: {}", e))
        })?;

        Ok(text.trim().to_string())
    }
}

/// Classify a non-zero exit: a model that exists but won't load is still unavailable
fn run_failure(binary: &str, status: &str, stderr: &str) -> PipelineError {
    let stderr = stderr.trim();
    let message = format!("{} exited with {}: {}", binary, status, stderr);

    if MODEL_LOAD_FAILURES.iter().any(|marker| stderr.contains(marker)) {
        PipelineError::ModelUnavailable(message)
    } else {
        PipelineError::Transcription(message)
    }
}
