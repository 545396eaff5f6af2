use async_trait::async_trait;
use std::path::Path;

pub mod whisper;

use crate::StageResult;

/// Whisper model size used for every run
pub const MODEL_SIZE: &str = "medium";

/// Speech-to-text engine
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Transcribe the whole audio file into one string
    async fn transcribe(&self, audio_path: &Path) -> StageResult<String>;
}
