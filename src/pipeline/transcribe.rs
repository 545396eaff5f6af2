use super::{ScratchAudioFile, TranscriptionResult};
use crate::recognizer::{SpeechRecognizer, MODEL_SIZE};
use crate::storage::SourceId;
use crate::StageResult;

/// Run the audio through the recognizer; the text is passed through untouched
pub async fn transcribe(
    recognizer: &dyn SpeechRecognizer,
    source: &SourceId,
    audio: &ScratchAudioFile,
) -> StageResult<TranscriptionResult> {
    tracing::info!("Step 3/4: Transcribing audio to text (model: {})...", MODEL_SIZE);

    let text = recognizer.transcribe(&audio.path).await?;
    tracing::info!("Transcription completed ({} characters)", text.chars().count());

    Ok(TranscriptionResult {
        text,
        source: source.clone(),
    })
}
