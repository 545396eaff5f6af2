use std::path::Path;

use super::context::RunContext;
use super::{ScratchAudioFile, ScratchVideoFile};
use crate::media::MediaToolkit;
use crate::utils::scratch_file_name;
use crate::{PipelineError, StageResult};

/// Container/extension of the extracted audio track
pub const AUDIO_EXTENSION: &str = "mp3";

/// Extract the audio track of the scratch video into a scratch MP3
pub async fn extract(
    media: &dyn MediaToolkit,
    ctx: &mut RunContext,
    video: &ScratchVideoFile,
    scratch_dir: &Path,
) -> StageResult<ScratchAudioFile> {
    tracing::info!("Step 2/4: Extracting audio from video...");
    tracing::info!("Loading video file: {}", video.path.display());

    let clip = media.open_video(&video.path).await?;
    match clip.duration {
        Some(duration) => tracing::info!("Video loaded. Duration: {:.2} seconds", duration),
        None => tracing::info!("Video loaded. Duration unknown"),
    }

    let track = clip
        .audio
        .clone()
        .ok_or_else(|| PipelineError::NoAudioTrack(video.path.clone()))?;

    let path = scratch_dir.join(scratch_file_name("audio", AUDIO_EXTENSION));
    ctx.scratch.track_audio(path.clone());
    tracing::info!("Extracting audio to: {}", path.display());

    media.write_audio(&clip, &track, &path).await?;
    tracing::info!("Audio extracted successfully");

    Ok(ScratchAudioFile {
        path,
        duration_seconds: clip.duration,
    })
}
