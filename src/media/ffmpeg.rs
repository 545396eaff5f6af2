use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use super::{AudioTrack, MediaToolkit, VideoClip};
use crate::config::MediaConfig;
use crate::utils::spinner;
use crate::{PipelineError, StageResult};

/// ffprobe/ffmpeg backed media toolkit.
///
/// Every child process is spawned with `kill_on_drop`, so dropping a pending
/// call terminates the decoder instead of leaving it writing to a scratch file.
pub struct FfmpegToolkit {
    ffmpeg_path: String,
    ffprobe_path: String,
    audio_bitrate: String,
    show_progress: bool,
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    index: u32,
    codec_type: Option<String>,
    codec_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

impl FfmpegToolkit {
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            ffmpeg_path: config.ffmpeg_path.clone(),
            ffprobe_path: config.ffprobe_path.clone(),
            audio_bitrate: config.audio_bitrate.clone(),
            show_progress: true,
        }
    }

    /// Enable or disable the encoding spinner
    pub fn with_progress(mut self, visible: bool) -> Self {
        self.show_progress = visible;
        self
    }
}

/// Turn ffprobe JSON into a clip description
fn parse_probe(path: &Path, json: &[u8]) -> StageResult<VideoClip> {
    let probe: ProbeOutput = serde_json::from_slice(json)
        .map_err(|e| PipelineError::Decode(format!("unreadable ffprobe output: {}", e)))?;

    let duration = probe
        .format
        .and_then(|format| format.duration)
        .and_then(|duration| duration.parse::<f64>().ok());

    let audio = probe
        .streams
        .into_iter()
        .find(|stream| stream.codec_type.as_deref() == Some("audio"))
        .map(|stream| AudioTrack {
            index: stream.index,
            codec: stream.codec_name,
        });

    Ok(VideoClip {
        path: path.to_path_buf(),
        duration,
        audio,
    })
}

/// Last few lines of a tool's stderr, enough to explain a failure
fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().filter(|line| !line.trim().is_empty()).collect();
    lines[lines.len().saturating_sub(5)..].join("\n")
}

#[async_trait]
impl MediaToolkit for FfmpegToolkit {
    async fn open_video(&self, path: &Path) -> StageResult<VideoClip> {
        tracing::debug!("Probing {} with {}", path.display(), self.ffprobe_path);

        let output = Command::new(&self.ffprobe_path)
            .args(["-v", "error", "-print_format", "json", "-show_format", "-show_streams"])
            .arg(path)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                PipelineError::Decode(format!("failed to run {}: {}", self.ffprobe_path, e))
            })?;

        if !output.status.success() {
            return Err(PipelineError::Decode(format!(
                "{} rejected {}: {}",
                self.ffprobe_path,
                path.display(),
                stderr_tail(&output.stderr)
            )));
        }

        parse_probe(path, &output.stdout)
    }

    async fn write_audio(&self, clip: &VideoClip, track: &AudioTrack, output: &Path) -> StageResult<()> {
        let progress = spinner("Encoding audio track...", self.show_progress);
        let map = format!("0:{}", track.index);

        let result = Command::new(&self.ffmpeg_path)
            .args(["-nostdin", "-y", "-v", "error", "-i"])
            .arg(&clip.path)
            .args(["-map", map.as_str(), "-vn", "-acodec", "libmp3lame", "-b:a"])
            .arg(&self.audio_bitrate)
            .arg(output)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await;

        progress.finish_and_clear();

        let result = result.map_err(|e| {
            PipelineError::Write(format!("failed to run {}: {}", self.ffmpeg_path, e))
        })?;

        if !result.status.success() {
            return Err(PipelineError::Write(format!(
                "{} could not write {}: {}",
                self.ffmpeg_path,
                output.display(),
                stderr_tail(&result.stderr)
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROBE_WITH_AUDIO: &str = r#"{
        "streams": [
            {"index": 0, "codec_type": "video", "codec_name": "h264"},
            {"index": 1, "codec_type": "audio", "codec_name": "aac"}
        ],
        "format": {"duration": "12.480000"}
    }"#;

    #[test]
    fn test_parse_probe_finds_audio_track() {
        let clip = parse_probe(Path::new("video.mov"), PROBE_WITH_AUDIO.as_bytes()).unwrap();

        assert_eq!(clip.duration, Some(12.48));
        assert_eq!(
            clip.audio,
            Some(AudioTrack { index: 1, codec: Some("aac".to_string()) })
        );
    }

    #[test]
    fn test_parse_probe_without_audio() {
        let json = r#"{"streams": [{"index": 0, "codec_type": "video"}], "format": {}}"#;
        let clip = parse_probe(Path::new("silent.mp4"), json.as_bytes()).unwrap();

        assert_eq!(clip.audio, None);
        assert_eq!(clip.duration, None);
    }

    #[test]
    fn test_parse_probe_rejects_garbage() {
        let err = parse_probe(Path::new("x.mov"), b"<html>").unwrap_err();
        assert!(matches!(err, PipelineError::Decode(_)));
    }

    #[test]
    fn test_stderr_tail_keeps_last_lines() {
        let stderr = b"a\nb\n\nc\nd\ne\nf\ng\n";
        assert_eq!(stderr_tail(stderr), "c\nd\ne\nf\ng");
    }
}
