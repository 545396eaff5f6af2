use chrono::{DateTime, Local};
use indicatif::{ProgressBar, ProgressStyle};
use std::borrow::Cow;
use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

/// Extension used for scratch videos whose remote name carries no usable extension
pub const DEFAULT_VIDEO_EXTENSION: &str = "mov";

/// Files below this size are inspected for markup before being accepted as video
pub const SUSPICIOUS_SIZE_BYTES: u64 = 1024;

static LAST_TIMESTAMP_MICROS: AtomicI64 = AtomicI64::new(0);

/// Generate a scratch timestamp (`YYYYmmdd_HHMMSS_ffffff`, local time).
///
/// Values are strictly increasing within the process, so two calls made in the
/// same microsecond still produce different names.
pub fn scratch_timestamp() -> String {
    let now = Local::now().timestamp_micros();
    let mut last = LAST_TIMESTAMP_MICROS.load(Ordering::Relaxed);
    let micros = loop {
        let next = now.max(last + 1);
        match LAST_TIMESTAMP_MICROS.compare_exchange_weak(
            last,
            next,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => break next,
            Err(actual) => last = actual,
        }
    };

    format_timestamp_micros(micros)
}

fn format_timestamp_micros(micros: i64) -> String {
    let secs = micros.div_euclid(1_000_000);
    let nanos = (micros.rem_euclid(1_000_000) * 1_000) as u32;

    match DateTime::from_timestamp(secs, nanos) {
        Some(utc) => utc
            .with_timezone(&Local)
            .format("%Y%m%d_%H%M%S_%6f")
            .to_string(),
        None => micros.to_string(),
    }
}

/// Build a scratch file name such as `video_20240101_120000_000001.mov`
pub fn scratch_file_name(prefix: &str, extension: &str) -> String {
    format!("{}_{}.{}", prefix, scratch_timestamp(), extension)
}

/// Map a remote file name to the extension used for its scratch copy.
///
/// The extension is lowercased and must be 1-8 ASCII alphanumerics; anything else
/// (no extension, dotfiles, odd characters) maps to [`DEFAULT_VIDEO_EXTENSION`].
pub fn video_extension(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.len() <= 8)
        .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_else(|| DEFAULT_VIDEO_EXTENSION.to_string())
}

/// Guess the MIME type for a file extension
pub fn mime_type_for_extension(extension: &str) -> Option<&'static str> {
    let mime = match extension.to_ascii_lowercase().as_str() {
        "mp4" => "video/mp4",
        "m4v" => "video/x-m4v",
        "mov" | "qt" => "video/quicktime",
        "mkv" => "video/x-matroska",
        "webm" => "video/webm",
        "avi" => "video/x-msvideo",
        "wmv" => "video/x-ms-wmv",
        "flv" => "video/x-flv",
        "mpg" | "mpeg" => "video/mpeg",
        "3gp" => "video/3gpp",
        "ts" => "video/mp2t",
        "mp3" => "audio/mpeg",
        "m4a" => "audio/mp4",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "flac" => "audio/flac",
        "txt" => "text/plain",
        "htm" | "html" => "text/html",
        _ => return None,
    };

    Some(mime)
}

/// Format file size in human-readable format
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    const THRESHOLD: f64 = 1024.0;

    if bytes == 0 {
        return "0 B".to_string();
    }

    let bytes_f = bytes as f64;
    let unit_index = (bytes_f.log10() / THRESHOLD.log10()).floor() as usize;
    let unit_index = unit_index.min(UNITS.len() - 1);

    let size = bytes_f / THRESHOLD.powi(unit_index as i32);

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

/// Format duration in human-readable format
pub fn format_duration(seconds: f64) -> String {
    let total_seconds = seconds as u64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

/// Spinner for long-running external work; hidden when progress output is disabled
pub fn spinner(message: impl Into<Cow<'static, str>>, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }

    let progress = ProgressBar::new_spinner();
    progress.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    progress.enable_steady_tick(Duration::from_millis(120));
    progress.set_message(message);
    progress
}

/// Byte progress bar for downloads; hidden when progress output is disabled
pub fn byte_bar(total: u64, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }

    let progress = ProgressBar::new(total);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    progress
}

/// Check that the external tools used by the pipeline can be started
pub async fn check_dependencies(ffmpeg: &str, ffprobe: &str, whisper: &str) -> Vec<String> {
    let mut missing = Vec::new();

    if !check_command_available(ffmpeg, "-version").await {
        missing.push(format!("{} - required for audio extraction", ffmpeg));
    }

    if !check_command_available(ffprobe, "-version").await {
        missing.push(format!("{} - required for reading video containers", ffprobe));
    }

    if !check_command_available(whisper, "--help").await {
        missing.push(format!("{} - required for speech recognition", whisper));
    }

    missing
}

/// Check if a command can be spawned (exit status is ignored)
async fn check_command_available(command: &str, probe_arg: &str) -> bool {
    use tokio::process::Command;

    Command::new(command)
        .arg(probe_arg)
        .output()
        .await
        .is_ok()
}
