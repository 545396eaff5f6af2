use super::{Destination, TranscriptionResult};
use crate::storage::{CloudStorage, SourceId};
use crate::utils::scratch_timestamp;
use crate::{PipelineError, StageResult};

/// Name of the uploaded transcript, e.g. `transcription_20240101_120000_000001.txt`
pub fn transcript_file_name() -> String {
    format!("transcription_{}.txt", scratch_timestamp())
}

/// Resolve the remote path the transcript is uploaded to.
///
/// Next to a remote source the leaf name is replaced; a public link has no
/// folder of its own and falls back to `fallback_folder`.
pub fn destination_path(
    source: &SourceId,
    destination: &Destination,
    fallback_folder: Option<&str>,
    file_name: &str,
) -> StageResult<String> {
    match (destination, source) {
        (Destination::Folder(folder), _) => join_folder(folder, file_name),
        (Destination::BesideSource, SourceId::RemotePath(path)) => {
            if path.ends_with('/') {
                return Err(PipelineError::Path(format!(
                    "{} names a folder, not a file",
                    path
                )));
            }

            match path.rfind('/') {
                Some(idx) => Ok(format!("{}{}", &path[..=idx], file_name)),
                None if path.starts_with("disk:") => Ok(format!("disk:/{}", file_name)),
                None => Ok(format!("/{}", file_name)),
            }
        }
        (Destination::BesideSource, SourceId::PublicUrl(url)) => match fallback_folder {
            Some(folder) => join_folder(folder, file_name),
            None => Err(PipelineError::Path(format!(
                "public link {} has no containing folder; set storage.publish_folder \
                 or pass --upload-to",
                url
            ))),
        },
    }
}

fn join_folder(folder: &str, file_name: &str) -> StageResult<String> {
    let folder = folder.trim();
    if folder.is_empty() {
        return Err(PipelineError::Path("destination folder is empty".to_string()));
    }

    if folder.ends_with('/') || folder.ends_with(':') {
        Ok(format!("{}{}", folder, file_name))
    } else {
        Ok(format!("{}/{}", folder, file_name))
    }
}

/// Upload the transcript and return the remote path it was written to
pub async fn publish(
    storage: &dyn CloudStorage,
    transcript: &TranscriptionResult,
    destination: &Destination,
    fallback_folder: Option<&str>,
) -> StageResult<String> {
    tracing::info!("Step 4/4: Uploading transcription to Yandex Disk...");

    let remote_path = destination_path(
        &transcript.source,
        destination,
        fallback_folder,
        &transcript_file_name(),
    )?;
    tracing::info!("Uploading transcript to: {}", remote_path);

    storage.upload_text(&remote_path, &transcript.text).await?;
    tracing::info!("Transcription uploaded successfully");

    Ok(remote_path)
}
