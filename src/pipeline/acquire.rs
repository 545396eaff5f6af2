use std::io::Read;
use std::path::Path;

use super::context::RunContext;
use super::ScratchVideoFile;
use crate::storage::{CloudStorage, RemoteFile};
use crate::utils::{
    format_file_size, mime_type_for_extension, scratch_file_name, video_extension,
    SUSPICIOUS_SIZE_BYTES,
};
use crate::{PipelineError, StageResult};

/// How many leading bytes of a small download are checked for markup
const SNIFF_BYTES: u64 = 100;

const MARKUP_SIGNATURES: &[&[u8]] = &[b"<html", b"<!doctype"];

/// Download the source video into the scratch directory
pub async fn acquire(
    storage: &dyn CloudStorage,
    ctx: &mut RunContext,
    scratch_dir: &Path,
) -> StageResult<ScratchVideoFile> {
    tracing::info!("Step 1/4: Downloading video from Yandex Disk...");
    tracing::info!("Input: {}", ctx.source);

    let token_valid = storage.check_token().await?;
    tracing::info!("Token validation: {}", if token_valid { "valid" } else { "invalid" });
    if !token_valid {
        return Err(PipelineError::AuthOrTransport(
            "Yandex Disk rejected the access token".to_string(),
        ));
    }

    tracing::info!("Checking if file exists on Yandex Disk: {}", ctx.source);
    if !storage.exists(&ctx.source).await? {
        return Err(PipelineError::NotFound(format!(
            "file not found on Yandex Disk: {}",
            ctx.source
        )));
    }

    let remote = storage.metadata(&ctx.source).await?;
    tracing::info!("File found: {} ({})", remote.name, format_file_size(remote.size));

    // Some resources come back without a name; the identifier's last segment stands in
    let name = match remote.name.as_str() {
        "" => ctx.source.leaf_name().unwrap_or_default(),
        name => name.to_string(),
    };
    let extension = video_extension(&name);
    let path = scratch_dir.join(scratch_file_name("video", &extension));
    ctx.scratch.track_video(path.clone());
    tracing::info!("Temporary video file: {}", path.display());

    storage.download(&ctx.source, &path).await?;
    tracing::info!("Video downloaded successfully");

    let size_bytes = validate_download(&path)?;
    check_remote_consistency(&remote, &extension, size_bytes);

    Ok(ScratchVideoFile {
        path,
        source: ctx.source.clone(),
        size_bytes,
    })
}

/// Check that a downloaded file looks like real content.
///
/// Fails with `CorruptDownload` when the file is missing, empty, or a small
/// file that starts like an HTML page. Returns the file size.
pub fn validate_download(path: &Path) -> StageResult<u64> {
    if !path.is_file() {
        return Err(PipelineError::CorruptDownload(format!(
            "downloaded file does not exist: {}",
            path.display()
        )));
    }

    let size = fs_err::metadata(path)
        .map_err(|e| PipelineError::CorruptDownload(e.to_string()))?
        .len();
    tracing::info!("Downloaded file size: {} bytes", size);

    if size == 0 {
        return Err(PipelineError::CorruptDownload(
            "downloaded file is empty; the file may not have been downloaded correctly"
                .to_string(),
        ));
    }

    if size < SUSPICIOUS_SIZE_BYTES {
        tracing::warn!(
            "File size is very small ({} bytes). This might be an error page.",
            size
        );

        let mut head = Vec::with_capacity(SNIFF_BYTES as usize);
        fs_err::File::open(path)
            .and_then(|file| file.take(SNIFF_BYTES).read_to_end(&mut head))
            .map_err(|e| PipelineError::CorruptDownload(e.to_string()))?;

        if looks_like_markup(&head) {
            return Err(PipelineError::CorruptDownload(
                "downloaded file appears to be an HTML page, not a video file; \
                 check the file path and permissions"
                    .to_string(),
            ));
        }
    }

    tracing::info!("File validation passed");
    Ok(size)
}

fn looks_like_markup(head: &[u8]) -> bool {
    let head = head.to_ascii_lowercase();
    MARKUP_SIGNATURES
        .iter()
        .any(|signature| head.windows(signature.len()).any(|window| window == *signature))
}

/// Warn (never fail) when the download disagrees with what the remote side reported
fn check_remote_consistency(remote: &RemoteFile, extension: &str, size_bytes: u64) {
    let mime_type = remote
        .mime_type
        .as_deref()
        .or_else(|| mime_type_for_extension(extension));

    if let Some(mime_type) = mime_type {
        if !mime_type.starts_with("video/") {
            tracing::warn!("File MIME type is {}, expected video/*", mime_type);
        }
    }

    if remote.size > 0 && remote.size != size_bytes {
        tracing::warn!(
            "Downloaded {} bytes but Yandex Disk reported {} bytes",
            size_bytes,
            remote.size
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let err = validate_download(&dir.path().join("nothing.mov")).unwrap_err();
        assert!(matches!(err, PipelineError::CorruptDownload(_)));
    }

    #[test]
    fn test_empty_file_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.mov");
        fs_err::write(&path, b"").unwrap();

        let err = validate_download(&path).unwrap_err();
        assert!(matches!(err, PipelineError::CorruptDownload(_)));
    }

    #[test]
    fn test_small_html_page_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.mov");
        fs_err::write(&path, b"  <!DOCTYPE html><html><body>Login required</body></html>").unwrap();

        let err = validate_download(&path).unwrap_err();
        assert!(matches!(err, PipelineError::CorruptDownload(_)));
    }

    #[test]
    fn test_small_binary_file_passes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiny.mov");
        fs_err::write(&path, [0u8, 0, 0, 0x14, b'f', b't', b'y', b'p']).unwrap();

        assert_eq!(validate_download(&path).unwrap(), 8);
    }

    #[test]
    fn test_large_file_is_not_sniffed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.mov");
        let mut content = b"<html>".to_vec();
        content.resize(4096, b'x');
        fs_err::write(&path, &content).unwrap();

        assert_eq!(validate_download(&path).unwrap(), 4096);
    }

    #[tokio::test]
    async fn test_unnamed_resource_takes_extension_from_source() {
        use crate::storage::{MockCloudStorage, SourceId};

        let dir = tempfile::tempdir().unwrap();
        let mut storage = MockCloudStorage::new();
        storage.expect_check_token().returning(|| Ok(true));
        storage.expect_exists().returning(|_| Ok(true));
        storage.expect_metadata().returning(|_| {
            Ok(RemoteFile {
                name: String::new(),
                size: 0,
                mime_type: None,
            })
        });
        storage
            .expect_download()
            .returning(|_, local: &Path| {
                fs_err::write(local, vec![0x42u8; 2048]).map_err(|e| PipelineError::Write(e.to_string()))
            });

        let mut ctx = RunContext::new(SourceId::parse("/clips/demo.MP4").unwrap());
        let video = acquire(&storage, &mut ctx, dir.path()).await.unwrap();

        assert_eq!(video.path.extension().unwrap(), "mp4");
        assert_eq!(ctx.scratch.video(), Some(video.path.as_path()));
    }

    #[test]
    fn test_looks_like_markup() {
        assert!(looks_like_markup(b"<HTML lang=\"ru\">"));
        assert!(looks_like_markup(b"\n\n<!doctype html>"));
        assert!(!looks_like_markup(b"\x00\x00\x00\x18ftypmp42"));
    }
}
