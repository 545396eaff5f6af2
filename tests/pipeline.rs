use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use yadisk_transcriber::media::{AudioTrack, MediaToolkit, VideoClip};
use yadisk_transcriber::pipeline::{Destination, PipelineSettings, TranscriptionPipeline};
use yadisk_transcriber::recognizer::SpeechRecognizer;
use yadisk_transcriber::storage::{CloudStorage, RemoteFile, SourceId};
use yadisk_transcriber::{PipelineError, Stage, StageResult};

type Uploads = Arc<Mutex<Vec<(String, String)>>>;

/// In-memory disk keyed by the source's display form
struct FakeDisk {
    files: HashMap<String, Vec<u8>>,
    uploads: Uploads,
}

impl FakeDisk {
    fn with_file(source: &str, content: Vec<u8>) -> (Self, Uploads) {
        let uploads = Uploads::default();
        let mut files = HashMap::new();
        files.insert(source.to_string(), content);
        (
            Self {
                files,
                uploads: uploads.clone(),
            },
            uploads,
        )
    }
}

#[async_trait]
impl CloudStorage for FakeDisk {
    async fn check_token(&self) -> StageResult<bool> {
        Ok(true)
    }

    async fn exists(&self, source: &SourceId) -> StageResult<bool> {
        Ok(self.files.contains_key(&source.to_string()))
    }

    async fn metadata(&self, source: &SourceId) -> StageResult<RemoteFile> {
        let content = self
            .files
            .get(&source.to_string())
            .ok_or_else(|| PipelineError::NotFound(source.to_string()))?;

        Ok(RemoteFile {
            name: source.leaf_name().unwrap_or_default(),
            size: content.len() as u64,
            mime_type: None,
        })
    }

    async fn download(&self, source: &SourceId, local_path: &Path) -> StageResult<()> {
        let content = self
            .files
            .get(&source.to_string())
            .ok_or_else(|| PipelineError::NotFound(source.to_string()))?;

        fs_err::write(local_path, content).map_err(|e| PipelineError::Write(e.to_string()))
    }

    async fn upload_text(&self, remote_path: &str, content: &str) -> StageResult<()> {
        self.uploads
            .lock()
            .unwrap()
            .push((remote_path.to_string(), content.to_string()));
        Ok(())
    }
}

/// Pretends every video has one audio stream and writes a small MP3 stand-in
struct FakeMedia;

#[async_trait]
impl MediaToolkit for FakeMedia {
    async fn open_video(&self, path: &Path) -> StageResult<VideoClip> {
        Ok(VideoClip {
            path: path.to_path_buf(),
            duration: Some(512.0),
            audio: Some(AudioTrack {
                index: 1,
                codec: Some("aac".to_string()),
            }),
        })
    }

    async fn write_audio(&self, _clip: &VideoClip, _track: &AudioTrack, output: &Path) -> StageResult<()> {
        fs_err::write(output, b"ID3").map_err(|e| PipelineError::Write(e.to_string()))
    }
}

enum FakeRecognizer {
    Says(&'static str),
    MissingModel,
}

#[async_trait]
impl SpeechRecognizer for FakeRecognizer {
    async fn transcribe(&self, audio_path: &Path) -> StageResult<String> {
        match self {
            FakeRecognizer::Says(text) if audio_path.exists() => Ok(text.to_string()),
            FakeRecognizer::Says(_) => Err(PipelineError::Transcription("audio missing".to_string())),
            FakeRecognizer::MissingModel => Err(PipelineError::ModelUnavailable(
                "ggml-medium.bin not found".to_string(),
            )),
        }
    }
}

fn mov_bytes(len: usize) -> Vec<u8> {
    let mut bytes = b"\x00\x00\x00\x14ftypqt  ".to_vec();
    bytes.resize(len, 0x42);
    bytes
}

fn build(
    disk: FakeDisk,
    recognizer: FakeRecognizer,
    scratch_dir: &Path,
    publish_folder: Option<&str>,
) -> TranscriptionPipeline {
    TranscriptionPipeline::new(
        Box::new(disk),
        Box::new(FakeMedia),
        Box::new(recognizer),
        PipelineSettings {
            scratch_dir: scratch_dir.to_path_buf(),
            publish_folder: publish_folder.map(str::to_string),
        },
    )
}

fn scratch_is_empty(dir: &Path) -> bool {
    fs_err::read_dir(dir)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(true)
}

#[tokio::test]
async fn demo_clip_is_transcribed_published_and_cleaned() {
    let dir = tempfile::tempdir().unwrap();
    let scratch = dir.path().join("tmp");
    let (disk, uploads) = FakeDisk::with_file("/clips/demo.mov", mov_bytes(512 * 1024));

    let pipeline = build(disk, FakeRecognizer::Says("Привет, мир"), &scratch, None);
    let source = SourceId::parse("/clips/demo.mov").unwrap();
    let report = pipeline
        .run(&source, Some(&Destination::BesideSource))
        .await
        .unwrap();

    assert_eq!(report.transcript.text, "Привет, мир");
    assert_eq!(report.video.path.parent(), Some(scratch.as_path()));
    assert_eq!(report.video.path.extension().unwrap(), "mov");
    assert_eq!(report.audio.path.extension().unwrap(), "mp3");
    assert!(!report.video.path.exists());
    assert!(!report.audio.path.exists());
    assert!(scratch_is_empty(&scratch));

    let uploads = uploads.lock().unwrap();
    assert_eq!(uploads.len(), 1);
    assert!(uploads[0].0.starts_with("/clips/transcription_"));
    assert!(uploads[0].0.ends_with(".txt"));
    assert_eq!(uploads[0].1, "Привет, мир");
}

#[test]
fn missing_source_creates_no_files() {
    let dir = tempfile::tempdir().unwrap();
    let scratch = dir.path().join("tmp");
    let (disk, uploads) = FakeDisk::with_file("/clips/demo.mov", mov_bytes(4096));

    let pipeline = build(disk, FakeRecognizer::Says("unused"), &scratch, None);
    let source = SourceId::parse("/clips/other.mov").unwrap();
    let failure = tokio_test::block_on(pipeline.run(&source, Some(&Destination::BesideSource)))
        .unwrap_err();

    assert!(matches!(failure.error, PipelineError::NotFound(_)));
    assert_eq!(failure.stage, Stage::Acquire);
    assert!(failure.cleanup.removed.is_empty());
    assert!(scratch_is_empty(&scratch));
    assert!(uploads.lock().unwrap().is_empty());
}

#[tokio::test]
async fn model_failure_is_reported_as_model_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let (disk, _) = FakeDisk::with_file("/clips/demo.mov", mov_bytes(4096));

    let pipeline = build(disk, FakeRecognizer::MissingModel, dir.path(), None);
    let source = SourceId::parse("/clips/demo.mov").unwrap();
    let failure = pipeline.run(&source, None).await.unwrap_err();

    assert_eq!(failure.error.kind(), "ModelUnavailable");
    assert_eq!(failure.stage, Stage::Transcribe);
    let removed: Vec<PathBuf> = failure.cleanup.removed.clone();
    assert_eq!(removed.len(), 2);
    assert!(removed.iter().all(|path| !path.exists()));
    assert!(scratch_is_empty(dir.path()));
}

#[tokio::test]
async fn public_link_without_publish_folder_keeps_transcript() {
    let dir = tempfile::tempdir().unwrap();
    let link = "https://disk.yandex.ru/d/AbCdEf";
    let (disk, uploads) = FakeDisk::with_file(link, mov_bytes(4096));

    let pipeline = build(disk, FakeRecognizer::Says("shared clip"), dir.path(), None);
    let source = SourceId::parse(link).unwrap();
    let failure = pipeline
        .run(&source, Some(&Destination::BesideSource))
        .await
        .unwrap_err();

    assert!(matches!(failure.error, PipelineError::Path(_)));
    assert_eq!(failure.stage, Stage::Publish);
    assert_eq!(failure.transcript.unwrap().text, "shared clip");
    assert!(uploads.lock().unwrap().is_empty());
    assert!(scratch_is_empty(dir.path()));
}

#[tokio::test]
async fn public_link_publishes_to_configured_folder() {
    let dir = tempfile::tempdir().unwrap();
    let link = "https://disk.yandex.ru/d/AbCdEf";
    let (disk, uploads) = FakeDisk::with_file(link, mov_bytes(4096));

    let pipeline = build(
        disk,
        FakeRecognizer::Says("shared clip"),
        dir.path(),
        Some("/transcripts"),
    );
    let source = SourceId::parse(link).unwrap();
    let report = pipeline
        .run(&source, Some(&Destination::BesideSource))
        .await
        .unwrap();

    let published = report.published_to.unwrap();
    assert!(published.starts_with("/transcripts/transcription_"));
    assert_eq!(uploads.lock().unwrap()[0].0, published);
}

#[tokio::test]
async fn concurrent_runs_share_a_scratch_dir_without_collisions() {
    let dir = tempfile::tempdir().unwrap();
    let (first_disk, _) = FakeDisk::with_file("/a/one.mp4", mov_bytes(4096));
    let (second_disk, _) = FakeDisk::with_file("/b/two.mp4", mov_bytes(4096));

    let first = build(first_disk, FakeRecognizer::Says("one"), dir.path(), None);
    let second = build(second_disk, FakeRecognizer::Says("two"), dir.path(), None);
    let first_source = SourceId::parse("/a/one.mp4").unwrap();
    let second_source = SourceId::parse("/b/two.mp4").unwrap();

    let (first_report, second_report) = tokio::join!(
        first.run(&first_source, None),
        second.run(&second_source, None)
    );
    let (first_report, second_report) = (first_report.unwrap(), second_report.unwrap());

    assert_ne!(first_report.video.path, second_report.video.path);
    assert_ne!(first_report.audio.path, second_report.audio.path);
    assert_eq!(first_report.transcript.text, "one");
    assert_eq!(second_report.transcript.text, "two");
    assert!(scratch_is_empty(dir.path()));
}
