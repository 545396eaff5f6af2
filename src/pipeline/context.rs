use std::path::{Path, PathBuf};

use super::cleanup::{remove_scratch_files, CleanupReport};
use super::TranscriptionResult;
use crate::storage::SourceId;
use crate::Stage;

/// Scratch paths created during one run.
///
/// Paths are recorded before the file is written. Dropping the guard without
/// calling [`ScratchFiles::release`] still removes the files.
#[derive(Debug, Default)]
pub struct ScratchFiles {
    video: Option<PathBuf>,
    audio: Option<PathBuf>,
    released: bool,
}

impl ScratchFiles {
    pub fn track_video(&mut self, path: PathBuf) {
        self.video = Some(path);
        self.released = false;
    }

    pub fn track_audio(&mut self, path: PathBuf) {
        self.audio = Some(path);
        self.released = false;
    }

    pub fn video(&self) -> Option<&Path> {
        self.video.as_deref()
    }

    pub fn audio(&self) -> Option<&Path> {
        self.audio.as_deref()
    }

    /// Remove every tracked file and report the outcome
    pub fn release(&mut self) -> CleanupReport {
        self.released = true;
        remove_scratch_files(self.video(), self.audio())
    }
}

impl Drop for ScratchFiles {
    fn drop(&mut self) {
        if !self.released {
            self.release();
        }
    }
}

/// State of a single pipeline run
#[derive(Debug)]
pub struct RunContext {
    pub source: SourceId,

    /// Stage currently executing (or the one that failed)
    pub stage: Stage,

    pub scratch: ScratchFiles,

    /// Transcript, kept so a failed publish can still report it
    pub transcript: Option<TranscriptionResult>,
}

impl RunContext {
    pub fn new(source: SourceId) -> Self {
        Self {
            source,
            stage: Stage::Acquire,
            scratch: ScratchFiles::default(),
            transcript: None,
        }
    }
}
