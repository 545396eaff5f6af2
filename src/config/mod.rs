use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Yandex Disk configuration
    pub storage: StorageConfig,

    /// ffmpeg / ffprobe settings
    pub media: MediaConfig,

    /// Speech recognition settings
    pub recognizer: RecognizerConfig,

    /// Application settings
    pub app: AppConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// REST API base URL
    pub api_base: String,

    /// OAuth server used by the `token` command
    pub oauth_base: String,

    /// Folder transcripts are published to when the source is a public link
    pub publish_folder: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    pub ffmpeg_path: String,
    pub ffprobe_path: String,

    /// Bitrate of the extracted MP3 track
    pub audio_bitrate: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognizerConfig {
    /// whisper.cpp command line binary
    pub whisper_binary: String,

    /// Directory holding `ggml-*.bin` models (defaults to `<install root>/models`)
    pub models_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Scratch directory for downloads (defaults to `<install root>/tmp`)
    pub scratch_dir: Option<PathBuf>,

    /// Upload the transcript next to the source video
    pub upload_transcript: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: StorageConfig {
                api_base: "https://cloud-api.yandex.net/v1/disk".to_string(),
                oauth_base: "https://oauth.yandex.ru".to_string(),
                publish_folder: None,
                // Large videos are streamed through a single request
                timeout_secs: 3600,
            },
            media: MediaConfig {
                ffmpeg_path: "ffmpeg".to_string(),
                ffprobe_path: "ffprobe".to_string(),
                audio_bitrate: "128k".to_string(),
            },
            recognizer: RecognizerConfig {
                whisper_binary: "whisper-cli".to_string(),
                models_dir: None,
            },
            app: AppConfig {
                scratch_dir: None,
                upload_transcript: true,
            },
        }
    }
}

impl Config {
    /// Load configuration from file or create default
    pub async fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = fs_err::read_to_string(&config_path)
                .context("Failed to read config file")?;

            let config: Config = serde_yaml::from_str(&content)
                .context("Failed to parse config file")?;

            config.validate()?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save().await?;
            Ok(config)
        }
    }

    /// Save configuration to file
    pub async fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self)
            .context("Failed to serialize config")?;

        fs_err::write(&config_path, content)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    pub fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?;

        Ok(config_dir.join("yadisk-transcriber").join("config.yaml"))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.storage.api_base)
            .with_context(|| format!("Invalid storage.api_base: {}", self.storage.api_base))?;

        Url::parse(&self.storage.oauth_base)
            .with_context(|| format!("Invalid storage.oauth_base: {}", self.storage.oauth_base))?;

        if self.storage.timeout_secs == 0 {
            anyhow::bail!("storage.timeout_secs must be positive");
        }

        if self.media.ffmpeg_path.is_empty() || self.media.ffprobe_path.is_empty() {
            anyhow::bail!("media.ffmpeg_path and media.ffprobe_path must be set");
        }

        if self.recognizer.whisper_binary.is_empty() {
            anyhow::bail!("recognizer.whisper_binary must be set");
        }

        Ok(())
    }

    /// Display current configuration
    pub fn display(&self) -> Result<()> {
        println!("Current Configuration:");
        println!("  Disk API: {}", self.storage.api_base);
        match &self.storage.publish_folder {
            Some(folder) => println!("  Publish Folder (public links): {}", folder),
            None => println!("  Publish Folder (public links): not set"),
        }
        println!("  ffmpeg: {}", self.media.ffmpeg_path);
        println!("  ffprobe: {}", self.media.ffprobe_path);
        println!("  Whisper: {}", self.recognizer.whisper_binary);
        println!("  Models Dir: {}", self.models_dir()?.display());
        println!("  Scratch Dir: {}", self.scratch_dir()?.display());
        println!("  Upload Transcript: {}", self.app.upload_transcript);
        Ok(())
    }

    /// Explain where to edit the configuration
    pub async fn interactive_setup(&self) -> Result<()> {
        println!("Interactive configuration setup is not available.");
        println!("Please edit the config file manually:");
        println!("  {}", Self::config_path()?.display());
        Ok(())
    }

    /// Scratch directory, resolved against the install root when not configured
    pub fn scratch_dir(&self) -> Result<PathBuf> {
        match &self.app.scratch_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(install_root()?.join("tmp")),
        }
    }

    /// Model directory, resolved against the install root when not configured
    pub fn models_dir(&self) -> Result<PathBuf> {
        match &self.recognizer.models_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(install_root()?.join("models")),
        }
    }
}

/// Directory the program is installed in.
///
/// This is the directory holding the executable, or its parent when the
/// executable lives in a `bin/` directory.
pub fn install_root() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("Could not locate the running executable")?;
    let exe = exe.canonicalize().unwrap_or(exe);

    let exe_dir = exe
        .parent()
        .context("Executable path has no parent directory")?;

    let root = match (exe_dir.file_name(), exe_dir.parent()) {
        (Some(name), Some(parent)) if name == "bin" => parent,
        _ => exe_dir,
    };

    Ok(root.to_path_buf())
}
