use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};

use crate::pipeline::Destination;

#[derive(Parser)]
#[command(
    name = "yadisk-transcriber",
    about = "Yandex Disk Transcriber - Transcribe videos stored on Yandex Disk with Whisper",
    version,
    long_about = "Downloads a video from Yandex Disk, extracts its audio with ffmpeg, transcribes it with a local Whisper model and uploads the transcript next to the video. Temporary files are always removed."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Transcribe a video from Yandex Disk
    Transcribe {
        /// Yandex Disk OAuth token
        #[arg(
            long = "disk-token",
            alias = "disk_token",
            env = "YADISK_TOKEN",
            hide_env_values = true,
            value_name = "TOKEN"
        )]
        disk_token: String,

        /// Disk path or public link of the video (prompted for if omitted)
        #[arg(short, long, value_name = "PATH_OR_URL")]
        source: Option<String>,

        /// Do not upload the transcript back to Yandex Disk
        #[arg(long, conflicts_with = "upload_to")]
        no_upload: bool,

        /// Upload the transcript to this Disk folder instead of next to the video
        #[arg(long, value_name = "FOLDER")]
        upload_to: Option<String>,
    },

    /// Obtain a Yandex Disk OAuth token with a confirmation code
    Token {
        /// OAuth application ID
        #[arg(long, env = "YADISK_CLIENT_ID", value_name = "ID")]
        client_id: String,

        /// OAuth application secret
        #[arg(long, env = "YADISK_CLIENT_SECRET", hide_env_values = true, value_name = "SECRET")]
        client_secret: String,
    },

    /// Show or edit the configuration
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },
}

/// Decide where (and whether) the transcript is published
pub fn destination(
    no_upload: bool,
    upload_to: Option<String>,
    upload_by_default: bool,
) -> Option<Destination> {
    match upload_to {
        Some(folder) => Some(Destination::Folder(folder)),
        None if no_upload || !upload_by_default => None,
        None => Some(Destination::BesideSource),
    }
}

/// Ask the user for one line of input on stdin
pub fn prompt(message: &str) -> Result<String> {
    let stdin = io::stdin();
    prompt_from(message, &mut stdin.lock(), &mut io::stdout())
}

fn prompt_from(message: &str, input: &mut impl BufRead, output: &mut impl Write) -> Result<String> {
    write!(output, "{}", message)?;
    output.flush()?;

    let mut line = String::new();
    let read = input.read_line(&mut line).context("Failed to read from stdin")?;
    if read == 0 {
        anyhow::bail!("No input provided");
    }

    Ok(line.trim().to_string())
}
