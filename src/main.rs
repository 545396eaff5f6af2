use anyhow::Result;
use clap::Parser;
use console::style;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use yadisk_transcriber::cli::{self, Cli, Commands};
use yadisk_transcriber::config::Config;
use yadisk_transcriber::media::ffmpeg::FfmpegToolkit;
use yadisk_transcriber::pipeline::{PipelineSettings, TranscriptionPipeline};
use yadisk_transcriber::recognizer::whisper::WhisperCli;
use yadisk_transcriber::storage::oauth::OAuthFlow;
use yadisk_transcriber::storage::yandex::YandexDiskClient;
use yadisk_transcriber::storage::{CloudStorage, SourceId};
use yadisk_transcriber::utils;

const RULE_WIDTH: usize = 60;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout carries only the transcript
    let default_filter = if cli.verbose {
        "yadisk_transcriber=debug"
    } else {
        "yadisk_transcriber=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::load().await?;

    match cli.command {
        Commands::Transcribe {
            disk_token,
            source,
            no_upload,
            upload_to,
        } => {
            run_transcription(&config, disk_token, source, no_upload, upload_to, !cli.quiet).await?;
        }
        Commands::Token {
            client_id,
            client_secret,
        } => {
            obtain_token(&config, client_id, client_secret).await?;
        }
        Commands::Config { show } => {
            if show {
                config.display()?;
            } else {
                config.interactive_setup().await?;
            }
        }
    }

    Ok(())
}

fn rule() -> String {
    "=".repeat(RULE_WIDTH)
}

async fn run_transcription(
    config: &Config,
    disk_token: String,
    source: Option<String>,
    no_upload: bool,
    upload_to: Option<String>,
    show_progress: bool,
) -> Result<()> {
    println!("{}", rule());
    println!("{}", style("Yandex Disk Video Whisper Transcription Tool").bold());
    println!("{}", rule());

    // Check for required external tools (non-fatal, paths may resolve later)
    let missing_deps = utils::check_dependencies(
        &config.media.ffmpeg_path,
        &config.media.ffprobe_path,
        &config.recognizer.whisper_binary,
    )
    .await;
    if !missing_deps.is_empty() {
        eprintln!("{}", style("Dependency check warnings:").yellow());
        for dep in missing_deps {
            eprintln!("   • {}", dep);
        }
        eprintln!("   (Continuing anyway - tools may be available)");
    }

    tracing::info!("Yandex Disk token provided");

    let raw_source = match source {
        Some(source) => source,
        None => cli::prompt("Enter file path from Yandex Disk (e.g., /folder/video.mov): ")?,
    };
    let source = SourceId::parse(&raw_source)?;
    let destination = cli::destination(no_upload, upload_to, config.app.upload_transcript);

    let storage = YandexDiskClient::new(disk_token, &config.storage)?.with_progress(show_progress);
    let media = FfmpegToolkit::new(&config.media).with_progress(show_progress);
    let recognizer = WhisperCli::new(&config.recognizer.whisper_binary, config.models_dir()?)
        .with_progress(show_progress);

    let pipeline = TranscriptionPipeline::new(
        Box::new(storage),
        Box::new(media),
        Box::new(recognizer),
        PipelineSettings {
            scratch_dir: config.scratch_dir()?,
            publish_folder: config.storage.publish_folder.clone(),
        },
    );

    match pipeline.run(&source, destination.as_ref()).await {
        Ok(report) => {
            println!("{}", rule());
            println!("{}", style("TRANSCRIPTION RESULT:").green().bold());
            println!("{}", rule());
            println!("{}", report.transcript.text);
            println!("{}", rule());

            if let Some(remote_path) = &report.published_to {
                println!("Transcript uploaded to: {}", remote_path);
            }
            println!(
                "Total processing time: {:.2} seconds",
                report.elapsed.as_secs_f64()
            );
            println!("{}", style("Process completed successfully!").green());
            Ok(())
        }
        Err(failure) => {
            eprintln!("{}", rule());
            eprintln!(
                "{}",
                style("[ERROR] An error occurred during processing").red().bold()
            );
            eprintln!("{}", rule());
            eprintln!("Stage: {}", failure.stage);
            eprintln!("Kind: {}", failure.error.kind());

            if let Some(transcript) = &failure.transcript {
                // The transcript was computed before the failure; don't lose it
                println!("{}", rule());
                println!("TRANSCRIPTION RESULT (not uploaded):");
                println!("{}", rule());
                println!("{}", transcript.text);
                println!("{}", rule());
            }

            for warning in &failure.cleanup.warnings {
                eprintln!("Cleanup warning: {}", warning);
            }

            Err(failure.error.into())
        }
    }
}

async fn obtain_token(config: &Config, client_id: String, client_secret: String) -> Result<()> {
    let flow = OAuthFlow::new(&config.storage.oauth_base, client_id, client_secret);

    println!("Go to the following url: {}", flow.authorize_url()?);
    let code = cli::prompt("Enter the confirmation code: ")?;

    let token = flow.exchange_code(&code).await?;
    let client = YandexDiskClient::new(token.access_token.clone(), &config.storage)?;

    if !client.check_token().await? {
        anyhow::bail!("Received a token but Yandex Disk rejected it");
    }

    println!("{}", style("Successfully received token!").green());
    println!("{}", token.access_token);
    if let Some(expires_in) = token.expires_in {
        println!("Expires in: {}", utils::format_duration(expires_in as f64));
    }
    if token.refresh_token.is_some() {
        tracing::debug!("A refresh token was issued as well");
    }

    Ok(())
}
