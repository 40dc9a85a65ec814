use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use clipask::{Config, Error, SegmentRequest};

pub mod ask;
pub mod clean;
pub mod extract;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Clip a video and ask an LLM about it
    Ask(ask::AskArgs),
    /// Clip a video without asking anything
    Extract(extract::ExtractArgs),
    /// Remove cached segments
    Clean(clean::CleanArgs),
}

/// Which part of the video to send
#[derive(Args, Debug)]
pub struct SegmentArgs {
    /// Path to the input video file
    #[arg(short = 'f', long = "file")]
    pub file: PathBuf,

    /// Start of the segment in seconds
    #[arg(short, long, default_value_t = 0.0)]
    pub start: f64,

    /// Length of the segment in seconds
    #[arg(short = 'e', long = "duration", default_value_t = 300.0)]
    pub duration: f64,

    /// Keep the audio track
    #[arg(short, long)]
    pub audio: bool,

    /// Width of the compressed video (height follows the aspect ratio)
    #[arg(short, long, default_value_t = 640)]
    pub width: u32,
}

impl SegmentArgs {
    /// Validate the arguments into a request, the source has to exist
    pub fn to_request(&self) -> Result<SegmentRequest, Error> {
        if !self.file.is_file() {
            return Err(Error::InvalidRequest(format!(
                "video file does not exist: {}",
                self.file.display()
            )));
        }

        SegmentRequest::new(
            self.file.clone(),
            self.start,
            self.duration,
            self.width,
            self.audio,
        )
    }
}

/// Options shared by every command
#[derive(Args, Debug)]
pub struct CommonArgs {
    /// Path to the config file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory for cached segments
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Include a hash of the video content in cache keys
    #[arg(long)]
    pub fingerprint: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl CommonArgs {
    /// Config file (or defaults), then environment, then command line
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;
        config.merge_env(env_var)?;

        if let Some(cache_dir) = &self.cache_dir {
            config.cache.directory = cache_dir.clone();
        }
        if self.fingerprint {
            config.cache.fingerprint = true;
        }

        Ok(config)
    }
}

pub fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Diagnostics go to stderr, stdout only carries the answer
pub fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}
