use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::path::PathBuf;

use clipask::{FFmpeg, PromptSpec, QueryOrchestrator, SegmentExtractor};

use super::{env_var, init_logging, CommonArgs, SegmentArgs};

#[derive(Parser, Debug)]
pub struct AskArgs {
    #[command(flatten)]
    pub segment: SegmentArgs,

    /// Path to the prompt file (UTF-8 only)
    #[arg(short, long)]
    pub prompt: PathBuf,

    /// Temperature between 0 and 1, higher is more random
    #[arg(short, long, default_value_t = 0.0)]
    pub temperature: f64,

    #[command(flatten)]
    pub common: CommonArgs,
}

pub fn run(args: AskArgs) -> Result<()> {
    init_logging(args.common.verbose);

    let config = args.common.load_config()?;
    let settings = config.llm_settings(env_var)?;

    // Reject bad inputs before any work starts
    let request = args.segment.to_request()?;
    let prompt = PromptSpec::load(&args.prompt, args.temperature)?;

    info!("provider: {}", settings.provider);
    info!("model: {}", settings.model);
    info!("video_path: {}", request.source_path().display());
    info!("audio: {}", request.include_audio());
    info!("start_second: {}", request.start_second());
    info!("duration_seconds: {}", request.duration_seconds());
    info!("width: {}", request.width());
    info!("temperature: {}", prompt.temperature);
    info!("prompt: {}", prompt.text);

    FFmpeg::check_ffmpeg()?;

    let quiet = config.transcoder.quiet && !args.common.verbose;
    let extractor = SegmentExtractor::new(config.cache(), FFmpeg::new(quiet));
    let segment = extractor
        .extract(&request)
        .context("Failed to extract video segment")?;

    let orchestrator = QueryOrchestrator::from_settings(&settings);
    let response = orchestrator
        .query(&segment, &prompt)
        .context("Failed to query the model")?;

    println!("{}", response.result);
    Ok(())
}
