use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::fs;
use std::path::PathBuf;

use clipask::{FFmpeg, SegmentExtractor};

use super::{init_logging, CommonArgs, SegmentArgs};

#[derive(Parser, Debug)]
pub struct ExtractArgs {
    #[command(flatten)]
    pub segment: SegmentArgs,

    /// Where to copy the segment, prints the cached path when omitted
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub common: CommonArgs,
}

pub fn run(args: ExtractArgs) -> Result<()> {
    init_logging(args.common.verbose);

    let config = args.common.load_config()?;
    let request = args.segment.to_request()?;

    FFmpeg::check_ffmpeg()?;

    let quiet = config.transcoder.quiet && !args.common.verbose;
    let extractor = SegmentExtractor::new(config.cache(), FFmpeg::new(quiet));
    let cached = extractor
        .materialize(&request)
        .context("Failed to extract video segment")?;

    match args.output {
        Some(output) => {
            fs::copy(&cached, &output)
                .with_context(|| format!("Failed to copy segment to {}", output.display()))?;
            info!("Saved segment to {}", output.display());
        }
        None => println!("{}", cached.display()),
    }

    Ok(())
}
