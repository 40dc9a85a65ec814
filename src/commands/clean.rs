use anyhow::Result;
use clap::Parser;
use log::info;
use std::path::PathBuf;

use super::{init_logging, CommonArgs};

#[derive(Parser, Debug)]
pub struct CleanArgs {
    /// Only remove segments cut from this video
    #[arg(short = 'f', long = "file")]
    pub file: Option<PathBuf>,

    #[command(flatten)]
    pub common: CommonArgs,
}

pub fn run(args: CleanArgs) -> Result<()> {
    init_logging(args.common.verbose);

    let config = args.common.load_config()?;
    let cache = config.cache();

    match args.file {
        Some(file) => {
            let removed = cache.cleanup_for_input(&file)?;
            info!("Removed {} cached segment(s) of {}", removed, file.display());
        }
        None => {
            cache.cleanup()?;
            info!("Removed {}", cache.dir().display());
        }
    }

    Ok(())
}
