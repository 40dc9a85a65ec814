use anyhow::Result;
use clap::Parser;

mod commands;

use commands::{Cli, Commands};

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Commands::Ask(args) => commands::ask::run(args),
        Commands::Extract(args) => commands::extract::run(args),
        Commands::Clean(args) => commands::clean::run(args),
    }
}
