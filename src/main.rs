use std::process::ExitCode;

use clap::Parser;
use log::error;

mod buf;
mod catalog;
mod cli;
mod compress;
mod create;
mod error;
mod extract;
mod hash;
mod index;
mod tlv;

use crate::cli::{Cli, Commands, Config};

fn main() -> ExitCode {
    env_logger::init();

    // Parse the cli
    let cli = match Cli::try_parse() {
        Ok(x) => x,
        Err(e) => {
            let failure = e.use_stderr();
            let _ = e.print();
            return if failure {
                ExitCode::from(1)
            } else {
                // --help and friends
                ExitCode::SUCCESS
            };
        }
    };

    let config = match Config::load(cli.config.as_deref()) {
        Ok(x) => x,
        Err(e) => {
            error!("{}", e);
            return ExitCode::from(1);
        }
    };

    let result = match &cli.command {
        Commands::Create { archive, input } => {
            create::create(archive, input, &config).map(|stats| {
                println!("Archive created successfully: {}", archive.display());
                println!(
                    "  {} dirs, {} files ({} deduplicated), {} skipped",
                    stats.dirs, stats.files, stats.deduped, stats.skipped
                );
            })
        }
        Commands::Extract { archive, output } => {
            extract::extract(archive, output).map(|stats| {
                println!("Archive extracted successfully to: {}", output.display());
                println!(
                    "  {} dirs, {} files, {} skipped",
                    stats.dirs, stats.files, stats.skipped
                );
            })
        }
        Commands::List { archive } => catalog::list(archive),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::from(1)
        }
    }
}
