mod cli;
mod platform;

use clap::Parser;
use log::LevelFilter;

use platform::logging::LogOptions;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    platform::logging::initialize(&LogOptions {
        destination: cli.log,
        level: if cli.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        },
        file: cli.log_file.clone(),
    });
    platform::run(cli)
}
