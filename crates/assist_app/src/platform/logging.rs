//! Logger setup for the reply-assist CLI.
//!
//! Command output owns stdout, so terminal logging goes to stderr and the
//! default destination is a log file.

use std::fs::File;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};

pub const DEFAULT_LOG_FILE: &str = "./assist.log";

/// Workspace crates whose records are kept; dependency chatter is dropped.
const OWN_CRATES: [&str; 3] = ["assist_core", "assist_engine", "reply_assist"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogDestination {
    File,
    /// Standard error.
    Terminal,
    Both,
}

impl LogDestination {
    fn to_terminal(self) -> bool {
        matches!(self, LogDestination::Terminal | LogDestination::Both)
    }

    fn to_file(self) -> bool {
        matches!(self, LogDestination::File | LogDestination::Both)
    }
}

#[derive(Debug, Clone)]
pub struct LogOptions {
    pub destination: LogDestination,
    pub level: LevelFilter,
    pub file: PathBuf,
}

pub fn initialize(options: &LogOptions) {
    let config = build_config();
    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();
    if options.destination.to_terminal() {
        loggers.push(TermLogger::new(
            options.level,
            config.clone(),
            TerminalMode::Stderr,
            ColorChoice::Auto,
        ));
    }
    if options.destination.to_file() {
        if let Some(file_logger) = file_logger(&options.file, options.level, config) {
            loggers.push(file_logger);
        }
    }
    if !loggers.is_empty() {
        let _ = CombinedLogger::init(loggers);
    }
}

fn build_config() -> Config {
    let mut builder = ConfigBuilder::new();
    builder
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error);
    for name in OWN_CRATES {
        builder.add_filter_allow_str(name);
    }
    builder.build()
}

fn file_logger(path: &Path, level: LevelFilter, config: Config) -> Option<Box<dyn SharedLogger>> {
    match File::create(path) {
        Ok(file) => Some(WriteLogger::new(level, config, file)),
        Err(err) => {
            eprintln!("Warning: could not create log file {}: {}", path.display(), err);
            None
        }
    }
}
