use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::platform::logging::{LogDestination, DEFAULT_LOG_FILE};

/// Finds the reply fields of a saved staff page and fills them.
#[derive(Debug, Parser)]
#[command(name = "reply-assist")]
#[command(version)]
pub(crate) struct Cli {
    /// Directory holding snapshot.ron and the page files it names
    #[arg(long, default_value = ".", global = true)]
    pub snapshot: PathBuf,

    /// Detector and scheduler settings (ron)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Where the message list and sheet address persist (ron)
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = LogDestination::File, global = true)]
    pub log: LogDestination,

    #[arg(long, default_value = DEFAULT_LOG_FILE, global = true)]
    pub log_file: PathBuf,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Run detection until it settles and print the result
    Detect,
    /// Print the diagnostics snapshot as JSON
    Diag,
    /// Insert one text into the single reply field
    Insert { text: String },
    /// Fill eligible rows with messages, in order
    Batch {
        /// One message per line, or a CSV export with --csv
        #[arg(long, conflicts_with = "sheet")]
        messages: Option<PathBuf>,
        /// Google Sheets address to load the messages from
        #[arg(long)]
        sheet: Option<String>,
        #[arg(long)]
        csv: bool,
        #[arg(long)]
        skip_header: bool,
    },
    /// Run the live scheduler, re-rendering when snapshot files change
    Watch {
        #[arg(long, default_value_t = 30)]
        seconds: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn batch_flags_parse() {
        let cli = Cli::try_parse_from([
            "reply-assist",
            "batch",
            "--messages",
            "replies.csv",
            "--csv",
            "--skip-header",
            "--snapshot",
            "pages/inbox",
        ])
        .unwrap();
        assert_eq!(cli.snapshot, PathBuf::from("pages/inbox"));
        match cli.command {
            Command::Batch {
                messages,
                sheet,
                csv,
                skip_header,
            } => {
                assert_eq!(messages, Some(PathBuf::from("replies.csv")));
                assert_eq!(sheet, None);
                assert!(csv && skip_header);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn messages_and_sheet_are_exclusive() {
        let parsed = Cli::try_parse_from([
            "reply-assist",
            "batch",
            "--messages",
            "a.txt",
            "--sheet",
            "https://docs.google.com/spreadsheets/d/x/edit",
        ]);
        assert!(parsed.is_err());
    }
}
