use std::sync::{mpsc, Arc};
use std::thread;

use assist_logging::{assist_error, assist_info, assist_warn};

use crate::decode::decode_text;
use crate::fetch::{ChannelProgressSink, FetchSettings, Fetcher, ProgressSink, SheetFetcher};
use crate::messages::{normalize_sheet_url, parse_csv, CsvOptions, MessageSourceError};
use crate::types::{LoadId, SheetEvent};

enum LoaderCommand {
    Load {
        load_id: LoadId,
        url: String,
        options: CsvOptions,
    },
}

/// Loads message sheets on a background thread so the host thread never
/// blocks on the network. Results arrive as [`SheetEvent`]s.
pub struct SheetLoaderHandle {
    cmd_tx: mpsc::Sender<LoaderCommand>,
    event_rx: mpsc::Receiver<SheetEvent>,
}

impl SheetLoaderHandle {
    pub fn new(settings: FetchSettings) -> Self {
        Self::with_fetcher(Arc::new(SheetFetcher::new(settings)))
    }

    pub fn with_fetcher(fetcher: Arc<dyn Fetcher>) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();

        thread::spawn(move || {
            let runtime = match tokio::runtime::Runtime::new() {
                Ok(runtime) => runtime,
                Err(err) => {
                    assist_error!("Sheet loader could not start its runtime: {}", err);
                    return;
                }
            };
            while let Ok(command) = cmd_rx.recv() {
                let fetcher = fetcher.clone();
                let event_tx = event_tx.clone();
                runtime.spawn(async move {
                    handle_command(fetcher.as_ref(), command, event_tx).await;
                });
            }
        });

        Self { cmd_tx, event_rx }
    }

    pub fn load(&self, load_id: LoadId, url: impl Into<String>, options: CsvOptions) {
        let _ = self.cmd_tx.send(LoaderCommand::Load {
            load_id,
            url: url.into(),
            options,
        });
    }

    pub fn try_recv(&self) -> Option<SheetEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Blocks until the next event; `None` once the loader thread is gone.
    pub fn recv(&self) -> Option<SheetEvent> {
        self.event_rx.recv().ok()
    }
}

/// Fetches, decodes and parses one sheet export.
pub async fn load_sheet(
    fetcher: &dyn Fetcher,
    load_id: LoadId,
    url: &str,
    options: CsvOptions,
    sink: &dyn ProgressSink,
) -> Result<(Vec<String>, &'static str), MessageSourceError> {
    let normalized = normalize_sheet_url(url)?;
    let output = fetcher.fetch(load_id, &normalized, sink).await?;
    let decoded = decode_text(&output.bytes, output.content_type.as_deref())?;
    let messages = parse_csv(&decoded.text, options)?;
    Ok((messages, decoded.encoding))
}

async fn handle_command(
    fetcher: &dyn Fetcher,
    command: LoaderCommand,
    event_tx: mpsc::Sender<SheetEvent>,
) {
    match command {
        LoaderCommand::Load {
            load_id,
            url,
            options,
        } => {
            let _ = event_tx.send(SheetEvent::Started {
                load_id,
                url: url.clone(),
            });
            let sink = ChannelProgressSink::new(event_tx.clone());
            let event = match load_sheet(fetcher, load_id, &url, options, &sink).await {
                Ok((messages, encoding)) => {
                    assist_info!("Sheet loaded: {} messages ({})", messages.len(), encoding);
                    SheetEvent::Loaded {
                        load_id,
                        url,
                        messages,
                        encoding: encoding.to_owned(),
                    }
                }
                Err(err) => {
                    let message = match &err {
                        MessageSourceError::Fetch(fetch) => fetch.operator_message(),
                        other => other.to_string(),
                    };
                    assist_warn!("Sheet load failed for {}: {}", url, err);
                    SheetEvent::Failed {
                        load_id,
                        url,
                        message,
                    }
                }
            };
            let _ = event_tx.send(event);
        }
    }
}
