//! Command implementations on top of the engine session.

mod config;
mod host;
pub(crate) mod logging;
mod persistence;
mod snapshot;

use std::fs;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context, Result};
use assist_core::Phase;
use assist_engine::{
    load_messages, load_sheet_url, parse_csv, parse_direct_input, save_messages, save_sheet_url,
    Clock, CsvOptions, FetchSettings, ManualClock, Session, SettingsStore, SheetEvent, SheetLoaderHandle,
    SystemClock, MAIN_DOCUMENT,
};
use assist_logging::{assist_debug, assist_info, assist_warn};

use crate::cli::{Cli, Command};
use config::AppConfig;
use host::{render_summary, StderrNotifier, TerminalPanel};
use persistence::RonSettings;
use snapshot::Snapshot;

/// Upper bound on timer firings while fast-forwarding a staged retry.
const MAX_SETTLE_STEPS: usize = 64;
const WATCH_POLL: Duration = Duration::from_millis(200);

pub(crate) fn run(cli: Cli) -> Result<()> {
    let config = AppConfig::load(cli.config.as_deref())?;
    let snapshot = Snapshot::load(&cli.snapshot)?;
    let mut settings = cli.settings.as_deref().map(RonSettings::open);

    match cli.command {
        Command::Detect => {
            let session = settled_session(&snapshot, &config)?;
            println!("{}", render_summary(&session.result()));
        }
        Command::Diag => {
            let session = settled_session(&snapshot, &config)?;
            println!("{}", session.diagnostics().to_json_pretty()?);
        }
        Command::Insert { text } => {
            let mut session = settled_session(&snapshot, &config)?;
            let outcome = session.insert_single(&text)?;
            println!("{outcome:?}");
            print_field_values(&session);
        }
        Command::Batch {
            messages,
            sheet,
            csv,
            skip_header,
        } => {
            let options = CsvOptions { skip_header };
            let store = settings.as_mut().map(|s| s as &mut dyn SettingsStore);
            let messages =
                gather_messages(messages.as_deref(), sheet.as_deref(), csv, options, store)?;
            let mut session = settled_session(&snapshot, &config)?;
            let report = session.insert_batch(&messages)?;
            println!(
                "inserted {}, skipped {}, {} messages left",
                report.inserted, report.skipped, report.remaining
            );
            print_field_values(&session);
        }
        Command::Watch { seconds } => watch(&cli.snapshot, snapshot, &config, seconds)?,
    }
    Ok(())
}

fn new_session(snapshot: &Snapshot, config: &AppConfig) -> Result<Session> {
    let page = snapshot.build_page()?;
    Ok(Session::new(page)
        .with_config(config.detector.clone())
        .with_scheduler_config(config.scheduler.clone())
        .with_notifier(StderrNotifier))
}

/// Runs the staged retry sequence to completion on a simulated clock. A
/// static snapshot cannot change between attempts, so there is no reason to
/// wait in real time.
fn settled_session(snapshot: &Snapshot, config: &AppConfig) -> Result<Session> {
    let clock = ManualClock::new();
    let now = u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or_default();
    clock.set(now);

    let mut session = new_session(snapshot, config)?.with_clock(clock.clone());
    session.start();
    for _ in 0..MAX_SETTLE_STEPS {
        if !matches!(session.scheduler().phase, Phase::StagedRetry { .. }) {
            break;
        }
        let Some(deadline) = session.next_deadline_ms() else {
            break;
        };
        clock.set(deadline);
        session.tick();
    }
    assist_debug!(
        "Settled after {} passes in phase {:?}",
        session.passes_run(),
        session.scheduler().phase
    );
    Ok(session)
}

fn print_field_values(session: &Session) {
    let result = session.result();
    let page = session.page();
    if result.row_results.is_empty() {
        if let Some(input) = &result.reply_input {
            let value = page.field_value(input.element).unwrap_or_default();
            println!("{}: {:?}", input.describe(), value);
        }
        return;
    }
    for row in &result.row_results {
        match &row.chosen_input {
            Some(input) => {
                let value = page.field_value(input.element).unwrap_or_default();
                println!("row {}: {:?}", row.row_index, value);
            }
            None => println!("row {}: (no reply field)", row.row_index),
        }
    }
}

/// Message list for a batch. An explicit source wins and is saved. Without
/// one the saved sheet is fetched again, and the saved list covers a sheet
/// that cannot be reached.
fn gather_messages(
    file: Option<&Path>,
    sheet: Option<&str>,
    csv: bool,
    options: CsvOptions,
    mut store: Option<&mut dyn SettingsStore>,
) -> Result<Vec<String>> {
    let messages = if let Some(url) = sheet {
        let messages = fetch_sheet(url, options)?;
        if let Some(store) = store.as_deref_mut() {
            save_sheet_url(store, url);
        }
        messages
    } else if let Some(path) = file {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading messages from {}", path.display()))?;
        let messages = if csv {
            parse_csv(&text, options)?
        } else {
            parse_direct_input(&text)?
        };
        // The file replaces the sheet as the remembered source.
        if let Some(store) = store.as_deref_mut() {
            save_sheet_url(store, "");
        }
        messages
    } else {
        return saved_messages(store, options);
    };

    if let Some(store) = store {
        save_messages(store, &messages);
    }
    Ok(messages)
}

fn saved_messages(
    mut store: Option<&mut dyn SettingsStore>,
    options: CsvOptions,
) -> Result<Vec<String>> {
    let saved = store.as_deref().map(load_messages).unwrap_or_default();
    let Some(url) = store.as_deref().and_then(load_sheet_url) else {
        if saved.is_empty() {
            bail!(
                "no messages: pass --messages or --sheet, or a --settings file with a saved list"
            );
        }
        assist_info!("Using {} saved messages", saved.len());
        return Ok(saved);
    };

    match fetch_sheet(&url, options) {
        Ok(messages) => {
            if let Some(store) = store.as_deref_mut() {
                save_messages(store, &messages);
            }
            Ok(messages)
        }
        Err(err) if !saved.is_empty() => {
            assist_warn!(
                "Saved sheet {} failed ({:#}); using {} saved messages",
                url,
                err,
                saved.len()
            );
            Ok(saved)
        }
        Err(err) => Err(err.context(format!("reloading saved sheet {url}"))),
    }
}

fn fetch_sheet(url: &str, options: CsvOptions) -> Result<Vec<String>> {
    let loader = SheetLoaderHandle::new(FetchSettings::default());
    loader.load(1, url, options);
    while let Some(event) = loader.recv() {
        match event {
            SheetEvent::Started { url, .. } => assist_info!("Loading sheet {}", url),
            SheetEvent::Progress { bytes, .. } => assist_debug!("Sheet download: {} bytes", bytes),
            SheetEvent::Loaded {
                messages, encoding, ..
            } => {
                assist_info!("Sheet gave {} messages ({})", messages.len(), encoding);
                return Ok(messages);
            }
            SheetEvent::Failed { message, .. } => return Err(anyhow!(message)),
        }
    }
    bail!("sheet loader stopped before finishing")
}

/// Live mode: real time, with the page re-rendered whenever any snapshot
/// file changes on disk.
fn watch(dir: &Path, mut snapshot: Snapshot, config: &AppConfig, seconds: u64) -> Result<()> {
    let clock = SystemClock::new();
    let mut session = new_session(&snapshot, config)?
        .with_clock(clock.clone())
        .with_panel(TerminalPanel);
    session.start();

    let mut seen = snapshot.modified();
    let until = Instant::now() + Duration::from_secs(seconds);
    while Instant::now() < until {
        let wait = session
            .next_deadline_ms()
            .map(|deadline| Duration::from_millis(deadline.saturating_sub(clock.now_ms())))
            .map_or(WATCH_POLL, |d| d.min(WATCH_POLL));
        thread::sleep(wait);

        let modified = snapshot.modified();
        if modified > seen {
            seen = modified;
            match reload(dir, &mut session) {
                Ok(fresh) => snapshot = fresh,
                Err(err) => assist_warn!("Snapshot reload failed: {:#}", err),
            }
        }
        session.tick();
    }

    session.stop();
    assist_info!("Watch finished after {} passes", session.passes_run());
    Ok(())
}

fn reload(dir: &Path, session: &mut Session) -> Result<Snapshot> {
    let snapshot = Snapshot::load(dir)?;
    let html = snapshot.main_html()?;
    if let Some(address) = snapshot.address.as_deref() {
        if session.page().address() != Some(address) {
            session.on_navigation(address);
        }
    }
    session.rerender(MAIN_DOCUMENT, &html);
    snapshot.attach_frames(session.page_mut())?;
    assist_info!("Snapshot re-rendered from {}", snapshot.main_path().display());
    Ok(snapshot)
}
