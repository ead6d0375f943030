use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use assist_logging::assist_warn;

use crate::model::DetectionResult;
use crate::persist::PersistError;

/// The operator-facing panel the engine reports to.
pub trait PanelHost {
    /// Called synchronously after every published pass.
    fn on_result_changed(&mut self, result: &DetectionResult);
    fn is_present(&self) -> bool;
    /// Re-mounts the panel after the page removed it.
    fn restore(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

impl fmt::Display for NoticeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NoticeLevel::Info => "info",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        })
    }
}

pub trait Notifier {
    fn notify(&mut self, level: NoticeLevel, message: &str);
}

#[derive(Debug, Default)]
pub struct NullPanel;

impl PanelHost for NullPanel {
    fn on_result_changed(&mut self, _result: &DetectionResult) {}

    fn is_present(&self) -> bool {
        true
    }

    fn restore(&mut self) {}
}

#[derive(Debug, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&mut self, _level: NoticeLevel, _message: &str) {}
}

/// Notifier that keeps every notice; clones share the same list.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    notices: Rc<RefCell<Vec<(NoticeLevel, String)>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<(NoticeLevel, String)> {
        self.notices.borrow().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&mut self, level: NoticeLevel, message: &str) {
        self.notices.borrow_mut().push((level, message.to_owned()));
    }
}

/// Key/value settings owned by the host.
pub trait SettingsStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistError>;
}

#[derive(Debug, Clone, Default)]
pub struct MemorySettings {
    values: HashMap<String, String>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettings {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistError> {
        self.values.insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

const KEY_PREFIX: &str = "reply_assist";
pub const MESSAGES_KEY: &str = "reply_assist.messages";
pub const SHEET_URL_KEY: &str = "reply_assist.sheet_url";

pub fn settings_key(name: &str) -> String {
    format!("{KEY_PREFIX}.{name}")
}

/// Best-effort write: failures are logged and dropped.
pub fn store_setting(store: &mut dyn SettingsStore, key: &str, value: &str) {
    if let Err(err) = store.set(key, value) {
        assist_warn!("Failed to save setting {}: {}", key, err);
    }
}

pub fn load_messages(store: &dyn SettingsStore) -> Vec<String> {
    store
        .get(MESSAGES_KEY)
        .and_then(|raw| serde_json::from_str::<Vec<String>>(&raw).ok())
        .unwrap_or_default()
}

pub fn save_messages(store: &mut dyn SettingsStore, messages: &[String]) {
    match serde_json::to_string(messages) {
        Ok(raw) => store_setting(store, MESSAGES_KEY, &raw),
        Err(err) => assist_warn!("Failed to encode message list: {}", err),
    }
}

pub fn load_sheet_url(store: &dyn SettingsStore) -> Option<String> {
    store.get(SHEET_URL_KEY).filter(|s| !s.trim().is_empty())
}

pub fn save_sheet_url(store: &mut dyn SettingsStore, url: &str) {
    store_setting(store, SHEET_URL_KEY, url.trim());
}
