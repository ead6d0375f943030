use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use assist_engine::{AtomicFileWriter, PersistError, SettingsStore};
use assist_logging::{assist_info, assist_warn};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PersistedSettings {
    values: BTreeMap<String, String>,
}

/// Settings kept in a ron file; every write replaces the whole file.
#[derive(Debug)]
pub(crate) struct RonSettings {
    writer: AtomicFileWriter,
    state: PersistedSettings,
}

impl RonSettings {
    /// A missing or unreadable file starts out empty.
    pub(crate) fn open(path: impl Into<PathBuf>) -> Self {
        let writer = AtomicFileWriter::new(path);
        let state = load_state(writer.path());
        Self { writer, state }
    }

    pub(crate) fn path(&self) -> &Path {
        self.writer.path()
    }
}

fn load_state(path: &Path) -> PersistedSettings {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return PersistedSettings::default();
        }
        Err(err) => {
            assist_warn!("Failed to read settings from {:?}: {}", path, err);
            return PersistedSettings::default();
        }
    };

    match ron::from_str::<PersistedSettings>(&content) {
        Ok(state) => {
            assist_info!("Loaded {} settings from {:?}", state.values.len(), path);
            state
        }
        Err(err) => {
            assist_warn!("Failed to parse settings from {:?}: {}", path, err);
            PersistedSettings::default()
        }
    }
}

impl SettingsStore for RonSettings {
    fn get(&self, key: &str) -> Option<String> {
        self.state.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistError> {
        self.state.values.insert(key.to_owned(), value.to_owned());
        let pretty = ron::ser::PrettyConfig::new();
        let content = ron::ser::to_string_pretty(&self.state, pretty)
            .map_err(|err| PersistError::Encode(err.to_string()))?;
        self.writer.write(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assist_engine::{load_messages, load_sheet_url, save_messages, save_sheet_url};
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn values_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.ron");

        let mut store = RonSettings::open(&path);
        save_messages(&mut store, &["one".to_owned(), "two, three".to_owned()]);
        save_sheet_url(&mut store, "  https://docs.google.com/spreadsheets/d/abc/edit  ");

        let reopened = RonSettings::open(&path);
        assert_eq!(reopened.path(), path.as_path());
        assert_eq!(load_messages(&reopened), vec!["one", "two, three"]);
        assert_eq!(
            load_sheet_url(&reopened).as_deref(),
            Some("https://docs.google.com/spreadsheets/d/abc/edit")
        );
    }

    #[test]
    fn corrupt_file_starts_empty_and_is_replaced() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.ron");
        fs::write(&path, "not ron at all (").unwrap();

        let mut store = RonSettings::open(&path);
        assert_eq!(store.get("reply_assist.messages"), None);

        store.set("reply_assist.messages", "[]").unwrap();
        let reopened = RonSettings::open(&path);
        assert_eq!(reopened.get("reply_assist.messages").as_deref(), Some("[]"));
    }
}
