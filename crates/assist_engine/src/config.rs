use scraper::Selector;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid row selector '{selector}': {message}")]
    Selector { selector: String, message: String },
    #[error("minimum displayed count {min} exceeds maximum {max}")]
    CountRange { min: u32, max: u32 },
    #[error("panel id must not be empty")]
    EmptyPanelId,
}

/// A keyword and the score it contributes when found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Weighted {
    pub keyword: String,
    pub weight: i32,
}

impl Weighted {
    fn new(keyword: &str, weight: i32) -> Self {
        Self {
            keyword: keyword.to_owned(),
            weight,
        }
    }
}

/// Keywords that mark an administrative/memo field. Matching is
/// case-insensitive substring containment, per attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExclusionRules {
    pub name_or_id: Vec<String>,
    pub class: Vec<String>,
    pub data_type: Vec<String>,
}

impl Default for ExclusionRules {
    fn default() -> Self {
        Self {
            name_or_id: strings(&["memo", "admin", "note", "futari", "staff"]),
            class: strings(&["admin", "memo", "note"]),
            data_type: strings(&["admin", "memo"]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputScoring {
    /// Exact `name` values that win outright, highest first.
    pub priority_names: Vec<String>,
    pub priority_bonus: i32,
    /// Substrings looked for in name, id and class.
    pub vocabulary: Vec<Weighted>,
    pub placeholder_vocabulary: Vec<Weighted>,
    pub textarea_bonus: i32,
    pub editable_bonus: i32,
    /// px² of rendered area per bonus point.
    pub area_per_point: u32,
    pub max_size_bonus: i32,
}

impl Default for InputScoring {
    fn default() -> Self {
        Self {
            priority_names: strings(&["message1"]),
            priority_bonus: 100,
            vocabulary: vec![
                Weighted::new("message", 30),
                Weighted::new("reply", 25),
                Weighted::new("msg", 20),
                Weighted::new("body", 20),
                Weighted::new("content", 15),
            ],
            placeholder_vocabulary: vec![
                Weighted::new("message", 10),
                Weighted::new("reply", 10),
                Weighted::new("メッセージ", 10),
                Weighted::new("返信", 10),
                Weighted::new("本文", 10),
            ],
            textarea_bonus: 10,
            editable_bonus: 5,
            area_per_point: 4000,
            max_size_bonus: 15,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerScoring {
    pub min_rows: usize,
    pub below_min_rows_penalty: i32,
    pub points_per_row: i32,
    pub max_row_points: i32,
    /// Points when every row has a checkbox; scaled by density.
    pub checkbox_weight: i32,
    pub marker_bonus: i32,
    pub row_class_markers: Vec<String>,
    pub row_id_prefixes: Vec<String>,
    pub cell_class_markers: Vec<String>,
    pub container_class_markers: Vec<String>,
    pub container_class_bonus: i32,
    pub header_vocabulary: Vec<String>,
    pub header_points: i32,
    pub max_header_points: i32,
    /// Containers declared narrower than this are not listings.
    pub min_width_px: u32,
    pub acceptance_threshold: i32,
}

impl Default for ContainerScoring {
    fn default() -> Self {
        Self {
            min_rows: 2,
            below_min_rows_penalty: 40,
            points_per_row: 2,
            max_row_points: 100,
            checkbox_weight: 30,
            marker_bonus: 40,
            row_class_markers: strings(&["rowitem"]),
            row_id_prefixes: strings(&["row"]),
            cell_class_markers: strings(&["chatview"]),
            container_class_markers: strings(&["list"]),
            container_class_bonus: 15,
            header_vocabulary: strings(&[
                "日時", "名前", "メッセージ", "件名", "状態", "受信", "送信", "会員", "date",
                "name", "message", "subject", "status", "from", "user",
            ]),
            header_points: 8,
            max_header_points: 40,
            min_width_px: 200,
            acceptance_threshold: 30,
        }
    }
}

/// Address/name patterns per frame role. Listing patterns are checked first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FramePatterns {
    pub listing: Vec<String>,
    pub compose: Vec<String>,
}

impl Default for FramePatterns {
    fn default() -> Self {
        Self {
            listing: strings(&["box_char", "char_list", "list"]),
            compose: strings(&["mailbox", "mail_send", "compose"]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub exclusion: ExclusionRules,
    pub inputs: InputScoring,
    pub containers: ContainerScoring,
    pub frames: FramePatterns,
    /// Structural row markers for the bare row count, as CSS selectors.
    pub bare_row_selectors: Vec<String>,
    pub min_displayed_count: u32,
    pub max_displayed_count: u32,
    pub max_frame_depth: usize,
    /// Root element id of the tool's own panel.
    pub panel_id: String,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            exclusion: ExclusionRules::default(),
            inputs: InputScoring::default(),
            containers: ContainerScoring::default(),
            frames: FramePatterns::default(),
            bare_row_selectors: strings(&[
                "tr.rowitem",
                "tr[id^=\"row\"]",
                "tr[class*=\"row\"]",
                "table.list tr",
            ]),
            min_displayed_count: 4,
            max_displayed_count: 5000,
            max_frame_depth: 6,
            panel_id: "reply-assist-panel".to_owned(),
        }
    }
}

impl DetectorConfig {
    /// Rejects settings the heuristics cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for selector in &self.bare_row_selectors {
            Selector::parse(selector).map_err(|err| ConfigError::Selector {
                selector: selector.clone(),
                message: err.to_string(),
            })?;
        }
        if self.min_displayed_count > self.max_displayed_count {
            return Err(ConfigError::CountRange {
                min: self.min_displayed_count,
                max: self.max_displayed_count,
            });
        }
        if self.panel_id.trim().is_empty() {
            return Err(ConfigError::EmptyPanelId);
        }
        Ok(())
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_owned()).collect()
}
