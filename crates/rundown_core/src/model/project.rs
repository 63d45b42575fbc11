//! Project records: the top of the hierarchy.
//!
//! # Invariants
//! - Project names are unique under case-insensitive comparison.
//! - At most `MAX_PROJECTS` projects exist unless configured otherwise.
//! - `settings` is stored and returned verbatim; the core never reads it.

use super::item::{Item, DEFAULT_ITEM_NAME};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

/// Stable project identifier.
pub type ProjectId = Uuid;

/// Default project ceiling.
pub const MAX_PROJECTS: usize = 50;

/// Fully populated project tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub settings: ProjectSettings,
    pub items: Vec<Item>,
    /// Epoch ms creation timestamp.
    pub created_at: i64,
    /// Epoch ms update timestamp.
    pub updated_at: i64,
}

impl Project {
    /// Creates a project with default settings and one seed item.
    ///
    /// Timestamps stay zero until the store assigns them.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            settings: ProjectSettings::default(),
            items: vec![Item::new(DEFAULT_ITEM_NAME)],
            created_at: 0,
            updated_at: 0,
        }
    }
}

/// Listing row for one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub id: ProjectId,
    pub name: String,
    pub item_count: usize,
}

/// Per-project UI settings bag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectSettings {
    pub language: String,
    pub rtl: bool,
    #[serde(rename = "UIColor")]
    pub ui_color: String,
    pub layout: String,
    pub debug: bool,
    pub general: GeneralSettings,
    /// Hotkey groups keyed by action name.
    pub hotkeys: Value,
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            language: "EN".to_string(),
            rtl: false,
            ui_color: "#1AA7EC".to_string(),
            layout: "News".to_string(),
            debug: false,
            general: GeneralSettings::default(),
            hotkeys: default_hotkeys(),
        }
    }
}

/// Editor behavior switches inside `ProjectSettings`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeneralSettings {
    pub auto_save: bool,
    /// Seconds.
    pub auto_save_interval: u32,
    pub prompt_autosave: bool,
    /// Seconds.
    pub projects_refresh_interval: u32,
    pub create_new_item_above: bool,
    pub item_arrows: bool,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            auto_save: false,
            auto_save_interval: 300,
            prompt_autosave: true,
            projects_refresh_interval: 60,
            create_new_item_above: true,
            item_arrows: true,
        }
    }
}

/// Key used for case-insensitive name comparison.
pub fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

fn default_hotkeys() -> Value {
    json!({
        "basic": {
            "cut": "CTRL + SHIFT + X",
            "copy": "CTRL + SHIFT + C",
            "paste": "CTRL + SHIFT + V",
            "delete": "CTRL + SHIFT + D"
        },
        "inAndOut": {
            "insert": "NumbpadEnter",
            "clearSupers": "Numpad1",
            "clearStripe": "Numpad2",
            "clearBox": "Numpad3",
            "clearCG": "Numpad4",
            "clearFingers": "Numpad5",
            "clearCounter": "Numpad6",
            "clearLive": "Numpad7",
            "clearTicker": "Numpad8",
            "clearPromo": "Numpad9",
            "clearRoller": "Numpad0",
            "clearAll": "NumpadDivide"
        },
        "create": {
            "newSuper": "ALT + 1",
            "newStripe": "ALT + 2",
            "newBox": "ALT + 3",
            "newCG": "ALT + 4",
            "newFinger": "ALT + 5",
            "newCounter": "ALT + 6",
            "newLive": "ALT + 7",
            "newTicker": "ALT + 8",
            "newRoller": "ALT + 9",
            "newPromo": "ALT + 0"
        },
        "others": {
            "newProject": "ALT + P",
            "newItem": "ALT + N",
            "newImport": "ALT + I",
            "moveElementUp": "NumpadSubtract",
            "moveElementDown": "NumpadAdd"
        }
    })
}
