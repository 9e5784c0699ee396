//! Domain entities - The game state document and save snapshots

use crate::domain::value_objects::SlotNumber;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Top-level state keys with a typed representation
pub mod keys {
    pub const CHARACTER: &str = "character";
    pub const INVENTORY: &str = "inventory";
    pub const STORY_PROGRESS: &str = "storyProgress";
    pub const FLAGS: &str = "flags";
    pub const SETTINGS: &str = "settings";
    pub const CURRENT_PAGE: &str = "currentPage";
    pub const START_TIME: &str = "startTime";
    pub const PAGE_STATES: &str = "pageStates";
}

/// Decoded character portrait.
///
/// Lives only in memory; it is never written to storage.
#[derive(Debug, Clone, PartialEq)]
pub struct Portrait {
    pub width: u32,
    pub height: u32,
    pub pixels: Arc<[u8]>,
}

/// The player character
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub name: String,
    /// Class, stats and whatever else the pages attach
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
    #[serde(skip)]
    pub image: Option<Portrait>,
}

impl Character {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Map::new(),
            image: None,
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_image(mut self, image: Portrait) -> Self {
        self.image = Some(image);
        self
    }
}

fn default_quantity() -> u32 {
    1
}

/// An inventory entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub name: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl Item {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            quantity: 1,
            attributes: Map::new(),
        }
    }
}

/// Player-facing settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub music: bool,
    pub sound: bool,
    pub text_speed: String,
    pub auto_save: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            music: true,
            sound: true,
            text_speed: "normal".to_string(),
            auto_save: true,
            extra: Map::new(),
        }
    }
}

/// The whole game state document.
///
/// Keys without a typed field (`currentPage`, `startTime`, `pageStates`, ...) are kept in
/// `extra` and serialized at the top level alongside the typed ones.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GameState {
    pub character: Option<Character>,
    pub inventory: Vec<Item>,
    pub story_progress: BTreeMap<String, i64>,
    pub flags: BTreeMap<String, bool>,
    pub settings: Settings,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl GameState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Page the player is currently on, if recorded
    pub fn current_page(&self) -> Option<String> {
        match self.extra.get(keys::CURRENT_PAGE)? {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    /// Session start marker in epoch milliseconds
    pub fn start_time(&self) -> Option<i64> {
        self.extra.get(keys::START_TIME).and_then(Value::as_i64)
    }
}

/// Preview information stored alongside a save
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveMetadata {
    pub character: String,
    pub location: String,
    /// Elapsed play time in milliseconds
    pub playtime: i64,
}

/// One persisted save slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveSlot {
    /// Save time in epoch milliseconds
    pub timestamp: i64,
    pub state: GameState,
    pub metadata: SaveMetadata,
}

/// A save slot tagged with its slot number
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedGame {
    pub slot: SlotNumber,
    #[serde(flatten)]
    pub save: SaveSlot,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn default_state_serializes_camel_case() {
        let value = serde_json::to_value(GameState::new()).unwrap();
        assert_eq!(value["settings"]["textSpeed"], json!("normal"));
        assert_eq!(value["settings"]["autoSave"], json!(true));
        assert_eq!(value["storyProgress"], json!({}));
        assert_eq!(value["character"], Value::Null);
    }

    #[test]
    fn unknown_keys_land_in_extra() {
        let state: GameState = serde_json::from_value(json!({
            "currentPage": "forest",
            "startTime": 1000,
            "flags": {"met_elder": true}
        }))
        .unwrap();
        assert_eq!(state.current_page().as_deref(), Some("forest"));
        assert_eq!(state.start_time(), Some(1000));
        assert_eq!(state.flags.get("met_elder"), Some(&true));
        assert_eq!(state.settings, Settings::default());
    }

    #[test]
    fn character_image_is_never_serialized() {
        let character = Character::new("Aria").with_image(Portrait {
            width: 1,
            height: 1,
            pixels: Arc::from(vec![0u8, 0, 0, 255]),
        });
        let value = serde_json::to_value(&character).unwrap();
        assert_eq!(value, json!({"name": "Aria"}));
    }

    #[test]
    fn item_quantity_defaults_to_one() {
        let item: Item = serde_json::from_value(json!({"id": "torch", "name": "Torch"})).unwrap();
        assert_eq!(item.quantity, 1);
    }
}
