//! State manager - Owner of the live game state document
//!
//! Reads are path-based (`"settings.textSpeed"`), writes are shallow merges of top-level
//! keys. Listeners are registered on top-level keys only: an update of `settings`
//! notifies `"settings"` listeners with the whole new settings object, and nothing is
//! ever delivered to a dotted key. Nested objects in an update replace the stored object
//! outright.

use crate::domain::entities::{Character, GameState, Item, Settings, keys};
use crate::domain::errors::StateError;
use crate::domain::value_objects::GAME_STATE_KEY;
use crate::infrastructure::storage::GameStorage;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

/// Callback invoked with the new value of the key it is registered on
pub type Listener = Arc<dyn Fn(&Value) + Send + Sync>;

/// Registration handle returned by [`StateManager::add_listener`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListenerHandle {
    key: String,
    id: u64,
}

impl ListenerHandle {
    pub fn key(&self) -> &str {
        &self.key
    }
}

#[derive(Default)]
struct ListenerRegistry {
    next_id: u64,
    by_key: HashMap<String, Vec<(u64, Listener)>>,
}

impl ListenerRegistry {
    fn add(&mut self, key: String, listener: Listener) -> ListenerHandle {
        self.next_id += 1;
        let id = self.next_id;
        self.by_key
            .entry(key.clone())
            .or_default()
            .push((id, listener));
        ListenerHandle { key, id }
    }

    fn remove(&mut self, handle: &ListenerHandle) -> bool {
        let Some(listeners) = self.by_key.get_mut(&handle.key) else {
            return false;
        };
        let before = listeners.len();
        listeners.retain(|(id, _)| *id != handle.id);
        let removed = listeners.len() != before;
        if listeners.is_empty() {
            self.by_key.remove(&handle.key);
        }
        removed
    }

    fn listeners_for(&self, key: &str) -> Vec<Listener> {
        self.by_key
            .get(key)
            .map(|listeners| listeners.iter().map(|(_, l)| l.clone()).collect())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Patch {
    Character(Option<Character>),
    Inventory(Vec<Item>),
    StoryProgress(BTreeMap<String, i64>),
    Flags(BTreeMap<String, bool>),
    Settings(Settings),
    Raw(Value),
}

/// A set of top-level key replacements applied by [`StateManager::update_state`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateUpdate {
    patches: BTreeMap<String, Patch>,
}

impl StateUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every key of a JSON object becomes a top-level replacement
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self {
            patches: map.into_iter().map(|(k, v)| (k, Patch::Raw(v))).collect(),
        }
    }

    /// Replace every key present in `state`
    pub fn from_state(state: GameState) -> Self {
        let mut update = Self::new()
            .character(state.character)
            .inventory(state.inventory)
            .story_progress(state.story_progress)
            .flags(state.flags)
            .settings(state.settings);
        for (key, value) in state.extra {
            update = update.set(key, value);
        }
        update
    }

    pub fn character(mut self, character: Option<Character>) -> Self {
        self.patches
            .insert(keys::CHARACTER.to_string(), Patch::Character(character));
        self
    }

    pub fn inventory(mut self, inventory: Vec<Item>) -> Self {
        self.patches
            .insert(keys::INVENTORY.to_string(), Patch::Inventory(inventory));
        self
    }

    pub fn story_progress(mut self, progress: BTreeMap<String, i64>) -> Self {
        self.patches
            .insert(keys::STORY_PROGRESS.to_string(), Patch::StoryProgress(progress));
        self
    }

    pub fn flags(mut self, flags: BTreeMap<String, bool>) -> Self {
        self.patches
            .insert(keys::FLAGS.to_string(), Patch::Flags(flags));
        self
    }

    pub fn settings(mut self, settings: Settings) -> Self {
        self.patches
            .insert(keys::SETTINGS.to_string(), Patch::Settings(settings));
        self
    }

    /// Replace an arbitrary top-level key with a JSON value
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.patches.insert(key.into(), Patch::Raw(value.into()));
        self
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.patches.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    /// Convert raw values aimed at typed keys, failing on the first mismatch
    fn resolve(self) -> Result<Vec<(String, Patch)>, StateError> {
        self.patches
            .into_iter()
            .map(|(key, patch)| {
                let resolved = match patch {
                    Patch::Raw(value) => match key.as_str() {
                        keys::CHARACTER => Patch::Character(parse(&key, value)?),
                        keys::INVENTORY => Patch::Inventory(parse(&key, value)?),
                        keys::STORY_PROGRESS => Patch::StoryProgress(parse(&key, value)?),
                        keys::FLAGS => Patch::Flags(parse(&key, value)?),
                        keys::SETTINGS => Patch::Settings(parse(&key, value)?),
                        _ => Patch::Raw(value),
                    },
                    typed => typed,
                };
                Ok((key, resolved))
            })
            .collect()
    }
}

fn parse<T: DeserializeOwned>(key: &str, value: Value) -> Result<T, StateError> {
    serde_json::from_value(value).map_err(|e| StateError::invalid_update(key, e.to_string()))
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// Apply one resolved patch and return the key's new JSON value
fn apply_patch(state: &mut GameState, key: &str, patch: Patch) -> Value {
    match patch {
        Patch::Character(character) => {
            state.character = character;
            to_json(&state.character)
        }
        Patch::Inventory(inventory) => {
            state.inventory = inventory;
            to_json(&state.inventory)
        }
        Patch::StoryProgress(progress) => {
            state.story_progress = progress;
            to_json(&state.story_progress)
        }
        Patch::Flags(flags) => {
            state.flags = flags;
            to_json(&state.flags)
        }
        Patch::Settings(settings) => {
            state.settings = settings;
            to_json(&state.settings)
        }
        Patch::Raw(value) => {
            state.extra.insert(key.to_string(), value.clone());
            value
        }
    }
}

/// Walk a dotted path through a JSON document
pub fn lookup_path(document: &Value, path: &str) -> Option<Value> {
    path.split('.')
        .try_fold(document, |current, key| current.as_object()?.get(key))
        .cloned()
}

/// Owner of the game state document
pub struct StateManager {
    storage: GameStorage,
    state: RwLock<GameState>,
    listeners: Mutex<ListenerRegistry>,
    // Held for the duration of a write; `save_state` no-ops while it is taken
    save_lock: tokio::sync::Mutex<()>,
}

impl StateManager {
    pub fn new(storage: GameStorage) -> Self {
        Self {
            storage,
            state: RwLock::new(GameState::default()),
            listeners: Mutex::new(ListenerRegistry::default()),
            save_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Shallow-merge the persisted document over the current state, key by key.
    ///
    /// A missing or unreadable document leaves the state untouched. A stored key whose
    /// value does not fit its typed field is skipped and the remaining keys still load.
    pub async fn initialize(&self) {
        let saved = match self.storage.read::<Map<String, Value>>(GAME_STATE_KEY).await {
            Ok(Some(saved)) => saved,
            Ok(None) => {
                log::debug!("No saved game state, using defaults");
                return;
            }
            Err(e) => {
                log::error!("Error loading state: {e}");
                return;
            }
        };

        let mut state = self.write_state();
        let mut skipped = 0usize;
        for (key, value) in saved {
            match StateUpdate::new().set(key, value).resolve() {
                Ok(patches) => {
                    for (key, patch) in patches {
                        apply_patch(&mut state, &key, patch);
                    }
                }
                Err(e) => {
                    log::warn!("Skipping stored state key: {e}");
                    skipped += 1;
                }
            }
        }
        log::debug!("Restored game state from storage ({skipped} keys skipped)");
    }

    /// Snapshot of the whole state
    pub fn state(&self) -> GameState {
        self.read_state().clone()
    }

    /// Read the whole document (`None` or empty path) or a dotted path into it.
    ///
    /// Returns `None` as soon as a segment is missing or the value being walked is not
    /// an object.
    pub fn get_state(&self, path: Option<&str>) -> Option<Value> {
        let document = to_json(&*self.read_state());
        match path {
            None | Some("") => Some(document),
            Some(path) => lookup_path(&document, path),
        }
    }

    /// Shallow-merge `update` into the state, notify listeners, then persist if `save`.
    ///
    /// The update is validated as a whole before anything is applied. Persistence
    /// failures are logged, not returned.
    pub async fn update_state(&self, update: StateUpdate, save: bool) -> Result<(), StateError> {
        let patches = update.resolve()?;

        let changed: Vec<(String, Value)> = {
            let mut state = self.write_state();
            patches
                .into_iter()
                .map(|(key, patch)| {
                    let value = apply_patch(&mut state, &key, patch);
                    (key, value)
                })
                .collect()
        };

        self.notify_listeners(&changed);

        if save {
            self.save_state().await;
        }
        Ok(())
    }

    pub fn add_listener(
        &self,
        key: impl Into<String>,
        callback: impl Fn(&Value) + Send + Sync + 'static,
    ) -> ListenerHandle {
        self.lock_listeners().add(key.into(), Arc::new(callback))
    }

    /// Detach a listener; returns false if it was not registered
    pub fn remove_listener(&self, handle: &ListenerHandle) -> bool {
        self.lock_listeners().remove(handle)
    }

    fn notify_listeners(&self, changed: &[(String, Value)]) {
        for (key, value) in changed {
            // Collected first so callbacks may touch the registry or the state
            let listeners = self.lock_listeners().listeners_for(key);
            for listener in listeners {
                listener(value);
            }
        }
    }

    /// Write the state to storage.
    ///
    /// Returns false without writing when another save is in progress, and false when
    /// the write fails (the failure is logged).
    pub async fn save_state(&self) -> bool {
        let Ok(_guard) = self.save_lock.try_lock() else {
            log::debug!("State save already in progress, skipping");
            return false;
        };
        self.write_snapshot().await
    }

    pub fn is_saving(&self) -> bool {
        self.save_lock.try_lock().is_err()
    }

    async fn write_snapshot(&self) -> bool {
        let snapshot = self.state();
        match self.storage.write(GAME_STATE_KEY, &snapshot).await {
            Ok(()) => true,
            Err(e) => {
                log::error!("Error saving state: {e}");
                false
            }
        }
    }

    /// Restore defaults and persist.
    ///
    /// Unlike [`save_state`](Self::save_state) this waits for a save in progress to
    /// finish and then always writes.
    pub async fn reset_state(&self) -> bool {
        let stale_keys: Vec<String> = {
            let mut state = self.write_state();
            let stale = state.extra.keys().cloned().collect();
            *state = GameState::default();
            stale
        };

        let defaults = GameState::default();
        let mut changed = vec![
            (keys::CHARACTER.to_string(), to_json(&defaults.character)),
            (keys::INVENTORY.to_string(), to_json(&defaults.inventory)),
            (keys::STORY_PROGRESS.to_string(), to_json(&defaults.story_progress)),
            (keys::FLAGS.to_string(), to_json(&defaults.flags)),
            (keys::SETTINGS.to_string(), to_json(&defaults.settings)),
        ];
        changed.extend(stale_keys.into_iter().map(|key| (key, Value::Null)));
        self.notify_listeners(&changed);

        let _guard = self.save_lock.lock().await;
        self.write_snapshot().await
    }

    pub fn get_story_progress(&self, page_id: &str) -> i64 {
        self.read_state()
            .story_progress
            .get(page_id)
            .copied()
            .unwrap_or(0)
    }

    pub async fn update_story_progress(&self, page_id: &str, progress: i64) {
        let mut story_progress = self.read_state().story_progress.clone();
        story_progress.insert(page_id.to_string(), progress);
        self.apply_infallible(StateUpdate::new().story_progress(story_progress))
            .await;
    }

    pub fn get_flag(&self, flag: &str) -> bool {
        self.read_state().flags.get(flag).copied().unwrap_or(false)
    }

    pub async fn set_flag(&self, flag: &str, value: bool) {
        let mut flags = self.read_state().flags.clone();
        flags.insert(flag.to_string(), value);
        self.apply_infallible(StateUpdate::new().flags(flags)).await;
    }

    /// Add `item` to the inventory, or raise the quantity of the entry with the same id
    pub async fn add_item(&self, item: Item) -> Result<(), StateError> {
        if item.quantity == 0 {
            return Err(StateError::invalid_update(
                keys::INVENTORY,
                format!("quantity of '{}' must be positive", item.id),
            ));
        }
        let mut inventory = self.read_state().inventory.clone();
        match inventory.iter_mut().find(|held| held.id == item.id) {
            Some(held) => held.quantity = held.quantity.saturating_add(item.quantity),
            None => inventory.push(item),
        }
        self.update_state(StateUpdate::new().inventory(inventory), true)
            .await
    }

    /// Take `quantity` of an item; the entry disappears once nothing is left.
    ///
    /// Returns false when the item is not held.
    pub async fn remove_item(&self, id: &str, quantity: u32) -> Result<bool, StateError> {
        if quantity == 0 {
            return Err(StateError::invalid_update(
                keys::INVENTORY,
                format!("quantity of '{id}' must be positive"),
            ));
        }
        let mut inventory = self.read_state().inventory.clone();
        let Some(index) = inventory.iter().position(|held| held.id == id) else {
            log::warn!("Item {id} not found in inventory");
            return Ok(false);
        };
        if inventory[index].quantity <= quantity {
            inventory.remove(index);
        } else {
            inventory[index].quantity -= quantity;
        }
        self.update_state(StateUpdate::new().inventory(inventory), true)
            .await?;
        Ok(true)
    }

    pub fn has_item(&self, id: &str, quantity: u32) -> bool {
        quantity > 0 && self.item_quantity(id) >= quantity
    }

    pub fn item_quantity(&self, id: &str) -> u32 {
        self.read_state()
            .inventory
            .iter()
            .find(|held| held.id == id)
            .map_or(0, |held| held.quantity)
    }

    pub fn settings(&self) -> Settings {
        self.read_state().settings.clone()
    }

    pub fn get_setting(&self, key: &str) -> Option<Value> {
        to_json(&self.read_state().settings)
            .as_object()
            .and_then(|settings| settings.get(key).cloned())
    }

    /// Merge a partial settings object into the current settings
    pub async fn update_settings(&self, patch: Map<String, Value>) -> Result<(), StateError> {
        let mut merged = match to_json(&self.read_state().settings) {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        merged.extend(patch);
        let settings: Settings = parse(keys::SETTINGS, Value::Object(merged))?;
        self.update_state(StateUpdate::new().settings(settings), true)
            .await
    }

    /// Put the settings back to their defaults, notifying `"settings"` listeners
    pub async fn reset_settings(&self) {
        self.apply_infallible(StateUpdate::new().settings(Settings::default()))
            .await;
    }

    /// Pretty-printed JSON of the whole state
    pub fn export_state(&self) -> Result<String, StateError> {
        serde_json::to_string_pretty(&*self.read_state()).map_err(|e| StateError::Serialization {
            message: e.to_string(),
        })
    }

    /// Merge an exported document into the state without persisting it
    pub async fn import_state(&self, json: &str) -> Result<(), StateError> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| StateError::invalid_update(GAME_STATE_KEY, e.to_string()))?;
        let Value::Object(map) = value else {
            return Err(StateError::invalid_update(
                GAME_STATE_KEY,
                "expected a JSON object",
            ));
        };
        self.update_state(StateUpdate::from_map(map), false).await
    }

    // Typed patches cannot fail to resolve
    async fn apply_infallible(&self, update: StateUpdate) {
        if let Err(e) = self.update_state(update, true).await {
            log::error!("Error updating state: {e}");
        }
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, GameState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, GameState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_listeners(&self) -> MutexGuard<'_, ListenerRegistry> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lookup_path_walks_objects_only() {
        let doc = json!({"a": {"b": {"c": 1}}, "list": [1, 2], "s": "text"});
        assert_eq!(lookup_path(&doc, "a.b.c"), Some(json!(1)));
        assert_eq!(lookup_path(&doc, "a.x.c"), None);
        assert_eq!(lookup_path(&doc, "list.0"), None);
        assert_eq!(lookup_path(&doc, "s.length"), None);
    }

    #[test]
    fn raw_values_for_typed_keys_are_validated() {
        let err = StateUpdate::new()
            .set("flags", json!(3))
            .resolve()
            .unwrap_err();
        assert!(matches!(err, StateError::InvalidUpdate { ref key, .. } if key == "flags"));

        let ok = StateUpdate::new()
            .set("flags", json!({"lit": true}))
            .set("currentPage", json!("cave"))
            .resolve()
            .unwrap();
        assert_eq!(ok.len(), 2);
    }

    #[test]
    fn from_state_covers_typed_and_extra_keys() {
        let mut state = GameState::default();
        state.extra.insert("startTime".to_string(), json!(5));
        let update = StateUpdate::from_state(state);
        let keys: Vec<_> = update.keys().collect();
        assert_eq!(
            keys,
            vec![
                "character",
                "flags",
                "inventory",
                "settings",
                "startTime",
                "storyProgress"
            ]
        );
    }

    #[test]
    fn registry_removal_is_per_handle() {
        let mut registry = ListenerRegistry::default();
        let a = registry.add("flags".to_string(), Arc::new(|_| {}));
        let b = registry.add("flags".to_string(), Arc::new(|_| {}));
        assert!(registry.remove(&a));
        assert!(!registry.remove(&a));
        assert_eq!(registry.listeners_for("flags").len(), 1);
        assert!(registry.remove(&b));
        assert!(registry.listeners_for("flags").is_empty());
    }
}
