//! Save system - Numbered save slots, auto-save and save presentation helpers
//!
//! Every public operation is best-effort: failures are logged and reported as
//! `false`/`None`, never propagated.

use crate::application::state_manager::{StateManager, StateUpdate};
use crate::config::SaveConfig;
use crate::domain::clock::Clock;
use crate::domain::entities::{GameState, SaveMetadata, SaveSlot, SavedGame};
use crate::domain::errors::SaveError;
use crate::domain::value_objects::SlotNumber;
use crate::infrastructure::storage::GameStorage;
use chrono::TimeZone;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::task::JoinHandle;

/// Character name recorded when no character exists yet
pub const NO_CHARACTER: &str = "No Character";

/// Location recorded when no current page is known
pub const UNKNOWN_LOCATION: &str = "Unknown Location";

pub struct SaveSystem {
    state: Arc<StateManager>,
    storage: GameStorage,
    clock: Arc<dyn Clock>,
    config: SaveConfig,
    current_slot: Mutex<Option<SlotNumber>>,
    auto_save: Mutex<Option<JoinHandle<()>>>,
}

impl SaveSystem {
    pub fn new(
        state: Arc<StateManager>,
        storage: GameStorage,
        clock: Arc<dyn Clock>,
        config: SaveConfig,
    ) -> Self {
        Self {
            state,
            storage,
            clock,
            config,
            current_slot: Mutex::new(None),
            auto_save: Mutex::new(None),
        }
    }

    /// Start auto-saving when the player's settings ask for it
    pub fn initialize(self: &Arc<Self>) {
        if self.state.settings().auto_save {
            self.start_auto_save();
        }
    }

    /// Save the current state into `slot` (1..=5)
    pub async fn save_game(&self, slot: u32) -> bool {
        let slot = match SlotNumber::new(slot) {
            Ok(slot) => slot,
            Err(e) => {
                log::error!("{e}");
                return false;
            }
        };

        match self.write_slot(slot).await {
            Ok(()) => {
                *self.lock_current() = Some(slot);
                log::info!("Saved game to slot {slot}");
                true
            }
            Err(e) => {
                log::error!("Error saving game to slot {slot}: {e}");
                false
            }
        }
    }

    async fn write_slot(&self, slot: SlotNumber) -> Result<(), SaveError> {
        let state = self.state.state();
        let save = SaveSlot {
            timestamp: self.clock.now_millis(),
            metadata: self.metadata_for(&state),
            state,
        };
        self.storage.write(&slot.storage_key(), &save).await?;
        Ok(())
    }

    fn metadata_for(&self, state: &GameState) -> SaveMetadata {
        SaveMetadata {
            character: state
                .character
                .as_ref()
                .map(|c| c.name.clone())
                .unwrap_or_else(|| NO_CHARACTER.to_string()),
            location: state
                .current_page()
                .map(|page| format!("Page {page}"))
                .unwrap_or_else(|| UNKNOWN_LOCATION.to_string()),
            playtime: state
                .start_time()
                .map(|start| self.clock.now_millis().saturating_sub(start).max(0))
                .unwrap_or(0),
        }
    }

    /// Merge the state stored in `slot` into the live state without persisting it
    pub async fn load_game(&self, slot: u32) -> bool {
        let slot = match SlotNumber::new(slot) {
            Ok(slot) => slot,
            Err(e) => {
                log::error!("{e}");
                return false;
            }
        };

        match self.read_slot(slot).await {
            Ok(()) => {
                *self.lock_current() = Some(slot);
                log::info!("Loaded game from slot {slot}");
                true
            }
            Err(e) => {
                log::error!("Error loading game from slot {slot}: {e}");
                false
            }
        }
    }

    async fn read_slot(&self, slot: SlotNumber) -> Result<(), SaveError> {
        let save: SaveSlot = self
            .storage
            .read(&slot.storage_key())
            .await?
            .ok_or(SaveError::EmptySlot { slot: slot.get() })?;
        self.state
            .update_state(StateUpdate::from_state(save.state), false)
            .await?;
        Ok(())
    }

    pub async fn get_save_data(&self, slot: u32) -> Option<SaveSlot> {
        let slot = SlotNumber::new(slot).ok()?;
        match self.storage.read(&slot.storage_key()).await {
            Ok(save) => save,
            Err(e) => {
                log::error!("Error getting save data for slot {slot}: {e}");
                None
            }
        }
    }

    pub async fn delete_save(&self, slot: u32) -> bool {
        let slot = match SlotNumber::new(slot) {
            Ok(slot) => slot,
            Err(e) => {
                log::error!("{e}");
                return false;
            }
        };

        if let Err(e) = self.storage.remove(&slot.storage_key()).await {
            log::error!("Error deleting save in slot {slot}: {e}");
            return false;
        }

        let mut current = self.lock_current();
        if *current == Some(slot) {
            *current = None;
        }
        true
    }

    /// Existing saves in ascending slot order
    pub async fn get_all_saves(&self) -> Vec<SavedGame> {
        let mut saves = Vec::new();
        for slot in SlotNumber::all() {
            if let Some(save) = self.get_save_data(slot.get().into()).await {
                saves.push(SavedGame { slot, save });
            }
        }
        saves
    }

    /// Slot of the last successful manual save or load this session
    pub fn current_slot(&self) -> Option<SlotNumber> {
        *self.lock_current()
    }

    pub async fn is_slot_empty(&self, slot: u32) -> bool {
        self.get_save_data(slot).await.is_none()
    }

    /// Save to the current slot, or slot 1 when none is established
    pub async fn quick_save(&self) -> bool {
        let slot = self.current_slot().map_or(1, |s| s.get());
        self.save_game(slot.into()).await
    }

    /// Load from the current slot, or slot 1 when none is established
    pub async fn quick_load(&self) -> bool {
        let slot = self.current_slot().map_or(1, |s| s.get());
        self.load_game(slot.into()).await
    }

    /// Raw JSON stored in a slot
    pub async fn export_save(&self, slot: u32) -> Option<String> {
        let slot = SlotNumber::new(slot).ok()?;
        match self.storage.read_raw(&slot.storage_key()).await {
            Ok(raw) => raw,
            Err(e) => {
                log::error!("Error exporting slot {slot}: {e}");
                None
            }
        }
    }

    /// Write an exported save into `slot` after checking it parses
    pub async fn import_save(&self, slot: u32, json: &str) -> bool {
        let slot = match SlotNumber::new(slot) {
            Ok(slot) => slot,
            Err(e) => {
                log::error!("{e}");
                return false;
            }
        };

        let save: SaveSlot = match serde_json::from_str(json) {
            Ok(save) => save,
            Err(e) => {
                log::error!("Rejected save import for slot {slot}: {e}");
                return false;
            }
        };

        match self.storage.write(&slot.storage_key(), &save).await {
            Ok(()) => true,
            Err(e) => {
                log::error!("Error importing save into slot {slot}: {e}");
                false
            }
        }
    }

    /// Re-save to the current slot, if one is established
    pub async fn auto_save(&self) -> bool {
        let current = self.current_slot();
        match current {
            Some(slot) => self.save_game(slot.get().into()).await,
            None => {
                log::debug!("Auto-save skipped: no current slot");
                false
            }
        }
    }

    /// Start the repeating auto-save timer, replacing any running one
    pub fn start_auto_save(self: &Arc<Self>) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            log::error!("Auto-save needs a tokio runtime");
            return;
        };

        self.stop_auto_save();

        let period = self.config.auto_save_interval();
        let weak: Weak<Self> = Arc::downgrade(self);
        let handle = runtime.spawn(async move {
            let mut ticks = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                ticks.tick().await;
                let Some(saves) = weak.upgrade() else {
                    break;
                };
                saves.auto_save().await;
            }
        });

        *self.lock_auto_save() = Some(handle);
        log::debug!("Auto-save started every {period:?}");
    }

    pub fn stop_auto_save(&self) {
        if let Some(handle) = self.lock_auto_save().take() {
            handle.abort();
            log::debug!("Auto-save stopped");
        }
    }

    pub fn is_auto_saving(&self) -> bool {
        self.lock_auto_save()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    fn lock_current(&self) -> MutexGuard<'_, Option<SlotNumber>> {
        self.current_slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_auto_save(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.auto_save.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for SaveSystem {
    fn drop(&mut self) {
        self.stop_auto_save();
    }
}

/// `"{h}h {m}m {s}s"` breakdown of a duration in milliseconds
pub fn format_playtime(millis: i64) -> String {
    let seconds = millis.max(0) / 1000;
    let minutes = seconds / 60;
    let hours = minutes / 60;
    format!("{}h {}m {}s", hours, minutes % 60, seconds % 60)
}

/// Local date and time of an epoch-millisecond timestamp
pub fn format_timestamp(millis: i64) -> String {
    match chrono::Local.timestamp_millis_opt(millis).single() {
        Some(time) => time.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => "Invalid date".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn playtime_breakdown() {
        assert_eq!(format_playtime(0), "0h 0m 0s");
        assert_eq!(format_playtime(59_999), "0h 0m 59s");
        assert_eq!(format_playtime(3_723_000), "1h 2m 3s");
        assert_eq!(format_playtime(-5), "0h 0m 0s");
    }

    #[test]
    fn timestamp_formats_as_local_datetime() {
        let formatted = format_timestamp(0);
        assert_eq!(formatted.len(), "1970-01-01 00:00:00".len());
        assert!(formatted.starts_with("19"));
    }
}
