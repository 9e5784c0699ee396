//! Gamebook - Wires the state, save and transition services together
//!
//! Also acts as the [`GameEngine`] pages report to: page state is kept inside the game
//! state document under `pageStates.{pageId}`, so it travels with every save slot.

use crate::application::page::{BasicPage, GameEngine, Page, PageBehavior, PageConfig};
use crate::application::save_system::SaveSystem;
use crate::application::state_manager::{StateManager, StateUpdate};
use crate::application::transition::{TransitionManager, TransitionOptions, TransitionOutcome};
use crate::config::GamebookConfig;
use crate::domain::clock::{Clock, SystemClock};
use crate::domain::entities::{Character, keys};
use crate::domain::errors::{EngineError, PageError};
use crate::domain::host::DomHost;
use crate::domain::repositories::KeyValueStore;
use crate::domain::value_objects::PageId;
use crate::infrastructure::storage::GameStorage;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Host element revealed by [`GameEngine::show_menu`]
pub const MENU_ELEMENT_ID: &str = "game-menu";

pub struct Gamebook {
    config: GamebookConfig,
    host: Arc<dyn DomHost>,
    clock: Arc<dyn Clock>,
    state: Arc<StateManager>,
    saves: Arc<SaveSystem>,
    transitions: Arc<TransitionManager>,
}

impl Gamebook {
    pub fn new(
        config: GamebookConfig,
        store: Arc<dyn KeyValueStore>,
        host: Arc<dyn DomHost>,
    ) -> Self {
        Self::with_clock(config, store, host, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: GamebookConfig,
        store: Arc<dyn KeyValueStore>,
        host: Arc<dyn DomHost>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let storage = GameStorage::new(store);
        let state = Arc::new(StateManager::new(storage.clone()));
        let saves = Arc::new(SaveSystem::new(
            state.clone(),
            storage,
            clock.clone(),
            config.saves.clone(),
        ));
        let transitions = Arc::new(TransitionManager::new(
            host.clone(),
            config.transitions.default_duration(),
        ));

        Self {
            config,
            host,
            clock,
            state,
            saves,
            transitions,
        }
    }

    /// Restore persisted state and start auto-save if enabled
    pub async fn initialize(&self) {
        self.state.initialize().await;
        self.saves.initialize();
        log::info!("Gamebook initialized");
    }

    pub fn config(&self) -> &GamebookConfig {
        &self.config
    }

    pub fn state_manager(&self) -> &Arc<StateManager> {
        &self.state
    }

    pub fn save_system(&self) -> &Arc<SaveSystem> {
        &self.saves
    }

    pub fn transitions(&self) -> &Arc<TransitionManager> {
        &self.transitions
    }

    pub fn host(&self) -> &Arc<dyn DomHost> {
        &self.host
    }

    /// A page with no behavior overrides reporting to this gamebook
    pub fn page(self: &Arc<Self>, id: impl Into<PageId>, config: PageConfig) -> Page<BasicPage> {
        Page::basic(id, config, self.host.clone(), self.clone())
    }

    pub fn page_with<B: PageBehavior>(
        self: &Arc<Self>,
        id: impl Into<PageId>,
        config: PageConfig,
        behavior: B,
    ) -> Page<B> {
        Page::new(id, config, self.host.clone(), self.clone(), behavior)
    }

    /// Reset to defaults and start a new run for `character`
    pub async fn new_game(&self, character: Character) -> Result<(), EngineError> {
        self.state.reset_state().await;
        self.state
            .update_state(
                StateUpdate::new()
                    .character(Some(character))
                    .set(keys::START_TIME, self.clock.now_millis()),
                true,
            )
            .await?;
        Ok(())
    }

    /// Page the player is currently on
    pub fn current_page(&self) -> Option<PageId> {
        self.state.state().current_page().map(PageId::from)
    }

    /// Move the player to `page`.
    ///
    /// Records it as the current page and, when coming from another page, runs the
    /// transition from that page's element. The destination is shown whatever the
    /// transition outcome. Returns `None` when there was no previous page.
    ///
    /// Only the previous page's element is hidden; a `Page` value still held for it
    /// keeps reporting itself visible. Use [`navigate_from`](Self::navigate_from) when
    /// that value is at hand.
    pub async fn navigate<B: PageBehavior>(
        &self,
        page: &mut Page<B>,
        options: TransitionOptions,
    ) -> Result<Option<TransitionOutcome>, PageError> {
        let previous = self.current_page();
        page.initialize().await?;

        self.state
            .update_state(
                StateUpdate::new().set(keys::CURRENT_PAGE, page.id().as_str()),
                true,
            )
            .await
            .map_err(EngineError::from)?;

        let outcome = match previous {
            Some(previous) if &previous != page.id() => Some(
                self.transitions
                    .queue_transition(previous, page.id().clone(), options)
                    .await,
            ),
            _ => None,
        };

        page.show().await?;
        Ok(outcome)
    }

    /// [`navigate`](Self::navigate) to `to`, then hide `from` so its visibility flag
    /// matches its element
    pub async fn navigate_from<A: PageBehavior, B: PageBehavior>(
        &self,
        from: &mut Page<A>,
        to: &mut Page<B>,
        options: TransitionOptions,
    ) -> Result<Option<TransitionOutcome>, PageError> {
        let outcome = self.navigate(to, options).await?;
        if from.id() != to.id() {
            from.hide()?;
        }
        Ok(outcome)
    }

    fn page_states(&self) -> Map<String, Value> {
        match self.state.state().extra.get(keys::PAGE_STATES) {
            Some(Value::Object(states)) => states.clone(),
            _ => Map::new(),
        }
    }
}

#[async_trait]
impl GameEngine for Gamebook {
    fn show_menu(&self) -> Result<(), EngineError> {
        self.host.set_visible(MENU_ELEMENT_ID, true)?;
        Ok(())
    }

    async fn save_game(&self) -> Result<(), EngineError> {
        if self.saves.quick_save().await {
            Ok(())
        } else {
            Err(EngineError::Rejected {
                reason: "game could not be saved".to_string(),
            })
        }
    }

    async fn get_page_state(
        &self,
        page_id: &PageId,
    ) -> Result<Option<Map<String, Value>>, EngineError> {
        Ok(match self.page_states().remove(page_id.as_str()) {
            Some(Value::Object(state)) => Some(state),
            _ => None,
        })
    }

    async fn save_page_state(
        &self,
        page_id: &PageId,
        state: &Map<String, Value>,
    ) -> Result<(), EngineError> {
        let mut states = self.page_states();
        states.insert(page_id.to_string(), Value::Object(state.clone()));
        self.state
            .update_state(
                StateUpdate::new().set(keys::PAGE_STATES, Value::Object(states)),
                true,
            )
            .await?;
        Ok(())
    }
}
