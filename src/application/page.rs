//! Page template - Lifecycle wrapper shared by every narrative page
//!
//! A page moves `Uninitialized → Initializing → Ready` the first time it is shown and
//! back to `Uninitialized` on [`Page::cleanup`]. Visibility is independent of the
//! lifecycle. Page-specific rendering and input handling live in a [`PageBehavior`].

use crate::domain::errors::{EngineError, PageError};
use crate::domain::host::{
    ButtonAction, DomHost, GlobalEvent, HostEvent, PageScaffold, Subscription,
};
use crate::domain::value_objects::PageId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// The game engine a page reports to
#[async_trait]
pub trait GameEngine: Send + Sync {
    fn show_menu(&self) -> Result<(), EngineError>;

    async fn save_game(&self) -> Result<(), EngineError>;

    /// Previously saved state for a page, if any
    async fn get_page_state(
        &self,
        page_id: &PageId,
    ) -> Result<Option<Map<String, Value>>, EngineError>;

    async fn save_page_state(
        &self,
        page_id: &PageId,
        state: &Map<String, Value>,
    ) -> Result<(), EngineError>;
}

/// Per-page options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageConfig {
    pub title: String,
    pub background: Option<String>,
    pub music: Option<String>,
    pub allow_back: bool,
    pub allow_menu: bool,
    pub allow_save: bool,
    /// Page-specific options
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            title: String::new(),
            background: None,
            music: None,
            allow_back: false,
            allow_menu: true,
            allow_save: true,
            extra: Map::new(),
        }
    }
}

impl PageConfig {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Build from an open option set over the defaults
    pub fn from_options(options: Map<String, Value>) -> Result<Self, serde_json::Error> {
        Self::default().merged(options)
    }

    /// Apply overrides on top of this config; override keys win
    pub fn merged(self, overrides: Map<String, Value>) -> Result<Self, serde_json::Error> {
        let mut base = match serde_json::to_value(self)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        base.extend(overrides);
        serde_json::from_value(Value::Object(base))
    }

    pub fn with_background(mut self, url: impl Into<String>) -> Self {
        self.background = Some(url.into());
        self
    }

    pub fn with_music(mut self, track: impl Into<String>) -> Self {
        self.music = Some(track.into());
        self
    }

    pub fn allow_back(mut self, allow: bool) -> Self {
        self.allow_back = allow;
        self
    }

    pub fn allow_menu(mut self, allow: bool) -> Self {
        self.allow_menu = allow;
        self
    }

    pub fn allow_save(mut self, allow: bool) -> Self {
        self.allow_save = allow;
        self
    }

    fn background_url(&self) -> Option<&str> {
        self.background.as_deref().filter(|s| !s.is_empty())
    }

    fn music_track(&self) -> Option<&str> {
        self.music.as_deref().filter(|s| !s.is_empty())
    }
}

/// What a behavior sees when asked to draw
pub struct PageContext<'a> {
    pub page_id: &'a PageId,
    pub content_id: String,
    pub state: &'a Map<String, Value>,
    pub host: &'a dyn DomHost,
}

/// Page-specific overrides; every hook defaults to doing nothing
pub trait PageBehavior: Send + 'static {
    fn render(&mut self, _ctx: &PageContext<'_>) {}

    fn update_ui(&mut self, _ctx: &PageContext<'_>) {}

    fn handle_back(&mut self, _ctx: &PageContext<'_>) {}

    fn handle_key_press(&mut self, _key: &str) {}

    fn handle_resize(&mut self, _width: u32, _height: u32) {}
}

/// Behavior for pages with no overrides
#[derive(Debug, Default, Clone, Copy)]
pub struct BasicPage;

impl PageBehavior for BasicPage {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Uninitialized,
    Initializing,
    Ready,
}

fn lock<B>(behavior: &Mutex<B>) -> MutexGuard<'_, B> {
    behavior.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct Page<B: PageBehavior = BasicPage> {
    id: PageId,
    config: PageConfig,
    host: Arc<dyn DomHost>,
    engine: Arc<dyn GameEngine>,
    behavior: Arc<Mutex<B>>,
    state: Map<String, Value>,
    lifecycle: Lifecycle,
    visible: bool,
    scaffold: Option<PageScaffold>,
    subscriptions: Vec<Subscription>,
}

impl Page<BasicPage> {
    pub fn basic(
        id: impl Into<PageId>,
        config: PageConfig,
        host: Arc<dyn DomHost>,
        engine: Arc<dyn GameEngine>,
    ) -> Self {
        Self::new(id, config, host, engine, BasicPage)
    }
}

impl<B: PageBehavior> Page<B> {
    pub fn new(
        id: impl Into<PageId>,
        config: PageConfig,
        host: Arc<dyn DomHost>,
        engine: Arc<dyn GameEngine>,
        behavior: B,
    ) -> Self {
        Self {
            id: id.into(),
            config,
            host,
            engine,
            behavior: Arc::new(Mutex::new(behavior)),
            state: Map::new(),
            lifecycle: Lifecycle::Uninitialized,
            visible: false,
            scaffold: None,
            subscriptions: Vec::new(),
        }
    }

    pub fn id(&self) -> &PageId {
        &self.id
    }

    pub fn config(&self) -> &PageConfig {
        &self.config
    }

    pub fn element_id(&self) -> String {
        self.id.element_id()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn is_initialized(&self) -> bool {
        self.lifecycle == Lifecycle::Ready
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn state(&self) -> &Map<String, Value> {
        &self.state
    }

    pub fn set_state_value(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.state.insert(key.into(), value.into());
    }

    /// Run `f` against the page behavior
    pub fn with_behavior<R>(&self, f: impl FnOnce(&mut B) -> R) -> R {
        let mut behavior = lock(&self.behavior);
        f(&mut *behavior)
    }

    /// Build the page once; later calls are no-ops
    pub async fn initialize(&mut self) -> Result<(), PageError> {
        if self.lifecycle == Lifecycle::Ready {
            return Ok(());
        }
        self.lifecycle = Lifecycle::Initializing;

        let scaffold = self.build_scaffold();
        if let Err(source) = self.host.mount(&scaffold) {
            self.lifecycle = Lifecycle::Uninitialized;
            return Err(PageError::Host {
                page: self.id.clone(),
                source,
            });
        }
        self.scaffold = Some(scaffold);

        self.initialize_systems();
        self.setup_event_listeners();
        self.load_state().await;

        self.lifecycle = Lifecycle::Ready;
        log::debug!("Page '{}' initialized", self.id);
        Ok(())
    }

    fn build_scaffold(&self) -> PageScaffold {
        let mut header_buttons = Vec::new();
        if self.config.allow_back {
            header_buttons.push(ButtonAction::Back);
        }
        if self.config.allow_menu {
            header_buttons.push(ButtonAction::Menu);
        }
        let mut footer_buttons = Vec::new();
        if self.config.allow_save {
            footer_buttons.push(ButtonAction::Save);
        }

        PageScaffold {
            element_id: self.element_id(),
            title: self.config.title.clone(),
            header_buttons,
            footer_buttons,
        }
    }

    // Media failures do not stop the page from working
    fn initialize_systems(&self) {
        let root = self.element_id();
        if let Some(url) = self.config.background_url()
            && let Err(e) = self.host.set_background(&root, url)
        {
            log::error!("Failed to set up background for page '{}': {e}", self.id);
        }
        if let Some(track) = self.config.music_track()
            && let Err(e) = self.host.play_music(track)
        {
            log::error!("Failed to set up music for page '{}': {e}", self.id);
        }
    }

    fn setup_event_listeners(&mut self) {
        let behavior = self.behavior.clone();
        let keydown = self.host.subscribe(
            GlobalEvent::KeyDown,
            Arc::new(move |event| {
                if let HostEvent::KeyDown { key } = event {
                    lock(&behavior).handle_key_press(key);
                }
            }),
        );

        let behavior = self.behavior.clone();
        let resize = self.host.subscribe(
            GlobalEvent::Resize,
            Arc::new(move |event| {
                if let HostEvent::Resize { width, height } = event {
                    lock(&behavior).handle_resize(*width, *height);
                }
            }),
        );

        self.subscriptions.push(keydown);
        self.subscriptions.push(resize);
    }

    async fn load_state(&mut self) {
        match self.engine.get_page_state(&self.id).await {
            Ok(Some(saved)) => {
                self.state.extend(saved);
                self.update_ui();
            }
            Ok(None) => {}
            Err(e) => log::error!("Failed to load state for page '{}': {e}", self.id),
        }
    }

    fn with_context(&self, f: impl FnOnce(&mut B, &PageContext<'_>)) {
        let ctx = PageContext {
            page_id: &self.id,
            content_id: self
                .scaffold
                .as_ref()
                .map(PageScaffold::content_id)
                .unwrap_or_default(),
            state: &self.state,
            host: self.host.as_ref(),
        };
        let mut behavior = lock(&self.behavior);
        f(&mut *behavior, &ctx);
    }

    /// Initialize if needed, make the page visible and render it
    pub async fn show(&mut self) -> Result<(), PageError> {
        if self.lifecycle != Lifecycle::Ready {
            self.initialize().await?;
        }
        self.set_visible(true)?;
        self.render();
        Ok(())
    }

    /// Hide the page; state and listeners stay attached
    pub fn hide(&mut self) -> Result<(), PageError> {
        if self.scaffold.is_none() {
            return Ok(());
        }
        self.set_visible(false)
    }

    fn set_visible(&mut self, visible: bool) -> Result<(), PageError> {
        self.host
            .set_visible(&self.element_id(), visible)
            .map_err(|source| PageError::Host {
                page: self.id.clone(),
                source,
            })?;
        self.visible = visible;
        Ok(())
    }

    pub fn render(&self) {
        self.with_context(|behavior, ctx| behavior.render(ctx));
    }

    pub fn update_ui(&self) {
        self.with_context(|behavior, ctx| behavior.update_ui(ctx));
    }

    pub fn handle_back(&self) {
        self.with_context(|behavior, ctx| behavior.handle_back(ctx));
    }

    pub fn handle_menu(&self) -> Result<(), PageError> {
        self.engine.show_menu()?;
        Ok(())
    }

    pub async fn handle_save(&self) -> Result<(), PageError> {
        self.engine.save_game().await?;
        Ok(())
    }

    /// Dispatch a scaffold button press
    pub async fn handle_button(&self, action: ButtonAction) -> Result<(), PageError> {
        match action {
            ButtonAction::Back => {
                self.handle_back();
                Ok(())
            }
            ButtonAction::Menu => self.handle_menu(),
            ButtonAction::Save => self.handle_save().await,
        }
    }

    /// Hand the page's own state to the engine for safekeeping
    pub async fn persist_state(&self) -> Result<(), PageError> {
        self.engine.save_page_state(&self.id, &self.state).await?;
        Ok(())
    }

    /// Detach listeners, remove the subtree and return to `Uninitialized`
    pub fn cleanup(&mut self) {
        for subscription in self.subscriptions.drain(..) {
            if !self.host.unsubscribe(&subscription) {
                log::warn!(
                    "Page '{}' listener {} was already detached",
                    self.id,
                    subscription.id()
                );
            }
        }

        if self.scaffold.take().is_some()
            && let Err(e) = self.host.remove(&self.element_id())
        {
            log::warn!("Page '{}' root could not be removed: {e}", self.id);
        }

        self.visible = false;
        self.lifecycle = Lifecycle::Uninitialized;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn config_defaults() {
        let config = PageConfig::default();
        assert!(!config.allow_back);
        assert!(config.allow_menu);
        assert!(config.allow_save);
        assert!(config.background.is_none());
    }

    #[test]
    fn config_options_override_defaults() {
        let options = json!({
            "title": "Ember Throne",
            "allowBack": true,
            "allowSave": false,
            "ambientColor": "#331100"
        });
        let Value::Object(options) = options else {
            unreachable!()
        };
        let config = PageConfig::from_options(options).unwrap();
        assert_eq!(config.title, "Ember Throne");
        assert!(config.allow_back);
        assert!(config.allow_menu);
        assert!(!config.allow_save);
        assert_eq!(config.extra.get("ambientColor"), Some(&json!("#331100")));
    }

    #[test]
    fn merged_overrides_win() {
        let base = PageConfig::new("Forest").with_music("forest_theme");
        let mut overrides = Map::new();
        overrides.insert("music".to_string(), json!("storm_theme"));
        let merged = base.merged(overrides).unwrap();
        assert_eq!(merged.title, "Forest");
        assert_eq!(merged.music.as_deref(), Some("storm_theme"));
    }

    #[test]
    fn empty_media_options_are_ignored() {
        let config = PageConfig::new("Cave").with_background("").with_music("");
        assert!(config.background_url().is_none());
        assert!(config.music_track().is_none());
    }
}
