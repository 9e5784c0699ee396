//! Host environment port - The DOM-like surface pages and transitions draw on

use crate::domain::errors::HostError;
use std::sync::Arc;
use std::time::Duration;

/// Element display mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Display {
    #[default]
    None,
    Block,
}

/// Element positioning override
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    Absolute,
}

/// Element transform
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transform {
    /// Translation in percent of the element size
    Translate { x_pct: i32, y_pct: i32 },
    Scale(f32),
}

impl Transform {
    pub const IDENTITY: Transform = Transform::Translate { x_pct: 0, y_pct: 0 };
}

/// Inline style of an element, limited to what the core mutates
#[derive(Debug, Clone, PartialEq)]
pub struct ElementStyle {
    pub display: Display,
    pub opacity: f32,
    pub position: Option<Position>,
    pub transform: Option<Transform>,
    /// Animated transition length applied to every property
    pub transition: Option<Duration>,
}

impl Default for ElementStyle {
    fn default() -> Self {
        Self {
            display: Display::None,
            opacity: 1.0,
            position: None,
            transform: None,
            transition: None,
        }
    }
}

impl ElementStyle {
    pub fn is_visible(&self) -> bool {
        self.display == Display::Block
    }
}

/// Buttons a page scaffold may carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonAction {
    Back,
    Menu,
    Save,
}

/// Structure a page asks the host to build
#[derive(Debug, Clone, PartialEq)]
pub struct PageScaffold {
    pub element_id: String,
    pub title: String,
    pub header_buttons: Vec<ButtonAction>,
    pub footer_buttons: Vec<ButtonAction>,
}

impl PageScaffold {
    pub fn content_id(&self) -> String {
        format!("{}-content", self.element_id)
    }
}

/// Global events a page can subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlobalEvent {
    KeyDown,
    Resize,
}

/// A dispatched global event
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    KeyDown { key: String },
    Resize { width: u32, height: u32 },
}

impl HostEvent {
    pub fn kind(&self) -> GlobalEvent {
        match self {
            HostEvent::KeyDown { .. } => GlobalEvent::KeyDown,
            HostEvent::Resize { .. } => GlobalEvent::Resize,
        }
    }
}

pub type EventHandler = Arc<dyn Fn(&HostEvent) + Send + Sync>;

/// Handle returned by [`DomHost::subscribe`].
///
/// Detaching goes through this handle, so the exact registration made at attach time is
/// the one removed. Deliberately not `Clone`.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct Subscription {
    id: u64,
    event: GlobalEvent,
}

impl Subscription {
    pub fn new(id: u64, event: GlobalEvent) -> Self {
        Self { id, event }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn event(&self) -> GlobalEvent {
        self.event
    }
}

/// DOM-like host environment
pub trait DomHost: Send + Sync {
    /// Build a page subtree; the root starts hidden
    fn mount(&self, scaffold: &PageScaffold) -> Result<(), HostError>;

    fn contains(&self, element_id: &str) -> bool;

    fn style(&self, element_id: &str) -> Option<ElementStyle>;

    fn set_style(&self, element_id: &str, style: ElementStyle) -> Result<(), HostError>;

    fn set_background(&self, element_id: &str, url: &str) -> Result<(), HostError>;

    fn play_music(&self, track: &str) -> Result<(), HostError>;

    /// Remove an element and its subtree
    fn remove(&self, element_id: &str) -> Result<(), HostError>;

    fn subscribe(&self, event: GlobalEvent, handler: EventHandler) -> Subscription;

    /// Detach a subscription; returns false if it was not attached
    fn unsubscribe(&self, subscription: &Subscription) -> bool;

    fn set_visible(&self, element_id: &str, visible: bool) -> Result<(), HostError> {
        let mut style = self
            .style(element_id)
            .ok_or_else(|| HostError::ElementNotFound {
                id: element_id.to_string(),
            })?;
        style.display = if visible { Display::Block } else { Display::None };
        self.set_style(element_id, style)
    }
}
