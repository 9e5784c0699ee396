//! In-memory host environment
//!
//! Models just enough of a DOM for headless runs and tests: an element tree with inline
//! styles, global event subscriptions and a record of style writes and music requests.

use crate::domain::errors::HostError;
use crate::domain::host::{
    ButtonAction, DomHost, ElementStyle, EventHandler, GlobalEvent, HostEvent, PageScaffold,
    Subscription,
};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Style writes kept by [`MemoryDom::style_log`]; older entries are dropped
pub const STYLE_LOG_LIMIT: usize = 1024;

#[derive(Debug, Clone)]
struct Node {
    style: ElementStyle,
    parent: Option<String>,
    background: Option<String>,
}

#[derive(Default)]
struct Dom {
    nodes: HashMap<String, Node>,
    scaffolds: HashMap<String, PageScaffold>,
    mount_counts: HashMap<String, usize>,
    subscriptions: BTreeMap<u64, (GlobalEvent, EventHandler)>,
    next_subscription: u64,
    style_log: VecDeque<(String, ElementStyle)>,
    music: Vec<String>,
}

impl Dom {
    fn insert(&mut self, id: String, parent: Option<&str>, style: ElementStyle) {
        self.nodes.insert(
            id,
            Node {
                style,
                parent: parent.map(str::to_string),
                background: None,
            },
        );
    }

    fn descendants(&self, root: &str) -> Vec<String> {
        let mut found = vec![root.to_string()];
        let mut i = 0;
        while i < found.len() {
            let parent = found[i].clone();
            found.extend(
                self.nodes
                    .iter()
                    .filter(|(_, node)| node.parent.as_deref() == Some(parent.as_str()))
                    .map(|(id, _)| id.clone()),
            );
            i += 1;
        }
        found
    }
}

fn button_id(root: &str, action: ButtonAction) -> String {
    let name = match action {
        ButtonAction::Back => "back",
        ButtonAction::Menu => "menu",
        ButtonAction::Save => "save",
    };
    format!("{root}-{name}-button")
}

/// In-memory [`DomHost`]
#[derive(Default)]
pub struct MemoryDom {
    dom: Mutex<Dom>,
}

impl MemoryDom {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a free-standing element, e.g. a menu overlay
    pub fn insert_element(&self, element_id: &str, style: ElementStyle) {
        self.lock().insert(element_id.to_string(), None, style);
    }

    /// Dispatch a global event to every matching subscriber
    pub fn dispatch(&self, event: HostEvent) -> usize {
        let handlers: Vec<EventHandler> = self
            .lock()
            .subscriptions
            .values()
            .filter(|(kind, _)| *kind == event.kind())
            .map(|(_, handler)| handler.clone())
            .collect();
        for handler in &handlers {
            handler(&event);
        }
        handlers.len()
    }

    pub fn subscription_count(&self) -> usize {
        self.lock().subscriptions.len()
    }

    pub fn scaffold(&self, element_id: &str) -> Option<PageScaffold> {
        self.lock().scaffolds.get(element_id).cloned()
    }

    /// How many times a page root has been mounted
    pub fn mount_count(&self, element_id: &str) -> usize {
        self.lock().mount_counts.get(element_id).copied().unwrap_or(0)
    }

    pub fn background(&self, element_id: &str) -> Option<String> {
        self.lock()
            .nodes
            .get(element_id)
            .and_then(|node| node.background.clone())
    }

    pub fn has_button(&self, element_id: &str, action: ButtonAction) -> bool {
        self.lock().nodes.contains_key(&button_id(element_id, action))
    }

    /// The most recent style writes, oldest first
    pub fn style_log(&self) -> Vec<(String, ElementStyle)> {
        self.lock().style_log.iter().cloned().collect()
    }

    pub fn music_requests(&self) -> Vec<String> {
        self.lock().music.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Dom> {
        self.dom.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DomHost for MemoryDom {
    fn mount(&self, scaffold: &PageScaffold) -> Result<(), HostError> {
        let mut dom = self.lock();
        let root = scaffold.element_id.clone();
        if dom.nodes.contains_key(&root) {
            return Err(HostError::AlreadyMounted { id: root });
        }

        let child = ElementStyle {
            display: crate::domain::host::Display::Block,
            ..ElementStyle::default()
        };
        dom.insert(root.clone(), None, ElementStyle::default());
        let header = format!("{root}-header");
        let footer = format!("{root}-footer");
        dom.insert(header.clone(), Some(&root), child.clone());
        dom.insert(scaffold.content_id(), Some(&root), child.clone());
        dom.insert(footer.clone(), Some(&root), child.clone());
        for &action in &scaffold.header_buttons {
            dom.insert(button_id(&root, action), Some(&header), child.clone());
        }
        for &action in &scaffold.footer_buttons {
            dom.insert(button_id(&root, action), Some(&footer), child.clone());
        }

        dom.scaffolds.insert(root.clone(), scaffold.clone());
        *dom.mount_counts.entry(root).or_insert(0) += 1;
        Ok(())
    }

    fn contains(&self, element_id: &str) -> bool {
        self.lock().nodes.contains_key(element_id)
    }

    fn style(&self, element_id: &str) -> Option<ElementStyle> {
        self.lock()
            .nodes
            .get(element_id)
            .map(|node| node.style.clone())
    }

    fn set_style(&self, element_id: &str, style: ElementStyle) -> Result<(), HostError> {
        let mut dom = self.lock();
        let node = dom
            .nodes
            .get_mut(element_id)
            .ok_or_else(|| HostError::ElementNotFound {
                id: element_id.to_string(),
            })?;
        node.style = style.clone();
        if dom.style_log.len() == STYLE_LOG_LIMIT {
            dom.style_log.pop_front();
        }
        dom.style_log.push_back((element_id.to_string(), style));
        Ok(())
    }

    fn set_background(&self, element_id: &str, url: &str) -> Result<(), HostError> {
        let mut dom = self.lock();
        let node = dom
            .nodes
            .get_mut(element_id)
            .ok_or_else(|| HostError::ElementNotFound {
                id: element_id.to_string(),
            })?;
        node.background = Some(url.to_string());
        Ok(())
    }

    fn play_music(&self, track: &str) -> Result<(), HostError> {
        if track.is_empty() {
            return Err(HostError::Media {
                message: "empty track name".to_string(),
            });
        }
        self.lock().music.push(track.to_string());
        Ok(())
    }

    fn remove(&self, element_id: &str) -> Result<(), HostError> {
        let mut dom = self.lock();
        if !dom.nodes.contains_key(element_id) {
            return Err(HostError::ElementNotFound {
                id: element_id.to_string(),
            });
        }
        for id in dom.descendants(element_id) {
            dom.nodes.remove(&id);
        }
        dom.scaffolds.remove(element_id);
        Ok(())
    }

    fn subscribe(&self, event: GlobalEvent, handler: EventHandler) -> Subscription {
        let mut dom = self.lock();
        dom.next_subscription += 1;
        let id = dom.next_subscription;
        dom.subscriptions.insert(id, (event, handler));
        Subscription::new(id, event)
    }

    fn unsubscribe(&self, subscription: &Subscription) -> bool {
        let mut dom = self.lock();
        match dom.subscriptions.get(&subscription.id()) {
            Some((kind, _)) if *kind == subscription.event() => {
                dom.subscriptions.remove(&subscription.id());
                true
            }
            _ => false,
        }
    }
}
