//! # ember-gamebook
//!
//! Coordination core for a browser-style interactive gamebook: a single game state
//! document with change listeners, numbered save slots with auto-save, a page template
//! with a uniform lifecycle, and a serialized queue of page transitions.
//!
//! Storage and the host page are ports ([`domain::KeyValueStore`], [`domain::DomHost`]);
//! the crate ships an in-memory store, a JSON file store and an in-memory DOM.
//!
//! ## Quick Start
//!
//! ```rust
//! use ember_gamebook::application::{Gamebook, PageConfig, TransitionOptions};
//! use ember_gamebook::config::GamebookConfig;
//! use ember_gamebook::domain::Character;
//! use ember_gamebook::infrastructure::{MemoryDom, MemoryStore};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let gamebook = Arc::new(Gamebook::new(
//!     GamebookConfig::default(),
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(MemoryDom::new()),
//! ));
//! gamebook.initialize().await;
//! gamebook.new_game(Character::new("Aria")).await?;
//!
//! let mut gate = gamebook.page("gate", PageConfig::new("The Gate"));
//! let mut hall = gamebook.page("hall", PageConfig::new("The Hall").allow_back(true));
//!
//! gamebook.navigate(&mut gate, TransitionOptions::fade()).await?;
//! let fast = TransitionOptions::fade().with_duration(Duration::from_millis(10));
//! gamebook.navigate(&mut hall, fast).await?;
//!
//! assert_eq!(gamebook.current_page().map(|p| p.to_string()), Some("hall".to_string()));
//! assert!(gamebook.save_system().save_game(1).await);
//! # Ok(())
//! # }
//! ```

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use application::{
    Gamebook, GameEngine, Page, PageBehavior, PageConfig, SaveSystem, StateManager, StateUpdate,
    TransitionManager, TransitionOptions,
};
pub use config::GamebookConfig;
