//! Application layer - Game services and orchestration
//!
//! The state manager, save system and transition manager each own one concern;
//! [`Gamebook`] wires them together and serves as the engine pages report to.

pub mod gamebook;
pub mod page;
pub mod save_system;
pub mod state_manager;
pub mod transition;

pub use gamebook::*;
pub use page::*;
pub use save_system::*;
pub use state_manager::*;
pub use transition::*;
