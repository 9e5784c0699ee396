//! Infrastructure layer - Storage backends and host environments
//!
//! This layer contains the concrete adapters behind the domain ports: key/value
//! stores (memory, JSON files) and an in-memory DOM host.

pub mod memory_dom;
pub mod storage;

pub use memory_dom::*;
pub use storage::*;
