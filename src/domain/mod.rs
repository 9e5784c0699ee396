//! Domain layer - Game state model, identifiers and the ports the core depends on
//!
//! This layer is independent of any concrete storage medium or host environment.

pub mod clock;
pub mod entities;
pub mod errors;
pub mod host;
pub mod repositories;
pub mod value_objects;

pub use clock::*;
pub use entities::*;
pub use errors::*;
pub use host::*;
pub use repositories::*;
pub use value_objects::*;
