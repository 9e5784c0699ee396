//! Maintenance commands over a file-backed save directory

pub mod saves;
