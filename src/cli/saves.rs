//! Inspect and maintain the saves and live state kept in a save directory
//!
//! Every command opens the directory through a headless [`Gamebook`]: a
//! [`JsonFileStore`] for persistence and a [`MemoryDom`] standing in for the page.

use crate::application::save_system::{format_playtime, format_timestamp};
use crate::application::Gamebook;
use crate::config::{GamebookConfig, StorageConfig};
use crate::infrastructure::{JsonFileStore, MemoryDom};
use anyhow::Context;
use std::path::Path;
use std::sync::Arc;

fn open(dir: &Path) -> Gamebook {
    let config = GamebookConfig {
        storage: StorageConfig {
            dir: dir.to_path_buf(),
        },
        ..GamebookConfig::default()
    };
    let store = Arc::new(JsonFileStore::new(config.storage.dir.clone()));
    Gamebook::new(config, store, Arc::new(MemoryDom::new()))
}

/// Parse a slot argument; range checking is left to the save system
pub fn parse_slot(arg: &str) -> anyhow::Result<u32> {
    arg.trim()
        .parse()
        .with_context(|| format!("'{arg}' is not a slot number"))
}

/// List every occupied slot
pub async fn list_saves(dir: &Path) -> anyhow::Result<()> {
    let gamebook = open(dir);
    let saves = gamebook.save_system().get_all_saves().await;

    if saves.is_empty() {
        println!("No saves in {}", dir.display());
        return Ok(());
    }

    for saved in saves {
        let meta = &saved.save.metadata;
        println!(
            "Slot {}: {} - {} ({} played, saved {})",
            saved.slot,
            meta.character,
            meta.location,
            format_playtime(meta.playtime),
            format_timestamp(saved.save.timestamp)
        );
    }
    Ok(())
}

/// Print the live state, or the value at a dotted path into it
pub async fn show_state(dir: &Path, path: Option<&str>) -> anyhow::Result<()> {
    let gamebook = open(dir);
    gamebook.state_manager().initialize().await;

    match gamebook.state_manager().get_state(path) {
        Some(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(())
        }
        None => anyhow::bail!("No value at '{}'", path.unwrap_or_default()),
    }
}

/// Print the raw JSON stored in a slot
pub async fn export_slot(dir: &Path, slot: u32) -> anyhow::Result<()> {
    let gamebook = open(dir);
    let json = gamebook
        .save_system()
        .export_save(slot)
        .await
        .with_context(|| format!("Slot {slot} is empty or invalid"))?;
    println!("{json}");
    Ok(())
}

pub async fn delete_slot(dir: &Path, slot: u32) -> anyhow::Result<()> {
    let gamebook = open(dir);
    if !gamebook.save_system().delete_save(slot).await {
        anyhow::bail!("Could not delete slot {slot}");
    }
    println!("Deleted slot {slot}");
    Ok(())
}

/// Restore the live state to its defaults; save slots are untouched
pub async fn reset_state(dir: &Path) -> anyhow::Result<()> {
    let gamebook = open(dir);
    gamebook.state_manager().initialize().await;
    if !gamebook.state_manager().reset_state().await {
        anyhow::bail!("Could not write the reset state to {}", dir.display());
    }
    println!("State reset in {}", dir.display());
    Ok(())
}
