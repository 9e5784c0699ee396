//! Gamebook integration tests
//! End-to-end flows through the facade: new game, navigation, page state and saves

use ember_gamebook::application::{
    GameEngine, Gamebook, MENU_ELEMENT_ID, PageConfig, TransitionOptions, TransitionOutcome,
};
use ember_gamebook::config::GamebookConfig;
use ember_gamebook::domain::errors::{EngineError, HostError};
use ember_gamebook::domain::{ButtonAction, Character, DomHost, ElementStyle, ManualClock, PageId};
use ember_gamebook::infrastructure::{MemoryDom, MemoryStore};
use serde_json::{Value, json};
use std::sync::Arc;

struct World {
    store: Arc<MemoryStore>,
    dom: Arc<MemoryDom>,
    clock: Arc<ManualClock>,
    gamebook: Arc<Gamebook>,
}

fn world() -> World {
    world_with_store(Arc::new(MemoryStore::new()))
}

fn world_with_store(store: Arc<MemoryStore>) -> World {
    let dom = Arc::new(MemoryDom::new());
    let clock = Arc::new(ManualClock::new(50_000));
    let gamebook = Arc::new(Gamebook::with_clock(
        GamebookConfig::default(),
        store.clone(),
        dom.clone(),
        clock.clone(),
    ));
    World {
        store,
        dom,
        clock,
        gamebook,
    }
}

fn persisted(store: &MemoryStore, key: &str) -> Value {
    serde_json::from_str(&store.snapshot(key).unwrap()).unwrap()
}

#[tokio::test]
async fn test_new_game_starts_a_fresh_run() {
    let w = world();
    let state = w.gamebook.state_manager();
    state.set_flag("old_run", true).await;

    w.gamebook
        .new_game(Character::new("Aria").with_attribute("class", "ranger"))
        .await
        .unwrap();

    assert!(!state.get_flag("old_run"));
    assert_eq!(state.get_state(Some("character.name")), Some(json!("Aria")));
    assert_eq!(state.get_state(Some("startTime")), Some(json!(50_000)));
    assert_eq!(
        persisted(&w.store, "gameState")["character"]["class"],
        json!("ranger")
    );
}

#[tokio::test(start_paused = true)]
async fn test_navigation_records_page_and_transitions() {
    let w = world();
    let mut gate = w.gamebook.page("gate", PageConfig::new("The Gate"));
    let mut hall = w.gamebook.page("hall", PageConfig::new("The Hall"));

    let first = w
        .gamebook
        .navigate(&mut gate, TransitionOptions::fade())
        .await
        .unwrap();
    assert_eq!(first, None);
    assert!(gate.is_visible());
    assert_eq!(w.gamebook.current_page(), Some(PageId::from("gate")));

    let second = w
        .gamebook
        .navigate(&mut hall, TransitionOptions::fade())
        .await
        .unwrap();
    assert_eq!(second, Some(TransitionOutcome::Completed));
    assert!(hall.is_visible());
    assert!(w.dom.style("page-hall").unwrap().is_visible());
    assert!(!w.dom.style("page-gate").unwrap().is_visible());

    assert_eq!(persisted(&w.store, "gameState")["currentPage"], json!("hall"));

    // Re-entering the current page runs no transition
    let again = w
        .gamebook
        .navigate(&mut hall, TransitionOptions::fade())
        .await
        .unwrap();
    assert_eq!(again, None);
}

#[tokio::test(start_paused = true)]
async fn test_navigating_from_a_held_page_hides_it() {
    let w = world();
    let mut gate = w.gamebook.page("gate", PageConfig::new("The Gate"));
    let mut hall = w.gamebook.page("hall", PageConfig::new("The Hall"));

    w.gamebook
        .navigate(&mut gate, TransitionOptions::fade())
        .await
        .unwrap();
    let outcome = w
        .gamebook
        .navigate_from(&mut gate, &mut hall, TransitionOptions::fade())
        .await
        .unwrap();

    assert_eq!(outcome, Some(TransitionOutcome::Completed));
    assert!(!gate.is_visible());
    assert!(!w.dom.style("page-gate").unwrap().is_visible());
    assert!(hall.is_visible());
}

#[tokio::test(start_paused = true)]
async fn test_navigation_from_a_cleaned_up_page_still_shows_destination() {
    let w = world();
    let mut gate = w.gamebook.page("gate", PageConfig::new("The Gate"));
    let mut hall = w.gamebook.page("hall", PageConfig::new("The Hall"));

    w.gamebook
        .navigate(&mut gate, TransitionOptions::fade())
        .await
        .unwrap();
    gate.cleanup();

    let outcome = w
        .gamebook
        .navigate(&mut hall, TransitionOptions::fade())
        .await
        .unwrap();
    assert_eq!(outcome, Some(TransitionOutcome::Dropped));
    assert!(hall.is_visible());
}

#[tokio::test]
async fn test_page_state_lives_in_game_state() {
    let w = world();
    let mut vault = w.gamebook.page("vault", PageConfig::new("Vault"));
    vault.set_state_value("doorOpen", true);
    vault.persist_state().await.unwrap();

    assert_eq!(
        w.gamebook
            .state_manager()
            .get_state(Some("pageStates.vault.doorOpen")),
        Some(json!(true))
    );
    vault.cleanup();

    let mut revisit = w.gamebook.page("vault", PageConfig::new("Vault"));
    revisit.initialize().await.unwrap();
    assert_eq!(revisit.state().get("doorOpen"), Some(&json!(true)));

    let other = w
        .gamebook
        .get_page_state(&PageId::from("cellar"))
        .await
        .unwrap();
    assert!(other.is_none());
}

#[tokio::test]
async fn test_save_button_uses_current_slot_or_first() {
    let w = world();
    let mut camp = w.gamebook.page("camp", PageConfig::new("Camp"));
    camp.show().await.unwrap();

    camp.handle_button(ButtonAction::Save).await.unwrap();
    assert!(w.store.snapshot("save_1").is_some());

    assert!(w.gamebook.save_system().save_game(4).await);
    w.clock.advance(1_000);
    camp.handle_button(ButtonAction::Save).await.unwrap();
    let fourth = persisted(&w.store, "save_4");
    assert_eq!(fourth["timestamp"], json!(51_000));
}

#[tokio::test]
async fn test_menu_button_reveals_menu_element() {
    let w = world();
    let camp = w.gamebook.page("camp", PageConfig::new("Camp"));

    let err = camp.handle_menu().unwrap_err().to_string();
    assert!(err.contains(MENU_ELEMENT_ID));
    assert!(matches!(
        w.gamebook.show_menu(),
        Err(EngineError::Host(HostError::ElementNotFound { .. }))
    ));

    w.dom
        .insert_element(MENU_ELEMENT_ID, ElementStyle::default());
    camp.handle_menu().unwrap();
    assert!(w.dom.style(MENU_ELEMENT_ID).unwrap().is_visible());
}

#[tokio::test]
async fn test_initialize_restores_previous_session() {
    let w = world();
    w.gamebook
        .new_game(Character::new("Bram"))
        .await
        .unwrap();
    w.gamebook.state_manager().set_flag("lit_beacon", true).await;

    let restarted = world_with_store(w.store.clone());
    restarted.gamebook.initialize().await;
    let state = restarted.gamebook.state_manager();
    assert!(state.get_flag("lit_beacon"));
    assert_eq!(state.get_state(Some("character.name")), Some(json!("Bram")));
    assert!(restarted.gamebook.save_system().is_auto_saving());
}

#[tokio::test]
async fn test_save_metadata_reflects_run() {
    let w = world();
    w.gamebook.new_game(Character::new("Aria")).await.unwrap();
    let mut bridge = w.gamebook.page("bridge", PageConfig::new("Bridge"));
    w.gamebook
        .navigate(&mut bridge, TransitionOptions::fade())
        .await
        .unwrap();
    w.clock.advance(90_000);

    assert!(w.gamebook.save_system().save_game(2).await);
    let saves = w.gamebook.save_system().get_all_saves().await;
    assert_eq!(saves.len(), 1);
    let meta = &saves[0].save.metadata;
    assert_eq!(meta.character, "Aria");
    assert_eq!(meta.location, "Page bridge");
    assert_eq!(meta.playtime, 90_000);
}
