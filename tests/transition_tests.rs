//! Transition manager tests
//! Serialized execution, resting styles, dropped and cancelled transitions

use ember_gamebook::application::transition::{
    SlideDirection, TransitionManager, TransitionOptions, TransitionOutcome, TransitionPhase,
};
use ember_gamebook::domain::{Display, DomHost, ElementStyle, Position, Transform};
use ember_gamebook::infrastructure::MemoryDom;
use std::sync::Arc;
use std::time::Duration;

fn setup(pages: &[&str]) -> (Arc<MemoryDom>, Arc<TransitionManager>) {
    let dom = Arc::new(MemoryDom::new());
    for page in pages {
        dom.insert_element(&format!("page-{page}"), ElementStyle::default());
    }
    let manager = Arc::new(TransitionManager::new(
        dom.clone(),
        Duration::from_millis(500),
    ));
    (dom, manager)
}

fn shown() -> ElementStyle {
    ElementStyle {
        display: Display::Block,
        ..ElementStyle::default()
    }
}

async fn wait_for_phase(manager: &TransitionManager, phase: TransitionPhase) {
    while manager.phase() != phase {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn test_fade_settles_both_pages() {
    let (dom, manager) = setup(&["gate", "hall"]);
    assert_eq!(manager.phase(), TransitionPhase::Idle);

    let outcome = manager
        .queue_transition("gate", "hall", TransitionOptions::fade())
        .await;

    assert_eq!(outcome, TransitionOutcome::Completed);
    assert_eq!(dom.style("page-hall"), Some(shown()));
    assert_eq!(dom.style("page-gate"), Some(ElementStyle::default()));
    assert!(!manager.is_transitioning());
}

#[tokio::test(start_paused = true)]
async fn test_prepare_uses_absolute_position_and_duration() {
    let (dom, manager) = setup(&["gate", "hall"]);
    let options = TransitionOptions::zoom().with_duration(Duration::from_millis(120));
    manager.queue_transition("gate", "hall", options).await;

    let log = dom.style_log();
    let (first_id, first_style) = &log[0];
    assert_eq!(first_id, "page-gate");
    assert_eq!(first_style.position, Some(Position::Absolute));
    assert_eq!(first_style.transition, Some(Duration::from_millis(120)));

    let (second_id, second_style) = &log[1];
    assert_eq!(second_id, "page-hall");
    assert_eq!(second_style.display, Display::Block);
    assert_eq!(second_style.opacity, 0.0);

    assert!(log.iter().any(|(id, style)| {
        id == "page-gate" && style.transform == Some(Transform::Scale(0.8))
    }));
}

#[tokio::test(start_paused = true)]
async fn test_default_duration_applies_without_override() {
    let (dom, manager) = setup(&["gate", "hall"]);
    assert_eq!(manager.default_duration(), Duration::from_millis(500));

    let started = tokio::time::Instant::now();
    manager
        .queue_transition("gate", "hall", TransitionOptions::fade())
        .await;
    assert!(started.elapsed() >= Duration::from_millis(500));
    assert_eq!(
        dom.style_log()[0].1.transition,
        Some(Duration::from_millis(500))
    );
}

#[tokio::test(start_paused = true)]
async fn test_slide_moves_outgoing_page_by_direction() {
    let (dom, manager) = setup(&["gate", "hall"]);
    manager
        .queue_transition("gate", "hall", TransitionOptions::slide(SlideDirection::Left))
        .await;

    let log = dom.style_log();
    assert!(log.iter().any(|(id, style)| {
        id == "page-gate" && style.transform == Some(Transform::Translate { x_pct: 100, y_pct: 0 })
    }));
    assert!(log.iter().any(|(id, style)| {
        id == "page-hall" && style.transform == Some(Transform::IDENTITY) && style.opacity == 1.0
    }));
    assert_eq!(dom.style("page-hall"), Some(shown()));
}

#[tokio::test(start_paused = true)]
async fn test_queued_transitions_run_in_order() {
    let (dom, manager) = setup(&["a", "b", "c"]);

    let (first, second) = tokio::join!(
        manager.queue_transition("a", "b", TransitionOptions::fade()),
        manager.queue_transition("b", "c", TransitionOptions::fade()),
    );
    assert_eq!(first, TransitionOutcome::Completed);
    assert_eq!(second, TransitionOutcome::Completed);

    let log = dom.style_log();
    let last_a = log.iter().rposition(|(id, _)| id == "page-a").unwrap();
    let first_c = log.iter().position(|(id, _)| id == "page-c").unwrap();
    assert!(last_a < first_c, "second transition started before the first settled");

    assert_eq!(dom.style("page-c"), Some(shown()));
    assert!(!dom.style("page-b").unwrap().is_visible());
    assert!(!dom.style("page-a").unwrap().is_visible());
}

#[tokio::test(start_paused = true)]
async fn test_missing_page_is_dropped_and_queue_continues() {
    let (dom, manager) = setup(&["a", "b"]);

    let (dropped, completed) = tokio::join!(
        manager.queue_transition("a", "ghost", TransitionOptions::fade()),
        manager.queue_transition("a", "b", TransitionOptions::fade()),
    );
    assert_eq!(dropped, TransitionOutcome::Dropped);
    assert_eq!(completed, TransitionOutcome::Completed);
    assert!(dom.style_log().iter().all(|(id, _)| id != "page-ghost"));
    assert_eq!(dom.style("page-b"), Some(shown()));
}

#[tokio::test(start_paused = true)]
async fn test_cancel_settles_in_flight_and_drops_pending() {
    let (dom, manager) = setup(&["a", "b", "c"]);
    let slow = TransitionOptions::fade().with_duration(Duration::from_secs(10));

    let in_flight = tokio::spawn({
        let manager = manager.clone();
        async move { manager.queue_transition("a", "b", slow).await }
    });
    wait_for_phase(&manager, TransitionPhase::Animating).await;
    assert!(manager.is_transitioning());

    let queued = tokio::spawn({
        let manager = manager.clone();
        async move { manager.queue_transition("b", "c", slow).await }
    });
    while manager.pending() == 0 {
        tokio::task::yield_now().await;
    }

    manager.cancel_transition();
    assert!(!manager.is_transitioning());
    assert_eq!(manager.pending(), 0);

    assert_eq!(in_flight.await.unwrap(), TransitionOutcome::Cancelled);
    assert_eq!(queued.await.unwrap(), TransitionOutcome::Cancelled);

    // Resting styles, not mid-animation ones
    assert_eq!(dom.style("page-b"), Some(shown()));
    assert_eq!(dom.style("page-a"), Some(ElementStyle::default()));
    assert_eq!(dom.style("page-c"), Some(ElementStyle::default()));
}

#[tokio::test(start_paused = true)]
async fn test_manager_recovers_after_cancel() {
    let (dom, manager) = setup(&["a", "b"]);
    let slow = TransitionOptions::fade().with_duration(Duration::from_secs(10));

    let cancelled = tokio::spawn({
        let manager = manager.clone();
        async move { manager.queue_transition("a", "b", slow).await }
    });
    wait_for_phase(&manager, TransitionPhase::Animating).await;
    manager.cancel_transition();
    assert_eq!(cancelled.await.unwrap(), TransitionOutcome::Cancelled);

    let outcome = manager
        .queue_transition("b", "a", TransitionOptions::fade())
        .await;
    assert_eq!(outcome, TransitionOutcome::Completed);
    assert_eq!(dom.style("page-a"), Some(shown()));
    wait_for_phase(&manager, TransitionPhase::Idle).await;
}

#[tokio::test]
async fn test_cancel_when_idle_is_harmless() {
    let (dom, manager) = setup(&["a"]);
    manager.cancel_transition();
    assert_eq!(manager.phase(), TransitionPhase::Idle);
    assert!(dom.style_log().is_empty());
}
