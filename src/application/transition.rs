//! Transition manager - Serialized visual handoffs between page elements
//!
//! Transitions run strictly one at a time in FIFO order. Each one goes
//! `Preparing → Animating → Settled`; the manager is `Idle` when its queue is drained.

use crate::domain::host::{Display, DomHost, ElementStyle, Position, Transform};
use crate::domain::value_objects::PageId;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{oneshot, watch};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlideDirection {
    #[default]
    Right,
    Left,
    Up,
    Down,
}

impl SlideDirection {
    /// Where the outgoing page ends up
    fn exit_transform(self) -> Transform {
        let (x_pct, y_pct) = match self {
            SlideDirection::Right => (-100, 0),
            SlideDirection::Left => (100, 0),
            SlideDirection::Up => (0, -100),
            SlideDirection::Down => (0, 100),
        };
        Transform::Translate { x_pct, y_pct }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionKind {
    #[default]
    Fade,
    Slide(SlideDirection),
    Zoom,
}

impl TransitionKind {
    /// Resolve a kind by name; unknown names fall back to fade
    pub fn from_name(name: &str, direction: Option<&str>) -> Self {
        match name {
            "fade" => TransitionKind::Fade,
            "zoom" => TransitionKind::Zoom,
            "slide" => {
                let direction = match direction {
                    Some("left") => SlideDirection::Left,
                    Some("up") => SlideDirection::Up,
                    Some("down") => SlideDirection::Down,
                    Some("right") | None => SlideDirection::Right,
                    Some(other) => {
                        log::debug!("Unknown slide direction '{other}', using right");
                        SlideDirection::Right
                    }
                };
                TransitionKind::Slide(direction)
            }
            other => {
                log::warn!("Unknown transition type: {other}, falling back to fade");
                TransitionKind::Fade
            }
        }
    }
}

/// Per-call transition options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransitionOptions {
    pub kind: TransitionKind,
    /// Overrides the manager's default duration
    pub duration: Option<Duration>,
}

impl TransitionOptions {
    pub fn fade() -> Self {
        Self::default()
    }

    pub fn slide(direction: SlideDirection) -> Self {
        Self {
            kind: TransitionKind::Slide(direction),
            duration: None,
        }
    }

    pub fn zoom() -> Self {
        Self {
            kind: TransitionKind::Zoom,
            duration: None,
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }
}

/// A queued page-to-page transition with its duration resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub from: PageId,
    pub to: PageId,
    pub kind: TransitionKind,
    pub duration: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionPhase {
    Idle,
    Preparing,
    Animating,
    Settled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    Completed,
    /// One of the page elements was missing
    Dropped,
    Cancelled,
}

struct Pending {
    transition: Transition,
    done: oneshot::Sender<TransitionOutcome>,
}

struct InFlight {
    from: String,
    to: String,
}

struct Queue {
    pending: VecDeque<Pending>,
    draining: bool,
    phase: TransitionPhase,
    in_flight: Option<InFlight>,
}

pub struct TransitionManager {
    host: Arc<dyn DomHost>,
    default_duration: Duration,
    queue: Mutex<Queue>,
    cancel: watch::Sender<u64>,
}

impl TransitionManager {
    pub fn new(host: Arc<dyn DomHost>, default_duration: Duration) -> Self {
        Self {
            host,
            default_duration,
            queue: Mutex::new(Queue {
                pending: VecDeque::new(),
                draining: false,
                phase: TransitionPhase::Idle,
                in_flight: None,
            }),
            cancel: watch::Sender::new(0),
        }
    }

    pub fn default_duration(&self) -> Duration {
        self.default_duration
    }

    pub fn phase(&self) -> TransitionPhase {
        self.lock().phase
    }

    pub fn is_transitioning(&self) -> bool {
        matches!(
            self.phase(),
            TransitionPhase::Preparing | TransitionPhase::Animating
        )
    }

    pub fn pending(&self) -> usize {
        self.lock().pending.len()
    }

    /// Queue a transition and wait until it, and everything queued before it, is done
    pub async fn queue_transition(
        self: &Arc<Self>,
        from: impl Into<PageId>,
        to: impl Into<PageId>,
        options: TransitionOptions,
    ) -> TransitionOutcome {
        let transition = Transition {
            from: from.into(),
            to: to.into(),
            kind: options.kind,
            duration: options.duration.unwrap_or(self.default_duration),
        };
        let (done, outcome) = oneshot::channel();

        let start_drain = {
            let mut queue = self.lock();
            queue.pending.push_back(Pending { transition, done });
            !std::mem::replace(&mut queue.draining, true)
        };

        if start_drain {
            let manager = self.clone();
            tokio::spawn(async move { manager.drain().await });
        }

        outcome.await.unwrap_or(TransitionOutcome::Cancelled)
    }

    async fn drain(&self) {
        loop {
            let (pending, cancelled) = {
                let mut queue = self.lock();
                let Some(pending) = queue.pending.pop_front() else {
                    queue.draining = false;
                    queue.phase = TransitionPhase::Idle;
                    return;
                };
                queue.phase = TransitionPhase::Preparing;
                queue.in_flight = Some(InFlight {
                    from: pending.transition.from.element_id(),
                    to: pending.transition.to.element_id(),
                });
                (pending, self.cancel.subscribe())
            };

            let outcome = self.execute(&pending.transition, cancelled).await;
            {
                let mut queue = self.lock();
                queue.in_flight = None;
                if outcome != TransitionOutcome::Cancelled {
                    queue.phase = TransitionPhase::Settled;
                }
            }
            // The caller may have stopped waiting
            let _ = pending.done.send(outcome);
        }
    }

    async fn execute(
        &self,
        transition: &Transition,
        mut cancelled: watch::Receiver<u64>,
    ) -> TransitionOutcome {
        let from = transition.from.element_id();
        let to = transition.to.element_id();
        if !self.host.contains(&from) || !self.host.contains(&to) {
            log::error!(
                "Transition failed: page '{}' or '{}' not found",
                transition.from,
                transition.to
            );
            return TransitionOutcome::Dropped;
        }

        log::debug!(
            "Transition {} -> {} ({:?}, {:?})",
            transition.from,
            transition.to,
            transition.kind,
            transition.duration
        );

        self.prepare(&from, &to, transition.duration);
        self.set_phase(TransitionPhase::Animating);
        self.animate(&from, &to, transition.kind);

        tokio::select! {
            _ = tokio::time::sleep(transition.duration) => {}
            _ = cancelled.changed() => {
                // cancel_transition already settled; settle again in case an effect
                // write landed after it
                self.settle(&from, &to);
                return TransitionOutcome::Cancelled;
            }
        }

        self.settle(&from, &to);
        TransitionOutcome::Completed
    }

    fn prepare(&self, from: &str, to: &str, duration: Duration) {
        self.restyle(from, |style| {
            style.position = Some(Position::Absolute);
            style.transition = Some(duration);
        });
        self.restyle(to, |style| {
            style.display = Display::Block;
            style.opacity = 0.0;
            style.position = Some(Position::Absolute);
            style.transition = Some(duration);
        });
    }

    fn animate(&self, from: &str, to: &str, kind: TransitionKind) {
        match kind {
            TransitionKind::Fade => {
                self.restyle(from, |style| style.opacity = 0.0);
                self.restyle(to, |style| style.opacity = 1.0);
            }
            TransitionKind::Slide(direction) => {
                self.restyle(from, |style| style.transform = Some(direction.exit_transform()));
                self.restyle(to, |style| {
                    style.transform = Some(Transform::IDENTITY);
                    style.opacity = 1.0;
                });
            }
            TransitionKind::Zoom => {
                self.restyle(from, |style| {
                    style.transform = Some(Transform::Scale(0.8));
                    style.opacity = 0.0;
                });
                self.restyle(to, |style| {
                    style.transform = Some(Transform::Scale(1.0));
                    style.opacity = 1.0;
                });
            }
        }
    }

    /// Put both elements in their resting styles: `to` shown, `from` hidden and opaque
    fn settle(&self, from: &str, to: &str) {
        self.restyle(to, |style| {
            *style = ElementStyle {
                display: Display::Block,
                ..ElementStyle::default()
            };
        });
        self.restyle(from, |style| *style = ElementStyle::default());
    }

    fn restyle(&self, element_id: &str, change: impl FnOnce(&mut ElementStyle)) {
        let Some(mut style) = self.host.style(element_id) else {
            log::warn!("Transition target '{element_id}' disappeared");
            return;
        };
        change(&mut style);
        if let Err(e) = self.host.set_style(element_id, style) {
            log::warn!("Failed to style '{element_id}': {e}");
        }
    }

    /// Drop every queued transition and settle the one in flight
    pub fn cancel_transition(&self) {
        let (pending, in_flight) = {
            let mut queue = self.lock();
            let pending: Vec<Pending> = queue.pending.drain(..).collect();
            let in_flight = queue.in_flight.take();
            if in_flight.is_some() {
                queue.phase = TransitionPhase::Settled;
                self.cancel.send_modify(|generation| *generation += 1);
            }
            (pending, in_flight)
        };

        for entry in pending {
            let _ = entry.done.send(TransitionOutcome::Cancelled);
        }
        if let Some(in_flight) = in_flight {
            self.settle(&in_flight.from, &in_flight.to);
            log::debug!("Cancelled transition into '{}'", in_flight.to);
        }
    }

    fn set_phase(&self, phase: TransitionPhase) {
        self.lock().phase = phase;
    }

    fn lock(&self) -> MutexGuard<'_, Queue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
