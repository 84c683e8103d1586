//! The visibility state machine
//!
//! Consumes snapshot and hover events, applies the debounce, and decides
//! when the bar should actually be shown or hidden. The machine is pure
//! and synchronous: every input arrives together with a caller-supplied
//! `now`, which keeps the whole transition table unit-testable without
//! timers.
//!
//! ## States
//!
//! - `Visible` — the bar is shown
//! - `PendingHide` — overlap was detected; the hide is armed but held
//!   back for the debounce window. Observably identical to `Visible`.
//! - `Hidden` — the bar is hidden
//!
//! Exactly one command is emitted per effective visibility change;
//! entering or leaving `PendingHide` emits nothing. The debounce window
//! is what keeps a window animating across the bar from toggling it
//! (flicker suppression).
//!
//! ## Hover wins
//!
//! A pointer in the reveal zone means the user is deliberately
//! interacting with the bar area; the bar is never hidden from under
//! them, regardless of overlap.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::geometry::{any_overlap, BarRegion};
use crate::hypr_ipc::WindowSnapshot;

/// Inputs to the state machine, produced by the snapshot feed and the
/// hover poller and consumed from a single queue.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// A fresh window snapshot from the compositor
    Snapshot(WindowSnapshot),
    /// The compositor connection dropped; the snapshot can no longer be
    /// trusted until a fresh one arrives
    SnapshotStale,
    /// The pointer entered (`true`) or left (`false`) the reveal zone
    Hover(bool),
}

/// Current machine state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Hidden,
    Visible,
    /// Armed hide, held back until `deadline`
    PendingHide { deadline: Instant },
}

impl Visibility {
    /// The visibility the bar process should currently have
    pub fn effective(&self) -> bool {
        !matches!(self, Visibility::Hidden)
    }
}

/// The autohide decision engine for one bar instance
///
/// Starts `Visible` so the bar is not flash-hidden before the first
/// snapshot arrives. No command is emitted for the initial state.
#[derive(Debug)]
pub struct VisibilityEngine {
    bar: BarRegion,
    debounce: Duration,
    reveal_on_clear: bool,
    state: Visibility,
    hovering: bool,
    overlap: bool,
    stale: bool,
}

impl VisibilityEngine {
    pub fn new(bar: BarRegion, debounce: Duration, reveal_on_clear: bool) -> Self {
        Self {
            bar,
            debounce,
            reveal_on_clear,
            state: Visibility::Visible,
            hovering: false,
            overlap: false,
            stale: false,
        }
    }

    pub fn state(&self) -> Visibility {
        self.state
    }

    pub fn bar(&self) -> &BarRegion {
        &self.bar
    }

    /// The armed hide deadline, if any; the event loop sleeps until this
    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            Visibility::PendingHide { deadline } => Some(deadline),
            _ => None,
        }
    }

    /// Feed one event; returns `Some(visible)` when the bar process must
    /// be commanded, `None` otherwise.
    pub fn handle_event(&mut self, event: EngineEvent, now: Instant) -> Option<bool> {
        match event {
            EngineEvent::Snapshot(snapshot) => {
                self.stale = false;
                self.overlap = any_overlap(&self.bar, &snapshot);
                self.evaluate(now)
            }
            EngineEvent::SnapshotStale => {
                self.stale = true;
                // Fail safe: with stale information, prefer an unwanted
                // visible bar over a stuck-hidden one
                if let Visibility::PendingHide { .. } = self.state {
                    debug!("Snapshot went stale, cancelling pending hide");
                    self.state = Visibility::Visible;
                }
                None
            }
            EngineEvent::Hover(hovering) => {
                self.hovering = hovering;
                self.evaluate(now)
            }
        }
    }

    /// Called when the armed deadline elapses
    ///
    /// The hide only goes through if the overlap that armed it still
    /// holds and the pointer stayed out of the reveal zone.
    pub fn handle_deadline(&mut self, now: Instant) -> Option<bool> {
        let Visibility::PendingHide { deadline } = self.state else {
            return None;
        };
        if now < deadline {
            // Spurious wakeup; the deadline is still in the future
            return None;
        }

        if self.overlap && !self.hovering && !self.stale {
            debug!("Debounce elapsed with overlap held, hiding bar");
            self.state = Visibility::Hidden;
            Some(false)
        } else {
            self.state = Visibility::Visible;
            None
        }
    }

    fn evaluate(&mut self, now: Instant) -> Option<bool> {
        if self.hovering {
            // Hover wins over overlap unconditionally
            return match self.state {
                Visibility::Hidden => {
                    debug!("Hover entered reveal zone, showing bar");
                    self.state = Visibility::Visible;
                    Some(true)
                }
                Visibility::PendingHide { .. } => {
                    debug!("Hover entered reveal zone, cancelling pending hide");
                    self.state = Visibility::Visible;
                    None
                }
                Visibility::Visible => None,
            };
        }

        match self.state {
            Visibility::Visible => {
                if self.overlap && !self.stale {
                    let deadline = now + self.debounce;
                    debug!(debounce_ms = self.debounce.as_millis() as u64, "Overlap detected, arming hide");
                    self.state = Visibility::PendingHide { deadline };
                }
                None
            }
            Visibility::PendingHide { .. } => {
                if !self.overlap {
                    debug!("Overlap cleared, cancelling pending hide");
                    self.state = Visibility::Visible;
                }
                // A still-overlapping snapshot does NOT push the deadline
                // out; re-triggering only happens through Visible
                None
            }
            Visibility::Hidden => {
                if !self.overlap && self.reveal_on_clear && !self.stale {
                    debug!("Overlap cleared, revealing bar (reveal-on-clear)");
                    self.state = Visibility::Visible;
                    Some(true)
                } else {
                    None
                }
            }
        }
    }
}
