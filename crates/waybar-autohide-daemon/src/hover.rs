//! Pointer tracking for the reveal zone
//!
//! Hyprland has no pointer-motion event on its IPC socket, so the
//! position is polled at a fixed interval (50-100ms keeps reveal latency
//! imperceptible without measurable load). The poller collapses repeated
//! samples with the same answer: the engine only ever sees entered/exited
//! edges, never a stream of identical booleans.

use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::engine::EngineEvent;
use crate::geometry::{BarRegion, Rect};
use crate::hypr_ipc::HyprRequestClient;

/// One pointer position reading; not retained beyond the latest sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerSample {
    pub x: i32,
    pub y: i32,
    pub timestamp: Instant,
}

/// Turns raw pointer samples into hover edge events
#[derive(Debug)]
pub struct HoverDetector {
    zone: Rect,
    last: Option<bool>,
}

impl HoverDetector {
    pub fn new(bar: &BarRegion) -> Self {
        Self {
            zone: bar.reveal_zone(),
            last: None,
        }
    }

    /// Is this sample inside the reveal zone? Pure given the bar region.
    pub fn is_hovering(&self, sample: &PointerSample) -> bool {
        self.zone.contains(sample.x, sample.y)
    }

    /// Feed one sample; returns the new hover flag only on an edge.
    ///
    /// Before the first sample the pointer is assumed outside the zone,
    /// matching the engine's initial state.
    pub fn sample(&mut self, sample: PointerSample) -> Option<bool> {
        let hovering = self.is_hovering(&sample);
        let previous = self.last.replace(hovering).unwrap_or(false);

        if previous != hovering {
            Some(hovering)
        } else {
            None
        }
    }
}

/// Poll the pointer position and feed hover edges into the engine queue
///
/// Query failures are logged and skipped without touching the hover
/// state; a compositor restart shows up as a burst of failed polls and
/// nothing more. Returns when the engine receiver is dropped.
pub async fn run_hover_poller(
    client: HyprRequestClient,
    bar: BarRegion,
    poll_interval: Duration,
    sender: mpsc::Sender<EngineEvent>,
) {
    let mut detector = HoverDetector::new(&bar);
    let mut interval = tokio::time::interval(poll_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let mut consecutive_failures: u32 = 0;

    loop {
        interval.tick().await;

        let pos = match client.get_cursor_pos().await {
            Ok(pos) => {
                consecutive_failures = 0;
                pos
            }
            Err(e) => {
                // Warn once per outage, then keep quiet until it heals
                if consecutive_failures == 0 {
                    warn!("Pointer poll failed: {}", e);
                } else {
                    debug!("Pointer poll still failing: {}", e);
                }
                consecutive_failures += 1;
                continue;
            }
        };

        let sample = PointerSample {
            x: pos.x as i32,
            y: pos.y as i32,
            timestamp: Instant::now(),
        };

        if let Some(hovering) = detector.sample(sample) {
            debug!(hovering = hovering, x = sample.x, y = sample.y, "Hover edge");
            if sender.send(EngineEvent::Hover(hovering)).await.is_err() {
                debug!("Engine receiver dropped, shutting down hover poller");
                return;
            }
        }
    }
}
