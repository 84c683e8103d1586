//! Hyprland IPC integration
//!
//! This module is the daemon's only window onto the compositor. It covers
//! both Hyprland sockets:
//!
//! - `HyprRequestClient`: request/response queries (windows, monitors,
//!   pointer position)
//! - `HyprEventStream` / `SnapshotFeed`: the event socket, turned into a
//!   stream of [`WindowSnapshot`] updates for the engine
//!
//! The rest of the daemon never sees a Hyprland wire type: the overlap
//! engine consumes `WindowSnapshot`, the hover poller consumes
//! `CursorPos` through the request client, and dialect details stay in
//! here. Supporting a different compositor means re-implementing this
//! module behind the same snapshot and cursor contracts.

mod client;
mod error;
mod events;
mod types;

pub use client::{event_socket_path, request_socket_path, socket_dir, HyprRequestClient};
pub use error::HyprError;
pub use events::{HyprEventStream, SnapshotFeed, DEFAULT_CHANNEL_BUFFER};
pub use types::{
    normalize_address, parse_event_line, CursorPos, HyprClient, HyprEvent, HyprMonitor,
    HyprWorkspaceRef, WindowSnapshot, WindowState,
};
