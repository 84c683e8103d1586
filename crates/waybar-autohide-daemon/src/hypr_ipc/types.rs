//! Wire types and the internal window snapshot
//!
//! The serde structs here mirror the JSON that `hyprctl -j` would print;
//! only the fields the overlap computation needs are declared, everything
//! else is ignored. The internal [`WindowSnapshot`] is decoupled from the
//! wire format so the rest of the daemon never sees Hyprland-specific
//! shapes.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Deserializer};

use crate::geometry::Rect;

use super::error::HyprError;

/// Workspace reference embedded in client and monitor payloads
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct HyprWorkspaceRef {
    pub id: i64,
    pub name: String,
}

/// A window as reported by the `j/clients` request
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct HyprClient {
    pub address: String,
    pub mapped: bool,
    pub hidden: bool,
    /// Top-left corner `[x, y]`
    pub at: (i32, i32),
    /// Extent `[width, height]`
    pub size: (i32, i32),
    pub workspace: HyprWorkspaceRef,
    pub monitor: i64,
    /// Old Hyprland sends a bool, newer ones send a fullscreen-mode integer
    #[serde(deserialize_with = "fullscreen_flag")]
    pub fullscreen: bool,
}

/// A monitor as reported by the `j/monitors` request
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct HyprMonitor {
    pub id: i64,
    pub name: String,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    #[serde(rename = "activeWorkspace")]
    pub active_workspace: HyprWorkspaceRef,
    #[serde(default)]
    pub focused: bool,
}

impl HyprMonitor {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width.max(0), self.height.max(0))
    }
}

/// Pointer position as reported by the `j/cursorpos` request
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct CursorPos {
    pub x: i64,
    pub y: i64,
}

/// Accept `true`/`false` as well as the newer fullscreen-mode integers,
/// where any nonzero mode hides the bar.
fn fullscreen_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolOrMode {
        Flag(bool),
        Mode(i64),
    }

    Ok(match BoolOrMode::deserialize(deserializer)? {
        BoolOrMode::Flag(flag) => flag,
        BoolOrMode::Mode(mode) => mode != 0,
    })
}

/// Per-window state kept in the snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowState {
    pub rect: Rect,
    pub workspace: i64,
    pub monitor: i64,
    pub fullscreen: bool,
}

impl From<&HyprClient> for WindowState {
    fn from(client: &HyprClient) -> Self {
        Self {
            rect: Rect::new(
                client.at.0,
                client.at.1,
                client.size.0.max(0),
                client.size.1.max(0),
            ),
            workspace: client.workspace.id,
            monitor: client.monitor,
            fullscreen: client.fullscreen,
        }
    }
}

/// The current set of window geometries plus the active workspaces
///
/// Owned exclusively by the snapshot feed; the state machine receives
/// clones, never shared mutable access.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WindowSnapshot {
    windows: HashMap<String, WindowState>,
    active_workspaces: HashSet<i64>,
}

impl WindowSnapshot {
    /// Build a snapshot from a full inventory query
    ///
    /// Unmapped and hidden windows are dropped here so the overlap engine
    /// never has to reason about them.
    pub fn from_inventory(clients: &[HyprClient], monitors: &[HyprMonitor]) -> Self {
        let windows = clients
            .iter()
            .filter(|c| c.mapped && !c.hidden)
            .map(|c| (normalize_address(&c.address), WindowState::from(c)))
            .collect();

        let active_workspaces = monitors.iter().map(|m| m.active_workspace.id).collect();

        Self {
            windows,
            active_workspaces,
        }
    }

    pub fn windows(&self) -> impl Iterator<Item = &WindowState> {
        self.windows.values()
    }

    pub fn insert(&mut self, address: String, state: WindowState) {
        self.windows.insert(normalize_address(&address), state);
    }

    /// Remove a window; returns whether it was present
    pub fn remove(&mut self, address: &str) -> bool {
        self.windows.remove(&normalize_address(address)).is_some()
    }

    pub fn set_active_workspaces(&mut self, ids: impl IntoIterator<Item = i64>) {
        self.active_workspaces = ids.into_iter().collect();
    }

    pub fn is_workspace_active(&self, id: i64) -> bool {
        self.active_workspaces.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

/// Window addresses appear as `0x55d2...` in `j/clients` but without the
/// `0x` prefix on the event socket; normalize both to one key form.
pub fn normalize_address(address: &str) -> String {
    address
        .trim()
        .trim_start_matches("0x")
        .trim_start_matches(|c: char| c == '0')
        .to_lowercase()
}

/// A parsed frame from the event socket
///
/// Only the events that can change the overlap answer are distinguished;
/// everything else lands in `Other` and is dropped by the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HyprEvent {
    /// `openwindow>>ADDRESS,WORKSPACE,CLASS,TITLE`
    WindowOpened { address: String },
    /// `closewindow>>ADDRESS`
    WindowClosed { address: String },
    /// `movewindow>>ADDRESS,WORKSPACE` / `movewindowv2>>ADDRESS,WSID,WSNAME`
    WindowMoved { address: String },
    /// `workspace>>NAME` / `workspacev2>>ID,NAME`
    WorkspaceChanged,
    /// `focusedmon>>MONITOR,WORKSPACE`
    MonitorFocusChanged,
    /// `fullscreen>>0|1`
    FullscreenChanged,
    /// `changefloatingmode>>ADDRESS,0|1`
    FloatingModeChanged { address: String },
    /// `monitoradded>>NAME` / `monitorremoved>>NAME`
    MonitorLayoutChanged,
    /// Any other recognized frame; carries the event name for debug logs
    Other(String),
}

impl HyprEvent {
    /// Whether this event can change window geometry or workspace
    /// visibility, and therefore warrants a snapshot update.
    pub fn is_layout_relevant(&self) -> bool {
        !matches!(self, HyprEvent::Other(_))
    }
}

/// Parse one `NAME>>DATA` line from the event socket
///
/// Unknown event names are not an error: the protocol grows new events
/// regularly and they must pass through harmlessly. A line without the
/// `>>` separator is malformed.
pub fn parse_event_line(line: &str) -> Result<HyprEvent, HyprError> {
    let line = line.trim_end_matches('\n');
    let (name, data) = line.split_once(">>").ok_or_else(|| HyprError::MalformedEvent {
        line: line.to_string(),
    })?;

    let first_field = |data: &str| {
        data.split(',')
            .next()
            .unwrap_or_default()
            .to_string()
    };

    let event = match name {
        "openwindow" => HyprEvent::WindowOpened {
            address: first_field(data),
        },
        "closewindow" => HyprEvent::WindowClosed {
            address: first_field(data),
        },
        "movewindow" | "movewindowv2" => HyprEvent::WindowMoved {
            address: first_field(data),
        },
        "workspace" | "workspacev2" => HyprEvent::WorkspaceChanged,
        "focusedmon" | "focusedmonv2" => HyprEvent::MonitorFocusChanged,
        "fullscreen" => HyprEvent::FullscreenChanged,
        "changefloatingmode" => HyprEvent::FloatingModeChanged {
            address: first_field(data),
        },
        "monitoradded" | "monitoraddedv2" | "monitorremoved" => HyprEvent::MonitorLayoutChanged,
        other => HyprEvent::Other(other.to_string()),
    };

    Ok(event)
}
