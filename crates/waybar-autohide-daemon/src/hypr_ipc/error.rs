//! Error types for Hyprland IPC operations

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when communicating with the Hyprland compositor
#[derive(Debug, Error)]
pub enum HyprError {
    /// The HYPRLAND_INSTANCE_SIGNATURE environment variable is not set
    #[error("HYPRLAND_INSTANCE_SIGNATURE not set - is Hyprland running?")]
    InstanceNotSet,

    /// The XDG_RUNTIME_DIR environment variable is not set
    #[error("XDG_RUNTIME_DIR not set - cannot locate the Hyprland socket directory")]
    RuntimeDirNotSet,

    /// The socket path does not exist
    #[error("Hyprland socket not found at {path}")]
    SocketNotFound { path: PathBuf },

    /// Failed to connect to a Hyprland socket
    #[error("Failed to connect to Hyprland socket at {path}: {source}")]
    ConnectionFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to send a request to Hyprland
    #[error("Failed to send request to Hyprland: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Failed to receive data from Hyprland
    #[error("Failed to receive data from Hyprland: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// Failed to deserialize a JSON response
    #[error("Failed to deserialize response to `{request}`: {source}")]
    DeserializeFailed {
        request: String,
        #[source]
        source: serde_json::Error,
    },

    /// An event frame did not match the `NAME>>DATA` wire format
    ///
    /// Recoverable: the reader logs the line and skips it.
    #[error("Malformed event frame: {line:?}")]
    MalformedEvent { line: String },

    /// Connection was closed unexpectedly
    #[error("Connection to Hyprland closed unexpectedly")]
    ConnectionClosed,

    /// Maximum reconnect attempts exceeded
    #[error("Failed to connect to Hyprland after {attempts} attempts")]
    MaxRetriesExceeded { attempts: u32 },
}
