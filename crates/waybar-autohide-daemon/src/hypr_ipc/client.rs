//! Hyprland request socket client
//!
//! Hyprland exposes two Unix sockets under
//! `$XDG_RUNTIME_DIR/hypr/$HYPRLAND_INSTANCE_SIGNATURE/`:
//!
//! - `.socket.sock` — request/response; the client writes one command
//!   (e.g. `j/clients`) and reads the reply until the server closes the
//!   connection. One connection per request.
//! - `.socket2.sock` — the event stream, handled in [`super::events`].
//!
//! The `j/` prefix asks for JSON output, the same payloads `hyprctl -j`
//! prints.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;

use super::error::HyprError;
use super::types::{CursorPos, HyprClient, HyprMonitor};

/// Environment variable carrying the running compositor instance id
const HYPR_INSTANCE_ENV: &str = "HYPRLAND_INSTANCE_SIGNATURE";

/// Environment variable pointing at the per-user runtime directory
const RUNTIME_DIR_ENV: &str = "XDG_RUNTIME_DIR";

/// Request socket file name inside the instance directory
const REQUEST_SOCKET: &str = ".socket.sock";

/// Event socket file name inside the instance directory
const EVENT_SOCKET: &str = ".socket2.sock";

/// Discover the Hyprland socket directory from the environment
///
/// # Errors
///
/// Returns `HyprError::InstanceNotSet` if `$HYPRLAND_INSTANCE_SIGNATURE`
/// is missing, `HyprError::RuntimeDirNotSet` if `$XDG_RUNTIME_DIR` is
/// missing, and `HyprError::SocketNotFound` if the directory does not
/// exist. All three are fatal at startup.
pub fn socket_dir() -> Result<PathBuf, HyprError> {
    let instance =
        std::env::var(HYPR_INSTANCE_ENV).map_err(|_| HyprError::InstanceNotSet)?;
    let runtime_dir =
        std::env::var(RUNTIME_DIR_ENV).map_err(|_| HyprError::RuntimeDirNotSet)?;

    let dir = PathBuf::from(runtime_dir).join("hypr").join(instance);

    if !dir.exists() {
        return Err(HyprError::SocketNotFound { path: dir });
    }

    Ok(dir)
}

/// Path of the request socket inside `dir`, validated to exist
pub fn request_socket_path(dir: &Path) -> Result<PathBuf, HyprError> {
    let path = dir.join(REQUEST_SOCKET);
    if !path.exists() {
        return Err(HyprError::SocketNotFound { path });
    }
    Ok(path)
}

/// Path of the event socket inside `dir`, validated to exist
pub fn event_socket_path(dir: &Path) -> Result<PathBuf, HyprError> {
    let path = dir.join(EVENT_SOCKET);
    if !path.exists() {
        return Err(HyprError::SocketNotFound { path });
    }
    Ok(path)
}

/// Client for the Hyprland request socket
///
/// Holds only the socket path; a fresh connection is made per request
/// because Hyprland closes the socket after each reply.
///
/// # Example
///
/// ```ignore
/// let dir = socket_dir()?;
/// let client = HyprRequestClient::new(request_socket_path(&dir)?);
/// let monitors = client.get_monitors().await?;
/// ```
#[derive(Debug, Clone)]
pub struct HyprRequestClient {
    socket_path: PathBuf,
}

impl HyprRequestClient {
    pub fn new(socket_path: PathBuf) -> Self {
        Self { socket_path }
    }

    /// Discover the socket from the environment and validate it exists
    pub fn from_env() -> Result<Self, HyprError> {
        let dir = socket_dir()?;
        Ok(Self::new(request_socket_path(&dir)?))
    }

    /// Send one command and read the raw reply to EOF
    pub async fn request_raw(&self, command: &str) -> Result<Vec<u8>, HyprError> {
        let mut socket = UnixStream::connect(&self.socket_path)
            .await
            .map_err(|e| HyprError::ConnectionFailed {
                path: self.socket_path.clone(),
                source: e,
            })?;

        socket
            .write_all(command.as_bytes())
            .await
            .map_err(HyprError::SendFailed)?;
        socket.flush().await.map_err(HyprError::SendFailed)?;

        // Hyprland replies then closes; read everything
        let mut response = Vec::new();
        socket
            .read_to_end(&mut response)
            .await
            .map_err(HyprError::ReceiveFailed)?;

        Ok(response)
    }

    /// Send a `j/`-prefixed command and deserialize the JSON reply
    async fn request_json<T: DeserializeOwned>(&self, command: &str) -> Result<T, HyprError> {
        let raw = self.request_raw(command).await?;
        serde_json::from_slice(&raw).map_err(|source| HyprError::DeserializeFailed {
            request: command.to_string(),
            source,
        })
    }

    /// Query all windows
    pub async fn get_clients(&self) -> Result<Vec<HyprClient>, HyprError> {
        self.request_json("j/clients").await
    }

    /// Query all monitors (including each one's active workspace)
    pub async fn get_monitors(&self) -> Result<Vec<HyprMonitor>, HyprError> {
        self.request_json("j/monitors").await
    }

    /// Query the current pointer position in global screen coordinates
    pub async fn get_cursor_pos(&self) -> Result<CursorPos, HyprError> {
        self.request_json("j/cursorpos").await
    }
}
