//! Hyprland event stream and the window snapshot feed
//!
//! The event socket (`.socket2.sock`) is a one-way connection: after
//! connecting, Hyprland continuously writes newline-framed `NAME>>DATA`
//! frames. No subscription handshake is needed.
//!
//! [`SnapshotFeed`] owns the daemon's [`WindowSnapshot`]. It seeds the
//! snapshot from a full inventory query on connect, patches it on events,
//! and publishes clones into the engine's event queue:
//!
//! ```text
//! +-----------------+      +--------+      +----------------+
//! | HyprEventStream | ---> | mpsc   | ---> | Engine event   |
//! | (feed task)     |      | channel|      | loop           |
//! +-----------------+      +--------+      +----------------+
//! ```
//!
//! ## Reconnection
//!
//! On EOF or connection reset the feed publishes a stale marker (the
//! engine then sits on its last decision, which fails safe toward a
//! visible bar) and reconnects with exponential backoff plus jitter,
//! 500ms doubling up to a 10s cap. Mid-run reconnection never gives up:
//! it keeps trying at the cap for as long as the outage lasts. Only the
//! initial startup connection is allowed to fail. After reconnecting the
//! feed requests a fresh full inventory, so no window from before the
//! disconnect can survive into the new snapshot.
//!
//! Malformed frames are logged and skipped; a compositor restart must
//! never take the daemon down with it.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::UnixStream;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::engine::EngineEvent;

use super::client::HyprRequestClient;
use super::error::HyprError;
use super::types::{parse_event_line, HyprEvent, WindowSnapshot};

/// Retry attempts for the initial event stream connection at startup
const DEFAULT_MAX_RETRIES: u32 = 5;

/// Initial delay between retry attempts (500ms)
const INITIAL_RETRY_DELAY_MS: u64 = 500;

/// Maximum delay between retry attempts (10 seconds)
const MAX_RETRY_DELAY_MS: u64 = 10_000;

/// Default buffer size for the engine event channel
pub const DEFAULT_CHANNEL_BUFFER: usize = 64;

/// Jitter added to a backoff delay so a fleet of bar instances does not
/// reconnect in lockstep after a compositor restart. Up to a quarter of
/// the base delay, derived from the clock instead of pulling in an RNG.
fn jitter_ms(delay_ms: u64) -> u64 {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as u64)
        .unwrap_or(0);
    nanos % (delay_ms / 4 + 1)
}

/// A live connection to the Hyprland event socket
#[derive(Debug)]
pub struct HyprEventStream {
    reader: BufReader<UnixStream>,
}

impl HyprEventStream {
    /// Connect to the event socket; events start flowing immediately
    pub async fn connect(path: &Path) -> Result<Self, HyprError> {
        let socket = UnixStream::connect(path)
            .await
            .map_err(|e| HyprError::ConnectionFailed {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(Self {
            reader: BufReader::new(socket),
        })
    }

    /// Connect with exponential backoff and jitter
    ///
    /// # Errors
    ///
    /// Returns `HyprError::MaxRetriesExceeded` once all attempts fail.
    pub async fn connect_with_retry(path: &Path, max_retries: u32) -> Result<Self, HyprError> {
        let mut attempt = 0;
        let mut delay_ms = INITIAL_RETRY_DELAY_MS;
        let mut last_error: Option<HyprError> = None;

        loop {
            attempt += 1;

            match Self::connect(path).await {
                Ok(stream) => {
                    if attempt > 1 {
                        info!("Hyprland event stream connected after {} attempt(s)", attempt);
                    }
                    return Ok(stream);
                }
                Err(e) => {
                    last_error = Some(e);

                    if attempt > max_retries {
                        break;
                    }

                    let delay = delay_ms + jitter_ms(delay_ms);
                    warn!(
                        attempt = attempt,
                        max_retries = max_retries,
                        delay_ms = delay,
                        "Hyprland event stream connection failed, retrying..."
                    );

                    sleep(Duration::from_millis(delay)).await;
                    delay_ms = (delay_ms * 2).min(MAX_RETRY_DELAY_MS);
                }
            }
        }

        warn!(
            attempts = attempt,
            last_error = ?last_error,
            "Failed to connect to Hyprland event stream after all retry attempts"
        );

        Err(HyprError::MaxRetriesExceeded { attempts: attempt })
    }

    /// Read the next well-formed event
    ///
    /// Malformed frames are logged and skipped rather than surfaced;
    /// only connection-level failures reach the caller.
    ///
    /// # Errors
    ///
    /// Returns `HyprError::ConnectionClosed` on EOF and
    /// `HyprError::ReceiveFailed` on socket errors.
    pub async fn next_event(&mut self) -> Result<HyprEvent, HyprError> {
        loop {
            let mut line = String::new();

            let bytes_read = self
                .reader
                .read_line(&mut line)
                .await
                .map_err(HyprError::ReceiveFailed)?;

            if bytes_read == 0 {
                return Err(HyprError::ConnectionClosed);
            }

            match parse_event_line(&line) {
                Ok(event) => return Ok(event),
                Err(e) => {
                    warn!("Skipping malformed event frame: {}", e);
                }
            }
        }
    }
}

/// Owns the window snapshot and feeds the engine queue
///
/// Exactly one feed runs per bar instance. The snapshot is never shared
/// mutably: the engine only ever receives clones.
#[derive(Debug)]
pub struct SnapshotFeed {
    request: HyprRequestClient,
    event_socket: PathBuf,
    sender: mpsc::Sender<EngineEvent>,
}

impl SnapshotFeed {
    pub fn new(
        request: HyprRequestClient,
        event_socket: PathBuf,
        sender: mpsc::Sender<EngineEvent>,
    ) -> Self {
        Self {
            request,
            event_socket,
            sender,
        }
    }

    /// Spawn the feed as a background task
    pub fn spawn(self) -> tokio::task::JoinHandle<Result<(), HyprError>> {
        tokio::spawn(self.run())
    }

    /// Run the feed: seed, then stream
    ///
    /// The initial connect and inventory query surface errors; startup is
    /// the only fatal phase. After that the feed reconnects forever and
    /// only returns `Ok(())` once the engine side of the channel is
    /// dropped (shutdown).
    pub async fn run(self) -> Result<(), HyprError> {
        let mut stream =
            HyprEventStream::connect_with_retry(&self.event_socket, DEFAULT_MAX_RETRIES).await?;

        let mut snapshot = self.query_inventory().await?;
        debug!(windows = snapshot.len(), "Seeded window snapshot");
        if !self.publish(EngineEvent::Snapshot(snapshot.clone())).await {
            return Ok(());
        }

        loop {
            match stream.next_event().await {
                Ok(event) => {
                    if !self.apply_event(event, &mut snapshot).await {
                        return Ok(());
                    }
                }
                Err(e) => {
                    warn!("Hyprland event stream disconnected ({}), reconnecting...", e);

                    if !self.publish(EngineEvent::SnapshotStale).await {
                        return Ok(());
                    }

                    (stream, snapshot) = self.reestablish().await;
                    info!(
                        windows = snapshot.len(),
                        "Reconnected to Hyprland, snapshot rebuilt"
                    );
                    if !self.publish(EngineEvent::Snapshot(snapshot.clone())).await {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Reconnect and re-query the full inventory until both succeed
    ///
    /// Never gives up: a compositor outage mid-run must not take the
    /// daemon down, however long it lasts. The backoff doubles up to the
    /// 10s cap and stays there. Nothing from before the disconnect
    /// survives into the returned snapshot.
    async fn reestablish(&self) -> (HyprEventStream, WindowSnapshot) {
        let mut delay_ms = INITIAL_RETRY_DELAY_MS;

        loop {
            match HyprEventStream::connect(&self.event_socket).await {
                Ok(stream) => match self.query_inventory().await {
                    Ok(snapshot) => return (stream, snapshot),
                    Err(e) => warn!("Inventory query failed after reconnect: {}", e),
                },
                Err(e) => warn!("Hyprland event stream reconnect failed: {}", e),
            }

            let delay = delay_ms + jitter_ms(delay_ms);
            sleep(Duration::from_millis(delay)).await;
            delay_ms = (delay_ms * 2).min(MAX_RETRY_DELAY_MS);
        }
    }

    /// Apply one event to the snapshot, publishing if it changed
    ///
    /// Returns `false` when the engine receiver is gone.
    async fn apply_event(&self, event: HyprEvent, snapshot: &mut WindowSnapshot) -> bool {
        match event {
            HyprEvent::WindowClosed { address } => {
                // The one patch that needs no re-query
                if snapshot.remove(&address) {
                    debug!(address = %address, "Window closed");
                    return self.publish(EngineEvent::Snapshot(snapshot.clone())).await;
                }
                true
            }
            event if event.is_layout_relevant() => {
                // Geometry is not carried on the event socket; re-query
                match self.query_inventory().await {
                    Ok(fresh) => {
                        if fresh != *snapshot {
                            *snapshot = fresh;
                            return self.publish(EngineEvent::Snapshot(snapshot.clone())).await;
                        }
                        true
                    }
                    Err(e) => {
                        // Keep the previous snapshot; the next event will
                        // try again
                        warn!("Inventory query failed after {:?}: {}", event, e);
                        true
                    }
                }
            }
            other => {
                debug!(event = ?other, "Ignoring event");
                true
            }
        }
    }

    /// Full inventory query: clients plus monitors
    async fn query_inventory(&self) -> Result<WindowSnapshot, HyprError> {
        let clients = self.request.get_clients().await?;
        let monitors = self.request.get_monitors().await?;
        Ok(WindowSnapshot::from_inventory(&clients, &monitors))
    }

    async fn publish(&self, event: EngineEvent) -> bool {
        if self.sender.send(event).await.is_err() {
            debug!("Engine receiver dropped, shutting down snapshot feed");
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::UnixListener;

    const MONITORS_JSON: &str = r#"[{
        "id": 0, "name": "DP-1",
        "x": 0, "y": 0, "width": 1920, "height": 1080,
        "activeWorkspace": {"id": 1, "name": "1"},
        "focused": true
    }]"#;

    const CLIENTS_JSON: &str = r#"[{
        "address": "0x55d2c9a0",
        "mapped": true, "hidden": false,
        "at": [100, 0], "size": [500, 400],
        "workspace": {"id": 1, "name": "1"},
        "monitor": 0, "fullscreen": false
    }]"#;

    /// A fake Hyprland request socket answering inventory queries until
    /// the listener is dropped.
    fn spawn_fake_request_server(listener: UnixListener) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let mut buf = vec![0u8; 256];
                let n = stream.read(&mut buf).await.unwrap_or(0);
                let command = String::from_utf8_lossy(&buf[..n]).to_string();
                let reply = match command.as_str() {
                    "j/clients" => CLIENTS_JSON,
                    "j/monitors" => MONITORS_JSON,
                    _ => "[]",
                };
                let _ = stream.write_all(reply.as_bytes()).await;
            }
        })
    }

    #[tokio::test]
    async fn test_event_stream_reads_frames() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join(".socket2.sock");
        let listener = UnixListener::bind(&path).unwrap();

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            stream
                .write_all(b"openwindow>>55d2,1,firefox,Firefox\ncloseindow-garbage\nclosewindow>>55d2\n")
                .await
                .unwrap();
        });

        let mut stream = HyprEventStream::connect(&path).await.unwrap();

        assert_eq!(
            stream.next_event().await.unwrap(),
            HyprEvent::WindowOpened {
                address: "55d2".to_string()
            }
        );
        // The malformed middle line is skipped, not fatal
        assert_eq!(
            stream.next_event().await.unwrap(),
            HyprEvent::WindowClosed {
                address: "55d2".to_string()
            }
        );

        server.await.unwrap();

        // EOF after the server hangs up
        assert!(matches!(
            stream.next_event().await,
            Err(HyprError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn test_connect_with_retry_gives_up() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join(".socket2.sock");
        // Nothing is listening

        let result = HyprEventStream::connect_with_retry(&path, 0).await;
        assert!(matches!(
            result,
            Err(HyprError::MaxRetriesExceeded { attempts: 1 })
        ));
    }

    #[tokio::test]
    async fn test_feed_seeds_and_patches_snapshot() {
        let temp = tempfile::tempdir().unwrap();
        let request_path = temp.path().join(".socket.sock");
        let event_path = temp.path().join(".socket2.sock");

        let request_server =
            spawn_fake_request_server(UnixListener::bind(&request_path).unwrap());
        let event_listener = UnixListener::bind(&event_path).unwrap();

        let (tx, mut rx) = mpsc::channel(DEFAULT_CHANNEL_BUFFER);
        let feed = SnapshotFeed::new(
            HyprRequestClient::new(request_path),
            event_path,
            tx,
        );
        let feed_handle = feed.spawn();

        let (mut event_stream, _) = event_listener.accept().await.unwrap();

        // Seed snapshot from the initial inventory
        let seeded = match rx.recv().await.unwrap() {
            EngineEvent::Snapshot(snap) => snap,
            other => panic!("Expected Snapshot, got {:?}", other),
        };
        assert_eq!(seeded.len(), 1);
        assert!(seeded.is_workspace_active(1));

        // closewindow patches the snapshot without re-querying
        event_stream
            .write_all(b"closewindow>>55d2c9a0\n")
            .await
            .unwrap();

        let patched = match rx.recv().await.unwrap() {
            EngineEvent::Snapshot(snap) => snap,
            other => panic!("Expected Snapshot, got {:?}", other),
        };
        assert!(patched.is_empty());

        drop(rx);
        // Feed shuts down cleanly once the engine side is gone; the next
        // publish attempt notices the closed channel
        event_stream.write_all(b"workspace>>2\n").await.unwrap();
        let result = feed_handle.await.unwrap();
        assert!(result.is_ok());

        request_server.abort();
    }

    #[tokio::test]
    async fn test_feed_reconnects_with_fresh_inventory() {
        let temp = tempfile::tempdir().unwrap();
        let request_path = temp.path().join(".socket.sock");
        let event_path = temp.path().join(".socket2.sock");

        let request_server =
            spawn_fake_request_server(UnixListener::bind(&request_path).unwrap());
        let event_listener = UnixListener::bind(&event_path).unwrap();

        let (tx, mut rx) = mpsc::channel(DEFAULT_CHANNEL_BUFFER);
        let feed = SnapshotFeed::new(
            HyprRequestClient::new(request_path),
            event_path,
            tx,
        );
        let _feed_handle = feed.spawn();

        let (mut event_stream, _) = event_listener.accept().await.unwrap();
        let seeded = rx.recv().await.unwrap();
        assert!(matches!(seeded, EngineEvent::Snapshot(_)));

        // Remove the window, then drop the connection (compositor restart)
        event_stream
            .write_all(b"closewindow>>55d2c9a0\n")
            .await
            .unwrap();
        let patched = match rx.recv().await.unwrap() {
            EngineEvent::Snapshot(snap) => snap,
            other => panic!("Expected Snapshot, got {:?}", other),
        };
        assert!(patched.is_empty());

        drop(event_stream);

        // Stale marker first, then a rebuilt snapshot after reconnect
        assert!(matches!(
            rx.recv().await.unwrap(),
            EngineEvent::SnapshotStale
        ));

        let (_event_stream, _) = event_listener.accept().await.unwrap();
        let rebuilt = match rx.recv().await.unwrap() {
            EngineEvent::Snapshot(snap) => snap,
            other => panic!("Expected Snapshot, got {:?}", other),
        };
        // Rebuilt from a full re-query: the window is back because the
        // fake server still reports it
        assert_eq!(rebuilt.len(), 1);

        request_server.abort();
    }

    #[tokio::test]
    async fn test_feed_survives_failed_reconnect_attempts() {
        let temp = tempfile::tempdir().unwrap();
        let request_path = temp.path().join(".socket.sock");
        let event_path = temp.path().join(".socket2.sock");

        let request_server =
            spawn_fake_request_server(UnixListener::bind(&request_path).unwrap());
        let event_listener = UnixListener::bind(&event_path).unwrap();

        let (tx, mut rx) = mpsc::channel(DEFAULT_CHANNEL_BUFFER);
        let feed = SnapshotFeed::new(
            HyprRequestClient::new(request_path),
            event_path.clone(),
            tx,
        );
        let feed_handle = feed.spawn();

        let (event_stream, _) = event_listener.accept().await.unwrap();
        assert!(matches!(
            rx.recv().await.unwrap(),
            EngineEvent::Snapshot(_)
        ));

        // The compositor goes away entirely: connection dropped and the
        // socket file gone, so reconnect attempts fail outright
        drop(event_stream);
        drop(event_listener);
        std::fs::remove_file(&event_path).unwrap();

        assert!(matches!(
            rx.recv().await.unwrap(),
            EngineEvent::SnapshotStale
        ));

        // Let at least one reconnect attempt fail against the missing
        // socket; the feed task must still be running
        tokio::time::sleep(Duration::from_millis(700)).await;
        assert!(!feed_handle.is_finished());

        // The compositor comes back; a later attempt finds it and the
        // snapshot is rebuilt from a fresh inventory
        let event_listener = UnixListener::bind(&event_path).unwrap();
        let rebuilt = match rx.recv().await.unwrap() {
            EngineEvent::Snapshot(snap) => snap,
            other => panic!("Expected Snapshot, got {:?}", other),
        };
        assert_eq!(rebuilt.len(), 1);

        drop(event_listener);
        request_server.abort();
    }

    #[test]
    fn test_jitter_is_bounded() {
        for _ in 0..100 {
            assert!(jitter_ms(1000) <= 250);
        }
        assert_eq!(jitter_ms(0), 0);
    }
}
