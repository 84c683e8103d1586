//! waybar-autohide daemon
//!
//! Hides waybar while a window overlaps it and reveals it on pointer
//! hover, driven by Hyprland's IPC sockets.

mod bar;
mod engine;
mod geometry;
mod hover;
mod hypr_ipc;

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use waybar_autohide_config::{BarCommand, Config, Edge};

use crate::bar::{apply_command, sink_from_config};
use crate::engine::VisibilityEngine;
use crate::geometry::BarRegion;
use crate::hypr_ipc::{
    event_socket_path, request_socket_path, socket_dir, HyprMonitor, HyprRequestClient,
    SnapshotFeed, DEFAULT_CHANNEL_BUFFER,
};

#[derive(Parser, Debug)]
#[command(name = "waybar-autohided")]
#[command(about = "Autohide daemon for waybar on Hyprland")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "~/.config/waybar-autohide/config.kdl")]
    config: String,

    /// Screen edge the bar occupies (top/bottom/left/right)
    #[arg(long)]
    edge: Option<Edge>,

    /// Bar thickness in pixels
    #[arg(long)]
    thickness: Option<i32>,

    /// Hover reveal margin past the screen edge, in pixels
    #[arg(long)]
    reveal_margin: Option<i32>,

    /// Quiet period before hiding, in milliseconds
    #[arg(long)]
    debounce_ms: Option<u64>,

    /// Reveal the bar as soon as the overlap clears, without hover
    /// (`--reveal-on-clear=false` disables a config-file setting)
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    reveal_on_clear: Option<bool>,

    /// Monitor (output) name the bar lives on; defaults to the focused one
    #[arg(long)]
    monitor: Option<String>,

    /// Bar process name to signal (overrides the configured command)
    #[arg(long)]
    process: Option<String>,

    /// Hyprland socket directory (defaults to environment discovery)
    #[arg(long)]
    socket_dir: Option<PathBuf>,
}

/// Load the configuration file, falling back to defaults if it is absent
fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    waybar_autohide_config::parse_config(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))
}

/// Command-line flags override the file values
fn apply_overrides(config: &mut Config, args: &Args) {
    if let Some(edge) = args.edge {
        config.bar.edge = edge;
    }
    if let Some(thickness) = args.thickness {
        config.bar.thickness = thickness;
    }
    if let Some(margin) = args.reveal_margin {
        config.bar.reveal_margin = margin;
    }
    if let Some(debounce) = args.debounce_ms {
        config.bar.debounce_ms = debounce;
    }
    if let Some(reveal) = args.reveal_on_clear {
        config.bar.reveal_on_clear = reveal;
    }
    if let Some(monitor) = &args.monitor {
        config.bar.monitor = Some(monitor.clone());
    }
    if let Some(process) = &args.process {
        config.bar.command = BarCommand::Signal {
            process: process.clone(),
        };
    }
}

/// Pick the monitor the bar lives on: the configured name, or the
/// focused one when no name is configured.
fn select_monitor(monitors: Vec<HyprMonitor>, name: Option<&str>) -> Result<HyprMonitor> {
    if monitors.is_empty() {
        bail!("Hyprland reported no monitors");
    }

    match name {
        Some(name) => monitors
            .into_iter()
            .find(|m| m.name == name)
            .with_context(|| format!("No monitor named {:?}", name)),
        None => {
            let mut monitors = monitors;
            let focused = monitors.iter().position(|m| m.focused).unwrap_or(0);
            Ok(monitors.swap_remove(focused))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Expand tilde in config path
    let config_path: PathBuf = shellexpand::tilde(&args.config).into_owned().into();

    let mut config = load_config(&config_path)?;
    apply_overrides(&mut config, &args);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.global.log_level.as_directive())),
        )
        .init();

    if config_path.exists() {
        info!("Loaded configuration from {}", config_path.display());
    } else {
        info!(
            "No configuration at {}, using defaults",
            config_path.display()
        );
    }

    // Socket discovery failures are fatal: there is nothing to watch
    let socket_dir = match &args.socket_dir {
        Some(dir) => dir.clone(),
        None => socket_dir().context("Hyprland socket discovery failed")?,
    };
    let request_socket = request_socket_path(&socket_dir)?;
    let event_socket = event_socket_path(&socket_dir)?;
    info!("Using Hyprland sockets in {}", socket_dir.display());

    let client = HyprRequestClient::new(request_socket);

    let monitors = client
        .get_monitors()
        .await
        .context("Initial monitor query failed")?;
    let monitor = select_monitor(monitors, config.bar.monitor.as_deref())?;

    let bar = BarRegion::from_monitor(
        monitor.rect(),
        monitor.id,
        config.bar.edge,
        config.bar.thickness,
        config.bar.reveal_margin,
    );
    info!(
        monitor = %monitor.name,
        edge = config.bar.edge.as_str(),
        "Watching bar region {:?}",
        bar.region
    );

    let mut engine = VisibilityEngine::new(
        bar.clone(),
        Duration::from_millis(config.bar.debounce_ms),
        config.bar.reveal_on_clear,
    );
    let mut sink = sink_from_config(&config.bar.command);

    let (tx, mut rx) = tokio::sync::mpsc::channel(DEFAULT_CHANNEL_BUFFER);

    let mut feed = SnapshotFeed::new(client.clone(), event_socket, tx.clone()).spawn();
    let poller = tokio::spawn(hover::run_hover_poller(
        client,
        bar,
        Duration::from_millis(config.global.poll_interval_ms),
        tx,
    ));

    info!("waybar-autohide daemon started");

    loop {
        let deadline = engine.deadline();

        tokio::select! {
            maybe_event = rx.recv() => {
                let Some(event) = maybe_event else {
                    // Both producers are gone; nothing left to react to
                    break;
                };
                if let Some(visible) = engine.handle_event(event, Instant::now()) {
                    apply_command(sink.as_mut(), visible);
                }
            }

            _ = sleep_until_opt(deadline) => {
                if let Some(visible) = engine.handle_deadline(Instant::now()) {
                    apply_command(sink.as_mut(), visible);
                }
            }

            result = &mut feed => {
                // The feed only fails while seeding at startup; once
                // running it reconnects forever
                match result {
                    Ok(Ok(())) => break,
                    Ok(Err(e)) => return Err(e).context("Hyprland event feed failed"),
                    Err(e) => return Err(e).context("Hyprland event feed panicked"),
                }
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, shutting down");
                break;
            }
        }
    }

    feed.abort();
    poller.abort();

    debug!("Event loop exited");
    Ok(())
}

/// Sleep until the armed hide deadline, or forever when none is armed
async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline.into()).await,
        None => std::future::pending().await,
    }
}
