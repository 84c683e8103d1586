//! Applying visibility decisions to the bar process
//!
//! The engine decides, this module delivers. Two control channels are
//! supported:
//!
//! - [`SignalSink`]: SIGUSR1 to the bar process, waybar's built-in
//!   visibility toggle. The engine emits exactly one command per
//!   effective change, so one toggle per command keeps waybar in step.
//! - [`ExecSink`]: an arbitrary shell command per direction, for bars
//!   driven through a CLI or a control socket.
//!
//! Command failures never stall the event loop: [`apply_command`] logs,
//! retries once, then drops the command. The bar simply stays in its
//! previous state until the next transition.

use std::path::Path;

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use thiserror::Error;
use tracing::{debug, warn};

use waybar_autohide_config::BarCommand;

/// The kernel truncates /proc/<pid>/comm to this many bytes
const COMM_MAX: usize = 15;

/// Errors from the bar control channel
#[derive(Debug, Error)]
pub enum CommandError {
    /// No process with the configured comm name is running
    #[error("No process named {name:?} found")]
    NoSuchProcess { name: String },

    /// Signal delivery failed
    #[error("Failed to signal pid {pid}: {source}")]
    Signal {
        pid: i32,
        #[source]
        source: nix::Error,
    },

    /// The configured command could not be started
    #[error("Failed to run {command:?}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The configured command ran but reported failure
    #[error("Command {command:?} exited with {status}")]
    CommandFailed {
        command: String,
        status: std::process::ExitStatus,
    },
}

/// Applies a visibility decision to the bar process
pub trait BarCommandSink: Send {
    fn set_visible(&mut self, visible: bool) -> Result<(), CommandError>;
}

/// Build the sink the configuration asks for
pub fn sink_from_config(command: &BarCommand) -> Box<dyn BarCommandSink> {
    match command {
        BarCommand::Signal { process } => Box::new(SignalSink::new(process.clone())),
        BarCommand::Exec { show, hide } => Box::new(ExecSink::new(show.clone(), hide.clone())),
    }
}

/// Apply one command through the sink: log, retry once, then drop
pub fn apply_command(sink: &mut dyn BarCommandSink, visible: bool) {
    debug!(visible = visible, "Applying visibility command");

    match sink.set_visible(visible) {
        Ok(()) => {}
        Err(first) => {
            warn!("Bar command failed, retrying once: {}", first);
            if let Err(second) = sink.set_visible(visible) {
                warn!("Bar command failed again, dropping it: {}", second);
            }
        }
    }
}

/// Delivers SIGUSR1 to every process whose comm matches the bar's name
///
/// This is the classic `pkill -USR1 waybar`, done in-process: scan
/// /proc for matching comm entries and signal each one.
#[derive(Debug)]
pub struct SignalSink {
    process: String,
}

impl SignalSink {
    pub fn new(process: String) -> Self {
        Self { process }
    }
}

impl BarCommandSink for SignalSink {
    fn set_visible(&mut self, _visible: bool) -> Result<(), CommandError> {
        let pids = pids_by_comm(&self.process);
        if pids.is_empty() {
            return Err(CommandError::NoSuchProcess {
                name: self.process.clone(),
            });
        }

        for pid in pids {
            kill(Pid::from_raw(pid), Signal::SIGUSR1)
                .map_err(|source| CommandError::Signal { pid, source })?;
        }

        Ok(())
    }
}

/// Find pids whose /proc/<pid>/comm matches `name`
///
/// The kernel truncates comm at a byte count, not a char boundary, so
/// the needle is truncated and compared as raw bytes the same way pkill
/// does.
fn pids_by_comm(name: &str) -> Vec<i32> {
    let bytes = name.as_bytes();
    let needle = &bytes[..bytes.len().min(COMM_MAX)];
    let mut pids = Vec::new();

    let Ok(entries) = std::fs::read_dir("/proc") else {
        return pids;
    };

    for entry in entries.flatten() {
        let Some(pid) = entry
            .file_name()
            .to_str()
            .and_then(|n| n.parse::<i32>().ok())
        else {
            continue;
        };

        let comm_path = Path::new("/proc").join(pid.to_string()).join("comm");
        let Ok(comm) = std::fs::read_to_string(comm_path) else {
            continue;
        };

        if comm.trim_end().as_bytes() == needle {
            pids.push(pid);
        }
    }

    pids
}

/// Runs a configured shell command per direction
#[derive(Debug)]
pub struct ExecSink {
    show: String,
    hide: String,
}

impl ExecSink {
    pub fn new(show: String, hide: String) -> Self {
        Self { show, hide }
    }
}

impl BarCommandSink for ExecSink {
    fn set_visible(&mut self, visible: bool) -> Result<(), CommandError> {
        let command = if visible { &self.show } else { &self.hide };

        let status = std::process::Command::new("/bin/sh")
            .arg("-c")
            .arg(command)
            .status()
            .map_err(|source| CommandError::Spawn {
                command: command.clone(),
                source,
            })?;

        if !status.success() {
            return Err(CommandError::CommandFailed {
                command: command.clone(),
                status,
            });
        }

        Ok(())
    }
}
