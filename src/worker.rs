/// Single worker lifecycle: build the display-tool invocation, spawn it in
/// its own process group with stdout and stderr merged into one pipe, and
/// hand the read end to the output relay.
use std::io;
use std::process::Stdio;

use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use tokio::net::unix::pipe;
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::relay;
use crate::settings::ColorSettings;
use crate::supervisor::SupervisorEvent;

/// Errors that can occur while launching a worker.
#[derive(Debug)]
pub(crate) enum WorkerError {
    /// Failed to create or register the merged output pipe.
    Pipe { source: io::Error },
    /// Failed to spawn the worker process.
    Spawn { command: String, source: io::Error },
}

impl std::fmt::Display for WorkerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkerError::Pipe { source } => {
                write!(f, "failed to set up worker output pipe: {}", source)
            }
            WorkerError::Spawn { command, source } => {
                write!(f, "failed to launch {}: {}", command, source)
            }
        }
    }
}

impl std::error::Error for WorkerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WorkerError::Pipe { source } => Some(source),
            WorkerError::Spawn { source, .. } => Some(source),
        }
    }
}

/// An owned, live worker process.
///
/// Exclusively held by the supervisor; torn down (signalled, reaped, and
/// reader drained) before the next worker is spawned.
#[derive(Debug)]
pub(crate) struct WorkerHandle {
    pub(crate) child: Child,
    pub(crate) pid: u32,
    /// Relay task reading the merged output pipe.
    pub(crate) reader: JoinHandle<()>,
}

impl WorkerHandle {
    /// Send a signal to the worker's process group.
    ///
    /// The group is signalled rather than the single pid so helpers the
    /// worker forked die with it. A group that is already gone (ESRCH) is
    /// a no-op; other failures are logged and absorbed.
    pub(crate) fn signal_group(&self, sig: Signal) {
        if self.pid == 0 {
            return;
        }
        match signal::killpg(Pid::from_raw(self.pid as i32), sig) {
            Ok(()) | Err(Errno::ESRCH) => {}
            Err(err) => {
                tracing::warn!(pid = self.pid, signal = %sig, error = %err, "failed to signal worker group");
            }
        }
    }
}

/// Build the worker's argument array from a settings snapshot.
///
/// The invocation is `<command> -O <temperature> -b <fraction>`; the values
/// are passed as separate arguments, never through a shell.
pub(crate) fn build_args(settings: &ColorSettings) -> Vec<String> {
    vec![
        "-O".to_string(),
        settings.temperature.to_string(),
        "-b".to_string(),
        settings.brightness_fraction().to_string(),
    ]
}

/// Spawn the worker and its output relay.
///
/// Both stdout and stderr are pointed at the same anonymous pipe so the
/// consumer sees a single line stream in write order. The child gets its
/// own process group (via `process_group(0)`) so escalation can later kill
/// the whole group. `WorkerStarted` is sent here, before the relay task
/// exists, so it always precedes the worker's first output line.
pub(crate) fn spawn(
    command: &str,
    settings: &ColorSettings,
    events: mpsc::UnboundedSender<SupervisorEvent>,
    done: mpsc::UnboundedSender<u32>,
) -> Result<WorkerHandle, WorkerError> {
    let args = build_args(settings);
    tracing::info!(command, args = ?args, "starting worker");

    let (pipe_rx, pipe_tx) = io::pipe().map_err(|e| WorkerError::Pipe { source: e })?;
    // Second handle for stderr; both write ends close when the child exits.
    let pipe_tx_stderr = pipe_tx
        .try_clone()
        .map_err(|e| WorkerError::Pipe { source: e })?;

    let mut child = Command::new(command)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::from(pipe_tx))
        .stderr(Stdio::from(pipe_tx_stderr))
        .process_group(0) // New process group for clean kill
        .spawn()
        .map_err(|e| WorkerError::Spawn {
            command: command.to_string(),
            source: e,
        })?;

    let pid = child.id().unwrap_or(0);
    tracing::info!(pid, "worker process started");

    let stream = match pipe::Receiver::from_owned_fd(pipe_rx.into()) {
        Ok(stream) => stream,
        Err(e) => {
            // The child is already running; don't leak it.
            let _ = child.start_kill();
            return Err(WorkerError::Pipe { source: e });
        }
    };
    let _ = events.send(SupervisorEvent::WorkerStarted { pid });
    let reader = tokio::spawn(relay::pump_lines(stream, events, done, pid));

    Ok(WorkerHandle { child, pid, reader })
}
