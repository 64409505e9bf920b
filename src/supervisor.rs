/// Debounced process supervisor.
///
/// Owns the lifecycle of at most one worker process at a time. Parameter
/// changes are debounced: each notification cancels the pending scheduled
/// restart and schedules a new one after the quiet interval, so a burst of
/// slider movements ends in a single restart. Restarting tears the previous
/// worker down first: SIGTERM, a bounded grace wait, then SIGKILL.
///
/// All mutable state (worker handle, run state, latest settings, pending
/// deadline) lives inside the supervisor task; front-ends only talk to it
/// through a [`SupervisorHandle`] and the event channel returned by
/// [`spawn_supervisor`].
use std::time::Duration;

use nix::sys::signal::Signal;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

use crate::settings::ColorSettings;
use crate::worker::{self, WorkerHandle};

/// Worker command used when none is given.
pub const DEFAULT_WORKER_COMMAND: &str = "gammastep";

/// Bound on waiting for a torn-down worker's relay task to finish.
const READER_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Supervisor timings and the worker command.
///
/// These are fixed operational constants, not user configuration; tests
/// inject shorter timings.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Display adjustment command to supervise.
    pub command: String,
    /// Quiet interval a parameter burst must respect before a restart.
    pub debounce: Duration,
    /// Time a worker gets to exit after SIGTERM before SIGKILL.
    pub grace_period: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            command: DEFAULT_WORKER_COMMAND.to_string(),
            debounce: Duration::from_millis(1000),
            grace_period: Duration::from_secs(3),
        }
    }
}

/// Events delivered to the front-end, in order, on one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorEvent {
    /// A worker process was spawned. Always precedes its output lines.
    WorkerStarted { pid: u32 },
    /// The active worker is gone (torn down or exited on its own).
    WorkerStopped,
    /// One line of worker output, terminator stripped. Launch failures
    /// arrive as a single line starting with `Error: `.
    Line(String),
}

/// Run state of the supervised worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Idle,
    Starting,
    Running,
    Stopping,
}

#[derive(Debug)]
enum SupervisorCommand {
    /// A parameter changed; restart after the quiet interval.
    SettingsChanged(ColorSettings),
    /// Restart immediately with the given settings.
    Apply(ColorSettings),
    /// Tear the worker down without respawning.
    Stop,
    /// Tear down and exit the supervisor task.
    Shutdown,
}

/// Cheap, cloneable front-end handle to the supervisor task.
///
/// All methods are non-blocking; commands queue behind any in-flight
/// restart. Sends after the supervisor has exited are no-ops.
#[derive(Debug, Clone)]
pub struct SupervisorHandle {
    commands: mpsc::UnboundedSender<SupervisorCommand>,
}

impl SupervisorHandle {
    /// Record new settings and schedule a debounced restart.
    ///
    /// Callable repeatedly and cheaply; each call replaces the pending
    /// scheduled restart, and cancelling a fired or nonexistent timer is
    /// a no-op.
    pub fn notify_changed(&self, settings: ColorSettings) {
        let _ = self
            .commands
            .send(SupervisorCommand::SettingsChanged(settings));
    }

    /// Restart the worker now, superseding any pending debounce.
    pub fn apply(&self, settings: ColorSettings) {
        let _ = self.commands.send(SupervisorCommand::Apply(settings));
    }

    /// Stop the worker without respawning. No-op when idle.
    pub fn stop_worker(&self) {
        let _ = self.commands.send(SupervisorCommand::Stop);
    }

    /// Terminate any worker and end the supervisor task.
    pub fn shutdown(&self) {
        let _ = self.commands.send(SupervisorCommand::Shutdown);
    }
}

/// Start the supervisor task on the current tokio runtime.
///
/// Returns the command handle, the ordered event stream, and the task
/// handle to join on shutdown. Dropping every `SupervisorHandle` also shuts
/// the supervisor down.
pub fn spawn_supervisor(
    config: SupervisorConfig,
) -> (
    SupervisorHandle,
    mpsc::UnboundedReceiver<SupervisorEvent>,
    JoinHandle<()>,
) {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (done_tx, done_rx) = mpsc::unbounded_channel();

    let supervisor = Supervisor {
        config,
        events: event_tx,
        reader_done: done_tx,
        settings: ColorSettings::default(),
        worker: None,
        state: RunState::Idle,
        restart_at: None,
    };
    let task = tokio::spawn(supervisor.run(command_rx, done_rx));

    (
        SupervisorHandle {
            commands: command_tx,
        },
        event_rx,
        task,
    )
}

struct Supervisor {
    config: SupervisorConfig,
    events: mpsc::UnboundedSender<SupervisorEvent>,
    /// Handed to each worker's relay so it can report end-of-stream.
    reader_done: mpsc::UnboundedSender<u32>,
    /// Latest notified settings; snapshotted when a restart fires.
    settings: ColorSettings,
    worker: Option<WorkerHandle>,
    state: RunState,
    /// Deadline of the pending scheduled restart, if any.
    restart_at: Option<Instant>,
}

impl Supervisor {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<SupervisorCommand>,
        mut reader_done: mpsc::UnboundedReceiver<u32>,
    ) {
        loop {
            tokio::select! {
                cmd = commands.recv() => match cmd {
                    Some(SupervisorCommand::SettingsChanged(settings)) => {
                        self.settings = settings;
                        self.restart_at = Some(Instant::now() + self.config.debounce);
                    }
                    Some(SupervisorCommand::Apply(settings)) => {
                        self.settings = settings;
                        self.restart_at = None;
                        self.restart().await;
                    }
                    Some(SupervisorCommand::Stop) => {
                        self.restart_at = None;
                        self.stop_worker().await;
                    }
                    Some(SupervisorCommand::Shutdown) | None => break,
                },
                Some(pid) = reader_done.recv() => self.on_reader_done(pid),
                _ = time::sleep_until(self.restart_at.unwrap_or_else(Instant::now)),
                    if self.restart_at.is_some() =>
                {
                    self.restart_at = None;
                    self.restart().await;
                }
            }
        }

        tracing::debug!("supervisor shutting down");
        self.stop_worker().await;
    }

    /// Tear down the previous worker, then launch one with the current
    /// settings snapshot. Runs to completion before the next command is
    /// taken, so only one restart is ever in flight.
    async fn restart(&mut self) {
        self.stop_worker().await;

        self.set_state(RunState::Starting);
        match worker::spawn(
            &self.config.command,
            &self.settings,
            self.events.clone(),
            self.reader_done.clone(),
        ) {
            Ok(handle) => {
                self.worker = Some(handle);
                self.set_state(RunState::Running);
            }
            Err(err) => {
                tracing::warn!(error = %err, "worker launch failed");
                self.set_state(RunState::Idle);
                self.emit(SupervisorEvent::Line(format!("Error: {err}")));
            }
        }
    }

    /// Terminate the active worker: SIGTERM to its group, a bounded wait,
    /// SIGKILL if it overstays, then reap and drain its relay.
    async fn stop_worker(&mut self) {
        let Some(mut worker) = self.worker.take() else {
            return;
        };
        let was_running = self.state == RunState::Running;
        self.set_state(RunState::Stopping);

        tracing::info!(pid = worker.pid, "terminating worker");
        worker.signal_group(Signal::SIGTERM);
        match time::timeout(self.config.grace_period, worker.child.wait()).await {
            Ok(Ok(status)) => {
                tracing::info!(pid = worker.pid, exit_code = ?status.code(), "worker exited");
            }
            Ok(Err(err)) => {
                tracing::warn!(pid = worker.pid, error = %err, "failed to wait for worker");
            }
            Err(_) => {
                tracing::warn!(pid = worker.pid, "grace period expired, force killing worker");
                worker.signal_group(Signal::SIGKILL);
                if let Err(err) = worker.child.wait().await {
                    tracing::warn!(pid = worker.pid, error = %err, "failed to reap killed worker");
                }
            }
        }

        self.drain_reader(worker.reader).await;
        self.set_state(RunState::Idle);
        if was_running {
            self.emit(SupervisorEvent::WorkerStopped);
        }
    }

    /// Wait for a torn-down worker's relay task so its remaining lines are
    /// delivered before the next worker can produce any.
    async fn drain_reader(&self, mut reader: JoinHandle<()>) {
        match time::timeout(READER_DRAIN_TIMEOUT, &mut reader).await {
            Ok(_) => {}
            Err(_) => {
                tracing::warn!("output relay did not drain in time, aborting it");
                reader.abort();
                // The relay may be mid-poll on another thread; wait for
                // the abort to land so no line is emitted after teardown.
                let _ = reader.await;
            }
        }
    }

    /// The relay saw end-of-output for the given pid.
    ///
    /// For the active worker this normally means it exited on its own:
    /// reap it and go idle. A pid from an already replaced worker is
    /// stale and ignored.
    fn on_reader_done(&mut self, pid: u32) {
        let Some(active) = self.worker.as_mut() else {
            return;
        };
        if active.pid != pid {
            return;
        }

        match active.child.try_wait() {
            Ok(Some(status)) => {
                tracing::info!(pid, exit_code = ?status.code(), "worker exited on its own");
                self.worker = None;
            }
            Ok(None) => {
                // Stream closed but the process lives on. Report inactive,
                // keep the handle so a later restart or shutdown still
                // kills it.
                tracing::warn!(pid, "worker closed its output but is still running");
            }
            Err(err) => {
                tracing::warn!(pid, error = %err, "failed to reap worker");
                self.worker = None;
            }
        }
        self.set_state(RunState::Idle);
        self.emit(SupervisorEvent::WorkerStopped);
    }

    fn set_state(&mut self, state: RunState) {
        if self.state != state {
            tracing::debug!(from = ?self.state, to = ?state, "run state changed");
            self.state = state;
        }
    }

    fn emit(&self, event: SupervisorEvent) {
        // The consumer may already have detached during shutdown.
        let _ = self.events.send(event);
    }
}
