/// Output relay: forwards each line of worker output to the consumer.
///
/// One relay task runs per worker. It owns the read end of the worker's
/// merged stdout/stderr pipe and is the only writer of `Line` events for
/// that worker, so delivery order equals production order.
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::unix::pipe;
use tokio::sync::mpsc;

use crate::supervisor::SupervisorEvent;

/// Read worker output line by line until the stream ends.
///
/// Lines are relayed with their terminator stripped but otherwise exact.
/// A read failure (including non-UTF-8 output) counts as end-of-output:
/// there is no retry, the supervisor is notified and resets run state.
/// Relaying stops early if the consumer has detached.
pub(crate) async fn pump_lines(
    stream: pipe::Receiver,
    events: mpsc::UnboundedSender<SupervisorEvent>,
    done: mpsc::UnboundedSender<u32>,
    pid: u32,
) {
    let mut lines = BufReader::new(stream).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if events.send(SupervisorEvent::Line(line)).is_err() {
                    tracing::debug!(pid, "output consumer detached, stopping relay");
                    break;
                }
            }
            Ok(None) => break,
            Err(err) => {
                tracing::warn!(pid, error = %err, "failed to read worker output");
                break;
            }
        }
    }
    tracing::debug!(pid, "worker output stream ended");
    let _ = done.send(pid);
}
