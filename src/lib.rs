//! Debounced supervisor for display color adjustment commands.
//!
//! gammadial drives a `gammastep`-style tool: front-ends record slider
//! changes through [`SupervisorHandle::notify_changed`], and once the
//! changes go quiet the supervisor relaunches the command with fresh
//! arguments, relaying its merged stdout and stderr line by line over an
//! event channel. The previous invocation is always torn down first, with
//! SIGTERM and a bounded escalation to SIGKILL.

mod relay;
mod worker;

pub mod settings;
pub mod supervisor;

pub use settings::ColorSettings;
pub use supervisor::{spawn_supervisor, SupervisorConfig, SupervisorEvent, SupervisorHandle};
