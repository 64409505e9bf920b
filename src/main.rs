use clap::Parser;

use gammadial::settings::{self, ColorSettings};
use gammadial::supervisor::{self, SupervisorConfig, SupervisorEvent};

/// Headless front-end: apply one temperature/brightness setting through the
/// supervisor, stream the worker's output to stdout, and exit when the
/// worker does.
#[derive(Parser, Debug)]
#[command(name = "gammadial", version, about)]
struct Cli {
    /// Color temperature in Kelvin (2000-6000)
    #[arg(short, long, default_value_t = settings::DEFAULT_TEMPERATURE)]
    temperature: u16,

    /// Brightness in percent (10-100)
    #[arg(short, long, default_value_t = settings::DEFAULT_BRIGHTNESS_PERCENT)]
    brightness: u8,

    /// Display adjustment command to run
    #[arg(long, default_value = supervisor::DEFAULT_WORKER_COMMAND)]
    command: String,

    /// Extra logging (state transitions, signal escalation)
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries only the worker's output lines.
    let default_filter = if cli.verbose {
        "gammadial=debug"
    } else {
        "gammadial=info"
    };
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.parse().unwrap()),
        )
        .init();

    let settings = ColorSettings::new(cli.temperature, cli.brightness);
    tracing::info!(
        temperature = settings.temperature,
        brightness = settings.brightness_percent,
        command = %cli.command,
        "applying settings"
    );

    let (handle, mut events, task) = supervisor::spawn_supervisor(SupervisorConfig {
        command: cli.command,
        ..SupervisorConfig::default()
    });
    handle.apply(settings);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut worker_seen = false;
    let mut launch_failed = false;
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(SupervisorEvent::WorkerStarted { pid }) => {
                    worker_seen = true;
                    tracing::debug!(pid, "worker running");
                }
                Some(SupervisorEvent::Line(line)) => {
                    println!("{line}");
                    // A start report always precedes worker output, so a
                    // line arriving before one is the launch failure.
                    if !worker_seen {
                        launch_failed = true;
                        break;
                    }
                }
                Some(SupervisorEvent::WorkerStopped) | None => break,
            },
            _ = &mut ctrl_c => {
                tracing::info!("interrupt received, shutting down");
                break;
            }
        }
    }

    handle.shutdown();
    let _ = task.await;

    if launch_failed {
        std::process::exit(1);
    }
}
