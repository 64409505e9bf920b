mod app;

use std::time::Duration;

use clap::Parser;

use gammadial::settings::{self, ColorSettings};
use gammadial::supervisor::{self, SupervisorConfig};

/// Slider front-end: adjust color temperature and brightness, and let the
/// supervisor relaunch the display adjustment command after each change
/// settles.
#[derive(Parser, Debug)]
#[command(name = "gammadial-ui", version, about)]
struct Cli {
    /// Initial color temperature in Kelvin (2000-6000)
    #[arg(short, long, default_value_t = settings::DEFAULT_TEMPERATURE)]
    temperature: u16,

    /// Initial brightness in percent (10-100)
    #[arg(short, long, default_value_t = settings::DEFAULT_BRIGHTNESS_PERCENT)]
    brightness: u8,

    /// Display adjustment command to run
    #[arg(long, default_value = supervisor::DEFAULT_WORKER_COMMAND)]
    command: String,

    /// Extra logging (state transitions, signal escalation)
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> eframe::Result {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "gammadial=debug,gammadial_ui=debug"
    } else {
        "gammadial=info,gammadial_ui=info"
    };
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.parse().unwrap()),
        )
        .init();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to build tokio runtime");

    // The supervisor task lives on the runtime; the window owns a handle.
    let (supervisor, events, task) = {
        let _guard = runtime.enter();
        supervisor::spawn_supervisor(SupervisorConfig {
            command: cli.command,
            ..SupervisorConfig::default()
        })
    };

    let initial = ColorSettings::new(cli.temperature, cli.brightness);
    tracing::info!(
        temperature = initial.temperature,
        brightness = initial.brightness_percent,
        "opening window"
    );

    let native_options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder {
            title: Some(String::from("gammadial")),
            app_id: Some(String::from("gammadial")),
            inner_size: Some(eframe::egui::vec2(420.0, 380.0)),
            ..eframe::egui::ViewportBuilder::default()
        },
        ..Default::default()
    };

    let ui_handle = supervisor.clone();
    let result = eframe::run_native(
        "gammadial",
        native_options,
        Box::new(move |cc| Ok(Box::new(app::GammadialApp::new(cc, ui_handle, events, initial)))),
    );

    // Window closed: stop any worker before the runtime goes away.
    tracing::info!("window closed, shutting down supervisor");
    supervisor.shutdown();
    let _ = runtime.block_on(async { tokio::time::timeout(Duration::from_secs(10), task).await });

    result
}
