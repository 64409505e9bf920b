use std::collections::VecDeque;
use std::time::Duration;

use eframe::egui;
use tokio::sync::mpsc;

use gammadial::settings::{self, ColorSettings};
use gammadial::supervisor::{SupervisorEvent, SupervisorHandle};

/// Retained output lines; older lines fall off the front.
const MAX_LOG_LINES: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WorkerStatus {
    Idle,
    Running { pid: u32 },
}

/// Two sliders over the supervisor.
///
/// Slider changes only notify; the supervisor's debounce decides when the
/// worker actually restarts. Supervisor events are drained on the UI
/// thread in `update`, so no worker output touches UI state from another
/// thread.
pub struct GammadialApp {
    supervisor: SupervisorHandle,
    events: mpsc::UnboundedReceiver<SupervisorEvent>,
    temperature: u16,
    brightness: u8,
    status: WorkerStatus,
    log: VecDeque<String>,
}

impl GammadialApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        supervisor: SupervisorHandle,
        events: mpsc::UnboundedReceiver<SupervisorEvent>,
        initial: ColorSettings,
    ) -> Self {
        Self {
            supervisor,
            events,
            temperature: initial.temperature,
            brightness: initial.brightness_percent,
            status: WorkerStatus::Idle,
            log: VecDeque::new(),
        }
    }

    fn current_settings(&self) -> ColorSettings {
        ColorSettings::new(self.temperature, self.brightness)
    }

    fn drain_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            match event {
                SupervisorEvent::WorkerStarted { pid } => {
                    self.status = WorkerStatus::Running { pid };
                }
                SupervisorEvent::WorkerStopped => self.status = WorkerStatus::Idle,
                SupervisorEvent::Line(line) => self.push_line(line),
            }
        }
    }

    fn push_line(&mut self, line: String) {
        if self.log.len() == MAX_LOG_LINES {
            self.log.pop_front();
        }
        self.log.push_back(line);
    }

    fn render_controls(&mut self, ui: &mut egui::Ui) {
        ui.label("Color temperature");
        if ui
            .add(egui::Slider::new(&mut self.temperature, settings::TEMPERATURE_RANGE).suffix(" K"))
            .changed()
        {
            self.supervisor.notify_changed(self.current_settings());
        }

        ui.label("Brightness");
        if ui
            .add(
                egui::Slider::new(&mut self.brightness, settings::BRIGHTNESS_RANGE)
                    .step_by(f64::from(settings::BRIGHTNESS_STEP))
                    .suffix(" %"),
            )
            .changed()
        {
            self.supervisor.notify_changed(self.current_settings());
        }

        ui.add_space(4.0);
        ui.horizontal(|ui| {
            if ui.button("Apply now").clicked() {
                self.supervisor.apply(self.current_settings());
            }
            if ui.button("Stop").clicked() {
                self.supervisor.stop_worker();
            }
            match self.status {
                WorkerStatus::Running { pid } => {
                    ui.colored_label(egui::Color32::GREEN, format!("● running (pid {pid})"));
                }
                WorkerStatus::Idle => {
                    ui.colored_label(egui::Color32::GRAY, "○ idle");
                }
            }
        });
    }
}

impl eframe::App for GammadialApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_events();

        egui::TopBottomPanel::top("controls").show(ctx, |ui| {
            ui.add_space(4.0);
            self.render_controls(ui);
            ui.add_space(4.0);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical()
                .auto_shrink(false)
                .stick_to_bottom(true)
                .show(ui, |ui| {
                    for line in &self.log {
                        ui.monospace(line);
                    }
                });
        });

        // Supervisor events arrive whether or not the user is interacting.
        ctx.request_repaint_after(Duration::from_millis(100));
    }
}
