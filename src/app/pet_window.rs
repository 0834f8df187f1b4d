use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError as MpscTryRecvError;
use tracing::{error, warn};

use crate::app::presentation::PresentationState;
use crate::capture::{Capturer, DebugSink, XcapSource};
use crate::config::Settings;
use crate::controller::{Controller, ControllerBuilder, PetUpdate};
use crate::error::PetError;
use crate::perception::{Action, OpenAiBackend, Perception};

/// The overlay window: frameless, transparent, always on top, showing the
/// pet animation with a speech bubble, draggable anywhere on screen.
pub struct PetApp {
    state: PresentationState,
    update_rx: mpsc::Receiver<PetUpdate>,
    idle_uri: String,
    engage_uri: String,
    // Dropping the controller cancels the capture and analysis tasks.
    _controller: Controller,
}

impl PetApp {
    pub fn start_gui(settings: &Settings) -> Result<(), PetError> {
        let (update_tx, update_rx) = mpsc::channel::<PetUpdate>(16);

        let debug_sink = settings
            .capture
            .debug_dir
            .as_ref()
            .map(|dir| DebugSink::new(dir, settings.capture.debug_max_files));
        let capturer = Capturer::new(
            XcapSource,
            settings.capture.monitor_index,
            settings.capture.jpeg_quality,
            debug_sink,
        )?;

        let api_key = Settings::api_key().unwrap_or_else(|| {
            warn!("OPENAI_API_KEY is not set, every analysis will use the fallback");
            String::new()
        });
        let backend = OpenAiBackend::new(
            settings.perception.api_base.clone(),
            api_key,
            settings.perception.model.clone(),
            settings.perception.max_completion_tokens,
        );
        let mut perception_builder = Perception::builder(Arc::new(backend));
        if let Some(secs) = settings.perception.timeout_secs {
            perception_builder = perception_builder.timeout(Duration::from_secs(secs));
        }
        let controller = ControllerBuilder::new(capturer, perception_builder.build(), update_tx)
            .interval(Duration::from_secs(settings.capture.interval_secs))
            .spawn();

        let mut state = PresentationState::new(Duration::from_secs(
            settings.presentation.comment_duration_secs,
        ));
        state.show_comment(settings.presentation.greeting.clone(), Instant::now());

        let idle_uri = file_uri(&settings.presentation.idle_gif);
        let engage_uri = file_uri(&settings.presentation.engage_gif);

        let options = eframe::NativeOptions {
            viewport: egui::ViewportBuilder::default()
                .with_inner_size(egui::vec2(420.0, 240.0))
                .with_decorations(false)
                .with_transparent(true)
                .with_always_on_top()
                .with_taskbar(false)
                .with_title("deskpet"),
            ..Default::default()
        };

        eframe::run_native(
            "deskpet",
            options,
            Box::new(move |cc| {
                egui_extras::install_image_loaders(&cc.egui_ctx);
                Ok(Box::new(PetApp {
                    state,
                    update_rx,
                    idle_uri,
                    engage_uri,
                    _controller: controller,
                }))
            }),
        )
        .map_err(|e| PetError::Ui(e.to_string()))
    }

    fn drain_updates(&mut self) {
        loop {
            match self.update_rx.try_recv() {
                Ok(update) => {
                    self.state.apply(update, Instant::now());
                }
                Err(MpscTryRecvError::Empty) => break,
                Err(MpscTryRecvError::Disconnected) => {
                    error!("Update receiver disconnected. This can happen during shutdown.");
                    break;
                }
            }
        }
    }
}

impl eframe::App for PetApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_updates();
        self.state.tick(Instant::now());

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                ui.horizontal_top(|ui| {
                    let uri = match self.state.action() {
                        Action::Idle => self.idle_uri.clone(),
                        Action::Engage => self.engage_uri.clone(),
                    };
                    let pet = ui.add(
                        egui::Image::from_uri(uri)
                            .max_height(180.0)
                            .sense(egui::Sense::drag()),
                    );
                    if pet.drag_started() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::StartDrag);
                    }

                    if let Some(comment) = self.state.comment() {
                        egui::Frame::popup(ui.style()).show(ui, |ui| {
                            ui.set_max_width(200.0);
                            ui.label(egui::RichText::new(comment).strong());
                        });
                    }
                });
            });

        // Keep the GIF animation and comment deadline moving even when no
        // input events arrive.
        ctx.request_repaint();
    }

    fn clear_color(&self, _visuals: &egui::Visuals) -> [f32; 4] {
        egui::Rgba::TRANSPARENT.to_array()
    }
}

fn file_uri(path: &str) -> String {
    format!("file://{}", path)
}
