use crate::export::{run_export_cancellable, ExportLogger, ExportRequest, ExportSummary};
use crate::ui_theme::ExporterTheme;
use chrono::Local;
use eframe::egui::{self, Stroke};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

const INPUT_PLACEHOLDER: &str = "Select a .psd file or a folder containing PSDs";
const OUTPUT_PLACEHOLDER: &str = "Select the folder the PNGs are written to";

/// Messages from the export worker to the window.
#[derive(Debug)]
enum WorkerEvent {
    Line(String),
    Finished(ExportSummary),
}

/// Forwards export progress into the UI channel and wakes the window up.
struct ChannelLogger {
    sender: mpsc::UnboundedSender<WorkerEvent>,
    ctx: egui::Context,
}

impl ExportLogger for ChannelLogger {
    fn line(&mut self, message: String) {
        let _ = self.sender.send(WorkerEvent::Line(message));
        self.ctx.request_repaint();
    }
}

struct LogLine {
    time: String,
    text: String,
}

pub struct ExporterApp {
    // Configuration
    request: ExportRequest,

    // UI state
    logs: Vec<LogLine>,
    new_logs_count: usize,
    is_exporting: bool,

    // Runtime
    runtime: Option<tokio::runtime::Runtime>,
    cancel: Arc<AtomicBool>,

    // Worker channel
    event_sender: mpsc::UnboundedSender<WorkerEvent>,
    event_receiver: mpsc::UnboundedReceiver<WorkerEvent>,

    // UI Theme
    theme: ExporterTheme,
}

impl ExporterApp {
    pub fn new() -> Self {
        // Without a runtime exports still work, they just block the window.
        let runtime = match tokio::runtime::Runtime::new() {
            Ok(rt) => Some(rt),
            Err(e) => {
                log::error!("Failed to create Tokio runtime: {}", e);
                None
            }
        };
        let (event_sender, event_receiver) = mpsc::unbounded_channel();

        Self {
            request: ExportRequest::default(),
            logs: Vec::new(),
            new_logs_count: 0,
            is_exporting: false,
            runtime,
            cancel: Arc::new(AtomicBool::new(false)),
            event_sender,
            event_receiver,
            theme: ExporterTheme::default(),
        }
    }

    fn push_log(&mut self, text: String) {
        self.logs.push(LogLine {
            time: Local::now().format("%H:%M:%S").to_string(),
            text,
        });
        self.new_logs_count += 1;
    }

    fn browse_input_file(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .set_title("Select PSD file")
            .add_filter("Photoshop Document", &["psd", "PSD"])
            .pick_file()
        {
            self.set_input(&path);
        }
    }

    fn browse_input_folder(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .set_title("Select folder containing PSD files")
            .pick_folder()
        {
            self.set_input(&path);
        }
    }

    fn set_input(&mut self, path: &Path) {
        self.request.input = path.display().to_string();
        self.push_log(format!("Selected input: {}", path.display()));
    }

    fn browse_output_folder(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .set_title("Select output folder")
            .pick_folder()
        {
            self.request.output_dir = path.display().to_string();
            self.push_log(format!("Output folder: {}", path.display()));
        }
    }

    fn start_export(&mut self, ctx: &egui::Context) {
        if self.is_exporting {
            return;
        }
        if let Err(e) = self.request.validate() {
            self.push_log(format!("❗ {}", e));
            return;
        }

        self.cancel.store(false, Ordering::Relaxed);
        let request = self.request.clone();
        let cancel = self.cancel.clone();
        let mut logger = ChannelLogger {
            sender: self.event_sender.clone(),
            ctx: ctx.clone(),
        };

        self.push_log("Starting export...".to_string());

        match &self.runtime {
            Some(rt) => {
                self.is_exporting = true;
                let sender = self.event_sender.clone();
                let ctx = ctx.clone();
                rt.spawn_blocking(move || {
                    let results = run_export_cancellable(&request, &mut logger, &cancel);
                    let _ = sender.send(WorkerEvent::Finished(ExportSummary::from_results(&results)));
                    ctx.request_repaint();
                });
            }
            None => {
                run_export_cancellable(&request, &mut logger, &cancel);
            }
        }
    }

    fn stop_export(&mut self) {
        if self.is_exporting {
            self.cancel.store(true, Ordering::Relaxed);
            self.push_log("Stopping after the current file...".to_string());
        }
    }

    fn drain_worker_events(&mut self) {
        while let Ok(event) = self.event_receiver.try_recv() {
            match event {
                WorkerEvent::Line(text) => self.push_log(text),
                WorkerEvent::Finished(summary) => {
                    log::debug!(
                        "Worker finished: {} exported, {} failed",
                        summary.exported,
                        summary.failed
                    );
                    self.is_exporting = false;
                }
            }
        }
    }
}

impl Default for ExporterApp {
    fn default() -> Self {
        Self::new()
    }
}

impl eframe::App for ExporterApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Apply the theme
        self.theme.apply_to_ctx(ctx);

        self.drain_worker_events();

        if ctx.input(|i| i.viewport().close_requested()) {
            self.cancel.store(true, Ordering::Relaxed);
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_space(self.theme.padding_medium);

            self.show_configuration(ui);
            ui.add_space(self.theme.spacing_medium);
            self.show_action_buttons(ui, ctx);
            ui.add_space(self.theme.spacing_medium);

            // Logs Panel - fill remaining space to bottom
            ui.allocate_ui_with_layout(
                egui::Vec2::new(ui.available_width(), ui.available_height()),
                egui::Layout::top_down(egui::Align::LEFT),
                |ui| {
                    self.show_logs_panel(ui);
                },
            );
        });
    }
}

impl ExporterApp {
    fn show_configuration(&mut self, ui: &mut egui::Ui) {
        let frame = self.theme.card_frame();
        frame.show(ui, |ui| {
            ui.vertical(|ui| {
                ui.label(
                    egui::RichText::new("PSD → PNG Export")
                        .size(18.0)
                        .strong()
                        .color(self.theme.text_primary),
                );
                ui.add_space(self.theme.spacing_medium);

                let label_width = 150.0;
                let enabled = !self.is_exporting;

                ui.horizontal(|ui| {
                    ui.add_sized(
                        [label_width, 24.0],
                        egui::Label::new(
                            egui::RichText::new("Input PSD file or folder")
                                .size(14.0)
                                .color(self.theme.text_secondary),
                        ),
                    );
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui
                            .add_enabled(enabled, egui::Button::new("Browse Folder"))
                            .clicked()
                        {
                            self.browse_input_folder();
                        }
                        if ui
                            .add_enabled(enabled, egui::Button::new("Browse File"))
                            .clicked()
                        {
                            self.browse_input_file();
                        }
                        ui.add_enabled(
                            enabled,
                            egui::TextEdit::singleline(&mut self.request.input)
                                .desired_width(ui.available_width())
                                .margin(egui::Vec2::new(8.0, 4.0))
                                .hint_text(INPUT_PLACEHOLDER),
                        );
                    });
                });
                ui.add_space(self.theme.spacing_medium);

                ui.horizontal(|ui| {
                    ui.add_sized(
                        [label_width, 24.0],
                        egui::Label::new(
                            egui::RichText::new("Output folder")
                                .size(14.0)
                                .color(self.theme.text_secondary),
                        ),
                    );
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui
                            .add_enabled(enabled, egui::Button::new("Choose Output"))
                            .clicked()
                        {
                            self.browse_output_folder();
                        }
                        ui.add_enabled(
                            enabled,
                            egui::TextEdit::singleline(&mut self.request.output_dir)
                                .desired_width(ui.available_width())
                                .margin(egui::Vec2::new(8.0, 4.0))
                                .hint_text(OUTPUT_PLACEHOLDER),
                        );
                    });
                });
                ui.add_space(self.theme.spacing_large);

                ui.add_enabled_ui(enabled, |ui| {
                    ui.checkbox(
                        &mut self.request.flatten,
                        "Flatten PSD (merge visible layers)",
                    );
                    ui.checkbox(
                        &mut self.request.same_canvas,
                        "Make all PNG same canvas size (pad to largest)",
                    );
                    ui.checkbox(
                        &mut self.request.keep_structure,
                        "Keep subfolder structure",
                    );
                });
            });
        });
    }

    fn show_action_buttons(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        ui.horizontal(|ui| {
            let start_enabled = !self.is_exporting;
            let (fill, text_color) = if start_enabled {
                (self.theme.success, egui::Color32::WHITE)
            } else {
                (self.theme.disabled, self.theme.text_muted)
            };

            let start_button = egui::Button::new(
                egui::RichText::new(if self.is_exporting {
                    "Exporting..."
                } else {
                    "Start Export"
                })
                .size(14.0)
                .color(text_color)
                .strong(),
            )
            .rounding(self.theme.radius_medium)
            .fill(fill)
            .stroke(if start_enabled {
                Stroke::new(1.0, egui::Color32::from_rgba_unmultiplied(255, 255, 255, 30))
            } else {
                Stroke::NONE
            })
            .min_size(egui::vec2(140.0, 36.0));

            let response = ui.add_enabled(start_enabled, start_button);
            if response.hovered() && start_enabled {
                ui.ctx().set_cursor_icon(egui::CursorIcon::PointingHand);
            }
            if response.clicked() {
                self.start_export(ctx);
            }

            ui.add_space(self.theme.spacing_small);

            if self.is_exporting {
                let stop_button = egui::Button::new(
                    egui::RichText::new("Stop")
                        .size(14.0)
                        .color(egui::Color32::WHITE)
                        .strong(),
                )
                .rounding(self.theme.radius_medium)
                .fill(self.theme.error)
                .min_size(egui::vec2(90.0, 36.0));

                if ui.add(stop_button).clicked() {
                    self.stop_export();
                }
                ui.add_space(self.theme.spacing_small);
                ui.spinner();
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let exit_button = egui::Button::new(egui::RichText::new("Exit").size(14.0))
                    .rounding(self.theme.radius_medium)
                    .min_size(egui::vec2(90.0, 36.0));
                if ui.add(exit_button).clicked() {
                    self.cancel.store(true, Ordering::Relaxed);
                    ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                }
            });
        });
    }

    fn show_logs_panel(&mut self, ui: &mut egui::Ui) {
        let frame = self.theme.card_frame();
        frame.show(ui, |ui| {
            ui.allocate_ui_with_layout(
                egui::Vec2::new(ui.available_width(), ui.available_height()),
                egui::Layout::top_down(egui::Align::LEFT),
                |ui| {
                    ui.horizontal(|ui| {
                        ui.label(
                            egui::RichText::new("Logs")
                                .size(18.0)
                                .strong()
                                .color(self.theme.text_primary),
                        );
                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            if self.new_logs_count > 0 {
                                ui.label(
                                    egui::RichText::new(format!("{} new", self.new_logs_count))
                                        .size(12.0)
                                        .color(self.theme.accent),
                                );
                            }
                        });
                    });
                    ui.add_space(self.theme.spacing_medium);

                    let available_height = ui.available_height();
                    egui::ScrollArea::vertical()
                        .id_salt("logs_scroll")
                        .stick_to_bottom(true)
                        .auto_shrink([false; 2])
                        .max_height(available_height)
                        .show(ui, |ui| {
                            if self.logs.is_empty() {
                                ui.centered_and_justified(|ui| {
                                    ui.label(
                                        egui::RichText::new("No logs yet")
                                            .size(14.0)
                                            .color(self.theme.text_muted),
                                    );
                                });
                                return;
                            }

                            for line in &self.logs {
                                ui.horizontal_wrapped(|ui| {
                                    ui.label(
                                        egui::RichText::new(&line.time)
                                            .size(10.0)
                                            .monospace()
                                            .color(self.theme.text_muted),
                                    );
                                    ui.add_space(self.theme.spacing_small);
                                    ui.label(
                                        egui::RichText::new(&line.text)
                                            .size(12.0)
                                            .color(self.theme.log_line_color(&line.text)),
                                    );
                                });
                            }
                        });

                    // Reset new logs count after displaying
                    self.new_logs_count = 0;
                },
            );
        });
    }
}
