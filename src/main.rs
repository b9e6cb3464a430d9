mod app;
mod canvas;
mod color;
mod composite;
mod discovery;
mod error;
mod export;
mod loader;
mod ui_theme;

#[cfg(test)]
mod fixtures;

use eframe::egui;

fn main() -> Result<(), eframe::Error> {
    // RUST_LOG overrides; the window log is independent of this level.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("PSD2PNG Exporter")
            .with_inner_size([820.0, 640.0])
            .with_min_inner_size([640.0, 480.0]),
        ..Default::default()
    };

    eframe::run_native(
        "PSD2PNG Exporter",
        options,
        Box::new(|_cc| Ok(Box::new(app::ExporterApp::new()))),
    )
}
