mod app;
mod compositor;
mod gallery;
mod image_io;
mod jobs;
mod layout;
mod ui_theme;

use eframe::egui;

fn main() -> Result<(), eframe::Error> {
    env_logger::init(); // Initialize logger

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1180.0, 860.0]),
        ..Default::default()
    };

    eframe::run_native(
        "AppShot Framer",
        options,
        Box::new(|_cc| Ok(Box::new(app::FramerApp::new()))),
    )
}
