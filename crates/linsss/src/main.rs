//! Interactive viewer for the Gaussian-mixture subsurface scattering pipeline.
//!
//! Takes the asset directory as its only argument and defaults to `assets/`
//! next to the working directory.

mod app;
mod egui_integration;
mod ui;

use std::path::PathBuf;

use winit::event_loop::EventLoop;

fn main() {
    env_logger::init();

    let asset_root = std::env::args()
        .nth(1)
        .map_or_else(|| PathBuf::from("assets"), PathBuf::from);

    let event_loop = EventLoop::new().expect("failed to create event loop");
    let mut app = app::App::new(asset_root);
    event_loop.run_app(&mut app).expect("event loop error");
}
