//! Workflowy Inbox capture window.

use std::path::PathBuf;

mod backend_bridge;
mod config;
mod controller;
mod ui;

use backend_bridge::commands::BackendCommand;
use clap::Parser;
use controller::events::UiEvent;
use crossbeam_channel::bounded;
use eframe::egui;
use ui::app::CaptureApp;

#[derive(Parser, Debug)]
#[command(version, about = "Capture bullets into your Workflowy inbox")]
struct Args {
    /// Settings file to use instead of the per-user default location.
    #[arg(long)]
    settings: Option<PathBuf>,
}

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let args = Args::parse();
    let settings = config::load_settings(args.settings.as_deref());

    let (cmd_tx, cmd_rx) = bounded::<BackendCommand>(16);
    let (ui_tx, ui_rx) = bounded::<UiEvent>(256);
    backend_bridge::runtime::launch(args.settings.clone(), cmd_rx, ui_tx);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Workflowy Inbox")
            .with_inner_size([480.0, 430.0])
            .with_min_inner_size([400.0, 360.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Workflowy Inbox",
        options,
        Box::new(move |_cc| Ok(Box::new(CaptureApp::new(cmd_tx, ui_rx, settings)))),
    )
}
