//! Runtime bridge between the UI command queue and the submission pipeline.

use std::{path::PathBuf, sync::Arc, thread};

use client_core::{
    BulletServiceClient, Notifier, NotifyKind, SubmissionController, SubmitOutcome, SurfaceControl,
};
use crossbeam_channel::{Receiver, Sender};

use crate::{
    backend_bridge::commands::BackendCommand,
    config::{self, Settings},
    controller::events::UiEvent,
};

/// Forwards pipeline notices onto the UI event channel.
struct ChannelNotifier {
    ui_tx: Sender<UiEvent>,
}

impl Notifier for ChannelNotifier {
    fn notify(&self, kind: NotifyKind, title: &str, message: &str) {
        let _ = self.ui_tx.try_send(UiEvent::Notice {
            kind,
            title: title.to_string(),
            message: message.to_string(),
        });
    }
}

/// Forwards the close request raised after a "send and close" success.
struct ChannelSurface {
    ui_tx: Sender<UiEvent>,
}

impl SurfaceControl for ChannelSurface {
    fn request_close(&self) {
        let _ = self.ui_tx.try_send(UiEvent::CloseRequested);
    }
}

fn build_controller(settings: &Settings, ui_tx: &Sender<UiEvent>) -> Arc<SubmissionController> {
    let client = BulletServiceClient::new(settings.credentials());
    Arc::new(SubmissionController::new(
        client,
        Arc::new(ChannelNotifier {
            ui_tx: ui_tx.clone(),
        }),
        Arc::new(ChannelSurface {
            ui_tx: ui_tx.clone(),
        }),
    ))
}

pub fn launch(
    settings_path: Option<PathBuf>,
    cmd_rx: Receiver<BackendCommand>,
    ui_tx: Sender<UiEvent>,
) {
    thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                let _ = ui_tx.try_send(UiEvent::Info(format!(
                    "Backend worker startup failure: {err}"
                )));
                tracing::error!("failed to build backend runtime: {err}");
                return;
            }
        };

        runtime.block_on(async move {
            let mut settings = config::load_settings(settings_path.as_deref());
            let mut controller = build_controller(&settings, &ui_tx);
            let _ = ui_tx.try_send(UiEvent::Info("Ready".to_string()));

            while let Ok(cmd) = cmd_rx.recv() {
                match cmd {
                    BackendCommand::Submit {
                        title,
                        note,
                        action,
                    } => {
                        // Spawned so the queue keeps draining; the controller's
                        // in-flight gate turns any overlapping submit into a
                        // no-op.
                        let controller = controller.clone();
                        let ui_tx = ui_tx.clone();
                        tokio::spawn(async move {
                            controller.set_input(title, note).await;
                            if controller.submit(action).await == SubmitOutcome::Sent {
                                let _ = ui_tx.try_send(UiEvent::SubmissionAccepted);
                            }
                        });
                    }
                    BackendCommand::SaveSettings {
                        api_key,
                        save_location_url,
                    } => {
                        settings.api_key = api_key;
                        settings.save_location_url = save_location_url;

                        let path = settings_path
                            .clone()
                            .or_else(config::default_settings_path);
                        let error = match path {
                            Some(path) => config::save_settings(&path, &settings)
                                .err()
                                .map(|err| format!("{err:#}")),
                            None => Some("no writable settings location on this system".to_string()),
                        };
                        if let Some(message) = &error {
                            tracing::warn!("settings were not persisted: {message}");
                        }

                        // New credentials take effect for the next attempt.
                        controller = build_controller(&settings, &ui_tx);
                        let _ = ui_tx.try_send(UiEvent::SettingsSaved { error });
                    }
                }
            }
        });
    });
}
