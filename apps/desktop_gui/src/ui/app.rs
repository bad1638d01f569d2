//! Desktop capture form: two text fields, send actions, transient notices.

use std::time::{Duration, Instant};

use client_core::{NotifyKind, SubmitAction};
use crossbeam_channel::{Receiver, Sender};
use eframe::egui;
use url::Url;

use crate::{
    backend_bridge::commands::BackendCommand,
    config::Settings,
    controller::{events::UiEvent, orchestration::dispatch_backend_command},
};

pub const API_KEY_PAGE_URL: &str = "https://workflowy.com/api-key/";

/// How long a finished (success/failure) notice stays on screen.
const NOTICE_LIFETIME: Duration = Duration::from_secs(4);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AppView {
    Capture,
    Preferences,
}

struct ActiveNotice {
    kind: NotifyKind,
    title: String,
    message: String,
    shown_at: Instant,
}

/// Returns the boundary-validation problem for a draft title, if any.
fn title_problem(title: &str) -> Option<&'static str> {
    if title.trim().is_empty() {
        Some("Bullet text is required")
    } else {
        None
    }
}

pub struct CaptureApp {
    cmd_tx: Sender<BackendCommand>,
    ui_rx: Receiver<UiEvent>,
    view: AppView,
    title_draft: String,
    note_draft: String,
    title_error: Option<&'static str>,
    /// Mirrors the pipeline's in-flight state to keep the send buttons
    /// disabled; the controller's gate is the actual guard.
    in_flight: bool,
    notice: Option<ActiveNotice>,
    status: String,
    save_location_url: String,
    prefs_api_key_draft: String,
    prefs_save_location_draft: String,
    focus_title: bool,
}

impl CaptureApp {
    pub fn new(
        cmd_tx: Sender<BackendCommand>,
        ui_rx: Receiver<UiEvent>,
        settings: Settings,
    ) -> Self {
        Self {
            cmd_tx,
            ui_rx,
            view: AppView::Capture,
            title_draft: String::new(),
            note_draft: String::new(),
            title_error: None,
            in_flight: false,
            notice: None,
            status: "Starting backend worker...".to_string(),
            save_location_url: settings.save_location_url.clone(),
            prefs_api_key_draft: settings.api_key,
            prefs_save_location_draft: settings.save_location_url,
            focus_title: true,
        }
    }

    fn process_ui_events(&mut self, ctx: &egui::Context) {
        while let Ok(event) = self.ui_rx.try_recv() {
            match event {
                UiEvent::Notice {
                    kind,
                    title,
                    message,
                } => {
                    if kind != NotifyKind::InProgress {
                        self.in_flight = false;
                    }
                    self.notice = Some(ActiveNotice {
                        kind,
                        title,
                        message,
                        shown_at: Instant::now(),
                    });
                }
                UiEvent::SubmissionAccepted => {
                    self.title_draft.clear();
                    self.note_draft.clear();
                    self.title_error = None;
                    self.focus_title = true;
                }
                UiEvent::CloseRequested => {
                    ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                }
                UiEvent::SettingsSaved { error } => match error {
                    None => {
                        self.save_location_url = self.prefs_save_location_draft.clone();
                        self.status = "Preferences saved".to_string();
                        self.view = AppView::Capture;
                        self.focus_title = true;
                    }
                    Some(message) => {
                        self.status = format!("Could not save preferences: {message}");
                    }
                },
                UiEvent::Info(message) => {
                    self.status = message;
                }
            }
        }
    }

    fn expire_stale_notice(&mut self) {
        if let Some(notice) = &self.notice {
            if notice.kind != NotifyKind::InProgress && notice.shown_at.elapsed() > NOTICE_LIFETIME
            {
                self.notice = None;
            }
        }
    }

    fn try_submit(&mut self, action: SubmitAction) {
        if self.in_flight {
            return;
        }
        if let Some(problem) = title_problem(&self.title_draft) {
            self.title_error = Some(problem);
            return;
        }
        self.title_error = None;

        let queued = dispatch_backend_command(
            &self.cmd_tx,
            BackendCommand::Submit {
                title: self.title_draft.clone(),
                note: self.note_draft.clone(),
                action,
            },
            &mut self.status,
        );
        if queued {
            self.in_flight = true;
        }
    }

    fn save_preferences(&mut self) {
        dispatch_backend_command(
            &self.cmd_tx,
            BackendCommand::SaveSettings {
                api_key: self.prefs_api_key_draft.clone(),
                save_location_url: self.prefs_save_location_draft.clone(),
            },
            &mut self.status,
        );
    }

    fn show_notice(&self, ui: &mut egui::Ui) {
        let Some(notice) = &self.notice else {
            return;
        };

        let (fill, text_color) = match notice.kind {
            NotifyKind::InProgress => (ui.visuals().faint_bg_color, ui.visuals().text_color()),
            NotifyKind::Success => (
                egui::Color32::from_rgb(22, 66, 32),
                egui::Color32::from_rgb(170, 240, 180),
            ),
            NotifyKind::Failure => (
                egui::Color32::from_rgb(82, 26, 26),
                egui::Color32::from_rgb(250, 180, 180),
            ),
        };

        egui::Frame::NONE
            .fill(fill)
            .corner_radius(8.0)
            .inner_margin(egui::Margin::symmetric(10, 8))
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    if notice.kind == NotifyKind::InProgress {
                        ui.add(egui::Spinner::new());
                    }
                    ui.colored_label(text_color, egui::RichText::new(&notice.title).strong());
                    if !notice.message.is_empty() {
                        ui.colored_label(text_color, &notice.message);
                    }
                });
            });
        ui.add_space(8.0);
    }

    fn show_capture_form(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_space(10.0);
            egui::Frame::NONE
                .fill(ui.visuals().faint_bg_color.gamma_multiply(0.55))
                .corner_radius(12.0)
                .inner_margin(egui::Margin::symmetric(14, 12))
                .show(ui, |ui| {
                    ui.style_mut().spacing.item_spacing = egui::vec2(8.0, 8.0);

                    ui.heading("Workflowy Inbox");
                    ui.weak("Capture a thought into your inbox.");
                    ui.add_space(4.0);

                    self.show_notice(ui);

                    ui.label(egui::RichText::new("Bullet Text").strong());
                    let title_edit = egui::TextEdit::singleline(&mut self.title_draft)
                        .hint_text("What would you like to remember?")
                        .desired_width(f32::INFINITY);
                    let title_resp = ui.add_sized([ui.available_width(), 30.0], title_edit);
                    if self.focus_title {
                        title_resp.request_focus();
                        self.focus_title = false;
                    }
                    if let Some(problem) = self.title_error {
                        ui.colored_label(ui.visuals().error_fg_color, problem);
                    }

                    ui.label(egui::RichText::new("Bullet Note / Comment").strong());
                    ui.add(
                        egui::TextEdit::multiline(&mut self.note_draft)
                            .hint_text("Any comments?")
                            .desired_rows(4)
                            .desired_width(f32::INFINITY),
                    );

                    // Enter in the title field fires the primary action.
                    let enter_pressed = ctx.input(|i| i.key_pressed(egui::Key::Enter));
                    if title_resp.has_focus() && enter_pressed {
                        self.try_submit(SubmitAction::SendAndClose);
                    }

                    ui.add_space(6.0);
                    ui.horizontal(|ui| {
                        let send_close = egui::Button::new(
                            egui::RichText::new("Send and Close").strong(),
                        )
                        .min_size(egui::vec2(140.0, 32.0));
                        if ui.add_enabled(!self.in_flight, send_close).clicked() {
                            self.try_submit(SubmitAction::SendAndClose);
                        }

                        let send_again =
                            egui::Button::new("Send and Add Another").min_size(egui::vec2(160.0, 32.0));
                        if ui.add_enabled(!self.in_flight, send_again).clicked() {
                            self.try_submit(SubmitAction::SendAndAddAnother);
                        }
                    });

                    ui.add_space(4.0);
                    ui.separator();
                    ui.horizontal(|ui| {
                        if ui.small_button("Get API Key").clicked() {
                            ctx.open_url(egui::OpenUrl::new_tab(API_KEY_PAGE_URL));
                        }
                        let has_location = Url::parse(&self.save_location_url).is_ok();
                        if ui
                            .add_enabled(has_location, egui::Button::new("Open Save Location").small())
                            .clicked()
                        {
                            ctx.open_url(egui::OpenUrl::new_tab(&self.save_location_url));
                        }
                        if ui.small_button("Preferences").clicked() {
                            self.view = AppView::Preferences;
                        }
                    });

                    ui.add_space(2.0);
                    ui.horizontal_wrapped(|ui| {
                        ui.small("Status:");
                        ui.small(egui::RichText::new(&self.status).weak());
                    });
                });
        });
    }

    fn show_preferences(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_space(10.0);
            egui::Frame::NONE
                .fill(ui.visuals().faint_bg_color.gamma_multiply(0.55))
                .corner_radius(12.0)
                .inner_margin(egui::Margin::symmetric(14, 12))
                .show(ui, |ui| {
                    ui.style_mut().spacing.item_spacing = egui::vec2(8.0, 8.0);

                    ui.heading("Preferences");
                    ui.weak("Both values are required before anything can be sent.");
                    ui.add_space(4.0);

                    ui.label(egui::RichText::new("API Key").strong());
                    ui.add_sized(
                        [ui.available_width(), 30.0],
                        egui::TextEdit::singleline(&mut self.prefs_api_key_draft)
                            .password(true)
                            .hint_text("Paste your Workflowy API key"),
                    );

                    ui.label(egui::RichText::new("Save Location URL").strong());
                    ui.add_sized(
                        [ui.available_width(), 30.0],
                        egui::TextEdit::singleline(&mut self.prefs_save_location_draft)
                            .hint_text("https://workflowy.com/#/..."),
                    );

                    ui.add_space(6.0);
                    ui.horizontal(|ui| {
                        if ui
                            .add(egui::Button::new(egui::RichText::new("Save").strong()))
                            .clicked()
                        {
                            self.save_preferences();
                        }
                        if ui.button("Cancel").clicked() {
                            self.view = AppView::Capture;
                            self.focus_title = true;
                        }
                        if ui.small_button("Get API Key").clicked() {
                            ctx.open_url(egui::OpenUrl::new_tab(API_KEY_PAGE_URL));
                        }
                    });

                    ui.add_space(2.0);
                    ui.horizontal_wrapped(|ui| {
                        ui.small("Status:");
                        ui.small(egui::RichText::new(&self.status).weak());
                    });
                });
        });
    }
}

impl eframe::App for CaptureApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_ui_events(ctx);
        self.expire_stale_notice();

        match self.view {
            AppView::Capture => self.show_capture_form(ctx),
            AppView::Preferences => self.show_preferences(ctx),
        }

        // The backend pushes events whenever it likes; poll at a steady beat.
        ctx.request_repaint_after(Duration::from_millis(100));
    }
}
