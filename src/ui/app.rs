//! Main application struct and eframe integration
//!
//! This module contains the main MurmurApp that implements eframe::App.

use crate::ui::components::{InputBar, MessageList, SettingsPanel, ThreadList};
use crate::ui::state::{AppState, Route};
use crate::ui::theme::Theme;
use egui::{self, CentralPanel, RichText, SidePanel, TopBottomPanel};
use std::time::{Duration, Instant};

/// Repaint cadence while something is animating
const ANIMATION_FRAME: Duration = Duration::from_millis(16);

/// Main Murmur application
pub struct MurmurApp {
    state: AppState,
    theme: Theme,
}

impl MurmurApp {
    pub fn new(cc: &eframe::CreationContext<'_>, state: AppState) -> Self {
        let theme = Theme::dark();
        theme.apply(&cc.egui_ctx);
        Self { state, theme }
    }

    /// Build an app without an eframe context (headless tests)
    pub fn with_theme(state: AppState, theme: Theme) -> Self {
        Self { state, theme }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut AppState {
        &mut self.state
    }

    /// Render one frame into `ctx`
    pub fn ui(&mut self, ctx: &egui::Context) {
        self.state.poll_events(Instant::now());

        self.show_header(ctx);
        match self.state.route {
            Route::Chat => self.show_chat(ctx),
            route => {
                CentralPanel::default()
                    .frame(
                        egui::Frame::none()
                            .fill(self.theme.bg_primary)
                            .inner_margin(self.theme.spacing_lg),
                    )
                    .show(ctx, |ui| {
                        self.show_error_banner(ui);
                        match route {
                            Route::Home => self.show_home(ui),
                            Route::Settings => SettingsPanel::new(&mut self.state, &self.theme).show(ui),
                            Route::About => self.show_about(ui),
                            _ => self.show_not_found(ui),
                        }
                    });
            }
        }

        if self.state.needs_repaint() {
            ctx.request_repaint_after(ANIMATION_FRAME);
        }
    }

    fn show_header(&mut self, ctx: &egui::Context) {
        TopBottomPanel::top("header")
            .frame(egui::Frame::none().fill(self.theme.bg_secondary).inner_margin(12.0))
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label(
                        RichText::new("Murmur")
                            .size(20.0)
                            .strong()
                            .color(self.theme.text_primary),
                    );
                    ui.label(
                        RichText::new("Voice chat")
                            .size(14.0)
                            .color(self.theme.text_muted),
                    );

                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        for route in [Route::About, Route::Settings, Route::Chat, Route::Home] {
                            let selected = self.state.route == route;
                            let response = ui.selectable_label(selected, route.title());
                            response.widget_info(|| {
                                egui::WidgetInfo::selected(
                                    egui::WidgetType::SelectableLabel,
                                    true,
                                    selected,
                                    format!("Go to {}", route.title()),
                                )
                            });
                            if response.clicked() {
                                self.state.navigate(route);
                            }
                        }
                    });
                });
            });
    }

    fn show_chat(&mut self, ctx: &egui::Context) {
        SidePanel::left("threads")
            .resizable(true)
            .default_width(240.0)
            .min_width(180.0)
            .max_width(400.0)
            .frame(egui::Frame::none().fill(self.theme.bg_secondary).inner_margin(self.theme.spacing_sm))
            .show(ctx, |ui| {
                ThreadList::new(&mut self.state, &self.theme).show(ui);
            });

        TopBottomPanel::bottom("input_area")
            .frame(egui::Frame::none().fill(self.theme.bg_primary).inner_margin(self.theme.spacing))
            .show(ctx, |ui| {
                InputBar::new(&mut self.state, &self.theme).show(ui);
            });

        CentralPanel::default()
            .frame(egui::Frame::none().fill(self.theme.bg_primary).inner_margin(self.theme.spacing_sm))
            .show(ctx, |ui| {
                self.show_error_banner(ui);
                MessageList::new(&mut self.state, &self.theme).show(ui);
            });
    }

    fn show_error_banner(&mut self, ui: &mut egui::Ui) {
        let Some(message) = self.state.error_message() else {
            return;
        };

        egui::Frame::none()
            .fill(self.theme.error.gamma_multiply(0.2))
            .stroke(egui::Stroke::new(1.0, self.theme.error))
            .rounding(self.theme.button_rounding)
            .inner_margin(self.theme.spacing_sm)
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    let label = ui.label(RichText::new(&message).color(self.theme.text_primary));
                    label.widget_info(|| {
                        egui::WidgetInfo::labeled(egui::WidgetType::Label, true, format!("Error: {message}"))
                    });
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        let dismiss = ui.small_button("✖");
                        dismiss.widget_info(|| {
                            egui::WidgetInfo::labeled(egui::WidgetType::Button, true, "Dismiss error")
                        });
                        if dismiss.clicked() {
                            self.state.dismiss_error();
                        }
                    });
                });
            });
        ui.add_space(self.theme.spacing_sm);
    }

    fn show_home(&mut self, ui: &mut egui::Ui) {
        ui.vertical_centered(|ui| {
            ui.add_space(60.0);
            ui.label(
                RichText::new("What would you like to talk about?")
                    .size(24.0)
                    .color(self.theme.text_primary),
            );
            ui.add_space(self.theme.spacing);

            let prompt = ui.add(
                egui::TextEdit::singleline(&mut self.state.home_prompt)
                    .hint_text("Ask anything...")
                    .desired_width(480.0)
                    .margin(egui::Margin::symmetric(10.0, 8.0)),
            );
            prompt.widget_info(|| {
                egui::WidgetInfo::labeled(egui::WidgetType::TextEdit, true, "Quick start prompt")
            });
            let submitted = prompt.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));

            ui.add_space(self.theme.spacing_sm);
            let start = ui.add(
                egui::Button::new(RichText::new("Start chat").color(egui::Color32::WHITE))
                    .fill(self.theme.primary)
                    .rounding(self.theme.button_rounding),
            );
            start.widget_info(|| egui::WidgetInfo::labeled(egui::WidgetType::Button, true, "Start chat"));

            if (submitted || start.clicked()) && !self.state.is_loading() {
                self.state.start_chat_from_home();
            }

            let recent = self.state.manager().threads().len();
            if recent > 0 {
                ui.add_space(self.theme.spacing);
                if ui.link(format!("Continue one of {recent} saved chats")).clicked() {
                    self.state.navigate(Route::Chat);
                }
            }
        });
    }

    fn show_about(&self, ui: &mut egui::Ui) {
        ui.heading("About Murmur");
        ui.add_space(self.theme.spacing_sm);
        ui.label(
            "Murmur is a chat client for OpenAI and Gemini models. Speak or type a message, \
             and replies appear word by word and can be read aloud.",
        );
        ui.add_space(self.theme.spacing_sm);
        ui.label(
            RichText::new(format!("Version {}", env!("CARGO_PKG_VERSION")))
                .size(12.0)
                .color(self.theme.text_muted),
        );
        ui.label(
            RichText::new("Chats and settings are stored on this computer only.")
                .size(12.0)
                .color(self.theme.text_muted),
        );
        if !self.state.recognition().is_supported() || !self.state.synthesis().is_supported() {
            ui.label(
                RichText::new("This build has no speech engine, so voice input and read-aloud are off.")
                    .size(12.0)
                    .color(self.theme.warning),
            );
        }
    }

    fn show_not_found(&mut self, ui: &mut egui::Ui) {
        ui.vertical_centered(|ui| {
            ui.add_space(60.0);
            ui.heading("Page not found");
            ui.add_space(self.theme.spacing_sm);
            let home = ui.button("Go home");
            home.widget_info(|| egui::WidgetInfo::labeled(egui::WidgetType::Button, true, "Go home"));
            if home.clicked() {
                self.state.navigate(Route::Home);
            }
        });
    }
}

impl eframe::App for MurmurApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.ui(ctx);
    }
}
