//! Input bar component
//!
//! Text input with microphone, clear, and send / stop-generation controls.

use crate::ui::state::AppState;
use crate::ui::theme::Theme;
use egui::{self, Color32, Key, RichText, Vec2};

/// Input bar component for text and voice input
pub struct InputBar<'a> {
    state: &'a mut AppState,
    theme: &'a Theme,
}

impl<'a> InputBar<'a> {
    pub fn new(state: &'a mut AppState, theme: &'a Theme) -> Self {
        Self { state, theme }
    }

    pub fn show(mut self, ui: &mut egui::Ui) {
        egui::Frame::none()
            .fill(self.theme.bg_secondary)
            .rounding(self.theme.card_rounding)
            .inner_margin(self.theme.spacing_sm)
            .show(ui, |ui| {
                if self.state.is_listening() {
                    ui.label(
                        RichText::new("Listening...")
                            .size(12.0)
                            .color(self.theme.listening),
                    );
                }

                ui.horizontal(|ui| {
                    self.show_mic_button(ui);
                    self.show_text_input(ui);
                    self.show_clear_button(ui);
                    self.show_send_button(ui);
                });
            });
    }

    fn show_mic_button(&mut self, ui: &mut egui::Ui) {
        let supported = self.state.recognition().is_supported();
        let listening = self.state.is_listening();

        let (icon, label, color) = if listening {
            ("⏹", "Stop voice input", self.theme.listening)
        } else {
            ("🎤", "Start voice input", self.theme.text_secondary)
        };

        let mut button = egui::Button::new(RichText::new(icon).size(18.0).color(color))
            .min_size(Vec2::splat(40.0))
            .rounding(self.theme.button_rounding);
        if listening {
            button = button.fill(self.theme.listening.gamma_multiply(0.2));
        }

        let response = ui.add_enabled(supported, button);
        response.widget_info(|| egui::WidgetInfo::labeled(egui::WidgetType::Button, supported, label));
        let rect = response.rect;

        if response.clicked() {
            self.state.toggle_listening();
        }
        if supported {
            response.on_hover_text(label);
        } else {
            response.on_disabled_hover_text("Speech recognition is not available");
        }

        if listening {
            let t = ui.ctx().input(|i| i.time);
            let pulse = ((t * 3.0).sin() * 0.5 + 0.5) as f32;
            ui.painter().circle_stroke(
                rect.center(),
                rect.width() / 2.0 + 2.0 + pulse * 3.0,
                egui::Stroke::new(2.0 * pulse, self.theme.listening.gamma_multiply(1.0 - pulse * 0.5)),
            );
        }
    }

    fn show_text_input(&mut self, ui: &mut egui::Ui) {
        // Leave room for the clear and send buttons
        let width = (ui.available_width() - 100.0).max(80.0);

        let hint = if self.state.is_listening() {
            "Speak now..."
        } else {
            "Type a message..."
        };
        let text_edit = egui::TextEdit::singleline(&mut self.state.input_text)
            .id(egui::Id::new("message_input"))
            .hint_text(hint)
            .desired_width(width)
            .font(egui::TextStyle::Body)
            .margin(egui::Margin::symmetric(10.0, 8.0));

        let response = ui.add(text_edit);
        response.widget_info(|| {
            egui::WidgetInfo::labeled(egui::WidgetType::TextEdit, true, "Message input")
        });

        if response.lost_focus() && ui.input(|i| i.key_pressed(Key::Enter)) && self.state.can_send() {
            self.state.send_input();
            response.request_focus();
        }
    }

    fn show_clear_button(&mut self, ui: &mut egui::Ui) {
        let enabled = !self.state.input_text.is_empty();
        let button = egui::Button::new(RichText::new("✖").size(14.0))
            .min_size(Vec2::splat(32.0))
            .rounding(self.theme.button_rounding);

        let response = ui.add_enabled(enabled, button);
        response.widget_info(|| {
            egui::WidgetInfo::labeled(egui::WidgetType::Button, enabled, "Clear input")
        });
        if response.clicked() {
            self.state.input_text.clear();
        }
    }

    fn show_send_button(&mut self, ui: &mut egui::Ui) {
        let loading = self.state.is_loading();
        let enabled = loading || self.state.can_send();

        let (icon, label) = if loading {
            ("⏹", "Stop generation")
        } else {
            ("➤", "Send message")
        };
        let fill = if enabled {
            self.theme.primary
        } else {
            self.theme.bg_tertiary
        };

        let button = egui::Button::new(RichText::new(icon).size(16.0).color(Color32::WHITE))
            .min_size(Vec2::splat(40.0))
            .rounding(self.theme.button_rounding)
            .fill(fill);

        let response = ui.add_enabled(enabled, button);
        response.widget_info(|| egui::WidgetInfo::labeled(egui::WidgetType::Button, enabled, label));

        if response.clicked() {
            if loading {
                self.state.stop_generation();
            } else {
                self.state.send_input();
            }
        }
        response.on_hover_text(label);
    }
}
