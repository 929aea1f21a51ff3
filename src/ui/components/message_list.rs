//! Message list component
//!
//! Renders the active thread as chat bubbles. The newest reply is drawn
//! through its typewriter; loading placeholders show a typing indicator.

use crate::messages::{ChatThread, Message};
use crate::ui::state::AppState;
use crate::ui::theme::Theme;
use crate::utils::format_clock;
use egui::{self, Align, RichText, Sense, Vec2};
use uuid::Uuid;

enum Action {
    ToggleSpeech(Message),
    SkipReveal(Uuid),
}

/// Message list component
pub struct MessageList<'a> {
    state: &'a mut AppState,
    theme: &'a Theme,
}

impl<'a> MessageList<'a> {
    pub fn new(state: &'a mut AppState, theme: &'a Theme) -> Self {
        Self { state, theme }
    }

    pub fn show(mut self, ui: &mut egui::Ui) {
        let mut actions = Vec::new();

        egui::ScrollArea::vertical()
            .id_salt("messages")
            .auto_shrink([false, false])
            .stick_to_bottom(true)
            .show(ui, |ui| {
                ui.add_space(self.theme.spacing);

                match self.state.current_thread().filter(|t| !t.messages.is_empty()) {
                    Some(thread) => {
                        for message in &thread.messages {
                            self.show_message(ui, thread, message, &mut actions);
                            ui.add_space(self.theme.spacing_sm);
                        }
                    }
                    None => self.show_empty_state(ui),
                }

                ui.add_space(self.theme.spacing);
            });

        for action in actions {
            match action {
                Action::ToggleSpeech(message) => self.state.toggle_speech(&message),
                Action::SkipReveal(thread_id) => self.state.skip_reveal(thread_id),
            }
        }
    }

    fn show_empty_state(&self, ui: &mut egui::Ui) {
        ui.vertical_centered(|ui| {
            ui.add_space(80.0);
            ui.label(
                RichText::new("Start a conversation")
                    .size(22.0)
                    .color(self.theme.text_primary),
            );
            ui.add_space(self.theme.spacing_sm);
            ui.label(
                RichText::new("Type below, or press the microphone and speak.")
                    .color(self.theme.text_muted),
            );
        });
    }

    fn show_message(
        &self,
        ui: &mut egui::Ui,
        thread: &ChatThread,
        message: &Message,
        actions: &mut Vec<Action>,
    ) {
        let is_user = message.is_user();
        let align = if is_user { Align::RIGHT } else { Align::LEFT };

        ui.with_layout(egui::Layout::top_down(align), |ui| {
            ui.label(
                RichText::new(format!(
                    "{} · {}",
                    if is_user { "You" } else { "Assistant" },
                    format_clock(message.timestamp)
                ))
                .size(11.0)
                .color(self.theme.text_muted),
            );

            let max_width = ui.available_width() * 0.75;
            let bubble = egui::Frame::none()
                .fill(if is_user {
                    self.theme.user_bubble
                } else {
                    self.theme.assistant_bubble
                })
                .rounding(self.theme.bubble_rounding)
                .inner_margin(egui::Margin::symmetric(12.0, 8.0))
                .show(ui, |ui| {
                    ui.set_max_width(max_width);
                    if message.is_loading {
                        self.show_typing_indicator(ui);
                    } else {
                        let text = self.state.display_text(thread.id, message);
                        let label = ui.label(
                            RichText::new(text).color(self.theme.bubble_text(is_user)),
                        );
                        let description = if is_user {
                            format!("User message: {}", message.content)
                        } else {
                            format!("Assistant response: {}", message.content)
                        };
                        label.widget_info(|| {
                            egui::WidgetInfo::labeled(egui::WidgetType::Label, true, &description)
                        });
                    }
                });

            let revealing = self.state.is_revealing(message.id);
            if revealing && bubble.response.interact(Sense::click()).clicked() {
                actions.push(Action::SkipReveal(thread.id));
            }

            if !is_user && !message.is_loading && !revealing && self.state.settings().voice_enabled {
                self.show_speech_button(ui, message, actions);
            }
        });
    }

    fn show_typing_indicator(&self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.spinner();
            let label = ui.label(RichText::new("Thinking...").color(self.theme.text_muted));
            label.widget_info(|| {
                egui::WidgetInfo::labeled(egui::WidgetType::Label, true, "Assistant typing")
            });
        });
    }

    fn show_speech_button(&self, ui: &mut egui::Ui, message: &Message, actions: &mut Vec<Action>) {
        let speaking = self.state.is_speaking_message(message.id);
        let (icon, label) = if speaking {
            ("⏹", "Stop speaking")
        } else {
            ("🔊", "Speak message")
        };

        let enabled = self.state.synthesis().is_supported();
        let button = egui::Button::new(RichText::new(icon).size(13.0))
            .min_size(Vec2::splat(24.0))
            .rounding(self.theme.button_rounding);
        let response = ui.add_enabled(enabled, button);
        response.widget_info(|| egui::WidgetInfo::labeled(egui::WidgetType::Button, enabled, label));

        if response.clicked() {
            actions.push(Action::ToggleSpeech(message.clone()));
        }
        if enabled {
            response.on_hover_text(label);
        } else {
            response.on_disabled_hover_text("Speech synthesis is not available");
        }
    }
}
