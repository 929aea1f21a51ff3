//! Settings page: AI provider credentials and voice preferences

use crate::integration::{AiConfigPatch, SettingsPatch};
use crate::llm::Provider;
use crate::ui::state::AppState;
use crate::ui::theme::Theme;
use egui::{self, RichText};

pub struct SettingsPanel<'a> {
    state: &'a mut AppState,
    theme: &'a Theme,
}

impl<'a> SettingsPanel<'a> {
    pub fn new(state: &'a mut AppState, theme: &'a Theme) -> Self {
        Self { state, theme }
    }

    pub fn show(mut self, ui: &mut egui::Ui) {
        egui::ScrollArea::vertical()
            .id_salt("settings")
            .auto_shrink([false, false])
            .show(ui, |ui| {
                ui.heading("Settings");
                ui.add_space(self.theme.spacing);

                self.section(ui, "AI service", |panel, ui| panel.show_ai_section(ui));
                ui.add_space(self.theme.spacing);
                self.section(ui, "Voice", |panel, ui| panel.show_voice_section(ui));
                ui.add_space(self.theme.spacing);

                let reset = ui.button("Reset settings");
                reset.widget_info(|| {
                    egui::WidgetInfo::labeled(egui::WidgetType::Button, true, "Reset settings")
                });
                if reset.clicked() {
                    self.state.reset_settings();
                }
            });
    }

    fn section(
        &mut self,
        ui: &mut egui::Ui,
        title: &str,
        add_contents: impl FnOnce(&mut Self, &mut egui::Ui),
    ) {
        egui::Frame::none()
            .fill(self.theme.bg_secondary)
            .rounding(self.theme.card_rounding)
            .inner_margin(self.theme.spacing)
            .show(ui, |ui| {
                ui.set_width(ui.available_width());
                ui.label(RichText::new(title).strong().color(self.theme.text_primary));
                ui.add_space(self.theme.spacing_sm);
                add_contents(self, ui);
            });
    }

    fn show_ai_section(&mut self, ui: &mut egui::Ui) {
        let config = self.state.ai_config().clone();

        let mut provider = config.provider;
        egui::ComboBox::from_label("Provider")
            .selected_text(provider.name())
            .show_ui(ui, |ui| {
                for option in Provider::ALL {
                    ui.selectable_value(&mut provider, option, option.name());
                }
            });
        if provider != config.provider {
            self.state.update_ai_config(AiConfigPatch {
                provider: Some(provider),
                ..Default::default()
            });
        }

        egui::Grid::new("ai_fields")
            .num_columns(2)
            .spacing([self.theme.spacing_sm, self.theme.spacing_sm])
            .show(ui, |ui| {
                ui.label("API key:");
                let key = ui.add(
                    egui::TextEdit::singleline(&mut self.state.settings_form.api_key)
                        .password(true)
                        .hint_text(provider.api_key_env()),
                );
                key.widget_info(|| egui::WidgetInfo::labeled(egui::WidgetType::TextEdit, true, "API key"));
                ui.end_row();

                ui.label("Model:");
                let model = ui.add(
                    egui::TextEdit::singleline(&mut self.state.settings_form.model)
                        .hint_text(provider.default_model()),
                );
                model.widget_info(|| egui::WidgetInfo::labeled(egui::WidgetType::TextEdit, true, "Model"));
                ui.end_row();

                ui.label("Endpoint:");
                let endpoint = ui.add(
                    egui::TextEdit::singleline(&mut self.state.settings_form.endpoint)
                        .hint_text(provider.default_base_url()),
                );
                endpoint.widget_info(|| {
                    egui::WidgetInfo::labeled(egui::WidgetType::TextEdit, true, "Endpoint")
                });
                ui.end_row();
            });

        let save = ui.button("Save");
        save.widget_info(|| egui::WidgetInfo::labeled(egui::WidgetType::Button, true, "Save AI settings"));
        if save.clicked() {
            self.state.save_settings_form();
        }

        ui.add_space(self.theme.spacing_sm);

        let mut temperature = config.temperature;
        let slider = ui.add(egui::Slider::new(&mut temperature, 0.0..=2.0).text("Temperature"));
        if slider.changed() {
            self.state.update_ai_config(AiConfigPatch {
                temperature: Some(temperature),
                ..Default::default()
            });
        }

        let mut max_tokens = config.max_tokens;
        ui.horizontal(|ui| {
            ui.label("Max tokens");
            if ui
                .add(egui::DragValue::new(&mut max_tokens).range(1..=32_768))
                .changed()
            {
                self.state.update_ai_config(AiConfigPatch {
                    max_tokens: Some(max_tokens),
                    ..Default::default()
                });
            }
        });

        if config.credential().is_none() {
            ui.label(
                RichText::new(format!("No API key set for {}.", provider.name()))
                    .size(12.0)
                    .color(self.theme.warning),
            );
        }
    }

    fn show_voice_section(&mut self, ui: &mut egui::Ui) {
        let settings = self.state.settings().clone();

        let mut voice_enabled = settings.voice_enabled;
        let toggle = ui.checkbox(&mut voice_enabled, "Enable voice");
        toggle.widget_info(|| {
            egui::WidgetInfo::selected(egui::WidgetType::Checkbox, true, voice_enabled, "Enable voice")
        });
        if toggle.changed() {
            self.state.update_settings(SettingsPatch {
                voice_enabled: Some(voice_enabled),
                ..Default::default()
            });
        }

        ui.add_enabled_ui(settings.voice_enabled, |ui| {
            let mut auto_play = settings.auto_play_voice;
            if ui.checkbox(&mut auto_play, "Read replies aloud").changed() {
                self.state.update_settings(SettingsPatch {
                    auto_play_voice: Some(auto_play),
                    ..Default::default()
                });
            }

            self.show_voice_picker(ui, settings.preferred_voice.as_deref());

            let mut rate = settings.voice_rate;
            let mut pitch = settings.voice_pitch;
            let mut volume = settings.voice_volume;
            let mut patch = SettingsPatch::default();
            if ui.add(egui::Slider::new(&mut rate, 0.5..=2.0).text("Rate")).changed() {
                patch.voice_rate = Some(rate);
            }
            if ui.add(egui::Slider::new(&mut pitch, 0.5..=2.0).text("Pitch")).changed() {
                patch.voice_pitch = Some(pitch);
            }
            if ui.add(egui::Slider::new(&mut volume, 0.0..=1.0).text("Volume")).changed() {
                patch.voice_volume = Some(volume);
            }
            if patch != SettingsPatch::default() {
                self.state.update_settings(patch);
            }

            let supported = self.state.synthesis().is_supported();
            let test = ui.add_enabled(supported, egui::Button::new("Test voice"));
            test.widget_info(|| egui::WidgetInfo::labeled(egui::WidgetType::Button, supported, "Test voice"));
            if test.clicked() {
                self.state.test_voice();
            }
        });

        if !self.state.synthesis().is_supported() {
            ui.label(
                RichText::new("Speech synthesis is not available on this system.")
                    .size(12.0)
                    .color(self.theme.text_muted),
            );
        }
    }

    fn show_voice_picker(&mut self, ui: &mut egui::Ui, preferred: Option<&str>) {
        let voices = self.state.synthesis().voices().to_vec();
        let mut choice = preferred.map(str::to_string);

        egui::ComboBox::from_label("Voice")
            .selected_text(choice.as_deref().unwrap_or("Automatic"))
            .show_ui(ui, |ui| {
                ui.selectable_value(&mut choice, None, "Automatic");
                for voice in &voices {
                    ui.selectable_value(
                        &mut choice,
                        Some(voice.name.clone()),
                        format!("{} ({})", voice.name, voice.lang),
                    );
                }
            });

        if choice.as_deref() != preferred {
            self.state.update_settings(SettingsPatch {
                preferred_voice: Some(choice),
                ..Default::default()
            });
        }
    }
}
