//! Sidebar listing chat threads, newest first

use crate::ui::state::AppState;
use crate::ui::theme::Theme;
use crate::utils::format_relative_time;
use chrono::Utc;
use egui::{self, RichText};
use uuid::Uuid;

enum Action {
    Select(Uuid),
    Delete(Uuid),
    Rename(Uuid, String),
    New,
    ClearAll,
}

pub struct ThreadList<'a> {
    state: &'a mut AppState,
    theme: &'a Theme,
}

impl<'a> ThreadList<'a> {
    pub fn new(state: &'a mut AppState, theme: &'a Theme) -> Self {
        Self { state, theme }
    }

    pub fn show(mut self, ui: &mut egui::Ui) {
        let mut action = None;

        let new_chat = ui.add_sized(
            [ui.available_width(), 32.0],
            egui::Button::new("＋ New chat").rounding(self.theme.button_rounding),
        );
        new_chat.widget_info(|| egui::WidgetInfo::labeled(egui::WidgetType::Button, true, "New chat"));
        if new_chat.clicked() {
            action = Some(Action::New);
        }

        ui.add_space(self.theme.spacing_sm);

        let now = Utc::now();
        let current = self.state.manager().current_chat_id();

        egui::ScrollArea::vertical()
            .id_salt("threads")
            .auto_shrink([false, false])
            .max_height(ui.available_height() - 40.0)
            .show(ui, |ui| {
                if self.state.manager().threads().is_empty() {
                    ui.label(RichText::new("No chats yet").color(self.theme.text_muted));
                }

                for thread in self.state.manager().threads() {
                    let selected = current == Some(thread.id);
                    ui.horizontal(|ui| {
                        let title = ui.selectable_label(
                            selected,
                            RichText::new(&thread.title).color(if selected {
                                self.theme.text_primary
                            } else {
                                self.theme.text_secondary
                            }),
                        );
                        title.widget_info(|| {
                            egui::WidgetInfo::selected(
                                egui::WidgetType::SelectableLabel,
                                true,
                                selected,
                                format!("Chat: {}", thread.title),
                            )
                        });
                        if title.clicked() {
                            action = Some(Action::Select(thread.id));
                        }
                        title.context_menu(|ui| {
                            self.show_rename_menu(ui, thread.id, &thread.title, &mut action);
                        });

                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            let delete = ui.small_button("🗑");
                            let label = format!("Delete chat: {}", thread.title);
                            delete.widget_info(|| {
                                egui::WidgetInfo::labeled(egui::WidgetType::Button, true, &label)
                            });
                            if delete.on_hover_text("Delete").clicked() {
                                action = Some(Action::Delete(thread.id));
                            }
                        });
                    });
                    ui.label(
                        RichText::new(format_relative_time(thread.updated_at, now))
                            .size(11.0)
                            .color(self.theme.text_muted),
                    );
                    ui.add_space(4.0);
                }
            });

        ui.separator();
        let has_threads = !self.state.manager().threads().is_empty();
        let clear = ui.add_enabled(has_threads, egui::Button::new("Clear all chats"));
        clear.widget_info(|| {
            egui::WidgetInfo::labeled(egui::WidgetType::Button, has_threads, "Clear all chats")
        });
        if clear.clicked() {
            action = Some(Action::ClearAll);
        }

        match action {
            Some(Action::Select(id)) => self.state.select_chat(id),
            Some(Action::Delete(id)) => self.state.delete_chat(id),
            Some(Action::Rename(id, title)) => self.state.rename_chat(id, &title),
            Some(Action::New) => self.state.new_chat(),
            Some(Action::ClearAll) => self.state.clear_all_chats(),
            None => {}
        }
    }

    fn show_rename_menu(&self, ui: &mut egui::Ui, id: Uuid, title: &str, action: &mut Option<Action>) {
        let draft_id = egui::Id::new(("rename_draft", id));
        let mut draft = ui
            .data_mut(|d| d.get_temp::<String>(draft_id))
            .unwrap_or_else(|| title.to_string());

        ui.label("Rename");
        let edit = ui.text_edit_singleline(&mut draft);
        let submitted = edit.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
        if submitted || ui.button("Save").clicked() {
            *action = Some(Action::Rename(id, draft.clone()));
            ui.data_mut(|d| d.remove::<String>(draft_id));
            ui.close_menu();
        } else {
            ui.data_mut(|d| d.insert_temp(draft_id, draft));
        }
    }
}
