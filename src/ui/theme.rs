//! Colors, spacing and text styles

use egui::{Color32, FontFamily, FontId, Rounding, Stroke, TextStyle, Vec2, Visuals};

/// Colors and metrics shared by every component
#[derive(Clone, Debug)]
pub struct Theme {
    pub dark_mode: bool,

    /// Accent for primary buttons, links and selection
    pub primary: Color32,
    pub warning: Color32,
    pub error: Color32,

    /// Window, panel and input backgrounds, darkest first in dark mode
    pub bg_primary: Color32,
    pub bg_secondary: Color32,
    pub bg_tertiary: Color32,

    pub text_primary: Color32,
    pub text_secondary: Color32,
    pub text_muted: Color32,

    /// Microphone indicator while listening
    pub listening: Color32,
    pub user_bubble: Color32,
    pub assistant_bubble: Color32,

    pub button_rounding: Rounding,
    pub card_rounding: Rounding,
    pub bubble_rounding: Rounding,

    pub spacing_sm: f32,
    pub spacing: f32,
    pub spacing_lg: f32,
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

const fn rgb(hex: u32) -> Color32 {
    Color32::from_rgb((hex >> 16) as u8, (hex >> 8) as u8, hex as u8)
}

impl Theme {
    pub fn dark() -> Self {
        Self {
            dark_mode: true,
            primary: rgb(0x3b82f6),
            warning: rgb(0xeab308),
            error: rgb(0xef4444),
            bg_primary: rgb(0x111827),
            bg_secondary: rgb(0x1f2937),
            bg_tertiary: rgb(0x374151),
            text_primary: rgb(0xf9fafb),
            text_secondary: rgb(0xd1d5db),
            text_muted: rgb(0x9ca3af),
            listening: rgb(0xef4444),
            user_bubble: rgb(0x2563eb),
            assistant_bubble: rgb(0x374151),
            ..Self::metrics()
        }
    }

    pub fn light() -> Self {
        Self {
            dark_mode: false,
            primary: rgb(0x2563eb),
            warning: rgb(0xca8a04),
            error: rgb(0xdc2626),
            bg_primary: Color32::WHITE,
            bg_secondary: rgb(0xf3f4f6),
            bg_tertiary: rgb(0xe5e7eb),
            text_primary: rgb(0x111827),
            text_secondary: rgb(0x374151),
            text_muted: rgb(0x6b7280),
            listening: rgb(0xdc2626),
            user_bubble: rgb(0x3b82f6),
            assistant_bubble: rgb(0xe5e7eb),
            ..Self::metrics()
        }
    }

    /// Rounding and spacing common to both palettes; colors are placeholders
    fn metrics() -> Self {
        Self {
            dark_mode: true,
            primary: Color32::PLACEHOLDER,
            warning: Color32::PLACEHOLDER,
            error: Color32::PLACEHOLDER,
            bg_primary: Color32::PLACEHOLDER,
            bg_secondary: Color32::PLACEHOLDER,
            bg_tertiary: Color32::PLACEHOLDER,
            text_primary: Color32::PLACEHOLDER,
            text_secondary: Color32::PLACEHOLDER,
            text_muted: Color32::PLACEHOLDER,
            listening: Color32::PLACEHOLDER,
            user_bubble: Color32::PLACEHOLDER,
            assistant_bubble: Color32::PLACEHOLDER,
            button_rounding: Rounding::same(6.0),
            card_rounding: Rounding::same(10.0),
            bubble_rounding: Rounding::same(14.0),
            spacing_sm: 6.0,
            spacing: 12.0,
            spacing_lg: 20.0,
        }
    }

    /// Text color on top of a message bubble
    pub fn bubble_text(&self, is_user: bool) -> Color32 {
        if is_user {
            Color32::WHITE
        } else {
            self.text_primary
        }
    }

    /// Install the palette, spacing and font sizes into `ctx`
    pub fn apply(&self, ctx: &egui::Context) {
        let mut visuals = if self.dark_mode {
            Visuals::dark()
        } else {
            Visuals::light()
        };

        visuals.panel_fill = self.bg_primary;
        visuals.window_fill = self.bg_secondary;
        visuals.extreme_bg_color = self.bg_tertiary;
        visuals.window_rounding = self.card_rounding;
        visuals.window_stroke = Stroke::new(1.0, self.bg_tertiary);
        visuals.hyperlink_color = self.primary;
        visuals.selection.bg_fill = self.primary.gamma_multiply(0.3);
        visuals.selection.stroke = Stroke::new(1.0, self.primary);

        let widgets = &mut visuals.widgets;
        for (state, fill, text) in [
            (&mut widgets.noninteractive, self.bg_secondary, self.text_muted),
            (&mut widgets.inactive, self.bg_tertiary, self.text_secondary),
            (&mut widgets.hovered, self.primary.gamma_multiply(0.8), self.text_primary),
            (&mut widgets.active, self.primary, self.text_primary),
        ] {
            state.bg_fill = fill;
            state.weak_bg_fill = fill;
            state.fg_stroke = Stroke::new(1.0, text);
            state.rounding = self.button_rounding;
        }
        ctx.set_visuals(visuals);

        ctx.style_mut(|style| {
            style.spacing.item_spacing = Vec2::splat(self.spacing_sm);
            style.spacing.window_margin = egui::Margin::same(self.spacing);
            style.spacing.button_padding = Vec2::new(self.spacing_sm * 1.5, self.spacing_sm * 0.75);

            for (text_style, size, family) in [
                (TextStyle::Heading, 22.0, FontFamily::Proportional),
                (TextStyle::Body, 14.0, FontFamily::Proportional),
                (TextStyle::Monospace, 13.0, FontFamily::Monospace),
                (TextStyle::Button, 14.0, FontFamily::Proportional),
                (TextStyle::Small, 12.0, FontFamily::Proportional),
            ] {
                style.text_styles.insert(text_style, FontId::new(size, family));
            }
        });
    }
}
