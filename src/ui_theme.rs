use eframe::egui::{self, Color32, FontFamily, FontId, Rounding, Shadow, Stroke, Vec2};

pub struct ExporterTheme {
    // Colors
    pub background: Color32,
    pub surface: Color32,
    pub surface_hover: Color32,
    pub surface_active: Color32,
    pub card: Color32,
    pub border: Color32,
    pub border_active: Color32,
    pub text_primary: Color32,
    pub text_secondary: Color32,
    pub text_muted: Color32,
    pub accent: Color32,
    pub success: Color32,
    pub warning: Color32,
    pub error: Color32,
    pub disabled: Color32,

    // Spacing
    pub spacing_small: f32,
    pub spacing_medium: f32,
    pub spacing_large: f32,
    pub padding_medium: f32,

    // Border radius
    pub radius_medium: Rounding,
    pub radius_large: Rounding,

    // Shadows
    pub shadow_medium: Shadow,

    // Typography
    pub font_small: FontId,
    pub font_medium: FontId,
    pub font_title: FontId,
}

impl Default for ExporterTheme {
    fn default() -> Self {
        Self {
            // Dark blue palette
            background: Color32::from_rgb(26, 35, 51),
            surface: Color32::from_rgb(40, 52, 74),
            surface_hover: Color32::from_rgb(50, 64, 90),
            surface_active: Color32::from_rgb(60, 76, 106),
            card: Color32::from_rgb(33, 44, 63),
            border: Color32::from_rgb(64, 80, 108),
            border_active: Color32::from_rgb(100, 120, 155),
            text_primary: Color32::from_rgb(255, 255, 255),
            text_secondary: Color32::from_rgb(205, 212, 224),
            text_muted: Color32::from_rgb(140, 150, 168),
            accent: Color32::from_rgb(66, 135, 245),
            success: Color32::from_rgb(46, 160, 67),
            warning: Color32::from_rgb(255, 170, 0),
            error: Color32::from_rgb(255, 85, 75),
            disabled: Color32::from_rgb(90, 98, 112),

            spacing_small: 4.0,
            spacing_medium: 8.0,
            spacing_large: 12.0,
            padding_medium: 8.0,

            radius_medium: Rounding::same(6.0),
            radius_large: Rounding::same(10.0),

            shadow_medium: Shadow {
                offset: Vec2::new(0.0, 2.0),
                blur: 8.0,
                spread: 0.0,
                color: Color32::from_black_alpha(40),
            },

            font_small: FontId::new(12.0, FontFamily::Proportional),
            font_medium: FontId::new(14.0, FontFamily::Proportional),
            font_title: FontId::new(22.0, FontFamily::Proportional),
        }
    }
}

impl ExporterTheme {
    pub fn apply_to_ctx(&self, ctx: &egui::Context) {
        let mut style = (*ctx.style()).clone();

        style.visuals.panel_fill = self.background;
        style.visuals.window_fill = self.background;
        style.visuals.window_shadow = self.shadow_medium;
        style.visuals.window_rounding = self.radius_large;
        style.visuals.extreme_bg_color = self.surface;

        // Buttons and checkboxes
        style.visuals.widgets.inactive.fg_stroke = Stroke::new(1.0, self.text_primary);
        style.visuals.widgets.inactive.bg_fill = self.surface;
        style.visuals.widgets.inactive.weak_bg_fill = self.surface;
        style.visuals.widgets.inactive.rounding = self.radius_medium;
        style.visuals.widgets.inactive.bg_stroke = Stroke::new(1.0, self.border);

        style.visuals.widgets.hovered.fg_stroke = Stroke::new(1.0, self.text_primary);
        style.visuals.widgets.hovered.bg_fill = self.surface_hover;
        style.visuals.widgets.hovered.weak_bg_fill = self.surface_hover;
        style.visuals.widgets.hovered.rounding = self.radius_medium;
        style.visuals.widgets.hovered.bg_stroke = Stroke::new(1.0, self.border_active);

        style.visuals.widgets.active.fg_stroke = Stroke::new(1.0, self.text_primary);
        style.visuals.widgets.active.bg_fill = self.surface_active;
        style.visuals.widgets.active.weak_bg_fill = self.surface_active;
        style.visuals.widgets.active.rounding = self.radius_medium;
        style.visuals.widgets.active.bg_stroke = Stroke::new(1.0, self.border_active);

        // Text inputs
        style.visuals.text_cursor.stroke = Stroke::new(2.0, self.accent);
        style.visuals.selection.bg_fill = self.accent;
        style.visuals.selection.stroke = Stroke::new(1.0, self.text_primary);

        style.text_styles = [
            (egui::TextStyle::Heading, self.font_title.clone()),
            (egui::TextStyle::Body, self.font_medium.clone()),
            (egui::TextStyle::Monospace, FontId::new(13.0, FontFamily::Monospace)),
            (egui::TextStyle::Button, self.font_medium.clone()),
            (egui::TextStyle::Small, self.font_small.clone()),
        ]
        .into();

        ctx.set_style(style);
    }

    pub fn card_frame(&self) -> egui::Frame {
        egui::Frame {
            inner_margin: egui::Margin::symmetric(self.padding_medium * 1.5, self.padding_medium),
            rounding: self.radius_large,
            shadow: self.shadow_medium,
            fill: self.card,
            ..Default::default()
        }
    }

    /// Color for a log line, keyed on the markers the exporter writes.
    pub fn log_line_color(&self, line: &str) -> Color32 {
        if line.starts_with("[OK]") || line.starts_with('✔') {
            self.success
        } else if line.starts_with("[ERROR]") || line.starts_with('❗') {
            self.error
        } else if line.starts_with("[WARN]") || line.starts_with("Export cancelled") {
            self.warning
        } else {
            self.text_secondary
        }
    }
}
