use ratatui::style::Color;

/// Catppuccin Mocha-inspired dark theme with 24-bit RGB colors
pub struct Theme {
    // Base colors
    pub bg: Color,
    pub bg_surface: Color,
    pub fg: Color,
    pub fg_dim: Color,
    pub fg_muted: Color,

    // Accent colors
    pub blue: Color,
    pub green: Color,
    pub yellow: Color,
    pub red: Color,
    pub purple: Color,

    // UI elements
    pub border: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            // Catppuccin Mocha base
            bg: Color::Rgb(30, 30, 46),         // Base
            bg_surface: Color::Rgb(49, 50, 68), // Surface0
            fg: Color::Rgb(205, 214, 244),      // Text
            fg_dim: Color::Rgb(166, 173, 200),  // Subtext0
            fg_muted: Color::Rgb(127, 132, 156), // Overlay0

            // Accent colors
            blue: Color::Rgb(137, 180, 250),   // Blue
            green: Color::Rgb(166, 227, 161),  // Green
            yellow: Color::Rgb(249, 226, 175), // Yellow
            red: Color::Rgb(243, 139, 168),    // Red
            purple: Color::Rgb(203, 166, 247), // Mauve

            // UI
            border: Color::Rgb(88, 91, 112), // Surface2
        }
    }
}

impl Theme {
    /// Icon color for a cached or targeted item
    pub fn icon_color(&self, is_directory: bool) -> Color {
        if is_directory {
            self.yellow
        } else {
            self.fg_dim
        }
    }

    /// Accent for a finished workflow
    pub fn outcome_color(&self, phase: vanish_core::Phase) -> Color {
        match phase {
            vanish_core::Phase::Done => self.green,
            vanish_core::Phase::Error => self.red,
            _ => self.yellow,
        }
    }
}
