//! Color themes.
//!
//! - `dark` uses ANSI 16 colors so it works on any terminal.
//! - `light` is for light terminal backgrounds, also ANSI 16.
//! - `catppuccin-mocha` uses RGB and needs truecolor.
//!
//! `t` toggles between light and a dark theme; the choice is saved in the
//! settings store and wins over `theme` in config.toml.

use ratatui::style::Color;
use tracing::warn;

use careease_core::types::{ChatStatus, Priority};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeName {
    Dark,
    Light,
    CatppuccinMocha,
}

impl ThemeName {
    /// Unknown names fall back to `Dark` so a typo never prevents startup.
    pub fn parse(name: &str) -> Self {
        match name {
            "dark" => ThemeName::Dark,
            "light" => ThemeName::Light,
            "catppuccin-mocha" | "catppuccin_mocha" => ThemeName::CatppuccinMocha,
            other => {
                warn!(theme = other, "unknown theme, falling back to 'dark'");
                ThemeName::Dark
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ThemeName::Dark => "dark",
            ThemeName::Light => "light",
            ThemeName::CatppuccinMocha => "catppuccin-mocha",
        }
    }

    /// Light goes to dark, every dark variant goes to light.
    pub fn toggled(self) -> Self {
        match self {
            ThemeName::Light => ThemeName::Dark,
            ThemeName::Dark | ThemeName::CatppuccinMocha => ThemeName::Light,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Theme {
    // Panel borders
    pub border_active: Color,
    pub border_inactive: Color,

    // Transcript
    pub user_message: Color,
    pub assistant_message: Color,
    pub timestamp: Color,
    /// Typing indicator and the cursor of a running reveal.
    pub typing: Color,

    // Chat list badges
    pub status_active: Color,
    pub status_resolved: Color,
    pub status_archived: Color,
    pub priority_low: Color,
    pub priority_medium: Color,
    pub priority_high: Color,
    pub priority_urgent: Color,

    // Toasts
    pub toast_info: Color,
    pub toast_success: Color,
    pub toast_error: Color,
    pub toast_alarm: Color,

    // Status bar
    pub status_bar_bg: Color,
    pub status_bar_fg: Color,
    pub status_mode_normal: Color,
    pub status_mode_insert: Color,

    pub text: Color,
    pub muted: Color,
    pub background: Color,
}

impl Theme {
    pub fn from_name(name: ThemeName) -> Self {
        match name {
            ThemeName::Dark => Self::dark(),
            ThemeName::Light => Self::light(),
            ThemeName::CatppuccinMocha => Self::catppuccin_mocha(),
        }
    }

    pub fn dark() -> Self {
        Self {
            border_active: Color::Cyan,
            border_inactive: Color::DarkGray,

            user_message: Color::Cyan,
            assistant_message: Color::Reset,
            timestamp: Color::DarkGray,
            typing: Color::Yellow,

            status_active: Color::Green,
            status_resolved: Color::Blue,
            status_archived: Color::DarkGray,
            priority_low: Color::DarkGray,
            priority_medium: Color::Reset,
            priority_high: Color::Yellow,
            priority_urgent: Color::Red,

            toast_info: Color::Cyan,
            toast_success: Color::Green,
            toast_error: Color::Red,
            toast_alarm: Color::Magenta,

            status_bar_bg: Color::DarkGray,
            status_bar_fg: Color::White,
            status_mode_normal: Color::Cyan,
            status_mode_insert: Color::Green,

            text: Color::Reset,
            muted: Color::DarkGray,
            background: Color::Reset,
        }
    }

    pub fn light() -> Self {
        Self {
            border_active: Color::Blue,
            border_inactive: Color::Gray,

            user_message: Color::Blue,
            assistant_message: Color::Black,
            timestamp: Color::Gray,
            typing: Color::Magenta,

            status_active: Color::Green,
            status_resolved: Color::Blue,
            status_archived: Color::Gray,
            priority_low: Color::Gray,
            priority_medium: Color::Black,
            priority_high: Color::Magenta,
            priority_urgent: Color::Red,

            toast_info: Color::Blue,
            toast_success: Color::Green,
            toast_error: Color::Red,
            toast_alarm: Color::Magenta,

            status_bar_bg: Color::Gray,
            status_bar_fg: Color::Black,
            status_mode_normal: Color::Blue,
            status_mode_insert: Color::Green,

            text: Color::Black,
            muted: Color::Gray,
            background: Color::White,
        }
    }

    /// Palette source: <https://github.com/catppuccin/catppuccin> Mocha variant.
    pub fn catppuccin_mocha() -> Self {
        let green = Color::Rgb(166, 227, 161); // #a6e3a1
        let red = Color::Rgb(243, 139, 168); // #f38ba8
        let yellow = Color::Rgb(249, 226, 175); // #f9e2af
        let blue = Color::Rgb(137, 180, 250); // #89b4fa
        let mauve = Color::Rgb(203, 166, 247); // #cba6f7
        let lavender = Color::Rgb(180, 190, 254); // #b4befe
        let overlay1 = Color::Rgb(127, 132, 156); // #7f849c
        let surface1 = Color::Rgb(69, 71, 90); // #45475a
        let base = Color::Rgb(30, 30, 46); // #1e1e2e
        let text = Color::Rgb(205, 214, 244); // #cdd6f4
        let peach = Color::Rgb(250, 179, 135); // #fab387

        Self {
            border_active: lavender,
            border_inactive: overlay1,

            user_message: blue,
            assistant_message: text,
            timestamp: overlay1,
            typing: yellow,

            status_active: green,
            status_resolved: blue,
            status_archived: overlay1,
            priority_low: overlay1,
            priority_medium: text,
            priority_high: peach,
            priority_urgent: red,

            toast_info: lavender,
            toast_success: green,
            toast_error: red,
            toast_alarm: mauve,

            status_bar_bg: surface1,
            status_bar_fg: text,
            status_mode_normal: lavender,
            status_mode_insert: green,

            text,
            muted: overlay1,
            background: base,
        }
    }

    pub fn status_color(&self, status: ChatStatus) -> Color {
        match status {
            ChatStatus::Active => self.status_active,
            ChatStatus::Resolved => self.status_resolved,
            ChatStatus::Archived => self.status_archived,
        }
    }

    pub fn priority_color(&self, priority: Priority) -> Color {
        match priority {
            Priority::Low => self.priority_low,
            Priority::Medium => self.priority_medium,
            Priority::High => self.priority_high,
            Priority::Urgent => self.priority_urgent,
        }
    }
}
