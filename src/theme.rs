//! Theme and Colors
//!
//! Two themes built from the MOHI brand palette. The choice is stored under
//! `rafiki-theme` as `"dark"` or `"light"`.

use ratatui::style::Color;

use crate::store::PreferenceStore;

/// Preference key holding the theme
pub const THEME_KEY: &str = "rafiki-theme";

// ============================================================================
// Brand Palette
// ============================================================================

pub const DEEP_BLUE: Color = Color::Rgb(0x1c, 0x3c, 0x54);
pub const ACTION_BLUE: Color = Color::Rgb(0x45, 0x95, 0xd1);
pub const GREEN: Color = Color::Rgb(0x8b, 0xc5, 0x3f);
pub const DARK_BG: Color = Color::Rgb(0x0a, 0x1a, 0x26);
pub const DARK_SURFACE: Color = Color::Rgb(0x12, 0x22, 0x32);

const GRAY_50: Color = Color::Rgb(249, 250, 251);
const GRAY_100: Color = Color::Rgb(243, 244, 246);
const GRAY_400: Color = Color::Rgb(156, 163, 175);
const GRAY_500: Color = Color::Rgb(107, 114, 128);
const GRAY_700: Color = Color::Rgb(55, 65, 81);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    /// Dark only if the stored value is exactly `"dark"`.
    pub fn load(store: &dyn PreferenceStore) -> Self {
        match store.get(THEME_KEY).as_deref() {
            Some("dark") => Theme::Dark,
            _ => Theme::Light,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    /// Icon for the theme toggle: shows what a press switches to
    pub fn toggle_icon(&self) -> &'static str {
        match self {
            Theme::Light => "☾",
            Theme::Dark => "☀",
        }
    }
}

/// Colours applied to every widget for the active theme
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub background: Color,
    pub surface: Color,
    pub header_bg: Color,
    pub header_fg: Color,
    pub text: Color,
    pub muted: Color,
    pub border: Color,
    pub accent: Color,
    pub user_bubble_fg: Color,
    pub assistant_bubble_fg: Color,
    pub button_bg: Color,
    pub button_fg: Color,
}

impl Palette {
    pub fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Light => Self {
                background: GRAY_50,
                surface: Color::White,
                header_bg: DEEP_BLUE,
                header_fg: Color::White,
                text: DEEP_BLUE,
                muted: GRAY_500,
                border: GRAY_400,
                accent: GREEN,
                user_bubble_fg: GREEN,
                assistant_bubble_fg: DEEP_BLUE,
                button_bg: GRAY_100,
                button_fg: DEEP_BLUE,
            },
            Theme::Dark => Self {
                background: DARK_BG,
                surface: DARK_SURFACE,
                header_bg: DARK_SURFACE,
                header_fg: GRAY_100,
                text: GRAY_100,
                muted: GRAY_400,
                border: GRAY_700,
                accent: GREEN,
                user_bubble_fg: GREEN,
                assistant_bubble_fg: ACTION_BLUE,
                button_bg: DARK_SURFACE,
                button_fg: GRAY_100,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn only_exact_dark_loads_dark() {
        assert_eq!(Theme::load(&MemoryStore::with(THEME_KEY, "dark")), Theme::Dark);
        assert_eq!(Theme::load(&MemoryStore::with(THEME_KEY, "light")), Theme::Light);
        assert_eq!(Theme::load(&MemoryStore::with(THEME_KEY, "Dark")), Theme::Light);
        assert_eq!(Theme::load(&MemoryStore::with(THEME_KEY, " dark")), Theme::Light);
        assert_eq!(Theme::load(&MemoryStore::new()), Theme::Light);
    }

    #[test]
    fn toggle_is_an_involution() {
        assert_eq!(Theme::Light.toggled().toggled(), Theme::Light);
        assert_eq!(Theme::Dark.toggled(), Theme::Light);
    }

    #[test]
    fn palettes_differ_by_theme() {
        assert_ne!(Palette::for_theme(Theme::Light), Palette::for_theme(Theme::Dark));
        assert_eq!(Palette::for_theme(Theme::Dark).background, DARK_BG);
    }

    #[test]
    fn dark_text_is_light_gray() {
        let dark = Palette::for_theme(Theme::Dark);
        assert_eq!(dark.text, GRAY_100);
        assert_eq!(dark.header_fg, dark.text);
        assert_eq!(Palette::for_theme(Theme::Light).button_bg, GRAY_100);
    }
}
