use std::collections::HashMap;

use ratatui::style::Color;

use super::ThemeName;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub foreground: Color,
    pub background: Color,
    pub accent: Color,
    pub muted: Color,
    pub header: Color,
    pub selection_bg: Color,
    pub search_match: Color,
    pub warning: Color,
}

#[derive(Debug, Clone)]
pub struct ThemeRegistry {
    palettes: HashMap<ThemeName, Palette>,
}

impl ThemeRegistry {
    pub fn contains(&self, theme: &ThemeName) -> bool {
        self.palettes.contains_key(theme)
    }

    pub fn palette(&self, theme: ThemeName) -> Palette {
        self.palettes
            .get(&theme)
            .copied()
            .unwrap_or(DARK)
    }
}

impl Default for ThemeRegistry {
    fn default() -> Self {
        let palettes = [
            (ThemeName::Dark, DARK),
            (ThemeName::Light, LIGHT),
            (ThemeName::HighContrast, HIGH_CONTRAST),
            (ThemeName::Solarized, SOLARIZED),
        ]
        .into_iter()
        .collect();
        Self { palettes }
    }
}

const DARK: Palette = Palette {
    foreground: Color::Gray,
    background: Color::Reset,
    accent: Color::Cyan,
    muted: Color::DarkGray,
    header: Color::Yellow,
    selection_bg: Color::Rgb(40, 44, 52),
    search_match: Color::LightMagenta,
    warning: Color::LightRed,
};

const LIGHT: Palette = Palette {
    foreground: Color::Black,
    background: Color::White,
    accent: Color::Blue,
    muted: Color::Gray,
    header: Color::Rgb(150, 90, 0),
    selection_bg: Color::Rgb(220, 225, 235),
    search_match: Color::Magenta,
    warning: Color::Red,
};

const HIGH_CONTRAST: Palette = Palette {
    foreground: Color::White,
    background: Color::Black,
    accent: Color::LightYellow,
    muted: Color::Gray,
    header: Color::LightCyan,
    selection_bg: Color::Blue,
    search_match: Color::LightGreen,
    warning: Color::LightRed,
};

const SOLARIZED: Palette = Palette {
    foreground: Color::Rgb(131, 148, 150),
    background: Color::Rgb(0, 43, 54),
    accent: Color::Rgb(38, 139, 210),
    muted: Color::Rgb(88, 110, 117),
    header: Color::Rgb(181, 137, 0),
    selection_bg: Color::Rgb(7, 54, 66),
    search_match: Color::Rgb(211, 54, 130),
    warning: Color::Rgb(220, 50, 47),
};
