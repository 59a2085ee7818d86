//! Light/dark theme for console output.
//!
//! Each piece of output has a semantic [`Role`]; the theme maps a role to a
//! [`Style`] once, and the style is rendered as 24-bit ANSI colors.

/// 24-bit color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

pub const ORANGE: Rgb = Rgb(0xFF, 0xA5, 0x00);
pub const DARK: Rgb = Rgb(0x2E, 0x2E, 0x2E);
pub const LIGHT: Rgb = Rgb(0xFF, 0xFF, 0xFF);

pub const IDLE_GREEN: Rgb = Rgb(0x00, 0x80, 0x00);
pub const RECORDING_RED: Rgb = Rgb(0xFF, 0x00, 0x00);
pub const PLAYING_BLUE: Rgb = Rgb(0x00, 0x00, 0xFF);

/// What a piece of console output represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Grouping header (the settings panel)
    Frame,
    /// Plain text
    Label,
    /// Command hints
    Button,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Style {
    pub foreground: Rgb,
    pub background: Rgb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn from_dark(dark: bool) -> Self {
        if dark { Theme::Dark } else { Theme::Light }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn is_dark(self) -> bool {
        self == Theme::Dark
    }

    /// Window background color.
    pub fn background(self) -> Rgb {
        match self {
            Theme::Light => LIGHT,
            Theme::Dark => DARK,
        }
    }

    /// Text color on the window background.
    pub fn text(self) -> Rgb {
        match self {
            Theme::Light => DARK,
            Theme::Dark => LIGHT,
        }
    }

    pub fn style(self, role: Role) -> Style {
        match role {
            Role::Frame => Style { foreground: DARK, background: ORANGE },
            Role::Button => Style { foreground: DARK, background: ORANGE },
            Role::Label => Style { foreground: self.text(), background: self.background() },
        }
    }

    /// Label style with a custom foreground (status colors).
    pub fn accent(self, foreground: Rgb) -> Style {
        Style { foreground, background: self.background() }
    }
}

/// Render `text` in `style`, or unchanged when color is disabled.
pub fn paint(text: &str, style: Style, color: bool) -> String {
    if !color {
        return text.to_string();
    }
    let Style { foreground: Rgb(fr, fg, fb), background: Rgb(br, bg, bb) } = style;
    format!("\x1b[38;2;{fr};{fg};{fb}m\x1b[48;2;{br};{bg};{bb}m{text}\x1b[0m")
}
