//! TUI styles and color themes.

use ratatui::style::{Color, Modifier, Style};

/// Color theme for the TUI.
pub struct ColorTheme {
    pub primary: Color,
    pub success: Color,
    pub error: Color,
    pub accent: Color,
    pub text: Color,
    pub muted: Color,
}

impl Default for ColorTheme {
    fn default() -> Self {
        Self {
            primary: Color::Cyan,
            success: Color::Green,
            error: Color::Red,
            accent: Color::Yellow,
            text: Color::White,
            muted: Color::DarkGray,
        }
    }
}

impl ColorTheme {
    #[must_use]
    pub fn header_style(&self) -> Style {
        Style::default()
            .fg(self.primary)
            .add_modifier(Modifier::BOLD)
    }

    #[must_use]
    pub fn text_style(&self) -> Style {
        Style::default().fg(self.text)
    }

    #[must_use]
    pub fn muted_style(&self) -> Style {
        Style::default().fg(self.muted)
    }

    #[must_use]
    pub fn accent_style(&self) -> Style {
        Style::default().fg(self.accent)
    }

    #[must_use]
    pub fn success_style(&self) -> Style {
        Style::default().fg(self.success)
    }

    #[must_use]
    pub fn error_style(&self) -> Style {
        Style::default().fg(self.error)
    }

    #[must_use]
    pub fn selected_style(&self) -> Style {
        Style::default()
            .fg(self.accent)
            .add_modifier(Modifier::BOLD | Modifier::REVERSED)
    }
}

/// Parse `#rrggbb`; anything else is `None`.
#[must_use]
pub fn parse_hex(text: &str) -> Option<Color> {
    let hex = text.strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some(Color::Rgb(channel(0)?, channel(2)?, channel(4)?))
}

/// Diverging blue-white-red scale for a coefficient in `[-1, 1]`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn correlation_color(value: f64) -> Color {
    let v = value.clamp(-1.0, 1.0);
    let fade = |t: f64| (255.0 * (1.0 - t)).round() as u8;
    if v >= 0.0 {
        Color::Rgb(255, fade(v), fade(v))
    } else {
        Color::Rgb(fade(-v), fade(-v), 255)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_colors() {
        assert_eq!(parse_hex("#1f77b4"), Some(Color::Rgb(0x1f, 0x77, 0xb4)));
        assert_eq!(parse_hex("#888888"), Some(Color::Rgb(136, 136, 136)));
        assert_eq!(parse_hex("1f77b4"), None);
        assert_eq!(parse_hex("#12345"), None);
        assert_eq!(parse_hex("#zzzzzz"), None);
    }

    #[test]
    fn correlation_scale_ends() {
        assert_eq!(correlation_color(1.0), Color::Rgb(255, 0, 0));
        assert_eq!(correlation_color(-1.0), Color::Rgb(0, 0, 255));
        assert_eq!(correlation_color(0.0), Color::Rgb(255, 255, 255));
        assert_eq!(correlation_color(7.0), correlation_color(1.0));
    }
}
