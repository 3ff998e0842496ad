//! TUI footer: key hints, or the command line while it is open.

use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use crate::styles::ColorTheme;

const HINTS: [(&str, &str); 8] = [
    ("q", "quit"),
    ("tab", "next"),
    ("r", "run"),
    ("e", "export"),
    ("x", "clear"),
    ("L", "load"),
    ("u/a", "limits/avg"),
    (":", "command"),
];

pub fn render_footer(frame: &mut Frame, area: Rect, command: Option<&str>, theme: &ColorTheme) {
    let line = match command {
        Some(text) => Line::from(vec![
            Span::styled(":", theme.accent_style()),
            Span::raw(text.to_string()),
            Span::styled("_", theme.muted_style()),
        ]),
        None => {
            let mut spans = Vec::with_capacity(HINTS.len() * 2);
            for (i, (key, label)) in HINTS.iter().enumerate() {
                spans.push(Span::styled(*key, theme.accent_style()));
                let sep = if i + 1 < HINTS.len() { " | " } else { "" };
                spans.push(Span::raw(format!(": {label}{sep}")));
            }
            Line::from(spans)
        }
    };
    let block = Block::default().borders(Borders::TOP);
    frame.render_widget(Paragraph::new(line).block(block), area);
}
