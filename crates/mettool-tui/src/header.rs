//! TUI header panel.

use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use mettool_orchestration::Readiness;

use crate::styles::ColorTheme;

/// What the header shows.
pub struct HeaderInfo<'a> {
    pub file: Option<&'a str>,
    pub sheet: Option<&'a str>,
    pub columns: usize,
    pub readiness: &'a Readiness,
}

fn engine_label(readiness: &Readiness) -> &'static str {
    match readiness {
        Readiness::Starting => "starting",
        Readiness::Ready => "ready",
        Readiness::Failed(_) => "unavailable",
    }
}

pub fn render_header(frame: &mut Frame, area: Rect, info: &HeaderInfo<'_>, theme: &ColorTheme) {
    let engine_style = match info.readiness {
        Readiness::Failed(_) => theme.error_style(),
        Readiness::Ready => theme.success_style(),
        Readiness::Starting => theme.accent_style(),
    };
    let line = Line::from(vec![
        Span::styled("mettool", theme.header_style()),
        Span::raw(format!(" | file: {}", info.file.unwrap_or("-"))),
        Span::raw(format!(" | sheet: {}", info.sheet.unwrap_or("-"))),
        Span::raw(format!(" | columns: {}", info.columns)),
        Span::raw(" | engine: "),
        Span::styled(engine_label(info.readiness), engine_style),
    ]);
    let block = Block::default().borders(Borders::BOTTOM);
    frame.render_widget(Paragraph::new(line).block(block), area);
}
