//! Correlation heatmap as a coloured table.

use ratatui::layout::{Constraint, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::Span;
use ratatui::widgets::{Block, Borders, Cell, Row, Table};
use ratatui::Frame;

use mettool_core::adapters::Heatmap;

use crate::styles::{correlation_color, ColorTheme};

/// Cell text; missing coefficients show as a dash.
#[must_use]
pub fn cell_text(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:+.2}"))
}

#[allow(clippy::cast_possible_truncation)]
pub fn render_heatmap(frame: &mut Frame, area: Rect, map: &Heatmap, theme: &ColorTheme) {
    let label_width = map
        .row_labels
        .iter()
        .chain(&map.column_labels)
        .map(|l| l.chars().count())
        .max()
        .unwrap_or(0)
        .clamp(6, 18) as u16;

    let header = Row::new(
        std::iter::once(Cell::from(""))
            .chain(map.column_labels.iter().map(|l| Cell::from(l.as_str()))),
    )
    .style(theme.header_style());

    let rows = map.row_labels.iter().enumerate().map(|(r, label)| {
        let cells = (0..map.column_labels.len()).map(|c| {
            let value = map.get(r, c);
            let style = value.map_or(theme.muted_style(), |v| {
                Style::default().bg(correlation_color(v)).fg(Color::Black)
            });
            Cell::from(cell_text(value)).style(style)
        });
        Row::new(std::iter::once(Cell::from(label.as_str()).style(theme.header_style())).chain(cells))
    });

    let widths = std::iter::repeat(Constraint::Length(label_width)).take(map.column_labels.len() + 1);
    let table = Table::new(rows, widths).header(header).column_spacing(1).block(
        Block::default()
            .borders(Borders::ALL)
            .title(Span::styled(" Correlation ", theme.header_style())),
    );
    frame.render_widget(table, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    #[test]
    fn cell_text_signs_and_gaps() {
        assert_eq!(cell_text(Some(0.5)), "+0.50");
        assert_eq!(cell_text(Some(-1.0)), "-1.00");
        assert_eq!(cell_text(None), "-");
    }

    #[test]
    fn renders_labels_and_values() {
        let map = Heatmap {
            row_labels: vec!["A".into(), "B".into()],
            column_labels: vec!["A".into(), "B".into()],
            cells: vec![vec![Some(1.0), Some(0.25)], vec![Some(0.25), None]],
        };
        let mut terminal = Terminal::new(TestBackend::new(40, 8)).unwrap();
        let frame = terminal
            .draw(|f| render_heatmap(f, f.area(), &map, &ColorTheme::default()))
            .unwrap();
        let text: String = (0..frame.area.height)
            .flat_map(|y| (0..frame.area.width).map(move |x| (x, y)))
            .map(|(x, y)| frame.buffer[(x, y)].symbol().to_string())
            .collect();
        assert!(text.contains("+1.00"));
        assert!(text.contains("+0.25"));
    }
}
