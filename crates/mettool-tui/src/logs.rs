//! Activity log panel.

use std::collections::VecDeque;

use ratatui::layout::Rect;
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, List, ListItem};
use ratatui::Frame;

use crate::styles::ColorTheme;

/// Lines kept before the oldest are dropped.
pub const LOG_CAPACITY: usize = 500;

pub const ERROR_PREFIX: &str = "[ERROR] ";

/// Scroll position counted in lines up from the newest entry; zero follows
/// the tail.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogScrollState {
    pub back: usize,
}

impl LogScrollState {
    #[must_use]
    pub fn follows_tail(&self) -> bool {
        self.back == 0
    }

    pub fn up(&mut self, lines: usize, total: usize) {
        self.back = (self.back + lines).min(total.saturating_sub(1));
    }

    pub fn down(&mut self, lines: usize) {
        self.back = self.back.saturating_sub(lines);
    }

    pub fn top(&mut self, total: usize) {
        self.back = total.saturating_sub(1);
    }

    pub fn tail(&mut self) {
        self.back = 0;
    }
}

/// Bounded activity log with its scroll position.
#[derive(Debug, Default)]
pub struct ActivityLog {
    lines: VecDeque<String>,
    pub scroll: LogScrollState,
}

impl ActivityLog {
    pub fn push(&mut self, line: impl Into<String>) {
        self.lines.push_back(line.into());
        if self.lines.len() > LOG_CAPACITY {
            self.lines.pop_front();
        } else if !self.scroll.follows_tail() {
            // Keep the viewed lines in place while new ones arrive.
            self.scroll.back += 1;
        }
    }

    pub fn push_error(&mut self, message: &str) {
        self.push(format!("{ERROR_PREFIX}{message}"));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    /// The `height` lines ending `scroll.back` lines above the newest.
    #[must_use]
    pub fn window(&self, height: usize) -> Vec<&str> {
        let end = self.lines.len().saturating_sub(self.scroll.back);
        let start = end.saturating_sub(height);
        self.lines.range(start..end).map(String::as_str).collect()
    }
}

pub fn render_logs(frame: &mut Frame, area: Rect, log: &ActivityLog, theme: &ColorTheme) {
    let height = usize::from(area.height.saturating_sub(2));
    let items: Vec<ListItem> = log
        .window(height)
        .into_iter()
        .map(|line| {
            let style = if line.starts_with(ERROR_PREFIX) {
                theme.error_style()
            } else {
                theme.text_style()
            };
            ListItem::new(Line::raw(line)).style(style)
        })
        .collect();
    let title = if log.scroll.follows_tail() {
        " Activity ".to_string()
    } else {
        format!(" Activity (-{}) ", log.scroll.back)
    };
    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(title)
            .border_style(theme.muted_style()),
    );
    frame.render_widget(list, area);
}
