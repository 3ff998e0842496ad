//! Transient notifications.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use ratatui::layout::Rect;
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;

use mettool_core::NOTIFICATION_TTL;
use mettool_orchestration::Notification;

use crate::styles::ColorTheme;

const MAX_VISIBLE: usize = 4;

#[derive(Debug, Clone)]
pub struct Toast {
    pub notification: Notification,
    pub shown_at: Instant,
}

/// Toasts newest last; each one lives for a fixed time.
#[derive(Debug)]
pub struct ToastQueue {
    toasts: VecDeque<Toast>,
    ttl: Duration,
}

impl Default for ToastQueue {
    fn default() -> Self {
        Self::new(NOTIFICATION_TTL)
    }
}

impl ToastQueue {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            toasts: VecDeque::new(),
            ttl,
        }
    }

    pub fn push(&mut self, notification: Notification, now: Instant) {
        self.toasts.push_back(Toast {
            notification,
            shown_at: now,
        });
        while self.toasts.len() > MAX_VISIBLE {
            self.toasts.pop_front();
        }
    }

    /// Drop toasts older than the time-to-live.
    pub fn expire(&mut self, now: Instant) {
        let ttl = self.ttl;
        self.toasts
            .retain(|t| now.saturating_duration_since(t.shown_at) < ttl);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Toast> {
        self.toasts.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.toasts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.toasts.is_empty()
    }
}

/// Draw the toasts stacked in the top-right corner of `area`.
#[allow(clippy::cast_possible_truncation)]
pub fn render_toasts(frame: &mut Frame, area: Rect, queue: &ToastQueue, theme: &ColorTheme) {
    let width = area.width.min(44);
    let mut y = area.y;
    for toast in queue.iter() {
        let height = 3;
        if y + height > area.y + area.height {
            break;
        }
        let rect = Rect {
            x: area.x + area.width - width,
            y,
            width,
            height,
        };
        let style = if toast.notification.is_error() {
            theme.error_style()
        } else {
            theme.success_style()
        };
        let body = Paragraph::new(Line::from(toast.notification.message.as_str()))
            .style(style)
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL).border_style(style));
        frame.render_widget(Clear, rect);
        frame.render_widget(body, rect);
        y += height;
    }
}
