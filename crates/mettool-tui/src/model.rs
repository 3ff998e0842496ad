//! TUI application model (Elm architecture).
//!
//! `TuiApp` owns the dashboard controller. Key presses and `:` commands call
//! controller actions; the controller answers through the bridge, whose
//! messages are drained by [`TuiApp::update`] on every tick.

use std::io;
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;
use crossterm::event::{self, Event, KeyEvent, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Tabs};
use ratatui::Terminal;
use tracing::debug;

use mettool_core::{AnalysisKind, ChartView, RequestKind};
use mettool_orchestration::{Chart, ControllerError, DashboardController, Notification};

use crate::chart::{control_plot, cusum_plot, render_no_data, render_plot};
use crate::command::{parse_command, Command};
use crate::footer::render_footer;
use crate::header::{render_header, HeaderInfo};
use crate::heatmap::render_heatmap;
use crate::keymap::{map_edit_key, map_key, EditKey, KeyAction};
use crate::logs::{render_logs, ActivityLog};
use crate::messages::TuiMessage;
use crate::styles::ColorTheme;
use crate::toasts::{render_toasts, ToastQueue};

const TICK_RATE: Duration = Duration::from_millis(250);
const PAGE: usize = 5;

/// TUI application state (Elm Model).
pub struct TuiApp {
    controller: DashboardController,
    rx: Receiver<TuiMessage>,
    /// Tab on screen; also the target of `cols`, run and export.
    pub tab: AnalysisKind,
    charts: [Option<Chart>; 3],
    pub log: ActivityLog,
    pub toasts: ToastQueue,
    /// Text of the open command line.
    pub command: Option<String>,
    pub should_quit: bool,
    pub terminal_width: u16,
    pub terminal_height: u16,
    theme: ColorTheme,
}

impl TuiApp {
    #[must_use]
    pub fn new(controller: DashboardController, rx: Receiver<TuiMessage>) -> Self {
        Self {
            controller,
            rx,
            tab: AnalysisKind::Correlation,
            charts: Default::default(),
            log: ActivityLog::default(),
            toasts: ToastQueue::default(),
            command: None,
            should_quit: false,
            terminal_width: 80,
            terminal_height: 24,
            theme: ColorTheme::default(),
        }
    }

    #[must_use]
    pub fn controller(&self) -> &DashboardController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut DashboardController {
        &mut self.controller
    }

    #[must_use]
    pub fn chart(&self, kind: AnalysisKind) -> Option<&Chart> {
        self.charts[kind.index()].as_ref()
    }

    /// Apply controller events and queued messages (Elm Update).
    pub fn update(&mut self) {
        self.update_at(Instant::now());
    }

    pub fn update_at(&mut self, now: Instant) {
        for done in self.controller.pump() {
            match &done.result {
                Ok(()) => debug!(kind = ?done.kind, "request completed"),
                Err(e) => debug!(kind = ?done.kind, error = %e, "request failed"),
            }
        }
        while let Ok(msg) = self.rx.try_recv() {
            self.handle_message(msg, now);
        }
        self.toasts.expire(now);
    }

    pub fn handle_message(&mut self, msg: TuiMessage, now: Instant) {
        match msg {
            TuiMessage::Notify(notification) => self.show(notification, now),
            TuiMessage::Chart(chart) => {
                let idx = chart.kind().index();
                self.charts[idx] = Some(chart);
            }
            TuiMessage::ChartsReset => self.charts = Default::default(),
            TuiMessage::Log(line) => self.log.push(line),
            TuiMessage::Tick => {}
            TuiMessage::Resize { width, height } => {
                self.terminal_width = width;
                self.terminal_height = height;
            }
            TuiMessage::KeyPress(action) => self.handle_key_action(action),
            TuiMessage::Quit => self.should_quit = true,
        }
    }

    fn show(&mut self, notification: Notification, now: Instant) {
        if notification.is_error() {
            self.log.push_error(&notification.message);
        } else {
            self.log.push(notification.message.clone());
        }
        self.toasts.push(notification, now);
    }

    /// Route a raw key to the command line or the key map.
    pub fn handle_key(&mut self, key: KeyEvent) {
        if self.command.is_some() {
            self.edit(map_edit_key(key));
        } else {
            self.handle_key_action(map_key(key));
        }
    }

    fn edit(&mut self, key: EditKey) {
        let Some(text) = self.command.as_mut() else {
            return;
        };
        match key {
            EditKey::Insert(c) => text.push(c),
            EditKey::Backspace => {
                text.pop();
            }
            EditKey::Submit => {
                let line = std::mem::take(text);
                self.command = None;
                self.execute_line(&line);
            }
            EditKey::Cancel => self.command = None,
            EditKey::None => {}
        }
    }

    fn step_tab(&mut self, forward: bool) {
        let i = self.tab.index();
        let n = AnalysisKind::ALL.len();
        let next = if forward { (i + 1) % n } else { (i + n - 1) % n };
        self.tab = AnalysisKind::ALL[next];
    }

    pub fn handle_key_action(&mut self, action: KeyAction) {
        let total = self.log.len();
        let result = match action {
            KeyAction::Quit => {
                self.should_quit = true;
                Ok(())
            }
            KeyAction::NextTab => {
                self.step_tab(true);
                Ok(())
            }
            KeyAction::PrevTab => {
                self.step_tab(false);
                Ok(())
            }
            KeyAction::Run => self.controller.run(self.tab),
            KeyAction::Export => self.controller.export(self.tab).map(drop),
            KeyAction::Clear => {
                self.controller.clear();
                Ok(())
            }
            KeyAction::Load => self.controller.load(),
            KeyAction::OpenCommand => {
                self.command = Some(String::new());
                Ok(())
            }
            KeyAction::ToggleLimits => {
                let show = !self.controller.selections().show_limits;
                self.controller.set_show_limits(show);
                Ok(())
            }
            KeyAction::ToggleAverage => {
                let show = !self.controller.selections().show_average;
                self.controller.set_show_average(show);
                Ok(())
            }
            KeyAction::ScrollUp => {
                self.log.scroll.up(1, total);
                Ok(())
            }
            KeyAction::ScrollDown => {
                self.log.scroll.down(1);
                Ok(())
            }
            KeyAction::PageUp => {
                self.log.scroll.up(PAGE, total);
                Ok(())
            }
            KeyAction::PageDown => {
                self.log.scroll.down(PAGE);
                Ok(())
            }
            KeyAction::Home => {
                self.log.scroll.top(total);
                Ok(())
            }
            KeyAction::End => {
                self.log.scroll.tail();
                Ok(())
            }
            KeyAction::None => Ok(()),
        };
        Self::rejected(result);
    }

    /// Rejections were already notified by the controller.
    fn rejected(result: Result<(), ControllerError>) {
        if let Err(e) = result {
            debug!(error = %e, "action rejected");
        }
    }

    /// Parse and run one command line.
    pub fn execute_line(&mut self, line: &str) {
        match parse_command(line) {
            Ok(command) => self.execute(command),
            Err(e) => self.show(Notification::error(e.to_string()), Instant::now()),
        }
    }

    pub fn execute(&mut self, command: Command) {
        let c = &mut self.controller;
        let result = match command {
            Command::File(path) => c.select_file(path),
            Command::Sheet(name) => c.select_sheet(&name),
            Command::Load => c.load(),
            Command::Date(column) => c.set_date_column(&column),
            Command::Columns(columns) => c.set_columns(self.tab, columns),
            Command::Range { start, end } => {
                c.set_range(&start, &end);
                Ok(())
            }
            Command::Confidence(text) => {
                c.set_confidence(&text);
                Ok(())
            }
            Command::PeriodAdd { start, end } => c.add_period(&start, &end),
            Command::PeriodRemove => c.remove_selected_period().map(drop),
            Command::PeriodSelect(n) => c.select_period(n - 1),
            Command::Limits(on) => {
                c.set_show_limits(on);
                Ok(())
            }
            Command::Average(on) => {
                c.set_show_average(on);
                Ok(())
            }
            Command::Run => c.run(self.tab),
            Command::Export => c.export(self.tab).map(drop),
            Command::Clear => {
                c.clear();
                Ok(())
            }
            Command::Quit => {
                self.should_quit = true;
                Ok(())
            }
        };
        Self::rejected(result);
    }

    /// Split into (header, tabs, main, logs, footer).
    #[must_use]
    pub fn compute_layout(area: Rect) -> (Rect, Rect, Rect, Rect, Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2),
                Constraint::Length(1),
                Constraint::Min(8),
                Constraint::Length(7),
                Constraint::Length(2),
            ])
            .split(area);
        (rows[0], rows[1], rows[2], rows[3], rows[4])
    }

    fn selection_lines(&self) -> Vec<Line<'static>> {
        let sel = self.controller.selections();
        let theme = &self.theme;
        let mut lines = vec![Line::from(format!(
            "Date: {}",
            sel.date_column.as_deref().unwrap_or("-")
        ))];
        match self.tab {
            AnalysisKind::Correlation | AnalysisKind::Cusum => {
                let cols = if self.tab == AnalysisKind::Correlation {
                    &sel.correlation_columns
                } else {
                    &sel.cusum_columns
                };
                lines.push(Line::from(format!("Columns: {}", cols.join(", "))));
                lines.push(Line::from(format!("Range: {} .. {}", sel.start, sel.end)));
            }
            AnalysisKind::ControlChart => {
                let on_off = |b: bool| if b { "on" } else { "off" };
                lines.push(Line::from(format!(
                    "Column: {}",
                    sel.control_column.as_deref().unwrap_or("-")
                )));
                lines.push(Line::from(format!("Confidence: {}%", sel.confidence)));
                lines.push(Line::from(format!(
                    "Limits: {}  Average: {}",
                    on_off(sel.show_limits),
                    on_off(sel.show_average)
                )));
                lines.push(Line::from(Span::styled("Periods", theme.header_style())));
                for (i, period) in self.controller.periods().iter().enumerate() {
                    let style = if sel.selected_period == Some(i) {
                        theme.selected_style()
                    } else {
                        theme.text_style()
                    };
                    lines.push(Line::from(Span::styled(format!("{}. {period}", i + 1), style)));
                }
            }
        }
        let kind = RequestKind::Analysis(self.tab);
        if self.controller.is_busy(kind) {
            lines.push(Line::from(Span::styled("running...", theme.accent_style())));
        } else if self.controller.has_export(self.tab) {
            lines.push(Line::from(Span::styled("export ready", theme.success_style())));
        }
        lines
    }

    /// Render the full TUI view.
    pub fn render(&self, frame: &mut ratatui::Frame) {
        let (header_area, tabs_area, main_area, logs_area, footer_area) =
            Self::compute_layout(frame.area());
        let theme = &self.theme;

        let sel = self.controller.selections();
        let file = sel
            .file
            .as_ref()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str());
        let readiness = self.controller.readiness();
        let info = HeaderInfo {
            file,
            sheet: sel.sheet.as_deref(),
            columns: self.controller.date_choices().len(),
            readiness: &readiness,
        };
        render_header(frame, header_area, &info, theme);

        let titles = AnalysisKind::ALL.iter().map(|k| k.label());
        let tabs = Tabs::new(titles)
            .select(self.tab.index())
            .style(theme.muted_style())
            .highlight_style(theme.selected_style());
        frame.render_widget(tabs, tabs_area);

        let main = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
            .split(main_area);
        self.render_chart(frame, main[0]);
        let side = Paragraph::new(self.selection_lines()).block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Selections ")
                .border_style(theme.muted_style()),
        );
        frame.render_widget(side, main[1]);

        render_logs(frame, logs_area, &self.log, theme);
        render_footer(frame, footer_area, self.command.as_deref(), theme);
        render_toasts(frame, main_area, &self.toasts, theme);
    }

    fn render_chart(&self, frame: &mut ratatui::Frame, area: Rect) {
        let theme = &self.theme;
        let label = self.tab.label();
        match self.chart(self.tab) {
            Some(Chart::Correlation(ChartView::Ready(map))) => {
                render_heatmap(frame, area, map, theme);
            }
            Some(Chart::Cusum(ChartView::Ready(lines))) => {
                render_plot(frame, area, label, &cusum_plot(lines), theme);
            }
            Some(Chart::ControlChart(ChartView::Ready(chart))) => {
                render_plot(frame, area, &chart.title, &control_plot(chart), theme);
            }
            _ => render_no_data(frame, area, label, theme),
        }
    }

    pub fn setup_terminal() -> io::Result<Terminal<CrosstermBackend<io::Stdout>>> {
        terminal::enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        Terminal::new(CrosstermBackend::new(stdout))
    }

    pub fn teardown_terminal(
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> io::Result<()> {
        terminal::disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()
    }

    /// Run the event loop until quit.
    pub fn run(&mut self) -> io::Result<()> {
        let mut terminal = Self::setup_terminal()?;
        let outcome = self.event_loop(&mut terminal);
        Self::teardown_terminal(&mut terminal)?;
        outcome
    }

    fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> io::Result<()> {
        loop {
            terminal.draw(|frame| self.render(frame))?;
            if self.should_quit {
                return Ok(());
            }
            if event::poll(TICK_RATE)? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => self.handle_key(key),
                    Event::Resize(width, height) => {
                        self.terminal_width = width;
                        self.terminal_height = height;
                    }
                    _ => {}
                }
            }
            self.update();
        }
    }
}
