//! TUI Application - Main entry point and run loop

use std::io::{self, Stdout};
use std::time::Duration;

use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture, Event, EventStream, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::StreamExt;
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame, Terminal,
};
use tracing::debug;

use super::events::{handle_key_event, Action};
use super::state::UiState;
use super::theme::{icons, HyperspaceTheme};
use crate::container::SubmitStatus;
use crate::model::{Field, FormId};
use crate::session::{Command, FormSession};

/// Border + one line per field + one error line per field
const CARD_HEIGHT: u16 = 2 + 2 * Field::ALL.len() as u16;

const SUBMIT_BLOCKED_HINT: &str = "Fix the highlighted fields before submitting";
const LAST_FORM_HINT: &str = "Nothing to remove";

/// TUI Application
pub struct TuiApp {
    session: FormSession,
    ui: UiState,
    theme: HyperspaceTheme,
}

impl TuiApp {
    pub fn new(session: FormSession) -> Self {
        Self {
            session,
            ui: UiState::default(),
            theme: HyperspaceTheme::new(),
        }
    }

    /// Run the TUI application
    pub async fn run(mut self) -> anyhow::Result<()> {
        let mut terminal = self.setup_terminal()?;
        let result = self.main_loop(&mut terminal).await;
        self.restore_terminal(&mut terminal)?;
        result
    }

    /// Setup terminal for TUI
    fn setup_terminal(&self) -> anyhow::Result<Terminal<CrosstermBackend<Stdout>>> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;
        Ok(terminal)
    }

    /// Restore terminal to normal state
    fn restore_terminal(
        &self,
        terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    ) -> anyhow::Result<()> {
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;
        Ok(())
    }

    /// Main event loop
    ///
    /// Keys and session completions are both applied on this task, so the
    /// session never sees concurrent access.
    async fn main_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    ) -> anyhow::Result<()> {
        let mut keys = EventStream::new();
        let mut redraw = tokio::time::interval(Duration::from_millis(100));

        while !self.ui.should_quit {
            terminal.draw(|frame| self.render(frame))?;

            tokio::select! {
                maybe_event = keys.next() => match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        self.apply(handle_key_event(key));
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                    None => break,
                },
                Some(event) = self.session.next_event() => {
                    self.session.handle_event(event);
                    self.session.drain_ready();
                }
                _ = redraw.tick() => {}
            }

            self.ui.push_notices(self.session.take_notices());
        }

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Input
    // ─────────────────────────────────────────────────────────────────────

    fn apply(&mut self, action: Action) {
        if action != Action::None {
            self.ui.dismiss();
        }
        let order = self.session.container().order().to_vec();
        let selected = self.ui.selected_id(&order);

        match action {
            Action::Quit => self.ui.should_quit = true,
            Action::Help => self.ui.show_help = !self.ui.show_help,
            Action::NextField => {
                self.touch_current(selected);
                self.ui.field = self.ui.field.next();
            }
            Action::PrevField => {
                self.touch_current(selected);
                self.ui.field = self.ui.field.prev();
            }
            Action::NextForm => {
                self.touch_current(selected);
                self.ui.select_next(order.len());
            }
            Action::PrevForm => {
                self.touch_current(selected);
                self.ui.select_prev();
            }
            Action::AddForm => {
                self.session.dispatch(Command::AddForm);
                self.ui.select_last(self.session.container().len());
                self.ui.field = Field::Country;
            }
            Action::RemoveForm => {
                let removed = selected
                    .map(|id| self.session.dispatch(Command::RemoveForm(id)))
                    .unwrap_or(false);
                if !removed {
                    self.ui.hint = Some(LAST_FORM_HINT);
                }
                self.ui.clamp(self.session.container().len());
            }
            Action::Submit => {
                if !self.session.dispatch(Command::StartSubmit) {
                    self.ui.hint = Some(SUBMIT_BLOCKED_HINT);
                }
            }
            Action::Cancel => {
                self.session.dispatch(Command::CancelSubmit);
            }
            Action::Input(c) => self.edit_selected(selected, |value| value.push(c)),
            Action::Backspace => self.edit_selected(selected, |value| {
                value.pop();
            }),
            Action::None => {}
        }
    }

    fn touch_current(&mut self, selected: Option<FormId>) {
        if let Some(id) = selected {
            self.session.dispatch(Command::Touch {
                id,
                field: self.ui.field,
            });
        }
    }

    fn edit_selected(&mut self, selected: Option<FormId>, change: impl FnOnce(&mut String)) {
        let Some(id) = selected else {
            return;
        };
        let Some(unit) = self.session.unit(id) else {
            debug!(form = %id, "Selected form has no unit");
            return;
        };
        let mut value = unit.value(self.ui.field).to_string();
        change(&mut value);
        self.session.dispatch(Command::Edit {
            id,
            field: self.ui.field,
            value,
        });
    }

    // ─────────────────────────────────────────────────────────────────────
    // Rendering
    // ─────────────────────────────────────────────────────────────────────

    /// Render the UI
    fn render(&self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Header
                Constraint::Min(CARD_HEIGHT),
                Constraint::Length(1), // Footer
            ])
            .split(frame.area());

        self.render_header(frame, chunks[0]);
        if self.ui.show_help {
            self.render_help(frame, chunks[1]);
        } else {
            self.render_forms(frame, chunks[1]);
        }
        self.render_footer(frame, chunks[2]);
    }

    fn render_header(&self, frame: &mut Frame, area: Rect) {
        let container = self.session.container();
        let status = container.status();
        let status_text = match status {
            SubmitStatus::Idle if container.can_submit() => "ready".to_string(),
            SubmitStatus::Idle => "idle".to_string(),
            SubmitStatus::CountingDown { remaining } => {
                format!("submitting in {remaining}s [Esc] cancel")
            }
            SubmitStatus::Submitting => "submitting...".to_string(),
        };

        let line = Line::from(vec![
            Span::styled(format!(" {} FORMDECK ", icons::APP), self.theme.header()),
            Span::styled(format!("│ {} forms ", container.len()), self.theme.text()),
            Span::styled(
                format!("│ {} invalid ", container.invalid_count()),
                if container.invalid_count() > 0 {
                    self.theme.error()
                } else {
                    self.theme.success()
                },
            ),
            Span::styled(format!("│ {status_text} "), self.theme.status_style(status)),
            Span::styled(
                format!("│ gateway: {}", self.session.gateway_name()),
                self.theme.dimmed(),
            ),
        ]);

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(self.theme.header());
        frame.render_widget(Paragraph::new(line).block(block), area);
    }

    fn render_forms(&self, frame: &mut Frame, area: Rect) {
        let order = self.session.container().order();
        let visible = (area.height / CARD_HEIGHT).max(1) as usize;
        let start = self.ui.window_start(visible);

        let slots = Layout::default()
            .direction(Direction::Vertical)
            .constraints(vec![Constraint::Length(CARD_HEIGHT); visible])
            .split(area);

        for (slot, (index, id)) in slots
            .iter()
            .zip(order.iter().enumerate().skip(start).take(visible))
        {
            self.render_card(frame, *slot, *id, index == self.ui.selected);
        }
    }

    fn render_card(&self, frame: &mut Frame, area: Rect, id: FormId, selected: bool) {
        let Some(unit) = self.session.unit(id) else {
            return;
        };
        let record = self.session.container().record(id);
        let valid = record.map(|r| r.is_valid).unwrap_or(false);
        let checking = self.session.is_checking(id);

        let mut lines = Vec::with_capacity(2 * Field::ALL.len());
        for field in Field::ALL {
            let focused = selected && field == self.ui.field;
            let label_style = if focused {
                self.theme.highlight()
            } else {
                self.theme.dimmed()
            };

            let mut spans = vec![
                Span::styled(format!(" {:<10}", field.label()), label_style),
                Span::styled(unit.value(field).to_string(), self.theme.text()),
            ];
            if focused {
                spans.push(Span::styled(icons::CURSOR, self.theme.accent()));
            }
            if field == Field::Username && checking {
                spans.push(Span::styled(
                    format!("  {} checking", icons::CHECKING),
                    self.theme.warning(),
                ));
            }
            lines.push(Line::from(spans));

            let message = record
                .and_then(|r| r.errors.get(&field))
                .map(String::as_str)
                .unwrap_or("");
            lines.push(Line::from(Span::styled(
                format!("   {message}"),
                self.theme.error(),
            )));
        }

        let badge = if valid { icons::VALID } else { icons::INVALID };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(self.theme.card_border(selected, valid))
            .title(format!(" Form {id} {badge} "));
        frame.render_widget(Paragraph::new(lines).block(block), area);
    }

    fn render_help(&self, frame: &mut Frame, area: Rect) {
        let rows = [
            ("Tab / Shift-Tab", "next / previous field"),
            ("Up / Down", "previous / next form"),
            ("Ctrl-N", "add a form"),
            ("Ctrl-D", "remove the selected form"),
            ("Ctrl-S", "submit all forms after a countdown"),
            ("Esc", "cancel a pending submission"),
            ("Ctrl-Q", "quit"),
        ];
        let lines: Vec<Line> = rows
            .iter()
            .map(|(key, what)| {
                Line::from(vec![
                    Span::styled(format!(" {key:<16}"), self.theme.accent()),
                    Span::styled(*what, self.theme.text()),
                ])
            })
            .collect();

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(self.theme.header())
            .title(" Keys ");
        frame.render_widget(Paragraph::new(lines).block(block), area);
    }

    /// Render footer: the oldest pending notice, else key hints
    fn render_footer(&self, frame: &mut Frame, area: Rect) {
        let footer = if let Some(notice) = self.ui.current_notice() {
            let mut spans = vec![Span::styled(
                format!(" {}", notice.message),
                self.theme.notice_style(notice.level),
            )];
            let queued = self.ui.notices.len() - 1;
            if queued > 0 {
                spans.push(Span::styled(format!("  (+{queued} more)"), self.theme.dimmed()));
            }
            Line::from(spans)
        } else if let Some(hint) = self.ui.hint {
            Line::from(Span::styled(format!(" {hint}"), self.theme.warning()))
        } else {
            Line::from(vec![
                Span::styled(" [Tab]", self.theme.accent()),
                Span::styled(" field ", self.theme.dimmed()),
                Span::styled("[↑↓]", self.theme.accent()),
                Span::styled(" form ", self.theme.dimmed()),
                Span::styled("[^N]", self.theme.accent()),
                Span::styled(" add ", self.theme.dimmed()),
                Span::styled("[^D]", self.theme.accent()),
                Span::styled(" remove ", self.theme.dimmed()),
                Span::styled("[^S]", self.theme.accent()),
                Span::styled(" submit ", self.theme.dimmed()),
                Span::styled("[F1]", self.theme.accent()),
                Span::styled(" help ", self.theme.dimmed()),
                Span::styled("[^Q]", self.theme.accent()),
                Span::styled(" quit", self.theme.dimmed()),
            ])
        };

        frame.render_widget(Paragraph::new(footer), area);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ratatui::backend::TestBackend;

    use super::*;
    use crate::config::FormdeckConfig;
    use crate::gateway::MockGateway;

    fn app() -> TuiApp {
        let session = FormSession::new(Arc::new(MockGateway::new()), &FormdeckConfig::default());
        TuiApp::new(session)
    }

    fn type_text(app: &mut TuiApp, text: &str) {
        for c in text.chars() {
            app.apply(Action::Input(c));
        }
    }

    #[tokio::test]
    async fn test_typing_edits_focused_field() {
        let mut app = app();
        type_text(&mut app, "Peru");
        app.apply(Action::Backspace);
        assert_eq!(app.session.unit(FormId(1)).unwrap().value(Field::Country), "Per");
    }

    #[tokio::test]
    async fn test_leaving_field_touches_it() {
        let mut app = app();
        app.apply(Action::NextField);
        assert_eq!(app.ui.field, Field::Username);
        let unit = app.session.unit(FormId(1)).unwrap();
        assert!(unit.is_touched(Field::Country));

        let record = app.session.container().record(FormId(1)).unwrap();
        assert_eq!(
            record.errors.get(&Field::Country).map(String::as_str),
            Some(Field::Country.error_message())
        );
    }

    #[tokio::test]
    async fn test_add_selects_new_form_and_remove_clamps() {
        let mut app = app();
        app.apply(Action::AddForm);
        assert_eq!(app.ui.selected, 1);
        assert_eq!(app.session.container().len(), 2);

        app.apply(Action::RemoveForm);
        assert_eq!(app.ui.selected, 0);
        assert_eq!(app.session.container().order(), &[FormId(1)]);
    }

    #[tokio::test]
    async fn test_blocked_submit_shows_hint() {
        let mut app = app();
        app.apply(Action::Submit);
        assert_eq!(app.ui.hint, Some(SUBMIT_BLOCKED_HINT));
        assert_eq!(app.session.status(), SubmitStatus::Idle);
    }

    #[tokio::test]
    async fn test_render_shows_form_card() {
        let mut app = app();
        type_text(&mut app, "Peru");

        let mut terminal = Terminal::new(TestBackend::new(80, 20)).unwrap();
        terminal.draw(|frame| app.render(frame)).unwrap();

        let buffer = terminal.backend().buffer();
        let text: String = buffer.content().iter().map(|c| c.symbol()).collect();
        assert!(text.contains("FORMDECK"));
        assert!(text.contains("Form #1"));
        assert!(text.contains("Peru"));
    }
}
