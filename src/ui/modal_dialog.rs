//! Terminal modal dialog usable as a step's surface, trigger and error processor

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};
use tui_textarea::TextArea;

use super::centered_rect;
use crate::remote::SubmitFailure;
use crate::surface::{ErrorProcessor, ManualTrigger, ModalSurface};

/// What a key press did to the dialog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogAction {
    /// Enter activated the clickthrough trigger
    Submitted,
    /// Esc closed the dialog without submitting
    Dismissed,
    /// Key was consumed by the input field
    Edited,
    /// Dialog is hidden; key ignored
    Ignored,
}

struct DialogState {
    visible: bool,
    message: String,
    input: Option<TextArea<'static>>,
    errors: Vec<String>,
}

/// A centered popup with an optional single-line input.
///
/// Enter activates the dialog's clickthrough trigger. The dialog never holds
/// its lock while the trigger fires, so step callbacks are free to call back
/// into it (`input_value`, `set_message`, `hide`).
pub struct ModalDialog {
    title: String,
    state: Mutex<DialogState>,
    trigger: Arc<ManualTrigger>,
}

impl ModalDialog {
    /// Confirmation-only dialog
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            title: title.into(),
            state: Mutex::new(DialogState {
                visible: false,
                message: message.into(),
                input: None,
                errors: Vec::new(),
            }),
            trigger: ManualTrigger::new(),
        })
    }

    /// Dialog with a labelled text input
    pub fn with_input(
        title: impl Into<String>,
        message: impl Into<String>,
        label: &str,
    ) -> Arc<Self> {
        let mut input = TextArea::default();
        input.set_block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {} ", label)),
        );
        input.set_cursor_line_style(Style::default());

        let dialog = Self::new(title, message);
        dialog.lock_state().input = Some(input);
        dialog
    }

    fn lock_state(&self) -> MutexGuard<'_, DialogState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Clickthrough trigger to bind the dialog's step to.
    pub fn trigger(&self) -> Arc<ManualTrigger> {
        Arc::clone(&self.trigger)
    }

    pub fn is_visible(&self) -> bool {
        self.lock_state().visible
    }

    pub fn set_message(&self, message: impl Into<String>) {
        self.lock_state().message = message.into();
    }

    pub fn message(&self) -> String {
        self.lock_state().message.clone()
    }

    /// Current text of the input field (empty for confirmation dialogs).
    pub fn input_value(&self) -> String {
        self.lock_state()
            .input
            .as_ref()
            .map(|input| input.lines().join("\n"))
            .unwrap_or_default()
    }

    pub fn set_input_value(&self, value: &str) {
        if let Some(input) = self.lock_state().input.as_mut() {
            input.select_all();
            input.cut();
            input.insert_str(value);
        }
    }

    pub fn errors(&self) -> Vec<String> {
        self.lock_state().errors.clone()
    }

    pub fn handle_key(&self, key: KeyEvent) -> DialogAction {
        {
            let mut state = self.lock_state();
            if !state.visible {
                return DialogAction::Ignored;
            }
            match key.code {
                KeyCode::Enter => {}
                KeyCode::Esc => {
                    state.visible = false;
                    tracing::debug!(dialog = %self.title, "Dialog dismissed without submitting");
                    return DialogAction::Dismissed;
                }
                _ => {
                    if let Some(input) = state.input.as_mut() {
                        input.input(key);
                    }
                    return DialogAction::Edited;
                }
            }
        }

        // Lock released: the step's submit sequence calls back into us
        self.trigger.fire();
        DialogAction::Submitted
    }

    pub fn render(&self, frame: &mut Frame, percent_x: u16, percent_y: u16) {
        let state = self.lock_state();
        if !state.visible {
            return;
        }

        let area = centered_rect(percent_x, percent_y, frame.area());
        frame.render_widget(Clear, area);

        let block = Block::default()
            .title(format!(" {} ", self.title))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let input_height = if state.input.is_some() { 3 } else { 0 };
        let error_height = state.errors.len() as u16;
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([
                Constraint::Min(2),
                Constraint::Length(input_height),
                Constraint::Length(error_height),
                Constraint::Length(1),
            ])
            .split(inner);

        let message = Paragraph::new(state.message.as_str()).wrap(Wrap { trim: true });
        frame.render_widget(message, chunks[0]);

        if let Some(input) = state.input.as_ref() {
            frame.render_widget(input, chunks[1]);
        }

        if !state.errors.is_empty() {
            let lines: Vec<Line> = state
                .errors
                .iter()
                .map(|e| Line::from(Span::styled(e.as_str(), Style::default().fg(Color::Red))))
                .collect();
            frame.render_widget(Paragraph::new(lines), chunks[2]);
        }

        let help = Line::from(vec![
            Span::styled(
                "[Enter]",
                Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(" continue  "),
            Span::styled("[Esc]", Style::default().fg(Color::Gray)),
            Span::raw(" close"),
        ]);
        frame.render_widget(Paragraph::new(help), chunks[3]);
    }
}

impl ModalSurface for ModalDialog {
    fn open(&self) {
        self.lock_state().visible = true;
    }

    fn hide(&self) {
        self.lock_state().visible = false;
    }
}

impl ErrorProcessor for ModalDialog {
    fn clear_validation_errors(&self) {
        self.lock_state().errors.clear();
    }

    fn handle_errors(&self, failure: &SubmitFailure) {
        let errors = if failure.has_validation_errors() {
            failure
                .validation
                .iter()
                .map(|e| format!("{}: {}", e.field, e.message))
                .collect()
        } else {
            vec![failure.to_string()]
        };
        self.lock_state().errors = errors;
    }
}

impl std::fmt::Debug for ModalDialog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModalDialog")
            .field("title", &self.title)
            .field("visible", &self.is_visible())
            .finish()
    }
}
