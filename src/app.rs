//! Terminal event loop that hosts a demo workflow

use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

use modalflow::ui::{DialogAction, Tui};
use modalflow::{Completion, Config, Loadable};

use crate::demos::{Demo, DemoWorkflow};

/// Maximum status lines kept on screen
const STATUS_HISTORY: usize = 50;

pub struct App {
    config: Config,
    demo: Demo,
    status_rx: UnboundedReceiver<String>,
    status: Vec<String>,
    running: Option<Completion>,
    should_quit: bool,
}

impl App {
    pub fn new(config: Config, workflow: DemoWorkflow) -> Result<Self> {
        let (status_tx, status_rx) = unbounded_channel();
        let demo = workflow.build(&config, status_tx)?;
        Ok(Self {
            config,
            demo,
            status_rx,
            status: Vec::new(),
            running: None,
            should_quit: false,
        })
    }

    fn start(&mut self) {
        tracing::info!(demo = self.demo.title, "Starting workflow");
        self.push_status(format!("Started '{}'", self.demo.title));
        self.running = Some(self.demo.head.load());
    }

    fn push_status(&mut self, line: String) {
        self.status.push(line);
        if self.status.len() > STATUS_HISTORY {
            let overflow = self.status.len() - STATUS_HISTORY;
            self.status.drain(..overflow);
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut tui = Tui::enter()?;
        let tick_rate = Duration::from_millis(self.config.ui.refresh_rate_ms);

        self.start();

        while !self.should_quit {
            tui.terminal().draw(|f| self.render(f))?;

            if event::poll(tick_rate)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key);
                    }
                }
            }

            // Let spawned link continuations advance between frames
            tokio::task::yield_now().await;
            self.drain_status();
            self.check_finished();
        }

        Ok(())
    }

    fn drain_status(&mut self) {
        while let Ok(line) = self.status_rx.try_recv() {
            self.push_status(line);
        }
    }

    fn check_finished(&mut self) {
        let Some(completion) = self.running.as_mut() else {
            return;
        };
        match completion.try_take() {
            Some(Ok(_)) => {
                self.running = None;
                self.push_status("Workflow complete - [r] restart, [q] quit".to_string());
            }
            Some(Err(e)) => {
                self.running = None;
                tracing::warn!(error = %e, "Workflow ended without a result");
                self.push_status(format!("Workflow stopped: {}", e));
            }
            None => {}
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        // Topmost visible dialog gets the key
        let focused = self.demo.dialogs.iter().rev().find(|d| d.is_visible()).cloned();
        if let Some(dialog) = focused {
            if dialog.handle_key(key) == DialogAction::Dismissed {
                self.push_status(format!(
                    "'{}' closed without submitting; workflow is paused",
                    dialog.title()
                ));
            }
            return;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('r') => self.start(),
            _ => {}
        }
    }

    fn render(&self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(3)])
            .split(frame.area());

        let header = Paragraph::new(Line::from(vec![
            Span::styled(
                format!(" modalflow: {} ", self.demo.title),
                Style::default().fg(Color::Cyan),
            ),
            Span::raw("  [r] restart  [q] quit"),
        ]))
        .block(Block::default().borders(Borders::ALL));
        frame.render_widget(header, chunks[0]);

        let items: Vec<ListItem> = self
            .status
            .iter()
            .map(|line| ListItem::new(line.as_str()))
            .collect();
        let log = List::new(items).block(Block::default().title(" Status ").borders(Borders::ALL));
        frame.render_widget(log, chunks[1]);

        let (width, height) = (
            self.config.ui.dialog_width_percent,
            self.config.ui.dialog_height_percent,
        );
        for dialog in &self.demo.dialogs {
            dialog.render(frame, width, height);
        }
    }
}
