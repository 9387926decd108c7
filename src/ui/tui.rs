//! Terminal session that restores the screen when dropped.

use std::io::{self, Stdout, Write};
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use crossterm::{
    cursor::Show,
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

/// Owns the ratatui terminal for the lifetime of the UI.
///
/// Raw mode and the alternate screen are undone on drop, including early
/// returns via `?`. Panics are covered by [`install_panic_hook`].
pub struct Tui {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    active: AtomicBool,
}

impl Tui {
    pub fn enter() -> Result<Self> {
        enable_raw_mode()?;
        execute!(io::stdout(), EnterAlternateScreen)?;
        let terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
        Ok(Self {
            terminal,
            active: AtomicBool::new(true),
        })
    }

    pub fn terminal(&mut self) -> &mut Terminal<CrosstermBackend<Stdout>> {
        &mut self.terminal
    }

    /// Best-effort restore; safe to call more than once.
    pub fn restore() {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, Show);
        let _ = io::stdout().flush();
    }
}

impl Drop for Tui {
    fn drop(&mut self) {
        if self.active.swap(false, Ordering::SeqCst) {
            Self::restore();
        }
    }
}

/// Restore the terminal before the default panic output is printed.
pub fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        Tui::restore();
        original_hook(panic_info);
    }));
}
