use std::io::{self, Stdout};

use crossterm::{execute, terminal};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Frame, Terminal,
};

use crate::error::Result;

/// Owns the terminal for one screen. Raw mode and the alternate screen are
/// released on drop, even when the screen returns early with an error.
pub struct TerminalGuard<B: Backend = CrosstermBackend<Stdout>> {
    terminal: Terminal<B>,
    alternate_screen: bool,
    restored: bool,
}

impl TerminalGuard {
    pub fn new() -> Result<Self> {
        terminal::enable_raw_mode()?;
        if let Err(err) = execute!(io::stdout(), terminal::EnterAlternateScreen) {
            let _ = terminal::disable_raw_mode();
            return Err(err.into());
        }
        let terminal = match Terminal::new(CrosstermBackend::new(io::stdout())) {
            Ok(terminal) => terminal,
            Err(err) => {
                let _ = leave_alternate_screen();
                return Err(err.into());
            }
        };

        let mut guard = Self {
            terminal,
            alternate_screen: true,
            restored: false,
        };
        guard.terminal.hide_cursor()?;
        Ok(guard)
    }
}

impl<B: Backend> TerminalGuard<B> {
    /// Draw on a backend that needs no raw mode (an in-memory buffer).
    #[cfg(test)]
    pub fn headless(backend: B) -> Result<Self> {
        let mut terminal = Terminal::new(backend)?;
        terminal.hide_cursor()?;
        Ok(Self {
            terminal,
            alternate_screen: false,
            restored: false,
        })
    }

    pub fn draw(&mut self, render: impl FnOnce(&mut Frame)) -> Result<()> {
        self.terminal.draw(render)?;
        Ok(())
    }

    /// Safe to call more than once; only the first call touches the terminal.
    pub fn restore(&mut self) -> Result<()> {
        if self.restored {
            return Ok(());
        }
        self.restored = true;
        self.terminal.show_cursor()?;
        if self.alternate_screen {
            leave_alternate_screen()?;
        }
        Ok(())
    }
}

impl<B: Backend> Drop for TerminalGuard<B> {
    fn drop(&mut self) {
        let _ = self.restore();
    }
}

fn leave_alternate_screen() -> io::Result<()> {
    execute!(io::stdout(), terminal::LeaveAlternateScreen)?;
    terminal::disable_raw_mode()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::{backend::TestBackend, widgets::Paragraph};

    #[test]
    fn draws_frames_and_restores_once() {
        let mut guard = TerminalGuard::headless(TestBackend::new(12, 2)).unwrap();
        guard
            .draw(|f| f.render_widget(Paragraph::new("PETR4.SA"), f.size()))
            .unwrap();

        let first_row: String = guard.terminal.backend().buffer().content()[..12]
            .iter()
            .map(|cell| cell.symbol())
            .collect();
        assert_eq!(first_row.trim_end(), "PETR4.SA");

        guard.restore().unwrap();
        guard.restore().unwrap();
        assert!(guard.restored);
    }
}
