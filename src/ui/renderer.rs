//! Terminal rendering using crossterm.
//!
//! Paints the virtual screen grid plus one status line below it, inside
//! the alternate screen. The grid is repainted in full on every present;
//! at 24×80 that is cheap and it also wipes any help/stats page that was
//! showing.

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{
        KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    execute, queue,
    style::Print,
    terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};
use tracing::warn;

use crate::core::screen::{Cursor, Grid, Presenter};

/// Terminal front end: owns raw mode, the alternate screen, and all
/// drawing. The status line lives on the row just below the grid.
pub struct TerminalUi {
    rows: u16,
    cols: u16,
    muted: bool,
    status: String,
    enhanced_keys: bool,
    initialized: bool,
}

impl TerminalUi {
    pub fn new(rows: u16, cols: u16, muted: bool) -> Self {
        Self {
            rows,
            cols,
            muted,
            status: String::new(),
            enhanced_keys: false,
            initialized: false,
        }
    }

    /// Enter raw mode and the alternate screen. Asks the terminal for
    /// modifier press/release reporting where supported, so the key
    /// router can track held modifiers directly.
    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;

        let mut stdout = io::stdout();
        execute!(
            stdout,
            EnterAlternateScreen,
            Hide,
            Clear(ClearType::All),
            MoveTo(0, 0)
        )?;

        if terminal::supports_keyboard_enhancement().unwrap_or(false) {
            execute!(
                stdout,
                PushKeyboardEnhancementFlags(
                    KeyboardEnhancementFlags::REPORT_EVENT_TYPES
                        | KeyboardEnhancementFlags::REPORT_ALL_KEYS_AS_ESCAPE_CODES
                )
            )?;
            self.enhanced_keys = true;
        }

        if let Ok((cols, rows)) = terminal::size() {
            if cols < self.cols || rows < self.rows + 1 {
                warn!(
                    "terminal {}x{} smaller than playfield {}x{}",
                    cols,
                    rows,
                    self.cols,
                    self.rows + 1
                );
            }
        }

        self.initialized = true;
        Ok(())
    }

    /// Restore the terminal. Safe to call more than once.
    pub fn cleanup(&mut self) {
        if !self.initialized {
            return;
        }
        self.initialized = false;

        let mut stdout = io::stdout();
        if self.enhanced_keys {
            let _ = execute!(stdout, PopKeyboardEnhancementFlags);
        }
        let _ = execute!(stdout, Show, LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    /// Paint the whole grid and the status line.
    pub fn present(&mut self, grid: &Grid, cursor: Cursor) {
        if let Err(err) = self.draw_grid(grid, cursor) {
            warn!("present failed: {}", err);
        }
    }

    fn draw_grid(&mut self, grid: &Grid, cursor: Cursor) -> io::Result<()> {
        let mut stdout = io::stdout();
        for row in 0..grid.rows() {
            queue!(stdout, MoveTo(0, row), Print(grid.line(row)))?;
        }
        self.queue_status(&mut stdout)?;
        queue!(stdout, MoveTo(cursor.col, cursor.row))?;
        stdout.flush()
    }

    /// Audible alert: the terminal's own bell, unless muted.
    pub fn bell(&mut self) {
        if self.muted {
            return;
        }
        let mut stdout = io::stdout();
        let _ = stdout.write_all(b"\x07");
        let _ = stdout.flush();
    }

    /// Replace the status line below the grid.
    pub fn set_status(&mut self, text: impl Into<String>) {
        self.status = text.into();
        let mut stdout = io::stdout();
        if self.queue_status(&mut stdout).is_ok() {
            let _ = stdout.flush();
        }
    }

    fn queue_status(&self, stdout: &mut io::Stdout) -> io::Result<()> {
        let line: String = self.status.chars().take(self.cols as usize).collect();
        queue!(
            stdout,
            MoveTo(0, self.rows),
            Clear(ClearType::CurrentLine),
            Print(line)
        )
    }

    /// Show a full-screen text page (help, statistics). The next present
    /// paints the grid back over it.
    pub fn show_page(&mut self, title: &str, body: &str) {
        let result = (|| -> io::Result<()> {
            let mut stdout = io::stdout();
            queue!(stdout, Clear(ClearType::All), MoveTo(0, 0), Print(title))?;

            let mut row: u16 = 1;
            for line in body.lines() {
                if row >= self.rows {
                    break;
                }
                let line: String = line.chars().take(self.cols as usize).collect();
                queue!(stdout, MoveTo(0, row), Print(line))?;
                row += 1;
            }
            self.queue_status(&mut stdout)?;
            stdout.flush()
        })();

        if let Err(err) = result {
            warn!("page draw failed: {}", err);
        }
    }
}

impl Drop for TerminalUi {
    fn drop(&mut self) {
        self.cleanup();
    }
}

/// Adapter handing the shared terminal to the screen as its presenter.
pub struct UiPresenter(pub Rc<RefCell<TerminalUi>>);

impl Presenter for UiPresenter {
    fn present(&mut self, grid: &Grid, cursor: Cursor) {
        self.0.borrow_mut().present(grid, cursor);
    }

    fn bell(&mut self) {
        self.0.borrow_mut().bell();
    }
}
