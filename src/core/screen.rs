//! Virtual screen state.
//!
//! The server drives a fixed-size character grid through the draw-command
//! stream; this module holds that grid and its cursor. Mutations are cheap
//! and invisible until `refresh` hands the grid to the presenter.

use tracing::warn;

/// Playfield dimensions used by hunt servers.
pub const GRID_ROWS: u16 = 24;
pub const GRID_COLS: u16 = 80;

/// Rendering collaborator. `present` must make the grid visible to the
/// user; `bell` emits an audible alert.
pub trait Presenter {
    fn present(&mut self, grid: &Grid, cursor: Cursor);
    fn bell(&mut self);
}

/// Cursor position, always within the grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor {
    pub row: u16,
    pub col: u16,
}

/// A rows × cols matrix of display characters. Every cell always holds a
/// displayable character; cleared cells hold a space.
pub struct Grid {
    rows: u16,
    cols: u16,
    cells: Vec<char>,
}

impl Grid {
    pub fn new(rows: u16, cols: u16) -> Self {
        Self {
            rows,
            cols,
            cells: vec![' '; rows as usize * cols as usize],
        }
    }

    pub fn rows(&self) -> u16 {
        self.rows
    }

    /// One cell's character; used by tests and diagnostics.
    #[allow(dead_code)]
    pub fn get(&self, row: u16, col: u16) -> char {
        self.cells[row as usize * self.cols as usize + col as usize]
    }

    fn set(&mut self, row: u16, col: u16, ch: char) {
        self.cells[row as usize * self.cols as usize + col as usize] = ch;
    }

    /// One row as a string, for painting and for tests.
    pub fn line(&self, row: u16) -> String {
        let start = row as usize * self.cols as usize;
        self.cells[start..start + self.cols as usize].iter().collect()
    }
}

/// Screen buffer: grid + cursor + the presenter that makes them visible.
pub struct Screen {
    grid: Grid,
    cursor: Cursor,
    presenter: Box<dyn Presenter>,
}

impl Screen {
    pub fn new(rows: u16, cols: u16, presenter: Box<dyn Presenter>) -> Self {
        Self {
            grid: Grid::new(rows, cols),
            cursor: Cursor::default(),
            presenter,
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// Write a character at the cursor, then advance one column. Advancing
    /// past the last column wraps to column 0 of the next row; the cursor
    /// never advances past the last row.
    pub fn write_char(&mut self, ch: char) {
        self.grid.set(self.cursor.row, self.cursor.col, ch);
        self.advance();
    }

    /// Write a string via repeated `write_char`.
    pub fn write_str(&mut self, s: &str) {
        for ch in s.chars() {
            self.write_char(ch);
        }
    }

    fn advance(&mut self) {
        self.cursor.col += 1;
        if self.cursor.col >= self.grid.cols {
            self.cursor.col = 0;
            self.cursor.row += 1;
        }
        if self.cursor.row >= self.grid.rows {
            self.cursor.row = self.grid.rows - 1;
        }
    }

    /// Move the cursor to an absolute position. Out-of-range coordinates
    /// are clamped to the nearest valid value and logged.
    pub fn move_cursor(&mut self, row: u16, col: u16) {
        self.cursor.row = row;
        self.cursor.col = col;

        if self.cursor.col >= self.grid.cols {
            warn!("bad move column {} (0..{})", col, self.grid.cols - 1);
            self.cursor.col = self.grid.cols - 1;
        }
        if self.cursor.row >= self.grid.rows {
            warn!("bad move row {} (0..{})", row, self.grid.rows - 1);
            self.cursor.row = self.grid.rows - 1;
        }
    }

    /// Fill the current row from the cursor column to the last column with
    /// spaces. The cursor does not move.
    pub fn clear_to_eol(&mut self) {
        for col in self.cursor.col..self.grid.cols {
            self.grid.set(self.cursor.row, col, ' ');
        }
    }

    /// Erase every cell and move the cursor to the top left.
    pub fn clear_screen(&mut self) {
        for cell in &mut self.grid.cells {
            *cell = ' ';
        }
        self.cursor = Cursor::default();
    }

    /// Present the current grid. The only operation that guarantees the
    /// user sees anything; all other mutations may stay buffered until the
    /// next refresh.
    pub fn refresh(&mut self) {
        self.presenter.present(&self.grid, self.cursor);
    }

    /// Full re-presentation, for transports that cannot guarantee delivery
    /// ordering across reconnects. Same path as `refresh`.
    pub fn redraw(&mut self) {
        self.refresh();
    }

    /// Audible alert via the presenter.
    pub fn bell(&mut self) {
        self.presenter.bell();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Records presenter calls for assertions.
    #[derive(Debug, Default)]
    pub(crate) struct Recorded {
        pub presents: usize,
        pub bells: usize,
        pub last_cursor: Cursor,
    }

    pub(crate) struct RecordingPresenter(pub Rc<RefCell<Recorded>>);

    impl Presenter for RecordingPresenter {
        fn present(&mut self, _grid: &Grid, cursor: Cursor) {
            let mut rec = self.0.borrow_mut();
            rec.presents += 1;
            rec.last_cursor = cursor;
        }

        fn bell(&mut self) {
            self.0.borrow_mut().bells += 1;
        }
    }

    pub(crate) fn test_screen() -> (Screen, Rc<RefCell<Recorded>>) {
        let rec = Rc::new(RefCell::new(Recorded::default()));
        let screen = Screen::new(
            GRID_ROWS,
            GRID_COLS,
            Box::new(RecordingPresenter(rec.clone())),
        );
        (screen, rec)
    }

    #[test]
    fn test_write_advances_cursor() {
        let (mut screen, _) = test_screen();
        screen.write_char('A');
        assert_eq!(screen.grid().get(0, 0), 'A');
        assert_eq!(screen.cursor(), Cursor { row: 0, col: 1 });
    }

    #[test]
    fn test_write_wraps_at_line_end() {
        let (mut screen, _) = test_screen();
        screen.move_cursor(3, GRID_COLS - 1);
        screen.write_char('x');
        assert_eq!(screen.grid().get(3, GRID_COLS - 1), 'x');
        assert_eq!(screen.cursor(), Cursor { row: 4, col: 0 });
    }

    #[test]
    fn test_write_holds_at_last_row() {
        let (mut screen, _) = test_screen();
        screen.move_cursor(GRID_ROWS - 1, GRID_COLS - 1);
        screen.write_char('x');
        // Wraps to column 0 but cannot advance past the bottom row
        assert_eq!(
            screen.cursor(),
            Cursor {
                row: GRID_ROWS - 1,
                col: 0
            }
        );
    }

    #[test]
    fn test_move_out_of_range_clamps() {
        let (mut screen, _) = test_screen();
        screen.move_cursor(200, 200);
        assert_eq!(
            screen.cursor(),
            Cursor {
                row: GRID_ROWS - 1,
                col: GRID_COLS - 1
            }
        );
    }

    #[test]
    fn test_clear_to_eol() {
        let (mut screen, _) = test_screen();
        screen.move_cursor(5, 0);
        screen.write_str("hello world");
        screen.move_cursor(5, 3);
        screen.clear_to_eol();

        assert_eq!(screen.cursor(), Cursor { row: 5, col: 3 });
        assert_eq!(&screen.grid().line(5)[..3], "hel");
        assert!(screen.grid().line(5)[3..].chars().all(|c| c == ' '));
    }

    #[test]
    fn test_clear_screen_resets_cursor() {
        let (mut screen, _) = test_screen();
        screen.move_cursor(10, 10);
        screen.write_str("data");
        screen.clear_screen();

        assert_eq!(screen.cursor(), Cursor::default());
        for row in 0..GRID_ROWS {
            assert!(screen.grid().line(row).chars().all(|c| c == ' '));
        }
    }

    #[test]
    fn test_refresh_presents_once() {
        let (mut screen, rec) = test_screen();
        screen.write_char('A');
        assert_eq!(rec.borrow().presents, 0);
        screen.refresh();
        assert_eq!(rec.borrow().presents, 1);
        assert_eq!(rec.borrow().last_cursor, Cursor { row: 0, col: 1 });
    }

    #[test]
    fn test_bell_reaches_presenter() {
        let (mut screen, rec) = test_screen();
        screen.bell();
        screen.bell();
        assert_eq!(rec.borrow().bells, 2);
    }
}
