//! Draw-command stream decoder.
//!
//! The server pushes screen updates as an opaque byte stream: one opcode
//! byte optionally followed by a fixed number of operand bytes. Any byte
//! that is not a reserved opcode is a literal character to draw at the
//! cursor. Batches carry no framing beyond their own length, so a batch
//! may end in the middle of a command; such a command is skipped (logged)
//! and scanning resumes at the next byte.

use tracing::{debug, warn};

use super::screen::Screen;

/// Reserved opcode byte values.
pub mod opcode {
    /// Literal character escape prefix; draws the operand byte.
    pub const ADDCH: u8 = 225;
    /// Absolute cursor motion; operands are row then column.
    pub const MOVE: u8 = 237;
    /// End of a drawing burst; the client must present the grid.
    pub const REFRESH: u8 = 242;
    /// Clear from the cursor to the end of the row.
    pub const CLRTOEOL: u8 = 227;
    /// Session over; the operand distinguishes why.
    pub const ENDWIN: u8 = 229;
    /// Erase the whole screen and home the cursor.
    pub const CLEAR: u8 = 195;
    /// Re-present the current grid.
    pub const REDRAW: u8 = 210;
    /// Audible alert.
    pub const BELL: u8 = 226;
    /// Server has processed n input characters; client must refresh.
    pub const READY: u8 = 231;
}

/// ENDWIN operand: the server (or last player) shut the game down.
pub const END_SERVER_EXIT: u8 = 236;
/// ENDWIN operand: the local player died.
pub const END_PLAYER_DEAD: u8 = 32;

/// One decoded instruction. Built transiently from the byte stream,
/// applied, then discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawCommand {
    WriteChar(char),
    MoveCursor(u8, u8),
    Refresh,
    ClearToEndOfLine,
    EndSession(u8),
    ClearScreen,
    Redraw,
    Bell,
    Ready(u8),
}

/// Why the session ended, as signalled by ENDWIN.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// Peer-initiated close; the client must disconnect.
    ServerClosed,
    /// The local player died; a rejoin may be offered.
    PlayerDied,
}

/// What to make of an ENDWIN mode byte the protocol does not define.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownEndPolicy {
    /// Treat like player death (the historical client behavior).
    #[default]
    Death,
    /// Treat like a server-initiated close.
    ServerClosed,
}

/// Decoder for draw-command batches. Holds configuration only; all state
/// that persists across batches lives in the screen itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct Decoder {
    unknown_end: UnknownEndPolicy,
}

impl Decoder {
    pub fn new(unknown_end: UnknownEndPolicy) -> Self {
        Self { unknown_end }
    }

    /// Decode one batch and apply every command to `screen`, in order.
    /// Returns the session-end signal if the batch contained ENDWIN.
    /// An empty batch is a no-op.
    pub fn apply_batch(&self, screen: &mut Screen, data: &[u8]) -> Option<SessionEnd> {
        let mut ended = None;
        let mut pos = 0;

        while pos < data.len() {
            let Some(cmd) = next_command(data, &mut pos) else {
                continue; // truncated command skipped, keep scanning
            };
            if let Some(end) = self.apply(screen, cmd) {
                ended.get_or_insert(end);
            }
        }

        ended
    }

    fn apply(&self, screen: &mut Screen, cmd: DrawCommand) -> Option<SessionEnd> {
        match cmd {
            DrawCommand::WriteChar(ch) => screen.write_char(ch),
            DrawCommand::MoveCursor(row, col) => screen.move_cursor(row.into(), col.into()),
            DrawCommand::Refresh => screen.refresh(),
            DrawCommand::ClearToEndOfLine => screen.clear_to_eol(),
            DrawCommand::ClearScreen => screen.clear_screen(),
            DrawCommand::Redraw => screen.redraw(),
            DrawCommand::Bell => screen.bell(),
            DrawCommand::Ready(n) => {
                debug!("server ready, {} inputs processed", n);
                screen.refresh();
            }
            DrawCommand::EndSession(mode) => return Some(self.end_session(screen, mode)),
        }
        None
    }

    fn end_session(&self, screen: &mut Screen, mode: u8) -> SessionEnd {
        let end = match mode {
            END_SERVER_EXIT => SessionEnd::ServerClosed,
            END_PLAYER_DEAD => SessionEnd::PlayerDied,
            other => {
                warn!("unknown end-session mode {}", other);
                match self.unknown_end {
                    UnknownEndPolicy::Death => SessionEnd::PlayerDied,
                    UnknownEndPolicy::ServerClosed => SessionEnd::ServerClosed,
                }
            }
        };

        let banner = match end {
            SessionEnd::ServerClosed => "Game Over! (server exited)",
            SessionEnd::PlayerDied => "You died! ctrl-j to re-join, ctrl-m to message",
        };

        screen.move_cursor(screen.grid().rows() - 1, 0);
        screen.write_str(banner);
        screen.clear_to_eol();
        screen.refresh();

        end
    }
}

/// Pull the next command out of `data`, advancing `pos`. Returns `None`
/// when the command's operands run past the end of the batch; `pos` then
/// points at the byte after the opcode, so a stray trailing operand is
/// decoded on its own by the next call.
fn next_command(data: &[u8], pos: &mut usize) -> Option<DrawCommand> {
    let op = data[*pos];
    *pos += 1;
    let remaining = data.len() - *pos;

    macro_rules! operand {
        ($name:literal) => {{
            if remaining < 1 {
                warn!("{} needs 1 operand, have {}", $name, remaining);
                return None;
            }
            let b = data[*pos];
            *pos += 1;
            b
        }};
    }

    let cmd = match op {
        opcode::ADDCH => DrawCommand::WriteChar(operand!("write-char") as char),
        opcode::MOVE => {
            if remaining < 2 {
                warn!("move-cursor needs 2 operands, have {}", remaining);
                return None;
            }
            let row = data[*pos];
            let col = data[*pos + 1];
            *pos += 2;
            DrawCommand::MoveCursor(row, col)
        }
        opcode::REFRESH => DrawCommand::Refresh,
        opcode::CLRTOEOL => DrawCommand::ClearToEndOfLine,
        opcode::ENDWIN => DrawCommand::EndSession(operand!("end-session")),
        opcode::CLEAR => DrawCommand::ClearScreen,
        opcode::REDRAW => DrawCommand::Redraw,
        opcode::BELL => DrawCommand::Bell,
        opcode::READY => DrawCommand::Ready(operand!("ready")),
        literal => DrawCommand::WriteChar(literal as char),
    };

    Some(cmd)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::screen::tests::test_screen;
    use crate::core::screen::Cursor;

    #[test]
    fn test_empty_batch_is_noop() {
        let (mut screen, rec) = test_screen();
        let decoder = Decoder::default();
        assert_eq!(decoder.apply_batch(&mut screen, &[]), None);
        assert_eq!(rec.borrow().presents, 0);
        assert_eq!(screen.cursor(), Cursor::default());
    }

    #[test]
    fn test_write_move_clear_refresh_scenario() {
        let (mut screen, rec) = test_screen();
        let decoder = Decoder::default();

        // write 'A', move to (5, 10), clear to end of line, refresh
        let batch = [opcode::ADDCH, b'A', opcode::MOVE, 5, 10, opcode::CLRTOEOL, opcode::REFRESH];
        let end = decoder.apply_batch(&mut screen, &batch);

        assert_eq!(end, None);
        assert_eq!(screen.grid().get(0, 0), 'A');
        assert_eq!(screen.cursor(), Cursor { row: 5, col: 10 });
        assert!(screen.grid().line(5)[10..].chars().all(|c| c == ' '));
        assert_eq!(rec.borrow().presents, 1);
    }

    #[test]
    fn test_literal_bytes_write_through() {
        let (mut screen, _) = test_screen();
        let decoder = Decoder::default();
        decoder.apply_batch(&mut screen, b"hunt");
        assert_eq!(&screen.grid().line(0)[..4], "hunt");
        assert_eq!(screen.cursor(), Cursor { row: 0, col: 4 });
    }

    #[test]
    fn test_decoding_is_deterministic() {
        let batch = [
            opcode::CLEAR,
            b'x',
            opcode::ADDCH,
            b'y',
            opcode::MOVE,
            2,
            3,
            b'z',
            opcode::REFRESH,
        ];
        let decoder = Decoder::default();

        let (mut a, _) = test_screen();
        let (mut b, _) = test_screen();
        decoder.apply_batch(&mut a, &batch);
        decoder.apply_batch(&mut b, &batch);

        assert_eq!(a.cursor(), b.cursor());
        for row in 0..a.grid().rows() {
            assert_eq!(a.grid().line(row), b.grid().line(row));
        }
    }

    #[test]
    fn test_truncated_trailing_command_is_skipped() {
        let (mut screen, _) = test_screen();
        let decoder = Decoder::default();

        // MOVE with no operands at the very end: commands before it apply,
        // the truncated one is dropped, no panic
        let batch = [opcode::ADDCH, b'A', opcode::MOVE];
        assert_eq!(decoder.apply_batch(&mut screen, &batch), None);
        assert_eq!(screen.grid().get(0, 0), 'A');
        assert_eq!(screen.cursor(), Cursor { row: 0, col: 1 });
    }

    #[test]
    fn test_short_move_leaves_operand_as_literal() {
        let (mut screen, _) = test_screen();
        let decoder = Decoder::default();

        // MOVE with one of two operands: the move is skipped and the stray
        // byte is scanned on its own, becoming a literal write
        let batch = [opcode::MOVE, b'Q'];
        decoder.apply_batch(&mut screen, &batch);
        assert_eq!(screen.grid().get(0, 0), 'Q');
        assert_eq!(screen.cursor(), Cursor { row: 0, col: 1 });
    }

    #[test]
    fn test_bell_rings_once() {
        let (mut screen, rec) = test_screen();
        let decoder = Decoder::default();
        decoder.apply_batch(&mut screen, &[opcode::BELL]);
        assert_eq!(rec.borrow().bells, 1);
        assert_eq!(rec.borrow().presents, 0);
    }

    #[test]
    fn test_ready_consumes_count_and_refreshes() {
        let (mut screen, rec) = test_screen();
        let decoder = Decoder::default();
        decoder.apply_batch(&mut screen, &[opcode::READY, 7]);
        assert_eq!(rec.borrow().presents, 1);
        // the count must not leak into the grid
        assert_eq!(screen.grid().get(0, 0), ' ');
    }

    #[test]
    fn test_redraw_presents() {
        let (mut screen, rec) = test_screen();
        let decoder = Decoder::default();
        decoder.apply_batch(&mut screen, &[opcode::REDRAW]);
        assert_eq!(rec.borrow().presents, 1);
    }

    #[test]
    fn test_end_session_server_exit() {
        let (mut screen, rec) = test_screen();
        let decoder = Decoder::default();
        let end = decoder.apply_batch(&mut screen, &[opcode::ENDWIN, END_SERVER_EXIT]);

        assert_eq!(end, Some(SessionEnd::ServerClosed));
        assert!(rec.borrow().presents >= 1);
        let bottom = screen.grid().line(screen.grid().rows() - 1);
        assert!(bottom.starts_with("Game Over! (server exited)"));
    }

    #[test]
    fn test_end_session_player_death() {
        let (mut screen, _) = test_screen();
        let decoder = Decoder::default();
        let end = decoder.apply_batch(&mut screen, &[opcode::ENDWIN, END_PLAYER_DEAD]);

        assert_eq!(end, Some(SessionEnd::PlayerDied));
        let bottom = screen.grid().line(screen.grid().rows() - 1);
        assert!(bottom.starts_with("You died!"));
    }

    #[test]
    fn test_unknown_end_mode_follows_policy() {
        let (mut screen, _) = test_screen();
        let end = Decoder::default().apply_batch(&mut screen, &[opcode::ENDWIN, 99]);
        assert_eq!(end, Some(SessionEnd::PlayerDied));

        let (mut screen, _) = test_screen();
        let decoder = Decoder::new(UnknownEndPolicy::ServerClosed);
        let end = decoder.apply_batch(&mut screen, &[opcode::ENDWIN, 99]);
        assert_eq!(end, Some(SessionEnd::ServerClosed));
    }

    #[test]
    fn test_first_end_signal_wins() {
        let (mut screen, _) = test_screen();
        let decoder = Decoder::default();
        let batch = [
            opcode::ENDWIN,
            END_PLAYER_DEAD,
            opcode::ENDWIN,
            END_SERVER_EXIT,
        ];
        assert_eq!(
            decoder.apply_batch(&mut screen, &batch),
            Some(SessionEnd::PlayerDied)
        );
    }
}
