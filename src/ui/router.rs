//! Keyboard routing.
//!
//! Game keys are case-sensitive single-character command codes, so the
//! router keeps its own shift/control held-state driven by dedicated
//! modifier press/release events (the per-event modifier bits are only a
//! fallback for terminals that never report modifier keys on their own).
//! Each key press composes a canonical command string — uppercased when
//! shifted, `ctrl-` prefixed when controlled — and dispatches through an
//! explicit binding map. Unbound compositions are ignored by construction.
//!
//! Entering form-focus mode (the join or chat editor has the keyboard)
//! suspends routing entirely until the form releases focus.

use std::collections::HashMap;

use bitflags::bitflags;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers, ModifierKeyCode};
use tracing::debug;

bitflags! {
    /// Modifier keys currently held.
    #[derive(Clone, Copy, Debug, Default, PartialEq)]
    pub struct Held: u8 {
        const SHIFT = 0b01;
        const CTRL  = 0b10;
    }
}

/// Locally interpreted game-control commands. Everything else the router
/// emits is a player-action key forwarded verbatim to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameCommand {
    Mute,
    Unmute,
    HelpPage,
    FocusJoin,
    FocusChat,
    Stats,
    Redraw,
    Quit,
}

/// A routed key press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutedKey {
    /// Composed command string to forward to the game.
    Player(String),
    /// Command handled by the client itself.
    Game(GameCommand),
}

#[derive(Debug, Clone, Copy)]
enum Binding {
    Player,
    Game(GameCommand),
}

/// Routes raw key events to bound commands.
pub struct KeyRouter {
    held: Held,
    form_mode: bool,
    bindings: HashMap<String, Binding>,
}

impl Default for KeyRouter {
    fn default() -> Self {
        Self::with_default_bindings()
    }
}

impl KeyRouter {
    pub fn new() -> Self {
        Self {
            held: Held::empty(),
            form_mode: false,
            bindings: HashMap::new(),
        }
    }

    /// Router with the standard hunt key tables.
    pub fn with_default_bindings() -> Self {
        let mut router = Self::new();

        // movement and aiming
        for key in ["k", "j", "h", "l", "K", "J", "H", "L"] {
            router.bind_player(key);
        }
        // weapons
        for key in [
            "f", "1", "g", "2", "F", "3", "G", "4", "5", "6", "7", "8", "9", "0", "@", "o", "O",
            "p", "P",
        ] {
            router.bind_player(key);
        }
        // scan and cloak
        router.bind_player("s");
        router.bind_player("c");

        router.bind_game("ctrl-l", GameCommand::Redraw);
        router.bind_game("ctrl-L", GameCommand::Redraw);
        router.bind_game("q", GameCommand::Quit);
        router.bind_game("-", GameCommand::Mute);
        router.bind_game("+", GameCommand::Unmute);
        router.bind_game("ctrl-j", GameCommand::FocusJoin);
        router.bind_game("ctrl-J", GameCommand::FocusJoin);
        router.bind_game("ctrl-m", GameCommand::FocusChat);
        router.bind_game("ctrl-M", GameCommand::FocusChat);
        router.bind_game("$", GameCommand::Stats);
        router.bind_game("?", GameCommand::HelpPage);

        router
    }

    pub fn bind_player(&mut self, key: &str) {
        self.bindings.insert(key.to_string(), Binding::Player);
    }

    pub fn bind_game(&mut self, key: &str, cmd: GameCommand) {
        self.bindings.insert(key.to_string(), Binding::Game(cmd));
    }

    /// Suspend routing while a text form has the keyboard. Held modifiers
    /// are forgotten; whatever was held belongs to the form now.
    pub fn enter_form_mode(&mut self) {
        self.form_mode = true;
        self.held = Held::empty();
    }

    pub fn leave_form_mode(&mut self) {
        self.form_mode = false;
    }

    /// Route one key event. Returns the bound command for a mapped
    /// composition, `None` for modifier bookkeeping, releases, unmapped
    /// keys, and anything while a form has focus.
    pub fn route(&mut self, event: &KeyEvent) -> Option<RoutedKey> {
        if self.form_mode {
            return None;
        }

        if let KeyCode::Modifier(code) = event.code {
            self.update_modifier(code, event.kind);
            return None;
        }

        if event.kind == KeyEventKind::Release {
            return None;
        }

        let KeyCode::Char(ch) = event.code else {
            return None;
        };

        let composed = self.compose(ch, event.modifiers);
        match self.bindings.get(&composed) {
            Some(Binding::Player) => Some(RoutedKey::Player(composed)),
            Some(Binding::Game(cmd)) => Some(RoutedKey::Game(*cmd)),
            None => {
                debug!("key '{}' not bound", composed);
                None
            }
        }
    }

    fn update_modifier(&mut self, code: ModifierKeyCode, kind: KeyEventKind) {
        let flag = match code {
            ModifierKeyCode::LeftShift | ModifierKeyCode::RightShift => Held::SHIFT,
            ModifierKeyCode::LeftControl | ModifierKeyCode::RightControl => Held::CTRL,
            _ => return,
        };
        match kind {
            KeyEventKind::Press | KeyEventKind::Repeat => self.held.insert(flag),
            KeyEventKind::Release => self.held.remove(flag),
        }
    }

    /// Canonical command string: uppercase the base key when shifted, then
    /// prefix `ctrl-` when controlled.
    fn compose(&self, ch: char, mods: KeyModifiers) -> String {
        let shifted = self.held.contains(Held::SHIFT) || mods.contains(KeyModifiers::SHIFT);
        let controlled = self.held.contains(Held::CTRL) || mods.contains(KeyModifiers::CONTROL);

        let base = if ch.is_ascii_alphabetic() {
            ch.to_ascii_lowercase()
        } else {
            ch
        };

        let mut key = base.to_string();
        if shifted {
            key = key.to_uppercase();
        }
        if controlled {
            key = format!("ctrl-{}", key);
        }
        key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(ch: char, mods: KeyModifiers) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(ch), mods)
    }

    fn modifier(code: ModifierKeyCode, kind: KeyEventKind) -> KeyEvent {
        KeyEvent::new_with_kind(KeyCode::Modifier(code), KeyModifiers::NONE, kind)
    }

    #[test]
    fn test_plain_player_key() {
        let mut router = KeyRouter::with_default_bindings();
        assert_eq!(
            router.route(&press('k', KeyModifiers::NONE)),
            Some(RoutedKey::Player("k".into()))
        );
    }

    #[test]
    fn test_shift_uppercases_from_event_modifiers() {
        let mut router = KeyRouter::with_default_bindings();
        assert_eq!(
            router.route(&press('K', KeyModifiers::SHIFT)),
            Some(RoutedKey::Player("K".into()))
        );
    }

    #[test]
    fn test_shift_tracked_from_modifier_key_events() {
        let mut router = KeyRouter::with_default_bindings();

        router.route(&modifier(ModifierKeyCode::LeftShift, KeyEventKind::Press));
        assert_eq!(
            router.route(&press('j', KeyModifiers::NONE)),
            Some(RoutedKey::Player("J".into()))
        );

        router.route(&modifier(ModifierKeyCode::LeftShift, KeyEventKind::Release));
        assert_eq!(
            router.route(&press('j', KeyModifiers::NONE)),
            Some(RoutedKey::Player("j".into()))
        );
    }

    #[test]
    fn test_ctrl_prefix() {
        let mut router = KeyRouter::with_default_bindings();
        assert_eq!(
            router.route(&press('l', KeyModifiers::CONTROL)),
            Some(RoutedKey::Game(GameCommand::Redraw))
        );
    }

    #[test]
    fn test_ctrl_shift_composes_uppercase_alias() {
        let mut router = KeyRouter::with_default_bindings();
        assert_eq!(
            router.route(&press('j', KeyModifiers::CONTROL | KeyModifiers::SHIFT)),
            Some(RoutedKey::Game(GameCommand::FocusJoin))
        );
    }

    #[test]
    fn test_game_control_keys() {
        let mut router = KeyRouter::with_default_bindings();
        assert_eq!(
            router.route(&press('-', KeyModifiers::NONE)),
            Some(RoutedKey::Game(GameCommand::Mute))
        );
        assert_eq!(
            router.route(&press('+', KeyModifiers::NONE)),
            Some(RoutedKey::Game(GameCommand::Unmute))
        );
        assert_eq!(
            router.route(&press('$', KeyModifiers::NONE)),
            Some(RoutedKey::Game(GameCommand::Stats))
        );
        assert_eq!(
            router.route(&press('?', KeyModifiers::NONE)),
            Some(RoutedKey::Game(GameCommand::HelpPage))
        );
        assert_eq!(
            router.route(&press('q', KeyModifiers::NONE)),
            Some(RoutedKey::Game(GameCommand::Quit))
        );
    }

    #[test]
    fn test_unmapped_composition_ignored() {
        let mut router = KeyRouter::with_default_bindings();
        assert_eq!(router.route(&press('z', KeyModifiers::NONE)), None);
        // mapped base key, unmapped composition
        assert_eq!(router.route(&press('q', KeyModifiers::CONTROL)), None);
    }

    #[test]
    fn test_release_events_ignored() {
        let mut router = KeyRouter::with_default_bindings();
        let release =
            KeyEvent::new_with_kind(KeyCode::Char('k'), KeyModifiers::NONE, KeyEventKind::Release);
        assert_eq!(router.route(&release), None);
    }

    #[test]
    fn test_form_mode_suspends_routing() {
        let mut router = KeyRouter::with_default_bindings();

        router.route(&modifier(ModifierKeyCode::LeftShift, KeyEventKind::Press));
        router.enter_form_mode();

        // nothing routes while the form owns the keyboard
        assert_eq!(router.route(&press('k', KeyModifiers::NONE)), None);
        assert_eq!(router.route(&press('q', KeyModifiers::NONE)), None);

        router.leave_form_mode();
        // held modifiers were reset on entry, so this is a plain 'k'
        assert_eq!(
            router.route(&press('k', KeyModifiers::NONE)),
            Some(RoutedKey::Player("k".into()))
        );
    }
}
