//! Game session context.
//!
//! All per-session identity lives here and is owned by the control loop:
//! which instance we talk to, who we are, and the player identifier the
//! server assigned us. No identifier means not joined, and everything that
//! would send on behalf of a player becomes a no-op.

use tracing::warn;

/// Initial player state chosen at join time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnterMode {
    Cloak,
    #[default]
    Fly,
    Scan,
}

impl EnterMode {
    /// Wire value for the join request.
    pub fn wire(self) -> u32 {
        match self {
            EnterMode::Cloak => 1,
            EnterMode::Fly => 2,
            EnterMode::Scan => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EnterMode::Cloak => "cloak",
            EnterMode::Fly => "fly",
            EnterMode::Scan => "scan",
        }
    }

    /// Parse a persisted or user-supplied mode name. Unknown names fall
    /// back to flying, logged.
    pub fn parse(s: &str) -> Self {
        match s {
            "cloak" => EnterMode::Cloak,
            "fly" => EnterMode::Fly,
            "scan" => EnterMode::Scan,
            other => {
                warn!("unknown enter mode '{}', using fly", other);
                EnterMode::Fly
            }
        }
    }
}

/// How a connection intends to use the game instance.
#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectKind {
    Player,
    Monitor,
    Message,
    Scores,
}

impl ConnectKind {
    pub fn wire(self) -> u32 {
        match self {
            ConnectKind::Player => 0,
            ConnectKind::Monitor => 1,
            ConnectKind::Message => 2,
            ConnectKind::Scores => 3,
        }
    }
}

/// Validate a team name: "none" or a single digit. Anything else becomes
/// "none", logged.
pub fn normalize_team(team: &str) -> String {
    match team {
        "none" | "0" | "1" | "2" | "3" | "4" | "5" | "6" | "7" | "8" | "9" => team.to_string(),
        other => {
            warn!("bad team '{}', using none", other);
            "none".to_string()
        }
    }
}

/// Session state for one game instance.
#[derive(Debug, Clone, Default)]
pub struct GameSession {
    /// Game instance identifier on the server.
    pub instance: String,
    /// Server-assigned player identifier; `None` until a join succeeds.
    pub player_id: Option<String>,
    /// Display name used when joining and messaging.
    pub name: String,
    pub team: String,
    pub enter_mode: EnterMode,
}

impl GameSession {
    pub fn new(instance: String, name: String, team: String, enter_mode: EnterMode) -> Self {
        Self {
            instance,
            player_id: None,
            name,
            team: normalize_team(&team),
            enter_mode,
        }
    }

    pub fn joined(&self) -> bool {
        self.player_id.is_some()
    }

    /// Forget the server-assigned identifier; per-key and quit sends
    /// become no-ops again.
    pub fn clear_player(&mut self) {
        self.player_id = None;
    }
}
