//! Game mode selector.
//! Three closed modes cycled by the `mode` command; which update paths are
//! allowed in each one is enforced by the session.

use std::fmt;

use anyhow::{Result, bail};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GameMode {
    /// Two-person move entry; local moves go to the robot.
    #[default]
    Player,
    /// Digitized boards are sent to the engine and its reply is applied;
    /// direct move entry is ignored.
    EngineAuto,
    /// The human plays White, the engine answers as Black.
    PlayerVsEngine,
}

impl GameMode {
    /// The cyclic selector: Player -> EngineAuto -> PlayerVsEngine -> Player.
    pub fn next(self) -> Self {
        match self {
            GameMode::Player => GameMode::EngineAuto,
            GameMode::EngineAuto => GameMode::PlayerVsEngine,
            GameMode::PlayerVsEngine => GameMode::Player,
        }
    }

    /// Whether typed moves are accepted at all in this mode.
    pub fn accepts_move_entry(self) -> bool {
        !matches!(self, GameMode::EngineAuto)
    }

    pub fn from_flag(flag: &str) -> Result<Self> {
        match flag {
            "player" => Ok(GameMode::Player),
            "engine" => Ok(GameMode::EngineAuto),
            "player-vs-engine" => Ok(GameMode::PlayerVsEngine),
            other => bail!("unknown mode '{}'", other),
        }
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameMode::Player => write!(f, "Player"),
            GameMode::EngineAuto => write!(f, "Engine"),
            GameMode::PlayerVsEngine => write!(f, "Player vs engine"),
        }
    }
}
