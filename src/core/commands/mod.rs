// src/core/commands/mod.rs

//! The command vocabulary carried inside command frames, and the dispatcher that
//! applies it to the lobby directory.

mod dispatcher;

pub use dispatcher::dispatch;

use crate::core::RelayError;
use crate::core::lobby::Player;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Every action the dispatcher understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    GetServers,
    UserJoined,
    UserLeft,
    ForceRemoveUser,
    PlayersInfoInGame,
    StartGame,
    ResultScreenNewEntry,
    InGameStartEnd,
}

impl Action {
    pub const ALL: [Action; 8] = [
        Action::GetServers,
        Action::UserJoined,
        Action::UserLeft,
        Action::ForceRemoveUser,
        Action::PlayersInfoInGame,
        Action::StartGame,
        Action::ResultScreenNewEntry,
        Action::InGameStartEnd,
    ];

    /// The wire name of the action.
    pub fn name(&self) -> &'static str {
        match self {
            Action::GetServers => "getServers",
            Action::UserJoined => "updateServerInfo_USERJOINED",
            Action::UserLeft => "updateServerInfo_USERLEFT",
            Action::ForceRemoveUser => "updateServerInfo_FORCEREMOVEUSER",
            Action::PlayersInfoInGame => "getPlayersInfo_INGAME",
            Action::StartGame => "startGame",
            Action::ResultScreenNewEntry => "resultScreen_NEWENTRY",
            Action::InGameStartEnd => "updateServerInfo_INGAME_STARTEND",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Action {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|action| action.name() == s)
            .ok_or_else(|| RelayError::UnknownAction(s.to_string()))
    }
}

/// A parsed command frame body.
///
/// Only `action` is required at parse time. The remaining fields are validated by
/// the action that needs them, so an unknown action never fails on a missing field.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Command {
    pub action: String,
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub user: Option<Value>,
    #[serde(default)]
    pub started: Option<Value>,
}

impl Command {
    /// Parses the JSON body of a command frame.
    pub fn parse(body: &str) -> Result<Self, RelayError> {
        Ok(serde_json::from_str(body)?)
    }

    /// The user object echoed back in payloads. Absent users are echoed as `null`.
    pub fn user_value(&self) -> Value {
        self.user.clone().unwrap_or(Value::Null)
    }

    /// The user object as a player entry.
    pub fn player(&self) -> Result<Player, RelayError> {
        let user = self
            .user
            .clone()
            .ok_or_else(|| RelayError::MalformedCommand(format!("'{}' requires a user", self.action)))?;
        Player::try_from(user)
    }

    /// The `started` flag as a strict boolean.
    pub fn started_flag(&self) -> Result<bool, RelayError> {
        self.started.as_ref().and_then(Value::as_bool).ok_or_else(|| {
            RelayError::MalformedCommand(format!("'{}' requires a boolean 'started'", self.action))
        })
    }
}
