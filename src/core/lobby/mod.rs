// src/core/lobby/mod.rs

//! The lobby directory: the ordered, in-memory list of joinable game sessions that
//! commands read and mutate.

mod player;

pub use player::Player;

use crate::core::RelayError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// The song a lobby is currently playing.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CurrentSong {
    #[serde(alias = "song_name")]
    pub song_name: String,
    #[serde(alias = "song_diff")]
    pub song_diff: String,
}

/// One directory entry. Serializes with the field names clients expect.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Lobby {
    pub name: String,
    /// Persistent lobbies are never reaped, even when empty.
    #[serde(default, alias = "stays_open")]
    pub stays_open: bool,
    #[serde(default = "default_max_players", alias = "max_players")]
    pub max_players: u32,
    #[serde(default)]
    pub players: Vec<Player>,
    #[serde(default)]
    pub host: Value,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default, alias = "has_password")]
    pub has_password: bool,
    #[serde(default)]
    pub id: i64,
    #[serde(default, alias = "current_song")]
    pub current_song: CurrentSong,
    #[serde(default)]
    pub started: bool,
}

fn default_max_players() -> u32 {
    100
}

impl Lobby {
    /// Whether the reaper should close this lobby.
    pub fn is_abandoned(&self) -> bool {
        self.players.is_empty() && !self.stays_open
    }

    fn remove_first(&mut self, steam_id: &str) -> bool {
        let Some(pos) = self.players.iter().position(|p| p.steam_id() == steam_id) else {
            return false;
        };
        self.players.remove(pos);
        true
    }

    /// An empty lobby can never be in a started game.
    fn settle_started(&mut self) {
        if self.players.is_empty() {
            self.started = false;
        }
    }
}

/// The lobby that every deployment starts with unless configured otherwise.
pub fn default_lobbies() -> Vec<Lobby> {
    vec![Lobby {
        name: "Big Lobby".to_string(),
        stays_open: true,
        max_players: 100,
        players: Vec::new(),
        host: Value::Null,
        password: None,
        has_password: false,
        id: 0,
        current_song: CurrentSong {
            song_name: " Another Me".to_string(),
            song_diff: " An Other Me".to_string(),
        },
        started: false,
    }]
}

/// A zero-based position in the directory.
///
/// Lobbies are addressed by where they sit in the directory, so a reference is only
/// meaningful until the next reaper sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LobbyIndex(usize);

impl LobbyIndex {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn get(self) -> usize {
        self.0
    }
}

impl fmt::Display for LobbyIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The ordered collection of all lobbies.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LobbyDirectory {
    lobbies: Vec<Lobby>,
}

impl LobbyDirectory {
    pub fn new(lobbies: Vec<Lobby>) -> Self {
        Self { lobbies }
    }

    pub fn len(&self) -> usize {
        self.lobbies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lobbies.is_empty()
    }

    pub fn lobbies(&self) -> &[Lobby] {
        &self.lobbies
    }

    /// Resolves a raw JSON `id` into an index that is in bounds right now.
    pub fn resolve(&self, raw: Option<&Value>) -> Result<LobbyIndex, RelayError> {
        let Some(raw) = raw else {
            return Err(RelayError::InvalidReference("missing id".to_string()));
        };
        let index = raw
            .as_u64()
            .and_then(|i| usize::try_from(i).ok())
            .ok_or_else(|| RelayError::InvalidReference(raw.to_string()))?;
        if index >= self.lobbies.len() {
            return Err(RelayError::InvalidReference(format!(
                "{index} (directory holds {} lobbies)",
                self.lobbies.len()
            )));
        }
        Ok(LobbyIndex(index))
    }

    pub fn get(&self, index: LobbyIndex) -> Result<&Lobby, RelayError> {
        self.lobbies
            .get(index.0)
            .ok_or_else(|| RelayError::InvalidReference(index.to_string()))
    }

    fn get_mut(&mut self, index: LobbyIndex) -> Result<&mut Lobby, RelayError> {
        self.lobbies
            .get_mut(index.0)
            .ok_or_else(|| RelayError::InvalidReference(index.to_string()))
    }

    /// Appends a player. Existing entries with the same steamID are left alone.
    pub fn add_player(&mut self, index: LobbyIndex, player: Player) -> Result<&Lobby, RelayError> {
        let lobby = self.get_mut(index)?;
        lobby.players.push(player);
        Ok(lobby)
    }

    /// Removes the first player matching `steam_id` from one lobby, then clears
    /// `started` if the lobby is empty.
    pub fn remove_player(
        &mut self,
        index: LobbyIndex,
        steam_id: &str,
    ) -> Result<&Lobby, RelayError> {
        let lobby = self.get_mut(index)?;
        lobby.remove_first(steam_id);
        lobby.settle_started();
        Ok(lobby)
    }

    /// Removes the first player matching `steam_id` from every lobby, then clears
    /// `started` on every lobby left empty. Returns how many lobbies lost a player.
    pub fn remove_player_everywhere(&mut self, steam_id: &str) -> usize {
        let removed = self
            .lobbies
            .iter_mut()
            .map(|lobby| lobby.remove_first(steam_id))
            .filter(|removed| *removed)
            .count();
        self.lobbies.iter_mut().for_each(Lobby::settle_started);
        removed
    }

    /// Replaces the first player whose steamID matches `player`'s. The player object is
    /// swapped wholesale; nothing from the old entry is kept. No-op without a match.
    pub fn replace_player(
        &mut self,
        index: LobbyIndex,
        player: Player,
    ) -> Result<&Lobby, RelayError> {
        let lobby = self.get_mut(index)?;
        if let Some(slot) = lobby
            .players
            .iter_mut()
            .find(|p| p.steam_id() == player.steam_id())
        {
            *slot = player;
        }
        Ok(lobby)
    }

    pub fn set_started(&mut self, index: LobbyIndex, started: bool) -> Result<&Lobby, RelayError> {
        let lobby = self.get_mut(index)?;
        lobby.started = started;
        Ok(lobby)
    }

    /// Removes every abandoned lobby in a single pass and returns how many were removed.
    pub fn reap(&mut self) -> usize {
        let before = self.lobbies.len();
        self.lobbies.retain(|lobby| !lobby.is_abandoned());
        before - self.lobbies.len()
    }

    /// Serializes the whole directory as a JSON array.
    pub fn to_json(&self) -> Result<Value, RelayError> {
        serde_json::to_value(&self.lobbies).map_err(|e| RelayError::Internal(e.to_string()))
    }
}
