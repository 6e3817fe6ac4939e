// src/core/lobby/player.rs

use crate::core::RelayError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A player entry inside a lobby.
///
/// Clients own the shape of this object: besides the mandatory `steamID` it carries
/// whatever in-game fields they send (name, score, accuracy, completion). The object
/// is stored exactly as received, key order included, and is always replaced
/// wholesale rather than merged.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct Player {
    steam_id: String,
    fields: Map<String, Value>,
}

impl Player {
    pub fn steam_id(&self) -> &str {
        &self.steam_id
    }

    /// Looks up any field of the player object.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }
}

impl TryFrom<Map<String, Value>> for Player {
    type Error = RelayError;

    fn try_from(fields: Map<String, Value>) -> Result<Self, Self::Error> {
        let steam_id = match fields.get("steamID") {
            Some(Value::String(id)) => id.clone(),
            Some(other) => {
                return Err(RelayError::MalformedCommand(format!(
                    "user.steamID must be a string, got {other}"
                )));
            }
            None => {
                return Err(RelayError::MalformedCommand(
                    "user object has no steamID".to_string(),
                ));
            }
        };
        Ok(Self { steam_id, fields })
    }
}

impl TryFrom<Value> for Player {
    type Error = RelayError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(fields) => Player::try_from(fields),
            other => Err(RelayError::MalformedCommand(format!(
                "user must be an object, got {other}"
            ))),
        }
    }
}

impl From<Player> for Map<String, Value> {
    fn from(player: Player) -> Self {
        player.fields
    }
}
