// src/core/commands/dispatcher.rs

use super::{Action, Command};
use crate::core::RelayError;
use crate::core::lobby::LobbyDirectory;
use serde_json::{Value, json};
use tracing::debug;

/// Applies `command` to `directory` and builds the payload to broadcast.
///
/// Every failure leaves the directory untouched: lookups and field validation all
/// happen before the first mutation.
pub fn dispatch(directory: &mut LobbyDirectory, command: &Command) -> Result<Value, RelayError> {
    let action: Action = command.action.parse()?;
    debug!("Dispatching '{}'", action);

    match action {
        Action::GetServers => Ok(json!({
            "servers": directory.to_json()?,
            "action": "gotServers",
            "user": command.user_value(),
        })),
        Action::UserJoined => {
            let index = directory.resolve(command.id.as_ref())?;
            let player = command.player()?;
            let lobby = directory.add_player(index, player)?;
            Ok(json!({
                "action": action.name(),
                "id": index.get(),
                "user": command.user_value(),
                "server": lobby,
            }))
        }
        Action::UserLeft => {
            let index = directory.resolve(command.id.as_ref())?;
            let player = command.player()?;
            let lobby = directory.remove_player(index, player.steam_id())?;
            Ok(json!({
                "action": action.name(),
                "id": index.get(),
                "server": lobby,
            }))
        }
        Action::ForceRemoveUser => {
            let player = command.player()?;
            let affected = directory.remove_player_everywhere(player.steam_id());
            debug!(
                "Force-removed '{}' from {} lobbies",
                player.steam_id(),
                affected
            );
            Ok(json!({
                "action": action.name(),
                "user": command.user_value(),
                "servers": directory.to_json()?,
            }))
        }
        Action::PlayersInfoInGame | Action::ResultScreenNewEntry => {
            let index = directory.resolve(command.id.as_ref())?;
            let player = command.player()?;
            let lobby = directory.replace_player(index, player)?;
            Ok(json!({
                "action": action.name(),
                "id": index.get(),
                "user": command.user_value(),
                "server": lobby,
            }))
        }
        Action::StartGame => {
            let index = directory.resolve(command.id.as_ref())?;
            let lobby = directory.get(index)?;
            Ok(json!({
                "action": action.name(),
                "id": index.get(),
                "server": lobby,
            }))
        }
        Action::InGameStartEnd => {
            let index = directory.resolve(command.id.as_ref())?;
            let started = command.started_flag()?;
            let lobby = directory.set_started(index, started)?;
            Ok(json!({
                "action": action.name(),
                "id": index.get(),
                "started": started,
                "server": lobby,
            }))
        }
    }
}
