// tests/integration/dispatcher_test.rs

//! Tests for every command action, called directly against a directory.

use super::test_helpers::keys;
use noobhub::core::RelayError;
use noobhub::core::commands::{Action, Command, dispatch};
use noobhub::core::lobby::{LobbyDirectory, default_lobbies};
use serde_json::{Value, json};

fn directory() -> LobbyDirectory {
    LobbyDirectory::new(default_lobbies())
}

fn run(directory: &mut LobbyDirectory, body: Value) -> Result<Value, RelayError> {
    let command = Command::parse(&body.to_string())?;
    dispatch(directory, &command)
}

#[test]
fn test_action_names_round_trip() {
    for action in Action::ALL {
        assert_eq!(action.name().parse::<Action>().unwrap(), action);
    }
    assert!(matches!(
        "deleteEverything".parse::<Action>(),
        Err(RelayError::UnknownAction(_))
    ));
}

#[test]
fn test_parse_rejects_invalid_json() {
    assert!(matches!(
        Command::parse("{not json"),
        Err(RelayError::MalformedCommand(_))
    ));
    assert!(matches!(
        Command::parse("{\"id\":0}"),
        Err(RelayError::MalformedCommand(_))
    ));
}

#[test]
fn test_get_servers() {
    let mut dir = directory();
    let user = json!({ "steamID": "s1", "name": "ana" });
    let payload = run(&mut dir, json!({ "action": "getServers", "user": user })).unwrap();

    assert_eq!(keys(&payload), vec!["servers", "action", "user"]);
    assert_eq!(payload["action"], "gotServers");
    assert_eq!(payload["user"], user);
    assert_eq!(payload["servers"], dir.to_json().unwrap());
}

#[test]
fn test_get_servers_without_user_echoes_null() {
    let mut dir = directory();
    let payload = run(&mut dir, json!({ "action": "getServers" })).unwrap();
    assert_eq!(payload["user"], Value::Null);
}

#[test]
fn test_user_joined() {
    let mut dir = directory();
    let user = json!({ "steamID": "s1", "name": "ana" });
    let payload = run(
        &mut dir,
        json!({ "action": "updateServerInfo_USERJOINED", "id": 0, "user": user }),
    )
    .unwrap();

    assert_eq!(keys(&payload), vec!["action", "id", "user", "server"]);
    assert_eq!(payload["action"], "updateServerInfo_USERJOINED");
    assert_eq!(payload["id"], 0);
    assert_eq!(payload["server"]["players"], json!([user]));
    assert_eq!(dir.lobbies()[0].players.len(), 1);
}

#[test]
fn test_user_left() {
    let mut dir = directory();
    let user = json!({ "steamID": "s1" });
    run(
        &mut dir,
        json!({ "action": "updateServerInfo_USERJOINED", "id": 0, "user": user }),
    )
    .unwrap();
    run(
        &mut dir,
        json!({ "action": "updateServerInfo_INGAME_STARTEND", "id": 0, "started": true }),
    )
    .unwrap();

    let payload = run(
        &mut dir,
        json!({ "action": "updateServerInfo_USERLEFT", "id": 0, "user": user }),
    )
    .unwrap();
    assert_eq!(keys(&payload), vec!["action", "id", "server"]);
    assert_eq!(payload["server"]["players"], json!([]));
    assert_eq!(payload["server"]["started"], false);
}

#[test]
fn test_user_left_unknown_player_still_broadcasts() {
    let mut dir = directory();
    let payload = run(
        &mut dir,
        json!({ "action": "updateServerInfo_USERLEFT", "id": 0, "user": { "steamID": "ghost" } }),
    )
    .unwrap();
    assert_eq!(payload["action"], "updateServerInfo_USERLEFT");
}

#[test]
fn test_force_remove_user() {
    let mut dir = directory();
    let user = json!({ "steamID": "s1" });
    run(
        &mut dir,
        json!({ "action": "updateServerInfo_USERJOINED", "id": 0, "user": user }),
    )
    .unwrap();

    let payload = run(
        &mut dir,
        json!({ "action": "updateServerInfo_FORCEREMOVEUSER", "user": user }),
    )
    .unwrap();
    assert_eq!(keys(&payload), vec!["action", "user", "servers"]);
    assert_eq!(payload["servers"][0]["players"], json!([]));
    assert!(dir.lobbies()[0].players.is_empty());
}

#[test]
fn test_players_info_in_game_and_new_entry_replace_player() {
    for action in ["getPlayersInfo_INGAME", "resultScreen_NEWENTRY"] {
        let mut dir = directory();
        run(
            &mut dir,
            json!({ "action": "updateServerInfo_USERJOINED", "id": 0, "user": { "steamID": "s1", "score": 0 } }),
        )
        .unwrap();

        let update = json!({ "steamID": "s1", "score": 4200, "accuracy": 99.1 });
        let payload = run(&mut dir, json!({ "action": action, "id": 0, "user": update })).unwrap();

        assert_eq!(keys(&payload), vec!["action", "id", "user", "server"]);
        assert_eq!(payload["action"], action);
        assert_eq!(payload["server"]["players"], json!([update]));
    }
}

#[test]
fn test_start_game_does_not_mutate() {
    let mut dir = directory();
    let before = dir.clone();
    let payload = run(&mut dir, json!({ "action": "startGame", "id": 0 })).unwrap();
    assert_eq!(keys(&payload), vec!["action", "id", "server"]);
    assert_eq!(dir, before);
}

#[test]
fn test_in_game_start_end() {
    let mut dir = directory();
    let payload = run(
        &mut dir,
        json!({ "action": "updateServerInfo_INGAME_STARTEND", "id": 0, "started": true }),
    )
    .unwrap();
    assert_eq!(keys(&payload), vec!["action", "id", "started", "server"]);
    assert_eq!(payload["started"], true);
    assert!(dir.lobbies()[0].started);

    run(
        &mut dir,
        json!({ "action": "updateServerInfo_INGAME_STARTEND", "id": 0, "started": false }),
    )
    .unwrap();
    assert!(!dir.lobbies()[0].started);
}

#[test]
fn test_in_game_start_end_requires_boolean() {
    let mut dir = directory();
    let err = run(
        &mut dir,
        json!({ "action": "updateServerInfo_INGAME_STARTEND", "id": 0, "started": "yes" }),
    )
    .unwrap_err();
    assert!(matches!(err, RelayError::MalformedCommand(_)));
    assert!(!dir.lobbies()[0].started);
}

#[test]
fn test_invalid_reference_does_not_mutate() {
    let mut dir = directory();
    let before = dir.clone();
    for body in [
        json!({ "action": "updateServerInfo_USERJOINED", "id": 5, "user": { "steamID": "s1" } }),
        json!({ "action": "updateServerInfo_USERJOINED", "user": { "steamID": "s1" } }),
        json!({ "action": "startGame", "id": -1 }),
        json!({ "action": "updateServerInfo_INGAME_STARTEND", "id": 9, "started": true }),
    ] {
        let err = run(&mut dir, body).unwrap_err();
        assert!(matches!(err, RelayError::InvalidReference(_)), "{err:?}");
    }
    assert_eq!(dir, before);
}

#[test]
fn test_missing_user_is_malformed() {
    let mut dir = directory();
    let err = run(
        &mut dir,
        json!({ "action": "updateServerInfo_USERJOINED", "id": 0 }),
    )
    .unwrap_err();
    assert!(matches!(err, RelayError::MalformedCommand(_)));

    let err = run(
        &mut dir,
        json!({ "action": "updateServerInfo_FORCEREMOVEUSER", "user": { "name": "no id" } }),
    )
    .unwrap_err();
    assert!(matches!(err, RelayError::MalformedCommand(_)));
    assert!(dir.lobbies()[0].players.is_empty());
}

#[test]
fn test_unknown_action() {
    let mut dir = directory();
    let before = dir.clone();
    let err = run(&mut dir, json!({ "action": "createLobby", "id": 0 })).unwrap_err();
    assert_eq!(err, RelayError::UnknownAction("createLobby".to_string()));
    assert_eq!(dir, before);
}
