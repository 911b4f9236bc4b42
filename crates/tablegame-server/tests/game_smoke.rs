#[allow(dead_code)]
mod common;

use tablegame_core::net::messages::{GameEndMsg, GameStartMsg, ServerMessage};
use tablegame_core::room::RoomState;
use tablegame_pizhe::identity::{Identity, PlayerStatus};
use tablegame_pizhe::{Phase, PiZheAction};

use common::{
    TestServer, WsStream, room_with_players, ws_drain, ws_request_game_start, ws_send_action,
    ws_wait_for, ws_wait_for_view_where,
};

fn game_start(msg: ServerMessage) -> Option<GameStartMsg> {
    match msg {
        ServerMessage::GameStart(gs) => Some(gs),
        _ => None,
    }
}

fn game_end(msg: ServerMessage) -> Option<GameEndMsg> {
    match msg {
        ServerMessage::GameEnd(ge) => Some(ge),
        _ => None,
    }
}

async fn room_summary(server: &TestServer, code: &str) -> serde_json::Value {
    reqwest::get(format!("{}/api/v1/rooms/{code}", server.base_url()))
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

/// Everyone picks an identity (host and P1 passengers, P2 assassin) and
/// the host begins the reveal.
async fn select_and_begin(streams: &mut [WsStream], ids: &[u64]) {
    let picks = [Identity::Passenger, Identity::Passenger, Identity::Assassin];
    for (i, identity) in picks.into_iter().enumerate() {
        ws_send_action(&mut streams[i], ids[i], &PiZheAction::SelectIdentity { identity }).await;
    }
    ws_wait_for_view_where(&mut streams[0], |v| v.selected_count == 3).await;
    ws_send_action(&mut streams[0], ids[0], &PiZheAction::Begin).await;
}

#[tokio::test]
async fn full_game_over_websocket() {
    let server = TestServer::new().await;
    let (code, mut streams, ids) = room_with_players(&server, 3).await;

    ws_request_game_start(&mut streams[0]).await;
    for s in &mut streams {
        let start = ws_wait_for(s, game_start).await;
        assert_eq!(start.game_id, "piZheXianZhi");
        assert_eq!(start.game_name, "屁者先知");
        assert_eq!(start.players.len(), 3);
        assert_eq!(start.host_id, ids[0]);
    }
    assert_eq!(room_summary(&server, &code).await["state"], "Playing");

    select_and_begin(&mut streams, &ids).await;

    // Identities stay private while the game runs.
    let host_view = ws_wait_for_view_where(&mut streams[0], |v| v.phase == Phase::Playing).await;
    assert_eq!(host_view.seats[0].identity, Some(Identity::Passenger));
    assert_eq!(host_view.seats[2].identity, None);
    assert!(host_view.seats[2].has_selected);

    let assassin_view =
        ws_wait_for_view_where(&mut streams[2], |v| v.phase == Phase::Playing).await;
    assert_eq!(assassin_view.seats[2].identity, Some(Identity::Assassin));
    assert!(assassin_view.skill.is_some());

    ws_send_action(&mut streams[0], ids[0], &PiZheAction::RevealNext).await;
    let view = ws_wait_for_view_where(&mut streams[1], |v| v.current_floor == 2).await;
    assert_eq!(view.next_floor, Some(2));

    ws_send_action(&mut streams[0], ids[0], &PiZheAction::Eliminate { player_id: ids[2] }).await;
    for s in &mut streams {
        let end = ws_wait_for(s, game_end).await;
        assert!(end.summary.starts_with("passengers win"), "{}", end.summary);
        assert_eq!(end.final_scores.len(), 3);
    }

    let final_view = ws_wait_for_view_where(&mut streams[1], |v| v.phase == Phase::Finished).await;
    assert_eq!(final_view.seats[2].identity, Some(Identity::Assassin));
    assert_eq!(final_view.seats[2].status, PlayerStatus::Out);
    assert_eq!(final_view.result.unwrap().winner, Identity::Passenger);

    // The room settles into Finished once the session is torn down.
    let mut state = serde_json::Value::Null;
    for _ in 0..50 {
        state = room_summary(&server, &code).await["state"].clone();
        if state == serde_json::json!(RoomState::Finished) {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    assert_eq!(state, "Finished");

    // A finished room can start another round.
    for s in &mut streams {
        ws_drain(s, 100).await;
    }
    ws_request_game_start(&mut streams[0]).await;
    let start = ws_wait_for(&mut streams[1], game_start).await;
    assert_eq!(start.players.len(), 3);
}

#[tokio::test]
async fn host_only_actions_rejected_for_guests() {
    let server = TestServer::new().await;
    let (_, mut streams, ids) = room_with_players(&server, 3).await;
    ws_request_game_start(&mut streams[0]).await;
    ws_wait_for(&mut streams[1], game_start).await;

    ws_send_action(&mut streams[1], ids[1], &PiZheAction::Begin).await;
    let reason = ws_wait_for(&mut streams[1], |msg| match msg {
        ServerMessage::ActionRejected(r) => Some(r.reason),
        _ => None,
    })
    .await;
    assert!(reason.contains("only the host"), "{reason}");
}

#[tokio::test]
async fn begin_requires_valid_identities() {
    let server = TestServer::new().await;
    let (_, mut streams, ids) = room_with_players(&server, 3).await;
    ws_request_game_start(&mut streams[0]).await;
    ws_wait_for(&mut streams[0], game_start).await;

    for (i, s) in streams.iter_mut().enumerate() {
        ws_send_action(
            s,
            ids[i],
            &PiZheAction::SelectIdentity {
                identity: Identity::Passenger,
            },
        )
        .await;
    }
    ws_wait_for_view_where(&mut streams[0], |v| v.selected_count == 3).await;
    ws_send_action(&mut streams[0], ids[0], &PiZheAction::Begin).await;
    let reason = ws_wait_for(&mut streams[0], |msg| match msg {
        ServerMessage::ActionRejected(r) => Some(r.reason),
        _ => None,
    })
    .await;
    assert!(reason.contains("assassin"), "{reason}");
}

#[tokio::test]
async fn host_leaving_mid_game_keeps_session_running() {
    let server = TestServer::new().await;
    let (_, mut streams, ids) = room_with_players(&server, 4).await;
    ws_request_game_start(&mut streams[0]).await;
    ws_wait_for(&mut streams[1], game_start).await;

    ws_send_client_msg_leave(&mut streams[0], ids[0]).await;

    let view = ws_wait_for_view_where(&mut streams[1], |v| v.host_id == ids[1]).await;
    assert_eq!(view.phase, Phase::SelectingIdentities);
    assert_eq!(view.seats.len(), 3, "the departed host's seat is freed");
}

async fn ws_send_client_msg_leave(stream: &mut WsStream, player_id: u64) {
    use tablegame_core::net::messages::{ClientMessage, LeaveRoomMsg};
    common::ws_send_client_msg(stream, &ClientMessage::LeaveRoom(LeaveRoomMsg { player_id }))
        .await;
}
