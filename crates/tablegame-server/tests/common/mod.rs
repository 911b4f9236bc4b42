use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use tablegame_core::net::messages::{
    ClientMessage, GameActionMsg, JoinRoomMsg, JoinRoomResponseMsg, RequestGameStartMsg,
    ServerMessage,
};
use tablegame_core::net::protocol::{PROTOCOL_VERSION, decode_server_message, encode_client_message};
use tablegame_core::player::Avatar;

use tablegame_pizhe::{PiZheAction, PiZheView};
use tablegame_server::build_app;
use tablegame_server::config::ServerConfig;

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct TestServer {
    pub addr: SocketAddr,
    _shutdown: tokio::task::JoinHandle<()>,
}

impl TestServer {
    pub async fn new() -> Self {
        Self::from_config(ServerConfig::default()).await
    }

    pub async fn from_config(config: ServerConfig) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (app, _state) = build_app(config);
        let handle = tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .unwrap();
        });

        // Give the server a moment to start accepting
        tokio::time::sleep(Duration::from_millis(20)).await;

        Self {
            addr,
            _shutdown: handle,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }
}

pub async fn ws_connect(url: &str) -> WsStream {
    let (stream, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    stream
}

pub fn join_msg(room_code: &str, name: &str, session_token: Option<String>) -> ClientMessage {
    ClientMessage::JoinRoom(JoinRoomMsg {
        room_code: room_code.to_string(),
        player_name: name.to_string(),
        avatar: Avatar::default(),
        protocol_version: PROTOCOL_VERSION,
        session_token,
    })
}

/// Send a JoinRoom and return the JoinRoomResponse (success or error).
pub async fn ws_join(stream: &mut WsStream, msg: &ClientMessage) -> JoinRoomResponseMsg {
    ws_send_client_msg(stream, msg).await;
    match ws_read_server_msg(stream).await {
        ServerMessage::JoinRoomResponse(join) => join,
        other => panic!("Expected JoinRoomResponse, got: {other:?}"),
    }
}

/// Create a new room. Returns (JoinRoomResponse, room_code).
pub async fn ws_create_room(stream: &mut WsStream, name: &str) -> (JoinRoomResponseMsg, String) {
    let join = ws_join(stream, &join_msg("", name, None)).await;
    assert!(join.success, "Expected successful join: {join:?}");
    let code = join.room_code.clone().unwrap();
    (join, code)
}

/// Join an existing room, asserting success.
pub async fn ws_join_room(stream: &mut WsStream, room_code: &str, name: &str) -> JoinRoomResponseMsg {
    let join = ws_join(stream, &join_msg(room_code, name, None)).await;
    assert!(join.success, "Expected successful join: {join:?}");
    join
}

/// Read raw binary data from a WebSocket stream (5s timeout).
pub async fn ws_read_raw(stream: &mut WsStream) -> Vec<u8> {
    let deadline = Duration::from_secs(5);
    tokio::time::timeout(deadline, async {
        loop {
            match stream.next().await {
                Some(Ok(Message::Binary(data))) => return data.to_vec(),
                Some(Ok(Message::Close(_))) => panic!("WebSocket closed unexpectedly"),
                Some(Err(e)) => panic!("WebSocket error: {e}"),
                None => panic!("WebSocket stream ended"),
                _ => continue,
            }
        }
    })
    .await
    .expect("Timed out waiting for WebSocket message")
}

/// Try to read raw binary data, returning None on timeout.
pub async fn ws_try_read_raw(stream: &mut WsStream, timeout_ms: u64) -> Option<Vec<u8>> {
    let deadline = Duration::from_millis(timeout_ms);
    tokio::time::timeout(deadline, async {
        loop {
            match stream.next().await {
                Some(Ok(Message::Binary(data))) => return data.to_vec(),
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => {
                    panic!("WebSocket error or closed")
                },
                _ => continue,
            }
        }
    })
    .await
    .ok()
}

/// Read the next ServerMessage from a WebSocket stream (5s timeout).
pub async fn ws_read_server_msg(stream: &mut WsStream) -> ServerMessage {
    let data = ws_read_raw(stream).await;
    decode_server_message(&data).unwrap()
}

/// Skip messages until `pick` accepts one (5s timeout per message).
pub async fn ws_wait_for<T>(
    stream: &mut WsStream,
    mut pick: impl FnMut(ServerMessage) -> Option<T>,
) -> T {
    for _ in 0..64 {
        if let Some(found) = pick(ws_read_server_msg(stream).await) {
            return found;
        }
    }
    panic!("Expected message not received within 64 messages");
}

/// Drain whatever is already queued, waiting at most `timeout_ms` per message.
pub async fn ws_drain(stream: &mut WsStream, timeout_ms: u64) -> Vec<ServerMessage> {
    let mut out = Vec::new();
    while let Some(data) = ws_try_read_raw(stream, timeout_ms).await {
        out.push(decode_server_message(&data).unwrap());
    }
    out
}

pub async fn ws_send_client_msg(stream: &mut WsStream, msg: &ClientMessage) {
    let encoded = encode_client_message(msg).unwrap();
    stream.send(Message::Binary(encoded.into())).await.unwrap();
}

pub async fn ws_request_game_start(stream: &mut WsStream) {
    ws_send_client_msg(stream, &ClientMessage::RequestGameStart(RequestGameStartMsg {})).await;
}

pub async fn ws_send_action(stream: &mut WsStream, player_id: u64, action: &PiZheAction) {
    let msg = ClientMessage::GameAction(GameActionMsg {
        player_id,
        action_data: rmp_serde::to_vec(action).unwrap(),
    });
    ws_send_client_msg(stream, &msg).await;
}

/// Wait for the next GameState and decode the PiZhe view inside.
pub async fn ws_wait_for_view(stream: &mut WsStream) -> PiZheView {
    ws_wait_for(stream, |msg| match msg {
        ServerMessage::GameState(gs) => Some(rmp_serde::from_slice(&gs.state_data).unwrap()),
        _ => None,
    })
    .await
}

/// Wait for the next GameState view matching `pred`.
pub async fn ws_wait_for_view_where(
    stream: &mut WsStream,
    pred: impl Fn(&PiZheView) -> bool,
) -> PiZheView {
    loop {
        let view = ws_wait_for_view(stream).await;
        if pred(&view) {
            return view;
        }
    }
}

/// A room with a host and `n - 1` more players, everyone's join traffic
/// drained. Returns (room_code, streams, player_ids) in seat order.
pub async fn room_with_players(server: &TestServer, n: usize) -> (String, Vec<WsStream>, Vec<u64>) {
    let mut host = ws_connect(&server.ws_url()).await;
    let (join, code) = ws_create_room(&mut host, "Host").await;
    let mut streams = vec![host];
    let mut ids = vec![join.player_id.unwrap()];
    for i in 1..n {
        let mut s = ws_connect(&server.ws_url()).await;
        let join = ws_join_room(&mut s, &code, &format!("P{i}")).await;
        ids.push(join.player_id.unwrap());
        streams.push(s);
    }
    for s in &mut streams {
        ws_drain(s, 100).await;
    }
    (code, streams, ids)
}
