use serde::{Deserialize, Serialize};

use super::messages::{
    ActionRejectedMsg, ClientMessage, GameActionMsg, GameEndMsg, GameStartMsg, GameStateMsg,
    JoinRoomMsg, JoinRoomResponseMsg, LeaveRoomMsg, MessageType, PlayerListMsg,
    RequestGameStartMsg, ResetSettingsMsg, RoomSettingsMsg, SelectGameMsg, ServerMessage,
    UpdateSettingsMsg,
};

/// Current protocol version.
pub const PROTOCOL_VERSION: u8 = 1;

/// Maximum message payload size in bytes.
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024; // 64 KiB

#[derive(Debug)]
pub enum ProtocolError {
    EmptyMessage,
    UnknownMessageType(u8),
    PayloadTooLarge(usize),
    SerializeError(String),
    DeserializeError(String),
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyMessage => write!(f, "empty message"),
            Self::UnknownMessageType(b) => write!(f, "unknown message type: 0x{b:02x}"),
            Self::PayloadTooLarge(size) => {
                write!(
                    f,
                    "payload too large: {size} bytes (max {MAX_MESSAGE_SIZE})"
                )
            },
            Self::SerializeError(e) => write!(f, "serialize error: {e}"),
            Self::DeserializeError(e) => write!(f, "deserialize error: {e}"),
        }
    }
}

impl std::error::Error for ProtocolError {}

/// Encode a serializable payload with a 1-byte type prefix.
pub fn encode_message<T: Serialize>(
    msg_type: MessageType,
    payload: &T,
) -> Result<Vec<u8>, ProtocolError> {
    let payload_bytes =
        rmp_serde::to_vec(payload).map_err(|e| ProtocolError::SerializeError(e.to_string()))?;
    let total = 1 + payload_bytes.len();
    if total > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::PayloadTooLarge(total));
    }
    let mut buf = Vec::with_capacity(total);
    buf.push(msg_type as u8);
    buf.extend_from_slice(&payload_bytes);
    Ok(buf)
}

/// Encode a `ClientMessage` to wire format.
pub fn encode_client_message(msg: &ClientMessage) -> Result<Vec<u8>, ProtocolError> {
    let ty = msg.message_type();
    match msg {
        ClientMessage::JoinRoom(m) => encode_message(ty, m),
        ClientMessage::LeaveRoom(m) => encode_message(ty, m),
        ClientMessage::GameAction(m) => encode_message(ty, m),
        ClientMessage::SelectGame(m) => encode_message(ty, m),
        ClientMessage::UpdateSettings(m) => encode_message(ty, m),
        ClientMessage::ResetSettings(m) => encode_message(ty, m),
        ClientMessage::RequestGameStart(m) => encode_message(ty, m),
    }
}

/// Encode a `ServerMessage` to wire format.
pub fn encode_server_message(msg: &ServerMessage) -> Result<Vec<u8>, ProtocolError> {
    let ty = msg.message_type();
    match msg {
        ServerMessage::JoinRoomResponse(m) => encode_message(ty, m),
        ServerMessage::PlayerList(m) => encode_message(ty, m),
        ServerMessage::RoomSettings(m) => encode_message(ty, m),
        ServerMessage::GameStart(m) => encode_message(ty, m),
        ServerMessage::GameState(m) => encode_message(ty, m),
        ServerMessage::ActionRejected(m) => encode_message(ty, m),
        ServerMessage::GameEnd(m) => encode_message(ty, m),
    }
}

/// Extract the message type byte from raw wire data.
pub fn decode_message_type(data: &[u8]) -> Result<MessageType, ProtocolError> {
    let Some(&first) = data.first() else {
        return Err(ProtocolError::EmptyMessage);
    };
    MessageType::from_byte(first).ok_or(ProtocolError::UnknownMessageType(first))
}

/// Decode a MessagePack payload (bytes after the type prefix).
pub fn decode_payload<T: for<'de> Deserialize<'de>>(data: &[u8]) -> Result<T, ProtocolError> {
    if data.is_empty() {
        return Err(ProtocolError::EmptyMessage);
    }
    rmp_serde::from_slice(&data[1..]).map_err(|e| ProtocolError::DeserializeError(e.to_string()))
}

/// Decode raw wire data into a `ClientMessage`.
pub fn decode_client_message(data: &[u8]) -> Result<ClientMessage, ProtocolError> {
    let msg_type = decode_message_type(data)?;
    match msg_type {
        MessageType::JoinRoom => Ok(ClientMessage::JoinRoom(decode_payload::<JoinRoomMsg>(
            data,
        )?)),
        MessageType::LeaveRoom => Ok(ClientMessage::LeaveRoom(decode_payload::<LeaveRoomMsg>(
            data,
        )?)),
        MessageType::GameAction => Ok(ClientMessage::GameAction(
            decode_payload::<GameActionMsg>(data)?,
        )),
        MessageType::SelectGame => Ok(ClientMessage::SelectGame(
            decode_payload::<SelectGameMsg>(data)?,
        )),
        MessageType::UpdateSettings => Ok(ClientMessage::UpdateSettings(decode_payload::<
            UpdateSettingsMsg,
        >(data)?)),
        MessageType::ResetSettings => Ok(ClientMessage::ResetSettings(decode_payload::<
            ResetSettingsMsg,
        >(data)?)),
        MessageType::RequestGameStart => Ok(ClientMessage::RequestGameStart(decode_payload::<
            RequestGameStartMsg,
        >(data)?)),
        _ => Err(ProtocolError::UnknownMessageType(data[0])),
    }
}

/// Decode raw wire data into a `ServerMessage`.
pub fn decode_server_message(data: &[u8]) -> Result<ServerMessage, ProtocolError> {
    let msg_type = decode_message_type(data)?;
    match msg_type {
        MessageType::JoinRoomResponse => Ok(ServerMessage::JoinRoomResponse(decode_payload::<
            JoinRoomResponseMsg,
        >(data)?)),
        MessageType::PlayerList => Ok(ServerMessage::PlayerList(decode_payload::<PlayerListMsg>(
            data,
        )?)),
        MessageType::RoomSettings => Ok(ServerMessage::RoomSettings(Box::new(decode_payload::<
            RoomSettingsMsg,
        >(data)?))),
        MessageType::GameStart => Ok(ServerMessage::GameStart(decode_payload::<GameStartMsg>(
            data,
        )?)),
        MessageType::GameState => Ok(ServerMessage::GameState(decode_payload::<GameStateMsg>(
            data,
        )?)),
        MessageType::ActionRejected => Ok(ServerMessage::ActionRejected(decode_payload::<
            ActionRejectedMsg,
        >(data)?)),
        MessageType::GameEnd => Ok(ServerMessage::GameEnd(decode_payload::<GameEndMsg>(data)?)),
        _ => Err(ProtocolError::UnknownMessageType(data[0])),
    }
}
